pub mod id;
pub mod meter;
pub mod reservation;
pub mod role;
