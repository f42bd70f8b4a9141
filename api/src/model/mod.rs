pub mod admin;
pub mod meter;
pub mod reservation;
