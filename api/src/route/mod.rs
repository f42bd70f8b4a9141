pub mod health;
pub mod meter;
pub mod reservation;
pub mod v1;
