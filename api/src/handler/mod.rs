pub mod admin;
pub mod health;
pub mod meter;
pub mod reservation;
