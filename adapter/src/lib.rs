pub mod database;
pub mod discord;
pub mod gmail;
pub mod renderer;
pub mod repository;
pub mod switchbot;
