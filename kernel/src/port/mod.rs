pub mod chat;
pub mod mailbox;
pub mod meter;
pub mod renderer;
