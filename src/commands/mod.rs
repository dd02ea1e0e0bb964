pub mod chat;
pub mod config;
pub mod relay;
pub mod render;
pub mod session;
