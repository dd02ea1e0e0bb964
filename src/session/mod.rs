pub mod controller;
pub mod transport;
pub mod types;
