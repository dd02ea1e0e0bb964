pub mod gemini;
pub mod handler;
pub mod policy;
pub mod wire;
