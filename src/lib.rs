pub mod camera;
pub mod config;
pub mod detector;
pub mod error;
pub mod face;
pub mod hand;
pub mod processor;
pub mod render;
pub mod session;
pub mod telemetry;
