pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod error;
pub mod loader;
pub mod plot;
pub mod render;
pub mod sink;
