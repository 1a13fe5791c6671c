pub mod client;
pub mod config;
pub mod logging;
pub mod model;
pub mod render;
pub mod session;
pub mod sync;
