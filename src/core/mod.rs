pub mod backend;
pub mod cli;
pub mod common;
pub mod configuration;
pub mod core;
pub mod logger;
pub mod navigation;
pub mod session_store;
