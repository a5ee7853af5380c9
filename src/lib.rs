pub mod common;
pub mod config;
pub mod infrastructure;
pub mod modules;
pub mod state;
pub mod workers;
