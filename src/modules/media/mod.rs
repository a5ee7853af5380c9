pub mod command;
pub mod error;
pub mod events;
pub mod frames;
pub mod manifest;
pub mod model;
pub mod probe;
pub mod service;
pub mod staging;
pub mod transcoder;

#[cfg(test)]
pub(crate) mod testing;
