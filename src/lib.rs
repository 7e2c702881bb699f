pub mod client;
pub mod cluster;
pub mod config;
mod error;
mod http;
pub mod labels;
pub mod membership;
pub mod resolve;
pub mod server;
pub mod signal;
pub mod targets;
#[cfg(test)]
mod testing;
pub mod trace;

#[macro_use]
extern crate tracing;

pub use error::Error;

/// The crate's result type, defined in terms of [`Error`] and generic over `T`
pub type Result<T> = std::result::Result<T, Error>;
