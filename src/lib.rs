// Library root: exposes internals for integration tests and the binary.
// The binary entry point is src/main.rs.

mod core;

pub use core::{config, error};

pub mod bootstrap;
pub mod cache;
pub mod dispatch;
pub mod fanout;
pub mod fetch;
pub mod providers;
pub mod registry;
pub mod status;

#[cfg(feature = "server")]
pub mod server;
