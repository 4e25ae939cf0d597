//! Logging.

#[macro_use]
mod macros;

pub use log::*;
