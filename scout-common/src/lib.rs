//! Common types for the scout-import toolchain

pub mod error;

pub use error::{Error, IoContext, Result};
