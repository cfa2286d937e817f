//! Shared domain types for the Pixmatrix project.

pub mod color;
pub mod config;
pub mod correction;
pub mod events;
pub mod frame;
pub mod wire;

mod errors;

pub use errors::{PixmatrixError, Result};
