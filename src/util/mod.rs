//! Utility types shared across the crate.
//!
//! This module contains fundamental types used throughout the library:
//! - [`NodePath`] / [`PropertyPath`] - Scene namespace addressing
//! - [`ValueType`] / [`Value`] - Attribute types and values
//! - [`Error`] / [`Result`] - Error handling

mod error;
mod path;
mod value;

pub use error::*;
pub use path::*;
pub use value::*;
