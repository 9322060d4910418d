//! Shared kernel - Common types and utilities used across all bounded contexts

pub mod error;
pub mod events;
pub mod value_objects;

pub use error::{DomainError, Result};
pub use value_objects::*;
