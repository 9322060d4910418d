//! Calltrack - call lifecycle tracking and usage statistics
//!
//! Calls move from `ACTIVE` to `ENDED` under a one-active-call-per-number
//! rule; ended calls feed duration, volume and outbound cost reports.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use domain::shared::error::{DomainError, Result};
