//! Infrastructure layer - Technical implementations
//!
//! This layer contains:
//! - Call store implementations (in-memory, PostgreSQL)
//! - Event fan-out
//! - Metrics

pub mod messaging;
pub mod metrics;
pub mod persistence;
