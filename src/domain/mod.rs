//! Domain layer - Core business logic and rules
//!
//! This layer contains:
//! - Aggregates: Consistency boundaries
//! - Value Objects: Immutable objects without identity
//! - Domain Services: Operations that don't fit in a single aggregate
//! - Store Interfaces: Ports for persistence
//! - Domain Events: Things that happened in the domain
//! - Statistics: Pure folds over ended calls

pub mod billing;
pub mod call;
pub mod shared;
pub mod statistics;

// Re-export commonly used types
pub use shared::{DomainError, Result};
