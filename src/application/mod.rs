//! Application layer - use cases over the call store
//!
//! Orchestrates the call aggregate, the store and event publishing.

pub mod lifecycle;
pub mod statistics;

pub use lifecycle::LifecycleManager;
pub use statistics::StatisticsEngine;
