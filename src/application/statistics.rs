//! Statistics use case

use crate::domain::billing::OutboundTariff;
use crate::domain::call::{CallDirection, CallStore};
use crate::domain::shared::error::Result;
use crate::domain::statistics::CallStatistics;
use crate::infrastructure::metrics;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Computes usage and billing statistics over ended calls
///
/// Reads the store on every call and keeps no state of its own, so repeated
/// runs over an unchanged store give equal reports.
pub struct StatisticsEngine {
    store: Arc<dyn CallStore>,
    tariff: OutboundTariff,
}

impl StatisticsEngine {
    pub fn new(store: Arc<dyn CallStore>) -> Self {
        Self::with_tariff(store, OutboundTariff::default())
    }

    pub fn with_tariff(store: Arc<dyn CallStore>, tariff: OutboundTariff) -> Self {
        Self { store, tariff }
    }

    pub fn tariff(&self) -> &OutboundTariff {
        &self.tariff
    }

    pub async fn compute(&self) -> Result<CallStatistics> {
        let started = Instant::now();

        let inbound = self
            .store
            .find_ended_calls_by_direction(CallDirection::Inbound)
            .await?;
        let outbound = self
            .store
            .find_ended_calls_by_direction(CallDirection::Outbound)
            .await?;
        let all_ended = self.store.find_all_ended().await?;

        let statistics =
            CallStatistics::from_ended_calls(&inbound, &outbound, &all_ended, &self.tariff);

        let elapsed = started.elapsed();
        metrics::record_statistics_run(elapsed);
        info!(
            ended_calls = statistics.total_number_of_calls,
            elapsed_ms = elapsed.as_millis() as u64,
            "Call statistics computed"
        );

        Ok(statistics)
    }
}
