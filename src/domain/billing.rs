//! Outbound call rating
//!
//! Outbound calls pay a flat fee up to the included minutes, then a
//! per-minute rate for every minute past them. Inbound calls are free.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// How elapsed time is turned into billable minutes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillableMinutes {
    /// Whole minutes elapsed
    Elapsed,
    /// Whole minutes within the current hour (`elapsed % 60`); calls over an
    /// hour are billed as if the full hours never happened. Matches the
    /// legacy rating engine.
    WithinHour,
}

impl Default for BillableMinutes {
    fn default() -> Self {
        BillableMinutes::Elapsed
    }
}

/// Rate applied to ended outbound calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutboundTariff {
    /// Charged when the call fits within the included minutes
    pub flat_fee: f64,
    pub included_minutes: i64,
    /// Charged per billable minute past the included ones
    pub rate_per_minute: f64,
    pub billable_minutes: BillableMinutes,
}

impl Default for OutboundTariff {
    fn default() -> Self {
        Self {
            flat_fee: 0.10,
            included_minutes: 5,
            rate_per_minute: 0.05,
            billable_minutes: BillableMinutes::Elapsed,
        }
    }
}

impl OutboundTariff {
    pub fn with_billable_minutes(mut self, billable_minutes: BillableMinutes) -> Self {
        self.billable_minutes = billable_minutes;
        self
    }

    /// Whole minutes charged for a call of the given length
    pub fn billable_minutes(&self, elapsed: Duration) -> i64 {
        let minutes = elapsed.num_milliseconds().max(0) / 60_000;

        match self.billable_minutes {
            BillableMinutes::Elapsed => minutes,
            BillableMinutes::WithinHour => minutes % 60,
        }
    }

    pub fn calculate_charge(&self, elapsed: Duration) -> f64 {
        let minutes = self.billable_minutes(elapsed);

        if minutes <= self.included_minutes {
            self.flat_fee
        } else {
            (minutes - self.included_minutes) as f64 * self.rate_per_minute
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_flat_fee_up_to_included_minutes() {
        let tariff = OutboundTariff::default();

        assert_close(tariff.calculate_charge(Duration::zero()), 0.10);
        assert_close(tariff.calculate_charge(Duration::minutes(3)), 0.10);
        assert_close(tariff.calculate_charge(Duration::minutes(5)), 0.10);
        // 5m59s still rounds down to 5 minutes
        assert_close(tariff.calculate_charge(Duration::seconds(359)), 0.10);
    }

    #[test]
    fn test_per_minute_after_included_minutes() {
        let tariff = OutboundTariff::default();

        assert_close(tariff.calculate_charge(Duration::minutes(6)), 0.05);
        assert_close(tariff.calculate_charge(Duration::minutes(12)), 0.35);
        assert_close(tariff.calculate_charge(Duration::minutes(65)), 3.00);
    }

    #[test]
    fn test_within_hour_minutes() {
        let tariff = OutboundTariff::default().with_billable_minutes(BillableMinutes::WithinHour);

        assert_eq!(tariff.billable_minutes(Duration::minutes(65)), 5);
        assert_eq!(tariff.billable_minutes(Duration::minutes(72)), 12);
        assert_close(tariff.calculate_charge(Duration::minutes(65)), 0.10);
        assert_close(tariff.calculate_charge(Duration::minutes(72)), 0.35);
        assert_close(tariff.calculate_charge(Duration::minutes(12)), 0.35);
    }

    #[test]
    fn test_tariff_deserialize_partial() {
        let tariff: OutboundTariff =
            serde_json::from_str(r#"{"billable_minutes":"within_hour"}"#).unwrap();

        assert_eq!(tariff.billable_minutes, BillableMinutes::WithinHour);
        assert_eq!(tariff.included_minutes, 5);
    }
}
