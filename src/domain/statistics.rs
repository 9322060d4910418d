//! Call statistics
//!
//! Pure folds over ended calls. Every aggregate is bucketed by the UTC
//! calendar date of the call's start time.

use crate::domain::billing::OutboundTariff;
use crate::domain::call::{Call, CallDirection};
use crate::domain::shared::value_objects::PhoneNumber;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregated usage and billing report
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CallStatistics {
    /// Summed call time per direction and day, as `HH:MM:SS`
    pub duration_by_direction: BTreeMap<CallDirection, BTreeMap<NaiveDate, String>>,
    pub total_number_of_calls: u64,
    pub calls_by_caller_number: BTreeMap<NaiveDate, BTreeMap<String, u64>>,
    pub calls_by_callee_number: BTreeMap<NaiveDate, BTreeMap<String, u64>>,
    pub outbound_cost_by_day: BTreeMap<NaiveDate, f64>,
}

impl CallStatistics {
    /// Build the report from the three ended-call sets read from the store
    pub fn from_ended_calls(
        inbound: &[Call],
        outbound: &[Call],
        all_ended: &[Call],
        tariff: &OutboundTariff,
    ) -> Self {
        let mut duration_by_direction = BTreeMap::new();
        duration_by_direction.insert(CallDirection::Inbound, duration_by_day(inbound));
        duration_by_direction.insert(CallDirection::Outbound, duration_by_day(outbound));

        Self {
            duration_by_direction,
            total_number_of_calls: all_ended.iter().filter(|c| c.ended_at().is_some()).count() as u64,
            calls_by_caller_number: calls_by_number(all_ended, Call::caller_number),
            calls_by_callee_number: calls_by_number(all_ended, Call::callee_number),
            outbound_cost_by_day: outbound_cost_by_day(outbound, tariff),
        }
    }
}

/// Aggregation key of a timestamp
pub fn date_key(timestamp: &DateTime<Utc>) -> NaiveDate {
    timestamp.date_naive()
}

/// Format a duration as `HH:MM:SS`; hours keep growing past 24
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.num_milliseconds().max(0);

    format!(
        "{:02}:{:02}:{:02}",
        millis / 3_600_000,
        (millis / 60_000) % 60,
        (millis / 1_000) % 60
    )
}

/// Total call time per start date
pub fn duration_by_day(calls: &[Call]) -> BTreeMap<NaiveDate, String> {
    let mut totals: BTreeMap<NaiveDate, Duration> = BTreeMap::new();

    for call in calls {
        if let Some(duration) = call.duration() {
            let total = totals
                .entry(date_key(call.started_at()))
                .or_insert_with(Duration::zero);
            *total = *total + duration;
        }
    }

    totals
        .into_iter()
        .map(|(date, total)| (date, format_duration(total)))
        .collect()
}

/// Number of ended calls per start date and per number picked from each call
pub fn calls_by_number<F>(calls: &[Call], number_of: F) -> BTreeMap<NaiveDate, BTreeMap<String, u64>>
where
    F: Fn(&Call) -> &PhoneNumber,
{
    let mut counts: BTreeMap<NaiveDate, BTreeMap<String, u64>> = BTreeMap::new();

    for call in calls.iter().filter(|c| c.ended_at().is_some()) {
        *counts
            .entry(date_key(call.started_at()))
            .or_default()
            .entry(number_of(call).to_string())
            .or_insert(0) += 1;
    }

    counts
}

/// Charged amount of ended outbound calls per start date
pub fn outbound_cost_by_day(calls: &[Call], tariff: &OutboundTariff) -> BTreeMap<NaiveDate, f64> {
    let mut costs: BTreeMap<NaiveDate, f64> = BTreeMap::new();

    for call in calls.iter().filter(|c| c.direction() == CallDirection::Outbound) {
        if let Some(duration) = call.duration() {
            *costs.entry(date_key(call.started_at())).or_insert(0.0) +=
                tariff.calculate_charge(duration);
        }
    }

    costs
}
