//! Per-fixture, per-day yield aggregation.
//!
//! Rows are bucketed by `(fixture, calendar date)` and, inside a bucket,
//! reconciled per serial number: a serial that passed on any attempt counts
//! as passed, and its failed attempts make it a false defect. A serial that
//! failed and never passed is a true defect.

use super::grouping::fixture_labels;
use super::timestamp::parse_date;
use crate::models::{
    date_key, non_blank, Aggregation, DailySummary, GroupingKey, PassStatus, SummaryMap, Table,
};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Attempt history of one serial inside one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerialOutcome {
    pub ever_passed: bool,
    pub ever_failed: bool,
}

impl SerialOutcome {
    pub fn record(&mut self, status: PassStatus) {
        match status {
            PassStatus::Pass => self.ever_passed = true,
            PassStatus::Fail => self.ever_failed = true,
            PassStatus::Unknown => {}
        }
    }

    pub fn is_false_defect(&self) -> bool {
        self.ever_failed && self.ever_passed
    }

    pub fn is_true_defect(&self) -> bool {
        self.ever_failed && !self.ever_passed
    }
}

/// Fold a set of serial outcomes into daily counts.
///
/// A serial with only UNKNOWN rows adds to `total_tested` and `fail_count`
/// but to neither defect count.
pub fn summarize<'a>(outcomes: impl IntoIterator<Item = &'a SerialOutcome>) -> DailySummary {
    let mut summary = DailySummary::default();
    for outcome in outcomes {
        summary.total_tested += 1;
        if outcome.ever_passed {
            summary.pass_count += 1;
        }
        if outcome.is_false_defect() {
            summary.false_defect_count += 1;
        }
        if outcome.is_true_defect() {
            summary.true_defect_count += 1;
        }
    }
    summary.fail_count = summary.total_tested - summary.pass_count;
    summary
}

/// Aggregate test rows into `fixture → date → counts`.
///
/// `statuses` holds the normalized pass status of each table row. Rows with
/// a null fixture, null serial or unparsable timestamp never land in a
/// bucket. An empty table or a missing serial/timestamp column yields an
/// empty result.
pub fn aggregate(
    table: &Table,
    serial_column: &str,
    timestamp_column: &str,
    grouping: &GroupingKey,
    statuses: &[PassStatus],
) -> Aggregation {
    if table.is_empty() {
        return Aggregation::default();
    }
    let (Some(serial_idx), Some(ts_idx)) = (
        table.column_index(serial_column),
        table.column_index(timestamp_column),
    ) else {
        debug!(
            "Column `{}` or `{}` missing; nothing to aggregate",
            serial_column, timestamp_column
        );
        return Aggregation::default();
    };

    let fixtures = fixture_labels(table, grouping);
    let mut dates: BTreeSet<NaiveDate> = BTreeSet::new();
    let mut buckets: HashMap<(&str, NaiveDate), HashMap<&str, SerialOutcome>> = HashMap::new();

    for (i, row) in table.rows.iter().enumerate() {
        let Some(date) = parse_date(row[ts_idx].as_deref()) else {
            continue;
        };
        dates.insert(date);

        let (Some(fixture), Some(serial)) = (fixtures[i], non_blank(row[serial_idx].as_deref()))
        else {
            continue;
        };
        let status = statuses.get(i).copied().unwrap_or(PassStatus::Unknown);

        buckets
            .entry((fixture, date))
            .or_default()
            .entry(serial)
            .or_default()
            .record(status);
    }

    let mut summary = SummaryMap::new();
    for ((fixture, date), serials) in &buckets {
        summary
            .entry(fixture.to_string())
            .or_default()
            .insert(date_key(date), summarize(serials.values()));
    }

    debug!(
        "Aggregated {} rows into {} bucket(s) over {} date(s)",
        table.len(),
        buckets.len(),
        dates.len()
    );

    Aggregation {
        summary,
        dates: dates.into_iter().collect(),
    }
}
