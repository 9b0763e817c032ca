//! Serial-number lists per outcome category.
//!
//! Unlike the daily counts these lists span every date of a fixture,
//! including rows whose timestamp did not parse.

use super::aggregator::SerialOutcome;
use super::grouping::fixture_labels;
use crate::models::{non_blank, GroupingKey, PassStatus, SerialDetails, Table};
use std::collections::{BTreeMap, HashMap};

/// Build the Passed / False-defect / True-defect / Fail lists of one set of rows.
///
/// `rows` yields `(serial, status)` pairs. Lists are sorted and distinct.
pub fn extract_details<'a>(rows: impl IntoIterator<Item = (&'a str, PassStatus)>) -> SerialDetails {
    let mut outcomes: BTreeMap<&str, SerialOutcome> = BTreeMap::new();
    for (serial, status) in rows {
        outcomes.entry(serial).or_default().record(status);
    }

    let mut details = SerialDetails::default();
    for (serial, outcome) in outcomes {
        if outcome.ever_passed {
            details.passed.push(serial.to_string());
        } else {
            details.fail.push(serial.to_string());
        }
        if outcome.is_false_defect() {
            details.false_defect.push(serial.to_string());
        }
        if outcome.is_true_defect() {
            details.true_defect.push(serial.to_string());
        }
    }
    details
}

/// Detail lists for every fixture under a resolved grouping key.
pub fn details_by_fixture(
    table: &Table,
    serial_column: &str,
    grouping: &GroupingKey,
    statuses: &[PassStatus],
) -> BTreeMap<String, SerialDetails> {
    let Some(serial_idx) = table.column_index(serial_column) else {
        return BTreeMap::new();
    };

    let fixtures = fixture_labels(table, grouping);
    let mut per_fixture: HashMap<&str, Vec<(&str, PassStatus)>> = HashMap::new();

    for (i, row) in table.rows.iter().enumerate() {
        let (Some(fixture), Some(serial)) = (fixtures[i], non_blank(row[serial_idx].as_deref()))
        else {
            continue;
        };
        let status = statuses.get(i).copied().unwrap_or(PassStatus::Unknown);
        per_fixture.entry(fixture).or_default().push((serial, status));
    }

    per_fixture
        .into_iter()
        .map(|(fixture, rows)| (fixture.to_string(), extract_details(rows)))
        .collect()
}
