//! Report rendering.
//!
//! Markdown and JSON for reading, CSV for spreadsheet export.

pub mod csv;
pub mod generator;

pub use csv::{generate_csv_report, generate_csv_search};
pub use generator::{
    generate_json_report, generate_json_search, generate_markdown_report,
    generate_markdown_search,
};

use crate::models::{date_column, date_key, StationReport, METRIC_LABELS};

/// Fixtures shown for a station: the selected one if present, otherwise all, sorted.
pub fn fixtures_to_display<'a>(report: &'a StationReport, selected: Option<&str>) -> Vec<&'a str> {
    if let Some(wanted) = selected {
        if let Some((name, _)) = report.summary.get_key_value(wanted) {
            return vec![name.as_str()];
        }
    }
    report.summary.keys().map(String::as_str).collect()
}

/// One metric table: column headers and five rows of cells.
///
/// Dates with no data for the fixture render as `N/A`.
pub fn metric_rows(report: &StationReport, fixture: &str) -> (Vec<String>, Vec<Vec<String>>) {
    let headers = report.dates.iter().map(date_column).collect();
    let days = report.summary.get(fixture);

    let rows = (0..METRIC_LABELS.len())
        .map(|metric| {
            report
                .dates
                .iter()
                .map(|d| {
                    days.and_then(|days| days.get(&date_key(d)))
                        .map(|s| s.metric_values()[metric].to_string())
                        .unwrap_or_else(|| "N/A".to_string())
                })
                .collect()
        })
        .collect();

    (headers, rows)
}
