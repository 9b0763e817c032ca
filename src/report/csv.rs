//! CSV export.
//!
//! The layout matches the spreadsheets the line has been exporting: one
//! block per fixture with a `지표` header, one row per metric, one column
//! per `YYMMDD` date, `N/A` for days without data and a blank line after
//! each block. Files start with a UTF-8 byte-order mark so spreadsheet
//! tools pick up the Korean labels.

use super::{fixtures_to_display, metric_rows};
use crate::models::{Report, StationReport, Table, METRIC_HEADER, METRIC_LABELS};

/// UTF-8 byte-order mark.
pub const BOM: &str = "\u{feff}";

/// Quote a field if it contains a delimiter, quote or line break.
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn push_record<S: AsRef<str>>(out: &mut String, fields: impl IntoIterator<Item = S>) {
    let line: Vec<String> = fields
        .into_iter()
        .map(|f| escape_field(f.as_ref()))
        .collect();
    out.push_str(&line.join(","));
    out.push('\n');
}

/// Metric blocks for one station.
pub fn station_csv(report: &StationReport, selected_fixture: Option<&str>) -> String {
    let mut out = String::new();

    for fixture in fixtures_to_display(report, selected_fixture) {
        let (headers, rows) = metric_rows(report, fixture);

        push_record(
            &mut out,
            std::iter::once(METRIC_HEADER.to_string()).chain(headers),
        );
        for (label, cells) in METRIC_LABELS.iter().zip(rows) {
            push_record(&mut out, std::iter::once(label.to_string()).chain(cells));
        }
        out.push('\n');
    }

    out
}

/// Generate the CSV export of a whole report.
///
/// With more than one station, each station's blocks follow a `# <label>`
/// line. A single-station export carries no marker.
pub fn generate_csv_report(report: &Report) -> String {
    let mut out = String::from(BOM);
    let marked = report.stations.len() > 1;
    for station in &report.stations {
        if marked {
            push_record(&mut out, [format!("# {}", station.label)]);
        }
        out.push_str(&station_csv(station, report.metadata.fixture.as_deref()));
    }
    out
}

/// Generate CSV for serial search results; nulls are empty fields.
///
/// Every station reads the same source table, so the matches share one
/// header with a leading `Station` column.
pub fn generate_csv_search(results: &[(String, Table)]) -> String {
    let mut out = String::from(BOM);
    let columns = match results.first() {
        Some((_, table)) => &table.columns,
        None => return out,
    };
    push_record(
        &mut out,
        std::iter::once("Station").chain(columns.iter().map(String::as_str)),
    );
    for (label, table) in results {
        for row in &table.rows {
            let cells = row.iter().map(|c| c.as_deref().unwrap_or(""));
            push_record(&mut out, std::iter::once(label.as_str()).chain(cells));
        }
    }
    out
}
