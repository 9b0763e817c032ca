//! Markdown and JSON report generation.
//!
//! This module generates the readable yield report from the per-station
//! analysis results.

use super::{fixtures_to_display, metric_rows};
use crate::models::{
    GroupingKey, NormalizationStats, Report, ReportMetadata, SerialDetails, StationReport, Table,
    METRIC_HEADER, METRIC_LABELS,
};
use anyhow::Result;
use serde_json::{Map, Value};

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, include_details: bool) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# Fixture Yield Report\n\n");

    // Metadata section
    output.push_str(&generate_metadata_section(&report.metadata));

    // Table of contents
    output.push_str(&generate_table_of_contents(report));

    // One section per station
    for station in &report.stations {
        output.push_str(&generate_station_section(
            station,
            report.metadata.fixture.as_deref(),
            include_details,
        ));
    }

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** `{}`\n", metadata.source));
    section.push_str(&format!("- **Table:** `{}`\n", metadata.table));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    if let Some((from, to)) = metadata.date_range {
        section.push_str(&format!("- **Date Range:** {} ~ {}\n", from, to));
    }
    if let Some(ref fixture) = metadata.fixture {
        section.push_str(&format!("- **Fixture:** {}\n", fixture));
    }
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &Report) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    for station in &report.stations {
        toc.push_str(&format!(
            "- [{}](#{})\n",
            station.label,
            station.label.to_lowercase()
        ));
    }
    toc.push('\n');

    toc
}

/// Generate the section of one station.
fn generate_station_section(
    station: &StationReport,
    selected_fixture: Option<&str>,
    include_details: bool,
) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", station.label));
    section.push_str(&format!(
        "*Analysis time: {} | Rows: {}*\n\n",
        station.analysis_time.format("%Y-%m-%d %H:%M:%S"),
        station.rows_analyzed
    ));

    if station.grouping.fell_back {
        let note = match station.grouping.key {
            GroupingKey::Unavailable => "no fixture data; nothing was grouped".to_string(),
            ref key => format!("no fixture data; grouped by {}", key),
        };
        section.push_str(&format!("> ⚠️ **Grouping:** {}\n\n", note));
    }

    if let Some(note) = quality_note(&station.quality) {
        section.push_str(&format!("> ⚠️ **Data quality:** {}\n\n", note));
    }

    if station.summary.is_empty() {
        section.push_str("No analysis data for the selected range.\n\n");
        return section;
    }

    for fixture in fixtures_to_display(station, selected_fixture) {
        section.push_str(&format!("### Fixture: {}\n\n", fixture));
        section.push_str(&generate_metric_table(station, fixture));

        if include_details {
            if let Some(details) = station.details.get(fixture) {
                section.push_str(&generate_details_block(details));
            }
        }
    }

    section
}

/// Describe rows whose pass flag could not be classified.
fn quality_note(stats: &NormalizationStats) -> Option<String> {
    match stats.source_column {
        None if stats.rows > 0 => {
            Some("no pass-flag column found; every row is UNKNOWN".to_string())
        }
        Some(ref column) if stats.unknown_tokens > 0 => Some(format!(
            "{} of {} value(s) in `{}` are neither pass nor fail",
            stats.unknown_tokens, stats.rows, column
        )),
        _ => None,
    }
}

/// Generate the metric × date table of one fixture.
fn generate_metric_table(station: &StationReport, fixture: &str) -> String {
    let (headers, rows) = metric_rows(station, fixture);
    let mut table = String::new();

    table.push_str(&format!("| {} |", METRIC_HEADER));
    for header in &headers {
        table.push_str(&format!(" {} |", header));
    }
    table.push('\n');

    table.push_str("|:---|");
    table.push_str(&":---:|".repeat(headers.len()));
    table.push('\n');

    for (label, cells) in METRIC_LABELS.iter().zip(rows) {
        table.push_str(&format!("| {} |", label));
        for cell in cells {
            table.push_str(&format!(" {} |", cell));
        }
        table.push('\n');
    }
    table.push('\n');

    table
}

/// Generate the collapsible serial lists of one fixture.
fn generate_details_block(details: &SerialDetails) -> String {
    let mut block = String::new();

    let lists = [
        ("PASS", &details.passed),
        ("가성불량", &details.false_defect),
        ("진성불량", &details.true_defect),
        ("FAIL", &details.fail),
    ];

    for (title, serials) in lists {
        block.push_str(&format!(
            "<details>\n<summary>{} ({}건)</summary>\n\n",
            title,
            serials.len()
        ));
        if serials.is_empty() {
            block.push_str("_none_\n");
        } else {
            block.push_str("```\n");
            block.push_str(&serials.join("\n"));
            block.push_str("\n```\n");
        }
        block.push_str("</details>\n\n");
    }

    block
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Generate a Markdown table of serial search results.
pub fn generate_markdown_search(label: &str, query: &str, table: &Table) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}: `{}`\n\n", label, query));
    if table.is_empty() {
        section.push_str(&format!("No rows match '{}'.\n\n", query));
        return section;
    }
    section.push_str(&format!("{} row(s) found.\n\n", table.len()));

    section.push_str(&format!("| {} |\n", table.columns.join(" | ")));
    section.push_str(&format!("|{}\n", "---|".repeat(table.columns.len())));
    for row in &table.rows {
        let cells: Vec<String> = row
            .iter()
            .map(|c| c.as_deref().unwrap_or("").replace('|', "\\|"))
            .collect();
        section.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    section.push('\n');

    section
}

/// Row objects of a table, nulls kept as JSON `null`.
fn rows_to_json(table: &Table) -> Value {
    table
        .rows
        .iter()
        .map(|row| {
            let object: Map<String, Value> = table
                .columns
                .iter()
                .zip(row)
                .map(|(column, cell)| {
                    let value = cell.clone().map(Value::String).unwrap_or(Value::Null);
                    (column.clone(), value)
                })
                .collect();
            Value::Object(object)
        })
        .collect()
}

/// Generate a JSON object of serial search results keyed by station label.
pub fn generate_json_search(results: &[(String, Table)]) -> Result<String> {
    let object: Map<String, Value> = results
        .iter()
        .map(|(label, table)| (label.clone(), rows_to_json(table)))
        .collect();
    serde_json::to_string_pretty(&Value::Object(object)).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DailySummary, GroupingResolution, Station};
    use chrono::{Local, NaiveDate};
    use std::collections::BTreeMap;

    fn create_station_report() -> StationReport {
        let mut summary = BTreeMap::new();
        summary.insert(
            "PC-01".to_string(),
            [(
                "2024-05-03".to_string(),
                DailySummary {
                    total_tested: 2,
                    pass_count: 1,
                    false_defect_count: 1,
                    true_defect_count: 1,
                    fail_count: 1,
                },
            )]
            .into_iter()
            .collect(),
        );

        let mut details = BTreeMap::new();
        details.insert(
            "PC-01".to_string(),
            SerialDetails {
                passed: vec!["SN-001".to_string()],
                false_defect: vec!["SN-001".to_string()],
                true_defect: vec!["SN-002".to_string()],
                fail: vec!["SN-002".to_string()],
            },
        );

        StationReport {
            station: Station::Fw,
            label: "Fw_Process".to_string(),
            analysis_time: Local::now(),
            rows_analyzed: 3,
            grouping: GroupingResolution {
                key: GroupingKey::Column("FwPC".to_string()),
                fell_back: false,
            },
            quality: NormalizationStats {
                source_column: Some("FwPass".to_string()),
                rows: 3,
                unknown_tokens: 0,
                blank: 0,
            },
            summary,
            dates: vec![
                NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
                NaiveDate::from_ymd_opt(2024, 5, 4).unwrap(),
            ],
            details,
        }
    }

    fn create_test_report() -> Report {
        Report {
            metadata: ReportMetadata {
                source: "db/history.sqlite3".to_string(),
                table: "historyinspection".to_string(),
                generated_at: Local::now(),
                date_range: Some((
                    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                    NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
                )),
                fixture: None,
            },
            stations: vec![create_station_report()],
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report, true);

        assert!(markdown.contains("# Fixture Yield Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("2024-05-01 ~ 2024-05-31"));
        assert!(markdown.contains("## Fw_Process"));
        assert!(markdown.contains("### Fixture: PC-01"));
        assert!(markdown.contains("| 지표 | 240503 | 240504 |"));
        assert!(markdown.contains("| 총 테스트 수 | 2 | N/A |"));
        assert!(markdown.contains("진성불량 (1건)"));
        assert!(markdown.contains("SN-002"));
    }

    #[test]
    fn test_markdown_without_details() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report, false);
        assert!(!markdown.contains("<details>"));
        assert!(markdown.contains("| PASS | 1 | N/A |"));
    }

    #[test]
    fn test_grouping_and_quality_warnings() {
        let mut station = create_station_report();
        station.grouping = GroupingResolution {
            key: GroupingKey::SingleBucket("전체".to_string()),
            fell_back: true,
        };
        station.quality.unknown_tokens = 2;

        let section = generate_station_section(&station, None, false);
        assert!(section.contains("grouped by single bucket `전체`"));
        assert!(section.contains("2 of 3 value(s) in `FwPass`"));
    }

    #[test]
    fn test_empty_station_section() {
        let mut station = create_station_report();
        station.summary.clear();
        let section = generate_station_section(&station, None, true);
        assert!(section.contains("No analysis data"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"stations\""));
        assert!(json.contains("\"total_test\""));
        assert!(json.contains("\"false_defect\""));
        assert!(json.contains("\"2024-05-03\""));
    }

    #[test]
    fn test_search_rendering() {
        let table = Table::new(
            vec!["SNumber".to_string(), "FwPass".to_string()],
            vec![vec![Some("SN-001".to_string()), None]],
        );

        let markdown = generate_markdown_search("Fw_Process", "sn-0", &table);
        assert!(markdown.contains("1 row(s) found."));
        assert!(markdown.contains("| SNumber | FwPass |"));
        assert!(markdown.contains("| SN-001 |  |"));

        let results = vec![
            ("Fw_Process".to_string(), table),
            ("Pcb_Process".to_string(), Table::default()),
        ];
        let json = generate_json_search(&results).unwrap();
        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["Fw_Process"][0]["SNumber"], "SN-001");
        assert!(parsed["Fw_Process"][0]["FwPass"].is_null());
        assert_eq!(parsed["Pcb_Process"], serde_json::json!([]));

        let empty = generate_markdown_search("Fw_Process", "zzz", &Table::default());
        assert!(empty.contains("No rows match 'zzz'."));
    }
}
