//! Data models for the yield analyzer.
//!
//! This module contains the core data structures used throughout
//! the application: the input table, pass classification, per-day
//! summaries and the per-station report.

use chrono::{DateTime, Local, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A rectangular table of optional string cells with named columns.
///
/// `None` is a null cell. Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Column names in source order.
    pub columns: Vec<String>,
    /// Row cells, aligned with `columns`.
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    /// Creates a table, padding or truncating rows to the column count.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Iterate over the cells of one column. Empty if the column is absent.
    pub fn column<'a>(&'a self, name: &str) -> impl Iterator<Item = Option<&'a str>> + 'a {
        let index = self.column_index(name);
        self.rows
            .iter()
            .filter(move |_| index.is_some())
            .map(move |row| index.and_then(|i| row[i].as_deref()))
    }

    /// Returns a new table with only the rows whose index satisfies `keep`.
    pub fn select_rows(&self, mut keep: impl FnMut(usize, &[Option<String>]) -> bool) -> Table {
        let rows = self
            .rows
            .iter()
            .enumerate()
            .filter(|(i, row)| keep(*i, row))
            .map(|(_, row)| row.clone())
            .collect();
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }
}

/// Returns the trimmed value of a cell, or `None` for null and blank cells.
pub fn non_blank(cell: Option<&str>) -> Option<&str> {
    cell.map(str::trim).filter(|v| !v.is_empty())
}

/// Normalized outcome of a single test row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassStatus {
    Pass,
    Fail,
    /// Blank or unrecognized token
    Unknown,
}

impl fmt::Display for PassStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassStatus::Pass => write!(f, "PASS"),
            PassStatus::Fail => write!(f, "FAIL"),
            PassStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Test station whose history is analysed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Station {
    /// PCB inspection
    Pcb,
    /// Firmware download
    Fw,
    /// RF transmit test
    #[value(name = "rftx")]
    RfTx,
    /// Semi-assembly test
    Semi,
    /// Function (battery ADC) test
    Func,
}

impl Station {
    /// All stations in report order.
    pub const ALL: [Station; 5] = [
        Station::Pcb,
        Station::Fw,
        Station::RfTx,
        Station::Semi,
        Station::Func,
    ];

    /// Key used in configuration files.
    pub fn key(&self) -> &'static str {
        match self {
            Station::Pcb => "pcb",
            Station::Fw => "fw",
            Station::RfTx => "rftx",
            Station::Semi => "semi",
            Station::Func => "func",
        }
    }
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Station::Pcb => write!(f, "PCB"),
            Station::Fw => write!(f, "Fw"),
            Station::RfTx => write!(f, "RfTx"),
            Station::Semi => write!(f, "Semi"),
            Station::Func => write!(f, "Func"),
        }
    }
}

/// Counts for one fixture on one calendar date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummary {
    /// Distinct serials tested.
    #[serde(rename = "total_test")]
    pub total_tested: usize,
    /// Distinct serials that passed at least once.
    #[serde(rename = "pass")]
    pub pass_count: usize,
    /// Serials that failed at least once but also passed.
    #[serde(rename = "false_defect")]
    pub false_defect_count: usize,
    /// Serials that failed and never passed.
    #[serde(rename = "true_defect")]
    pub true_defect_count: usize,
    /// `total_tested - pass_count`.
    #[serde(rename = "fail")]
    pub fail_count: usize,
}

impl DailySummary {
    /// Values in report row order: total, pass, false defect, true defect, fail.
    pub fn metric_values(&self) -> [usize; 5] {
        [
            self.total_tested,
            self.pass_count,
            self.false_defect_count,
            self.true_defect_count,
            self.fail_count,
        ]
    }
}

/// Report row labels, aligned with [`DailySummary::metric_values`].
pub const METRIC_LABELS: [&str; 5] = ["총 테스트 수", "PASS", "가성불량", "진성불량", "FAIL"];

/// Header of the metric label column.
pub const METRIC_HEADER: &str = "지표";

/// fixture → ISO date (`YYYY-MM-DD`) → counts.
pub type SummaryMap = BTreeMap<String, BTreeMap<String, DailySummary>>;

/// Summary map key of a date (`YYYY-MM-DD`).
pub fn date_key(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Report column header of a date (`YYMMDD`).
pub fn date_column(date: &NaiveDate) -> String {
    date.format("%y%m%d").to_string()
}

/// Distinct serial numbers per outcome category for one fixture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialDetails {
    pub passed: Vec<String>,
    pub false_defect: Vec<String>,
    pub true_defect: Vec<String>,
    /// Every serial that never passed, including those with no recognized token.
    pub fail: Vec<String>,
}

/// The column or synthetic label rows were grouped by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum GroupingKey {
    /// Group by the values of a table column.
    Column(String),
    /// Every row lands in one bucket with this label.
    SingleBucket(String),
    /// No usable grouping; nothing is aggregated.
    Unavailable,
}

impl fmt::Display for GroupingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupingKey::Column(name) => write!(f, "column `{}`", name),
            GroupingKey::SingleBucket(label) => write!(f, "single bucket `{}`", label),
            GroupingKey::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Outcome of grouping key resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingResolution {
    pub key: GroupingKey,
    /// True when the preferred fixture column was missing or all null.
    pub fell_back: bool,
}

/// Data-quality counters from pass-flag normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationStats {
    /// Candidate column actually used, if any exists.
    pub source_column: Option<String>,
    pub rows: usize,
    /// Non-empty values outside the pass/fail vocabulary.
    pub unknown_tokens: usize,
    /// Null or whitespace-only values.
    pub blank: usize,
}

/// Result of one aggregation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregation {
    pub summary: SummaryMap,
    /// Sorted distinct calendar dates across the whole input.
    pub dates: Vec<NaiveDate>,
}

/// Complete analysis of one station.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationReport {
    pub station: Station,
    /// Display name, e.g. `Pcb_Process`.
    pub label: String,
    pub analysis_time: DateTime<Local>,
    pub rows_analyzed: usize,
    pub grouping: GroupingResolution,
    pub quality: NormalizationStats,
    pub summary: SummaryMap,
    pub dates: Vec<NaiveDate>,
    /// fixture → serial lists.
    pub details: BTreeMap<String, SerialDetails>,
}

impl StationReport {
    /// Total true defects over every fixture and date.
    pub fn true_defect_total(&self) -> usize {
        self.summary
            .values()
            .flat_map(|days| days.values())
            .map(|s| s.true_defect_count)
            .sum()
    }
}

/// Metadata about the report run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Input file the history was read from.
    pub source: String,
    /// Table name (SQLite sources).
    pub table: String,
    /// Date and time the report was generated.
    pub generated_at: DateTime<Local>,
    /// Inclusive date filter, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    /// Fixture filter, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixture: Option<String>,
}

/// The complete yield report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    /// One entry per analyzed station, in station order.
    pub stations: Vec<StationReport>,
}

impl Report {
    /// Total true defects over every station.
    pub fn true_defect_total(&self) -> usize {
        self.stations.iter().map(|s| s.true_defect_total()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        Table::new(
            vec!["SNumber".to_string(), "FwPass".to_string()],
            vec![
                vec![Some("S1".to_string()), Some("O".to_string())],
                vec![Some("S2".to_string())],
            ],
        )
    }

    #[test]
    fn test_table_pads_short_rows() {
        let table = sample_table();
        assert_eq!(table.rows[1], vec![Some("S2".to_string()), None]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_table_column_access() {
        let table = sample_table();
        assert!(table.has_column("FwPass"));
        assert!(!table.has_column("PcbPass"));

        let values: Vec<_> = table.column("FwPass").collect();
        assert_eq!(values, vec![Some("O"), None]);
        assert_eq!(table.column("Missing").count(), 0);
    }

    #[test]
    fn test_select_rows_leaves_source_untouched() {
        let table = sample_table();
        let selected = table.select_rows(|i, _| i == 1);
        assert_eq!(selected.len(), 1);
        assert_eq!(table.len(), 2);
        assert_eq!(selected.columns, table.columns);
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  F1 ")), Some("F1"));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn test_daily_summary_serialized_keys() {
        let summary = DailySummary {
            total_tested: 3,
            pass_count: 2,
            false_defect_count: 1,
            true_defect_count: 1,
            fail_count: 1,
        };
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["total_test"], 3);
        assert_eq!(json["pass"], 2);
        assert_eq!(json["false_defect"], 1);
        assert_eq!(json["true_defect"], 1);
        assert_eq!(json["fail"], 1);
        assert_eq!(summary.metric_values(), [3, 2, 1, 1, 1]);
    }

    #[test]
    fn test_date_formats() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 3).unwrap();
        assert_eq!(date_key(&date), "2024-05-03");
        assert_eq!(date_column(&date), "240503");
    }

    #[test]
    fn test_station_keys() {
        let keys: Vec<_> = Station::ALL.iter().map(|s| s.key()).collect();
        assert_eq!(keys, vec!["pcb", "fw", "rftx", "semi", "func"]);
        assert_eq!(Station::RfTx.to_string(), "RfTx");
    }
}
