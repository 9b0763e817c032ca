//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::Station;
use chrono::NaiveDate;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// jigyield - per-fixture daily yield reports from test history
///
/// Reads one row per test attempt from a SQLite database or JSON file,
/// classifies every serial number as passed, false defect or true defect
/// per fixture and day, and writes a Markdown, CSV or JSON report.
///
/// Examples:
///   jigyield --input ./db/history.sqlite3
///   jigyield --input ./db/history.sqlite3 --station fw,rftx --from 2024-05-01 --to 2024-05-31
///   jigyield --input history.json --format csv --output fw.csv --station fw
///   jigyield --input ./db/history.sqlite3 --station pcb --search SN0012
///   jigyield --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Test history to analyze (SQLite database or JSON array of rows)
    #[arg(short, long, value_name = "FILE", required_unless_present = "init_config")]
    pub input: Option<PathBuf>,

    /// Input format; inferred from the file extension when omitted
    #[arg(long, value_name = "FORMAT")]
    pub source_format: Option<SourceFormat>,

    /// Table to read from a SQLite database
    #[arg(long, value_name = "NAME", env = "JIGYIELD_TABLE")]
    pub table: Option<String>,

    /// Stations to analyze (comma-separated)
    ///
    /// Example: --station pcb,fw. Defaults to every station.
    #[arg(short, long, value_name = "STATIONS", value_delimiter = ',')]
    pub station: Option<Vec<Station>>,

    /// First test date to include (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub from: Option<NaiveDate>,

    /// Last test date to include (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub to: Option<NaiveDate>,

    /// Only analyze rows tested on this fixture (jig)
    #[arg(long, value_name = "ID")]
    pub fixture: Option<String>,

    /// Report format (markdown, csv, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Output file path for the report
    ///
    /// Defaults to analysis_report_<timestamp> with the format's extension.
    #[arg(short, long, value_name = "FILE", conflicts_with = "stdout")]
    pub output: Option<PathBuf>,

    /// Print the report to stdout instead of writing a file
    #[arg(long)]
    pub stdout: bool,

    /// Search rows whose serial number contains this text (case-insensitive)
    #[arg(long, value_name = "SNUMBER")]
    pub search: Option<String>,

    /// Omit serial-number lists from Markdown reports
    #[arg(long)]
    pub no_details: bool,

    /// Exit with code 2 when any true defect is found
    ///
    /// Useful for line-stop checks in scripts.
    #[arg(long)]
    pub fail_on_true_defect: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .jigyield.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .jigyield.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// CSV metric tables, one block per fixture
    Csv,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// File extension for reports in this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

/// Format of the input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SourceFormat {
    Sqlite,
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref input) = self.input {
            if !input.exists() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
            if !input.is_file() {
                return Err(format!("Input path is not a file: {}", input.display()));
            }
        }

        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(format!(
                    "--from ({}) must not be later than --to ({})",
                    from, to
                ));
            }
        }

        if let Some(ref query) = self.search {
            if query.trim().is_empty() {
                return Err("Search text must not be empty".to_string());
            }
        }

        if let Some(ref fixture) = self.fixture {
            if fixture.trim().is_empty() {
                return Err("Fixture must not be empty".to_string());
            }
        }

        if let Some(ref stations) = self.station {
            if stations.is_empty() {
                return Err("At least one station is required".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Stations to analyze, deduplicated, in report order.
    pub fn effective_stations(&self) -> Vec<Station> {
        match self.station {
            Some(ref selected) => Station::ALL
                .iter()
                .copied()
                .filter(|s| selected.contains(s))
                .collect(),
            None => Station::ALL.to_vec(),
        }
    }

    /// Input format, explicit or inferred from the extension.
    pub fn effective_source_format(&self) -> SourceFormat {
        if let Some(format) = self.source_format {
            return format;
        }
        let is_json = self
            .input
            .as_ref()
            .and_then(|p| p.extension())
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            SourceFormat::Json
        } else {
            SourceFormat::Sqlite
        }
    }

    /// Inclusive date range, if either bound was given.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.from, self.to) {
            (None, None) => None,
            (from, to) => Some((
                from.unwrap_or(NaiveDate::MIN),
                to.unwrap_or(NaiveDate::MAX),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            input: None,
            source_format: None,
            table: None,
            station: None,
            from: None,
            to: None,
            fixture: None,
            format: None,
            output: None,
            stdout: false,
            search: None,
            no_details: false,
            fail_on_true_defect: false,
            config: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_station_list() {
        let args = Args::try_parse_from([
            "jigyield",
            "--input",
            "history.sqlite3",
            "--station",
            "rftx,pcb",
            "--from",
            "2024-05-01",
        ])
        .unwrap();
        assert_eq!(args.effective_stations(), vec![Station::Pcb, Station::RfTx]);
        assert_eq!(args.from, Some(date(2024, 5, 1)));
    }

    #[test]
    fn test_default_stations() {
        let args = make_args();
        assert_eq!(args.effective_stations(), Station::ALL.to_vec());
    }

    #[test]
    fn test_validation_reversed_range() {
        let mut args = make_args();
        args.from = Some(date(2024, 5, 2));
        args.to = Some(date(2024, 5, 1));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_input() {
        let mut args = make_args();
        args.input = Some(PathBuf::from("/definitely/not/here.sqlite3"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_empty_search() {
        let mut args = make_args();
        args.search = Some("   ".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_source_format_inference() {
        let mut args = make_args();
        args.input = Some(PathBuf::from("rows.JSON"));
        assert_eq!(args.effective_source_format(), SourceFormat::Json);

        args.input = Some(PathBuf::from("history.sqlite3"));
        assert_eq!(args.effective_source_format(), SourceFormat::Sqlite);

        args.source_format = Some(SourceFormat::Json);
        assert_eq!(args.effective_source_format(), SourceFormat::Json);
    }

    #[test]
    fn test_date_range() {
        let mut args = make_args();
        assert_eq!(args.date_range(), None);

        args.to = Some(date(2024, 5, 31));
        assert_eq!(args.date_range(), Some((NaiveDate::MIN, date(2024, 5, 31))));
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
