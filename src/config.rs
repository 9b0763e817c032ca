//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.jigyield.toml` files, including the per-station column profiles.

use crate::cli::OutputFormat;
use crate::models::Station;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = ".jigyield.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Input table settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Station profiles keyed by station key (`pcb`, `fw`, ...).
    #[serde(default = "default_stations")]
    pub stations: BTreeMap<String, StationProfile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            source: SourceConfig::default(),
            stations: default_stations(),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Report format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Include serial-number lists in Markdown reports.
    #[serde(default = "default_true")]
    pub details: bool,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            details: true,
            verbose: false,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Where test history is read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Table holding one row per test attempt (SQLite sources).
    #[serde(default = "default_table")]
    pub table: String,

    /// Serial number column.
    #[serde(default = "default_serial_column")]
    pub serial_column: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            serial_column: default_serial_column(),
        }
    }
}

fn default_table() -> String {
    "historyinspection".to_string()
}

fn default_serial_column() -> String {
    "SNumber".to_string()
}

/// What to group by when a station's fixture column is missing or all null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum GroupingFallback {
    /// Put every row into one bucket with this label.
    SingleBucket { label: String },
    /// Group by the serial number column.
    SerialNumber,
    /// Do not aggregate at all.
    #[serde(rename = "none")]
    Disabled,
}

impl Default for GroupingFallback {
    fn default() -> Self {
        GroupingFallback::SingleBucket {
            label: "전체".to_string(),
        }
    }
}

/// Column layout and token vocabulary of one station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationProfile {
    /// Display name used in reports.
    pub label: String,

    /// Pass-flag columns, first present wins.
    pub pass_columns: Vec<String>,

    /// Test timestamp column.
    pub timestamp_column: String,

    /// Preferred fixture (jig) column.
    pub fixture_column: String,

    #[serde(default)]
    pub fallback: GroupingFallback,

    /// Tokens meaning PASS after trimming and upper-casing.
    #[serde(default = "default_pass_tokens")]
    pub pass_tokens: Vec<String>,

    /// Tokens meaning FAIL after trimming and upper-casing.
    #[serde(default = "default_fail_tokens")]
    pub fail_tokens: Vec<String>,
}

fn default_pass_tokens() -> Vec<String> {
    vec!["O".to_string()]
}

fn default_fail_tokens() -> Vec<String> {
    vec!["X".to_string()]
}

impl StationProfile {
    fn new(label: &str, pass_column: &str, timestamp_column: &str, fixture_column: &str) -> Self {
        Self {
            label: label.to_string(),
            pass_columns: vec![pass_column.to_string()],
            timestamp_column: timestamp_column.to_string(),
            fixture_column: fixture_column.to_string(),
            fallback: GroupingFallback::default(),
            pass_tokens: default_pass_tokens(),
            fail_tokens: default_fail_tokens(),
        }
    }

    /// Built-in profile for a station.
    pub fn builtin(station: Station) -> Self {
        match station {
            Station::Pcb => Self::new("Pcb_Process", "PcbPass", "PcbStartTime", "PcbMaxIrPwr"),
            Station::Fw => Self::new("Fw_Process", "FwPass", "FwStamp", "FwPC"),
            Station::RfTx => Self::new("RfTx_Process", "RfTxPass", "RfTxStamp", "RfTxPC"),
            Station::Semi => Self::new(
                "SemiAssy_Process",
                "SemiAssyPass",
                "SemiAssyStartTime",
                "SemiAssyMaxBatVolt",
            ),
            Station::Func => Self::new("Func_Process", "BatadcPass", "BatadcStamp", "BatadcPC"),
        }
    }
}

fn default_stations() -> BTreeMap<String, StationProfile> {
    Station::ALL
        .iter()
        .map(|s| (s.key().to_string(), StationProfile::builtin(*s)))
        .collect()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        // Stations left out of the file keep their built-in profile.
        for station in Station::ALL {
            config
                .stations
                .entry(station.key().to_string())
                .or_insert_with(|| StationProfile::builtin(station));
        }

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Profile for a station, falling back to the built-in one.
    pub fn profile(&self, station: Station) -> StationProfile {
        self.stations
            .get(station.key())
            .cloned()
            .unwrap_or_else(|| StationProfile::builtin(station))
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(format) = args.format {
            self.general.format = format;
        }
        if let Some(ref table) = args.table {
            self.source.table = table.clone();
        }
        if args.no_details {
            self.general.details = false;
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Log level from the merged settings.
    ///
    /// `--quiet` wins over `verbose = true` in the file.
    pub fn log_level(&self, args: &crate::cli::Args) -> tracing::Level {
        if args.quiet {
            tracing::Level::ERROR
        } else if self.general.verbose {
            tracing::Level::DEBUG
        } else {
            args.log_level()
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
