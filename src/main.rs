//! jigyield - per-fixture daily yield reports from test history
//!
//! A CLI tool that reads manufacturing test history, classifies every
//! serial number as passed, false defect or true defect per fixture and
//! day, and writes Markdown, CSV or JSON reports.
//!
//! Exit codes:
//!   0 - Success (no true defects, or no --fail-on-true-defect set)
//!   1 - Runtime error (unreadable input, bad config, write failure, etc.)
//!   2 - True defects found with --fail-on-true-defect

mod analysis;
mod cli;
mod config;
mod models;
mod report;
mod source;

use analysis::RowFilter;
use anyhow::{Context, Result};
use chrono::Local;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use models::{Report, ReportMetadata, Table};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration (the log level depends on it)
    let (mut config, origin) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(config.log_level(&args));

    info!("jigyield v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    origin.log();

    match run(args, config) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .jigyield.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize station columns, pass tokens, and fallbacks.");
    Ok(())
}

/// Initialize logging at the given level.
///
/// `RUST_LOG`, when set, overrides the level.
fn init_logging(level: tracing::Level) {
    let builder = FmtSubscriber::builder()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr);

    if std::env::var_os("RUST_LOG").is_some() {
        let subscriber = builder
            .with_env_filter(EnvFilter::from_default_env())
            .compact()
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
    } else {
        let subscriber = builder.with_max_level(level).compact().finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
    }
}

/// Run the complete analysis workflow. Returns exit code (0 or 2).
fn run(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();
    debug!("Effective configuration: {:?}", config.general);

    // Input presence is enforced by clap unless --init-config was given.
    let input = args
        .input
        .clone()
        .context("No input file given (use --input)")?;

    // Step 1: Load the history table
    let source_format = args.effective_source_format();
    status(&args, &format!("📥 Loading test history: {}", input.display()));
    let table = source::load_table(&input, source_format, &config.source.table)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    info!(
        "Loaded {} row(s) with {} column(s)",
        table.len(),
        table.columns.len()
    );

    if !table.has_column(&config.source.serial_column) {
        warn!(
            "Serial column '{}' not found; every summary will be empty",
            config.source.serial_column
        );
    }

    let filter = RowFilter {
        date_range: args.date_range(),
        fixture: args.fixture.clone(),
    };
    let stations = args.effective_stations();

    // Serial search is a separate mode with its own output.
    if let Some(ref query) = args.search {
        return run_search(&args, &config, &table, &filter, query);
    }

    // Step 2: Analyze every station
    status(
        &args,
        &format!("\n🔬 Analyzing {} station(s)...", stations.len()),
    );
    let station_reports: Vec<_> = stations
        .iter()
        .map(|&station| {
            let profile = config.profile(station);
            analysis::analyze_station(
                station,
                &profile,
                &config.source.serial_column,
                &table,
                &filter,
            )
        })
        .collect();

    // Step 3: Build the report
    let report = Report {
        metadata: ReportMetadata {
            source: input.display().to_string(),
            table: config.source.table.clone(),
            generated_at: Local::now(),
            date_range: filter.date_range,
            fixture: filter.fixture.clone(),
        },
        stations: station_reports,
    };

    // Step 4: Generate and save the report
    status(&args, "\n📝 Generating report...");
    let output = match config.general.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Csv => report::generate_csv_report(&report),
        OutputFormat::Markdown => {
            report::generate_markdown_report(&report, config.general.details)
        }
    };
    let destination = emit(&args, config.general.format, &output)?;

    // Print summary
    let duration = start_time.elapsed().as_secs_f64();
    let true_defects = report.true_defect_total();
    status(&args, "\n📊 Analysis Summary:");
    for station in &report.stations {
        let fallback = if station.grouping.fell_back {
            " (⚠️ fallback grouping)"
        } else {
            ""
        };
        status(
            &args,
            &format!(
                "   {}: {} row(s), {} fixture(s), {} date(s), 🔴 true defects: {}{}",
                station.label,
                station.rows_analyzed,
                station.summary.len(),
                station.dates.len(),
                station.true_defect_total(),
                fallback
            ),
        );
    }
    status(&args, &format!("   Duration: {:.1}s", duration));
    if let Some(path) = destination {
        status(
            &args,
            &format!("\n✅ Analysis complete! Report saved to: {}", path.display()),
        );
    }

    // Check --fail-on-true-defect
    if args.fail_on_true_defect && true_defects > 0 {
        eprintln!(
            "\n⛔ {} true defect(s) found. Failing (exit code 2).",
            true_defects
        );
        return Ok(2);
    }

    Ok(0)
}

/// Handle --search: list matching rows per station.
fn run_search(
    args: &Args,
    config: &Config,
    table: &Table,
    filter: &RowFilter,
    query: &str,
) -> Result<i32> {
    status(args, &format!("\n🔍 Searching serial numbers for '{}'...", query));

    let results: Vec<(String, Table)> = args
        .effective_stations()
        .into_iter()
        .map(|station| {
            let profile = config.profile(station);
            let found = analysis::search_station(
                &profile,
                &config.source.serial_column,
                table,
                filter,
                query,
            );
            info!("{}: {} matching row(s)", profile.label, found.len());
            (profile.label, found)
        })
        .collect();

    let format = config.general.format;
    let output = match format {
        OutputFormat::Json => report::generate_json_search(&results)?,
        OutputFormat::Csv => report::generate_csv_search(&results),
        OutputFormat::Markdown => results
            .iter()
            .map(|(label, found)| report::generate_markdown_search(label, query, found))
            .collect(),
    };
    let destination = emit(args, format, &output)?;

    let total: usize = results.iter().map(|(_, found)| found.len()).sum();
    status(args, &format!("\n📊 {} matching row(s)", total));
    if let Some(path) = destination {
        status(args, &format!("✅ Results saved to: {}", path.display()));
    }
    Ok(0)
}

/// Write rendered output to the chosen file, or stdout with --stdout.
///
/// Returns the path written, if any.
fn emit(args: &Args, format: OutputFormat, content: &str) -> Result<Option<PathBuf>> {
    if args.stdout {
        print!("{}", content);
        return Ok(None);
    }

    let path = args.output.clone().unwrap_or_else(|| {
        PathBuf::from(format!(
            "analysis_report_{}.{}",
            Local::now().format("%Y%m%d_%H%M%S"),
            format.extension()
        ))
    });

    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    info!("Wrote {} byte(s) to {}", content.len(), path.display());
    Ok(Some(path))
}

/// Print a progress line unless quiet or writing the report to stdout.
fn status(args: &Args, line: &str) {
    if !args.quiet && !args.stdout {
        println!("{}", line);
    }
}

/// Where the configuration came from; logged once logging is initialized.
enum ConfigOrigin {
    File(PathBuf),
    Defaults,
    Unreadable(String),
}

impl ConfigOrigin {
    fn log(&self) {
        match self {
            ConfigOrigin::File(path) => info!("Loaded config from: {}", path.display()),
            ConfigOrigin::Defaults => debug!("No config file found, using defaults"),
            ConfigOrigin::Unreadable(e) => warn!("Failed to load config: {}", e),
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigOrigin)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigOrigin::File(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigOrigin::File(PathBuf::from(CONFIG_FILE_NAME)))),
        Ok(None) => Ok((Config::default(), ConfigOrigin::Defaults)),
        Err(e) => Ok((Config::default(), ConfigOrigin::Unreadable(format!("{:#}", e)))),
    }
}
