//! EBS CLI - run a script file
//!
//! `ebs <script>` parses and runs the script, with imports resolved relative
//! to the script's directory. Script errors exit with status 1.

use clap::Parser;
use ebs_api::{init_config, run_file, BuiltinRegistry, EbsError, RunConfig, Value};
use std::path::{Path, PathBuf};
use std::process;

mod config;
mod logging;

use crate::config::{parse_level, FileSettings, LogConfig};
use crate::logging::LogFormat;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum ErrorFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "ebs", about = "EBS scripting language - run a script", version)]
struct Cli {
    /// Script to run
    #[arg(value_name = "SCRIPT")]
    script: PathBuf,

    /// JSON settings file (limits, log levels)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Global log level: silent, error, warn, info, debug, trace
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Per-phase log level, e.g. `--log parser=trace` (repeatable)
    #[arg(long = "log", value_name = "PHASE=LEVEL")]
    phase_logs: Vec<String>,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Stop any single loop after this many iterations
    #[arg(long, value_name = "N")]
    max_loop_iterations: Option<u64>,

    #[arg(long, value_enum, default_value_t = ErrorFormat::Text)]
    error_format: ErrorFormat,
}

fn main() {
    let cli = Cli::parse();

    let run_config = match setup(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    };

    if let Err(e) = init_config(run_config.clone()) {
        eprintln!("Error: {}", e);
        process::exit(2);
    }

    match run_file(&cli.script, &run_config, BuiltinRegistry::new()) {
        Ok(output) => {
            if !matches!(output.value, Value::Null) {
                println!("{}", output.value);
            }
        }
        Err(e) => {
            report_error(&e, &cli.script, cli.error_format);
            process::exit(1);
        }
    }
}

/// Combine the settings file and flags, then start logging
fn setup(cli: &Cli) -> Result<RunConfig, String> {
    let settings = match &cli.config {
        Some(path) => FileSettings::load(path)?,
        None => FileSettings::default(),
    };

    let mut log = LogConfig::default();
    settings.apply_to(&mut log)?;
    if let Some(level) = &cli.log_level {
        log.global = parse_level(level)?;
    }
    for spec in &cli.phase_logs {
        log.apply_override(spec)?;
    }
    logging::init(&log, cli.log_format, cli.log_file.as_deref())
        .map_err(|e| format!("Cannot open log file: {e}"))?;

    let mut config = RunConfig::default();
    if let Some(limits) = settings.limits {
        config.limits = limits;
    }
    if cli.max_loop_iterations.is_some() {
        config.limits.max_loop_iterations = cli.max_loop_iterations;
    }
    Ok(config)
}

fn report_error(e: &EbsError, script: &Path, format: ErrorFormat) {
    let report = e.to_report();
    match format {
        ErrorFormat::Json => eprintln!("{}", report.to_json()),
        ErrorFormat::Text => {
            eprintln!("{}: {}", script.display(), report);
            if let (Some(line), Ok(source)) = (report.line, std::fs::read_to_string(script)) {
                print_source_context(&source, line, report.column);
            }
        }
    }
}

/// Print the lines around `error_line`, with a caret under the column if known
fn print_source_context(source: &str, error_line: usize, error_col: Option<usize>) {
    const CONTEXT_LINES: usize = 2;

    let lines: Vec<&str> = source.lines().collect();
    if error_line == 0 || error_line > lines.len() {
        return;
    }

    let start = error_line.saturating_sub(CONTEXT_LINES).max(1);
    let end = (error_line + CONTEXT_LINES).min(lines.len());
    let width = end.to_string().len();

    for line_no in start..=end {
        eprintln!("{:>width$} | {}", line_no, lines[line_no - 1]);
        if line_no == error_line {
            if let Some(col) = error_col {
                eprintln!("{:>width$} | {}^", "", " ".repeat(col.saturating_sub(1)));
            }
        }
    }
}
