//! CLI logging initialisation
//!
//! Per-phase filtering on top of `tracing-subscriber`.

use crate::config::LogConfig;
use clap::ValueEnum;
use ebs_config::Phase;
use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Log output format
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Colored, multi-line (development)
    Pretty,
    Compact,
    /// One JSON object per event (tool integration)
    Json,
}

fn targets(log_config: &LogConfig) -> Targets {
    Phase::ALL
        .into_iter()
        .fold(Targets::new().with_default(log_config.global), |targets, phase| {
            targets.with_target(phase.target(), log_config.level_for(phase))
        })
}

/// Install the global subscriber. Logs go to stderr, or to `file` when given,
/// so they never mix with script output.
pub fn init(log_config: &LogConfig, format: LogFormat, file: Option<&Path>) -> io::Result<()> {
    let targets = targets(log_config);

    match file {
        Some(path) => {
            let handle = Arc::new(
                std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?,
            );
            let layer = format_layer(format, move || FileWriter(Arc::clone(&handle)));
            tracing_subscriber::registry()
                .with(layer.with_filter(targets))
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(format_layer(format, io::stderr).with_filter(targets))
                .init();
        }
    }
    Ok(())
}

/// Shared handle so every event appends to the same file
struct FileWriter(Arc<File>);

impl io::Write for FileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&*self.0).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        (&*self.0).flush()
    }
}

fn format_layer<W, F>(format: LogFormat, make_writer: F) -> Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync>
where
    W: io::Write + 'static,
    F: Fn() -> W + Send + Sync + 'static,
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_target(true)
            .with_writer(make_writer)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .without_time()
            .with_writer(make_writer)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_writer(make_writer)
            .boxed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn test_targets_per_phase() {
        let mut log = LogConfig::default();
        log.apply_override("interpreter=debug").unwrap();
        let targets = targets(&log);
        assert!(targets.would_enable("ebs::interpreter", &Level::DEBUG));
        assert!(!targets.would_enable("ebs::parser", &Level::DEBUG));
        assert!(targets.would_enable("ebs::parser", &Level::WARN));
    }
}
