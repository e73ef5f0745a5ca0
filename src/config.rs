// Command-line settings and logging bootstrap shared by both binaries

use crate::error::QueryError;
use crate::query::{EntityFilter, MonthRange, ALL_ENTITIES};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default report file name, as exported by the source system.
pub const DEFAULT_DATA_FILE: &str = "Relatorio.csv";

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Options every binary accepts.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Semicolon-separated Latin-1 per-diem report
    #[arg(long, env = "DIARIAS_DATA_FILE", default_value = DEFAULT_DATA_FILE)]
    pub data_file: PathBuf,

    /// Log filter (trace, debug, info, warn, error); RUST_LOG wins when set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Filter state given on the command line.
#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    /// Entity to show, or "All"
    #[arg(long, default_value = ALL_ENTITIES)]
    pub entity: String,

    /// First month of the range (1-12)
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..=12))]
    pub min_month: u32,

    /// Last month of the range (1-12)
    #[arg(long, default_value = "12", value_parser = clap::value_parser!(u32).range(1..=12))]
    pub max_month: u32,
}

impl FilterArgs {
    pub fn filters(&self) -> Result<(EntityFilter, MonthRange), QueryError> {
        let months = MonthRange::new(self.min_month, self.max_month)?;
        Ok((EntityFilter::parse(&self.entity), months))
    }
}

/// Per-diem expense dashboard
#[derive(Parser, Debug, Clone)]
#[command(name = "diarias", about = "Per-diem expense dashboard", version)]
pub struct CliSettings {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Interactive terminal dashboard (default)
    Tui,
    /// Print the dashboard for one filter state
    Report(FilterArgs),
}

/// Per-diem expense dashboard web server
#[derive(Parser, Debug, Clone)]
#[command(name = "diarias-server", about = "Per-diem expense dashboard web server", version)]
pub struct ServerSettings {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Address to listen on
    #[arg(long, env = "DIARIAS_BIND", default_value = DEFAULT_BIND)]
    pub bind: String,
}

/// Install the global `tracing` subscriber writing to stderr.
///
/// `RUST_LOG` takes precedence over `level`; an unparseable level falls back
/// to `info`.
pub fn init_logging(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.to_lowercase()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()?;

    Ok(())
}
