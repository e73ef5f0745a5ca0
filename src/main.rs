// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;

// Use library instead of local modules
use diarias_dashboard::config::{init_logging, CliSettings, Command, FilterArgs};
use diarias_dashboard::report::render_report;
use diarias_dashboard::{load_or_empty, query, Table};

fn main() -> Result<()> {
    let settings = CliSettings::parse();
    init_logging(&settings.common.log_level)?;

    // Loaded once; every view below reads this snapshot
    let table = Arc::new(load_or_empty(&settings.common.data_file));

    match settings.command {
        Some(Command::Report(args)) => run_report(&table, &args),
        Some(Command::Tui) | None => run_ui_mode(table),
    }
}

fn run_report(table: &Table, args: &FilterArgs) -> Result<()> {
    let (entity, months) = args.filters()?;
    let view = query(table, &entity, months);
    print!("{}", render_report(&view));
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(table: Arc<Table>) -> Result<()> {
    let mut app = ui::App::new(table);
    ui::run_ui(&mut app)
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_table: Arc<Table>) -> Result<()> {
    anyhow::bail!(
        "TUI mode not available. Rebuild with `--features tui`, use `diarias report`, \
         or run the web UI with `cargo run --bin diarias-server --features server`"
    )
}
