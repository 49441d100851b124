//! # Scanner Replay
//!
//! Command-line entry point.

use std::io::Write;

use clap::Parser;
use scanner_replay::{run, CliArgs, ReplayConfig, ReplayScript};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing on stderr. stdout carries records only.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,scanner_core=debug,scanner_replay=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    // Use JSON format when piping into log tooling (RUST_LOG_FORMAT=json)
    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ReplayConfig::from(CliArgs::parse());
    let script = ReplayScript::load(&config.script)?;
    tracing::info!(
        script = %config.script.display(),
        steps = script.steps.len(),
        "Replaying session"
    );

    let records = run(&script);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut printed = 0usize;
    for record in records.iter().filter(|r| config.keeps(r)) {
        if config.pretty {
            serde_json::to_writer_pretty(&mut out, record)?;
        } else {
            serde_json::to_writer(&mut out, record)?;
        }
        writeln!(out)?;
        printed += 1;
    }
    out.flush()?;

    tracing::info!(total = records.len(), printed, "Replay finished");
    Ok(())
}
