use anyhow::Result;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lab_scan_rs::cli::{self, Cli};
use lab_scan_rs::probe::TcpConnector;
use lab_scan_rs::ScanError;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the report.
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Ctrl-C cancels the scan.
    let cancel = CancellationToken::new();
    let cancel_ctrlc = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_ctrlc.cancel();
        }
    });

    let report = match cli::run(&cli, TcpConnector, cancel).await {
        Ok(report) => report,
        Err(e @ ScanError::Cancelled { .. }) => {
            eprintln!("Interrupted: {e}");
            std::process::exit(130);
        }
        Err(e) => Cli::command().error(ErrorKind::ValueValidation, e).exit(),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    print!("{}", cli::format_summary(&report));
    report.write_json(&cli.output)?;
    println!("[SAVED] {}", cli.output.display());

    Ok(())
}
