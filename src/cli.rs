use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use crate::error::ScanError;
use crate::ports::{self, PortRange};
use crate::probe::Connector;
use crate::scanner::Scanner;
use crate::types::{ScanReport, ScanTarget};

const BANNER_SNIPPET_CHARS: usize = 60;

/// lab-scan-rs — concurrent TCP connect port scanner with best-effort banner capture.
///
/// Only scan hosts you are authorised to test.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "lab-scan-rs",
    version,
    about = "Concurrent TCP connect port scanner with best-effort banner capture.",
    long_about = None
)]
pub struct Cli {
    /// Host name or IPv4 address to scan.
    pub host: String,

    /// First port of the range (1-65535).
    #[arg(value_parser = ports::parse_port)]
    pub start_port: u16,

    /// Last port of the range, inclusive (1-65535, >= start_port).
    #[arg(value_parser = ports::parse_port)]
    pub end_port: u16,

    /// Max concurrent probes (and open sockets).
    #[arg(value_parser = ports::parse_concurrency, default_value = "100")]
    pub concurrency: usize,

    /// Socket connect timeout in milliseconds.
    #[arg(long = "timeout-ms", default_value_t = 1000)]
    pub timeout_ms: u64,

    /// Bound on the post-connect banner exchange in milliseconds.
    #[arg(long = "banner-timeout-ms", default_value_t = 1000)]
    pub banner_timeout_ms: u64,

    /// Only report open ports; send nothing on the connection.
    #[arg(long = "no-banner", default_value_t = false)]
    pub no_banner: bool,

    /// Where to write the JSON report.
    #[arg(long, default_value = "scan_result.json")]
    pub output: PathBuf,

    /// Verbose logging (overrides RUST_LOG).
    #[arg(long, default_value_t = false)]
    pub debug: bool,
}

impl Cli {
    /// Validate the invocation into a scan target. No network I/O happens here.
    pub fn target(&self) -> Result<ScanTarget, ScanError> {
        let range = PortRange::new(self.start_port, self.end_port)?;
        ScanTarget::new(
            self.host.clone(),
            range,
            Duration::from_millis(self.timeout_ms),
            self.concurrency,
        )
    }

    pub fn scanner<C: Connector>(&self, connector: C) -> Scanner<C> {
        let scanner = Scanner::new(connector);
        if self.no_banner {
            scanner.without_banner()
        } else {
            scanner.with_banner_wait(Duration::from_millis(self.banner_timeout_ms))
        }
    }
}

/// Validate the invocation, print the progress line and scan to completion
/// (or until `cancel` fires).
pub async fn run<C: Connector>(
    cli: &Cli,
    connector: C,
    cancel: CancellationToken,
) -> Result<ScanReport, ScanError> {
    let target = cli.target()?;
    println!("{}", progress_line(&target));
    cli.scanner(connector)
        .scan_with_cancel(&target, cancel)
        .await
}

pub fn progress_line(target: &ScanTarget) -> String {
    format!(
        "[SCAN] {} {} concurrency={}",
        target.host(),
        target.ports(),
        target.concurrency()
    )
}

/// Human-readable summary: open ports with banner snippets, then elapsed time.
pub fn format_summary(report: &ScanReport) -> String {
    let mut out = String::new();
    if report.results.is_empty() {
        out.push_str("[RESULT] No open ports found in range.\n");
    } else {
        let ports: Vec<String> = report.results.iter().map(|p| p.port.to_string()).collect();
        out.push_str(&format!("[RESULT] Open ports: {}\n", ports.join(", ")));
        for p in &report.results {
            out.push_str(&format!("  {:>5}  {}\n", p.port, banner_snippet(&p.banner)));
        }
    }
    out.push_str(&format!("[TIME] Elapsed: {:.2}s\n", report.elapsed_seconds));
    out
}

fn banner_snippet(banner: &str) -> String {
    let escaped = banner.replace('\n', "\\n").replace('\r', "\\r");
    if escaped.chars().count() > BANNER_SNIPPET_CHARS {
        let mut s: String = escaped.chars().take(BANNER_SNIPPET_CHARS).collect();
        s.push_str("...");
        s
    } else {
        escaped
    }
}
