use crate::error::ScanError;
use crate::ports::PortRange;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

/// What to scan and how hard. Immutable for the duration of one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    host: String,
    ports: PortRange,
    timeout_per_port: Duration,
    concurrency: usize,
}

impl ScanTarget {
    pub fn new(
        host: impl Into<String>,
        ports: PortRange,
        timeout_per_port: Duration,
        concurrency: usize,
    ) -> Result<Self, ScanError> {
        if concurrency == 0 {
            return Err(ScanError::InvalidConcurrency(concurrency.to_string()));
        }
        Ok(Self {
            host: host.into(),
            ports,
            timeout_per_port,
            concurrency,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn ports(&self) -> PortRange {
        self.ports
    }

    pub fn timeout_per_port(&self) -> Duration {
        self.timeout_per_port
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }
}

/// Terminal state of one probe. Closed ports never carry a banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortState {
    Open { banner: String },
    Closed,
}

/// Outcome of probing a single port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortProbeResult {
    pub port: u16,
    pub state: PortState,
}

impl PortProbeResult {
    pub fn open(port: u16, banner: impl Into<String>) -> Self {
        Self {
            port,
            state: PortState::Open {
                banner: banner.into(),
            },
        }
    }

    pub fn closed(port: u16) -> Self {
        Self {
            port,
            state: PortState::Closed,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, PortState::Open { .. })
    }

    /// Captured banner; empty for closed ports or when nothing was read.
    pub fn banner(&self) -> &str {
        match &self.state {
            PortState::Open { banner } => banner,
            PortState::Closed => "",
        }
    }
}

/// One open port as it appears in the JSON report.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OpenPort {
    pub port: u16,
    pub banner: String,
}

/// Every outcome collected during one scan, in completion order.
#[derive(Debug, Clone)]
pub struct Sweep {
    pub outcomes: Vec<PortProbeResult>,
    pub elapsed: Duration,
}

/// Final aggregated result of one full-range scan.
///
/// Field names and nesting are the on-disk format read by downstream tooling.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScanReport {
    pub host: String,
    pub range: String,
    pub results: Vec<OpenPort>,
    #[serde(rename = "time")]
    pub elapsed_seconds: f64,
}

impl ScanReport {
    /// Keep open ports only, ascending by port, regardless of completion order.
    pub fn assemble(target: &ScanTarget, sweep: Sweep) -> Self {
        let mut results: Vec<OpenPort> = sweep
            .outcomes
            .into_iter()
            .filter_map(|r| match r.state {
                PortState::Open { banner } => Some(OpenPort {
                    port: r.port,
                    banner,
                }),
                PortState::Closed => None,
            })
            .collect();
        results.sort_by_key(|p| p.port);

        Self {
            host: target.host().to_string(),
            range: target.ports().to_string(),
            results,
            elapsed_seconds: sweep.elapsed.as_secs_f64(),
        }
    }

    pub fn open_ports(&self) -> Vec<u16> {
        self.results.iter().map(|p| p.port).collect()
    }

    /// Write the report as pretty JSON, replacing any existing file.
    pub fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        let file = File::create(path)
            .with_context(|| format!("failed to create report file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}
