use crate::error::ScanError;
use crate::probe::{self, Connector, TcpConnector};
use crate::types::{PortProbeResult, ScanReport, ScanTarget, Sweep};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default bound on the post-connect banner exchange.
pub const DEFAULT_BANNER_WAIT: Duration = Duration::from_millis(1000);

/// Scan coordinator: fans probes out over a port range with a hard cap on
/// concurrent probes, then aggregates their outcomes.
#[derive(Debug, Clone)]
pub struct Scanner<C = TcpConnector> {
    connector: Arc<C>,
    banner_wait: Option<Duration>,
}

impl Scanner<TcpConnector> {
    pub fn tcp() -> Self {
        Self::new(TcpConnector)
    }
}

impl<C: Connector> Scanner<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector: Arc::new(connector),
            banner_wait: Some(DEFAULT_BANNER_WAIT),
        }
    }

    pub fn with_banner_wait(mut self, wait: Duration) -> Self {
        self.banner_wait = Some(wait);
        self
    }

    /// Report open ports without sending anything on the connection.
    pub fn without_banner(mut self) -> Self {
        self.banner_wait = None;
        self
    }

    /// Probe every port of `target` and return the sorted report.
    ///
    /// Does not return until the whole range has been probed.
    pub async fn scan(&self, target: &ScanTarget) -> ScanReport {
        let sweep = self.sweep(target).await;
        ScanReport::assemble(target, sweep)
    }

    /// Like [`Scanner::scan`], but stops early when `cancel` fires.
    pub async fn scan_with_cancel(
        &self,
        target: &ScanTarget,
        cancel: CancellationToken,
    ) -> Result<ScanReport, ScanError> {
        let (sweep, cancelled) = self.sweep_internal(target, cancel).await;
        if cancelled {
            return Err(ScanError::Cancelled {
                probed: sweep.outcomes.len(),
                total: target.ports().len(),
            });
        }
        Ok(ScanReport::assemble(target, sweep))
    }

    /// Probe every port and return all outcomes in completion order.
    pub async fn sweep(&self, target: &ScanTarget) -> Sweep {
        let (sweep, _) = self
            .sweep_internal(target, CancellationToken::new())
            .await;
        sweep
    }

    async fn sweep_internal(
        &self,
        target: &ScanTarget,
        cancel: CancellationToken,
    ) -> (Sweep, bool) {
        let range = target.ports();
        let host: Arc<str> = Arc::from(target.host());
        let timeout = target.timeout_per_port();
        let banner_wait = self.banner_wait;

        info!(
            host = %host,
            ports = %range,
            concurrency = target.concurrency(),
            timeout_ms = timeout.as_millis() as u64,
            "scan started"
        );

        // Permits beyond the number of ports add nothing, and tokio caps the total.
        let permits = target
            .concurrency()
            .min(range.len())
            .min(Semaphore::MAX_PERMITS);
        let sem = Arc::new(Semaphore::new(permits));
        let mut set = JoinSet::new();
        let mut outcomes: Vec<PortProbeResult> = Vec::with_capacity(range.len());
        let mut cancelled = false;
        let started = Instant::now();

        for port in range.iter() {
            // A permit is held by each task until it finishes, so no more than
            // `concurrency` probes (and sockets) exist at any time.
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                permit = sem.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let connector = self.connector.clone();
            let host = host.clone();
            set.spawn(async move {
                let _permit = permit;
                probe::probe_port(&*connector, &host, port, timeout, banner_wait).await
            });

            while let Some(res) = set.try_join_next() {
                record(&mut outcomes, res);
            }
        }

        if cancelled {
            set.abort_all();
        }

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled(), if !cancelled => {
                    cancelled = true;
                    set.abort_all();
                }
                res = set.join_next() => match res {
                    Some(res) => record(&mut outcomes, res),
                    None => break,
                },
            }
        }

        let elapsed = started.elapsed();
        let open = outcomes.iter().filter(|r| r.is_open()).count();
        if cancelled {
            warn!(
                probed = outcomes.len(),
                total = range.len(),
                "scan cancelled"
            );
        } else {
            info!(
                probed = outcomes.len(),
                open,
                elapsed_ms = elapsed.as_millis() as u64,
                "scan complete"
            );
        }

        (Sweep { outcomes, elapsed }, cancelled)
    }
}

fn record(outcomes: &mut Vec<PortProbeResult>, res: Result<PortProbeResult, JoinError>) {
    match res {
        Ok(result) => {
            if result.is_open() {
                debug!(port = result.port, banner = result.banner(), "port open");
            }
            outcomes.push(result);
        }
        Err(e) if e.is_cancelled() => {}
        Err(e) => warn!(error = %e, "probe task failed"),
    }
}
