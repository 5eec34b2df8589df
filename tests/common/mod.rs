//! In-memory network for driving the scanner without real sockets.
#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use lab_scan_rs::probe::Connector;
use tokio::io::{duplex, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream, ReadBuf};

/// How a fake port behaves once connected.
#[derive(Debug, Clone, Copy)]
pub enum Service {
    /// Replies to the banner probe with this text.
    Banner(&'static str),
    /// Accepts the connection but never says anything.
    Silent,
    /// Accepts and immediately hangs up.
    Hangup,
    /// Connect never completes.
    Stall,
}

#[derive(Debug, Default)]
pub struct Stats {
    pub calls: AtomicUsize,
    pub active: AtomicUsize,
    pub peak: AtomicUsize,
}

impl Stats {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Counts a socket as held from the start of the connect attempt until the
/// attempt fails or the connection is dropped.
struct SocketGuard(Arc<Stats>);

impl SocketGuard {
    fn enter(stats: Arc<Stats>) -> Self {
        let now = stats.active.fetch_add(1, Ordering::SeqCst) + 1;
        stats.peak.fetch_max(now, Ordering::SeqCst);
        Self(stats)
    }
}

impl Drop for SocketGuard {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct FakeConn {
    inner: DuplexStream,
    _guard: SocketGuard,
}

impl AsyncRead for FakeConn {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for FakeConn {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

type Latency = Arc<dyn Fn(u16) -> Duration + Send + Sync>;

/// Ports not listed in `services` refuse the connection.
#[derive(Clone)]
pub struct FakeNet {
    services: Arc<HashMap<u16, Service>>,
    latency: Latency,
    pub stats: Arc<Stats>,
}

impl FakeNet {
    pub fn new(services: impl IntoIterator<Item = (u16, Service)>) -> Self {
        Self {
            services: Arc::new(services.into_iter().collect()),
            latency: Arc::new(|_| Duration::ZERO),
            stats: Arc::new(Stats::default()),
        }
    }

    /// Every port refuses.
    pub fn empty() -> Self {
        Self::new([])
    }

    pub fn with_latency(mut self, f: impl Fn(u16) -> Duration + Send + Sync + 'static) -> Self {
        self.latency = Arc::new(f);
        self
    }
}

impl Connector for FakeNet {
    type Conn = FakeConn;

    async fn open(&self, _host: &str, port: u16) -> io::Result<FakeConn> {
        self.stats.calls.fetch_add(1, Ordering::SeqCst);
        let guard = SocketGuard::enter(self.stats.clone());
        tokio::time::sleep((self.latency)(port)).await;

        let service = match self.services.get(&port) {
            Some(s) => *s,
            None => return Err(io::Error::from(io::ErrorKind::ConnectionRefused)),
        };
        let (client, server) = duplex(4096);
        match service {
            Service::Stall => std::future::pending().await,
            Service::Hangup => drop(server),
            Service::Silent => {
                tokio::spawn(hold_until_closed(server));
            }
            Service::Banner(text) => {
                tokio::spawn(reply_then_hold(server, text));
            }
        }
        Ok(FakeConn {
            inner: client,
            _guard: guard,
        })
    }
}

async fn hold_until_closed(mut server: DuplexStream) {
    let mut buf = [0u8; 64];
    while let Ok(n) = server.read(&mut buf).await {
        if n == 0 {
            break;
        }
    }
}

async fn reply_then_hold(mut server: DuplexStream, banner: &'static str) {
    let mut buf = [0u8; 64];
    if let Ok(n) = server.read(&mut buf).await {
        if n > 0 {
            let _ = server.write_all(banner.as_bytes()).await;
        }
    }
    hold_until_closed(server).await;
}
