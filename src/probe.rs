//! Per-port probing: a bounded-time connect followed by a best-effort banner read.
use crate::types::PortProbeResult;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{lookup_host, TcpStream};
use tokio::time;
use tracing::trace;

/// Bytes sent to an open port to coax a response out of it.
pub const BANNER_PROBE: &[u8] = b"HEAD / HTTP/1.0\r\n\r\n";

/// Upper bound on banner bytes read from one port.
pub const BANNER_MAX_BYTES: usize = 1024;

/// Transport used to open a connection to `(host, port)`.
///
/// Implementations report every failure as an `io::Error`; the connect
/// timeout is applied by [`connect`], not by the implementation.
pub trait Connector: Send + Sync + 'static {
    type Conn: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn open(&self, host: &str, port: u16) -> impl Future<Output = io::Result<Self::Conn>> + Send;
}

/// Plain TCP over IPv4, resolving `host` through the system resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Conn = TcpStream;

    async fn open(&self, host: &str, port: u16) -> io::Result<TcpStream> {
        let mut last_err = None;
        for addr in lookup_host((host, port)).await?.filter(SocketAddr::is_ipv4) {
            match TcpStream::connect(addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("no IPv4 address for {host}"),
            )
        }))
    }
}

/// Result of a connect attempt. Failures carry no cause on purpose.
#[derive(Debug)]
pub enum ConnectOutcome<C> {
    Open(C),
    Closed,
}

/// Open a connection, giving up after `timeout`. Any failure is `Closed`.
pub async fn connect<C: Connector>(
    connector: &C,
    host: &str,
    port: u16,
    timeout: Duration,
) -> ConnectOutcome<C::Conn> {
    match time::timeout(timeout, connector.open(host, port)).await {
        Ok(Ok(conn)) => ConnectOutcome::Open(conn),
        Ok(Err(e)) => {
            trace!(host, port, error = %e, "connect failed");
            ConnectOutcome::Closed
        }
        Err(_) => {
            trace!(host, port, "connect timed out");
            ConnectOutcome::Closed
        }
    }
}

/// Send [`BANNER_PROBE`] and read one response chunk within `wait`.
///
/// Never fails: send/receive errors, timeouts and immediate EOF all give an
/// empty string.
pub async fn read_banner<S>(stream: &mut S, wait: Duration) -> String
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let exchange = async {
        stream.write_all(BANNER_PROBE).await?;
        let mut buf = vec![0u8; BANNER_MAX_BYTES];
        let n = stream.read(&mut buf).await?;
        buf.truncate(n);
        Ok::<_, io::Error>(buf)
    };
    match time::timeout(wait, exchange).await {
        Ok(Ok(buf)) => decode_banner(&buf),
        Ok(Err(e)) => {
            trace!(error = %e, "banner exchange failed");
            String::new()
        }
        Err(_) => String::new(),
    }
}

/// Drop invalid UTF-8 sequences and trim surrounding whitespace.
pub fn decode_banner(raw: &[u8]) -> String {
    let text: String = raw.utf8_chunks().map(|chunk| chunk.valid()).collect();
    text.trim().to_string()
}

/// Probe one port: connect, then read a banner unless `banner_wait` is `None`.
///
/// The connection is dropped before returning on every path.
pub async fn probe_port<C: Connector>(
    connector: &C,
    host: &str,
    port: u16,
    timeout: Duration,
    banner_wait: Option<Duration>,
) -> PortProbeResult {
    match connect(connector, host, port, timeout).await {
        ConnectOutcome::Open(mut conn) => {
            let banner = match banner_wait {
                Some(wait) => read_banner(&mut conn, wait).await,
                None => String::new(),
            };
            drop(conn);
            PortProbeResult::open(port, banner)
        }
        ConnectOutcome::Closed => PortProbeResult::closed(port),
    }
}
