//! Library crate for lab-scan-rs: a concurrent TCP connect port scanner with
//! best-effort banner capture.
pub mod cli;
pub mod error;
pub mod ports;
pub mod probe;
pub mod scanner;
pub mod types;

pub use error::ScanError;
pub use scanner::Scanner;
pub use types::{PortProbeResult, PortState, ScanReport, ScanTarget};
