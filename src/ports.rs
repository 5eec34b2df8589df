use crate::error::ScanError;
use std::fmt;
use std::ops::RangeInclusive;

/// Inclusive TCP port range, always `1 <= start <= end <= 65535`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    start: u16,
    end: u16,
}

impl PortRange {
    pub fn new(start: u16, end: u16) -> Result<Self, ScanError> {
        if start == 0 {
            return Err(ScanError::PortOutOfRange(0));
        }
        if start > end {
            return Err(ScanError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u16 {
        self.start
    }

    pub fn end(&self) -> u16 {
        self.end
    }

    /// Number of ports in the range (never zero).
    pub fn len(&self) -> usize {
        usize::from(self.end - self.start) + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> RangeInclusive<u16> {
        self.start..=self.end
    }

    pub fn contains(&self, port: u16) -> bool {
        self.iter().contains(&port)
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Parse a single TCP port (1..=65535). Usable as a clap `value_parser`.
pub fn parse_port(s: &str) -> Result<u16, ScanError> {
    let val: u32 = s
        .trim()
        .parse()
        .map_err(|_| ScanError::InvalidPort(s.to_string()))?;
    if val == 0 || val > 65535 {
        return Err(ScanError::PortOutOfRange(val));
    }
    Ok(val as u16)
}

/// Parse a positive worker count. Usable as a clap `value_parser`.
pub fn parse_concurrency(s: &str) -> Result<usize, ScanError> {
    match s.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ScanError::InvalidConcurrency(s.to_string())),
    }
}
