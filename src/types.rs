use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, ScanError};

/// Immutable parameters for one engine run. Build with [`ScanConfig::builder`].
#[derive(Debug, Clone)]
pub struct ScanConfig {
    host: String,
    start_port: u16,
    end_port: u16,
    concurrency: usize,
    timeout: Duration,
    show_progress: bool,
    cancel: CancellationToken,
}

impl ScanConfig {
    pub fn builder(host: impl Into<String>) -> ScanConfigBuilder {
        ScanConfigBuilder::new(host)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn start_port(&self) -> u16 {
        self.start_port
    }

    pub fn end_port(&self) -> u16 {
        self.end_port
    }

    /// Number of ports in the inclusive range.
    pub fn port_count(&self) -> usize {
        (self.end_port - self.start_port) as usize + 1
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn show_progress(&self) -> bool {
        self.show_progress
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

#[derive(Debug, Clone)]
pub struct ScanConfigBuilder {
    host: String,
    start_port: u16,
    end_port: u16,
    concurrency: usize,
    timeout: Duration,
    show_progress: bool,
    cancel: Option<CancellationToken>,
}

impl ScanConfigBuilder {
    fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            start_port: 1,
            end_port: 1024,
            concurrency: 100,
            timeout: Duration::from_secs(1),
            show_progress: false,
            cancel: None,
        }
    }

    pub fn ports(mut self, start: u16, end: u16) -> Self {
        self.start_port = start;
        self.end_port = end;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Share an existing token so the caller (or a deadline task) can stop the scan.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Validate and freeze the configuration.
    ///
    /// A zero concurrency limit is rejected here: with no workers draining the
    /// work queue the feeder would block forever once the queue fills.
    pub fn build(self) -> Result<ScanConfig> {
        let host = self.host.trim().to_string();
        if host.is_empty() {
            return Err(ScanError::InvalidConfig("host must not be empty".into()));
        }
        if self.start_port == 0 || self.end_port == 0 {
            return Err(ScanError::InvalidConfig(
                "ports must be between 1 and 65535".into(),
            ));
        }
        if self.start_port > self.end_port {
            return Err(ScanError::InvalidConfig(format!(
                "start port {} is greater than end port {}",
                self.start_port, self.end_port
            )));
        }
        if self.concurrency == 0 {
            return Err(ScanError::InvalidConfig(
                "concurrency must be at least 1".into(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(ScanError::InvalidConfig("timeout must be positive".into()));
        }
        Ok(ScanConfig {
            host,
            start_port: self.start_port,
            end_port: self.end_port,
            concurrency: self.concurrency,
            timeout: self.timeout,
            show_progress: self.show_progress,
            cancel: self.cancel.unwrap_or_default(),
        })
    }
}

/// Classification of a single connect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Open,
    Closed,
    Cancelled,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Completed,
    Cancelled,
}

/// Output of one engine run.
///
/// `open_ports` is in probe completion order, not port order. Sort it if
/// stable output is needed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub open_ports: Vec<u16>,
    pub status: ScanStatus,
    pub elapsed: Duration,
}

impl ScanResult {
    pub fn is_cancelled(&self) -> bool {
        self.status == ScanStatus::Cancelled
    }

    /// The error that accompanies a cancelled (partial) result.
    pub fn error(&self) -> Option<ScanError> {
        self.is_cancelled().then_some(ScanError::Cancelled)
    }

    /// Open ports in ascending order.
    pub fn sorted_ports(&self) -> Vec<u16> {
        let mut ports = self.open_ports.clone();
        ports.sort_unstable();
        ports
    }

    /// Treat cancellation as an error, discarding the partial set.
    pub fn into_completed(self) -> Result<Self> {
        match self.status {
            ScanStatus::Completed => Ok(self),
            ScanStatus::Cancelled => Err(ScanError::Cancelled),
        }
    }
}

/// An open port annotated by the caller after the scan.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub port: u16,
    pub service: String,
    pub banner: String,
}

/// One host's annotated scan, as kept in the history and rendered in reports.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HostReport {
    pub host: String,
    pub ports: Vec<PortInfo>,
    pub os_guess: String,
    pub status: ScanStatus,
    pub timestamp: String,
    pub duration_ms: u64,
}

impl HostReport {
    pub fn port_numbers(&self) -> Vec<u16> {
        self.ports.iter().map(|p| p.port).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_are_valid() {
        let cfg = ScanConfig::builder("localhost").build().unwrap();
        assert_eq!(cfg.start_port(), 1);
        assert_eq!(cfg.end_port(), 1024);
        assert_eq!(cfg.port_count(), 1024);
        assert_eq!(cfg.concurrency(), 100);
        assert!(!cfg.cancel_token().is_cancelled());
    }

    #[test]
    fn rejects_zero_concurrency() {
        let err = ScanConfig::builder("localhost")
            .concurrency(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ScanError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_bad_ranges_and_timeout() {
        assert!(ScanConfig::builder("h").ports(0, 10).build().is_err());
        assert!(ScanConfig::builder("h").ports(10, 9).build().is_err());
        assert!(ScanConfig::builder("h")
            .timeout(Duration::ZERO)
            .build()
            .is_err());
        assert!(ScanConfig::builder("  ").build().is_err());
    }

    #[test]
    fn full_port_space_counts() {
        let cfg = ScanConfig::builder("h").ports(1, 65535).build().unwrap();
        assert_eq!(cfg.port_count(), 65535);
    }

    #[test]
    fn cancelled_result_carries_error() {
        let res = ScanResult {
            open_ports: vec![443, 22],
            status: ScanStatus::Cancelled,
            elapsed: Duration::from_millis(5),
        };
        assert!(res.error().is_some_and(|e| e.is_cancelled()));
        assert_eq!(res.sorted_ports(), vec![22, 443]);
        assert!(res.into_completed().is_err());
    }
}
