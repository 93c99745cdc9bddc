use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::banner::grab_banner;
use crate::error::Result;
use crate::probe::{is_alive_with, Prober, TcpProber, LIVENESS_PORTS};
use crate::report::now_rfc3339;
use crate::scanner;
use crate::services::{guess_os, service_name};
use crate::types::{HostReport, PortInfo, ScanConfig, ScanResult};

/// Per-host scan parameters shared by every host of a multi-host run.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub start_port: u16,
    pub end_port: u16,
    pub concurrency: usize,
    pub timeout: Duration,
    pub liveness_timeout: Duration,
    pub show_progress: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            start_port: 1,
            end_port: 1000,
            concurrency: 100,
            timeout: Duration::from_millis(500),
            liveness_timeout: Duration::from_millis(500),
            show_progress: false,
        }
    }
}

impl ScanOptions {
    pub fn config_for(&self, host: &str, cancel: CancellationToken) -> Result<ScanConfig> {
        ScanConfig::builder(host)
            .ports(self.start_port, self.end_port)
            .concurrency(self.concurrency)
            .timeout(self.timeout)
            .show_progress(self.show_progress)
            .cancel_token(cancel)
            .build()
    }
}

/// Attach service names and banners to open ports, sorted by port.
///
/// Banner failures leave the banner empty.
pub async fn annotate(host: &str, open_ports: &[u16], timeout: Duration) -> Vec<PortInfo> {
    let mut ports = open_ports.to_vec();
    ports.sort_unstable();
    let mut out = Vec::with_capacity(ports.len());
    for port in ports {
        let banner = match grab_banner(host, port, timeout).await {
            Ok(b) => b,
            Err(e) => {
                debug!(host, port, error = %e, "no banner");
                String::new()
            }
        };
        out.push(PortInfo {
            port,
            service: service_name(port).to_string(),
            banner,
        });
    }
    out
}

/// Build a history/report entry from a finished scan.
///
/// Banners are only fetched for completed scans; a cancelled scan keeps its
/// partial ports with service names alone.
pub async fn host_report(host: &str, result: &ScanResult, banner_timeout: Duration) -> HostReport {
    let ports = if result.is_cancelled() {
        result
            .sorted_ports()
            .into_iter()
            .map(|port| PortInfo {
                port,
                service: service_name(port).to_string(),
                banner: String::new(),
            })
            .collect()
    } else {
        annotate(host, &result.open_ports, banner_timeout).await
    };
    let numbers: Vec<u16> = ports.iter().map(|p| p.port).collect();
    HostReport {
        host: host.to_string(),
        os_guess: guess_os(&numbers).to_string(),
        ports,
        status: result.status,
        timestamp: now_rfc3339(),
        duration_ms: result.elapsed.as_millis() as u64,
    }
}

/// Scan and annotate a single host.
pub async fn scan_host(
    host: &str,
    opts: &ScanOptions,
    cancel: CancellationToken,
) -> Result<HostReport> {
    scan_host_with(Arc::new(TcpProber), host, opts, cancel).await
}

pub async fn scan_host_with<P: Prober>(
    prober: Arc<P>,
    host: &str,
    opts: &ScanOptions,
    cancel: CancellationToken,
) -> Result<HostReport> {
    let cfg = opts.config_for(host, cancel)?;
    let result = scanner::scan_with(prober, &cfg).await?;
    Ok(host_report(host, &result, opts.timeout).await)
}

/// Scan several hosts one after another, skipping those that fail the
/// liveness check. Stops before the next host once `cancel` fires.
pub async fn scan_hosts(
    hosts: &[String],
    opts: &ScanOptions,
    cancel: CancellationToken,
) -> Result<Vec<HostReport>> {
    scan_hosts_with(Arc::new(TcpProber), hosts, opts, cancel).await
}

pub async fn scan_hosts_with<P: Prober>(
    prober: Arc<P>,
    hosts: &[String],
    opts: &ScanOptions,
    cancel: CancellationToken,
) -> Result<Vec<HostReport>> {
    let mut reports = Vec::new();
    for host in hosts {
        if cancel.is_cancelled() {
            info!("multi-host scan cancelled");
            break;
        }
        let alive = is_alive_with(
            prober.as_ref(),
            host,
            &LIVENESS_PORTS,
            opts.liveness_timeout,
            &cancel,
        )
        .await;
        if !alive {
            info!(host = %host, "host appears to be down, skipping");
            continue;
        }
        reports.push(scan_host_with(prober.clone(), host, opts, cancel.clone()).await?);
    }
    Ok(reports)
}
