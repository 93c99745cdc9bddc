use ::time::{format_description::well_known, OffsetDateTime};
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use crate::services::{guess_os, service_name};
use crate::types::HostReport;

/// RFC3339 UTC timestamp for report rows and history entries.
pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}

/// Write one `Host,Port,Service,Timestamp` row per open port.
pub fn write_csv<W: Write>(writer: W, reports: &[HostReport]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["Host", "Port", "Service", "Timestamp"])
        .context("error writing CSV header")?;
    let timestamp = now_rfc3339();
    for report in reports {
        for info in &report.ports {
            let port = info.port.to_string();
            wtr.write_record([
                report.host.as_str(),
                port.as_str(),
                service_name(info.port),
                timestamp.as_str(),
            ])
            .context("error writing CSV row")?;
        }
    }
    wtr.flush()?;
    Ok(())
}

pub fn save_csv(path: &Path, reports: &[HostReport]) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("error creating CSV file: {}", path.display()))?;
    write_csv(file, reports)
}

/// Round to whole seconds and render as `1h 2m 3s`, `2m 3s` or `3s`.
pub fn format_duration(d: Duration) -> String {
    let secs = (d.as_millis() + 500) / 1000;
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h {m}m {s}s")
    } else if m > 0 {
        format!("{m}m {s}s")
    } else {
        format!("{s}s")
    }
}

/// One-line summary of a host's open ports, in the order given.
pub fn format_summary(host: &str, open_ports: &[u16]) -> String {
    if open_ports.is_empty() {
        return format!("No open ports found on {host}");
    }
    let describe = |ports: &[u16]| {
        ports
            .iter()
            .map(|p| format!("{p} ({})", service_name(*p)))
            .collect::<Vec<_>>()
            .join(", ")
    };
    if open_ports.len() <= 10 {
        format!(
            "{} open ports on {host}: {}",
            open_ports.len(),
            describe(open_ports)
        )
    } else {
        format!(
            "{} open ports on {host} including: {}, ...",
            open_ports.len(),
            describe(&open_ports[..5])
        )
    }
}

/// Plain-text report over several hosts.
pub fn generate_report(reports: &[HostReport], elapsed: Duration) -> String {
    let port_count: usize = reports.iter().map(|r| r.ports.len()).sum();
    let mut out = String::new();
    let _ = writeln!(out, "PORT SCANNER REPORT");
    let _ = writeln!(out, "=================\n");
    let _ = writeln!(out, "Scan completed at: {}", now_rfc3339());
    let _ = writeln!(out, "Duration: {}", format_duration(elapsed));
    let _ = writeln!(out, "Hosts scanned: {}", reports.len());
    let _ = writeln!(out, "Open ports found: {port_count}\n");
    let _ = writeln!(out, "DETAILED RESULTS");
    let _ = writeln!(out, "----------------\n");

    for report in reports {
        let _ = writeln!(out, "Host: {}", report.host);
        let _ = writeln!(out, "Open ports: {}", report.ports.len());
        if report.ports.is_empty() {
            let _ = writeln!(out, "No open ports found");
        } else {
            let _ = writeln!(out, "OS Detection: {}", guess_os(&report.port_numbers()));
            let _ = writeln!(out, "PORT\tSERVICE");
            let _ = writeln!(out, "----\t-------");
            for info in &report.ports {
                let _ = writeln!(out, "{}\t{}", info.port, info.service);
            }
        }
        out.push('\n');
    }
    out.push_str("Scan completed successfully\n");
    out
}

pub fn save_report(path: &Path, report: &str) -> Result<()> {
    std::fs::write(path, report)
        .with_context(|| format!("error writing report: {}", path.display()))
}
