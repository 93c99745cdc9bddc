use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{self, Instant};
use tracing::debug;

use crate::error::{Result, ScanError};

/// Maximum visible banner length before the ellipsis is appended.
pub const MAX_BANNER_CHARS: usize = 100;
const ELLIPSIS: &str = "...";
const READ_BUF: usize = 1024;

/// Request written before reading, for services that wait for the client.
///
/// FTP, SSH and SMTP greet first, so they (and unknown ports) get nothing.
pub fn probe_request(host: &str, port: u16) -> Option<String> {
    match port {
        80 | 8080 => Some(format!("GET / HTTP/1.0\r\nHost: {host}\r\n\r\n")),
        _ => None,
    }
}

/// Open a fresh connection to a port already known to be open and read one
/// short response.
///
/// The whole exchange after connecting is bounded by `timeout`. Any failure
/// means "no banner" to the caller; it never affects the scan itself.
pub async fn grab_banner(host: &str, port: u16, timeout: Duration) -> Result<String> {
    let mut stream = match time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(s)) => s,
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => return Err(ScanError::Timeout),
    };
    let deadline = Instant::now() + timeout;

    if let Some(req) = probe_request(host, port) {
        match time::timeout_at(deadline, stream.write_all(req.as_bytes())).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(ScanError::Timeout),
        }
    }

    let mut buf = vec![0u8; READ_BUF];
    let n = match time::timeout_at(deadline, stream.read(&mut buf)).await {
        Ok(Ok(0)) => return Err(ScanError::EmptyBanner),
        Ok(Ok(n)) => n,
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => return Err(ScanError::Timeout),
    };
    debug!(host, port, bytes = n, "banner read");

    Ok(sanitize_banner(&String::from_utf8_lossy(&buf[..n])))
}

/// Flatten line breaks to single spaces and cap the visible length.
pub fn sanitize_banner(raw: &str) -> String {
    let flat = raw.replace("\r\n", " ").replace(['\n', '\r'], " ");
    if flat.chars().count() <= MAX_BANNER_CHARS {
        return flat;
    }
    let mut out: String = flat.chars().take(MAX_BANNER_CHARS).collect();
    out.push_str(ELLIPSIS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssh_greeting_keeps_trailing_space() {
        assert_eq!(
            sanitize_banner("SSH-2.0-OpenSSH_8.9\r\n"),
            "SSH-2.0-OpenSSH_8.9 "
        );
    }

    #[test]
    fn long_banner_truncated_with_ellipsis() {
        let raw = "x".repeat(500);
        let out = sanitize_banner(&raw);
        assert_eq!(out.chars().count(), MAX_BANNER_CHARS + ELLIPSIS.len());
        assert!(out.ends_with("..."));
    }

    #[test]
    fn exactly_limit_is_untouched() {
        let raw = "y".repeat(MAX_BANNER_CHARS);
        assert_eq!(sanitize_banner(&raw), raw);
    }

    #[test]
    fn multibyte_truncation_stays_on_char_boundary() {
        let raw = "é".repeat(150);
        let out = sanitize_banner(&raw);
        assert_eq!(out.chars().count(), 103);
    }

    #[test]
    fn no_raw_line_breaks_survive() {
        let out = sanitize_banner("220 mail\r\nready\nnow\rok");
        assert_eq!(out, "220 mail ready now ok");
    }

    #[test]
    fn http_ports_get_request() {
        let req = probe_request("example.com", 80).unwrap();
        assert!(req.starts_with("GET / HTTP/1.0\r\n"));
        assert!(req.contains("Host: example.com"));
        assert!(probe_request("h", 22).is_none());
        assert!(probe_request("h", 25).is_none());
    }
}
