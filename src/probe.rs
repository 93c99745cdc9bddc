use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::{Result, ScanError};
use crate::types::ProbeOutcome;

/// Ports tried, in order, by the liveness check.
pub const LIVENESS_PORTS: [u16; 4] = [80, 443, 22, 3389];

/// Classifies one host:port. The scan engine is generic over this so the
/// pipeline can be driven by something other than real sockets.
#[async_trait]
pub trait Prober: Send + Sync + 'static {
    async fn probe(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> ProbeOutcome;
}

/// Full TCP connect prober.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProber;

#[async_trait]
impl Prober for TcpProber {
    async fn probe(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> ProbeOutcome {
        if cancel.is_cancelled() {
            return ProbeOutcome::Cancelled;
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => ProbeOutcome::Cancelled,
            res = time::timeout(timeout, TcpStream::connect((host, port))) => match res {
                Ok(Ok(stream)) => {
                    // Nothing is exchanged; banner grabbing uses its own connection.
                    drop(stream);
                    ProbeOutcome::Open
                }
                Ok(Err(e)) => {
                    trace!(host, port, error = %e, "connect failed");
                    ProbeOutcome::Closed
                }
                Err(_) => {
                    trace!(host, port, "connect timed out");
                    ProbeOutcome::Closed
                }
            },
        }
    }
}

/// Attempt one TCP connect to `host:port`.
///
/// Returns `Ok(false)` for refused, unreachable or timed-out ports and
/// `Err(ScanError::Cancelled)` only when `cancel` stopped the attempt.
pub async fn probe(
    host: &str,
    port: u16,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<bool> {
    match TcpProber.probe(host, port, timeout, cancel).await {
        ProbeOutcome::Open => Ok(true),
        ProbeOutcome::Closed => Ok(false),
        ProbeOutcome::Cancelled => Err(ScanError::Cancelled),
    }
}

/// Ad-hoc single port check without cancellation.
pub async fn probe_single(host: &str, port: u16, timeout: Duration) -> bool {
    probe(host, port, timeout, &CancellationToken::new())
        .await
        .unwrap_or(false)
}

/// Whether any of [`LIVENESS_PORTS`] accepts a connection.
pub async fn is_alive(host: &str, timeout: Duration) -> bool {
    is_alive_with_cancel(host, timeout, &CancellationToken::new()).await
}

/// Variant of [`is_alive`] that gives up as soon as `cancel` fires.
pub async fn is_alive_with_cancel(
    host: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> bool {
    is_alive_with(&TcpProber, host, &LIVENESS_PORTS, timeout, cancel).await
}

/// Try `ports` in order with `prober`, stopping at the first open one.
pub async fn is_alive_with<P: Prober + ?Sized>(
    prober: &P,
    host: &str,
    ports: &[u16],
    timeout: Duration,
    cancel: &CancellationToken,
) -> bool {
    for &port in ports {
        match prober.probe(host, port, timeout, cancel).await {
            ProbeOutcome::Open => {
                debug!(host, port, "host is alive");
                return true;
            }
            ProbeOutcome::Closed => {}
            ProbeOutcome::Cancelled => return false,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn open_listener_is_open() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        let open = probe("127.0.0.1", port, Duration::from_millis(500), &CancellationToken::new())
            .await
            .unwrap();
        assert!(open);
    }

    #[tokio::test]
    async fn released_port_is_closed_not_error() {
        let port = {
            let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
            l.local_addr().unwrap().port()
        };
        let res = probe("127.0.0.1", port, Duration::from_millis(300), &CancellationToken::new()).await;
        assert!(matches!(res, Ok(false)));
    }

    #[tokio::test]
    async fn cancelled_token_is_distinguishable() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let res = probe("127.0.0.1", 1, Duration::from_millis(300), &cancel).await;
        assert!(matches!(res, Err(ScanError::Cancelled)));
    }

    /// Records every port it is asked about; only `open` answers.
    struct Recorder {
        open: u16,
        seen: std::sync::Mutex<Vec<u16>>,
    }

    #[async_trait]
    impl Prober for Recorder {
        async fn probe(
            &self,
            _host: &str,
            port: u16,
            _timeout: Duration,
            _cancel: &CancellationToken,
        ) -> ProbeOutcome {
            self.seen.lock().unwrap().push(port);
            if port == self.open {
                ProbeOutcome::Open
            } else {
                ProbeOutcome::Closed
            }
        }
    }

    #[tokio::test]
    async fn liveness_stops_at_first_open_port() {
        let rec = Recorder { open: 443, seen: Default::default() };
        let alive = is_alive_with(
            &rec,
            "h",
            &LIVENESS_PORTS,
            Duration::from_millis(100),
            &CancellationToken::new(),
        )
        .await;
        assert!(alive);
        assert_eq!(*rec.seen.lock().unwrap(), vec![80, 443]);
    }

    #[tokio::test]
    async fn liveness_tries_every_port_before_giving_up() {
        let rec = Recorder { open: 9, seen: Default::default() };
        let alive = is_alive_with(
            &rec,
            "h",
            &LIVENESS_PORTS,
            Duration::from_millis(100),
            &CancellationToken::new(),
        )
        .await;
        assert!(!alive);
        assert_eq!(*rec.seen.lock().unwrap(), LIVENESS_PORTS.to_vec());
    }

    #[tokio::test]
    async fn liveness_on_real_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });
        let closed = {
            let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
            l.local_addr().unwrap().port()
        };
        let alive = is_alive_with(
            &TcpProber,
            "127.0.0.1",
            &[closed, port],
            Duration::from_millis(300),
            &CancellationToken::new(),
        )
        .await;
        assert!(alive);
    }

    #[tokio::test]
    async fn liveness_gives_up_when_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(!is_alive_with_cancel("127.0.0.1", Duration::from_millis(100), &cancel).await);
    }
}
