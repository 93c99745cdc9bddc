use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::probe::{Prober, TcpProber};
use crate::progress;
use crate::types::{ProbeOutcome, ScanConfig, ScanResult, ScanStatus};

/// Upper bound on the work and result queue depth.
pub const MAX_QUEUE_DEPTH: usize = 1000;

/// Scan every port in the configured range with real TCP connects.
///
/// Returns `Ok` with `status == Cancelled` and the ports found so far when
/// the config's token fires mid-scan. `open_ports` has no guaranteed order.
///
/// Configuration errors are rejected by [`ScanConfig::builder`], so once a
/// `ScanConfig` exists this is always `Ok`. The `Result` stays for callers
/// chaining it after `build()?`.
pub async fn scan(config: &ScanConfig) -> Result<ScanResult> {
    scan_with(Arc::new(TcpProber), config).await
}

/// Run the scan pipeline with a custom [`Prober`].
///
/// Stages:
/// - a feeder pushes `start..=end` into a bounded work queue;
/// - `concurrency` workers draw from it and publish open ports;
/// - a barrier task waits for every worker, then closes the result queue;
/// - the calling task collects results while the workers run.
///
/// Dropping the returned future cancels every stage; the caller's token is
/// left untouched.
pub async fn scan_with<P: Prober>(prober: Arc<P>, config: &ScanConfig) -> Result<ScanResult> {
    let started = Instant::now();
    let host: Arc<str> = Arc::from(config.host());
    let cancel = config.cancel_token().child_token();
    let _stop_on_drop = cancel.clone().drop_guard();
    let total = config.port_count();
    let depth = total.min(MAX_QUEUE_DEPTH);

    info!(
        host = %host,
        start = config.start_port(),
        end = config.end_port(),
        concurrency = config.concurrency(),
        timeout_ms = config.timeout().as_millis() as u64,
        "starting scan"
    );

    let (work_tx, work_rx) = mpsc::channel::<u16>(depth);
    let (result_tx, mut result_rx) = mpsc::channel::<u16>(depth);
    let work_rx = Arc::new(Mutex::new(work_rx));

    // Fire-and-forget: the reporter finishes on its own once signalled.
    let progress_done = cancel.child_token();
    if config.show_progress() {
        progress::spawn(total as u64, progress_done.clone());
    }

    // Feeder
    let feeder_cancel = cancel.clone();
    let (start_port, end_port) = (config.start_port(), config.end_port());
    tokio::spawn(async move {
        for port in start_port..=end_port {
            tokio::select! {
                biased;
                _ = feeder_cancel.cancelled() => break,
                sent = work_tx.send(port) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }
        // work_tx dropped here: the queue closes once drained.
    });

    // Workers
    let mut workers = JoinSet::new();
    for _ in 0..config.concurrency() {
        workers.spawn(worker(
            prober.clone(),
            host.clone(),
            config.timeout(),
            work_rx.clone(),
            result_tx.clone(),
            cancel.clone(),
        ));
    }

    // Completion barrier: the last holder of a result sender, so the
    // collector's loop ends only after every worker has exited.
    let (done_tx, done_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "scan worker aborted");
            }
        }
        drop(result_tx);
        let _ = done_tx.send(());
    });

    // Collector
    let mut open_ports = Vec::new();
    while let Some(port) = result_rx.recv().await {
        debug!(host = %host, port, "open");
        open_ports.push(port);
    }
    let _ = done_rx.await;

    progress_done.cancel();

    let status = if cancel.is_cancelled() {
        ScanStatus::Cancelled
    } else {
        ScanStatus::Completed
    };
    let elapsed = started.elapsed();
    match status {
        ScanStatus::Completed => info!(
            host = %host,
            open = open_ports.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "scan completed"
        ),
        ScanStatus::Cancelled => warn!(
            host = %host,
            open = open_ports.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "scan cancelled, returning partial results"
        ),
    }

    Ok(ScanResult {
        open_ports,
        status,
        elapsed,
    })
}

async fn worker<P: Prober>(
    prober: Arc<P>,
    host: Arc<str>,
    timeout: std::time::Duration,
    work_rx: Arc<Mutex<mpsc::Receiver<u16>>>,
    result_tx: mpsc::Sender<u16>,
    cancel: CancellationToken,
) {
    loop {
        let next = {
            let mut rx = work_rx.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                port = rx.recv() => port,
            }
        };
        let Some(port) = next else {
            return;
        };

        match prober.probe(&host, port, timeout, &cancel).await {
            ProbeOutcome::Cancelled => return,
            ProbeOutcome::Closed => continue,
            ProbeOutcome::Open => {}
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            sent = result_tx.send(port) => {
                if sent.is_err() {
                    return;
                }
            }
        }
    }
}
