//! Terminal progress bar for a running scan.
//!
//! The engine does not report per-port completion, so progress is estimated
//! from elapsed time against a rough expected duration for the range size.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

const TICK: Duration = Duration::from_millis(100);
const BAR_TEMPLATE: &str = "[{bar:40}] {percent:>3}% ({pos}/{len} ports, {per_sec}, {msg})";

/// Expected duration of a scan over `total` ports.
pub fn expected_duration(total: u64) -> Duration {
    match total {
        t if t > 1000 => Duration::from_secs(30),
        t if t > 100 => Duration::from_secs(15),
        _ => Duration::from_secs(5),
    }
}

/// Estimated `(ports_completed, percent)` after `elapsed`. Capped at 99%
/// until the scan signals completion.
pub fn estimate(elapsed: Duration, total: u64) -> (u64, f64) {
    let fraction =
        (elapsed.as_secs_f64() / expected_duration(total).as_secs_f64()).min(0.99);
    ((total as f64 * fraction) as u64, fraction * 100.0)
}

/// Spawn the reporter. It stops and renders 100% once `done` is cancelled.
pub fn spawn(total: u64, done: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let bar = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
            bar.set_style(style.progress_chars("█░"));
        }
        let start = Instant::now();
        let mut ticker = time::interval(TICK);
        loop {
            tokio::select! {
                _ = done.cancelled() => {
                    bar.set_position(total);
                    bar.finish_with_message("done!");
                    return;
                }
                _ = ticker.tick() => {
                    let (completed, _) = estimate(start.elapsed(), total);
                    bar.set_position(completed);
                    bar.set_message("scanning");
                }
            }
        }
    })
}
