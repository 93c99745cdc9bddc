use std::sync::Arc;
use tokio::sync::RwLock;

use crate::types::HostReport;

/// Process-wide record of completed scans, newest first.
///
/// Readers share the lock; each finished scan takes it exclusively once.
#[derive(Clone, Default)]
pub struct ScanHistory {
    inner: Arc<RwLock<Vec<HostReport>>>,
}

impl ScanHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, report: HostReport) {
        self.inner.write().await.insert(0, report);
    }

    pub async fn snapshot(&self) -> Vec<HostReport> {
        self.inner.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScanStatus;

    fn entry(host: &str) -> HostReport {
        HostReport {
            host: host.into(),
            ports: Vec::new(),
            os_guess: "Unknown OS".into(),
            status: ScanStatus::Completed,
            timestamp: String::new(),
            duration_ms: 0,
        }
    }

    #[tokio::test]
    async fn newest_first_and_clear() {
        let history = ScanHistory::new();
        history.record(entry("a")).await;
        history.record(entry("b")).await;
        let snap = history.snapshot().await;
        assert_eq!(snap[0].host, "b");
        assert_eq!(snap[1].host, "a");

        history.clear().await;
        assert!(history.is_empty().await);
    }
}
