use std::{future::Future, sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info};

use crate::{
    history::ScanHistory,
    runner::{self, ScanOptions},
    types::HostReport,
};

/// Hard deadline for a scan started from the web UI.
pub const WEB_SCAN_DEADLINE: Duration = Duration::from_secs(120);

#[derive(Clone, Default)]
pub struct AppState {
    history: ScanHistory,
    inner: Arc<RwLock<ServerState>>, // at most one web-triggered scan at a time
}

#[derive(Debug, Default)]
struct ServerState {
    in_progress: bool,
    cancel: Option<CancellationToken>,
}

impl AppState {
    pub fn new(history: ScanHistory) -> Self {
        Self {
            history,
            inner: Arc::default(),
        }
    }

    pub fn history(&self) -> &ScanHistory {
        &self.history
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Status {
    pub in_progress: bool,
    pub scans: usize,
}

/// Scan form. Out-of-range numbers fall back to defaults instead of failing.
#[derive(Debug, Default, Deserialize)]
pub struct ScanRequest {
    pub host: String,
    #[serde(default)]
    pub start: Option<i64>,
    #[serde(default)]
    pub end: Option<i64>,
    #[serde(default)]
    pub timeout_ms: Option<i64>,
    #[serde(default)]
    pub threads: Option<i64>,
}

impl ScanRequest {
    pub fn to_options(&self) -> ScanOptions {
        let start = self
            .start
            .filter(|s| (1..=65535).contains(s))
            .unwrap_or(1);
        let end = self
            .end
            .filter(|e| (1..=65535).contains(e) && *e >= start)
            .unwrap_or_else(|| (start + 1000).min(65535));
        let timeout_ms = self
            .timeout_ms
            .filter(|t| (100..=10_000).contains(t))
            .unwrap_or(500);
        let threads = self
            .threads
            .filter(|t| (10..=500).contains(t))
            .unwrap_or(100);
        ScanOptions {
            start_port: start as u16,
            end_port: end as u16,
            concurrency: threads as usize,
            timeout: Duration::from_millis(timeout_ms as u64),
            show_progress: false,
            ..ScanOptions::default()
        }
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/status", get(get_status))
        .route("/scan", post(post_scan))
        .route("/cancel", post(post_cancel))
        .route("/results", get(get_results))
        .route("/clear", post(post_clear))
        .with_state(state);

    let static_svc = ServeDir::new("ui").append_index_html_on_directories(true);

    Router::new()
        .nest("/api", api)
        .fallback_service(static_svc)
        .layer(TraceLayer::new_for_http())
}

pub async fn spawn_server(bind: &str, history: ScanHistory) -> Result<()> {
    let app = router(AppState::new(history));
    info!("serving UI on http://{}", bind);
    axum::serve(tokio::net::TcpListener::bind(bind).await?, app).await?;
    Ok(())
}

async fn get_status(State(app): State<AppState>) -> impl IntoResponse {
    let in_progress = app.inner.read().await.in_progress;
    let scans = app.history.len().await;
    (StatusCode::OK, Json(Status { in_progress, scans }))
}

async fn get_results(State(app): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(app.history.snapshot().await))
}

async fn post_clear(State(app): State<AppState>) -> impl IntoResponse {
    app.history.clear().await;
    StatusCode::NO_CONTENT
}

async fn post_cancel(State(app): State<AppState>) -> impl IntoResponse {
    let s = app.inner.read().await;
    match s.cancel.as_ref() {
        Some(c) => {
            c.cancel();
            StatusCode::ACCEPTED
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn post_scan(State(app): State<AppState>, Json(req): Json<ScanRequest>) -> impl IntoResponse {
    let host = req.host.trim().to_string();
    if host.is_empty() {
        return (StatusCode::BAD_REQUEST, "Host is required").into_response();
    }
    let opts = req.to_options();
    let cancel = CancellationToken::new();

    {
        let mut s = app.inner.write().await;
        if s.in_progress {
            return (StatusCode::CONFLICT, "A scan is already in progress").into_response();
        }
        s.in_progress = true;
        s.cancel = Some(cancel.clone());
    }

    let host_for_log = host.clone();
    let deadline = cancel.clone();
    let job = async move {
        let watchdog = tokio::spawn(async move {
            tokio::time::sleep(WEB_SCAN_DEADLINE).await;
            deadline.cancel();
        });
        let report = runner::scan_host(&host, &opts, cancel).await;
        watchdog.abort();
        report
    };
    tokio::spawn(run_tracked(app, host_for_log, job));

    (StatusCode::ACCEPTED, "Scan started").into_response()
}

/// Run `job` as its own task, record its report, then release the scan slot.
///
/// The slot is released even if `job` panics.
async fn run_tracked<F>(app: AppState, host: String, job: F)
where
    F: Future<Output = crate::error::Result<HostReport>> + Send + 'static,
{
    match tokio::spawn(job).await {
        Ok(Ok(report)) => app.history.record(report).await,
        Ok(Err(e)) => error!(host = %host, error = %e, "web scan failed"),
        Err(e) => error!(host = %host, error = %e, "web scan task died"),
    }
    let mut s = app.inner.write().await;
    s.in_progress = false;
    s.cancel = None;
}
