use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::{Duration, sleep};

pub const PATH_LIFT_RIDES: &str = "/skiers/liftrides";
pub const PATH_SKIER_DAY_VERTICAL: &str = "/skiers/{resort}/days/{day}/skiers/{skier}";

/// Vertical metres credited per lift id unit.
const VERTICAL_PER_LIFT: u64 = 10;

#[derive(Debug, Clone, Copy, Default)]
pub struct TestServerOptions {
    /// Answer every n-th request (counted across both routes) with `500`.
    pub fail_every: Option<u64>,
    /// Artificial delay before each response.
    pub delay: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct TestServerStats {
    requests_total: Arc<AtomicU64>,
    lift_rides_total: Arc<AtomicU64>,
    vertical_reads_total: Arc<AtomicU64>,
    rejected_total: Arc<AtomicU64>,
    injected_failures_total: Arc<AtomicU64>,
}

impl TestServerStats {
    /// Counts the request and returns its 1-based sequence number.
    fn inc_requests_total(&self) -> u64 {
        self.requests_total.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn inc_lift_rides_total(&self) {
        self.lift_rides_total.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_vertical_reads_total(&self) {
        self.vertical_reads_total.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_rejected_total(&self) {
        self.rejected_total.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_injected_failures_total(&self) {
        self.injected_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    /// Lift rides accepted with `201`.
    pub fn lift_rides_total(&self) -> u64 {
        self.lift_rides_total.load(Ordering::Relaxed)
    }

    pub fn vertical_reads_total(&self) -> u64 {
        self.vertical_reads_total.load(Ordering::Relaxed)
    }

    /// Lift rides rejected with `400`.
    pub fn rejected_total(&self) -> u64 {
        self.rejected_total.load(Ordering::Relaxed)
    }

    pub fn injected_failures_total(&self) -> u64 {
        self.injected_failures_total.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Deserialize)]
struct LiftRideBody {
    #[serde(rename = "resortID")]
    resort_id: String,
    #[serde(rename = "dayID")]
    day_id: u32,
    #[serde(rename = "skierID")]
    skier_id: u32,
    #[serde(rename = "liftID")]
    lift_id: u32,
}

#[derive(Debug, Serialize)]
struct SkierDayVertical {
    #[serde(rename = "resortID")]
    resort_id: String,
    #[serde(rename = "dayID")]
    day_id: u32,
    #[serde(rename = "skierID")]
    skier_id: u32,
    #[serde(rename = "totalVert")]
    total_vert: u64,
}

type VerticalKey = (String, u32, u32);

#[derive(Debug, Default)]
struct AppState {
    stats: TestServerStats,
    options: TestServerOptions,
    vertical: Mutex<HashMap<VerticalKey, u64>>,
}

impl AppState {
    /// Applies the configured delay, then decides whether this request is an injected failure.
    async fn admit(&self) -> bool {
        let seq = self.stats.inc_requests_total();
        if let Some(delay) = self.options.delay {
            sleep(delay).await;
        }
        match self.options.fail_every {
            Some(n) if n > 0 && seq % n == 0 => {
                self.stats.inc_injected_failures_total();
                false
            }
            _ => true,
        }
    }
}

async fn handle_lift_ride(State(state): State<Arc<AppState>>, body: Bytes) -> StatusCode {
    if !state.admit().await {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }

    let ride: LiftRideBody = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => {
            state.stats.inc_rejected_total();
            return StatusCode::BAD_REQUEST;
        }
    };
    if ride.resort_id.is_empty() || ride.skier_id == 0 {
        state.stats.inc_rejected_total();
        return StatusCode::BAD_REQUEST;
    }

    {
        let mut vertical = state
            .vertical
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *vertical
            .entry((ride.resort_id, ride.day_id, ride.skier_id))
            .or_insert(0) += u64::from(ride.lift_id) * VERTICAL_PER_LIFT;
    }
    state.stats.inc_lift_rides_total();
    StatusCode::CREATED
}

async fn handle_skier_day_vertical(
    State(state): State<Arc<AppState>>,
    Path((resort_id, day_id, skier_id)): Path<(String, u32, u32)>,
) -> (StatusCode, Bytes) {
    if !state.admit().await {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Bytes::from_static(b"injected failure"),
        );
    }

    let total_vert = state
        .vertical
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .get(&(resort_id.clone(), day_id, skier_id))
        .copied()
        .unwrap_or(0);
    state.stats.inc_vertical_reads_total();

    let res = SkierDayVertical {
        resort_id,
        day_id,
        skier_id,
        total_vert,
    };
    match serde_json::to_vec(&res) {
        Ok(bytes) => (StatusCode::OK, Bytes::from(bytes)),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Bytes::from_static(b"encode error"),
        ),
    }
}

pub fn router(stats: TestServerStats, options: TestServerOptions) -> Router {
    let state = Arc::new(AppState {
        stats,
        options,
        vertical: Mutex::new(HashMap::new()),
    });
    Router::new()
        .route(PATH_LIFT_RIDES, post(handle_lift_ride))
        .route(PATH_SKIER_DAY_VERTICAL, get(handle_skier_day_vertical))
        .with_state(state)
}

pub struct TestServer {
    addr: SocketAddr,
    base_url: String,
    stats: TestServerStats,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> std::io::Result<Self> {
        Self::start_with(TestServerOptions::default()).await
    }

    pub async fn start_with(options: TestServerOptions) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let stats = TestServerStats::default();
        let app = router(stats.clone(), options);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = serve.await;
        });

        Ok(Self {
            addr,
            base_url: format!("http://{addr}"),
            stats,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn stats(&self) -> &TestServerStats {
        &self.stats
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}
