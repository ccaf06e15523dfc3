//! Mock prayer-times API
//!
//! Serves the `timings`, `timingsByCity`, `calendar` and `calendarByCity`
//! endpoints with fixed London times. Individual dates can be made to fail
//! with a 500, to answer with a non-JSON body, or to answer late.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

#[derive(Default)]
struct MockAladhanState {
    /// `DD-MM-YYYY` dates answered with a 500.
    failing: HashSet<String>,
    /// `DD-MM-YYYY` dates answered with an HTML page.
    garbage: HashSet<String>,
    /// `DD-MM-YYYY` dates answered only after `slow_delay`.
    slow: HashSet<String>,
    slow_delay: Duration,
    /// Request paths in arrival order.
    requests: Vec<String>,
    /// Query string of the most recent request.
    last_query: HashMap<String, String>,
}

type SharedState = Arc<RwLock<MockAladhanState>>;

pub struct MockAladhanServer {
    addr: SocketAddr,
    state: SharedState,
    handle: JoinHandle<()>,
}

impl MockAladhanServer {
    /// Start the mock on a random port
    pub async fn start() -> Self {
        let state: SharedState = Arc::new(RwLock::new(MockAladhanState::default()));

        let app = Router::new()
            .route("/v1/timings/{date}", get(handle_timings))
            .route("/v1/timingsByCity/{date}", get(handle_timings))
            .route("/v1/calendar/{year}/{month}", get(handle_calendar))
            .route("/v1/calendarByCity/{year}/{month}", get(handle_calendar))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Answer requests for `date` (`DD-MM-YYYY`) with a 500
    pub async fn fail_date(&self, date: &str) {
        self.state.write().await.failing.insert(date.to_string());
    }

    /// Answer requests for `date` (`DD-MM-YYYY`) with a non-JSON body
    pub async fn garble_date(&self, date: &str) {
        self.state.write().await.garbage.insert(date.to_string());
    }

    /// Hold the answer for `date` (`DD-MM-YYYY`) for `delay`
    pub async fn delay_date(&self, date: &str, delay: Duration) {
        let mut state = self.state.write().await;
        state.slow.insert(date.to_string());
        state.slow_delay = delay;
    }

    pub async fn request_count(&self) -> usize {
        self.state.read().await.requests.len()
    }

    pub async fn requests(&self) -> Vec<String> {
        self.state.read().await.requests.clone()
    }

    pub async fn last_query(&self) -> HashMap<String, String> {
        self.state.read().await.last_query.clone()
    }

    pub async fn stop(self) {
        self.handle.abort();
    }
}

async fn handle_timings(
    State(state): State<SharedState>,
    Path(date): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let (failing, garbage, delay) = {
        let mut state = state.write().await;
        state.requests.push(format!("timings/{}", date));
        state.last_query = query.clone();
        let delay = state.slow.contains(&date).then_some(state.slow_delay);
        (
            state.failing.contains(&date),
            state.garbage.contains(&date),
            delay,
        )
    };

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    if failing {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response();
    }
    if garbage {
        return (StatusCode::OK, "<html>maintenance</html>").into_response();
    }
    let Ok(parsed) = NaiveDate::parse_from_str(&date, "%d-%m-%Y") else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "code": 400, "status": "BAD_REQUEST", "data": "Invalid date" })),
        )
            .into_response();
    };

    Json(json!({
        "code": 200,
        "status": "OK",
        "data": day_json(parsed, &query),
    }))
    .into_response()
}

async fn handle_calendar(
    State(state): State<SharedState>,
    Path((year, month)): Path<(i32, u32)>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mut state = state.write().await;
    state.requests.push(format!("calendar/{}/{}", year, month));
    state.last_query = query.clone();

    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return (StatusCode::BAD_REQUEST, "bad month").into_response();
    };
    let days: Vec<Value> = first
        .iter_days()
        .take_while(|d| d.format("%m").to_string() == first.format("%m").to_string())
        .map(|d| day_json(d, &query))
        .collect();

    Json(json!({ "code": 200, "status": "OK", "data": days })).into_response()
}

fn day_json(date: NaiveDate, query: &HashMap<String, String>) -> Value {
    let method_id: u32 = query
        .get("method")
        .and_then(|m| m.parse().ok())
        .unwrap_or(3);
    json!({
        "timings": {
            "Fajr": "06:06 (UTC)",
            "Sunrise": "08:06 (UTC)",
            "Dhuhr": "12:08 (UTC)",
            "Asr": "13:46 (UTC)",
            "Sunset": "16:02 (UTC)",
            "Maghrib": "16:02 (UTC)",
            "Isha": "17:56 (UTC)",
            "Midnight": "00:07 (UTC)"
        },
        "date": {
            "readable": date.format("%d %b %Y").to_string(),
            "gregorian": {
                "date": date.format("%d-%m-%Y").to_string(),
                "year": date.format("%Y").to_string()
            },
            "hijri": {
                "date": "01-07-1446",
                "day": "01",
                "month": { "number": 7, "en": "Rajab" },
                "year": "1446"
            }
        },
        "meta": {
            "latitude": 51.5074,
            "longitude": -0.1278,
            "timezone": "UTC",
            "method": { "id": method_id, "name": "Muslim World League" }
        }
    })
}
