use std::{path::PathBuf, sync::Arc};

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};

use crate::{
    config::AppConfig,
    error::{GridcastError, GridcastResult},
    graph, layout, signaling,
    worker::WorkerManager,
};

/// Shared state behind the control API. The manager is the single mutable
/// resource; configuration is re-read from `config_path` on every mutating
/// request.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<WorkerManager>,
    pub config_path: PathBuf,
    pub offer_path: PathBuf,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/start", post(start))
        .route("/stop", post(stop))
        .route("/update", post(update))
        .route("/offer", post(offer))
        .with_state(state)
}

#[derive(serde::Serialize)]
struct StatusBody {
    status: &'static str,
}

#[derive(serde::Serialize)]
struct UpdateBody {
    status: &'static str,
    composite: Vec<String>,
}

#[derive(serde::Serialize)]
struct OfferErrorBody {
    error: &'static str,
}

fn status_response(code: StatusCode, status: &'static str) -> Response {
    (code, Json(StatusBody { status })).into_response()
}

/// Manager operations block (a stop waits up to its bound), so they run on
/// the blocking pool rather than a runtime worker.
async fn blocking<T, F>(f: F) -> GridcastResult<T>
where
    F: FnOnce() -> GridcastResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| GridcastError::Other(anyhow::anyhow!("worker operation panicked: {e}")))?
}

async fn start(State(state): State<AppState>) -> Response {
    match run_start(&state).await {
        Ok(pid) => {
            tracing::info!(pid, "pipeline started");
            status_response(StatusCode::OK, "started")
        }
        Err(e) => {
            tracing::error!(error = %e, "start request failed");
            status_response(StatusCode::BAD_REQUEST, "already running or error")
        }
    }
}

async fn run_start(state: &AppState) -> GridcastResult<u32> {
    let config = AppConfig::load(&state.config_path)?;
    let planned = layout::plan(&config.feeds, &config.composite)?;
    let graph = graph::build(&planned, &config.webrtc)?;
    let manager = state.manager.clone();
    blocking(move || manager.start(graph)).await
}

async fn stop(State(state): State<AppState>) -> Response {
    let manager = state.manager.clone();
    match blocking(move || manager.stop()).await {
        Ok(_) => status_response(StatusCode::OK, "stopped"),
        Err(GridcastError::NotRunning) => status_response(StatusCode::BAD_REQUEST, "not running"),
        Err(e) => {
            tracing::error!(error = %e, "stop request failed");
            status_response(StatusCode::INTERNAL_SERVER_ERROR, "error")
        }
    }
}

async fn update(State(state): State<AppState>, body: Bytes) -> Response {
    let composite = parse_composite(&body);

    let config = match AppConfig::load(&state.config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "update request could not load configuration");
            return status_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to update");
        }
    };

    let Some(composite) = composite else {
        // Invalid input still tears the worker down: update stops
        // unconditionally before anything else happens.
        stop_quietly(&state).await;
        tracing::error!("invalid composite list in update request");
        return status_response(StatusCode::BAD_REQUEST, "invalid composite");
    };

    let graph = match layout::plan(&config.feeds, &composite)
        .and_then(|planned| graph::build(&planned, &config.webrtc))
    {
        Ok(graph) => graph,
        Err(e @ GridcastError::NoValidFeeds(_)) => {
            stop_quietly(&state).await;
            tracing::error!(error = %e, "update composite resolves to no known feeds");
            return status_response(StatusCode::BAD_REQUEST, "invalid composite");
        }
        Err(e) => {
            stop_quietly(&state).await;
            tracing::error!(error = %e, "failed to build updated pipeline");
            return status_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to update");
        }
    };

    // Stop-then-start as one serialized critical section: racing updates
    // cannot interleave between the two halves.
    let manager = state.manager.clone();
    match blocking(move || manager.replace(graph)).await {
        Ok(pid) => {
            tracing::info!(pid, "pipeline updated");
            (
                StatusCode::OK,
                Json(UpdateBody {
                    status: "updated",
                    composite,
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start updated pipeline");
            status_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to update")
        }
    }
}

async fn stop_quietly(state: &AppState) {
    let manager = state.manager.clone();
    match blocking(move || manager.stop()).await {
        Ok(_) | Err(GridcastError::NotRunning) => {}
        Err(e) => tracing::warn!(error = %e, "pre-update stop failed"),
    }
}

/// Extract `composite` from an update request body. `None` covers every
/// malformed shape: unparseable JSON, missing key, non-array, non-string
/// elements, or an empty list.
fn parse_composite(body: &[u8]) -> Option<Vec<String>> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    let names: Vec<String> = serde_json::from_value(value.get("composite")?.clone()).ok()?;
    if names.is_empty() {
        return None;
    }
    Some(names)
}

async fn offer(State(state): State<AppState>, body: Bytes) -> Response {
    let sdp = serde_json::from_slice::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("sdp").and_then(|s| s.as_str()).map(str::to_owned));

    let Some(sdp) = sdp.filter(|s| !s.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(OfferErrorBody {
                error: "No SDP offer provided",
            }),
        )
            .into_response();
    };

    if let Err(e) = signaling::store_offer(&state.offer_path, &sdp) {
        tracing::error!(error = %e, "failed to persist client offer");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(OfferErrorBody {
                error: "failed to store offer",
            }),
        )
            .into_response();
    }

    (StatusCode::OK, Json(signaling::placeholder_answer())).into_response()
}
