//! Service wiring and the HTTP boundary.
//!
//! The dashboard talks JSON to this router; requests are turned into the
//! typed install/cancel/send operations before they reach the core.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use projector_common::{command, Error, RuntimeConfig};

use crate::monitor::{LogNotifier, Notifier, OverheatMonitor, WebhookNotifier};
use crate::net::{CommandSender, TcpCommandSender};
use crate::scheduler::{CancelScheduleRequest, InstallScheduleRequest, Scheduler};
use crate::status::StatusRefresher;
use crate::store::{ControlStore, DEFAULT_DEVICE_PORT};

#[derive(Clone)]
struct AppState {
    store: ControlStore,
    sender: Arc<dyn CommandSender>,
    scheduler: Arc<Scheduler>,
    monitor: Arc<OverheatMonitor>,
    refresher: Arc<StatusRefresher>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct AckBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct SendCommandBody {
    host: String,
    #[serde(default)]
    port: Option<u16>,
    /// A catalog name like POWER_ON, or a raw hex frame.
    command: String,
}

#[derive(Debug, Serialize)]
struct SendCommandResponse {
    status: &'static str,
    response: String,
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let store = ControlStore::new();
    let mut config = store.load_config().await.unwrap_or_else(|err| {
        warn!("failed to load runtime config from store: {err}");
        RuntimeConfig::default()
    });
    config.sanitize();

    let sender: Arc<dyn CommandSender> = Arc::new(TcpCommandSender::new(Duration::from_millis(
        config.command_timeout_ms,
    )));
    let notifier: Arc<dyn Notifier> = match config.alert_webhook_url.clone() {
        Some(url) => Arc::new(WebhookNotifier::new(url)),
        None => Arc::new(LogNotifier),
    };

    let scheduler = Arc::new(
        Scheduler::new(store.clone(), sender.clone(), &config)
            .context("failed to construct scheduler")?,
    );
    let monitor = Arc::new(OverheatMonitor::new(
        store.clone(),
        sender.clone(),
        notifier,
        &config,
    ));
    let refresher = Arc::new(StatusRefresher::new(store.clone(), sender.clone()));

    let state = AppState {
        store,
        sender,
        scheduler,
        monitor,
        refresher,
    };

    let app = Router::new()
        .route("/api/devices", get(handle_get_devices))
        .route("/api/jobs", get(handle_get_jobs))
        .route("/api/schedule", post(handle_post_schedule))
        .route("/api/schedule/cancel", post(handle_post_cancel))
        .route("/api/command", post(handle_post_command))
        .route("/api/refresh", post(handle_post_refresh))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let port = std::env::var("CONTROLLER_HTTP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(config.http_port);
    let addr: SocketAddr = format!("0.0.0.0:{port}")
        .parse()
        .context("invalid listen address")?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind scheduler server at {addr}"))?;

    info!("scheduler server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn handle_get_devices(State(state): State<AppState>) -> Response {
    match state.store.load_devices().await {
        Ok(devices) => Json(devices).into_response(),
        Err(err) => error_for(&err),
    }
}

async fn handle_get_jobs(State(state): State<AppState>) -> Response {
    Json(state.scheduler.jobs().await).into_response()
}

async fn handle_post_schedule(
    State(state): State<AppState>,
    Json(request): Json<InstallScheduleRequest>,
) -> Response {
    match state.scheduler.install(&request).await {
        Ok(installed) => (
            StatusCode::OK,
            Json(AckBody {
                message: format!("Tasks scheduled successfully ({installed} jobs)"),
            }),
        )
            .into_response(),
        Err(err) => error_for(&err),
    }
}

async fn handle_post_cancel(
    State(state): State<AppState>,
    Json(request): Json<CancelScheduleRequest>,
) -> Response {
    match state.scheduler.cancel(&request).await {
        Ok(()) => (
            StatusCode::OK,
            Json(AckBody {
                message: "Tasks cancelled successfully".to_string(),
            }),
        )
            .into_response(),
        Err(err) => error_for(&err),
    }
}

async fn handle_post_command(
    State(state): State<AppState>,
    Json(body): Json<SendCommandBody>,
) -> Response {
    let frame_hex = command::by_name(&body.command)
        .map(str::to_string)
        .unwrap_or_else(|| body.command.clone());
    let frame = match command::encode_frame(&frame_hex) {
        Ok(frame) => frame,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, &err.to_string()),
    };

    // Fire-and-forget; a failed event append never fails the command.
    let event = command::name_of(&frame_hex).unwrap_or("RAW_COMMAND");
    state.store.append_event(&body.host, event).await;

    let port = body.port.unwrap_or(DEFAULT_DEVICE_PORT);
    match state.sender.send(&body.host, port, &frame).await {
        Ok(reply) => Json(SendCommandResponse {
            status: "success",
            response: command::format_frame(&reply),
        })
        .into_response(),
        Err(err) => error_for(&err),
    }
}

async fn handle_post_refresh(State(state): State<AppState>) -> Response {
    match state.refresher.refresh_all(&state.monitor).await {
        Ok(devices) => Json(devices).into_response(),
        Err(err) => error_for(&err),
    }
}

fn error_for(err: &Error) -> Response {
    let status = match err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, &err.to_string())
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}
