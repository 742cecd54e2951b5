//! HTTP server for the pipeline engine.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                              |
//! |--------|-------------------|------------------------------------------|
//! | GET    | `/health`         | Health check                             |
//! | POST   | `/api/validate`   | Validate a pipeline (raw JSON body)      |
//! | POST   | `/api/run`        | Run a pipeline over CSV text             |
//! | GET    | `/api/logs`       | SSE stream for real-time logs            |

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::Value;
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{error_response, HealthResponse, RunRequest};
use crate::config::EngineConfig;
use crate::error::{ExecutionError, ServerError, ServerResult};
use crate::spec::PipelineSpec;
use crate::transform::pipeline::{run_pipeline, RunReport};
use crate::validation::{validate_json, ValidationResult};

/// Room left in a request body for the spec and JSON escaping around the CSV.
const BODY_OVERHEAD: usize = 256 * 1024;

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<EngineConfig>,
}

type ApiError = (StatusCode, Json<Value>);

pub fn router(config: EngineConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    // CSV text is escaped inside a JSON body, so allow up to twice its size.
    let body_limit = config.max_input_bytes.saturating_mul(2).saturating_add(BODY_OVERHEAD);
    let state = AppState {
        config: Arc::new(config),
    };

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/validate", post(validate_pipeline))
        .route("/api/run", post(run_pipeline_handler))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(config: EngineConfig) -> ServerResult<()> {
    let port = config.port;
    let app = router(config);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    log_info(format!("Pipeline server running on http://localhost:{port}"));
    log_info("POST /api/validate - Validate a pipeline");
    log_info("POST /api/run      - Run a pipeline");
    log_info("GET  /api/logs     - SSE log stream");
    log_info("GET  /health       - Health check");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Internal(format!("cannot bind {addr}: {e}")))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?;

    Ok(())
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "pipeline-engine".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        max_input_bytes: state.config.max_input_bytes,
    })
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    // Lagged receivers skip what they missed.
    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

async fn validate_pipeline(body: String) -> Json<ValidationResult> {
    Json(validate_json(&body))
}

async fn run_pipeline_handler(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<RunReport>, ApiError> {
    let request: RunRequest = serde_json::from_str(&body)
        .map_err(|e| reject(ServerError::BadRequest(e.to_string())))?;
    let options = request.run_options(&state.config).map_err(reject)?;
    let spec = PipelineSpec::from_value(request.spec)
        .map_err(|e| reject(ExecutionError::from(e).into()))?;
    let csv = request.csv;

    let report = tokio::task::spawn_blocking(move || run_pipeline(&spec, &csv, &options))
        .await
        .map_err(|e| reject(ServerError::Internal(e.to_string())))?
        .map_err(|e| reject(e.into()))?;

    Ok(Json(report))
}

fn status_for(err: &ServerError) -> StatusCode {
    match err {
        ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
        ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ServerError::Execution(exec) => match exec {
            ExecutionError::Spec(_) | ExecutionError::Csv(_) => StatusCode::BAD_REQUEST,
            ExecutionError::InputTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ExecutionError::InvalidPipeline(_) => StatusCode::UNPROCESSABLE_ENTITY,
        },
    }
}

fn reject(err: ServerError) -> ApiError {
    let message = err.to_string();
    log_error(message.as_str());
    (status_for(&err), Json(error_response(&message)))
}
