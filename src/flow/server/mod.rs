// SPDX-License-Identifier: MIT

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::engine::{ChannelObserver, FlowError, NoopObserver, RunEvent, RunMode};
use crate::flow::config::EngineConfig;
use crate::flow::invokers::SimulatedInvoker;
use crate::flow::workflow::graph::{validate, FlowRunner, ValidationReport};
use crate::flow::workflow::history::{ExecutionHistory, ExecutionRecord, ExecutionStats};
use crate::flow::workflow::loader::FlowLoader;
use crate::flow::workflow::types::{FlowGraph, FlowRecord};

/// Shared by every handler
pub struct AppState {
    config: EngineConfig,
    loader: FlowLoader,
    runner: FlowRunner,
    history: RwLock<ExecutionHistory>,
}

impl AppState {
    pub fn new(config: EngineConfig) -> Self {
        let invoker = Arc::new(SimulatedInvoker::new(config.simulation.clone()));
        let runner = FlowRunner::new(invoker).with_step_delay(config.step_delay);
        Self::with_runner(config, runner)
    }

    pub fn with_runner(config: EngineConfig, runner: FlowRunner) -> Self {
        Self {
            config,
            loader: FlowLoader::new(),
            runner,
            history: RwLock::new(ExecutionHistory::new()),
        }
    }
}

type SharedState = Arc<AppState>;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/flows", get(list_flows))
        .route("/api/flows/validate", post(validate_flow))
        .route("/api/flows/{id}", get(get_flow))
        .route("/api/executions", get(list_executions).post(create_execution))
        .route("/api/executions/stats", get(execution_stats))
        .route("/api/executions/stream", post(stream_execution))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(config: EngineConfig, port: u16) -> Result<(), FlowError> {
    log::info!("Serving flows from {}", config.flows_dir.display());
    let app = router(Arc::new(AppState::new(config)));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// `FlowError` rendered as `{"error": ...}` with a matching status code
pub struct ApiError(FlowError);

impl From<FlowError> for ApiError {
    fn from(err: FlowError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            FlowError::FlowNotFound(_) => StatusCode::NOT_FOUND,
            FlowError::Validation(_)
            | FlowError::UnsupportedFormat(_)
            | FlowError::Json(_)
            | FlowError::Yaml(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_flows(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    let dir = &state.config.flows_dir;
    if !dir.exists() {
        return Ok(Json(json!([])));
    }

    let mut flows = Vec::new();
    for path in state.loader.list_flows(dir)? {
        let Some(id) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
            continue;
        };
        match state.loader.load_flow(&path) {
            Ok(flow) => flows.push(json!({
                "id": id,
                "name": flow.display_name(),
                "description": flow.description,
                "nodeCount": flow.nodes.len(),
                "file": path.to_string_lossy(),
            })),
            Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
        }
    }
    Ok(Json(json!(flows)))
}

fn find_flow(state: &AppState, id: &str) -> Result<FlowRecord, FlowError> {
    let path = state
        .loader
        .find_flow(&state.config.flows_dir, id)
        .ok_or_else(|| FlowError::FlowNotFound(id.to_string()))?;
    state.loader.load_flow(path)
}

async fn get_flow(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<FlowRecord>, ApiError> {
    Ok(Json(find_flow(&state, &id)?))
}

async fn validate_flow(Json(graph): Json<FlowGraph>) -> Json<ValidationReport> {
    Json(validate(&graph.nodes, &graph.edges))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    #[serde(default)]
    flow_id: Option<String>,
    #[serde(default)]
    flow: Option<FlowRecord>,
    #[serde(default)]
    mode: RunMode,
}

/// Inline flow wins over `flowId`. Static runs are refused for flows that
/// fail validation; dynamic runs terminate on cycles by themselves.
fn prepare(state: &AppState, request: ExecutionRequest) -> Result<FlowRecord, FlowError> {
    let flow = match (request.flow, request.flow_id) {
        (Some(flow), _) => flow,
        (None, Some(id)) => find_flow(state, &id)?,
        (None, None) => {
            return Err(FlowError::validation(
                "execution request needs either flowId or flow",
            ))
        }
    };

    if request.mode == RunMode::Static {
        let report = validate(&flow.nodes, &flow.edges);
        if !report.valid {
            return Err(FlowError::validation(report.message));
        }
    }
    Ok(flow)
}

async fn create_execution(
    State(state): State<SharedState>,
    Json(request): Json<ExecutionRequest>,
) -> Result<Json<ExecutionRecord>, ApiError> {
    let mode = request.mode;
    let flow = prepare(&state, request)?;
    log::info!("Executing flow {} ({} mode)", flow.display_name(), mode);

    let start = Utc::now();
    let summary = state
        .runner
        .run(mode, &flow.nodes, &flow.edges, &mut NoopObserver)
        .await;
    let record = ExecutionRecord::new(&flow, &summary, start, Utc::now());

    state.history.write().await.record(record.clone());
    Ok(Json(record))
}

async fn stream_execution(
    State(state): State<SharedState>,
    Json(request): Json<ExecutionRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let mode = request.mode;
    let flow = prepare(&state, request)?;
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        log::info!(
            "Starting streaming execution for flow {} ({} mode)",
            flow.display_name(),
            mode
        );
        let mut observer = ChannelObserver::new(tx);
        let start = Utc::now();
        let summary = state
            .runner
            .run(mode, &flow.nodes, &flow.edges, &mut observer)
            .await;
        let record = ExecutionRecord::new(&flow, &summary, start, Utc::now());
        state.history.write().await.record(record);
        log::info!("Streaming execution finished");
    });

    let stream = UnboundedReceiverStream::new(rx).map(|event: RunEvent| {
        Ok(Event::default().json_data(&event).unwrap_or_else(|e| {
            log::error!("Failed to encode run event: {}", e);
            Event::default().event("error").data(e.to_string())
        }))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(1))))
}

async fn list_executions(State(state): State<SharedState>) -> Json<Vec<ExecutionRecord>> {
    Json(state.history.read().await.to_vec())
}

async fn execution_stats(State(state): State<SharedState>) -> Json<ExecutionStats> {
    Json(state.history.read().await.stats())
}
