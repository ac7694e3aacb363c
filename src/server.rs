//! HTTP surface: one upload endpoint, one log endpoint, and a health
//! check.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::normalize::SheetRow;
use crate::reconcile::{ReconcileContext, ReconcileMode, ReconcileOutcome, Reconciler};
use crate::store::auth::ServiceCredentials;
use crate::store::{GoogleSheetsStore, InMemorySheetStore};
use crate::upload_log::{self, UploadLogEntry, RECENT_LIMIT};

/// Shared handler state.
///
/// The in-memory store (when selected) lives for the whole process. The
/// remote store is rebuilt per request because its credentials are only
/// read at request time; a deployment fixes its secrets without a restart.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub http: reqwest::Client,
    pub memory_store: Option<Arc<InMemorySheetStore>>,
}

impl AppState {
    pub fn new(config: Arc<Config>, memory_store: Option<Arc<InMemorySheetStore>>) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            memory_store,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub rows: Vec<SheetRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploader: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mode: ReconcileMode,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub updated_rows: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    pub error: String,
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "expense-sync",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Maps the error taxonomy onto wire envelopes. Configuration problems are
/// operator-actionable only, so the caller gets a generic message while the
/// detail stays in the server log; upstream rejections surface the remote
/// service's own text for debuggability.
fn error_response(err: &SyncError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, message) = match err {
        SyncError::BadInput(detail) => {
            (StatusCode::BAD_REQUEST, format!("Bad Request: {detail}"))
        }
        SyncError::Config(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Server configuration error.".to_string(),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to update the sheet. Reason: {err}"),
        ),
    };
    let error = match err {
        SyncError::Config(_) => "configuration".to_string(),
        other => other.to_string(),
    };
    (status, Json(ErrorResponse { message, error }))
}

async fn upload(
    State(state): State<AppState>,
    payload: std::result::Result<Json<UploadRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let err = SyncError::BadInput(format!("invalid \"rows\" payload: {rejection}"));
            return error_response(&err).into_response();
        }
    };

    match handle_upload(&state, request).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(UploadResponse {
                message: "Data uploaded successfully!".to_string(),
                updated_rows: outcome.written,
            }),
        )
            .into_response(),
        Err(err) => {
            error!("upload failed: {err}");
            error_response(&err).into_response()
        }
    }
}

async fn handle_upload(state: &AppState, request: UploadRequest) -> Result<ReconcileOutcome> {
    if request.rows.is_empty() && !request.mode.is_replace() {
        return Err(SyncError::BadInput(
            "Missing or empty \"rows\" data.".to_string(),
        ));
    }

    let now = Local::now();
    let timestamp = now.format("%d/%m/%Y, %H:%M:%S").to_string();
    let log = match (&request.uploader, &request.file_name) {
        (Some(uploader), Some(file_name)) => Some(UploadLogEntry {
            uploader: uploader.clone(),
            file_name: file_name.clone(),
            timestamp: timestamp.clone(),
        }),
        _ => None,
    };
    let ctx = ReconcileContext {
        timestamp,
        last_updated: now.format("%d/%m/%Y").to_string(),
        log,
    };

    info!(
        rows = request.rows.len(),
        mode = ?request.mode,
        uploader = request.uploader.as_deref().unwrap_or("-"),
        "processing upload"
    );

    let layout = state.config.spreadsheet.layout();
    match &state.memory_store {
        Some(store) => {
            Reconciler::new(store.as_ref(), &layout)
                .reconcile(&request.rows, request.mode, &ctx)
                .await
        }
        None => {
            let store = connect_remote(state).await?;
            Reconciler::new(&store, &layout)
                .reconcile(&request.rows, request.mode, &ctx)
                .await
        }
    }
}

async fn logs(State(state): State<AppState>) -> Response {
    match handle_logs(&state).await {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(err) => {
            error!("log fetch failed: {err}");
            error_response(&err).into_response()
        }
    }
}

async fn handle_logs(state: &AppState) -> Result<Vec<UploadLogEntry>> {
    let sheet = &state.config.spreadsheet.log_sheet;
    match &state.memory_store {
        Some(store) => upload_log::recent(store.as_ref(), sheet, RECENT_LIMIT).await,
        None => {
            let store = connect_remote(state).await?;
            upload_log::recent(&store, sheet, RECENT_LIMIT).await
        }
    }
}

async fn connect_remote(state: &AppState) -> Result<GoogleSheetsStore> {
    let creds = ServiceCredentials::from_env()?;
    GoogleSheetsStore::connect(
        state.http.clone(),
        state.config.spreadsheet.spreadsheet_id.clone(),
        &creds,
    )
    .await
}

/// Builds the router. Requests with the wrong method on a known path get
/// the framework's 405 response.
pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/upload", post(upload))
        .route("/api/logs", get(logs))
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state)
}

/// Starts the HTTP server on the specified port.
pub async fn start_server(state: AppState, port: u16) -> Result<()> {
    let app = app_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;

    println!("🚀 HTTP server running on http://localhost:{port}");
    println!("💚 Health check: http://localhost:{port}/health");

    axum::serve(listener, app).await?;
    Ok(())
}
