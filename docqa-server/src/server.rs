//! HTTP server: router construction and request handlers.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use docqa_rag::{DocQaPipeline, RagError};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::protocol::{ChatRequest, ChatResponse, ErrorResponse, HealthResponse, UploadResponse};

/// Uploads larger than this are rejected by the body limit layer.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Shared application state: the pipeline and the transient uploads directory.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<DocQaPipeline>,
    pub uploads_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8080 }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/", get(health))
        .route("/upload", post(upload))
        .route("/chat", post(chat))
        .with_state(state)
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    let app = app_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for docqa server")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("docqa-server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "Server is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /upload` — multipart form with a single `file` field.
///
/// The upload is written to a transient file in the uploads directory and
/// removed again once processing reaches a terminal state, success or
/// failure. A mid-stream ingestion failure can leave earlier vector batches
/// in the index; that partial state is not rolled back.
async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file: Option<(String, axum::body::Bytes)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        client_error(format!("invalid multipart request: {e}"))
    })? {
        if field.name() == Some("file") {
            let Some(file_name) = field.file_name().map(str::to_string) else {
                continue;
            };
            let bytes = field
                .bytes()
                .await
                .map_err(|e| client_error(format!("failed to read file field: {e}")))?;
            file = Some((file_name, bytes));
            break;
        }
    }

    let Some((file_name, bytes)) = file else {
        return Err(client_error("No file uploaded"));
    };

    // Transient name: millisecond timestamp plus the original extension.
    let extension = Path::new(&file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    let temp_path = state.uploads_dir.join(format!("{}{extension}", Utc::now().timestamp_millis()));

    tokio::fs::write(&temp_path, &bytes).await.map_err(|e| {
        error!(path = %temp_path.display(), error = %e, "failed to write upload");
        server_error("Error processing file", e.to_string())
    })?;

    info!(source = %file_name, path = %temp_path.display(), "processing upload");
    let result = state.pipeline.ingest_file(&temp_path, &file_name).await;

    // Guaranteed cleanup on both terminal paths.
    if let Err(e) = tokio::fs::remove_file(&temp_path).await {
        error!(path = %temp_path.display(), error = %e, "failed to remove transient upload");
    }

    match result {
        Ok(report) => Ok(Json(UploadResponse {
            message: "File processed successfully".to_string(),
            document_id: report.document_id,
            chunks_processed: report.chunks_processed,
            page_count: report.pages,
        })),
        Err(RagError::UnsupportedFileType(ext)) => {
            Err(client_error(format!("Unsupported file type: .{ext}")))
        }
        Err(e) => {
            error!(source = %file_name, error = %e, "file processing failed");
            Err(server_error("Error processing file", e.to_string()))
        }
    }
}

/// `POST /chat` — answer a question against one ingested document.
///
/// Both fields are validated before any external call is made.
async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let question = request.question.as_deref().map(str::trim).unwrap_or_default();
    let document_id = request.document_id.as_deref().map(str::trim).unwrap_or_default();

    if question.is_empty() || document_id.is_empty() {
        return Err(client_error("question and documentId are required"));
    }

    match state.pipeline.answer(question, document_id).await {
        Ok(answer) => {
            Ok(Json(ChatResponse { answer: answer.text, sources_used: answer.sources_used }))
        }
        Err(e) => {
            error!(document.id = %document_id, error = %e, "chat processing failed");
            Err(server_error("Error processing query", e.to_string()))
        }
    }
}

fn client_error(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message)))
}

fn server_error(message: impl Into<String>, details: impl Into<String>) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse::with_details(message, details)))
}
