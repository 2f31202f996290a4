//! HTTP service exposing the combiner to the browser extension
//!
//! `POST /combine` with `{"link1": "...", "link2": "...", "filename": "..."}`
//! answers with the merged PDF as an attachment.

use crate::config::ServiceConfig;
use crate::error::Error;
use crate::pipeline::{output_filename, Combiner};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::signal;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

/// Output name used when the request does not carry one
pub const DEFAULT_FILENAME: &str = "combined.pdf";

#[derive(Clone)]
pub struct AppState {
    combiner: Combiner,
}

/// Body of `POST /combine`; `link_1`/`link_2` are accepted as aliases
#[derive(Debug, Default, Deserialize)]
pub struct CombineRequest {
    #[serde(default)]
    pub link1: Option<String>,
    #[serde(default)]
    pub link_1: Option<String>,
    #[serde(default)]
    pub link2: Option<String>,
    #[serde(default)]
    pub link_2: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

fn first_non_blank<'a>(candidates: [&'a Option<String>; 2]) -> Option<&'a str> {
    candidates
        .into_iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
}

impl CombineRequest {
    pub fn first_link(&self) -> Option<&str> {
        first_non_blank([&self.link1, &self.link_1])
    }

    pub fn second_link(&self) -> Option<&str> {
        first_non_blank([&self.link2, &self.link_2])
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Errors surfaced to HTTP clients as `{"error": message}`
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Pipeline(Error),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError::Pipeline(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Pipeline(e) => {
                tracing::warn!(error = %e, "combine failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.client_message())
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: env!("CARGO_PKG_NAME"),
    })
}

async fn index() -> &'static str {
    "Drive PDF combiner. POST JSON to /combine with link1, link2, filename."
}

async fn combine_options() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Fetch both links, merge them and stream the PDF back.
///
/// Each request gets its own working directory, removed when the handler returns.
async fn combine(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    // Unparseable bodies are treated like empty ones
    let request: CombineRequest = serde_json::from_slice(&body).unwrap_or_default();

    let (link1, link2) = match (request.first_link(), request.second_link()) {
        (Some(link1), Some(link2)) => (link1.to_string(), link2.to_string()),
        _ => return Err(ApiError::BadRequest("Need link1 and link2".to_string())),
    };
    let filename = output_filename(request.filename.as_deref(), DEFAULT_FILENAME);

    let work_dir = tempfile::Builder::new()
        .prefix("feb_combine_")
        .tempdir()
        .map_err(Error::from)?;
    let destination = work_dir.path().join(&filename);

    let merged = state
        .combiner
        .combine(&[link1.as_str(), link2.as_str()], work_dir.path(), &destination)
        .await?;
    let data = tokio::fs::read(&merged.path).await.map_err(Error::from)?;
    tracing::info!(filename = %filename, pages = merged.page_count, bytes = data.len(), "Sending combined PDF");

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        data,
    )
        .into_response())
}

/// Build the service router around a combiner.
///
/// Every response carries permissive CORS headers, so preflights are answered
/// by the `OPTIONS /combine` route itself.
pub fn router(combiner: Combiner) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/combine", post(combine).options(combine_options))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .with_state(AppState { combiner })
}

/// Serve until Ctrl+C / SIGTERM
pub async fn run_server(config: ServiceConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let app = router(Combiner::new(config.combiner));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Drive PDF combiner listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
