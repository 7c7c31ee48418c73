//! Request handlers for the job endpoint.

use std::time::Duration;

use axum::body::Body;
use axum::extract::{Query, Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CACHE_CONTROL, CONNECTION, CONTENT_TYPE,
};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use futures_util::{stream, Stream};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::AppState;
use crate::emitter::{self, FrameWriter};
use crate::frame::{FrameCodec, OutboundFrame};
use crate::models::job::JobRequest;
use crate::{AppError, Result};

/// Handler for `GET /health`: 200 OK with a plain-text body.
pub async fn health() -> &'static str {
    "ok"
}

/// Handler for `POST /v1/run` with a JSON body.
///
/// # Errors
///
/// Returns `AppError::InvalidRequest` (400) for an empty id or prompt.
pub async fn run_job_json(
    State(state): State<AppState>,
    Json(request): Json<JobRequest>,
) -> Result<Response> {
    start_stream(&state, request)
}

/// Handler for `GET /v1/run?id=..&prompt=..`, used by event-stream clients.
///
/// # Errors
///
/// Returns `AppError::InvalidRequest` (400) for an empty id or prompt.
pub async fn run_job_query(
    State(state): State<AppState>,
    Query(request): Query<JobRequest>,
) -> Result<Response> {
    start_stream(&state, request)
}

/// Handler for `OPTIONS /v1/run` CORS preflight.
pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Middleware adding permissive CORS headers to every response.
pub async fn cors(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Origin, X-Requested-With, Content-Type, Accept"),
    );
    response
}

/// Validate `request`, spawn its run, and return the streaming response.
fn start_stream(state: &AppState, request: JobRequest) -> Result<Response> {
    request.validate()?;
    info!(job_id = %request.id, prompt_len = request.prompt.len(), "received job run request");

    let (writer, frames) = FrameWriter::channel();
    tokio::spawn(emitter::run_job(
        state.agent.clone(),
        state.toolbox.clone(),
        request,
        writer,
    ));

    let headers = [
        (CONTENT_TYPE, "text/event-stream"),
        (CACHE_CONTROL, "no-cache"),
        (CONNECTION, "keep-alive"),
    ];
    let body = Body::from_stream(frame_stream(frames, state.keep_alive));
    Ok((headers, body).into_response())
}

/// Encode queued frames into body chunks, one chunk per frame.
///
/// When `keep_alive` is set and no frame arrives within it, a comment frame
/// is written instead. The stream ends once the writer is dropped and the
/// queue is drained.
fn frame_stream(
    frames: mpsc::UnboundedReceiver<OutboundFrame>,
    keep_alive: Option<Duration>,
) -> impl Stream<Item = Result<Bytes>> + Send + 'static {
    stream::unfold((frames, FrameCodec::new()), move |(mut frames, mut codec)| async move {
        let frame = match keep_alive {
            Some(idle) => match tokio::time::timeout(idle, frames.recv()).await {
                Ok(Some(frame)) => frame,
                Ok(None) => return None,
                Err(_) => OutboundFrame::KeepAlive,
            },
            None => frames.recv().await?,
        };
        let chunk = codec.encode_to_bytes(frame);
        Some((chunk, (frames, codec)))
    })
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        warn!(%status, error = %self, "request failed");
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
