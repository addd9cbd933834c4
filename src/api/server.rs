//! API server module
//!
//! HTTP surface over [`Core`]: a generic command endpoint, the two-phase
//! confirmation routes, search, an SSE event stream, and a minimal HTML
//! view of the tree.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use futures::Stream;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::core::{Core, Event};
use crate::engine::Command;
use crate::models::{Row, RowId, RowKind, TaskStatus};

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub address: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: ([127, 0, 0, 1], 4400).into(),
        }
    }
}

/// API response envelope
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Builds the application router. Split from [`serve`] so tests can drive
/// routes in-process.
pub fn router(core: Core) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(|| async { Redirect::temporary("/ui") }))
        .route("/api/document", get(get_document))
        .route("/api/command", post(post_command))
        .route("/api/search/:term", get(search_handler))
        .route("/api/confirm/delete/:id", post(request_delete_handler))
        .route("/api/confirm/reset/:id", post(request_reset_handler))
        .route("/api/confirm/commit", post(confirm_commit_handler))
        .route("/api/confirm/cancel", post(confirm_cancel_handler))
        .route("/api/events", get(events_handler))
        .route("/ui", get(ui_handler))
        .layer(cors)
        .with_state(core)
}

/// Starts the API server
pub async fn serve(core: Core, config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let app = router(core);

    tracing::info!("Starting server on {}", config.address);
    let listener = TcpListener::bind(config.address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn get_document(State(core): State<Core>) -> impl IntoResponse {
    Json(ApiResponse::success(core.snapshot()))
}

async fn post_command(State(core): State<Core>, Json(command): Json<Command>) -> impl IntoResponse {
    // Rejected commands are no-ops, not errors: the outcome carries the
    // diagnostic either way.
    let outcome = core.apply(command);
    Json(ApiResponse::success(outcome))
}

async fn search_handler(State(core): State<Core>, Path(term): Path<String>) -> impl IntoResponse {
    Json(ApiResponse::success(core.search(&term)))
}

async fn request_delete_handler(
    State(core): State<Core>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match core.request_delete(&RowId::from(id.as_str())) {
        Some(pending) => (StatusCode::OK, Json(ApiResponse::success(pending))).into_response(),
        None => not_found(format!("row '{id}' not found")),
    }
}

async fn request_reset_handler(
    State(core): State<Core>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match core.request_reset(&RowId::from(id.as_str())) {
        Some(pending) => (StatusCode::OK, Json(ApiResponse::success(pending))).into_response(),
        None => not_found(format!("row '{id}' is not a resettable task")),
    }
}

async fn confirm_commit_handler(State(core): State<Core>) -> impl IntoResponse {
    match core.confirm_pending() {
        Some(outcome) => (StatusCode::OK, Json(ApiResponse::success(outcome))).into_response(),
        None => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error(
                "no confirmation is pending".to_string(),
            )),
        )
            .into_response(),
    }
}

async fn confirm_cancel_handler(State(core): State<Core>) -> impl IntoResponse {
    let cancelled = core.cancel_pending().is_some();
    Json(ApiResponse::success(cancelled))
}

fn not_found(message: String) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::error(message)),
    )
        .into_response()
}

// --- Event stream --- //

async fn events_handler(State(core): State<Core>) -> impl IntoResponse {
    let receiver = core.subscribe();
    let stream = EventStream::new(core.clone(), receiver);

    let headers = [
        (
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderValue::from_static("text/event-stream"),
        ),
        (
            axum::http::header::CACHE_CONTROL,
            axum::http::HeaderValue::from_static("no-cache"),
        ),
    ];

    (headers, axum::body::Body::from_stream(stream))
}

struct EventStream {
    core: Core,
    receiver: tokio::sync::broadcast::Receiver<Event>,
}

impl EventStream {
    fn new(core: Core, receiver: tokio::sync::broadcast::Receiver<Event>) -> Self {
        Self { core, receiver }
    }
}

impl Stream for EventStream {
    type Item = Result<String, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.receiver.try_recv() {
            Ok(event) => {
                let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
                Poll::Ready(Some(Ok(format!("event: update\ndata: {data}\n\n"))))
            }
            Err(tokio::sync::broadcast::error::TryRecvError::Empty) => {
                // No events right now; poll again shortly.
                let waker = cx.waker().clone();
                tokio::spawn(async move {
                    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                    waker.wake();
                });
                Poll::Pending
            }
            Err(tokio::sync::broadcast::error::TryRecvError::Lagged(_)) => {
                // Missed some events; a bare change notice is enough.
                Poll::Ready(Some(Ok(
                    "event: update\ndata: {\"event\":\"updated\"}\n\n".to_string()
                )))
            }
            Err(tokio::sync::broadcast::error::TryRecvError::Closed) => {
                self.receiver = self.core.subscribe();
                // Same wake arrangement as the Empty arm; returning Pending
                // without one would stall the stream for good.
                let waker = cx.waker().clone();
                tokio::spawn(async move {
                    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                    waker.wake();
                });
                Poll::Pending
            }
        }
    }
}

// --- HTML view --- //

async fn ui_handler(State(core): State<Core>) -> impl IntoResponse {
    let doc = core.snapshot();
    let mut html = String::new();
    html.push_str("<!DOCTYPE html><html><head><title>");
    html.push_str(&html_escape::encode_text(&doc.title));
    html.push_str("</title></head><body>");
    html.push_str(&format!(
        "<h1>{}</h1>",
        html_escape::encode_text(&doc.title)
    ));
    let tracked = crate::tree::trackable_panels(&doc);
    if !tracked.is_empty() {
        let (done, total) = tracked
            .iter()
            .map(|panel| crate::tree::task_counts(panel))
            .fold((0, 0), |(d, t), (pd, pt)| (d + pd, t + pt));
        html.push_str(&format!("<p>{done} of {total} tasks done</p>"));
    }
    if doc.rows.is_empty() {
        html.push_str("<p>The plan is empty. Add a panel via the CLI: <code>planboard add --kind panel</code></p>");
    } else {
        render_rows(&doc.rows, &mut html);
    }
    html.push_str("</body></html>");
    Html(html)
}

fn render_rows(rows: &[Row], out: &mut String) {
    out.push_str("<ul>");
    for row in rows {
        let style = if row.visible { "" } else { " style=\"opacity:0.5\"" };
        out.push_str(&format!("<li{style}>"));
        if row.kind == RowKind::Task {
            out.push_str(&format!("[{}] ", status_glyph(row.status)));
        }
        out.push_str(&html_escape::encode_text(&row.label));
        if row.kind == RowKind::Panel {
            let (done, total) = crate::tree::task_counts(row);
            if total > 0 {
                out.push_str(&format!(" <small>({done}/{total})</small>"));
            }
        }
        if let Some(target) = &row.link_target {
            out.push_str(&format!(
                " <a href=\"{}\">&#8599;</a>",
                html_escape::encode_double_quoted_attribute(target)
            ));
        }
        if !row.children.is_empty() {
            render_rows(&row.children, out);
        }
        out.push_str("</li>");
    }
    out.push_str("</ul>");
}

fn status_glyph(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::New => "&nbsp;",
        TaskStatus::InProgress => "&#9205;",
        TaskStatus::Attention => "!",
        TaskStatus::Blocked => "&#10060;",
        TaskStatus::Done => "&#10003;",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Command;
    use crate::models::RowId;
    use crate::seed::example_document;
    use futures::StreamExt;
    use std::time::Duration;

    #[tokio::test]
    async fn test_event_stream_wakes_when_events_arrive_later() {
        let core = Core::new(example_document());
        let mut stream = EventStream::new(core.clone(), core.subscribe());

        core.apply(Command::ToggleExpanded {
            id: RowId::from("r-prep"),
        });
        let first = stream.next().await.expect("stream open").expect("frame");
        assert!(first.contains("\"event\":\"updated\""));

        // The stream is idle now; an event applied from another task must
        // wake it rather than leave it parked on Pending.
        let writer = core.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            writer.apply(Command::ToggleExpanded {
                id: RowId::from("r-prep"),
            });
        });

        let second = tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("stream stalled")
            .expect("stream open")
            .expect("frame");
        assert!(second.contains("event: update"));
        handle.await.expect("writer task");
    }
}
