//! Browser front end: an axum server plus an embedded single-page chat UI.
//!
//! Routes:
//!
//! - `GET /` serves the chat page.
//! - `POST /api/sessions` opens an isolated session, `{"session_id": ..}`.
//! - `GET /api/sessions/{id}/history` returns the conversation for rendering.
//! - `POST /api/sessions/{id}/messages` takes a multipart form (`text` field,
//!   any number of `files` parts) and runs one round-trip.
//! - `DELETE /api/sessions/{id}` ends a session and drops its conversation.
//!
//! Each session owns its conversation behind its own lock, so two browser
//! tabs never see each other's history. Provider calls block, so they run on
//! the blocking thread pool. Sessions the page never ended are dropped by
//! [`AppState::prune_idle`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chat_provider::ProviderInitError;
use multimodal_chat::{ChatConfig, ChatSession, SessionError, SessionEvent, Upload};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

mod history;

pub use history::{history_view, HistoryEntry, HistoryPart};

pub const INDEX_HTML: &str = include_str!("../assets/index.html");

/// Largest accepted request body; matches the hosted transcription limit.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

pub const TEXT_FIELD: &str = "text";
pub const FILES_FIELD: &str = "files";

type SessionFactory = dyn Fn() -> Result<ChatSession, ProviderInitError> + Send + Sync;
type SharedSession = Arc<tokio::sync::Mutex<ChatSession>>;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    sessions: Mutex<HashMap<Uuid, SessionEntry>>,
    factory: Box<SessionFactory>,
}

struct SessionEntry {
    session: SharedSession,
    last_active: Instant,
}

impl AppState {
    /// `factory` is called once per browser session.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<ChatSession, ProviderInitError> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(AppStateInner {
                sessions: Mutex::new(HashMap::new()),
                factory: Box::new(factory),
            }),
        }
    }

    /// Builds sessions from `config`. One session is built up front so a
    /// missing credential stops the server before it starts listening.
    pub fn from_config(config: ChatConfig) -> Result<Self, ProviderInitError> {
        ChatSession::from_config(&config)?;
        Ok(Self::new(move || ChatSession::from_config(&config)))
    }

    fn create_session(&self) -> Result<Uuid, ProviderInitError> {
        let session = (self.inner.factory)()?;
        let id = Uuid::new_v4();
        lock_unpoisoned(&self.inner.sessions).insert(
            id,
            SessionEntry {
                session: Arc::new(tokio::sync::Mutex::new(session)),
                last_active: Instant::now(),
            },
        );
        Ok(id)
    }

    fn session(&self, id: Uuid) -> Option<SharedSession> {
        let mut sessions = lock_unpoisoned(&self.inner.sessions);
        let entry = sessions.get_mut(&id)?;
        entry.last_active = Instant::now();
        Some(Arc::clone(&entry.session))
    }

    /// Drops the session and its conversation. A round-trip already in
    /// flight finishes, but its result is no longer reachable.
    pub fn end_session(&self, id: Uuid) -> bool {
        lock_unpoisoned(&self.inner.sessions).remove(&id).is_some()
    }

    /// Ends every session untouched for at least `max_idle`. Sessions with a
    /// round-trip in progress are kept. Returns how many were dropped.
    pub fn prune_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = lock_unpoisoned(&self.inner.sessions);
        let before = sessions.len();
        sessions.retain(|_, entry| {
            entry.last_active.elapsed() < max_idle || entry.session.try_lock().is_err()
        });
        before - sessions.len()
    }

    pub fn session_count(&self) -> usize {
        lock_unpoisoned(&self.inner.sessions).len()
    }
}

#[derive(Debug, Error)]
pub enum WebError {
    #[error("unknown session {0}")]
    UnknownSession(Uuid),
    #[error("invalid upload: {0}")]
    BadUpload(String),
    #[error(transparent)]
    Init(#[from] ProviderInitError),
    #[error("chat worker failed: {0}")]
    Worker(String),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::UnknownSession(_) => StatusCode::NOT_FOUND,
            Self::BadUpload(_) => StatusCode::BAD_REQUEST,
            Self::Init(_) | Self::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Serialize)]
struct CreatedSession {
    session_id: Uuid,
}

#[derive(Debug, Default, Serialize)]
pub struct MessageResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub notices: Vec<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/sessions", post(create_session_handler))
        .route("/api/sessions/{id}/history", get(history_handler))
        .route("/api/sessions/{id}", delete(end_session_handler))
        .route("/api/sessions/{id}/messages", post(send_message_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn create_session_handler(State(state): State<AppState>) -> Result<Response, WebError> {
    let session_id = state.create_session()?;
    info!(%session_id, "session opened");
    Ok((StatusCode::CREATED, Json(CreatedSession { session_id })).into_response())
}

async fn end_session_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, WebError> {
    if !state.end_session(id) {
        return Err(WebError::UnknownSession(id));
    }
    info!(session_id = %id, "session ended");
    Ok(StatusCode::NO_CONTENT)
}

async fn history_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<HistoryEntry>>, WebError> {
    let session = state.session(id).ok_or(WebError::UnknownSession(id))?;
    let session = session.lock().await;
    Ok(Json(history_view(session.conversation())))
}

async fn send_message_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Response, WebError> {
    let session = state.session(id).ok_or(WebError::UnknownSession(id))?;
    let (text, uploads) = read_message_form(&mut multipart).await?;

    let (result, notices) = tokio::task::spawn_blocking(move || {
        let mut session = session.blocking_lock();
        let mut notices = Vec::new();
        let result = session.send_uploads(&text, uploads, &mut |event| {
            if let SessionEvent::Notice(notice) = event {
                notices.push(notice);
            }
        });
        (result, notices)
    })
    .await
    .map_err(|error| WebError::Worker(error.to_string()))?;

    let (status, body) = match result {
        Ok(reply) => (
            StatusCode::OK,
            MessageResponse {
                reply: Some(reply),
                error: None,
                notices,
            },
        ),
        Err(SessionError::NothingToSend) => (
            StatusCode::BAD_REQUEST,
            MessageResponse {
                reply: None,
                error: Some("Type a message or attach a file.".to_string()),
                notices,
            },
        ),
        Err(SessionError::Remote(error)) => {
            warn!(session_id = %id, %error, "message round-trip failed");
            (
                StatusCode::BAD_GATEWAY,
                MessageResponse {
                    reply: None,
                    error: Some(error.to_string()),
                    notices,
                },
            )
        }
    };

    Ok((status, Json(body)).into_response())
}

async fn read_message_form(multipart: &mut Multipart) -> Result<(String, Vec<Upload>), WebError> {
    let mut text = String::new();
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| WebError::BadUpload(error.to_string()))?
    {
        let name = field.name().map(ToString::to_string);
        match name.as_deref() {
            Some(TEXT_FIELD) => {
                text = field
                    .text()
                    .await
                    .map_err(|error| WebError::BadUpload(error.to_string()))?;
            }
            Some(FILES_FIELD) => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(ToString::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|error| WebError::BadUpload(error.to_string()))?;

                // Browsers send an empty, unnamed part when no file was picked.
                if filename.is_empty() && bytes.is_empty() {
                    continue;
                }

                uploads.push(Upload {
                    filename,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    Ok((text, uploads))
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
