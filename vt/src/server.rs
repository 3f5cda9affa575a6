//! HTTP surface
//!
//! JSON endpoints for the web client: the parse flow and user registration.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use eyre::{Context, Result};
use serde::Serialize;
use serde_json::json;
use taskstore::{NewUser, Store, StoreError, User};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::blocking::run_blocking;
use crate::domain::AmbiguityRecord;
use crate::error::FlowError;
use crate::flow::{FlowOutcome, TaskAssistant, TaskRequest};

const CLARIFY_MESSAGE: &str = "Multiple users found for some names. Please clarify.";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<TaskAssistant>,
    pub store: Arc<Store>,
}

impl AppState {
    pub fn new(assistant: TaskAssistant, store: Arc<Store>) -> Self {
        Self {
            assistant: Arc::new(assistant),
            store,
        }
    }
}

#[derive(Debug, Serialize)]
struct ClarificationBody<'a> {
    message: &'a str,
    ambiguous: Vec<AmbiguityRecord>,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/parse", get(parse_liveness).post(parse_task))
        .route("/api/users", get(list_users).post(create_user))
        .with_state(state)
}

/// Serve until the process is stopped
pub async fn serve(bind: &str, state: AppState) -> Result<()> {
    debug!(%bind, "serve: called");
    let addr: SocketAddr = bind.parse().with_context(|| format!("Invalid bind address: {}", bind))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    serve_on(listener, state).await
}

/// Serve on an already-bound listener
pub async fn serve_on(listener: TcpListener, state: AppState) -> Result<()> {
    let addr = listener.local_addr().context("Listener has no local address")?;
    info!(%addr, "HTTP server listening");
    axum::serve(listener, router(state))
        .await
        .context("HTTP server terminated with error")
}

// =============================================================================
// Parse
// =============================================================================

async fn parse_liveness() -> &'static str {
    "Voice parse endpoint is up. POST { text, email? } to create a task."
}

async fn parse_task(State(state): State<AppState>, Json(request): Json<TaskRequest>) -> Response {
    debug!(text_len = request.text.len(), "parse_task: called");
    let today = chrono::Local::now().date_naive();

    match state.assistant.handle(request, today).await {
        Ok(FlowOutcome::Created(summary)) => (StatusCode::CREATED, Json(summary)).into_response(),
        Ok(FlowOutcome::NeedsClarification(ambiguous)) => (
            StatusCode::MULTIPLE_CHOICES,
            Json(ClarificationBody {
                message: CLARIFY_MESSAGE,
                ambiguous,
            }),
        )
            .into_response(),
        Err(err) => flow_error_response(&err),
    }
}

/// Map a flow failure to its status and public body
pub fn flow_error_response(err: &FlowError) -> Response {
    match err {
        FlowError::UserNotFound(_) => {
            (StatusCode::NOT_FOUND, Json(json!({ "error": err.public_message() }))).into_response()
        }
        FlowError::Validation(_) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Validation Error", "message": err.public_message() })),
        )
            .into_response(),
        _ => {
            error!(error = %err, "Parse request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.public_message() })),
            )
                .into_response()
        }
    }
}

// =============================================================================
// Users
// =============================================================================

async fn create_user(State(state): State<AppState>, Json(new_user): Json<NewUser>) -> Response {
    debug!(email = %new_user.email, "create_user: called");
    match run_blocking(&state.store, move |store| store.create_user(new_user)).await {
        Ok(user) => (StatusCode::CREATED, Json(user)).into_response(),
        Err(StoreError::DuplicateEmail(_)) => {
            (StatusCode::BAD_REQUEST, Json(json!({ "message": "User already exists" }))).into_response()
        }
        Err(e) if e.is_invalid_input() => {
            warn!(error = %e, "Rejected user registration");
            (StatusCode::BAD_REQUEST, Json(json!({ "message": e.to_string() }))).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to register user");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "message": "Server error" }))).into_response()
        }
    }
}

async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, (StatusCode, Json<serde_json::Value>)> {
    debug!("list_users: called");
    run_blocking(&state.store, |store| store.list_users()).await.map(Json).map_err(|e| {
        error!(error = %e, "Failed to list users");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "message": "Server error" })))
    })
}
