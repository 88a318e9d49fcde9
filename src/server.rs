use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::assistant::{AssistantsClient, ThreadId};
use crate::config::Config;
use crate::instrumentation::{TurnLog, TurnLogger};
use crate::relay::{Relay, RelayError};

pub const CHAT_PATH: &str = "/api/asim-chat";
pub const HEALTH_PATH: &str = "/health";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Mesaj boş ola bilməz")]
    EmptyMessage,

    #[error(
        "Server düzgün qurulmayıb. .env faylında aşağıdakı dəyişənləri yoxlayın: {}",
        .0.join(", ")
    )]
    Misconfigured(Vec<&'static str>),

    #[error("Asİm cavabı tamamlamadı. Bir az sonra yenidən cəhd edin.")]
    RunNotCompleted,

    #[error("Asİm ilə əlaqə zamanı xəta baş verdi.")]
    Remote,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = match &self {
            ApiError::EmptyMessage => StatusCode::BAD_REQUEST,
            ApiError::Misconfigured(_) | ApiError::RunNotCompleted | ApiError::Remote => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (code, body).into_response()
    }
}

impl From<RelayError> for ApiError {
    fn from(e: RelayError) -> Self {
        match e {
            RelayError::RunNotCompleted { .. } => ApiError::RunNotCompleted,
            RelayError::Assistant(_) => ApiError::Remote,
        }
    }
}

/// Shared, read-only handler state. `relay` is absent exactly when required
/// settings are missing.
#[derive(Clone)]
pub struct AppState {
    relay: Option<Arc<Relay>>,
    missing: Vec<&'static str>,
    debug: bool,
}

impl AppState {
    pub fn new(relay: Option<Arc<Relay>>, missing: Vec<&'static str>, debug: bool) -> Self {
        Self {
            relay,
            missing,
            debug,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let missing = config.missing_settings();
        let relay = match (&config.openai_api_key, &config.assistant_id) {
            (Some(api_key), Some(assistant_id)) => {
                let client = AssistantsClient::new(api_key, assistant_id, config)
                    .context("Failed to build assistant client")?;
                let logger = TurnLogger::new(&config.log_dir)?;
                Some(Arc::new(Relay::new(Arc::new(client), Some(logger))))
            }
            _ => {
                warn!(
                    missing = %missing.join(", "),
                    "required settings are missing, chat requests will fail"
                );
                None
            }
        };

        Ok(Self::new(relay, missing, config.debug))
    }

    pub fn relay(&self) -> Option<&Arc<Relay>> {
        self.relay.as_ref()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    thread_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatResponse {
    reply: String,
    thread_id: ThreadId,
    #[serde(skip_serializing_if = "Option::is_none")]
    debug: Option<TurnLog>,
}

pub fn router(state: AppState, static_dir: &str) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(health))
        .route(CHAT_PATH, post(chat))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: &Config) -> Result<()> {
    let state = AppState::from_config(config)?;
    let app = router(state, &config.static_dir);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind {}", addr))?;
    info!("Asİm relay listening on http://{}", addr);

    axum::serve(listener, app).await.context("HTTP server failed")?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    StatusCode::OK
}

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!(error = %rejection, "unreadable chat request body");
            ChatRequest::default()
        }
    };

    let message = request.message.as_deref().unwrap_or_default().trim();
    if message.is_empty() {
        return Err(ApiError::EmptyMessage);
    }

    let Some(relay) = state.relay() else {
        error!(missing = %state.missing.join(", "), "chat request refused, server is not configured");
        return Err(ApiError::Misconfigured(state.missing.clone()));
    };

    // Only an absent or empty id starts a new thread; anything else is the
    // client's and goes to the service verbatim.
    let thread = request
        .thread_id
        .filter(|id| !id.is_empty())
        .map(ThreadId::from);

    let outcome = relay.handle_turn(message, thread).await.map_err(|e| {
        error!(error = %e, "chat turn failed");
        ApiError::from(e)
    })?;

    Ok(Json(ChatResponse {
        reply: outcome.reply,
        thread_id: outcome.thread_id,
        debug: state.debug.then_some(outcome.log),
    }))
}
