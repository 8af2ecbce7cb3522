use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default = "default_thread_id")]
    pub thread_id: String,
}

fn default_thread_id() -> String {
    "default_user".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Any failure while answering; reported as a 500 with the error text as `detail`
pub struct ChatError(anyhow::Error);

impl From<anyhow::Error> for ChatError {
    fn from(err: anyhow::Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        tracing::error!("chat request failed: {:#}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": self.0.to_string() })),
        )
            .into_response()
    }
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ChatError> {
    tracing::info!(thread_id = %request.thread_id, "chat request");

    let response = match state.turn_timeout {
        Some(timeout) => {
            state
                .agent
                .run_turn_with_deadline(&request.message, &request.thread_id, timeout)
                .await?
        }
        None => {
            state
                .agent
                .run_turn(&request.message, &request.thread_id)
                .await?
        }
    };

    Ok(Json(ChatResponse { response }))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .with_state(state)
}
