//! Authentication endpoints

use axum::{Json, Router, body::Bytes, extract::State, routing::post};
use serde::{Deserialize, Serialize};

use dashpad_core::AuthStatus;

use crate::routes::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/start", post(start))
        .route("/auth/status", post(status))
        .route("/auth/logout", post(logout))
}

/// Optional overrides for the CLI-level SharePoint configuration.
#[derive(Deserialize, Default)]
pub struct StartRequest {
    pub site_url: Option<String>,
    pub list_name: Option<String>,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum StartResponse {
    Started {
        success: bool,
        user_code: String,
        verification_url: String,
        expires_in: i64,
        message: String,
        instructions: Vec<String>,
    },
    Failed {
        success: bool,
        error: String,
    },
}

fn instructions(user_code: &str, verification_url: &str) -> Vec<String> {
    vec![
        format!("Open your web browser and go to: {verification_url}"),
        format!("Enter the code: {user_code}"),
        "Sign in with your Microsoft 365 credentials".to_string(),
        "Grant permissions when prompted".to_string(),
        "Return here - authentication will complete automatically".to_string(),
    ]
}

/// POST /api/auth/start - Begin the device-code handshake.
///
/// An empty body means "use the CLI defaults". Flow-level failures come back
/// as `{success: false, error}` rather than an HTTP error; the dashboard
/// polls `/api/auth/status` for the eventual outcome either way.
async fn start(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<StartResponse>, AppError> {
    let request: StartRequest = if body.is_empty() {
        StartRequest::default()
    } else {
        serde_json::from_slice(&body)?
    };

    let site_url = request.site_url.unwrap_or_else(|| state.site_url.clone());
    let list_name = request.list_name.unwrap_or_else(|| state.list_name.clone());

    match state.auth.start(&site_url, &list_name).await {
        Ok(flow) => Ok(Json(StartResponse::Started {
            success: true,
            instructions: instructions(&flow.user_code, &flow.verification_url),
            user_code: flow.user_code,
            verification_url: flow.verification_url,
            expires_in: flow.expires_in,
            message: flow.message,
        })),
        Err(e) => Ok(Json(StartResponse::Failed {
            success: false,
            error: e.to_string(),
        })),
    }
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub authenticated: bool,
    pub message: Option<String>,
    pub error: Option<String>,
}

/// POST /api/auth/status - Non-blocking snapshot of the handshake.
async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let AuthStatus {
        authenticated,
        message,
        error,
        ..
    } = state.auth.status();

    Json(StatusResponse {
        authenticated,
        message,
        error,
    })
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// POST /api/auth/logout - Drop the session and reset to the zero state.
async fn logout(State(state): State<AppState>) -> Json<LogoutResponse> {
    state.auth.logout();
    Json(LogoutResponse { success: true })
}
