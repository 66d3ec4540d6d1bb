use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::http::server::AppState;
use crate::security::cookies;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, alias = "rememberMe")]
    pub remember_me: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
    pub message: &'static str,
}

fn error(status: StatusCode, message: &'static str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(payload)) = payload else {
        return error(StatusCode::BAD_REQUEST, "Invalid request body");
    };
    if payload.email.is_empty() || payload.password.is_empty() {
        return error(StatusCode::BAD_REQUEST, "Email and password are required");
    }

    let inner = state.inner.load();
    if !inner.sessions.verify(&payload.email, &payload.password) {
        tracing::info!(email = %payload.email, "Login rejected");
        return error(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }

    let jar = inner.sessions.start(jar, payload.remember_me);
    tracing::info!(email = %payload.email, remember_me = payload.remember_me, "Login succeeded");

    (
        jar,
        Json(SessionResponse {
            success: true,
            user: Some(SessionUser {
                email: payload.email,
            }),
            message: "Login successful",
        }),
    )
        .into_response()
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    let signed_in = cookies::get_auth_token(&jar).is_some();
    let jar = state.inner.load().sessions.end(jar);
    tracing::info!(signed_in, "Session ended");

    (
        jar,
        Json(SessionResponse {
            success: true,
            user: None,
            message: "Logged out successfully",
        }),
    )
        .into_response()
}

pub async fn refresh(State(state): State<AppState>, jar: CookieJar) -> Response {
    let Some(refresh_token) = cookies::get_refresh_token(&jar) else {
        return error(StatusCode::UNAUTHORIZED, "Refresh token not found");
    };

    let inner = state.inner.load();
    if !inner.sessions.is_refresh_token(&refresh_token) {
        let jar = inner.sessions.codec().clear_auth_tokens(jar);
        return (
            jar,
            error(StatusCode::UNAUTHORIZED, "Invalid refresh token"),
        )
            .into_response();
    }

    let jar = inner.sessions.rotate(jar);
    (
        jar,
        Json(SessionResponse {
            success: true,
            user: None,
            message: "Tokens refreshed successfully",
        }),
    )
        .into_response()
}
