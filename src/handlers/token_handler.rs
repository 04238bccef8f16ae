use crate::models::token::Token;
use crate::services::auth_service::{AuthService, TOKENS};
use crate::store::StoreError;
use crate::utils::clock::{now_ms, HOUR_MS};
use crate::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
pub struct CreateTokenRequest {
    pub phone: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct ExtendTokenRequest {
    pub id: Option<String>,
    pub extend: Option<bool>,
}

#[derive(Deserialize)]
pub struct TokenQuery {
    pub id: String,
}

#[axum::debug_handler]
pub async fn create_token(
    State(state): State<AppState>,
    Json(payload): Json<CreateTokenRequest>,
) -> impl IntoResponse {
    let phone = payload
        .phone
        .map(|p| p.trim().to_string())
        .filter(|p| p.len() == 10);
    let password = payload.password.filter(|p| !p.trim().is_empty());

    let (Some(phone), Some(password)) = (phone, password) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Missing required fields"})),
        )
            .into_response();
    };

    let auth = AuthService::new(&state.store);
    match auth.create_token(&phone, &password).await {
        Ok(token) => {
            tracing::info!("✅ Token issued for {phone}");
            (StatusCode::OK, Json(token)).into_response()
        }
        Err(err) => {
            tracing::warn!("❌ Token request rejected for {phone}: {err}");
            (StatusCode::BAD_REQUEST, Json(json!({"error": err}))).into_response()
        }
    }
}

pub async fn get_token(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> impl IntoResponse {
    match state.store.read::<Token>(TOKENS, &query.id).await {
        Ok(token) => (StatusCode::OK, Json(token)).into_response(),
        Err(StoreError::NotFound) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!("Could not read token {}: {e}", query.id);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Extend an unexpired token by another hour.
pub async fn update_token(
    State(state): State<AppState>,
    Json(payload): Json<ExtendTokenRequest>,
) -> impl IntoResponse {
    let id = payload.id.filter(|id| !id.trim().is_empty());
    let (Some(id), Some(true)) = (id, payload.extend) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Missing required fields, or fields are invalid"})),
        )
            .into_response();
    };

    let mut token: Token = match state.store.read(TOKENS, &id).await {
        Ok(token) => token,
        Err(StoreError::NotFound) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "The specified token does not exist"})),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!("Could not read token {id}: {e}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if token.is_expired(now_ms()) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "The token has already expired and cannot be extended"})),
        )
            .into_response();
    }

    token.expires = now_ms() + HOUR_MS;
    match state.store.update(TOKENS, &id, &token).await {
        Ok(()) => (StatusCode::OK, Json(token)).into_response(),
        Err(e) => {
            tracing::error!("Could not extend token {id}: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Could not update the token's expiration"})),
            )
                .into_response()
        }
    }
}

pub async fn delete_token(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> impl IntoResponse {
    match state.store.delete(TOKENS, &query.id).await {
        Ok(()) => (StatusCode::OK, Json(json!({}))).into_response(),
        Err(StoreError::NotFound) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Could not find the specified token"})),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Could not delete token {}: {e}", query.id);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
