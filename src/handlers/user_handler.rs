use crate::models::user::User;
use crate::services::auth_service::{AuthService, USERS};
use crate::services::worker::CHECKS;
use crate::store::StoreError;
use crate::AppState;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use futures::future::join_all;
use serde::Deserialize;
use serde_json::json;

use super::{token_from_headers, unauthorized};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub tos_agreement: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct PhoneQuery {
    pub phone: String,
}

#[axum::debug_handler]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> impl IntoResponse {
    let first_name = non_empty(payload.first_name);
    let last_name = non_empty(payload.last_name);
    let phone = non_empty(payload.phone).filter(|p| p.len() == 10);
    let password = non_empty(payload.password);
    let tos_agreement = payload.tos_agreement.unwrap_or(false);

    let (Some(first_name), Some(last_name), Some(phone), Some(password)) =
        (first_name, last_name, phone, password)
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Missing required fields"})),
        )
            .into_response();
    };
    if !tos_agreement {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Terms of service must be accepted"})),
        )
            .into_response();
    }

    let hashed_password = match AuthService::hash_password(&password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!("Could not hash password for {phone}: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Could not create the new user"})),
            )
                .into_response();
        }
    };

    let user = User {
        first_name,
        last_name,
        phone: phone.clone(),
        hashed_password,
        tos_agreement: true,
        checks: Vec::new(),
    };

    match state.store.create(USERS, &phone, &user).await {
        Ok(()) => {
            tracing::info!("✅ User created: {phone}");
            (StatusCode::OK, Json(json!({}))).into_response()
        }
        Err(StoreError::AlreadyExists) => (
            StatusCode::CONFLICT,
            Json(json!({"error": "A user with that phone number already exists"})),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Could not create user {phone}: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Could not create the new user"})),
            )
                .into_response()
        }
    }
}

pub async fn get_user(
    State(state): State<AppState>,
    Query(query): Query<PhoneQuery>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let auth = AuthService::new(&state.store);
    let Some(token_id) = token_from_headers(&headers) else {
        return unauthorized();
    };
    if !auth.verify_token(&token_id, &query.phone).await {
        return unauthorized();
    }

    match state.store.read::<User>(USERS, &query.phone).await {
        Ok(user) => (StatusCode::OK, Json(user.public())).into_response(),
        Err(StoreError::NotFound) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!("Could not read user {}: {e}", query.phone);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn update_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UpdateUserRequest>,
) -> impl IntoResponse {
    let Some(phone) = non_empty(payload.phone).filter(|p| p.len() == 10) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Missing required fields"})),
        )
            .into_response();
    };

    let first_name = non_empty(payload.first_name);
    let last_name = non_empty(payload.last_name);
    let password = non_empty(payload.password);
    if first_name.is_none() && last_name.is_none() && password.is_none() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Missing fields to update"})),
        )
            .into_response();
    }

    let auth = AuthService::new(&state.store);
    let Some(token_id) = token_from_headers(&headers) else {
        return unauthorized();
    };
    if !auth.verify_token(&token_id, &phone).await {
        return unauthorized();
    }

    let mut user: User = match state.store.read(USERS, &phone).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "The specified user does not exist"})),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!("Could not read user {phone}: {e}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if let Some(first_name) = first_name {
        user.first_name = first_name;
    }
    if let Some(last_name) = last_name {
        user.last_name = last_name;
    }
    if let Some(password) = password {
        match AuthService::hash_password(&password) {
            Ok(hash) => user.hashed_password = hash,
            Err(e) => {
                tracing::error!("Could not hash new password for {phone}: {e}");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        }
    }

    match state.store.update(USERS, &phone, &user).await {
        Ok(()) => (StatusCode::OK, Json(json!({}))).into_response(),
        Err(e) => {
            tracing::error!("Could not update user {phone}: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Could not update the user"})),
            )
                .into_response()
        }
    }
}

/// Deleting a user also deletes every check they own, so the scheduler never
/// probes orphaned records.
pub async fn delete_user(
    State(state): State<AppState>,
    Query(query): Query<PhoneQuery>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let auth = AuthService::new(&state.store);
    let Some(token_id) = token_from_headers(&headers) else {
        return unauthorized();
    };
    if !auth.verify_token(&token_id, &query.phone).await {
        return unauthorized();
    }

    let user: User = match state.store.read(USERS, &query.phone).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "Could not find the specified user"})),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!("Could not read user {}: {e}", query.phone);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if let Err(e) = state.store.delete(USERS, &query.phone).await {
        tracing::error!("Could not delete user {}: {e}", query.phone);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "Could not delete the specified user"})),
        )
            .into_response();
    }

    let deletions = user.checks.iter().map(|check_id| {
        let store = state.store.clone();
        async move {
            if let Err(e) = store.delete(CHECKS, check_id).await {
                tracing::warn!("Could not delete check {check_id} of removed user: {e}");
            }
        }
    });
    join_all(deletions).await;

    (StatusCode::OK, Json(json!({}))).into_response()
}

fn non_empty(field: Option<String>) -> Option<String> {
    field
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
