use crate::models::check::{Check, CheckState, HttpMethod, Protocol, TIMEOUT_SECONDS_RANGE};
use crate::models::token::Token;
use crate::models::user::User;
use crate::services::auth_service::{AuthService, TOKENS, USERS};
use crate::services::worker::CHECKS;
use crate::store::StoreError;
use crate::utils::clock::now_ms;
use crate::utils::ids::{random_id, ID_LENGTH};
use crate::AppState;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::{token_from_headers, unauthorized};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckRequest {
    pub protocol: Option<String>,
    pub url: Option<String>,
    pub method: Option<String>,
    pub success_codes: Option<Vec<u16>>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCheckRequest {
    pub id: Option<String>,
    pub protocol: Option<String>,
    pub url: Option<String>,
    pub method: Option<String>,
    pub success_codes: Option<Vec<u16>>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Deserialize)]
pub struct CheckQuery {
    pub id: String,
}

fn invalid_inputs() -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": "Missing required inputs, or inputs are invalid"})),
    )
        .into_response()
}

pub async fn create_check(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateCheckRequest>,
) -> impl IntoResponse {
    let protocol = payload.protocol.as_deref().and_then(Protocol::parse);
    let url = payload
        .url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());
    let method = payload.method.as_deref().and_then(HttpMethod::parse);
    let success_codes = payload.success_codes.filter(|codes| !codes.is_empty());
    let timeout_seconds = payload
        .timeout_seconds
        .filter(|t| TIMEOUT_SECONDS_RANGE.contains(t))
        .map(|t| t as u8);

    let (Some(protocol), Some(url), Some(method), Some(success_codes), Some(timeout_seconds)) =
        (protocol, url, method, success_codes, timeout_seconds)
    else {
        return invalid_inputs();
    };

    // The token alone names the owner here; there is no phone in the payload.
    let Some(token_id) = token_from_headers(&headers) else {
        return unauthorized();
    };
    let token: Token = match state.store.read::<Token>(TOKENS, &token_id).await {
        Ok(token) if !token.is_expired(now_ms()) => token,
        _ => return unauthorized(),
    };
    let mut user: User = match state.store.read(USERS, &token.phone).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!("Could not read user {} for new check: {e}", token.phone);
            return unauthorized();
        }
    };

    if user.checks.len() >= state.config.max_checks {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": format!(
                    "The user already has the maximum number of checks ({})",
                    state.config.max_checks
                )
            })),
        )
            .into_response();
    }

    let check = Check {
        id: random_id(ID_LENGTH),
        user_phone: user.phone.clone(),
        protocol,
        url,
        method,
        success_codes,
        timeout_seconds,
        state: CheckState::Down,
        last_checked: None,
    };

    if let Err(e) = state.store.create(CHECKS, &check.id, &check).await {
        tracing::error!("Could not create check: {e}");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "Could not create the new check"})),
        )
            .into_response();
    }

    user.checks.push(check.id.clone());
    if let Err(e) = state.store.update(USERS, &user.phone, &user).await {
        tracing::error!("Could not update user {} with new check: {e}", user.phone);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "Could not update the user with the new check"})),
        )
            .into_response();
    }

    tracing::info!("✅ Check {} created for {}", check.id, user.phone);
    (StatusCode::OK, Json(check)).into_response()
}

pub async fn get_check(
    State(state): State<AppState>,
    Query(query): Query<CheckQuery>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let check: Check = match state.store.read(CHECKS, &query.id).await {
        Ok(check) => check,
        Err(StoreError::NotFound) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!("Could not read check {}: {e}", query.id);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let auth = AuthService::new(&state.store);
    let Some(token_id) = token_from_headers(&headers) else {
        return unauthorized();
    };
    if !auth.verify_token(&token_id, &check.user_phone).await {
        return unauthorized();
    }

    (StatusCode::OK, Json(check)).into_response()
}

pub async fn update_check(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UpdateCheckRequest>,
) -> impl IntoResponse {
    let Some(id) = payload.id.filter(|id| !id.trim().is_empty()) else {
        return invalid_inputs();
    };

    // Each provided field must pass the same predicate the worker's
    // validator applies; an invalid value rejects the request rather than
    // silently writing a record the scheduler would skip.
    let protocol = match payload.protocol {
        Some(p) => match Protocol::parse(&p) {
            Some(p) => Some(p),
            None => return invalid_inputs(),
        },
        None => None,
    };
    let url = match payload.url {
        Some(u) => {
            let u = u.trim().to_string();
            if u.is_empty() {
                return invalid_inputs();
            }
            Some(u)
        }
        None => None,
    };
    let method = match payload.method {
        Some(m) => match HttpMethod::parse(&m) {
            Some(m) => Some(m),
            None => return invalid_inputs(),
        },
        None => None,
    };
    let success_codes = match payload.success_codes {
        Some(codes) => {
            if codes.is_empty() {
                return invalid_inputs();
            }
            Some(codes)
        }
        None => None,
    };
    let timeout_seconds = match payload.timeout_seconds {
        Some(t) => {
            if !TIMEOUT_SECONDS_RANGE.contains(&t) {
                return invalid_inputs();
            }
            Some(t as u8)
        }
        None => None,
    };

    if protocol.is_none()
        && url.is_none()
        && method.is_none()
        && success_codes.is_none()
        && timeout_seconds.is_none()
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Missing fields to update"})),
        )
            .into_response();
    }

    let mut check: Check = match state.store.read(CHECKS, &id).await {
        Ok(check) => check,
        Err(StoreError::NotFound) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "Check ID did not exist"})),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!("Could not read check {id}: {e}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let auth = AuthService::new(&state.store);
    let Some(token_id) = token_from_headers(&headers) else {
        return unauthorized();
    };
    if !auth.verify_token(&token_id, &check.user_phone).await {
        return unauthorized();
    }

    if let Some(protocol) = protocol {
        check.protocol = protocol;
    }
    if let Some(url) = url {
        check.url = url;
    }
    if let Some(method) = method {
        check.method = method;
    }
    if let Some(success_codes) = success_codes {
        check.success_codes = success_codes;
    }
    if let Some(timeout_seconds) = timeout_seconds {
        check.timeout_seconds = timeout_seconds;
    }

    match state.store.update(CHECKS, &id, &check).await {
        Ok(()) => (StatusCode::OK, Json(check)).into_response(),
        Err(e) => {
            tracing::error!("Could not update check {id}: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Could not update the check"})),
            )
                .into_response()
        }
    }
}

pub async fn delete_check(
    State(state): State<AppState>,
    Query(query): Query<CheckQuery>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let check: Check = match state.store.read(CHECKS, &query.id).await {
        Ok(check) => check,
        Err(StoreError::NotFound) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "The specified check ID does not exist"})),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!("Could not read check {}: {e}", query.id);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let auth = AuthService::new(&state.store);
    let Some(token_id) = token_from_headers(&headers) else {
        return unauthorized();
    };
    if !auth.verify_token(&token_id, &check.user_phone).await {
        return unauthorized();
    }

    if let Err(e) = state.store.delete(CHECKS, &query.id).await {
        tracing::error!("Could not delete check {}: {e}", query.id);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "Could not delete the specified check"})),
        )
            .into_response();
    }

    // Detach the id from its owner so the user's check list stays accurate.
    let mut user: User = match state.store.read(USERS, &check.user_phone).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(
                "Could not find the user who created check {}: {e}",
                query.id
            );
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Could not find the user who created the check, so the check was not removed from their list"
                })),
            )
                .into_response();
        }
    };
    user.checks.retain(|id| id != &query.id);
    if let Err(e) = state.store.update(USERS, &user.phone, &user).await {
        tracing::error!("Could not update user {} after check deletion: {e}", user.phone);
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (StatusCode::OK, Json(json!({}))).into_response()
}
