use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{self, check_handler, token_handler, user_handler};
use crate::AppState;

pub fn user_routes() -> Router<AppState> {
    Router::new().route(
        "/users",
        post(user_handler::create_user)
            .get(user_handler::get_user)
            .put(user_handler::update_user)
            .delete(user_handler::delete_user),
    )
}

pub fn token_routes() -> Router<AppState> {
    Router::new().route(
        "/tokens",
        post(token_handler::create_token)
            .get(token_handler::get_token)
            .put(token_handler::update_token)
            .delete(token_handler::delete_token),
    )
}

pub fn check_routes() -> Router<AppState> {
    Router::new().route(
        "/checks",
        post(check_handler::create_check)
            .get(check_handler::get_check)
            .put(check_handler::update_check)
            .delete(check_handler::delete_check),
    )
}

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .merge(user_routes())
        .merge(token_routes())
        .merge(check_routes())
}
