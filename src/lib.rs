pub mod config;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod utils;

use crate::config::Config;
use crate::services::twilio_service::TwilioService;
use crate::store::{FileStore, LogStore};
use axum::Router;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<FileStore>,
    pub logs: Arc<LogStore>,
    pub notifier: Arc<TwilioService>,
    pub config: Arc<Config>,
}

pub fn app(state: AppState) -> Router {
    routes::api_router().with_state(state)
}
