use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Runtime configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub env_name: String,
    pub http_port: u16,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    /// Seconds between check-scheduler ticks, start to start.
    pub check_interval_secs: u64,
    /// Seconds between log-rotation ticks.
    pub log_rotation_interval_secs: u64,
    /// Maximum number of checks a single user may own.
    pub max_checks: usize,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_from_phone: String,
}

impl Config {
    pub fn from_env() -> Self {
        let env_name = env::var("ENV_NAME")
            .map(|v| v.to_lowercase())
            .unwrap_or_else(|_| "staging".to_string());

        let default_port = if env_name == "production" { 5000 } else { 3000 };

        Self {
            http_port: env_or("HTTP_PORT", default_port),
            data_dir: PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| ".data".into())),
            log_dir: PathBuf::from(env::var("LOG_DIR").unwrap_or_else(|_| ".logs".into())),
            check_interval_secs: env_or("CHECK_INTERVAL_SECS", 60),
            log_rotation_interval_secs: env_or("LOG_ROTATION_INTERVAL_SECS", 60 * 60 * 24),
            max_checks: env_or("MAX_CHECKS", 5),
            twilio_account_sid: env::var("TWILIO_ACCOUNT_SID").unwrap_or_default(),
            twilio_auth_token: env::var("TWILIO_AUTH_TOKEN").unwrap_or_default(),
            twilio_from_phone: env::var("TWILIO_FROM_PHONE").unwrap_or_default(),
            env_name,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
