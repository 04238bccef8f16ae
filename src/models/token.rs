use serde::{Deserialize, Serialize};

/// Session token record, keyed by its own id in the `tokens` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub id: String,
    pub phone: String,
    /// Expiry as unix milliseconds.
    pub expires: i64,
}

impl Token {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires <= now_ms
    }
}
