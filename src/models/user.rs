use serde::{Deserialize, Serialize};
use serde_json::json;

/// Account record, keyed by phone number in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub hashed_password: String,
    pub tos_agreement: bool,
    /// Ids of the checks this user owns.
    #[serde(default)]
    pub checks: Vec<String>,
}

impl User {
    /// API-facing view of the record, without the password hash.
    pub fn public(&self) -> serde_json::Value {
        json!({
            "firstName": self.first_name,
            "lastName": self.last_name,
            "phone": self.phone,
            "tosAgreement": self.tos_agreement,
            "checks": self.checks,
        })
    }
}
