use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("twilio credentials are not configured")]
    NotConfigured,
    #[error("recipient phone must be 10 digits")]
    InvalidRecipient,
    #[error("message body must be 1 to 1600 characters")]
    InvalidBody,
    #[error("twilio rejected the message: {status}")]
    Rejected { status: StatusCode },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Outbound SMS delivery through the Twilio REST API. Alerts are
/// fire-and-forget: callers log a failed send and move on.
#[derive(Debug, Clone)]
pub struct TwilioService {
    account_sid: String,
    auth_token: String,
    from_phone: String,
    client: Client,
}

impl TwilioService {
    pub fn new(account_sid: String, auth_token: String, from_phone: String) -> Self {
        Self {
            account_sid,
            auth_token,
            from_phone,
            client: Client::new(),
        }
    }

    pub async fn send_sms(&self, to: &str, body: &str) -> Result<(), NotifyError> {
        if self.account_sid.is_empty() || self.auth_token.is_empty() {
            return Err(NotifyError::NotConfigured);
        }

        let to = to.trim();
        if to.len() != 10 || !to.chars().all(|c| c.is_ascii_digit()) {
            return Err(NotifyError::InvalidRecipient);
        }

        let body = body.trim();
        if body.is_empty() || body.len() > 1600 {
            return Err(NotifyError::InvalidBody);
        }

        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        );
        let to_number = format!("+1{to}");
        let params = [
            ("From", self.from_phone.as_str()),
            ("To", to_number.as_str()),
            ("Body", body),
        ];

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await?;

        if response.status().is_success() {
            info!("Alert SMS sent to {to}");
            Ok(())
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!("Twilio API error: {status} - {text}");
            Err(NotifyError::Rejected { status })
        }
    }
}
