//! Twilio messaging transport: out-of-band WhatsApp sends and authenticated
//! media downloads.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tracing::{error, info};

const TWILIO_BASE_URL: &str = "https://api.twilio.com/2010-04-01";

/// Contract for the messaging transport.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a free-form message outside the webhook reply envelope.
    /// Returns whether the transport accepted it; failures are logged, not
    /// propagated, since follow-up prompts are best-effort.
    async fn send(&self, to: &str, body: &str) -> bool;

    /// Download an attachment from the transport's media URL.
    async fn fetch_media(&self, url: &str) -> Result<Vec<u8>>;
}

/// REST client for the Twilio API.
pub struct TwilioClient {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioClient {
    /// Create from config values. `from_number` is the bare phone number; the
    /// WhatsApp address prefix is applied on send.
    pub fn from_config(account_sid: String, auth_token: String, from_number: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            account_sid,
            auth_token,
            from_number,
        }
    }
}

#[async_trait]
impl Messenger for TwilioClient {
    async fn send(&self, to: &str, body: &str) -> bool {
        let url = format!(
            "{TWILIO_BASE_URL}/Accounts/{}/Messages.json",
            self.account_sid
        );
        let params = [
            ("From", format!("whatsapp:{}", self.from_number)),
            ("To", to.to_string()),
            ("Body", body.to_string()),
        ];

        let result = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                info!(to = %to, "whatsapp message sent");
                true
            }
            Ok(resp) => {
                error!(to = %to, status = %resp.status(), "whatsapp send rejected");
                false
            }
            Err(e) => {
                error!(to = %to, error = %e, "whatsapp send failed");
                false
            }
        }
    }

    async fn fetch_media(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await
            .context("media download request failed")?;

        if !resp.status().is_success() {
            return Err(anyhow!("media download returned {}", resp.status()));
        }

        let bytes = resp
            .bytes()
            .await
            .context("media download body read failed")?;
        Ok(bytes.to_vec())
    }
}
