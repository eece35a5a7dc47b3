//! WhatsApp channel — sends messages through the Twilio Messages API.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::channels::MessageSender;
use crate::error::ChannelError;

/// Twilio-backed WhatsApp sender.
pub struct WhatsAppChannel {
    account_sid: String,
    auth_token: SecretString,
    from_number: String,
    client: reqwest::Client,
}

impl WhatsAppChannel {
    pub fn new(account_sid: String, auth_token: SecretString, from_number: String) -> Self {
        Self {
            account_sid,
            auth_token,
            from_number,
            client: reqwest::Client::new(),
        }
    }

    /// Build from `TWILIO_*` environment variables. Returns `None` when any
    /// credential is missing, which selects the console channel.
    pub fn from_env() -> Option<Self> {
        let account_sid = std::env::var("TWILIO_ACCOUNT_SID").ok()?;
        let auth_token = std::env::var("TWILIO_AUTH_TOKEN").ok()?;
        let from_number = std::env::var("TWILIO_WHATSAPP_NUMBER").ok()?;
        Some(Self::new(
            account_sid,
            SecretString::from(auth_token),
            from_number,
        ))
    }

    fn api_url(&self) -> String {
        format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        )
    }
}

/// Twilio addresses WhatsApp recipients as `whatsapp:+2547…`.
fn whatsapp_address(number: &str) -> String {
    if number.starts_with("whatsapp:") {
        number.to_string()
    } else {
        format!("whatsapp:{number}")
    }
}

#[async_trait]
impl MessageSender for WhatsAppChannel {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), ChannelError> {
        let params = [
            ("To", whatsapp_address(recipient)),
            ("From", whatsapp_address(&self.from_number)),
            ("Body", text.to_string()),
        ];

        let response = self
            .client
            .post(self.api_url())
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&params)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "whatsapp".into(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "whatsapp".into(),
                reason: format!("{status}: {body}"),
            });
        }

        debug!(recipient, "WhatsApp message sent");
        Ok(())
    }
}
