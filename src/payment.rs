//! Payment initiation — M-Pesa STK push, with a simulated fallback for
//! local development.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use crate::error::PaymentError;

/// Outcome of a payment-initiation attempt that reached the gateway.
///
/// Collaborator failures (gateway unreachable, bad credentials) surface as
/// [`PaymentError`] instead and are handled at the engine boundary.
#[derive(Debug, Clone)]
pub enum InitiationOutcome {
    /// The gateway accepted the request and will prompt the client.
    Accepted {
        /// Handle the asynchronous confirmation will carry back.
        request_handle: String,
        message: String,
    },
    /// The gateway rejected the request.
    Declined { message: String },
}

/// Starts an external charge and reports a request handle.
#[async_trait]
pub trait PaymentInitiator: Send + Sync {
    async fn start(
        &self,
        user_id: &str,
        amount: u32,
        reference: &str,
    ) -> Result<InitiationOutcome, PaymentError>;
}

// ── Simulated initiator ─────────────────────────────────────────────

/// Always-accepting initiator used when M-Pesa credentials are not set.
pub struct SimulatedPayments;

impl SimulatedPayments {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SimulatedPayments {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentInitiator for SimulatedPayments {
    async fn start(
        &self,
        user_id: &str,
        amount: u32,
        reference: &str,
    ) -> Result<InitiationOutcome, PaymentError> {
        let request_handle = format!("ws_CO_{}", Utc::now().format("%Y%m%d%H%M%S%3f"));
        info!(user_id, amount, reference, handle = %request_handle, "simulated payment initiation");
        Ok(InitiationOutcome::Accepted {
            request_handle,
            message: "Payment request sent (simulated)".to_string(),
        })
    }
}

// ── M-Pesa STK push ─────────────────────────────────────────────────

/// M-Pesa daraja credentials and endpoints.
#[derive(Clone)]
pub struct MpesaConfig {
    pub consumer_key: SecretString,
    pub consumer_secret: SecretString,
    pub shortcode: String,
    pub passkey: SecretString,
    pub auth_url: String,
    pub stk_push_url: String,
    /// Where the gateway posts the asynchronous confirmation.
    pub callback_url: String,
}

impl MpesaConfig {
    /// Build from `MPESA_*` environment variables. Returns `None` when any
    /// credential is missing, which selects the simulated initiator.
    pub fn from_env() -> Option<Self> {
        let consumer_key = std::env::var("MPESA_CONSUMER_KEY").ok()?;
        let consumer_secret = std::env::var("MPESA_CONSUMER_SECRET").ok()?;
        let shortcode = std::env::var("MPESA_SHORTCODE").ok()?;
        let passkey = std::env::var("MPESA_PASSKEY").ok()?;
        let callback_url = std::env::var("MPESA_CALLBACK_URL")
            .unwrap_or_else(|_| "https://example.invalid/webhook/payments".to_string());

        Some(Self {
            consumer_key: SecretString::from(consumer_key),
            consumer_secret: SecretString::from(consumer_secret),
            shortcode,
            passkey: SecretString::from(passkey),
            auth_url: "https://sandbox.safaricom.co.ke/oauth/v1/generate?grant_type=client_credentials"
                .to_string(),
            stk_push_url: "https://sandbox.safaricom.co.ke/mpesa/stkpush/v1/processrequest"
                .to_string(),
            callback_url,
        })
    }
}

/// STK-push client for the M-Pesa daraja API.
pub struct MpesaGateway {
    config: MpesaConfig,
    client: reqwest::Client,
}

impl MpesaGateway {
    pub fn new(config: MpesaConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Fetch an OAuth access token using the consumer key/secret.
    async fn access_token(&self) -> Result<String, PaymentError> {
        let credentials = BASE64.encode(format!(
            "{}:{}",
            self.config.consumer_key.expose_secret(),
            self.config.consumer_secret.expose_secret()
        ));

        let response = self
            .client
            .get(&self.config.auth_url)
            .header("Authorization", format!("Basic {credentials}"))
            .send()
            .await
            .map_err(|e| PaymentError::AuthFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::AuthFailed(format!("{status}: {body}")));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))?;
        body["access_token"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| PaymentError::InvalidResponse("missing access_token".to_string()))
    }

    /// Password field: base64(shortcode + passkey + timestamp).
    fn password(&self, timestamp: &str) -> String {
        BASE64.encode(format!(
            "{}{}{timestamp}",
            self.config.shortcode,
            self.config.passkey.expose_secret()
        ))
    }
}

/// Normalize a Kenyan phone number to the `254…` MSISDN form the STK-push
/// API expects.
fn normalize_msisdn(raw: &str) -> String {
    let digits = raw.trim().trim_start_matches('+');
    match digits.strip_prefix('0') {
        Some(rest) => format!("254{rest}"),
        None => digits.to_string(),
    }
}

#[async_trait]
impl PaymentInitiator for MpesaGateway {
    async fn start(
        &self,
        user_id: &str,
        amount: u32,
        reference: &str,
    ) -> Result<InitiationOutcome, PaymentError> {
        let access_token = self.access_token().await?;
        let timestamp = Utc::now().format("%Y%m%d%H%M%S").to_string();
        let phone_number = normalize_msisdn(user_id);

        let payload = serde_json::json!({
            "BusinessShortCode": self.config.shortcode,
            "Password": self.password(&timestamp),
            "Timestamp": timestamp,
            "TransactionType": "CustomerPayBillOnline",
            "Amount": amount,
            "PartyA": phone_number,
            "PartyB": self.config.shortcode,
            "PhoneNumber": phone_number,
            "CallBackURL": self.config.callback_url,
            "AccountReference": reference,
            "TransactionDesc": "GrooveHire Booking Fee",
        });

        let response = self
            .client
            .post(&self.config.stk_push_url)
            .bearer_auth(&access_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PaymentError::RequestFailed(e.to_string()))?;

        if response.status().is_success() {
            let body: serde_json::Value = response
                .json()
                .await
                .map_err(|e| PaymentError::InvalidResponse(e.to_string()))?;
            let request_handle = body["CheckoutRequestID"]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| {
                    PaymentError::InvalidResponse("missing CheckoutRequestID".to_string())
                })?;
            info!(user_id, amount, handle = %request_handle, "STK push accepted");
            Ok(InitiationOutcome::Accepted {
                request_handle,
                message: "Payment request sent successfully".to_string(),
            })
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(user_id, %status, "STK push declined");
            Ok(InitiationOutcome::Declined {
                message: format!("Payment request failed: {body}"),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msisdn_normalization() {
        assert_eq!(normalize_msisdn("0712345678"), "254712345678");
        assert_eq!(normalize_msisdn("+254712345678"), "254712345678");
        assert_eq!(normalize_msisdn("254712345678"), "254712345678");
    }

    #[tokio::test]
    async fn simulated_initiator_accepts_with_handle() {
        let payments = SimulatedPayments::new();
        let outcome = payments
            .start("+254700000000", 500, "BOOKING_20250101000000")
            .await
            .unwrap();
        match outcome {
            InitiationOutcome::Accepted { request_handle, message } => {
                assert!(request_handle.starts_with("ws_CO_"));
                assert!(message.contains("simulated"));
            }
            InitiationOutcome::Declined { .. } => panic!("simulated initiator declined"),
        }
    }
}
