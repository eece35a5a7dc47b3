//! HTTP surface — WhatsApp webhook, payment callback, health.

use std::sync::Arc;

use axum::extract::{Form, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::booking::{BookingFinalizer, PaymentConfirmation};
use crate::engine::ConversationEngine;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ConversationEngine>,
    pub finalizer: Arc<BookingFinalizer>,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/webhook/whatsapp", post(whatsapp_webhook))
        .route("/webhook/payments", post(payment_callback))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Twilio's inbound-message webhook form.
#[derive(Debug, Deserialize)]
pub struct TwilioInbound {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "Body")]
    pub body: String,
    #[serde(rename = "ProfileName")]
    pub profile_name: Option<String>,
}

async fn whatsapp_webhook(
    State(state): State<AppState>,
    Form(inbound): Form<TwilioInbound>,
) -> impl IntoResponse {
    // Twilio addresses WhatsApp senders as `whatsapp:+2547…`.
    let user_id = inbound.from.trim_start_matches("whatsapp:").to_string();
    info!(user = %user_id, "inbound WhatsApp message");

    let reply = state
        .engine
        .handle_message(&user_id, &inbound.body, inbound.profile_name.as_deref())
        .await;

    ([(header::CONTENT_TYPE, "application/xml")], twiml(&reply))
}

/// Gateway payment-callback body, field names as the gateway sends them.
#[derive(Debug, Deserialize)]
pub struct PaymentCallback {
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(rename = "ResultCode")]
    pub result_code: i64,
}

async fn payment_callback(
    State(state): State<AppState>,
    Json(callback): Json<PaymentCallback>,
) -> Json<serde_json::Value> {
    info!(
        handle = %callback.checkout_request_id,
        code = callback.result_code,
        "payment callback received"
    );

    let event = PaymentConfirmation {
        request_handle: callback.checkout_request_id,
        result_code: callback.result_code,
    };

    match state.finalizer.handle_confirmation(event).await {
        Ok(_) => Json(json!({"ResultCode": 0, "ResultDesc": "Success"})),
        Err(e) => {
            error!(error = %e, "payment callback processing failed");
            Json(json!({"ResultCode": 1, "ResultDesc": "Error"}))
        }
    }
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({"message": "GrooveHire WhatsApp bot is running"}))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": "groovehire",
    }))
}

/// Wrap a reply in a TwiML messaging response.
fn twiml(reply: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{}</Message></Response>",
        xml_escape(reply)
    )
}

fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
