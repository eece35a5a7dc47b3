//! Booking finalization — turns a confirmed payment into an immutable
//! booking record and notifies both parties.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::Provider;
use crate::channels::MessageSender;
use crate::engine::locks::SessionLocks;
use crate::error::Result;
use crate::session::Session;
use crate::store::SessionStore;

/// Asynchronous payment-confirmation event from the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub request_handle: String,
    /// `0` is success; any other value is failure.
    pub result_code: i64,
}

impl PaymentConfirmation {
    pub fn succeeded(&self) -> bool {
        self.result_code == 0
    }
}

/// Booking status. Bookings are only created confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
}

/// Payment status. Bookings are only created once paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
}

/// Immutable booking record, created exactly once per completed payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub booking_id: String,
    pub client_id: String,
    pub client_name: Option<String>,
    pub service: String,
    pub provider: Provider,
    pub location: String,
    pub details: String,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Build a booking from a session that has walked the full flow.
    /// Returns `None` if the session is missing any required field.
    pub fn from_session(session: &Session) -> Option<Booking> {
        let created_at = Utc::now();
        Some(Booking {
            booking_id: generate_booking_id(created_at),
            client_id: session.user_id.clone(),
            client_name: session.display_name.clone(),
            service: session.selected_service.clone()?,
            provider: session.selected_provider.clone()?,
            location: session.location.clone()?,
            details: session.booking_details.clone()?,
            status: BookingStatus::Confirmed,
            payment_status: PaymentStatus::Paid,
            created_at,
        })
    }
}

/// Booking id: creation timestamp plus a collision-resistant suffix.
fn generate_booking_id(created_at: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("GH{}{}", created_at.format("%Y%m%d%H%M%S"), &suffix[..6])
}

/// Finalizes bookings when payment confirmations arrive.
pub struct BookingFinalizer {
    store: Arc<dyn SessionStore>,
    sender: Arc<dyn MessageSender>,
    locks: Arc<SessionLocks>,
}

impl BookingFinalizer {
    pub fn new(
        store: Arc<dyn SessionStore>,
        sender: Arc<dyn MessageSender>,
        locks: Arc<SessionLocks>,
    ) -> Self {
        Self {
            store,
            sender,
            locks,
        }
    }

    /// Handle one confirmation event.
    ///
    /// Returns the booking when one was created. Failure codes, unknown
    /// handles, and duplicate confirmations are benign no-ops (`None`).
    pub async fn handle_confirmation(
        &self,
        event: PaymentConfirmation,
    ) -> Result<Option<Booking>> {
        if !event.succeeded() {
            info!(
                handle = %event.request_handle,
                code = event.result_code,
                "payment failed; no booking created"
            );
            return Ok(None);
        }

        let Some(session) = self.store.find_by_payment_handle(&event.request_handle).await?
        else {
            info!(
                handle = %event.request_handle,
                "no session for payment handle (duplicate or stale confirmation)"
            );
            return Ok(None);
        };

        let _guard = self.locks.lock(&session.user_id).await;

        // Re-read under the lock: a concurrent confirmation for the same
        // handle may have finalized between the lookup and here.
        let Some(mut session) = self.store.get(&session.user_id).await? else {
            return Ok(None);
        };
        if session.payment_request_handle.as_deref() != Some(event.request_handle.as_str()) {
            info!(
                handle = %event.request_handle,
                user_id = %session.user_id,
                "session already finalized; ignoring duplicate confirmation"
            );
            return Ok(None);
        }

        let Some(booking) = Booking::from_session(&session) else {
            warn!(
                user_id = %session.user_id,
                state = %session.state,
                "session holds a payment handle but is missing booking fields"
            );
            return Ok(None);
        };

        // Clearing the handle is the idempotency guard: a second
        // confirmation for this handle no longer finds a session.
        session.payment_request_handle = None;
        self.store.update(&session).await?;
        self.store.insert_booking(&booking).await?;

        info!(
            booking_id = %booking.booking_id,
            client = %booking.client_id,
            provider = %booking.provider.name,
            "booking confirmed"
        );

        let client_text = client_confirmation_text(&booking);
        if let Err(e) = self.sender.send(&booking.client_id, &client_text).await {
            warn!(error = %e, client = %booking.client_id, "failed to send client confirmation");
        }

        let provider_text = provider_notification_text(&booking);
        if let Err(e) = self.sender.send(&booking.provider.contact, &provider_text).await {
            warn!(error = %e, provider = %booking.provider.name, "failed to send provider notification");
        }

        Ok(Some(booking))
    }
}

/// Confirmation message sent to the client.
fn client_confirmation_text(booking: &Booking) -> String {
    format!(
        "✅ *Payment Confirmed!*\n\n\
         Your booking has been confirmed:\n\n\
         🆔 Booking ID: {}\n\
         🔧 Service: {}\n\
         👨‍🔧 Provider: {}\n\
         📞 Provider Contact: {}\n\n\
         Your provider will contact you shortly to confirm the appointment time.\n\n\
         Thank you for using GrooveHire! 🎉",
        booking.booking_id, booking.service, booking.provider.name, booking.provider.contact
    )
}

/// Notification message sent to the provider.
fn provider_notification_text(booking: &Booking) -> String {
    format!(
        "🔔 *New Booking Alert!*\n\n\
         You have a new booking request:\n\n\
         🆔 Booking ID: {}\n\
         🔧 Service: {}\n\
         👤 Client: {}\n\
         📞 Client Contact: {}\n\
         📝 Details: {}\n\n\
         Please contact the client to confirm the appointment time.",
        booking.booking_id,
        booking.service,
        booking.client_name.as_deref().unwrap_or("Client"),
        booking.client_id,
        booking.details
    )
}
