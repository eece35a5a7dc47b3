//! `SessionStore` trait — the durable-storage collaborator contract.
//!
//! Implemented in-repo by [`crate::store::InMemoryStore`]; production
//! deployments substitute a durable backend behind the same trait.

use async_trait::async_trait;

use crate::booking::Booking;
use crate::error::StoreError;
use crate::session::Session;

/// Backend-agnostic storage for sessions and bookings.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Get a session by user id.
    async fn get(&self, user_id: &str) -> Result<Option<Session>, StoreError>;

    /// Create a new session. Fails if one already exists for the user.
    async fn create(&self, session: &Session) -> Result<(), StoreError>;

    /// Replace the stored session for `session.user_id`.
    ///
    /// Whole-session replacement is what gives engine turns their
    /// all-or-nothing visibility: a turn performs exactly one update.
    async fn update(&self, session: &Session) -> Result<(), StoreError>;

    /// Find the session holding a payment request handle, if any.
    async fn find_by_payment_handle(&self, handle: &str)
    -> Result<Option<Session>, StoreError>;

    /// Persist a finalized booking. Fails if the id is already present.
    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError>;

    /// Get a booking by id.
    async fn get_booking(&self, booking_id: &str) -> Result<Option<Booking>, StoreError>;
}
