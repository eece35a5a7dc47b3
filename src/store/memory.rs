//! In-memory store — the deterministic backend used by demo wiring and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::booking::Booking;
use crate::error::StoreError;
use crate::session::Session;
use crate::store::traits::SessionStore;

/// RwLock'd maps keyed by user id and booking id.
pub struct InMemoryStore {
    sessions: RwLock<HashMap<String, Session>>,
    bookings: RwLock<HashMap<String, Booking>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            bookings: RwLock::new(HashMap::new()),
        }
    }

    /// Number of persisted bookings (test helper).
    pub async fn booking_count(&self) -> usize {
        self.bookings.read().await.len()
    }

    /// Snapshot of all persisted bookings (test helper).
    pub async fn bookings(&self) -> Vec<Booking> {
        self.bookings.read().await.values().cloned().collect()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn get(&self, user_id: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.read().await.get(user_id).cloned())
    }

    async fn create(&self, session: &Session) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.user_id) {
            return Err(StoreError::SessionExists(session.user_id.clone()));
        }
        debug!(user_id = %session.user_id, "created session");
        sessions.insert(session.user_id.clone(), session.clone());
        Ok(())
    }

    async fn update(&self, session: &Session) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        if !sessions.contains_key(&session.user_id) {
            return Err(StoreError::SessionNotFound(session.user_id.clone()));
        }
        sessions.insert(session.user_id.clone(), session.clone());
        Ok(())
    }

    async fn find_by_payment_handle(
        &self,
        handle: &str,
    ) -> Result<Option<Session>, StoreError> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .find(|s| s.payment_request_handle.as_deref() == Some(handle))
            .cloned())
    }

    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        let mut bookings = self.bookings.write().await;
        if bookings.contains_key(&booking.booking_id) {
            return Err(StoreError::BookingExists(booking.booking_id.clone()));
        }
        debug!(booking_id = %booking.booking_id, "persisted booking");
        bookings.insert(booking.booking_id.clone(), booking.clone());
        Ok(())
    }

    async fn get_booking(&self, booking_id: &str) -> Result<Option<Booking>, StoreError> {
        Ok(self.bookings.read().await.get(booking_id).cloned())
    }
}
