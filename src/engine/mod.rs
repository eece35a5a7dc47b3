//! Conversation engine — the booking-flow state machine.
//!
//! One inbound message is one turn: load the session, dispatch on state,
//! mutate an owned copy, write it back once, return the outbound text.
//! Nothing thrown past [`ConversationEngine::handle_message`]; collaborator
//! failures become a generic retry reply with the session untouched.

pub mod locks;
pub mod replies;

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};

use crate::catalog::ProviderCatalog;
use crate::config::BotConfig;
use crate::error::Error;
use crate::intent;
use crate::matcher::ProviderMatcher;
use crate::payment::{InitiationOutcome, PaymentInitiator};
use crate::session::{ConversationState, Session};
use crate::store::SessionStore;

pub use locks::SessionLocks;

/// The conversation state machine.
///
/// Collaborators are injected so tests can substitute deterministic fakes
/// and production can substitute durable backends.
pub struct ConversationEngine {
    store: Arc<dyn SessionStore>,
    matcher: ProviderMatcher,
    payments: Arc<dyn PaymentInitiator>,
    locks: Arc<SessionLocks>,
    config: BotConfig,
}

impl ConversationEngine {
    pub fn new(
        store: Arc<dyn SessionStore>,
        catalog: Arc<dyn ProviderCatalog>,
        payments: Arc<dyn PaymentInitiator>,
        locks: Arc<SessionLocks>,
        config: BotConfig,
    ) -> Self {
        let matcher = ProviderMatcher::new(catalog, config.max_providers);
        Self {
            store,
            matcher,
            payments,
            locks,
            config,
        }
    }

    /// Process one inbound message and return the reply text.
    ///
    /// Never fails past this boundary: any collaborator error is logged and
    /// mapped to a generic retry message, with the session left in its
    /// pre-turn state.
    pub async fn handle_message(
        &self,
        user_id: &str,
        text: &str,
        display_name: Option<&str>,
    ) -> String {
        let _guard = self.locks.lock(user_id).await;
        match self.process_turn(user_id, text, display_name).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(user_id, error = %e, "turn failed; session left unchanged");
                replies::generic_retry()
            }
        }
    }

    /// One turn: load or create the session, dispatch, persist once.
    async fn process_turn(
        &self,
        user_id: &str,
        text: &str,
        display_name: Option<&str>,
    ) -> Result<String, Error> {
        let mut session = match self.store.get(user_id).await? {
            Some(session) => session,
            None => {
                let session = Session::new(user_id, display_name);
                self.store.create(&session).await?;
                info!(user_id, "new session");
                session
            }
        };
        if session.display_name.is_none() {
            session.display_name = display_name.map(str::to_string);
        }

        let input = text.trim().to_lowercase();
        info!(user_id, state = %session.state, "processing message");

        let reply = match session.state {
            ConversationState::Welcome => self.on_welcome(&mut session),
            ConversationState::ServiceSelection => self.on_service_selection(&mut session, &input),
            ConversationState::LocationRequest => {
                self.on_location_request(&mut session, &input).await?
            }
            ConversationState::ProviderSelection => self.on_provider_selection(&mut session, &input),
            ConversationState::BookingDetails => self.on_booking_details(&mut session, &input),
            ConversationState::Payment => self.on_payment(&mut session, &input).await?,
            // Terminal for this flow; any further message starts a new one.
            ConversationState::Completed => self.on_welcome(&mut session),
        };

        session.touch();
        self.store.update(&session).await?;
        Ok(reply)
    }

    /// Welcome (and post-completion restart): greet and show the menu.
    fn on_welcome(&self, session: &mut Session) -> String {
        session.transition_to(ConversationState::ServiceSelection);
        let name = session.display_name.as_deref().unwrap_or("there");
        replies::greeting(name, &self.config)
    }

    fn on_service_selection(&self, session: &mut Session, input: &str) -> String {
        match intent::classify_service(input) {
            Some(category) => {
                session.selected_service = Some(category.name.to_string());
                session.transition_to(ConversationState::LocationRequest);
                info!(user_id = %session.user_id, service = category.name, "service selected");
                replies::location_prompt(category)
            }
            None => replies::unrecognized_service(),
        }
    }

    async fn on_location_request(
        &self,
        session: &mut Session,
        input: &str,
    ) -> Result<String, Error> {
        let Some(location) = intent::extract_location(input) else {
            return Ok(replies::location_help());
        };

        // The service is always set before LocationRequest; an absent value
        // falls out below as an empty category.
        let service = session.selected_service.clone().unwrap_or_default();
        let providers = self.matcher.find_providers(&service, &location).await?;

        if providers.is_empty() {
            info!(user_id = %session.user_id, service = %service, location = %location, "empty category; not advancing");
            return Ok(replies::no_providers(&service, &location));
        }

        let reply = replies::provider_list(&service, &location, &providers, &self.config);
        session.location = Some(location);
        session.available_providers = providers;
        session.transition_to(ConversationState::ProviderSelection);
        Ok(reply)
    }

    fn on_provider_selection(&self, session: &mut Session, input: &str) -> String {
        let count = session.available_providers.len();
        // A syntactically valid index against an empty list is just as
        // out-of-range as "9".
        let selection = match input.parse::<usize>() {
            Ok(n) if (1..=count).contains(&n) => n,
            _ => return replies::selection_reprompt(count),
        };

        let provider = session.available_providers[selection - 1].clone();
        let reply = replies::provider_summary(&provider, &self.config);
        info!(user_id = %session.user_id, provider = %provider.name, "provider selected");
        session.selected_provider = Some(provider);
        session.transition_to(ConversationState::BookingDetails);
        reply
    }

    fn on_booking_details(&self, session: &mut Session, input: &str) -> String {
        if input.is_empty() {
            return replies::booking_details_reprompt();
        }

        let Some(provider) = session.selected_provider.clone() else {
            // Unreachable through the state machine; recover by re-asking.
            return replies::selection_reprompt(session.available_providers.len());
        };
        let service = session.selected_service.clone().unwrap_or_default();

        session.booking_details = Some(input.to_string());
        session.transition_to(ConversationState::Payment);
        replies::booking_summary(&service, &provider, input, &self.config)
    }

    async fn on_payment(&self, session: &mut Session, input: &str) -> Result<String, Error> {
        match input {
            "pay" => {
                let reference = format!("BOOKING_{}", Utc::now().format("%Y%m%d%H%M%S"));
                let outcome = self
                    .payments
                    .start(&session.user_id, self.config.booking_fee, &reference)
                    .await?;

                match outcome {
                    InitiationOutcome::Accepted { request_handle, .. } => {
                        info!(
                            user_id = %session.user_id,
                            handle = %request_handle,
                            "payment initiated"
                        );
                        session.payment_request_handle = Some(request_handle);
                        session.transition_to(ConversationState::Completed);
                        Ok(replies::payment_pending(&self.config))
                    }
                    InitiationOutcome::Declined { message } => {
                        info!(user_id = %session.user_id, reason = %message, "payment declined");
                        Ok(replies::payment_failed(&message))
                    }
                }
            }
            "back" => {
                session.transition_to(ConversationState::BookingDetails);
                Ok(replies::resupply_details())
            }
            _ => Ok(replies::payment_reprompt()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::error::{PaymentError, StoreError};
    use crate::store::InMemoryStore;
    use async_trait::async_trait;

    /// Payment initiator with scripted behavior.
    enum MockPayments {
        Accept,
        Decline(&'static str),
        Unreachable,
    }

    #[async_trait]
    impl PaymentInitiator for MockPayments {
        async fn start(
            &self,
            _user_id: &str,
            _amount: u32,
            reference: &str,
        ) -> Result<InitiationOutcome, PaymentError> {
            match self {
                MockPayments::Accept => Ok(InitiationOutcome::Accepted {
                    request_handle: format!("ws_CO_{reference}"),
                    message: "ok".into(),
                }),
                MockPayments::Decline(reason) => Ok(InitiationOutcome::Declined {
                    message: (*reason).to_string(),
                }),
                MockPayments::Unreachable => {
                    Err(PaymentError::RequestFailed("connection refused".into()))
                }
            }
        }
    }

    /// Store whose reads always fail, for boundary tests.
    struct FailingStore;

    #[async_trait]
    impl SessionStore for FailingStore {
        async fn get(&self, _user_id: &str) -> Result<Option<Session>, StoreError> {
            Err(StoreError::Backend("connection reset".into()))
        }
        async fn create(&self, _session: &Session) -> Result<(), StoreError> {
            Err(StoreError::Backend("connection reset".into()))
        }
        async fn update(&self, _session: &Session) -> Result<(), StoreError> {
            Err(StoreError::Backend("connection reset".into()))
        }
        async fn find_by_payment_handle(
            &self,
            _handle: &str,
        ) -> Result<Option<Session>, StoreError> {
            Err(StoreError::Backend("connection reset".into()))
        }
        async fn insert_booking(
            &self,
            _booking: &crate::booking::Booking,
        ) -> Result<(), StoreError> {
            Err(StoreError::Backend("connection reset".into()))
        }
        async fn get_booking(
            &self,
            _booking_id: &str,
        ) -> Result<Option<crate::booking::Booking>, StoreError> {
            Err(StoreError::Backend("connection reset".into()))
        }
    }

    const USER: &str = "+254700000000";

    fn engine_with(store: Arc<dyn SessionStore>, payments: MockPayments) -> ConversationEngine {
        ConversationEngine::new(
            store,
            Arc::new(InMemoryCatalog::with_sample_providers()),
            Arc::new(payments),
            Arc::new(SessionLocks::new()),
            BotConfig::default(),
        )
    }

    fn engine(store: Arc<InMemoryStore>) -> ConversationEngine {
        engine_with(store, MockPayments::Accept)
    }

    async fn state_of(store: &InMemoryStore) -> ConversationState {
        store.get(USER).await.unwrap().unwrap().state
    }

    /// Drive the session up to (and including) the given state.
    async fn drive_to(engine: &ConversationEngine, state: ConversationState) {
        let script: &[&str] = match state {
            ConversationState::ServiceSelection => &["hi"],
            ConversationState::LocationRequest => &["hi", "1"],
            ConversationState::ProviderSelection => &["hi", "1", "Westlands"],
            ConversationState::BookingDetails => &["hi", "1", "Westlands", "1"],
            ConversationState::Payment => &["hi", "1", "Westlands", "1", "Fix a leaking tap"],
            _ => panic!("unsupported target state {state}"),
        };
        for message in script {
            engine.handle_message(USER, message, Some("Test User")).await;
        }
    }

    #[tokio::test]
    async fn first_message_greets_and_shows_menu() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(store.clone());

        let reply = engine.handle_message(USER, "hi", Some("Alice")).await;
        assert!(reply.contains("Hi Alice"));
        assert!(reply.contains("1. 🔧 Plumbing"));
        assert!(reply.contains("6. 🎨 Painting"));
        assert_eq!(state_of(&store).await, ConversationState::ServiceSelection);
    }

    #[tokio::test]
    async fn valid_digit_selects_service_and_advances() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(store.clone());
        drive_to(&engine, ConversationState::ServiceSelection).await;

        let reply = engine.handle_message(USER, "1", None).await;
        assert!(reply.contains("Plumbing"));

        let session = store.get(USER).await.unwrap().unwrap();
        assert_eq!(session.state, ConversationState::LocationRequest);
        assert_eq!(session.selected_service.as_deref(), Some("Plumbing"));
    }

    #[tokio::test]
    async fn every_menu_digit_selects_its_category() {
        use crate::catalog::SERVICES;
        for category in SERVICES {
            let store = Arc::new(InMemoryStore::new());
            let engine = engine(store.clone());
            drive_to(&engine, ConversationState::ServiceSelection).await;

            engine.handle_message(USER, category.key, None).await;
            let session = store.get(USER).await.unwrap().unwrap();
            assert_eq!(session.state, ConversationState::LocationRequest);
            assert_eq!(session.selected_service.as_deref(), Some(category.name));
        }
    }

    #[tokio::test]
    async fn keyword_message_selects_service() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(store.clone());
        drive_to(&engine, ConversationState::ServiceSelection).await;

        engine.handle_message(USER, "my kitchen tap is leaking", None).await;
        let session = store.get(USER).await.unwrap().unwrap();
        assert_eq!(session.selected_service.as_deref(), Some("Plumbing"));
    }

    #[tokio::test]
    async fn unrecognized_service_reply_keeps_state() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(store.clone());
        drive_to(&engine, ConversationState::ServiceSelection).await;

        let reply = engine.handle_message(USER, "ummm", None).await;
        assert!(reply.contains("didn't quite understand"));
        assert_eq!(state_of(&store).await, ConversationState::ServiceSelection);
    }

    #[tokio::test]
    async fn location_lists_ranked_providers() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(store.clone());
        drive_to(&engine, ConversationState::LocationRequest).await;

        let reply = engine.handle_message(USER, "Westlands", None).await;
        // Highest-rated plumbing provider first.
        assert!(reply.contains("1. *Mike Johnson*"));
        assert!(reply.contains("⭐ 4.9/5 (245 reviews)"));
        assert!(reply.contains("KES 1200/hour"));

        let session = store.get(USER).await.unwrap().unwrap();
        assert_eq!(session.state, ConversationState::ProviderSelection);
        assert_eq!(session.location.as_deref(), Some("Westlands"));
        assert_eq!(session.available_providers.len(), 3);
    }

    #[tokio::test]
    async fn unparseable_location_keeps_state() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(store.clone());
        drive_to(&engine, ConversationState::LocationRequest).await;

        let reply = engine
            .handle_message(USER, "well it is quite far, past the river and the old market", None)
            .await;
        assert!(reply.contains("I need your location"));
        let session = store.get(USER).await.unwrap().unwrap();
        assert_eq!(session.state, ConversationState::LocationRequest);
        assert!(session.location.is_none());
    }

    #[tokio::test]
    async fn empty_category_does_not_advance() {
        let store = Arc::new(InMemoryStore::new());
        let engine = ConversationEngine::new(
            store.clone(),
            Arc::new(InMemoryCatalog::empty()),
            Arc::new(MockPayments::Accept),
            Arc::new(SessionLocks::new()),
            BotConfig::default(),
        );
        engine.handle_message(USER, "hi", None).await;
        engine.handle_message(USER, "1", None).await;

        let reply = engine.handle_message(USER, "Westlands", None).await;
        assert!(reply.contains("couldn't find any plumbing providers"));
        let session = store.get(USER).await.unwrap().unwrap();
        assert_eq!(session.state, ConversationState::LocationRequest);
        assert!(session.available_providers.is_empty());
    }

    #[tokio::test]
    async fn in_range_selection_advances() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(store.clone());
        drive_to(&engine, ConversationState::ProviderSelection).await;

        let reply = engine.handle_message(USER, "2", None).await;
        assert!(reply.contains("Excellent choice"));

        let session = store.get(USER).await.unwrap().unwrap();
        assert_eq!(session.state, ConversationState::BookingDetails);
        let selected = session.selected_provider.unwrap();
        assert_eq!(selected.name, session.available_providers[1].name);
    }

    #[tokio::test]
    async fn out_of_range_selection_keeps_state() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(store.clone());
        drive_to(&engine, ConversationState::ProviderSelection).await;

        for input in ["0", "4", "99", "first", "-1", ""] {
            let reply = engine.handle_message(USER, input, None).await;
            assert!(reply.contains("Please select a provider"), "input {input:?}");
            let session = store.get(USER).await.unwrap().unwrap();
            assert_eq!(session.state, ConversationState::ProviderSelection);
            assert!(session.selected_provider.is_none());
        }
    }

    #[tokio::test]
    async fn empty_booking_details_reprompts() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(store.clone());
        drive_to(&engine, ConversationState::BookingDetails).await;

        let reply = engine.handle_message(USER, "   ", None).await;
        assert!(reply.contains("details"));
        let session = store.get(USER).await.unwrap().unwrap();
        assert_eq!(session.state, ConversationState::BookingDetails);
        assert!(session.booking_details.is_none());
    }

    #[tokio::test]
    async fn booking_details_produce_cost_estimate() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(store.clone());
        drive_to(&engine, ConversationState::BookingDetails).await;

        let reply = engine.handle_message(USER, "Fix a leaking tap", None).await;
        // Mike Johnson: 1200/hour × 2-hour minimum.
        assert!(reply.contains("KES 2400"));
        assert!(reply.contains("2 hours minimum"));
        assert_eq!(state_of(&store).await, ConversationState::Payment);
    }

    #[tokio::test]
    async fn full_flow_reaches_completed_with_expiry_notice() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(store.clone());

        let script = ["hi", "1", "Westlands", "1", "Fix a leaking tap"];
        for message in script {
            engine.handle_message(USER, message, Some("Test User")).await;
        }
        let reply = engine.handle_message(USER, "pay", None).await;

        assert!(reply.contains("2 minutes"));
        let session = store.get(USER).await.unwrap().unwrap();
        assert_eq!(session.state, ConversationState::Completed);
        assert!(session.payment_request_handle.is_some());
    }

    #[tokio::test]
    async fn declined_payment_keeps_state_and_surfaces_reason() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine_with(store.clone(), MockPayments::Decline("insufficient float"));
        drive_to(&engine, ConversationState::Payment).await;

        let reply = engine.handle_message(USER, "pay", None).await;
        assert!(reply.contains("insufficient float"));
        let session = store.get(USER).await.unwrap().unwrap();
        assert_eq!(session.state, ConversationState::Payment);
        assert!(session.payment_request_handle.is_none());
    }

    #[tokio::test]
    async fn unreachable_gateway_maps_to_generic_retry() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine_with(store.clone(), MockPayments::Unreachable);
        drive_to(&engine, ConversationState::Payment).await;

        let reply = engine.handle_message(USER, "pay", None).await;
        assert_eq!(reply, replies::generic_retry());
        assert_eq!(state_of(&store).await, ConversationState::Payment);
    }

    #[tokio::test]
    async fn back_returns_to_booking_details() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(store.clone());
        drive_to(&engine, ConversationState::Payment).await;

        let reply = engine.handle_message(USER, "back", None).await;
        assert!(reply.contains("booking details again"));
        assert_eq!(state_of(&store).await, ConversationState::BookingDetails);

        // New details replace the old ones and return to payment.
        let reply = engine.handle_message(USER, "Actually the shower, not the tap", None).await;
        assert!(reply.contains("booking summary"));
        let session = store.get(USER).await.unwrap().unwrap();
        assert_eq!(session.state, ConversationState::Payment);
        assert!(session.booking_details.unwrap().contains("shower"));
    }

    #[tokio::test]
    async fn other_payment_input_reprompts() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(store.clone());
        drive_to(&engine, ConversationState::Payment).await;

        let reply = engine.handle_message(USER, "maybe later", None).await;
        assert!(reply.contains("'PAY'"));
        assert_eq!(state_of(&store).await, ConversationState::Payment);
    }

    #[tokio::test]
    async fn message_after_completion_restarts_flow() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(store.clone());
        for message in ["hi", "1", "Westlands", "1", "Fix a leaking tap", "pay"] {
            engine.handle_message(USER, message, Some("Test User")).await;
        }

        let reply = engine.handle_message(USER, "hello again", None).await;
        assert!(reply.contains("What service do you need today?"));
        assert_eq!(state_of(&store).await, ConversationState::ServiceSelection);
    }

    #[tokio::test]
    async fn store_failure_returns_generic_retry() {
        let engine = engine_with(Arc::new(FailingStore), MockPayments::Accept);
        let reply = engine.handle_message(USER, "hi", None).await;
        assert_eq!(reply, replies::generic_retry());
    }
}
