//! Conversation state machine — tracks where each user is in the booking flow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::Provider;

/// The states of the booking conversation.
///
/// Progresses linearly: Welcome → ServiceSelection → LocationRequest →
/// ProviderSelection → BookingDetails → Payment → Completed. The only
/// backward edge is Payment → BookingDetails ("back"); a message after
/// completion restarts the flow at ServiceSelection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    Welcome,
    ServiceSelection,
    LocationRequest,
    ProviderSelection,
    BookingDetails,
    Payment,
    Completed,
}

impl ConversationState {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: ConversationState) -> bool {
        use ConversationState::*;
        matches!(
            (self, target),
            (Welcome, ServiceSelection)
                | (ServiceSelection, LocationRequest)
                | (LocationRequest, ProviderSelection)
                | (ProviderSelection, BookingDetails)
                | (BookingDetails, Payment)
                | (Payment, Completed)
                | (Payment, BookingDetails)
                | (Completed, ServiceSelection)
        )
    }

    /// Whether this state is terminal for the synchronous message path.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Get the next state in the forward progression, if any.
    pub fn next(&self) -> Option<ConversationState> {
        use ConversationState::*;
        match self {
            Welcome => Some(ServiceSelection),
            ServiceSelection => Some(LocationRequest),
            LocationRequest => Some(ProviderSelection),
            ProviderSelection => Some(BookingDetails),
            BookingDetails => Some(Payment),
            Payment => Some(Completed),
            Completed => None,
        }
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::Welcome
    }
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Welcome => "welcome",
            Self::ServiceSelection => "service_selection",
            Self::LocationRequest => "location_request",
            Self::ProviderSelection => "provider_selection",
            Self::BookingDetails => "booking_details",
            Self::Payment => "payment",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// Per-user conversation session.
///
/// Created on the first message from an unknown user identifier, mutated
/// by every engine turn, never deleted by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// User identifier (phone number or equivalent).
    pub user_id: String,
    /// Display name from the channel profile, if known.
    pub display_name: Option<String>,
    /// Current conversation state.
    pub state: ConversationState,
    pub created_at: DateTime<Utc>,
    pub last_interaction_at: DateTime<Utc>,
    /// Category name chosen at service selection.
    pub selected_service: Option<String>,
    /// Location accepted at the location step.
    pub location: Option<String>,
    /// Ranked provider snapshots offered at provider selection (≤3).
    pub available_providers: Vec<Provider>,
    /// Provider chosen from `available_providers`.
    pub selected_provider: Option<Provider>,
    /// Free-text issue description and timing.
    pub booking_details: Option<String>,
    /// Handle returned by the payment initiator; cleared on finalization.
    pub payment_request_handle: Option<String>,
}

impl Session {
    /// Create a fresh session in the `Welcome` state.
    pub fn new(user_id: &str, display_name: Option<&str>) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.to_string(),
            display_name: display_name.map(str::to_string),
            state: ConversationState::Welcome,
            created_at: now,
            last_interaction_at: now,
            selected_service: None,
            location: None,
            available_providers: Vec::new(),
            selected_provider: None,
            booking_details: None,
            payment_request_handle: None,
        }
    }

    /// Move to `target`, which must be a valid transition from the current state.
    pub fn transition_to(&mut self, target: ConversationState) {
        debug_assert!(
            self.state.can_transition_to(target),
            "invalid transition {} -> {target}",
            self.state
        );
        self.state = target;
    }

    /// Refresh the last-interaction timestamp.
    pub fn touch(&mut self) {
        self.last_interaction_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transitions() {
        use ConversationState::*;
        let transitions = [
            (Welcome, ServiceSelection),
            (ServiceSelection, LocationRequest),
            (LocationRequest, ProviderSelection),
            (ProviderSelection, BookingDetails),
            (BookingDetails, Payment),
            (Payment, Completed),
            // "back" at the payment step
            (Payment, BookingDetails),
            // restart after completion
            (Completed, ServiceSelection),
        ];
        for (from, to) in transitions {
            assert!(from.can_transition_to(to), "{from} should transition to {to}");
        }
    }

    #[test]
    fn invalid_transitions() {
        use ConversationState::*;
        // Skip states
        assert!(!Welcome.can_transition_to(ProviderSelection));
        assert!(!ServiceSelection.can_transition_to(Payment));
        // Go backward outside the "back" edge
        assert!(!ProviderSelection.can_transition_to(LocationRequest));
        assert!(!BookingDetails.can_transition_to(ProviderSelection));
        // Self-transition
        assert!(!Payment.can_transition_to(Payment));
        // Terminal restart only goes to service selection
        assert!(!Completed.can_transition_to(Welcome));
    }

    #[test]
    fn is_terminal() {
        use ConversationState::*;
        assert!(Completed.is_terminal());
        assert!(!Welcome.is_terminal());
        assert!(!Payment.is_terminal());
    }

    #[test]
    fn next_walks_the_forward_path() {
        use ConversationState::*;
        let expected = [
            ServiceSelection,
            LocationRequest,
            ProviderSelection,
            BookingDetails,
            Payment,
            Completed,
        ];
        let mut current = Welcome;
        for expected_next in expected {
            let next = current.next().unwrap();
            assert_eq!(next, expected_next);
            current = next;
        }
        assert!(current.next().is_none());
    }

    #[test]
    fn display_matches_serde() {
        use ConversationState::*;
        let states = [
            Welcome,
            ServiceSelection,
            LocationRequest,
            ProviderSelection,
            BookingDetails,
            Payment,
            Completed,
        ];
        for state in states {
            let display = format!("{state}");
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(
                format!("\"{display}\""),
                json,
                "Display and serde should match for {state:?}"
            );
        }
    }

    #[test]
    fn new_session_starts_at_welcome() {
        let session = Session::new("+254700000000", Some("Test User"));
        assert_eq!(session.state, ConversationState::Welcome);
        assert_eq!(session.display_name.as_deref(), Some("Test User"));
        assert!(session.selected_service.is_none());
        assert!(session.available_providers.is_empty());
        assert!(session.payment_request_handle.is_none());
    }

    #[test]
    fn session_serde_roundtrip() {
        let mut session = Session::new("+254700000000", None);
        session.transition_to(ConversationState::ServiceSelection);
        session.selected_service = Some("Plumbing".into());

        let json = serde_json::to_string(&session).unwrap();
        let parsed: Session = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.state, ConversationState::ServiceSelection);
        assert_eq!(parsed.selected_service.as_deref(), Some("Plumbing"));
    }
}
