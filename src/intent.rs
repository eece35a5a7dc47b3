//! Lightweight text understanding — location extraction and service
//! classification over fixed keyword sets.
//!
//! No NLU here: the gazetteer and trigger lists are fixed, matching is
//! plain substring containment, and the first declared category wins
//! trigger ties.

use crate::catalog::{SERVICES, ServiceCategory};

/// Known local area names, matched as substrings of the inbound text.
pub const KNOWN_AREAS: &[&str] = &[
    "westlands",
    "karen",
    "kilimani",
    "cbd",
    "upperhill",
    "lavington",
    "kileleshwa",
    "parklands",
    "eastleigh",
    "kasarani",
    "thika",
    "ngong",
    "runda",
    "muthaiga",
    "gigiri",
    "spring valley",
    "riverside",
];

/// Free-form messages of at most this many words pass as locations.
const MAX_FREEFORM_LOCATION_WORDS: usize = 3;

/// Extract a plausible location from a message.
///
/// A gazetteer hit wins and is returned title-cased. Otherwise a short
/// message (≤3 words) is accepted verbatim, title-cased, on the theory
/// that a short reply to "where are you?" is a place. Longer text is
/// rejected as unparseable.
pub fn extract_location(message: &str) -> Option<String> {
    let lower = message.to_lowercase();
    for area in KNOWN_AREAS {
        if lower.contains(area) {
            return Some(title_case(area));
        }
    }

    let trimmed = message.trim();
    if !trimmed.is_empty() && trimmed.split_whitespace().count() <= MAX_FREEFORM_LOCATION_WORDS {
        return Some(title_case(trimmed));
    }

    None
}

/// Classify a service-selection reply against the fixed category set.
///
/// Match order: menu digit, then category name substring, then the first
/// category whose trigger set intersects the message.
pub fn classify_service(message: &str) -> Option<&'static ServiceCategory> {
    let text = message.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }

    if let Some(category) = SERVICES.iter().find(|c| c.key == text) {
        return Some(category);
    }

    if let Some(category) = SERVICES
        .iter()
        .find(|c| text.contains(&c.name.to_lowercase()))
    {
        return Some(category);
    }

    SERVICES
        .iter()
        .find(|c| c.triggers.iter().any(|trigger| text.contains(trigger)))
}

/// Capitalize the first letter of each whitespace-separated word.
fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
