//! Outbound message copy for the conversation engine.

use crate::catalog::{Provider, SERVICES, ServiceCategory};
use crate::config::BotConfig;

/// Numbered service menu, one line per category.
fn service_menu() -> String {
    SERVICES
        .iter()
        .map(|c| format!("{}. {} {}", c.key, c.emoji, c.name))
        .collect::<Vec<String>>()
        .join("\n")
}

/// Greeting plus the service menu.
pub fn greeting(name: &str, config: &BotConfig) -> String {
    format!(
        "👋 Hi {name}! Welcome to {}!\n\n\
         I'm here to help you find trusted local service providers. \
         What service do you need today?\n\n\
         {}\n\n\
         Just reply with the number (1-{}) or tell me what you need help with.",
        config.bot_name,
        service_menu(),
        SERVICES.len()
    )
}

/// Re-prompt when the service reply was not understood.
pub fn unrecognized_service() -> String {
    format!(
        "I didn't quite understand that. Please choose a service:\n\n\
         {}\n\n\
         Reply with the number (1-{}) or describe what you need.",
        service_menu(),
        SERVICES.len()
    )
}

/// Service confirmation plus the location prompt.
pub fn location_prompt(category: &ServiceCategory) -> String {
    format!(
        "Great choice! {} You've selected *{}*.\n\n\
         To find the best providers near you, please share your location or \
         tell me your area (e.g., Westlands, Karen, Kilimani, etc.)",
        category.emoji, category.name
    )
}

/// Help text when no plausible location could be extracted.
pub fn location_help() -> String {
    "I need your location to find providers near you. Please:\n\n\
     1. Tell me your area (e.g., \"Westlands\", \"Karen\", \"CBD\")\n\
     2. Give me nearby landmarks\n\n\
     Where are you located? 📍"
        .to_string()
}

/// Ranked provider list plus the selection prompt.
pub fn provider_list(
    service: &str,
    location: &str,
    providers: &[Provider],
    config: &BotConfig,
) -> String {
    let mut list = String::new();
    for (i, provider) in providers.iter().enumerate() {
        list.push_str(&format!(
            "\n{}. *{}*\n   ⭐ {}/5 ({} reviews)\n   📍 {} away\n   💰 {} {}/hour\n",
            i + 1,
            provider.name,
            provider.rating,
            provider.review_count,
            provider.distance,
            config.currency,
            provider.hourly_rate
        ));
    }

    let prompt = match providers.len() {
        1 => "Reply with 1 to book.".to_string(),
        2 => "Reply with 1 or 2.".to_string(),
        n => format!("Reply with 1, 2, or {n}."),
    };

    format!(
        "Perfect! I found these top-rated {} providers near {location}:\n{list}\n\
         Which provider would you like to book? {prompt}",
        service.to_lowercase()
    )
}

/// Shown when the chosen category has no providers at all.
pub fn no_providers(service: &str, location: &str) -> String {
    format!(
        "Sorry, I couldn't find any {} providers in {location} right now. \
         Please try a different area, or describe another service you need.",
        service.to_lowercase()
    )
}

/// Re-prompt for an out-of-range or non-numeric provider selection.
pub fn selection_reprompt(count: usize) -> String {
    let hint = match count {
        0 | 1 => "1".to_string(),
        2 => "1 or 2".to_string(),
        n => format!("1, 2, or {n}"),
    };
    format!("Please select a provider by replying with {hint}.")
}

/// Chosen-provider summary plus the booking-details request.
pub fn provider_summary(provider: &Provider, config: &BotConfig) -> String {
    format!(
        "Excellent choice! You've selected:\n\n\
         👨‍🔧 *{}*\n\
         ⭐ {}/5 rating\n\
         📍 {} away\n\
         💰 {} {}/hour\n\n\
         Now I need a few details to complete your booking:\n\n\
         1. What's the specific issue or work needed?\n\
         2. When would you like the service? (today, tomorrow, specific date)\n\
         3. Preferred time? (morning, afternoon, evening)\n\n\
         Please describe your needs and preferred timing.",
        provider.name, provider.rating, provider.distance, config.currency, provider.hourly_rate
    )
}

/// Re-prompt when the booking-details reply was empty.
pub fn booking_details_reprompt() -> String {
    "I still need a few details to complete your booking — what work is \
     needed, and when would you like it done?"
        .to_string()
}

/// Booking summary with the cost estimate and the pay/back instruction.
pub fn booking_summary(
    service: &str,
    provider: &Provider,
    details: &str,
    config: &BotConfig,
) -> String {
    let estimated_cost = provider.hourly_rate * config.minimum_hours;
    format!(
        "Perfect! Here's your booking summary:\n\n\
         🔧 *Service:* {service}\n\
         👨‍🔧 *Provider:* {}\n\
         📝 *Details:* {details}\n\
         💰 *Estimated Cost:* {} {estimated_cost} ({} hours minimum)\n\n\
         To confirm your booking, please pay {} {} as a booking fee. The \
         remaining amount will be paid to the provider after service completion.\n\n\
         Reply 'PAY' to proceed with M-Pesa payment, or 'BACK' to modify details.",
        provider.name, config.currency, config.minimum_hours, config.currency, config.booking_fee
    )
}

/// Payment-pending notice with the expiry window.
pub fn payment_pending(config: &BotConfig) -> String {
    let expiry = match config.payment_expiry_minutes {
        1 => "1 minute".to_string(),
        n => format!("{n} minutes"),
    };
    format!(
        "💳 M-Pesa payment request sent!\n\n\
         Please check your phone for the M-Pesa prompt and enter your PIN to \
         pay {} {}.\n\n\
         Once payment is confirmed, I'll connect you with your provider and \
         send you the booking confirmation.\n\n\
         ⏰ The payment prompt expires in {expiry}.",
        config.currency, config.booking_fee
    )
}

/// Surfaced when the initiator reported a declined initiation.
pub fn payment_failed(reason: &str) -> String {
    format!(
        "Sorry, there was an issue initiating the payment. Please try again \
         or contact support.\n\n\
         Error: {reason}"
    )
}

/// Re-prompt for anything other than pay/back at the payment step.
pub fn payment_reprompt() -> String {
    "Please reply 'PAY' to proceed with payment or 'BACK' to modify your booking details."
        .to_string()
}

/// Shown after "back" from the payment step.
pub fn resupply_details() -> String {
    "Please provide your booking details again:".to_string()
}

/// Generic turn-local failure message; the session was left unchanged.
pub fn generic_retry() -> String {
    "Sorry, I encountered an error. Please try again in a moment.".to_string()
}
