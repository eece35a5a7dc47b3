//! Error types for the booking core.

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Session/booking store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Session not found for user {0}")]
    SessionNotFound(String),

    #[error("Session already exists for user {0}")]
    SessionExists(String),

    #[error("Booking {0} already exists")]
    BookingExists(String),

    #[error("Store backend failed: {0}")]
    Backend(String),
}

/// Provider catalog errors.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog lookup failed for category {category}: {reason}")]
    Lookup { category: String, reason: String },

    #[error("Catalog backend failed: {0}")]
    Backend(String),
}

/// Payment initiator errors.
///
/// A *declined* initiation is not an error — see
/// [`crate::payment::InitiationOutcome`]. These variants cover the
/// collaborator itself being unreachable or misbehaving.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment gateway authentication failed: {0}")]
    AuthFailed(String),

    #[error("Payment gateway request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response from payment gateway: {0}")]
    InvalidResponse(String),
}

/// Messaging channel errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send message on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Channel {name} misconfigured: {reason}")]
    Misconfigured { name: String, reason: String },
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
