//! Configuration types.

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Bot name used in outbound copy.
    pub bot_name: String,
    /// Up-front booking fee charged at payment time, in minor currency units.
    pub booking_fee: u32,
    /// Minimum billable hours used for the cost estimate.
    pub minimum_hours: u32,
    /// How long the payment prompt stays valid, in minutes.
    pub payment_expiry_minutes: u32,
    /// Currency label shown in outbound copy.
    pub currency: String,
    /// Maximum number of providers offered per search.
    pub max_providers: usize,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            bot_name: "GrooveHire".to_string(),
            booking_fee: 500,
            minimum_hours: 2,
            payment_expiry_minutes: 2,
            currency: "KES".to_string(),
            max_providers: 3,
        }
    }
}
