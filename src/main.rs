use std::sync::Arc;

use groovehire::booking::BookingFinalizer;
use groovehire::catalog::{InMemoryCatalog, ProviderCatalog};
use groovehire::channels::{ConsoleChannel, MessageSender, WhatsAppChannel};
use groovehire::config::BotConfig;
use groovehire::engine::{ConversationEngine, SessionLocks};
use groovehire::payment::{MpesaConfig, MpesaGateway, PaymentInitiator, SimulatedPayments};
use groovehire::server::{self, AppState};
use groovehire::store::InMemoryStore;

/// Read an env var, falling back to `default` on absence or parse failure.
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let defaults = BotConfig::default();
    let config = BotConfig {
        booking_fee: env_or("GROOVEHIRE_BOOKING_FEE", defaults.booking_fee),
        minimum_hours: env_or("GROOVEHIRE_MINIMUM_HOURS", defaults.minimum_hours),
        payment_expiry_minutes: env_or(
            "GROOVEHIRE_PAYMENT_EXPIRY_MIN",
            defaults.payment_expiry_minutes,
        ),
        ..defaults
    };
    let port: u16 = env_or("GROOVEHIRE_PORT", 8000);

    eprintln!("📱 GrooveHire v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Webhook:  http://0.0.0.0:{port}/webhook/whatsapp");
    eprintln!("   Payments: http://0.0.0.0:{port}/webhook/payments");
    eprintln!("   Health:   http://0.0.0.0:{port}/health");

    // ── Collaborators ───────────────────────────────────────────────
    let store: Arc<InMemoryStore> = Arc::new(InMemoryStore::new());
    let catalog: Arc<dyn ProviderCatalog> = Arc::new(InMemoryCatalog::with_sample_providers());
    let locks = Arc::new(SessionLocks::new());

    let payments: Arc<dyn PaymentInitiator> = match MpesaConfig::from_env() {
        Some(mpesa) => {
            eprintln!("   Gateway:  M-Pesa STK push");
            Arc::new(MpesaGateway::new(mpesa))
        }
        None => {
            eprintln!("   Gateway:  simulated (M-Pesa credentials not set)");
            Arc::new(SimulatedPayments::new())
        }
    };

    let sender: Arc<dyn MessageSender> = match WhatsAppChannel::from_env() {
        Some(channel) => {
            eprintln!("   Channel:  Twilio WhatsApp");
            Arc::new(channel)
        }
        None => {
            eprintln!("   Channel:  console (Twilio credentials not set)");
            Arc::new(ConsoleChannel::new())
        }
    };

    // ── Core ────────────────────────────────────────────────────────
    let engine = Arc::new(ConversationEngine::new(
        store.clone(),
        catalog,
        payments,
        Arc::clone(&locks),
        config,
    ));
    let finalizer = Arc::new(BookingFinalizer::new(store, sender, locks));

    let app = server::router(AppState { engine, finalizer });
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
