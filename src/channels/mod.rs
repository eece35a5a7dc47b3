//! Messaging collaborators — outbound text delivery.

pub mod console;
pub mod whatsapp;

pub use console::ConsoleChannel;
pub use whatsapp::WhatsAppChannel;

use async_trait::async_trait;

use crate::error::ChannelError;

/// Outbound message delivery, fire-and-forget from the core's view.
///
/// The core logs a failed send and moves on; retries and delivery receipts
/// are the transport's concern.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), ChannelError>;
}
