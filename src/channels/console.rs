//! Console channel — prints outbound messages to stdout for local runs.

use async_trait::async_trait;

use crate::channels::MessageSender;
use crate::error::ChannelError;

/// Stdout-backed sender used when Twilio credentials are not configured.
pub struct ConsoleChannel;

impl ConsoleChannel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageSender for ConsoleChannel {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), ChannelError> {
        println!("\n→ {recipient}\n{text}\n");
        Ok(())
    }
}
