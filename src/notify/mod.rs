// src/notify/mod.rs
pub mod message;
pub mod telegram;

pub use message::{format_alert, AlertPayload};
pub use telegram::TelegramNotifier;

use crate::error::DeliveryError;

/// Delivers one formatted text message to a fixed destination.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), DeliveryError>;
    fn name(&self) -> &'static str;
}

/// Dry-run sink: logs the message instead of sending it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str) -> Result<(), DeliveryError> {
        tracing::info!(target: "notify", %message, "dry run, alert not sent");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
