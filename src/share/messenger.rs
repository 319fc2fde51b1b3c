//! Messenger
//!
//! Best-effort delivery of a share message to the other player. Platforms
//! offer different mechanisms (native share sheet, clipboard); they are
//! chained so a failing one degrades to the next, ending in manual display
//! of the link. There is no delivery acknowledgment: a challenge counts as
//! sent once it has been encoded.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::share::link::ShareMessage;

/// How a message left the device.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Delivery {
    /// Handed to a share mechanism (share sheet, messaging app).
    Shared { via: String },
    /// Placed on the clipboard for the player to paste.
    Copied,
    /// Shown to the player to copy by hand.
    Manual { text: String },
}

/// Messenger errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MessengerError {
    /// Mechanism not available on this platform.
    #[error("{0} is not available")]
    Unavailable(&'static str),

    /// The player dismissed the share.
    #[error("share cancelled")]
    Cancelled,

    /// The mechanism failed.
    #[error("{mechanism} failed: {reason}")]
    Failed {
        mechanism: &'static str,
        reason: String,
    },
}

/// A transport for share messages.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Name used in log lines.
    fn name(&self) -> &'static str;

    /// Try to send `message`.
    async fn send(&self, message: &ShareMessage) -> Result<Delivery, MessengerError>;
}

/// Try `primary`, falling back to `fallback` on any error.
#[derive(Clone, Debug)]
pub struct Fallback<P, F> {
    primary: P,
    fallback: F,
}

impl<P, F> Fallback<P, F> {
    /// Chain two messengers.
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }

    /// Append another fallback at the end of the chain.
    pub fn or_else<N>(self, next: N) -> Fallback<Self, N> {
        Fallback::new(self, next)
    }
}

#[async_trait]
impl<P, F> Messenger for Fallback<P, F>
where
    P: Messenger,
    F: Messenger,
{
    fn name(&self) -> &'static str {
        self.primary.name()
    }

    async fn send(&self, message: &ShareMessage) -> Result<Delivery, MessengerError> {
        match self.primary.send(message).await {
            Ok(delivery) => Ok(delivery),
            Err(e) => {
                warn!("{} failed ({}), falling back to {}", self.primary.name(), e, self.fallback.name());
                self.fallback.send(message).await
            }
        }
    }
}

/// Final link in every chain: show the link for manual copying.
#[derive(Clone, Copy, Debug, Default)]
pub struct ManualDisplay;

#[async_trait]
impl Messenger for ManualDisplay {
    fn name(&self) -> &'static str {
        "manual display"
    }

    async fn send(&self, message: &ShareMessage) -> Result<Delivery, MessengerError> {
        Ok(Delivery::Manual {
            text: message.manual_text(),
        })
    }
}

/// Send through `messenger`, degrading to manual display if it fails.
///
/// Never fails.
pub async fn deliver<M>(messenger: &M, message: &ShareMessage) -> Delivery
where
    M: Messenger + ?Sized,
{
    Fallback::new(messenger, ManualDisplay)
        .send(message)
        .await
        .unwrap_or_else(|_| Delivery::Manual {
            text: message.manual_text(),
        })
}

#[async_trait]
impl<'a, M: Messenger + ?Sized> Messenger for &'a M {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn send(&self, message: &ShareMessage) -> Result<Delivery, MessengerError> {
        (**self).send(message).await
    }
}
