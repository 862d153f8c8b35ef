//! Process-wide message bus
//!
//! Outbound notifications for other parts of the extension (the UI, the
//! backend reporter). Publishing never fails when nobody is listening.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    /// A tab was redirected away from a blocked URL
    BlockUrl { url: String, title: String },
}

impl Notification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Notification::BlockUrl { .. } => "block_url",
        }
    }
}

/// A notification stamped with its publish time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Published {
    pub published_at: DateTime<Utc>,
    pub notification: Notification,
}

#[derive(Debug, Clone)]
pub struct MessageBus {
    sender: broadcast::Sender<Published>,
}

impl MessageBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Published> {
        self.sender.subscribe()
    }

    /// Publish to every current subscriber, returning how many received it
    pub fn publish(&self, notification: Notification) -> usize {
        let event = notification.as_str();
        let published = Published {
            published_at: Utc::now(),
            notification,
        };

        match self.sender.send(published) {
            Ok(receivers) => {
                tracing::debug!(event, receivers, "Published notification");
                receivers
            }
            Err(_) => {
                tracing::debug!(event, "No subscribers for notification");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new(64)
    }
}
