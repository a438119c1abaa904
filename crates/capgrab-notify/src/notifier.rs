//! Notifier trait definition

use crate::error::Result;
use async_trait::async_trait;

/// Reference to a sent message, used to edit it later
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageHandle {
    /// Transport message id; `None` when nothing was actually sent
    pub message_id: Option<i64>,
}

impl MessageHandle {
    pub fn new(message_id: i64) -> Self {
        Self {
            message_id: Some(message_id),
        }
    }

    /// Handle for a message that did not go anywhere
    pub fn detached() -> Self {
        Self::default()
    }
}

/// Progress notification sink
///
/// Shared by every concurrent run; each call is independent. A run only
/// ever edits handles returned by its own `send` calls.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a new message; `context` names the account/template it is about
    async fn send(&self, context: &str, text: &str) -> Result<MessageHandle>;

    /// Replace the text of a previously sent message
    async fn edit(&self, handle: &MessageHandle, context: &str, text: &str) -> Result<()>;
}

/// Notifier used when no transport is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, _context: &str, _text: &str) -> Result<MessageHandle> {
        Ok(MessageHandle::detached())
    }

    async fn edit(&self, _handle: &MessageHandle, _context: &str, _text: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_notifier() {
        let notifier = NoopNotifier;
        let handle = notifier.send("[tokyo]", "hello").await.unwrap();
        assert_eq!(handle, MessageHandle::detached());
        notifier.edit(&handle, "[tokyo]", "bye").await.unwrap();
    }
}
