use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("delivery rejected: {0}")]
    Rejected(String),
}

/// One-way message delivery to a chat. The production implementation talks
/// to the Telegram Bot API; tests use [`RecordingNotifier`].
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), NotifyError>;
}

/// Captures sent messages instead of delivering them.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(i64, String)>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every send fails, for failure-isolation tests.
    pub fn failing() -> Self {
        Self { sent: Mutex::default(), fail: true }
    }

    pub async fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Transport("recording notifier set to fail".to_owned()));
        }
        self.sent.lock().await.push((chat_id, text.to_owned()));
        Ok(())
    }
}
