use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fxrates_core::CurrencyEnabledMessage;
use tokio::sync::Mutex;

/// A message that exhausted its redelivery budget.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub topic: String,
    pub message: CurrencyEnabledMessage,
    pub attempts: u32,
    pub last_error: String,
    pub failed_at: DateTime<Utc>,
}

/// Sink for dead letters. Separate from `Broker`/`BrokerConsumerHandler` so
/// alternate backends (a dead-letter topic, a table) can be swapped in
/// without touching the consumer loop.
#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    async fn record(&self, letter: DeadLetter);
}

/// Default in-process sink: an append-only log, inspectable for ops tooling
/// and tests alike.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDeadLetterQueue {
    letters: Arc<Mutex<Vec<DeadLetter>>>,
}

impl InMemoryDeadLetterQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn drain(&self) -> Vec<DeadLetter> {
        std::mem::take(&mut *self.letters.lock().await)
    }

    pub async fn len(&self) -> usize {
        self.letters.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl DeadLetterSink for InMemoryDeadLetterQueue {
    async fn record(&self, letter: DeadLetter) {
        self.letters.lock().await.push(letter);
    }
}
