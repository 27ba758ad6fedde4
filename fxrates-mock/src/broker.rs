use std::sync::Arc;

use async_trait::async_trait;
use fxrates_core::{Broker, CurrencyEnabledMessage, FxResult};
use tokio::sync::Mutex;

/// Records every published message for assertions, instead of transporting
/// anywhere.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBroker {
    published: Arc<Mutex<Vec<(String, CurrencyEnabledMessage)>>>,
}

impl InMemoryBroker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn published(&self) -> Vec<(String, CurrencyEnabledMessage)> {
        self.published.lock().await.clone()
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn publish(&self, topic: &str, message: &CurrencyEnabledMessage) -> FxResult<()> {
        self.published
            .lock()
            .await
            .push((topic.to_string(), message.clone()));
        Ok(())
    }
}
