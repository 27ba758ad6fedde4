use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use fxrates_core::{Broker, BrokerConsumerHandler, CurrencyEnabledMessage, FxError, FxResult};
use tokio::sync::{mpsc, oneshot};

use crate::dlq::{DeadLetter, DeadLetterSink};
use crate::stream::ConsumerHandle;

/// Construct a linked publisher/receiver pair. There is exactly one
/// receiver: a second call to `spawn` on an already-consumed receiver is a
/// compile error, not a runtime one.
#[must_use]
pub fn channel_broker() -> (ChannelBroker, ChannelReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelBroker { sender: tx }, ChannelReceiver { inner: rx })
}

/// In-process `Broker`. This workspace carries no message-broker client
/// dependency, so a channel-backed bridge stands in for one here.
#[derive(Clone)]
pub struct ChannelBroker {
    sender: mpsc::UnboundedSender<(String, CurrencyEnabledMessage)>,
}

#[async_trait]
impl Broker for ChannelBroker {
    async fn publish(&self, topic: &str, message: &CurrencyEnabledMessage) -> FxResult<()> {
        self.sender
            .send((topic.to_string(), message.clone()))
            .map_err(|_| FxError::Internal("broker channel closed".to_string()))
    }
}

pub struct ChannelReceiver {
    inner: mpsc::UnboundedReceiver<(String, CurrencyEnabledMessage)>,
}

impl ChannelReceiver {
    /// Await the next published `(topic, message)` pair directly, bypassing
    /// [`BrokerConsumer`]. Mainly useful for tests exercising [`ChannelBroker`]
    /// in isolation.
    pub async fn recv(&mut self) -> Option<(String, CurrencyEnabledMessage)> {
        self.inner.recv().await
    }

    /// Non-blocking variant of [`Self::recv`].
    pub fn try_recv(&mut self) -> Option<(String, CurrencyEnabledMessage)> {
        self.inner.try_recv().ok()
    }
}

/// Bounded-redelivery policy applied before a message is dead-lettered.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

/// Drives [`ChannelReceiver`] messages to a [`BrokerConsumerHandler`],
/// retrying with exponential backoff and dead-lettering on exhaustion.
pub struct BrokerConsumer;

impl BrokerConsumer {
    pub fn spawn(
        mut receiver: ChannelReceiver,
        handler: Arc<dyn BrokerConsumerHandler>,
        dlq: Arc<dyn DeadLetterSink>,
        policy: RetryPolicy,
    ) -> ConsumerHandle {
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    received = receiver.inner.recv() => {
                        match received {
                            None => break,
                            Some((topic, message)) => {
                                Self::deliver(&handler, &dlq, &policy, topic, message).await;
                            }
                        }
                    }
                }
            }
        });
        ConsumerHandle::new(task, stop_tx)
    }

    async fn deliver(
        handler: &Arc<dyn BrokerConsumerHandler>,
        dlq: &Arc<dyn DeadLetterSink>,
        policy: &RetryPolicy,
        topic: String,
        message: CurrencyEnabledMessage,
    ) {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match handler.handle(&message).await {
                Ok(()) => return,
                Err(err) => {
                    if attempt >= policy.max_attempts {
                        dlq.record(DeadLetter {
                            topic,
                            message,
                            attempts: attempt,
                            last_error: err.to_string(),
                            failed_at: Utc::now(),
                        })
                        .await;
                        return;
                    }
                    let delay = policy.base_delay * 2u32.saturating_pow(attempt - 1);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxrates_core::FxResult as Result_;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyHandler {
        fail_times: usize,
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl BrokerConsumerHandler for FlakyHandler {
        async fn handle(&self, _message: &CurrencyEnabledMessage) -> Result_<()> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_times {
                return Err(FxError::Internal("transient failure".to_string()));
            }
            Ok(())
        }
    }

    fn message() -> CurrencyEnabledMessage {
        CurrencyEnabledMessage {
            currency_series_id: 1,
            currency_code: "EUR".to_string(),
            correlation_id: "corr-1".to_string(),
        }
    }

    #[tokio::test]
    async fn redelivers_until_success_within_budget() {
        let (broker, receiver) = channel_broker();
        let handler = Arc::new(FlakyHandler {
            fail_times: 2,
            attempts: AtomicUsize::new(0),
        });
        let dlq = Arc::new(crate::dlq::InMemoryDeadLetterQueue::new());
        let consumer = BrokerConsumer::spawn(
            receiver,
            handler.clone(),
            dlq.clone(),
            RetryPolicy {
                max_attempts: 5,
                base_delay: Duration::from_millis(1),
            },
        );

        broker.publish("currency.enabled", &message()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        consumer.stop().await;

        assert!(dlq.is_empty().await);
        assert_eq!(handler.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn dead_letters_after_exhausting_retries() {
        let (broker, receiver) = channel_broker();
        let handler = Arc::new(FlakyHandler {
            fail_times: usize::MAX,
            attempts: AtomicUsize::new(0),
        });
        let dlq = Arc::new(crate::dlq::InMemoryDeadLetterQueue::new());
        let consumer = BrokerConsumer::spawn(
            receiver,
            handler,
            dlq.clone(),
            RetryPolicy {
                max_attempts: 2,
                base_delay: Duration::from_millis(1),
            },
        );

        broker.publish("currency.enabled", &message()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        consumer.stop().await;

        assert_eq!(dlq.len().await, 1);
    }
}
