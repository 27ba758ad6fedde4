use std::sync::Arc;

use async_trait::async_trait;
use fxrates_core::{
    Broker, CurrencyEnabledMessage, DomainEvent, EventListener, FxResult,
    CURRENCY_BROKER_LISTENER_ID, CURRENCY_ENABLED_TOPIC,
};
use tracing::debug;

/// Outbound side of the broker bridge: registered with
/// `fxrates-engine::OutboxDispatcher` under [`CURRENCY_BROKER_LISTENER_ID`],
/// translates `CurrencyCreated`/`CurrencyUpdated` outbox events into
/// `CurrencyEnabledMessage`s on [`CURRENCY_ENABLED_TOPIC`]. Events that
/// don't end up `enabled` (a disabled-on-create, or a disable toggle) are
/// acknowledged without publishing anything.
pub struct OutboxBrokerListener {
    broker: Arc<dyn Broker>,
}

impl OutboxBrokerListener {
    #[must_use]
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self { broker }
    }
}

#[async_trait]
impl EventListener for OutboxBrokerListener {
    fn listener_id(&self) -> &'static str {
        CURRENCY_BROKER_LISTENER_ID
    }

    async fn handle(&self, event: &DomainEvent) -> FxResult<()> {
        if !event.publishes_to_broker() {
            debug!(event_type = event.event_type(), "outbox event does not publish to broker");
            return Ok(());
        }
        let message: CurrencyEnabledMessage = event.into();
        self.broker.publish(CURRENCY_ENABLED_TOPIC, &message).await
    }
}
