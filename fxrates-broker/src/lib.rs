//! In-process broker bridge: publishes `CurrencyEnabledMessage`s and drives
//! a retrying, dead-lettering consumer.

pub mod channel;
pub mod dlq;
pub mod listener;
mod stream;

pub use channel::{channel_broker, BrokerConsumer, ChannelBroker, ChannelReceiver, RetryPolicy};
pub use dlq::{DeadLetter, DeadLetterSink, InMemoryDeadLetterQueue};
pub use listener::OutboxBrokerListener;
pub use stream::ConsumerHandle;
