use std::sync::Arc;

use async_trait::async_trait;
use fxrates_core::{BrokerConsumerHandler, CurrencyEnabledMessage, FxResult};
use tracing::info;

use crate::import::ImportEngine;

/// Inbound side of the broker bridge: triggers an import for the series
/// named in a `CurrencyEnabledMessage`. Idempotent by
/// construction, since `ImportEngine::import_for_series` reconciles against
/// whatever is already stored rather than assuming a clean slate.
pub struct ImportTriggerHandler {
    engine: Arc<ImportEngine>,
}

impl ImportTriggerHandler {
    #[must_use]
    pub fn new(engine: Arc<ImportEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl BrokerConsumerHandler for ImportTriggerHandler {
    async fn handle(&self, message: &CurrencyEnabledMessage) -> FxResult<()> {
        info!(
            currency_code = %message.currency_code,
            correlation_id = %message.correlation_id,
            "triggering import for newly enabled currency"
        );
        self.engine
            .import_for_series(message.currency_series_id)
            .await?;
        Ok(())
    }
}
