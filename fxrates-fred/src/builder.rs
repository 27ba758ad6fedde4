use std::sync::Arc;
use std::time::Duration;

use fxrates_core::ProviderAdapter;
use url::Url;

use crate::adapter::FredRateAdapter;
use crate::client::FredClient;

/// Builder for a [`FredRateAdapter`] wired to a concrete [`FredClient`],
/// mirroring this workspace's connector-builder convention.
pub struct FredAdapterBuilder {
    base_url: Url,
    api_key: String,
    timeout: Duration,
}

impl FredAdapterBuilder {
    #[must_use]
    pub fn new(base_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            base_url,
            api_key: api_key.into(),
            timeout: Duration::from_secs(10),
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn build(self) -> Arc<dyn ProviderAdapter> {
        let client = Arc::new(FredClient::new(self.base_url, self.api_key, self.timeout));
        Arc::new(FredRateAdapter::new(client))
    }
}
