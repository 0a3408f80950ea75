use std::time::Duration;

use crate::{
    events::{AnalyticsSink, NoopAnalyticsSink},
    DcoClient,
};

/// Configuration for [`DcoClient`].
pub struct ClientConfig<'a> {
    pub(crate) geo_base_url: String,
    pub(crate) weather_base_url: String,
    pub(crate) lookup_timeout: Duration,
    pub(crate) analytics_sink: Box<dyn AnalyticsSink + Send + Sync + 'a>,
}

impl<'a> ClientConfig<'a> {
    /// Default base URL for geo lookups.
    pub const DEFAULT_GEO_BASE_URL: &'static str = "http://ip-api.com";
    /// Default base URL for weather lookups.
    pub const DEFAULT_WEATHER_BASE_URL: &'static str = "https://api.open-meteo.com";
    /// Default per-call timeout for provider lookups. A slow upstream is
    /// treated the same as a failed one.
    pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

    /// Create a default configuration.
    ///
    /// ```
    /// # use dco_core::ClientConfig;
    /// let client = ClientConfig::new().to_client();
    /// ```
    pub fn new() -> Self {
        ClientConfig {
            geo_base_url: ClientConfig::DEFAULT_GEO_BASE_URL.to_owned(),
            weather_base_url: ClientConfig::DEFAULT_WEATHER_BASE_URL.to_owned(),
            lookup_timeout: ClientConfig::DEFAULT_LOOKUP_TIMEOUT,
            analytics_sink: Box::new(NoopAnalyticsSink),
        }
    }

    /// Override the geo provider base URL.
    pub fn geo_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.geo_base_url = base_url.into();
        self
    }

    /// Override the weather provider base URL.
    pub fn weather_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.weather_base_url = base_url.into();
        self
    }

    /// Override the provider lookup timeout.
    pub fn lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Set the analytics sink receiving impression and click events.
    ///
    /// ```
    /// # use dco_core::ClientConfig;
    /// let config = ClientConfig::new().analytics_sink(|event| {
    ///     println!("{event:?}");
    /// });
    /// ```
    pub fn analytics_sink(mut self, sink: impl AnalyticsSink + Send + Sync + 'a) -> Self {
        self.analytics_sink = Box::new(sink);
        self
    }

    /// Create a new [`DcoClient`] using the specified configuration.
    pub fn to_client(self) -> DcoClient<'a> {
        DcoClient::new(self)
    }
}

impl Default for ClientConfig<'_> {
    fn default() -> Self {
        ClientConfig::new()
    }
}
