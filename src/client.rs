use chrono::Utc;
use rand::Rng;

use crate::{
    campaigns::{Campaign, Timestamp, Variant},
    collector::{RequestInfo, SignalCollector},
    events::{AnalyticsEvent, AnalyticsSink, ClickEvent, ImpressionEvent},
    geo::GeoResolver,
    selection::select_variant,
    weather::WeatherResolver,
    ClientConfig, Signals,
};

/// The serving façade of the decisioning core.
///
/// A `DcoClient` owns the signal collector (with its caches and circuit
/// breakers) and the analytics sink. Hosts create one instance at process
/// start and share it across concurrent requests.
///
/// # Examples
/// ```
/// # use dco_core::{ClientConfig, DcoClient};
/// let client: DcoClient = ClientConfig::new().to_client();
/// ```
pub struct DcoClient<'a> {
    collector: SignalCollector,
    analytics_sink: Box<dyn AnalyticsSink + Send + Sync + 'a>,
}

/// The outcome of a decisioning run: the variant to render and the signals
/// it was decided with.
#[derive(Debug, Clone)]
pub struct Decision {
    pub variant: Variant,
    pub signals: Signals,
}

impl<'a> DcoClient<'a> {
    /// Create a new `DcoClient` using the specified configuration.
    pub fn new(config: ClientConfig<'a>) -> Self {
        // One client shares its connection pool across both resolvers.
        let http = reqwest::Client::new();
        let geo = GeoResolver::new(http.clone(), config.geo_base_url, config.lookup_timeout);
        let weather = WeatherResolver::new(http, config.weather_base_url, config.lookup_timeout);

        DcoClient {
            collector: SignalCollector::new(geo, weather),
            analytics_sink: config.analytics_sink,
        }
    }

    /// Collect signals and select a variant, without recording an
    /// impression. For preview/debug surfaces.
    ///
    /// Returns `None` only when the campaign has no variants; the caller
    /// turns that into its not-found response.
    pub async fn decide(&self, campaign: &Campaign, request: &RequestInfo) -> Option<Decision> {
        self.decide_at(campaign, request, Utc::now(), &mut rand::thread_rng())
            .await
    }

    /// [`DcoClient::decide`] with the clock and random source supplied by
    /// the caller.
    pub async fn decide_at<R: Rng + ?Sized>(
        &self,
        campaign: &Campaign,
        request: &RequestInfo,
        now: Timestamp,
        rng: &mut R,
    ) -> Option<Decision> {
        let signals = self.collector.collect(request, now).await;

        let Some(variant) = select_variant(campaign, &signals, rng) else {
            log::warn!(target: "dco", campaign_id = campaign.id.as_str();
                "campaign has no variants to serve");
            return None;
        };

        log::trace!(target: "dco",
            campaign_id = campaign.id.as_str(),
            variant_id = variant.id.as_str(),
            signals:serde = &signals;
            "selected a variant");

        Some(Decision {
            variant: variant.clone(),
            signals,
        })
    }

    /// Decide and record an impression with the analytics sink.
    pub async fn serve(&self, campaign: &Campaign, request: &RequestInfo) -> Option<Decision> {
        self.serve_at(campaign, request, Utc::now(), &mut rand::thread_rng())
            .await
    }

    /// [`DcoClient::serve`] with the clock and random source supplied by
    /// the caller.
    pub async fn serve_at<R: Rng + ?Sized>(
        &self,
        campaign: &Campaign,
        request: &RequestInfo,
        now: Timestamp,
        rng: &mut R,
    ) -> Option<Decision> {
        let decision = self.decide_at(campaign, request, now, rng).await?;

        self.analytics_sink
            .record(AnalyticsEvent::Impression(ImpressionEvent {
                campaign_id: campaign.id.clone(),
                variant_id: decision.variant.id.clone(),
                signals: decision.signals.clone(),
                ip_address: request.client_ip().to_owned(),
                timestamp: now,
            }));

        Some(decision)
    }

    /// Record a click-through with the analytics sink.
    pub fn record_click(
        &self,
        campaign_id: &str,
        variant_id: &str,
        request: &RequestInfo,
        url: Option<String>,
    ) {
        self.analytics_sink.record(AnalyticsEvent::Click(ClickEvent {
            campaign_id: campaign_id.to_owned(),
            variant_id: variant_id.to_owned(),
            ip_address: request.client_ip().to_owned(),
            url,
            timestamp: Utc::now(),
        }));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use rand::rngs::mock::StepRng;

    use crate::{
        campaigns::{Campaign, CampaignStatus, SelectionMode, Variant},
        collector::RequestInfo,
        events::AnalyticsEvent,
        ClientConfig, SignalValue,
    };

    /// Provider URLs nothing listens on; lookups fail fast and the client
    /// must degrade instead of erroring.
    fn offline_config<'a>() -> ClientConfig<'a> {
        ClientConfig::new()
            .geo_base_url("http://127.0.0.1:9")
            .weather_base_url("http://127.0.0.1:9")
            .lookup_timeout(Duration::from_millis(200))
    }

    fn campaign() -> Campaign {
        Campaign {
            id: "c1".to_owned(),
            status: CampaignStatus::Active,
            ab_test_mode: SelectionMode::Off,
            start_date: None,
            end_date: None,
            variants: vec![
                Variant {
                    id: "v1".to_owned(),
                    name: None,
                    headline: Some("Hello".to_owned()),
                    body_text: None,
                    image_url: None,
                    cta_text: None,
                    cta_url: None,
                    is_default: false,
                    weight: 1.0,
                },
                Variant {
                    id: "v2".to_owned(),
                    name: None,
                    headline: Some("Rainy day deal".to_owned()),
                    body_text: None,
                    image_url: None,
                    cta_text: None,
                    cta_url: None,
                    is_default: true,
                    weight: 1.0,
                },
            ],
            rules: vec![],
        }
    }

    fn request() -> RequestInfo {
        RequestInfo {
            remote_addr: "10.0.0.1".to_owned(),
            forwarded_for: Some("203.0.113.7".to_owned()),
            user_agent: Some("Mozilla/5.0".to_owned()),
            referer: None,
        }
    }

    #[tokio::test]
    async fn decides_with_degraded_signals_when_providers_are_down() {
        let _ = env_logger::builder().is_test(true).try_init();

        let client = offline_config().to_client();
        let now = Utc.with_ymd_and_hms(2024, 6, 11, 14, 0, 0).unwrap();
        let decision = client
            .decide_at(&campaign(), &request(), now, &mut StepRng::new(0, 1))
            .await
            .expect("a default variant must be decided");

        assert_eq!(decision.variant.id, "v2");
        // Request-derived and time-derived signals survive provider loss.
        assert_eq!(
            decision.signals.get("ip"),
            Some(&SignalValue::from("203.0.113.7"))
        );
        assert_eq!(
            decision.signals.get("daypart"),
            Some(&SignalValue::from("afternoon"))
        );
        assert!(!decision.signals.contains_key("geo_country"));
        assert!(!decision.signals.contains_key("weather_condition"));
    }

    #[tokio::test]
    async fn empty_campaign_decides_nothing() {
        let client = offline_config().to_client();
        let mut empty = campaign();
        empty.variants.clear();

        let decision = client.decide(&empty, &request()).await;
        assert!(decision.is_none());
    }

    #[tokio::test]
    async fn serve_records_an_impression() {
        let events = Mutex::new(Vec::new());
        let client = offline_config()
            .analytics_sink(|event: AnalyticsEvent| events.lock().unwrap().push(event))
            .to_client();

        let now = Utc.with_ymd_and_hms(2024, 6, 11, 14, 0, 0).unwrap();
        let decision = client
            .serve_at(&campaign(), &request(), now, &mut StepRng::new(0, 1))
            .await
            .unwrap();
        assert_eq!(decision.variant.id, "v2");

        drop(client);
        let events = events.into_inner().unwrap();
        assert_eq!(events.len(), 1);
        let AnalyticsEvent::Impression(impression) = &events[0] else {
            panic!("expected an impression event");
        };
        assert_eq!(impression.campaign_id, "c1");
        assert_eq!(impression.variant_id, "v2");
        assert_eq!(impression.ip_address, "203.0.113.7");
    }

    #[tokio::test]
    async fn decide_does_not_record() {
        let events = Mutex::new(Vec::new());
        let client = offline_config()
            .analytics_sink(|event: AnalyticsEvent| events.lock().unwrap().push(event))
            .to_client();

        client.decide(&campaign(), &request()).await.unwrap();

        drop(client);
        assert!(events.into_inner().unwrap().is_empty());
    }

    #[test]
    fn clicks_reach_the_sink() {
        let events = Mutex::new(Vec::new());
        {
            let client = offline_config()
                .analytics_sink(|event: AnalyticsEvent| events.lock().unwrap().push(event))
                .to_client();
            client.record_click("c1", "v2", &request(), Some("https://example.com".to_owned()));
        }

        let events = events.into_inner().unwrap();
        assert_eq!(events.len(), 1);
        let AnalyticsEvent::Click(click) = &events[0] else {
            panic!("expected a click event");
        };
        assert_eq!(click.url.as_deref(), Some("https://example.com"));
    }
}
