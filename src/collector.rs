//! Per-request signal collection.
//!
//! [`SignalCollector`] orchestrates the geo and weather resolvers and the
//! daypart derivation into one flat [`Signals`] mapping. Collection never
//! fails the request: unavailable enrichment degrades to signal-absence,
//! and the request-derived and time-derived signals are always present.
use chrono::{Datelike, Timelike};

use crate::{
    campaigns::Timestamp,
    daypart::Daypart,
    geo::{GeoInfo, GeoResolver},
    weather::{WeatherInfo, WeatherResolver},
    Signals,
};

/// The request context the host hands to the collector.
///
/// The host HTTP framework stays external; this is the minimal slice of a
/// request the decisioning core consumes.
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    /// Peer address of the connection.
    pub remote_addr: String,
    /// Raw forwarded-for header value, when present.
    pub forwarded_for: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
}

impl RequestInfo {
    /// The client network address: first entry of the forwarded-for header
    /// when present, else the peer address.
    pub fn client_ip(&self) -> &str {
        self.forwarded_for
            .as_deref()
            .and_then(|forwarded| forwarded.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .unwrap_or(&self.remote_addr)
    }
}

/// Collects the signal mapping for one request.
pub struct SignalCollector {
    geo: GeoResolver,
    weather: WeatherResolver,
}

impl SignalCollector {
    pub fn new(geo: GeoResolver, weather: WeatherResolver) -> SignalCollector {
        SignalCollector { geo, weather }
    }

    /// Collect all available signals for the request.
    ///
    /// Wall-clock cost is bounded by at most two sequential provider
    /// calls (geo, then weather), each independently circuit-broken.
    pub async fn collect(&self, request: &RequestInfo, now: Timestamp) -> Signals {
        let mut signals = Signals::new();

        let ip = request.client_ip();
        signals.insert("ip".to_owned(), ip.into());
        signals.insert(
            "user_agent".to_owned(),
            request.user_agent.clone().unwrap_or_default().into(),
        );
        signals.insert(
            "referer".to_owned(),
            request.referer.clone().unwrap_or_default().into(),
        );

        match self.geo.resolve(ip, now).await {
            Ok(geo) => {
                let coordinates = geo.coordinates();
                apply_geo_signals(&mut signals, geo);

                if let Some((lat, lon)) = coordinates {
                    match self.weather.resolve(lat, lon, now).await {
                        Ok(weather) => apply_weather_signals(&mut signals, &weather),
                        Err(err) => {
                            log::trace!(target: "dco", ip; "serving without weather signals: {err}")
                        }
                    }
                }
            }
            Err(err) => log::trace!(target: "dco", ip; "serving without geo signals: {err}"),
        }

        apply_daypart_signals(&mut signals, now);

        signals
    }
}

fn apply_geo_signals(signals: &mut Signals, geo: GeoInfo) {
    if let Some((lat, lon)) = geo.coordinates() {
        signals.insert("geo_lat".to_owned(), lat.into());
        signals.insert("geo_lon".to_owned(), lon.into());
    }
    signals.insert("geo_country".to_owned(), geo.country.into());
    signals.insert("geo_region".to_owned(), geo.region.into());
    signals.insert("geo_city".to_owned(), geo.city.into());
    signals.insert("geo_timezone".to_owned(), geo.timezone.into());
}

fn apply_weather_signals(signals: &mut Signals, weather: &WeatherInfo) {
    signals.insert("weather_temp".to_owned(), weather.temperature.into());
    signals.insert(
        "weather_condition".to_owned(),
        weather.condition.as_str().into(),
    );
    signals.insert("weather_code".to_owned(), f64::from(weather.code).into());
    signals.insert("weather_is_hot".to_owned(), weather.is_hot().into());
    signals.insert("weather_is_cold".to_owned(), weather.is_cold().into());
}

fn apply_daypart_signals(signals: &mut Signals, now: Timestamp) {
    let hour = now.hour();
    signals.insert(
        "daypart".to_owned(),
        Daypart::from_hour(hour).as_str().into(),
    );
    signals.insert("daypart_hour".to_owned(), f64::from(hour).into());
    signals.insert(
        "daypart_is_weekend".to_owned(),
        (now.weekday().num_days_from_monday() >= 5).into(),
    );
}
