//! Analytics events emitted by the serving path.
//!
//! The decisioning core does not persist impressions or clicks itself; it
//! hands them to an [`AnalyticsSink`] supplied by the host. Delivery is
//! fire-and-forget: `record` returns nothing, and a sink that fails must
//! swallow its own error. Sinks are called on the serving path, so slow
//! delivery (a database write, an HTTP call) belongs on a background task
//! inside the sink, not in `record` itself.
use serde::{Deserialize, Serialize};

use crate::{campaigns::Timestamp, Signals};

/// An ad was decided and is about to be rendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpressionEvent {
    pub campaign_id: String,
    pub variant_id: String,
    /// The full signal mapping the decision was made with.
    pub signals: Signals,
    pub ip_address: String,
    pub timestamp: Timestamp,
}

/// A served ad's click-through was followed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickEvent {
    pub campaign_id: String,
    pub variant_id: String,
    pub ip_address: String,
    /// Destination the click redirects to, when known.
    pub url: Option<String>,
    pub timestamp: Timestamp,
}

/// Union of the events a sink receives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalyticsEvent {
    Impression(ImpressionEvent),
    Click(ClickEvent),
}

/// Receives analytics events from the serving path.
///
/// Closures implement this trait:
/// ```
/// # use dco_core::events::AnalyticsEvent;
/// let sink = |event: AnalyticsEvent| log::info!("{event:?}");
/// ```
pub trait AnalyticsSink {
    fn record(&self, event: AnalyticsEvent);
}

pub(crate) struct NoopAnalyticsSink;
impl AnalyticsSink for NoopAnalyticsSink {
    fn record(&self, _event: AnalyticsEvent) {}
}

impl<T: Fn(AnalyticsEvent)> AnalyticsSink for T {
    fn record(&self, event: AnalyticsEvent) {
        self(event);
    }
}
