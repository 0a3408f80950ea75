//! `dco_core` is the decisioning core of a dynamic-creative-optimization ad
//! server: given a campaign and an inbound request, it picks the creative
//! variant to serve, in real time, using request-context signals.
//!
//! # Overview
//!
//! `dco_core` is organized as a set of building blocks. The host service
//! owns the HTTP surface, campaign storage, authentication, rendering, and
//! analytics aggregation; the core owns everything between "a request
//! arrived for campaign X" and "serve variant Y, decided with these
//! signals".
//!
//! [`Signals`] is a flat per-request mapping from signal name to a
//! string/number/boolean value. It is built fresh for every request and
//! never persisted; consumers must tolerate absent keys.
//!
//! [`SignalCollector`](collector::SignalCollector) builds the mapping. The
//! request-derived signals (client address, user agent, referer) and the
//! time-derived daypart signals are always present. Geography and weather
//! are enrichment: each goes through a
//! [`ResilientFetcher`](fetcher::ResilientFetcher) that wraps the provider
//! call with a per-key TTL cache and a per-service circuit breaker, so a
//! failing upstream degrades to signal-absence instead of failing or
//! stalling the request.
//!
//! [`select_variant`](selection::select_variant) applies the campaign's
//! selection mode: the flagged default, a priority-ordered targeting-rule
//! pass, a weighted random draw, or rules-then-weighted. Selection is pure
//! given its inputs and the injected random source, which keeps it
//! deterministic under test.
//!
//! [`DcoClient`] ties the pieces together for hosts that don't need to
//! compose them manually: one instance per process, shared across
//! concurrent requests, with impressions and clicks handed to the
//! configured [`AnalyticsSink`](events::AnalyticsSink).
//!
//! # Examples
//!
//! ```no_run
//! # use dco_core::{campaigns::Campaign, collector::RequestInfo, ClientConfig};
//! # async fn serve(campaign: Campaign, request: RequestInfo) {
//! let client = ClientConfig::new().to_client();
//!
//! if let Some(decision) = client.serve(&campaign, &request).await {
//!     println!("serving {} with {:?}", decision.variant.id, decision.signals);
//! }
//! # }
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

pub mod campaigns;
pub mod collector;
pub mod events;
pub mod fetcher;
pub mod geo;
pub mod selection;
pub mod weather;

mod client;
mod config;
mod daypart;
mod error;
mod signals;

pub use client::{DcoClient, Decision};
pub use config::ClientConfig;
pub use daypart::Daypart;
pub use error::{Error, Result};
pub use signals::{SignalValue, Signals};
