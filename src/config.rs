//! Configuration options for the service-order engine

use chrono::{FixedOffset, Local, Offset};
use std::time::Duration;

pub use shop_orders_realtime::StreamOptions;

/// What to do with an "added" event whose plate is not loaded yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddedEventPolicy {
    /// Append the new order to the collection.
    #[default]
    Append,
    /// Drop the event, as the first version of the shop frontend did.
    IgnoreUnknown,
}

/// How an order's value is computed for the revenue totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevenueBasis {
    /// Sum of quantity × unit price, the same figure as the order total.
    #[default]
    LineTotal,
    /// Sum of raw unit prices, ignoring quantities. Matches totals produced
    /// by the first version of the shop frontend.
    UnitPriceOnly,
}

/// Configuration options for the service-order engine
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Top-level node holding the date partitions
    pub root_path: String,

    /// Offset used for "today" and for partition keys, in minutes east of
    /// UTC. `None` uses the host's local offset.
    pub utc_offset_minutes: Option<i32>,

    /// The request timeout for reads and writes
    pub request_timeout: Option<Duration>,

    /// Handling of "added" events for unknown plates
    pub added_event_policy: AddedEventPolicy,

    /// Order value used by the daily/weekly/monthly totals
    pub revenue_basis: RevenueBasis,

    /// Event stream reconnection settings
    pub stream: StreamOptions,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            root_path: "orderService".to_string(),
            utc_offset_minutes: None,
            request_timeout: Some(Duration::from_secs(30)),
            added_event_policy: AddedEventPolicy::default(),
            revenue_basis: RevenueBasis::default(),
            stream: StreamOptions::default(),
        }
    }
}

impl ClientOptions {
    /// Set the top-level node holding the date partitions
    pub fn with_root_path(mut self, value: &str) -> Self {
        self.root_path = value.to_string();
        self
    }

    /// Pin the offset used for dates, e.g. `-180` for Brasília time
    pub fn with_utc_offset_minutes(mut self, value: Option<i32>) -> Self {
        self.utc_offset_minutes = value;
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    pub fn with_added_event_policy(mut self, value: AddedEventPolicy) -> Self {
        self.added_event_policy = value;
        self
    }

    pub fn with_revenue_basis(mut self, value: RevenueBasis) -> Self {
        self.revenue_basis = value;
        self
    }

    pub fn with_stream_options(mut self, value: StreamOptions) -> Self {
        self.stream = value;
        self
    }

    /// Offset for dates. Falls back to the local offset when the configured
    /// minutes are out of range.
    pub fn offset(&self) -> FixedOffset {
        self.utc_offset_minutes
            .and_then(|minutes| FixedOffset::east_opt(minutes * 60))
            .unwrap_or_else(|| Local::now().offset().fix())
    }

    /// Stream options with this configuration's request timeout applied.
    pub(crate) fn store_options(&self) -> StreamOptions {
        self.stream
            .clone()
            .with_request_timeout(self.request_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = ClientOptions::default();
        assert_eq!(options.root_path, "orderService");
        assert_eq!(options.added_event_policy, AddedEventPolicy::Append);
        assert_eq!(options.revenue_basis, RevenueBasis::LineTotal);
        assert_eq!(options.request_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn fixed_offset_is_used_when_configured() {
        let options = ClientOptions::default().with_utc_offset_minutes(Some(-180));
        assert_eq!(options.offset().local_minus_utc(), -3 * 3600);
    }

    #[test]
    fn builder_overrides() {
        let options = ClientOptions::default()
            .with_root_path("os")
            .with_request_timeout(None)
            .with_revenue_basis(RevenueBasis::UnitPriceOnly);
        assert_eq!(options.root_path, "os");
        assert!(options.store_options().request_timeout.is_none());
        assert_eq!(options.revenue_basis, RevenueBasis::UnitPriceOnly);
    }
}
