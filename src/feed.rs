//! Typed change feed for one day partition

use log::{trace, warn};
use serde_json::Value;
use std::fmt;

use shop_orders_realtime::{ChildEvent, ChildEventKind, Subscription};

use crate::models::ServiceOrder;
use crate::partition::DatePartition;

/// Remote change kinds the board reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteEventKind {
    /// A child appeared under the partition, including the initial replay
    Added,
    /// An existing child was rewritten
    Changed,
}

impl fmt::Display for RemoteEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteEventKind::Added => write!(f, "added"),
            RemoteEventKind::Changed => write!(f, "changed"),
        }
    }
}

/// A full order snapshot pushed by the store
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteOrderEvent {
    pub kind: RemoteEventKind,
    pub order: ServiceOrder,
}

impl RemoteOrderEvent {
    pub fn added(order: ServiceOrder) -> Self {
        Self {
            kind: RemoteEventKind::Added,
            order,
        }
    }

    pub fn changed(order: ServiceOrder) -> Self {
        Self {
            kind: RemoteEventKind::Changed,
            order,
        }
    }

    pub fn plate(&self) -> &str {
        &self.order.plate
    }

    /// Decode an untyped child event. Removals and malformed records yield
    /// `None`.
    pub fn from_child_event(event: ChildEvent) -> Option<Self> {
        let kind = match event.kind {
            ChildEventKind::Added => RemoteEventKind::Added,
            ChildEventKind::Changed => RemoteEventKind::Changed,
            ChildEventKind::Removed => {
                trace!("Ignoring removal of '{}'", event.key);
                return None;
            }
        };

        let mut value = event.value;
        // Records written without a plate field are still keyed by plate.
        if let Value::Object(map) = &mut value {
            map.entry("placa").or_insert_with(|| Value::String(event.key.clone()));
        }

        match ServiceOrder::from_value(value) {
            Ok(order) => Some(Self { kind, order }),
            Err(err) => {
                warn!("Skipping undecodable record '{}': {}", event.key, err);
                None
            }
        }
    }
}

/// Scoped stream of [`RemoteOrderEvent`]s. Dropping the feed releases the
/// underlying subscription.
#[derive(Debug)]
pub struct OrderFeed {
    partition: DatePartition,
    subscription: Subscription,
}

impl OrderFeed {
    pub fn new(partition: DatePartition, subscription: Subscription) -> Self {
        Self {
            partition,
            subscription,
        }
    }

    pub fn partition(&self) -> DatePartition {
        self.partition
    }

    pub fn is_active(&self) -> bool {
        self.subscription.is_active()
    }

    /// Wait for the next decodable event. `None` once the feed has closed.
    pub async fn next(&mut self) -> Option<RemoteOrderEvent> {
        while let Some(event) = self.subscription.next_event().await {
            if let Some(decoded) = RemoteOrderEvent::from_child_event(event) {
                return Some(decoded);
            }
        }
        None
    }

    /// Take the next already delivered event without waiting.
    pub fn try_next(&mut self) -> Option<RemoteOrderEvent> {
        while let Some(event) = self.subscription.try_next_event() {
            if let Some(decoded) = RemoteOrderEvent::from_child_event(event) {
                return Some(decoded);
            }
        }
        None
    }

    pub fn unsubscribe(self) {
        self.subscription.unsubscribe();
    }
}
