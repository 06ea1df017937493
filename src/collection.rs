//! In-memory collection of one day's orders, reconciled by plate

use log::{debug, warn};

use crate::config::AddedEventPolicy;
use crate::feed::{RemoteEventKind, RemoteOrderEvent};
use crate::models::ServiceOrder;

/// What [`OrderCollection::apply_remote_event`] did with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// An order with the same plate was replaced wholesale
    Replaced,
    /// The order was new and has been appended
    Appended,
    /// No order with that plate is loaded; nothing changed
    Ignored,
}

/// Orders for the current partition. At most one entry per plate.
#[derive(Debug, Clone, Default)]
pub struct OrderCollection {
    orders: Vec<ServiceOrder>,
}

impl OrderCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with `orders`. An empty input leaves the
    /// collection as it is, so a late empty read never wipes live data.
    /// Returns whether anything was replaced.
    pub fn load(&mut self, orders: Vec<ServiceOrder>) -> bool {
        if orders.is_empty() {
            debug!("Ignoring empty load, keeping {} orders", self.orders.len());
            return false;
        }

        let mut deduped: Vec<ServiceOrder> = Vec::with_capacity(orders.len());
        for order in orders {
            match deduped.iter_mut().find(|existing| existing.has_plate(&order.plate)) {
                Some(existing) => {
                    warn!("Duplicate plate {} in load, keeping the later record", order.plate);
                    *existing = order;
                }
                None => deduped.push(order),
            }
        }
        self.orders = deduped;
        true
    }

    /// Merge a pushed snapshot into the collection.
    pub fn apply_remote_event(&mut self, event: RemoteOrderEvent, policy: AddedEventPolicy) -> ApplyOutcome {
        if let Some(existing) = self.find_mut(&event.order.plate) {
            *existing = event.order;
            return ApplyOutcome::Replaced;
        }

        match (event.kind, policy) {
            (RemoteEventKind::Added, AddedEventPolicy::Append) => {
                debug!("Appending order {}", event.order.plate);
                self.orders.push(event.order);
                ApplyOutcome::Appended
            }
            (kind, _) => {
                warn!("Reconciliation miss: {} event for unknown plate {}", kind, event.order.plate);
                ApplyOutcome::Ignored
            }
        }
    }

    pub fn find(&self, plate: &str) -> Option<&ServiceOrder> {
        self.orders.iter().find(|order| order.has_plate(plate))
    }

    fn find_mut(&mut self, plate: &str) -> Option<&mut ServiceOrder> {
        self.orders.iter_mut().find(|order| order.has_plate(plate))
    }

    pub fn orders(&self) -> &[ServiceOrder] {
        &self.orders
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn clear(&mut self) {
        self.orders.clear();
    }
}
