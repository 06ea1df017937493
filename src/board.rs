//! Live view over one day's orders
//!
//! [`OrderBoard`] keeps the loaded orders in sync with the store, projects
//! them through the current filter and computes the revenue totals. It holds
//! at most one subscription at a time; switching partitions releases the old
//! one before the new one is opened.

use chrono::{NaiveDate, Utc};
use log::{debug, info, warn};
use std::sync::Arc;

use crate::aggregate::{FormattedTotals, TimeAggregate};
use crate::collection::{ApplyOutcome, OrderCollection};
use crate::config::ClientOptions;
use crate::error::{Error, Result};
use crate::feed::{OrderFeed, RemoteOrderEvent};
use crate::filter::{OrderFilter, StatusFilter};
use crate::models::{OrderStatus, ServiceOrder};
use crate::partition::DatePartition;
use crate::repository::OrderRepository;

pub struct OrderBoard {
    repository: Arc<dyn OrderRepository>,
    options: ClientOptions,
    partition: Option<DatePartition>,
    collection: OrderCollection,
    filter: OrderFilter,
    feed: Option<OrderFeed>,
}

impl OrderBoard {
    pub fn new(repository: Arc<dyn OrderRepository>, options: ClientOptions) -> Self {
        Self {
            repository,
            options,
            partition: None,
            collection: OrderCollection::new(),
            filter: OrderFilter::default(),
            feed: None,
        }
    }

    /// Load `partition` and start watching it. Returns the number of orders
    /// loaded. If the read fails the previous day stays loaded and watched.
    /// Otherwise the previous subscription is released before the new one is
    /// opened.
    pub async fn open(&mut self, partition: DatePartition) -> Result<usize> {
        info!("Opening partition {}", partition);
        let orders = match self.repository.load_partition(&partition).await {
            Ok(orders) => orders,
            Err(err) => {
                warn!("Loading partition {} failed: {}", partition, err);
                return Err(err);
            }
        };

        self.close();
        self.collection.clear();
        self.collection.load(orders);
        self.partition = Some(partition);

        self.feed = Some(self.repository.watch_partition(&partition).await?);
        Ok(self.collection.len())
    }

    /// Same as [`open`](Self::open), named for the date-picker flow
    pub async fn change_partition(&mut self, partition: DatePartition) -> Result<usize> {
        self.open(partition).await
    }

    /// Release the subscription. Loaded orders stay in place.
    pub fn close(&mut self) {
        if let Some(feed) = self.feed.take() {
            debug!("Releasing feed for partition {}", feed.partition());
            feed.unsubscribe();
        }
    }

    pub fn partition(&self) -> Option<DatePartition> {
        self.partition
    }

    /// Whether a feed is open and its source is still delivering
    pub fn is_watching(&self) -> bool {
        self.feed.as_ref().map(|feed| feed.is_active()).unwrap_or(false)
    }

    /// Merge a pushed snapshot using the configured added-event policy
    pub fn apply_remote_event(&mut self, event: RemoteOrderEvent) -> ApplyOutcome {
        self.collection
            .apply_remote_event(event, self.options.added_event_policy)
    }

    /// Wait for the next remote change and merge it. `None` when there is no
    /// open feed or the feed has closed.
    pub async fn next_remote_event(&mut self) -> Option<ApplyOutcome> {
        let event = self.feed.as_mut()?.next().await?;
        Some(self.apply_remote_event(event))
    }

    /// Merge every change already delivered, without waiting. Returns how
    /// many events were applied.
    pub fn drain_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.feed.as_mut().and_then(|feed| feed.try_next()) {
            self.apply_remote_event(event);
            applied += 1;
        }
        applied
    }

    pub fn orders(&self) -> &[ServiceOrder] {
        self.collection.orders()
    }

    pub fn find(&self, plate: &str) -> Option<&ServiceOrder> {
        self.collection.find(plate)
    }

    pub fn filter(&self) -> &OrderFilter {
        &self.filter
    }

    pub fn set_search_term(&mut self, term: &str) {
        self.filter = self.filter.clone().with_search_term(term);
    }

    pub fn set_status_filter(&mut self, status: StatusFilter) {
        self.filter = self.filter.clone().with_status(status);
    }

    /// Loaded orders that pass the current filter, in load order
    pub fn visible_orders(&self) -> Vec<&ServiceOrder> {
        self.filter.apply(self.collection.orders())
    }

    /// Revenue totals with `today` taken from the configured offset
    pub fn aggregate(&self) -> TimeAggregate {
        let offset = self.options.offset();
        let today = Utc::now().with_timezone(&offset).date_naive();
        self.aggregate_on(today)
    }

    /// Revenue totals as of `today`
    pub fn aggregate_on(&self, today: NaiveDate) -> TimeAggregate {
        TimeAggregate::compute(
            self.collection.orders(),
            today,
            &self.options.offset(),
            self.options.revenue_basis,
        )
    }

    pub fn formatted_totals(&self) -> FormattedTotals {
        self.aggregate().formatted()
    }

    /// Write a new status for a loaded order. The local copy is not touched;
    /// it changes when the store pushes the update back.
    pub async fn update_status(&self, plate: &str, status: OrderStatus) -> Result<()> {
        let order = match self.collection.find(plate) {
            Some(order) => order,
            None => {
                warn!("Reconciliation miss: status update for unknown plate {}", plate);
                return Err(Error::reconciliation_miss(plate));
            }
        };
        self.repository.update_status(order, status).await?;
        info!("Requested status {} for {}", status, order.plate);
        Ok(())
    }
}

impl Drop for OrderBoard {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for OrderBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderBoard")
            .field("partition", &self.partition)
            .field("orders", &self.collection.len())
            .field("filter", &self.filter)
            .field("watching", &self.is_watching())
            .finish()
    }
}
