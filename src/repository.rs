//! Typed access to orders stored in a realtime store

use async_trait::async_trait;
use chrono::FixedOffset;
use log::{debug, warn};
use serde_json::{Map, Value};

use shop_orders_realtime::{ChildEventKind, DbPath, ListenOptions, RealtimeStore};

use crate::error::{Result, ValidationError};
use crate::feed::OrderFeed;
use crate::models::{OrderStatus, ServiceOrder};
use crate::partition::DatePartition;

/// Reads, writes and change feeds for service orders
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Every decodable order in the partition, in store order
    async fn load_partition(&self, partition: &DatePartition) -> Result<Vec<ServiceOrder>>;

    /// Overwrite the full record at the key derived from the order's open
    /// timestamp and plate
    async fn save_order(&self, order: &ServiceOrder) -> Result<()>;

    /// Write only the status field of an existing order
    async fn update_status(&self, order: &ServiceOrder, status: OrderStatus) -> Result<()>;

    /// Subscribe to added and changed orders in the partition
    async fn watch_partition(&self, partition: &DatePartition) -> Result<OrderFeed>;
}

/// [`OrderRepository`] over any [`RealtimeStore`]
#[derive(Debug, Clone)]
pub struct RealtimeOrderRepository<S> {
    store: S,
    root: DbPath,
    offset: FixedOffset,
}

impl<S: RealtimeStore> RealtimeOrderRepository<S> {
    pub fn new(store: S, root: DbPath, offset: FixedOffset) -> Self {
        Self { store, root, offset }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn root(&self) -> &DbPath {
        &self.root
    }

    /// Key of an order: `<root>/<DDMMYYYY of open timestamp>/<plate>`
    pub fn order_path(&self, order: &ServiceOrder) -> Result<DbPath> {
        let opened_at = order.opened_at.ok_or(ValidationError::MissingOpenTimestamp)?;
        if order.plate.trim().is_empty() {
            return Err(ValidationError::MissingPlate.into());
        }
        DatePartition::from_millis(opened_at, &self.offset)?.order_path(&self.root, &order.plate)
    }
}

#[async_trait]
impl<S: RealtimeStore> OrderRepository for RealtimeOrderRepository<S> {
    async fn load_partition(&self, partition: &DatePartition) -> Result<Vec<ServiceOrder>> {
        let path = partition.path(&self.root)?;
        debug!("Loading orders from '{}'", path);

        let children = match self.store.get(&path).await? {
            Some(Value::Object(children)) => children,
            Some(other) => {
                warn!("Expected an object at '{}', found {}", path, other);
                return Ok(Vec::new());
            }
            None => return Ok(Vec::new()),
        };

        let mut orders = Vec::with_capacity(children.len());
        for (key, mut value) in children {
            if let Value::Object(map) = &mut value {
                map.entry("placa").or_insert_with(|| Value::String(key.clone()));
            }
            match ServiceOrder::from_value(value) {
                Ok(order) => orders.push(order),
                Err(err) => warn!("Skipping undecodable record '{}/{}': {}", path, key, err),
            }
        }
        debug!("Loaded {} orders from '{}'", orders.len(), path);
        Ok(orders)
    }

    async fn save_order(&self, order: &ServiceOrder) -> Result<()> {
        let path = self.order_path(order)?;
        let value = order.to_value()?;
        debug!("Saving order to '{}'", path);
        self.store.set(&path, &value).await?;
        Ok(())
    }

    async fn update_status(&self, order: &ServiceOrder, status: OrderStatus) -> Result<()> {
        let path = self.order_path(order)?;
        let mut fields = Map::new();
        fields.insert("status".to_string(), serde_json::to_value(status)?);
        debug!("Setting status of '{}' to {}", path, status);
        self.store.update(&path, &fields).await?;
        Ok(())
    }

    async fn watch_partition(&self, partition: &DatePartition) -> Result<OrderFeed> {
        let path = partition.path(&self.root)?;
        let options = ListenOptions::new(path)
            .event(ChildEventKind::Added)
            .event(ChildEventKind::Changed);
        let subscription = self.store.listen(options).await?;
        Ok(OrderFeed::new(*partition, subscription))
    }
}
