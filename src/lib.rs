//! Service-order sync and revenue aggregation for auto-repair shops
//!
//! Orders are kept in a realtime database under `orderService/<DDMMYYYY>/<plate>`.
//! An [`OrderBoard`] loads one day, follows pushed changes, filters rows and
//! computes daily, weekly and monthly revenue. An [`OrderDraft`] edits one
//! order and writes it back.

pub mod aggregate;
pub mod board;
pub mod catalog;
pub mod collection;
pub mod config;
pub mod editor;
pub mod error;
pub mod feed;
pub mod filter;
pub mod format;
pub mod models;
pub mod partition;
pub mod repository;

use reqwest::Client;
use std::sync::Arc;

use shop_orders_realtime::{DbPath, FirebaseClient, RealtimeStore};

pub use crate::board::OrderBoard;
pub use crate::catalog::Catalog;
pub use crate::config::ClientOptions;
pub use crate::editor::OrderDraft;
pub use crate::error::{Error, Result, ValidationError};
pub use crate::models::ServiceOrder;
pub use crate::partition::DatePartition;
pub use crate::repository::{OrderRepository, RealtimeOrderRepository};

/// Entry point tying a store, a catalog and options together
pub struct OrderService {
    repository: Arc<dyn OrderRepository>,
    catalog: Arc<Catalog>,
    options: ClientOptions,
}

impl OrderService {
    /// Service backed by a hosted Firebase Realtime Database
    ///
    /// # Example
    ///
    /// ```
    /// use shop_orders::OrderService;
    ///
    /// let service = OrderService::new("https://oficina-default-rtdb.firebaseio.com")?;
    /// let board = service.board();
    /// # Ok::<(), shop_orders::Error>(())
    /// ```
    pub fn new(database_url: &str) -> Result<Self> {
        Self::new_with_options(database_url, ClientOptions::default())
    }

    /// Service with custom options
    ///
    /// # Example
    ///
    /// ```
    /// use shop_orders::{ClientOptions, OrderService};
    /// use shop_orders::config::AddedEventPolicy;
    ///
    /// let options = ClientOptions::default()
    ///     .with_utc_offset_minutes(Some(-180))
    ///     .with_added_event_policy(AddedEventPolicy::IgnoreUnknown);
    /// let service = OrderService::new_with_options(
    ///     "https://oficina-default-rtdb.firebaseio.com",
    ///     options,
    /// )?;
    /// # Ok::<(), shop_orders::Error>(())
    /// ```
    pub fn new_with_options(database_url: &str, options: ClientOptions) -> Result<Self> {
        let client = FirebaseClient::new_with_options(database_url, options.store_options())?;
        Self::with_store(client, options)
    }

    /// Service sharing an existing HTTP client, e.g. one with proxy or TLS
    /// settings already applied
    pub fn with_http_client(database_url: &str, http_client: Client, options: ClientOptions) -> Result<Self> {
        let client = FirebaseClient::with_http_client(database_url, http_client, options.store_options())?;
        Self::with_store(client, options)
    }

    /// Service over any realtime store, e.g. a `MemoryStore` in tests
    pub fn with_store<S>(store: S, options: ClientOptions) -> Result<Self>
    where
        S: RealtimeStore + 'static,
    {
        let root = DbPath::parse(&options.root_path)?;
        let repository = RealtimeOrderRepository::new(store, root, options.offset());
        Ok(Self::with_repository(Arc::new(repository), options))
    }

    pub fn with_repository(repository: Arc<dyn OrderRepository>, options: ClientOptions) -> Self {
        Self {
            repository,
            catalog: Arc::new(Catalog::default()),
            options,
        }
    }

    /// Catalog used by drafts for item lookup
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn repository(&self) -> Arc<dyn OrderRepository> {
        self.repository.clone()
    }

    /// A board with nothing loaded yet. Call [`OrderBoard::open`].
    pub fn board(&self) -> OrderBoard {
        OrderBoard::new(self.repository.clone(), self.options.clone())
    }

    /// Draft for a new order opened now
    pub fn draft(&self) -> OrderDraft {
        OrderDraft::new(self.repository.clone(), self.catalog.clone())
    }

    /// Draft for changing an existing order
    pub fn edit(&self, order: ServiceOrder) -> OrderDraft {
        OrderDraft::from_order(self.repository.clone(), self.catalog.clone(), order)
    }

    /// Today's partition at the configured offset
    pub fn today(&self) -> DatePartition {
        DatePartition::today(&self.options.offset())
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::aggregate::{FormattedTotals, TimeAggregate};
    pub use crate::catalog::{Catalog, CatalogEntry};
    pub use crate::config::{AddedEventPolicy, ClientOptions, RevenueBasis};
    pub use crate::error::{Error, ValidationError};
    pub use crate::filter::{OrderFilter, StatusFilter};
    pub use crate::models::{ItemKind, LineItem, OrderStatus, ServiceOrder};
    pub use crate::partition::DatePartition;
    pub use crate::{OrderBoard, OrderDraft, OrderService};
}
