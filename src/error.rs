//! Error handling for the service-order engine

use std::fmt;
use thiserror::Error;

use shop_orders_realtime::RealtimeError;

/// User input that fails a precondition. Raised before any side effect.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no catalog item matches '{0}'")]
    UnknownCatalogItem(String),

    #[error("quantity must be greater than zero")]
    NonPositiveQuantity,

    #[error("unit price must be greater than zero")]
    NonPositiveUnitPrice,

    #[error("item amount is too large")]
    AmountOutOfRange,

    #[error("plate is required")]
    MissingPlate,

    #[error("customer name is required")]
    MissingCustomerName,

    #[error("add at least one item before saving")]
    NoLineItems,

    #[error("order has no open timestamp")]
    MissingOpenTimestamp,
}

/// Unified error type for the service-order engine
#[derive(Error, Debug)]
pub enum Error {
    /// Rejected user input
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A read, write or subscription against the remote store failed
    #[error("Remote operation failed: {0}")]
    Remote(#[from] RealtimeError),

    /// A remote record could not be turned into a service order
    #[error("Decode error: {0}")]
    Decode(String),

    /// An event or status update named a plate that is not loaded
    #[error("No order with plate {plate} in the current partition")]
    ReconciliationMiss { plate: String },

    /// A date partition key that is not DDMMYYYY
    #[error("Invalid date partition: {0}")]
    InvalidPartition(String),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn decode<T: fmt::Display>(msg: T) -> Self {
        Error::Decode(msg.to_string())
    }

    pub fn invalid_partition<T: fmt::Display>(msg: T) -> Self {
        Error::InvalidPartition(msg.to_string())
    }

    pub fn reconciliation_miss<T: fmt::Display>(plate: T) -> Self {
        Error::ReconciliationMiss {
            plate: plate.to_string(),
        }
    }

    /// Whether the error came from rejected input rather than the store.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
