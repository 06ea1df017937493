//! Editing a single order before it is saved
//!
//! An [`OrderDraft`] owns a working copy of one order plus the add-item form
//! state. Nothing reaches the store until [`OrderDraft::save`] passes
//! validation.

use chrono::Utc;
use log::{debug, info, warn};
use rand::Rng;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::error::{Result, ValidationError};
use crate::models::{ItemKind, LineItem, OrderStatus, OrderTotals, ServiceOrder};
use crate::repository::OrderRepository;

const ITEM_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ITEM_ID_LEN: usize = 7;

/// State of the add-item form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddItemForm {
    pub kind: ItemKind,
    /// Catalog id handed over by a picker, or a name as typed by the user
    pub selection: String,
    pub quantity: i64,
    pub unit_price: Decimal,
}

impl Default for AddItemForm {
    fn default() -> Self {
        Self {
            kind: ItemKind::Service,
            selection: String::new(),
            quantity: 1,
            unit_price: Decimal::ZERO,
        }
    }
}

impl AddItemForm {
    /// Back to defaults, keeping the chosen kind
    pub fn reset(&mut self) {
        *self = Self {
            kind: self.kind,
            ..Self::default()
        };
    }
}

/// Working copy of an order being created or updated
pub struct OrderDraft {
    order: ServiceOrder,
    form: AddItemForm,
    catalog: Arc<Catalog>,
    repository: Arc<dyn OrderRepository>,
}

impl OrderDraft {
    /// A blank open order stamped with the current time
    pub fn new(repository: Arc<dyn OrderRepository>, catalog: Arc<Catalog>) -> Self {
        Self::from_order(repository, catalog, ServiceOrder::new_open(now_millis()))
    }

    /// Edit an existing order
    pub fn from_order(repository: Arc<dyn OrderRepository>, catalog: Arc<Catalog>, order: ServiceOrder) -> Self {
        Self {
            order,
            form: AddItemForm::default(),
            catalog,
            repository,
        }
    }

    pub fn order(&self) -> &ServiceOrder {
        &self.order
    }

    pub fn items(&self) -> &[LineItem] {
        &self.order.items
    }

    pub fn totals(&self) -> OrderTotals {
        self.order.totals()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn form(&self) -> &AddItemForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut AddItemForm {
        &mut self.form
    }

    pub fn set_plate(&mut self, plate: &str) {
        self.order.plate = plate.trim().to_uppercase();
    }

    pub fn set_customer_name(&mut self, name: &str) {
        self.order.customer_name = name.to_string();
    }

    pub fn set_customer_tax_id(&mut self, tax_id: &str) {
        self.order.customer_tax_id = non_empty(tax_id);
    }

    pub fn set_vehicle(&mut self, year: &str, make: &str, model: &str) {
        self.order.year = non_empty(year);
        self.order.make = non_empty(make);
        self.order.model = non_empty(model);
    }

    pub fn set_status(&mut self, status: OrderStatus) {
        self.order.status = status;
    }

    /// Append a line item for the catalog entry of `kind` picked by
    /// `selection`, either its id or its name (see [`Catalog::resolve`]).
    /// On success the add-item form is reset to `kind` with defaults. On
    /// error nothing changes.
    pub fn add_line_item(
        &mut self,
        kind: ItemKind,
        selection: &str,
        quantity: i64,
        unit_price: Decimal,
    ) -> std::result::Result<LineItem, ValidationError> {
        let entry = self
            .catalog
            .resolve(kind, selection)
            .ok_or_else(|| ValidationError::UnknownCatalogItem(selection.to_string()))?;
        let quantity = u32::try_from(quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or(ValidationError::NonPositiveQuantity)?;
        if unit_price <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveUnitPrice);
        }

        let item = LineItem {
            id: self.fresh_item_id(),
            description: entry.name.clone(),
            kind,
            quantity,
            unit_price,
        };
        let grand = item
            .checked_total()
            .zip(self.order.checked_totals())
            .and_then(|(line, totals)| totals.grand.checked_add(line));
        if grand.is_none() {
            return Err(ValidationError::AmountOutOfRange);
        }
        debug!("Adding item {} ({}) to draft {}", item.id, item.description, self.order.plate);
        self.order.items.push(item.clone());

        self.form.kind = kind;
        self.form.reset();
        Ok(item)
    }

    /// [`add_line_item`](Self::add_line_item) with the current form values
    pub fn add_from_form(&mut self) -> std::result::Result<LineItem, ValidationError> {
        let AddItemForm {
            kind,
            selection,
            quantity,
            unit_price,
        } = self.form.clone();
        self.add_line_item(kind, &selection, quantity, unit_price)
    }

    /// Remove the item with `id`, if present
    pub fn remove_line_item(&mut self, id: &str) -> Option<LineItem> {
        let position = self.order.items.iter().position(|item| item.id == id)?;
        Some(self.order.items.remove(position))
    }

    /// Check the draft is complete enough to save
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.order.plate.trim().is_empty() {
            return Err(ValidationError::MissingPlate);
        }
        if self.order.customer_name.trim().is_empty() {
            return Err(ValidationError::MissingCustomerName);
        }
        if self.order.items.is_empty() {
            return Err(ValidationError::NoLineItems);
        }
        if self.order.opened_at.is_none() {
            return Err(ValidationError::MissingOpenTimestamp);
        }
        Ok(())
    }

    /// Validate, then overwrite the full record in the store. On success the
    /// draft starts over as a blank open order and the saved order is
    /// returned. On failure the draft is left as it was.
    pub async fn save(&mut self) -> Result<ServiceOrder> {
        self.validate()?;

        if let Err(err) = self.repository.save_order(&self.order).await {
            warn!("Saving order {} failed: {}", self.order.plate, err);
            return Err(err);
        }

        info!("Saved order {}", self.order.plate);
        self.form = AddItemForm::default();
        Ok(std::mem::replace(&mut self.order, ServiceOrder::new_open(now_millis())))
    }

    fn fresh_item_id(&self) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let id: String = (0..ITEM_ID_LEN)
                .map(|_| ITEM_ID_ALPHABET[rng.gen_range(0..ITEM_ID_ALPHABET.len())] as char)
                .collect();
            if !self.order.items.iter().any(|item| item.id == id) {
                return id;
            }
        }
    }
}

impl std::fmt::Debug for OrderDraft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderDraft")
            .field("order", &self.order)
            .field("form", &self.form)
            .finish()
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
