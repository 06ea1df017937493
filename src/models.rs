//! Service orders and their line items

use chrono::{FixedOffset, NaiveDate, TimeZone};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    #[serde(rename = "Aberta")]
    Open,

    #[serde(rename = "Finalizada")]
    Finished,

    #[serde(rename = "Cancelada")]
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 3] = [OrderStatus::Open, OrderStatus::Finished, OrderStatus::Cancelled];

    /// The label stored in the database and shown to users
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Open => "Aberta",
            OrderStatus::Finished => "Finalizada",
            OrderStatus::Cancelled => "Cancelada",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OrderStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "aberta" | "open" => Ok(OrderStatus::Open),
            "finalizada" | "finished" => Ok(OrderStatus::Finished),
            "cancelada" | "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
            other => Err(Error::decode(format!("unknown order status '{}'", other))),
        }
    }
}

/// Whether a line item is labour or a part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ItemKind {
    #[default]
    #[serde(rename = "servico")]
    Service,

    #[serde(rename = "peca")]
    Part,
}

impl ItemKind {
    pub fn label(&self) -> &'static str {
        match self {
            ItemKind::Service => "Serviço",
            ItemKind::Part => "Peça",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ItemKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "servico" | "serviço" | "service" => Ok(ItemKind::Service),
            "peca" | "peça" | "part" => Ok(ItemKind::Part),
            other => Err(Error::decode(format!("unknown item kind '{}'", other))),
        }
    }
}

/// A service or part billed on an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Local identifier, unique within the owning order
    pub id: String,

    #[serde(rename = "descricao")]
    pub description: String,

    #[serde(rename = "tipo")]
    pub kind: ItemKind,

    #[serde(rename = "quantidade")]
    pub quantity: u32,

    #[serde(rename = "valor_unitario", with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
}

impl LineItem {
    /// Quantity × unit price, saturating at the representable bounds
    pub fn total(&self) -> Decimal {
        Decimal::from(self.quantity).saturating_mul(self.unit_price)
    }

    /// Quantity × unit price, `None` if the product does not fit
    pub fn checked_total(&self) -> Option<Decimal> {
        Decimal::from(self.quantity).checked_mul(self.unit_price)
    }
}

/// Per-order sums, split by item kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderTotals {
    pub services: Decimal,
    pub parts: Decimal,
    pub grand: Decimal,
}

/// A work order for one vehicle, keyed by plate within a day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOrder {
    #[serde(rename = "placa", deserialize_with = "plate")]
    pub plate: String,

    #[serde(rename = "ano", default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,

    #[serde(rename = "marca", default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,

    #[serde(rename = "modelo", default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(rename = "nomeCliente", default)]
    pub customer_name: String,

    #[serde(rename = "cpfCliente", default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub customer_tax_id: Option<String>,

    /// Epoch millis when the order was opened
    #[serde(rename = "dataAbertura", default, deserialize_with = "optional_millis", skip_serializing_if = "Option::is_none")]
    pub opened_at: Option<i64>,

    /// Epoch millis when the order was closed. Stored as `"none"` while open.
    #[serde(rename = "dataFechamento", default, with = "closed_at")]
    pub closed_at: Option<i64>,

    #[serde(default)]
    pub status: OrderStatus,

    #[serde(rename = "itens", default, deserialize_with = "items")]
    pub items: Vec<LineItem>,
}

impl ServiceOrder {
    /// A fresh open order with no items, as produced by the create flow
    pub fn new_open(opened_at: i64) -> Self {
        Self {
            plate: String::new(),
            year: None,
            make: None,
            model: None,
            customer_name: String::new(),
            customer_tax_id: None,
            opened_at: Some(opened_at),
            closed_at: None,
            status: OrderStatus::Open,
            items: Vec::new(),
        }
    }

    /// Decode a record read from the store. The plate must be present and
    /// the item amounts must add up without overflowing.
    pub fn from_value(value: Value) -> Result<Self> {
        let order: ServiceOrder = serde_json::from_value(value).map_err(Error::decode)?;
        if order.plate.is_empty() {
            return Err(Error::decode("record has an empty plate"));
        }
        if order.checked_totals().is_none() {
            return Err(Error::decode(format!("item amounts of {} are out of range", order.plate)));
        }
        Ok(order)
    }

    /// Encode the full record for a write
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Whether this order carries the given plate, ignoring case
    pub fn has_plate(&self, plate: &str) -> bool {
        self.plate.eq_ignore_ascii_case(plate.trim())
    }

    pub fn totals(&self) -> OrderTotals {
        self.items.iter().fold(OrderTotals::default(), |mut acc, item| {
            let line = item.total();
            match item.kind {
                ItemKind::Service => acc.services = acc.services.saturating_add(line),
                ItemKind::Part => acc.parts = acc.parts.saturating_add(line),
            }
            acc.grand = acc.grand.saturating_add(line);
            acc
        })
    }

    /// Totals, or `None` when a line or the grand total overflows
    pub fn checked_totals(&self) -> Option<OrderTotals> {
        self.items.iter().try_fold(OrderTotals::default(), |mut acc, item| {
            let line = item.checked_total()?;
            match item.kind {
                ItemKind::Service => acc.services = acc.services.checked_add(line)?,
                ItemKind::Part => acc.parts = acc.parts.checked_add(line)?,
            }
            acc.grand = acc.grand.checked_add(line)?;
            Some(acc)
        })
    }

    /// Sum of unit prices, ignoring quantities
    pub fn unit_price_sum(&self) -> Decimal {
        self.items
            .iter()
            .fold(Decimal::ZERO, |acc, item| acc.saturating_add(item.unit_price))
    }

    /// Calendar date the order was opened on, at the given offset
    pub fn opened_on(&self, offset: &FixedOffset) -> Option<NaiveDate> {
        let millis = self.opened_at?;
        offset
            .timestamp_millis_opt(millis)
            .single()
            .map(|at| at.date_naive())
    }
}

fn plate<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.trim().to_uppercase())
}

fn optional_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn millis_from(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn optional_millis<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(millis_from(&value))
}

// The store drops empty arrays and may hand back sparse arrays as objects.
fn items<'de, D>(deserializer: D) -> std::result::Result<Vec<LineItem>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    let entries = match Value::deserialize(deserializer)? {
        Value::Array(entries) => entries,
        Value::Object(map) => {
            // Object keys sort as text ("10" before "2"); restore index order.
            let mut indexed: Vec<(u64, Value)> = map
                .into_iter()
                .filter_map(|(key, value)| key.parse().ok().map(|index| (index, value)))
                .collect();
            indexed.sort_by_key(|(index, _)| *index);
            indexed.into_iter().map(|(_, value)| value).collect()
        }
        _ => return Ok(Vec::new()),
    };
    entries
        .into_iter()
        .filter(|entry| !entry.is_null())
        .map(|entry| serde_json::from_value(entry).map_err(D::Error::custom))
        .collect()
}

mod closed_at {
    use super::*;

    const OPEN_SENTINEL: &str = "none";

    pub fn serialize<S>(value: &Option<i64>, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(millis) => serializer.serialize_i64(*millis),
            None => serializer.serialize_str(OPEN_SENTINEL),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(millis_from(&value))
    }
}
