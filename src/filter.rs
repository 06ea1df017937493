//! Search and status filtering over the loaded orders

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::models::{OrderStatus, ServiceOrder};

/// Status dropdown value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(OrderStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: OrderStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str("Todos"),
            StatusFilter::Only(status) => write!(f, "{}", status),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "todos" | "all" => Ok(StatusFilter::All),
            other => other.parse().map(StatusFilter::Only),
        }
    }
}

impl From<OrderStatus> for StatusFilter {
    fn from(status: OrderStatus) -> Self {
        StatusFilter::Only(status)
    }
}

/// Search term AND status filter. The search term matches plate or
/// customer name as a case-insensitive substring; empty matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    search_term: String,
    status: StatusFilter,
}

impl OrderFilter {
    pub fn new(search_term: &str, status: StatusFilter) -> Self {
        Self {
            search_term: search_term.to_lowercase(),
            status,
        }
    }

    pub fn with_search_term(mut self, term: &str) -> Self {
        self.search_term = term.to_lowercase();
        self
    }

    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn status(&self) -> StatusFilter {
        self.status
    }

    pub fn matches(&self, order: &ServiceOrder) -> bool {
        let term = self.search_term.as_str();
        let text_match = term.is_empty()
            || order.plate.to_lowercase().contains(term)
            || order.customer_name.to_lowercase().contains(term);
        text_match && self.status.matches(order.status)
    }

    /// Matching orders in source order. The source is left untouched.
    pub fn apply<'a, I>(&self, orders: I) -> Vec<&'a ServiceOrder>
    where
        I: IntoIterator<Item = &'a ServiceOrder>,
    {
        orders.into_iter().filter(|order| self.matches(order)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(plate: &str, customer: &str, status: OrderStatus) -> ServiceOrder {
        let mut order = ServiceOrder::new_open(0);
        order.plate = plate.to_string();
        order.customer_name = customer.to_string();
        order.status = status;
        order
    }

    fn sample() -> Vec<ServiceOrder> {
        vec![
            order("ABC1234", "João Silva", OrderStatus::Open),
            order("XYZ7890", "Maria Souza", OrderStatus::Finished),
            order("ABD5555", "Carlos Abreu", OrderStatus::Finished),
            order("QWE2468", "Ana", OrderStatus::Cancelled),
        ]
    }

    fn plates(found: Vec<&ServiceOrder>) -> Vec<&str> {
        found.into_iter().map(|o| o.plate.as_str()).collect()
    }

    #[test]
    fn empty_filter_matches_everything_in_order() {
        let orders = sample();
        assert_eq!(OrderFilter::default().apply(&orders).len(), orders.len());
    }

    #[test]
    fn search_matches_plate_or_customer() {
        let orders = sample();
        let filter = OrderFilter::new("ab", StatusFilter::All);
        assert_eq!(plates(filter.apply(&orders)), vec!["ABC1234", "ABD5555"]);

        let filter = OrderFilter::new("MARIA", StatusFilter::All);
        assert_eq!(plates(filter.apply(&orders)), vec!["XYZ7890"]);
    }

    #[test]
    fn status_and_search_compose() {
        let orders = sample();
        let combined = OrderFilter::new("ab", StatusFilter::Only(OrderStatus::Finished));
        let search_only = OrderFilter::new("ab", StatusFilter::All);
        let status_only = OrderFilter::default().with_status(StatusFilter::Only(OrderStatus::Finished));

        let staged = status_only.apply(search_only.apply(&orders));
        assert_eq!(combined.apply(&orders), staged);
        assert_eq!(plates(staged), vec!["ABD5555"]);
    }

    #[test]
    fn parses_dropdown_values() {
        assert_eq!("Todos".parse::<StatusFilter>().unwrap(), StatusFilter::All);
        assert_eq!(
            "Cancelada".parse::<StatusFilter>().unwrap(),
            StatusFilter::Only(OrderStatus::Cancelled)
        );
        assert!("??".parse::<StatusFilter>().is_err());
    }
}
