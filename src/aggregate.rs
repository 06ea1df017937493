//! Daily, weekly and monthly revenue totals

use chrono::{Datelike, Duration, FixedOffset, NaiveDate};
use rust_decimal::Decimal;

use crate::config::RevenueBasis;
use crate::format::format_brl;
use crate::models::{OrderStatus, ServiceOrder};

/// Days before today that still count towards the weekly total
pub const WEEK_SPAN_DAYS: i64 = 7;

/// Revenue from finished orders over three windows ending today
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeAggregate {
    pub daily: Decimal,
    pub weekly: Decimal,
    pub monthly: Decimal,
}

/// [`TimeAggregate`] rendered as BRL strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedTotals {
    pub daily: String,
    pub weekly: String,
    pub monthly: String,
}

impl TimeAggregate {
    /// Sum finished orders into the windows. Orders without an open
    /// timestamp, or opened after `today`, count nowhere.
    pub fn compute<'a, I>(orders: I, today: NaiveDate, offset: &FixedOffset, basis: RevenueBasis) -> Self
    where
        I: IntoIterator<Item = &'a ServiceOrder>,
    {
        let week_start = today - Duration::days(WEEK_SPAN_DAYS);
        let month_start = today.with_day(1).unwrap_or(today);

        orders
            .into_iter()
            .filter(|order| order.status == OrderStatus::Finished)
            .filter_map(|order| order.opened_on(offset).map(|day| (day, order)))
            .filter(|(day, _)| *day <= today)
            .fold(Self::default(), |mut acc, (day, order)| {
                let value = match basis {
                    RevenueBasis::LineTotal => order.totals().grand,
                    RevenueBasis::UnitPriceOnly => order.unit_price_sum(),
                };
                if day == today {
                    acc.daily = acc.daily.saturating_add(value);
                }
                if day >= week_start {
                    acc.weekly = acc.weekly.saturating_add(value);
                }
                if day >= month_start {
                    acc.monthly = acc.monthly.saturating_add(value);
                }
                acc
            })
    }

    pub fn formatted(&self) -> FormattedTotals {
        FormattedTotals {
            daily: format_brl(self.daily),
            weekly: format_brl(self.weekly),
            monthly: format_brl(self.monthly),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemKind, LineItem};
    use chrono::TimeZone;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn finished_on(date: NaiveDate, quantity: u32, price: &str) -> ServiceOrder {
        let opened = utc()
            .from_local_datetime(&date.and_hms_opt(10, 0, 0).unwrap())
            .unwrap()
            .timestamp_millis();
        let mut order = ServiceOrder::new_open(opened);
        order.plate = format!("P{}", date.ordinal());
        order.status = OrderStatus::Finished;
        order.items.push(LineItem {
            id: "id00001".to_string(),
            description: "Revisão".to_string(),
            kind: ItemKind::Service,
            quantity,
            unit_price: price.parse().unwrap(),
        });
        order
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn windows_are_inclusive_and_independent() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let orders = vec![
            finished_on(today, 1, "100"),
            finished_on(today - Duration::days(3), 1, "50"),
            finished_on(today - Duration::days(10), 1, "25"),
        ];

        let totals = TimeAggregate::compute(&orders, today, &utc(), RevenueBasis::LineTotal);
        assert_eq!(totals.daily, dec("100"));
        assert_eq!(totals.weekly, dec("150"));
        assert_eq!(totals.monthly, dec("175"));
    }

    #[test]
    fn eight_days_ago_is_outside_the_week() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let orders = vec![
            finished_on(today - Duration::days(7), 1, "10"),
            finished_on(today - Duration::days(8), 1, "20"),
        ];

        let totals = TimeAggregate::compute(&orders, today, &utc(), RevenueBasis::LineTotal);
        assert_eq!(totals.daily, Decimal::ZERO);
        assert_eq!(totals.weekly, dec("10"));
        assert_eq!(totals.monthly, dec("30"));
    }

    #[test]
    fn month_window_starts_on_the_first() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 3).unwrap();
        let orders = vec![finished_on(today - Duration::days(5), 1, "40")];

        let totals = TimeAggregate::compute(&orders, today, &utc(), RevenueBasis::LineTotal);
        assert_eq!(totals.weekly, dec("40"));
        assert_eq!(totals.monthly, Decimal::ZERO);
    }

    #[test]
    fn skips_unfinished_undated_and_future_orders() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let mut open = finished_on(today, 1, "10");
        open.status = OrderStatus::Open;
        let mut undated = finished_on(today, 1, "10");
        undated.opened_at = None;
        let future = finished_on(today + Duration::days(1), 1, "10");

        let totals = TimeAggregate::compute(&[open, undated, future], today, &utc(), RevenueBasis::LineTotal);
        assert_eq!(totals, TimeAggregate::default());
    }

    #[test]
    fn huge_amounts_saturate() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let mut orders = vec![finished_on(today, 1, "1"), finished_on(today, 1, "1")];
        for order in &mut orders {
            order.items[0].unit_price = Decimal::MAX;
        }

        let totals = TimeAggregate::compute(&orders, today, &utc(), RevenueBasis::LineTotal);
        assert_eq!(totals.daily, Decimal::MAX);
        assert_eq!(totals.monthly, Decimal::MAX);
        assert!(totals.formatted().daily.starts_with("R$\u{a0}79.228."));
    }

    #[test]
    fn revenue_basis_controls_quantities() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let orders = vec![finished_on(today, 3, "25.50")];

        let line = TimeAggregate::compute(&orders, today, &utc(), RevenueBasis::LineTotal);
        let unit = TimeAggregate::compute(&orders, today, &utc(), RevenueBasis::UnitPriceOnly);
        assert_eq!(line.daily, dec("76.50"));
        assert_eq!(unit.daily, dec("25.50"));
        assert_eq!(line.formatted().daily, "R$\u{a0}76,50");
    }
}
