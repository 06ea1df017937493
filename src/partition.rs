//! Day partitions of the order tree
//!
//! Orders live under `<root>/<DDMMYYYY>/<plate>`, where the date is the day
//! the order was opened.

use chrono::{Datelike, FixedOffset, NaiveDate, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;

use shop_orders_realtime::DbPath;

use crate::error::{Error, Result};

/// A calendar day, addressed by its `DDMMYYYY` key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatePartition(NaiveDate);

impl DatePartition {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// The partition holding "now" at the given offset
    pub fn today(offset: &FixedOffset) -> Self {
        Self(Utc::now().with_timezone(offset).date_naive())
    }

    /// The partition an order opened at `millis` belongs to
    pub fn from_millis(millis: i64, offset: &FixedOffset) -> Result<Self> {
        offset
            .timestamp_millis_opt(millis)
            .single()
            .map(|at| Self(at.date_naive()))
            .ok_or_else(|| Error::invalid_partition(format!("timestamp {} out of range", millis)))
    }

    /// Parse a `DDMMYYYY` key
    pub fn parse(key: &str) -> Result<Self> {
        let key = key.trim();
        if key.len() != 8 || !key.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::invalid_partition(key));
        }
        NaiveDate::parse_from_str(key, "%d%m%Y")
            .map(Self)
            .map_err(|_| Error::invalid_partition(key))
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn key(&self) -> String {
        format!("{:02}{:02}{:04}", self.0.day(), self.0.month(), self.0.year())
    }

    /// `<root>/<DDMMYYYY>`
    pub fn path(&self, root: &DbPath) -> Result<DbPath> {
        Ok(root.child(&self.key())?)
    }

    /// `<root>/<DDMMYYYY>/<plate>`
    pub fn order_path(&self, root: &DbPath, plate: &str) -> Result<DbPath> {
        Ok(self.path(root)?.child(plate)?)
    }
}

impl fmt::Display for DatePartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl FromStr for DatePartition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<NaiveDate> for DatePartition {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_day_month_year() {
        let partition = DatePartition::new(NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
        assert_eq!(partition.key(), "05012026");
        assert_eq!(DatePartition::parse("05012026").unwrap(), partition);
    }

    #[test]
    fn rejects_malformed_keys() {
        for key in ["5012026", "05-01-2026", "32012026", "abcdefgh", ""] {
            assert!(matches!(DatePartition::parse(key), Err(Error::InvalidPartition(_))), "{}", key);
        }
    }

    #[test]
    fn from_millis_respects_offset() {
        // 2026-10-18T01:30:00Z is still the 17th in Brasília.
        let millis = 1_792_287_000_000;
        let utc = FixedOffset::east_opt(0).unwrap();
        let brasilia = FixedOffset::west_opt(3 * 3600).unwrap();
        assert_eq!(DatePartition::from_millis(millis, &utc).unwrap().key(), "18102026");
        assert_eq!(DatePartition::from_millis(millis, &brasilia).unwrap().key(), "17102026");
    }

    #[test]
    fn builds_order_path() {
        let root = DbPath::parse("orderService").unwrap();
        let partition = DatePartition::parse("18102026").unwrap();
        let path = partition.order_path(&root, "ABC1234").unwrap();
        assert_eq!(path.to_string(), "orderService/18102026/ABC1234");
        assert!(partition.order_path(&root, "AB.1234").is_err());
    }
}
