//! The summary record emitted once per closed measurement context.
//!
//! Field order is fixed (`GUID`, `name`, `identity_user_id`, `start_time`,
//! `end_time`, `total_time`, `counters`, `exceptions`) so log parsers can
//! rely on it. Counter and exception keys keep first-insertion order.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::Result;

/// Insertion-ordered name → value tally.
///
/// Per-operation key sets are tiny, so a linear scan over a `Vec` beats
/// hashing and keeps ordering for free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tally<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for Tally<V> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

/// Counter value types: overflow is reported, never wrapped or panicked on.
pub trait TallyValue: Copy + Default {
    fn checked_add(self, rhs: Self) -> Option<Self>;
}

impl TallyValue for i64 {
    fn checked_add(self, rhs: Self) -> Option<Self> {
        i64::checked_add(self, rhs)
    }
}

impl TallyValue for u64 {
    fn checked_add(self, rhs: Self) -> Option<Self> {
        u64::checked_add(self, rhs)
    }
}

impl<V: TallyValue> Tally<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to `key`, starting from zero if absent. Returns the new
    /// total, or `None` on overflow, in which case the tally is unchanged.
    pub fn add(&mut self, key: &str, amount: V) -> Option<V> {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => {
                *v = v.checked_add(amount)?;
                Some(*v)
            }
            None => {
                let v = V::default().checked_add(amount)?;
                self.entries.push((key.to_string(), v));
                Some(v)
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, V)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Serialize> Serialize for Tally<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Final, immutable summary of one measurement.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MeasurementRecord {
    #[serde(rename = "GUID")]
    pub correlation_id: String,
    pub name: String,
    pub identity_user_id: Option<String>,
    pub start_time: String,
    pub end_time: String,
    pub total_time: f64,
    pub counters: Tally<i64>,
    pub exceptions: Tally<u64>,
}

impl MeasurementRecord {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        correlation_id: &str,
        name: &str,
        identity_user_id: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        counters: &Tally<i64>,
        exceptions: &Tally<u64>,
    ) -> Self {
        Self {
            correlation_id: correlation_id.to_string(),
            name: name.to_string(),
            identity_user_id: identity_user_id.map(str::to_string),
            start_time: iso8601(start),
            end_time: iso8601(end),
            total_time: seconds_between(start, end),
            counters: counters.clone(),
            exceptions: exceptions.clone(),
        }
    }

    /// Single-line JSON rendering handed to the sink.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn iso8601(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// `end - start` in fractional seconds at microsecond resolution.
pub(crate) fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let d = end - start;
    match d.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => d.num_milliseconds() as f64 / 1_000.0,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn tally_accumulates_in_insertion_order() {
        let mut t: Tally<i64> = Tally::new();
        t.add("b", 1);
        t.add("a", 2);
        assert_eq!(t.add("b", 4), Some(5));
        assert_eq!(t.get("b"), Some(5));
        assert_eq!(t.get("missing"), None);
        let keys: Vec<_> = t.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn tally_overflow_leaves_value_untouched() {
        let mut t: Tally<i64> = Tally::new();
        t.add("n", i64::MAX).unwrap();
        assert_eq!(t.add("n", 1), None);
        assert_eq!(t.get("n"), Some(i64::MAX));
        assert_eq!(t.add("n", -1), Some(i64::MAX - 1));

        let mut u: Tally<u64> = Tally::new();
        assert_eq!(u.add("e", u64::MAX), Some(u64::MAX));
        assert_eq!(u.add("e", 1), None);
        assert_eq!(u.len(), 1);
    }

    #[test]
    fn record_fields_keep_fixed_order() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let end = start + chrono::Duration::microseconds(1_500_250);
        let mut counters = Tally::new();
        counters.add("zeta", 1);
        counters.add("alpha", 2);
        let rec = MeasurementRecord::new("g-1", "checkout", None, start, end, &counters, &Tally::new());

        let json = rec.to_json().unwrap();
        assert_eq!(
            json,
            concat!(
                r#"{"GUID":"g-1","name":"checkout","identity_user_id":null,"#,
                r#""start_time":"2024-05-01T12:00:00.000000Z","#,
                r#""end_time":"2024-05-01T12:00:01.500250Z","#,
                r#""total_time":1.50025,"counters":{"zeta":1,"alpha":2},"exceptions":{}}"#
            )
        );
    }
}
