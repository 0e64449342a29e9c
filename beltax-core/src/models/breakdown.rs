use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One value in a calculation breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BreakdownValue {
    Amount(Decimal),
    Count(i64),
    Flag(bool),
    Text(String),
}

impl From<Decimal> for BreakdownValue {
    fn from(value: Decimal) -> Self {
        BreakdownValue::Amount(value)
    }
}

impl From<i32> for BreakdownValue {
    fn from(value: i32) -> Self {
        BreakdownValue::Count(i64::from(value))
    }
}

impl From<i64> for BreakdownValue {
    fn from(value: i64) -> Self {
        BreakdownValue::Count(value)
    }
}

impl From<bool> for BreakdownValue {
    fn from(value: bool) -> Self {
        BreakdownValue::Flag(value)
    }
}

impl From<&str> for BreakdownValue {
    fn from(value: &str) -> Self {
        BreakdownValue::Text(value.to_string())
    }
}

impl From<String> for BreakdownValue {
    fn from(value: String) -> Self {
        BreakdownValue::Text(value)
    }
}

/// Insertion-ordered map of the named intermediate values of a calculation.
///
/// The breakdown is an external contract, not debug output: downstream
/// renderers and audit consumers address entries by exact key (`baseAmount`,
/// `ageCoefficient`, `luchtcomponent_c`, ...), so keys keep their original
/// spelling and entries keep the order in which the formula produced them.
/// Re-inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Breakdown {
    entries: Vec<(String, BreakdownValue)>,
}

impl Breakdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an intermediate value. Replaces in place if the key exists,
    /// keeping its original position.
    pub fn push(&mut self, key: &str, value: impl Into<BreakdownValue>) {
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key.to_string(), value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&BreakdownValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// True iff the key holds the boolean flag `true`.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.get(key), Some(BreakdownValue::Flag(true)))
    }

    /// The amount stored under `key`, if it is a decimal entry.
    pub fn amount(&self, key: &str) -> Option<Decimal> {
        match self.get(key) {
            Some(BreakdownValue::Amount(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BreakdownValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
