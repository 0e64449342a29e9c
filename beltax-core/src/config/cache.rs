use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::{Region, TaxBracket, TaxType};

/// Full argument tuple of one rule lookup.
///
/// Lookups are pure functions of their arguments given a fixed rule-data
/// snapshot, so the tuple is the complete cache key; snapshot changes are
/// handled by [`RuleCache::invalidate_all`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum LookupKey {
    Bracket {
        region: Region,
        tax_type: TaxType,
        bracket_key: String,
        value: i32,
        date: NaiveDate,
    },
    Parameter {
        region: Region,
        tax_type: TaxType,
        param_key: String,
        date: NaiveDate,
    },
    AgeCoefficient {
        region: Region,
        tax_type: TaxType,
        age_years: i32,
        date: NaiveDate,
    },
    Exemption {
        region: Region,
        tax_type: TaxType,
        condition_key: String,
        date: NaiveDate,
    },
}

/// Cached result of one rule lookup. Negative results (`None`, `false`) are
/// cached too — a missing parameter is as stable as a present one.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CachedValue {
    Bracket(Option<TaxBracket>),
    Scalar(Option<Decimal>),
    Flag(bool),
}

#[derive(Debug, Default)]
struct CacheState {
    generation: u64,
    entries: HashMap<LookupKey, CachedValue>,
}

/// Explicit, injectable memo for rule lookups.
///
/// Rule data changes at most a handful of times per year, so lookups are
/// served read-through from this cache. Writers (indexation, admin edits)
/// call [`RuleCache::invalidate_all`] after their transaction commits; the
/// generation counter lets callers observe that an invalidation happened.
#[derive(Debug, Default)]
pub struct RuleCache {
    state: Mutex<CacheState>,
}

impl RuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry and advance the generation counter. Called after a
    /// rule-data write has committed.
    pub fn invalidate_all(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.entries.clear();
    }

    /// Number of completed invalidations. Starts at 0.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub(crate) fn get(&self, key: &LookupKey) -> Option<CachedValue> {
        self.lock().entries.get(key).cloned()
    }

    pub(crate) fn put(&self, key: LookupKey, value: CachedValue) {
        self.lock().entries.insert(key, value);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        // A panic while holding the lock leaves plain data behind; recover it.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
