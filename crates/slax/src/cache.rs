//! 🧊 TTL cache: `(key) -> (value, expiry)`, with time passed in from outside.
//!
//! 🧠 Knowledge graph:
//! - Used by: `fetcher::TicketFetcher` (300s for searches, 60s for single lookups)
//! - Time source: whoever calls us. We never read the wall clock ourselves, so a test can
//!   fast-forward five minutes without actually waiting five minutes. Patience is not a test strategy.
//! - Expiry is lazy: stale entries are ignored by `get` and replaced by `insert`.
//!   The fetcher calls `purge_expired` before every insert, so the map never outgrows
//!   what is still fresh plus what is about to be.

use std::collections::HashMap;
use std::hash::Hash;

use chrono::{DateTime, TimeDelta, Utc};

/// 📦 One cached value and the instant it stops being trustworthy.
#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// 🧊 A map whose values go off like milk.
#[derive(Debug, Clone)]
pub struct TtlCache<K, V> {
    ttl: TimeDelta,
    entries: HashMap<K, Entry<V>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
{
    pub fn new(ttl: TimeDelta) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// 🔍 The value for `key`, if one was inserted less than `ttl` before `now`.
    pub fn get(&self, key: &K, now: DateTime<Utc>) -> Option<&V> {
        self.entries
            .get(key)
            .filter(|entry| now < entry.expires_at)
            .map(|entry| &entry.value)
    }

    /// 📥 Store `value`, valid until `now + ttl`. Replaces whatever was there, fresh or stale.
    pub fn insert(&mut self, key: K, value: V, now: DateTime<Utc>) -> &V {
        // -- an absurd TTL saturates at the end of time instead of overflowing
        let expires_at = now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        let slot = self.entries.entry(key).insert_entry(Entry { value, expires_at });
        &slot.into_mut().value
    }

    /// 🧹 Drop everything that has expired as of `now`. Returns how many went in the bin.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| now < entry.expires_at);
        before - self.entries.len()
    }

    /// 📏 Entries currently held, stale ones included until purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn the_one_where_fresh_milk_is_served_and_sour_milk_is_not() {
        let mut cache = TtlCache::new(TimeDelta::seconds(300));
        cache.insert("active", 42, noon());

        assert_eq!(cache.get(&"active", noon()), Some(&42));
        assert_eq!(
            cache.get(&"active", noon() + TimeDelta::seconds(299)),
            Some(&42),
            "one second before expiry is still fine"
        );
        assert_eq!(
            cache.get(&"active", noon() + TimeDelta::seconds(300)),
            None,
            "expiry instant itself is already stale"
        );
    }

    #[test]
    fn the_one_where_a_reinsert_restarts_the_countdown() {
        let mut cache = TtlCache::new(TimeDelta::seconds(60));
        cache.insert("TKTS-1", "old", noon());
        let later = noon() + TimeDelta::seconds(90);
        assert_eq!(cache.get(&"TKTS-1", later), None);

        cache.insert("TKTS-1", "new", later);
        assert_eq!(cache.get(&"TKTS-1", later + TimeDelta::seconds(30)), Some(&"new"));
        assert_eq!(cache.len(), 1, "replace, not append");
    }

    #[test]
    fn the_one_where_the_janitor_purges_only_the_expired() {
        let mut cache = TtlCache::new(TimeDelta::seconds(60));
        cache.insert("a", 1, noon());
        cache.insert("b", 2, noon() + TimeDelta::seconds(50));

        let purged = cache.purge_expired(noon() + TimeDelta::seconds(70));
        assert_eq!(purged, 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"b", noon() + TimeDelta::seconds(70)), Some(&2));
    }

    #[test]
    fn the_one_where_a_ttl_longer_than_history_does_not_overflow() {
        let mut cache = TtlCache::new(TimeDelta::MAX);
        cache.insert("forever", 1, noon());
        assert_eq!(cache.get(&"forever", noon() + TimeDelta::days(365 * 100)), Some(&1));
    }
}
