//! Keyed snapshot cache shared by the app actor's screens.
//!
//! All writes happen on the actor thread, so nothing here locks. What the
//! store does track is a per-key version: every write or fetch start bumps
//! it, and a fetch result only lands if its ticket still carries the current
//! version. That is how a superseded fetch gets ignored instead of
//! overwriting newer data.

mod feed;
mod mutation;

use std::collections::HashMap;
use std::fmt;

pub use feed::{Feed, FeedLoader, FeedPage, FeedRollback, PageRequest};
pub use mutation::{
    MutationController, MutationId, MutationKind, MutationPhase, OptimisticPatch, SettleOutcome,
    Settlement,
};

/// Anything stored in a list snapshot has a stable opaque id.
pub trait CacheItem: Clone {
    fn item_id(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub resource: &'static str,
    pub filter: Option<String>,
}

impl ResourceKey {
    pub fn new(resource: &'static str) -> Self {
        Self {
            resource,
            filter: None,
        }
    }

    pub fn filtered(resource: &'static str, filter: impl Into<String>) -> Self {
        Self {
            resource,
            filter: Some(filter.into()),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.filter {
            Some(filter) => write!(f, "{}[{}]", self.resource, filter),
            None => f.write_str(self.resource),
        }
    }
}

/// Immutable view of a remote list. Every change builds a new snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot<T> {
    items: Vec<T>,
    total: Option<u32>,
}

impl<T> Default for Snapshot<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: None,
        }
    }
}

impl<T: CacheItem> Snapshot<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items, total: None }
    }

    pub fn with_total(mut self, total: u32) -> Self {
        self.total = Some(total);
        self
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn total(&self) -> Option<u32> {
        self.total
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|item| item.item_id() == id)
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.item_id() == id)
    }

    /// New snapshot with `item` appended.
    pub fn with_item(&self, item: T) -> Self {
        let mut items = self.items.clone();
        items.push(item);
        Self {
            items,
            total: self.total.map(|t| t + 1),
        }
    }

    /// New snapshot with the item matching `id` rewritten by `f`, order
    /// preserved. `None` if no item has that id.
    pub fn with_updated(&self, id: &str, f: impl FnOnce(&T) -> T) -> Option<Self> {
        let idx = self.items.iter().position(|item| item.item_id() == id)?;
        let mut items = self.items.clone();
        items[idx] = f(&self.items[idx]);
        Some(Self {
            items,
            total: self.total,
        })
    }

    /// New snapshot without the item matching `id`. `None` if absent.
    pub fn without(&self, id: &str) -> Option<Self> {
        if !self.contains(id) {
            return None;
        }
        Some(Self {
            items: self
                .items
                .iter()
                .filter(|item| item.item_id() != id)
                .cloned()
                .collect(),
            total: self.total.map(|t| t.saturating_sub(1)),
        })
    }
}

/// Proof that a fetch was started for `key` at `version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub key: ResourceKey,
    pub version: u64,
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: Option<V>,
    stale: bool,
    version: u64,
    /// Version of the fetch currently awaited, if any.
    fetching: Option<u64>,
}

impl<V> Default for CacheEntry<V> {
    fn default() -> Self {
        Self {
            value: None,
            stale: true,
            version: 0,
            fetching: None,
        }
    }
}

/// One current value per [`ResourceKey`].
#[derive(Debug)]
pub struct CacheStore<V> {
    entries: HashMap<ResourceKey, CacheEntry<V>>,
}

impl<V> Default for CacheStore<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V: Clone> CacheStore<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ResourceKey) -> Option<&V> {
        self.entries.get(key).and_then(|e| e.value.as_ref())
    }

    /// Replace the current value. Any fetch already in flight for `key` is
    /// superseded.
    pub fn set(&mut self, key: ResourceKey, value: V) {
        let entry = self.entries.entry(key).or_default();
        entry.value = Some(value);
        entry.stale = false;
        entry.version += 1;
    }

    /// Mark `key` so the next read performs a real fetch. The current value
    /// stays readable until then. Returns false if nothing was cached.
    pub fn invalidate(&mut self, key: &ResourceKey) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.stale = true;
                true
            }
            None => false,
        }
    }

    /// True when `key` was never fetched or has been invalidated.
    pub fn is_stale(&self, key: &ResourceKey) -> bool {
        self.entries.get(key).map(|e| e.stale).unwrap_or(true)
    }

    pub fn version(&self, key: &ResourceKey) -> u64 {
        self.entries.get(key).map(|e| e.version).unwrap_or(0)
    }

    pub fn begin_fetch(&mut self, key: &ResourceKey) -> FetchTicket {
        let entry = self.entries.entry(key.clone()).or_default();
        entry.version += 1;
        entry.fetching = Some(entry.version);
        FetchTicket {
            key: key.clone(),
            version: entry.version,
        }
    }

    /// True while the latest fetch for `key` has neither landed nor been
    /// cancelled or abandoned.
    pub fn is_fetching(&self, key: &ResourceKey) -> bool {
        self.entries
            .get(key)
            .map(|e| e.fetching.is_some())
            .unwrap_or(false)
    }

    /// Forget a fetch that failed. Its result will never land.
    pub fn abandon_fetch(&mut self, ticket: &FetchTicket) {
        if let Some(entry) = self.entries.get_mut(&ticket.key) {
            if entry.fetching == Some(ticket.version) {
                entry.fetching = None;
            }
        }
    }

    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        self.version(&ticket.key) == ticket.version
    }

    /// Land a fetch result. Returns false (and drops `value`) when a newer
    /// fetch or write happened since the ticket was issued.
    pub fn complete_fetch(&mut self, ticket: &FetchTicket, value: V) -> bool {
        let Some(entry) = self.entries.get_mut(&ticket.key) else {
            return false;
        };
        if entry.fetching == Some(ticket.version) {
            entry.fetching = None;
        }
        if entry.version != ticket.version {
            tracing::debug!(
                key = %ticket.key,
                version = ticket.version,
                current = entry.version,
                "cache: dropping stale fetch"
            );
            return false;
        }
        entry.value = Some(value);
        entry.stale = false;
        true
    }

    /// Supersede every in-flight fetch for `key` without touching its value.
    /// Returns whether a fetch was actually outstanding; the caller owns
    /// reissuing it.
    pub fn cancel_fetches(&mut self, key: &ResourceKey) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.version += 1;
                entry.fetching.take().is_some()
            }
            None => false,
        }
    }

    pub fn remove(&mut self, key: &ResourceKey) -> Option<V> {
        self.entries.remove(key).and_then(|e| e.value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Item(&'static str, u32);

    impl CacheItem for Item {
        fn item_id(&self) -> &str {
            self.0
        }
    }

    fn key() -> ResourceKey {
        ResourceKey::new("customTags")
    }

    #[test]
    fn snapshot_edits_leave_original_untouched() {
        let base = Snapshot::new(vec![Item("a", 1), Item("b", 2)]).with_total(2);

        let appended = base.with_item(Item("c", 3));
        assert_eq!(appended.len(), 3);
        assert_eq!(appended.total(), Some(3));

        let updated = base.with_updated("b", |i| Item(i.0, 20)).unwrap();
        assert_eq!(updated.items(), &[Item("a", 1), Item("b", 20)]);

        let removed = base.without("a").unwrap();
        assert_eq!(removed.items(), &[Item("b", 2)]);
        assert_eq!(removed.total(), Some(1));

        assert_eq!(base.items(), &[Item("a", 1), Item("b", 2)]);
        assert!(base.with_updated("zz", |i| i.clone()).is_none());
        assert!(base.without("zz").is_none());
    }

    #[test]
    fn superseded_fetch_is_ignored() {
        let mut store: CacheStore<Snapshot<Item>> = CacheStore::new();
        let first = store.begin_fetch(&key());
        let second = store.begin_fetch(&key());

        assert!(store.complete_fetch(&second, Snapshot::new(vec![Item("new", 2)])));
        assert!(!store.complete_fetch(&first, Snapshot::new(vec![Item("old", 1)])));
        assert_eq!(store.get(&key()).unwrap().items(), &[Item("new", 2)]);
    }

    #[test]
    fn local_write_supersedes_in_flight_fetch() {
        let mut store: CacheStore<Snapshot<Item>> = CacheStore::new();
        let ticket = store.begin_fetch(&key());
        store.set(key(), Snapshot::new(vec![Item("optimistic", 1)]));
        assert!(!store.is_current(&ticket));
        assert!(!store.complete_fetch(&ticket, Snapshot::default()));
        assert_eq!(store.get(&key()).unwrap().len(), 1);
    }

    #[test]
    fn cancel_reports_only_outstanding_fetches() {
        let mut store: CacheStore<Snapshot<Item>> = CacheStore::new();
        assert!(!store.cancel_fetches(&key()));

        let ticket = store.begin_fetch(&key());
        assert!(store.is_fetching(&key()));
        assert!(store.cancel_fetches(&key()));
        assert!(!store.is_fetching(&key()));
        assert!(!store.cancel_fetches(&key()));
        assert!(!store.complete_fetch(&ticket, Snapshot::default()));

        let ticket = store.begin_fetch(&key());
        assert!(store.complete_fetch(&ticket, Snapshot::default()));
        assert!(!store.cancel_fetches(&key()));

        let ticket = store.begin_fetch(&key());
        store.abandon_fetch(&ticket);
        assert!(!store.cancel_fetches(&key()));
    }

    #[test]
    fn invalidate_keeps_value_but_marks_stale() {
        let mut store: CacheStore<Snapshot<Item>> = CacheStore::new();
        assert!(store.is_stale(&key()));
        assert!(!store.invalidate(&key()));

        store.set(key(), Snapshot::new(vec![Item("a", 1)]));
        assert!(!store.is_stale(&key()));
        assert!(store.invalidate(&key()));
        assert!(store.is_stale(&key()));
        assert_eq!(store.get(&key()).unwrap().len(), 1);
    }

    #[test]
    fn keys_with_different_filters_are_independent() {
        let mut store: CacheStore<u32> = CacheStore::new();
        store.set(ResourceKey::filtered("history", "ALL"), 1);
        store.set(ResourceKey::filtered("history", "SAVAGE"), 2);
        assert_eq!(store.get(&ResourceKey::filtered("history", "ALL")), Some(&1));
        store.clear();
        assert_eq!(store.get(&ResourceKey::filtered("history", "SAVAGE")), None);
    }
}
