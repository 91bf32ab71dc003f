//! Optimistic create/update/delete against a cached list snapshot.
//!
//! Each mutation walks `Idle -> OptimisticApplied -> SettledSuccess |
//! SettledFailure`. Applied patches are stacked per key; only the mutation on
//! top of the stack may restore its captured snapshot on failure, so a late
//! failure never resurrects data older than a newer optimistic state. A
//! failure that cannot restore marks the key dirty, and the key is refetched
//! once its last pending mutation settles.

use std::collections::{HashMap, HashSet};
use std::fmt;

use super::{CacheItem, CacheStore, ResourceKey, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MutationId(u64);

impl fmt::Display for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPhase {
    Idle,
    OptimisticApplied,
    SettledSuccess,
    SettledFailure,
}

pub enum OptimisticPatch<T> {
    /// Append a placeholder item.
    Create(T),
    /// Rewrite the item with `id`; skipped if it is not cached.
    Update {
        id: String,
        apply: Box<dyn FnOnce(&T) -> T + Send>,
    },
    Delete { id: String },
}

impl<T> OptimisticPatch<T> {
    pub fn kind(&self) -> MutationKind {
        match self {
            OptimisticPatch::Create(_) => MutationKind::Create,
            OptimisticPatch::Update { .. } => MutationKind::Update,
            OptimisticPatch::Delete { .. } => MutationKind::Delete,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Server accepted; the key was invalidated.
    Confirmed,
    /// Server rejected; the captured snapshot was restored.
    RolledBack,
    /// Server rejected, but a newer optimistic patch sits on top of this one.
    /// The key was invalidated instead of restored.
    RollbackSkipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettleOutcome {
    pub id: MutationId,
    pub key: ResourceKey,
    pub kind: MutationKind,
    pub target_id: Option<String>,
    pub phase: MutationPhase,
    pub settlement: Settlement,
    /// Caller should fetch `key` now. Only set once no other mutation on the
    /// key is pending, so a refetch never lands under an optimistic patch.
    pub refetch: bool,
}

struct PendingMutation<T> {
    key: ResourceKey,
    kind: MutationKind,
    target_id: Option<String>,
    /// Pre-patch snapshot; `None` when the patch was a local no-op.
    rollback: Option<Snapshot<T>>,
    phase: MutationPhase,
}

impl<T: CacheItem> PendingMutation<T> {
    fn new(key: ResourceKey, kind: MutationKind, target_id: Option<String>) -> Self {
        Self {
            key,
            kind,
            target_id,
            rollback: None,
            phase: MutationPhase::Idle,
        }
    }

    /// Apply `patch` to the cached snapshot, capturing the prior one.
    /// Returns whether the cache changed.
    fn apply(&mut self, store: &mut CacheStore<Snapshot<T>>, patch: OptimisticPatch<T>) -> bool {
        debug_assert_eq!(self.phase, MutationPhase::Idle);
        self.phase = MutationPhase::OptimisticApplied;

        let Some(current) = store.get(&self.key) else {
            return false;
        };
        let next = match patch {
            OptimisticPatch::Create(item) => Some(current.with_item(item)),
            OptimisticPatch::Update { id, apply } => current.with_updated(&id, apply),
            OptimisticPatch::Delete { id } => current.without(&id),
        };
        let Some(next) = next else {
            return false;
        };
        self.rollback = Some(current.clone());
        store.set(self.key.clone(), next);
        true
    }
}

pub struct MutationController<T> {
    next_id: u64,
    pending: HashMap<MutationId, PendingMutation<T>>,
    /// Mutations whose patch is currently applied, oldest first.
    applied: HashMap<ResourceKey, Vec<MutationId>>,
    dirty: HashSet<ResourceKey>,
}

impl<T> Default for MutationController<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            pending: HashMap::new(),
            applied: HashMap::new(),
            dirty: HashSet::new(),
        }
    }
}

impl<T: CacheItem> MutationController<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a mutation: cancel fetches in flight for `key` and apply the
    /// optimistic patch.
    pub fn begin(
        &mut self,
        store: &mut CacheStore<Snapshot<T>>,
        key: ResourceKey,
        patch: OptimisticPatch<T>,
    ) -> MutationId {
        self.next_id += 1;
        let id = MutationId(self.next_id);
        let target_id = match &patch {
            OptimisticPatch::Create(_) => None,
            OptimisticPatch::Update { id, .. } | OptimisticPatch::Delete { id } => Some(id.clone()),
        };

        if store.cancel_fetches(&key) {
            // The cancelled read must still happen once the key is quiet.
            self.dirty.insert(key.clone());
        }
        let mut mutation = PendingMutation::new(key.clone(), patch.kind(), target_id);
        if mutation.apply(store, patch) {
            self.applied.entry(key.clone()).or_default().push(id);
        } else {
            tracing::debug!(%key, mutation = %id, "mutation: optimistic patch skipped");
        }
        self.pending.insert(id, mutation);
        id
    }

    /// Settle a mutation. Returns `None` for unknown or already-settled ids.
    pub fn settle(
        &mut self,
        store: &mut CacheStore<Snapshot<T>>,
        id: MutationId,
        succeeded: bool,
    ) -> Option<SettleOutcome> {
        let mut mutation = self.pending.remove(&id)?;
        let key = mutation.key.clone();

        let stack = self.applied.entry(key.clone()).or_default();
        let on_top = stack.last() == Some(&id);
        stack.retain(|m| *m != id);

        let settlement = if succeeded {
            mutation.phase = MutationPhase::SettledSuccess;
            store.invalidate(&key);
            self.dirty.insert(key.clone());
            Settlement::Confirmed
        } else {
            mutation.phase = MutationPhase::SettledFailure;
            match mutation.rollback.take() {
                Some(captured) if on_top => {
                    store.set(key.clone(), captured);
                    if self.dirty.contains(&key) {
                        store.invalidate(&key);
                    }
                    Settlement::RolledBack
                }
                Some(_) => {
                    store.invalidate(&key);
                    self.dirty.insert(key.clone());
                    Settlement::RollbackSkipped
                }
                // Nothing was patched, so there is nothing to undo.
                None => Settlement::RolledBack,
            }
        };

        let refetch = if self.has_pending(&key) {
            false
        } else {
            self.applied.remove(&key);
            self.dirty.remove(&key)
        };

        tracing::debug!(%key, mutation = %id, ?settlement, refetch, "mutation: settled");
        Some(SettleOutcome {
            id,
            key,
            kind: mutation.kind,
            target_id: mutation.target_id,
            phase: mutation.phase,
            settlement,
            refetch,
        })
    }

    pub fn phase(&self, id: MutationId) -> Option<MutationPhase> {
        self.pending.get(&id).map(|m| m.phase)
    }

    pub fn has_pending(&self, key: &ResourceKey) -> bool {
        self.pending.values().any(|m| &m.key == key)
    }

    /// Record that a fetch of `key` was wanted while mutations were pending;
    /// it will be requested when the last one settles.
    pub fn defer_refetch(&mut self, key: ResourceKey) {
        self.dirty.insert(key);
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.applied.clear();
        self.dirty.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Tag {
        id: String,
        name: String,
    }

    impl CacheItem for Tag {
        fn item_id(&self) -> &str {
            &self.id
        }
    }

    fn tag(id: &str, name: &str) -> Tag {
        Tag {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    fn key() -> ResourceKey {
        ResourceKey::new("customTags")
    }

    fn seeded() -> (CacheStore<Snapshot<Tag>>, Snapshot<Tag>) {
        let s = Snapshot::new(vec![tag("1", "SAVAGE"), tag("2", "PIRATE")]);
        let mut store = CacheStore::new();
        store.set(key(), s.clone());
        (store, s)
    }

    fn current(store: &CacheStore<Snapshot<Tag>>) -> Snapshot<Tag> {
        store.get(&key()).cloned().unwrap()
    }

    #[test]
    fn create_then_success_invalidates_for_refetch() {
        let (mut store, s) = seeded();
        let mut ctl = MutationController::new();

        let id = ctl.begin(&mut store, key(), OptimisticPatch::Create(tag("temp-1", "ROAST")));
        assert_eq!(ctl.phase(id), Some(MutationPhase::OptimisticApplied));
        assert_eq!(current(&store).len(), s.len() + 1);
        assert!(current(&store).contains("temp-1"));

        let outcome = ctl.settle(&mut store, id, true).unwrap();
        assert_eq!(outcome.phase, MutationPhase::SettledSuccess);
        assert_eq!(outcome.settlement, Settlement::Confirmed);
        assert!(outcome.refetch);
        assert!(store.is_stale(&key()));

        let ticket = store.begin_fetch(&key());
        let server = Snapshot::new(vec![tag("1", "SAVAGE"), tag("2", "PIRATE"), tag("3", "ROAST")]);
        assert!(store.complete_fetch(&ticket, server.clone()));
        assert_eq!(current(&store), server);
        assert!(!current(&store).contains("temp-1"));
    }

    #[test]
    fn create_then_failure_restores_exact_snapshot() {
        let (mut store, s) = seeded();
        let mut ctl = MutationController::new();

        let id = ctl.begin(&mut store, key(), OptimisticPatch::Create(tag("temp-1", "ROAST")));
        assert_eq!(current(&store).len(), 3);

        let outcome = ctl.settle(&mut store, id, false).unwrap();
        assert_eq!(outcome.settlement, Settlement::RolledBack);
        assert_eq!(outcome.phase, MutationPhase::SettledFailure);
        assert!(!outcome.refetch);
        assert_eq!(current(&store), s);
        assert!(ctl.settle(&mut store, id, false).is_none());
    }

    #[test]
    fn update_rewrites_in_place_and_rolls_back() {
        let (mut store, s) = seeded();
        let mut ctl = MutationController::new();

        let id = ctl.begin(
            &mut store,
            key(),
            OptimisticPatch::Update {
                id: "1".into(),
                apply: Box::new(|t: &Tag| tag(&t.id, "BRUTAL")),
            },
        );
        assert_eq!(current(&store).items()[0].name, "BRUTAL");
        assert_eq!(current(&store).items()[1], s.items()[1]);

        ctl.settle(&mut store, id, false).unwrap();
        assert_eq!(current(&store), s);
    }

    #[test]
    fn update_of_missing_id_is_local_noop() {
        let (mut store, s) = seeded();
        let mut ctl = MutationController::new();

        let id = ctl.begin(
            &mut store,
            key(),
            OptimisticPatch::Update {
                id: "gone".into(),
                apply: Box::new(|t: &Tag| tag(&t.id, "X")),
            },
        );
        assert_eq!(current(&store), s);
        assert_eq!(ctl.phase(id), Some(MutationPhase::OptimisticApplied));

        let outcome = ctl.settle(&mut store, id, false).unwrap();
        assert_eq!(outcome.target_id.as_deref(), Some("gone"));
        assert_eq!(current(&store), s);
    }

    #[test]
    fn delete_decrements_total() {
        let mut store = CacheStore::new();
        store.set(key(), Snapshot::new(vec![tag("1", "A"), tag("2", "B")]).with_total(2));
        let mut ctl = MutationController::new();

        ctl.begin(&mut store, key(), OptimisticPatch::Delete { id: "2".into() });
        assert_eq!(current(&store).total(), Some(1));
        assert_eq!(current(&store).items(), &[tag("1", "A")]);
    }

    #[test]
    fn newer_failure_restores_its_own_capture_then_older_restores_original() {
        let (mut store, s) = seeded();
        let mut ctl = MutationController::new();

        let first = ctl.begin(&mut store, key(), OptimisticPatch::Create(tag("temp-a", "A")));
        let after_first = current(&store);
        let second = ctl.begin(&mut store, key(), OptimisticPatch::Delete { id: "2".into() });

        let outcome = ctl.settle(&mut store, second, false).unwrap();
        assert_eq!(outcome.settlement, Settlement::RolledBack);
        assert!(!outcome.refetch);
        assert_eq!(current(&store), after_first);

        let outcome = ctl.settle(&mut store, first, false).unwrap();
        assert_eq!(outcome.settlement, Settlement::RolledBack);
        assert!(!outcome.refetch);
        assert_eq!(current(&store), s);
    }

    #[test]
    fn older_failure_never_clobbers_newer_optimistic_state() {
        let (mut store, _) = seeded();
        let mut ctl = MutationController::new();

        let first = ctl.begin(&mut store, key(), OptimisticPatch::Create(tag("temp-a", "A")));
        let second = ctl.begin(&mut store, key(), OptimisticPatch::Create(tag("temp-b", "B")));
        let latest = current(&store);

        let outcome = ctl.settle(&mut store, first, false).unwrap();
        assert_eq!(outcome.settlement, Settlement::RollbackSkipped);
        assert!(!outcome.refetch, "refetch waits for the pending mutation");
        assert_eq!(current(&store), latest);

        let outcome = ctl.settle(&mut store, second, true).unwrap();
        assert_eq!(outcome.settlement, Settlement::Confirmed);
        assert!(outcome.refetch);
        assert!(store.is_stale(&key()));
    }

    #[test]
    fn begin_cancels_in_flight_fetch() {
        let (mut store, _) = seeded();
        let mut ctl = MutationController::new();
        let ticket = store.begin_fetch(&key());

        ctl.begin(&mut store, key(), OptimisticPatch::Create(tag("temp-1", "X")));
        assert!(!store.complete_fetch(&ticket, Snapshot::default()));
        assert!(current(&store).contains("temp-1"));
    }

    #[test]
    fn cancelled_fetch_is_reissued_after_rollback() {
        let mut store: CacheStore<Snapshot<Tag>> = CacheStore::new();
        let mut ctl = MutationController::new();
        let ticket = store.begin_fetch(&key());

        // Nothing cached yet, so the patch cannot apply.
        let id = ctl.begin(&mut store, key(), OptimisticPatch::Create(tag("temp-1", "X")));
        assert!(!store.complete_fetch(&ticket, Snapshot::default()));

        let outcome = ctl.settle(&mut store, id, false).unwrap();
        assert_eq!(outcome.settlement, Settlement::RolledBack);
        assert!(outcome.refetch);
    }

    #[test]
    fn deferred_refetch_fires_after_clean_rollback() {
        let (mut store, s) = seeded();
        let mut ctl = MutationController::new();

        let id = ctl.begin(&mut store, key(), OptimisticPatch::Create(tag("temp-1", "X")));
        assert!(ctl.has_pending(&key()));
        ctl.defer_refetch(key());

        let outcome = ctl.settle(&mut store, id, false).unwrap();
        assert!(outcome.refetch);
        assert_eq!(current(&store), s);
        assert!(!ctl.has_pending(&key()));
    }

    #[test]
    fn mutation_on_uncached_key_applies_nothing() {
        let mut store: CacheStore<Snapshot<Tag>> = CacheStore::new();
        let mut ctl = MutationController::new();
        let id = ctl.begin(&mut store, key(), OptimisticPatch::Create(tag("temp-1", "X")));
        assert!(store.get(&key()).is_none());

        let outcome = ctl.settle(&mut store, id, false).unwrap();
        assert_eq!(outcome.settlement, Settlement::RolledBack);
        assert!(store.get(&key()).is_none());
    }
}
