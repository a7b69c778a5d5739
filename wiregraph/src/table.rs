//! Per-kind interning hash tables (spec §4.B).
//!
//! The original's manual `ref-count, free-at-zero` discipline is exactly
//! what `Arc`/`Weak` give for free in Rust, so that's how interning is
//! modeled here: the table stores a `Weak` per id; `intern` upgrades it if
//! still alive or creates a fresh `Arc` otherwise. Once every `Arc` handle
//! is dropped, the `Weak` stops upgrading and a `gc` sweep (spec: "periodic
//! garbage collection may additionally drop zero-count entries") reclaims
//! the now-dead map slot. This gives invariant 1 ("at most one handle per
//! (kind, id)") and the "lives iff ref-count > 0" lifecycle rule without a
//! hand-rolled counter.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Weak};

pub struct InternTable<Id, T> {
    entries: HashMap<Id, Weak<T>>,
}

impl<Id: Eq + Hash + Clone, T> InternTable<Id, T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Returns the existing live handle for `id`, if any, without creating one.
    pub fn get(&self, id: &Id) -> Option<Arc<T>> {
        self.entries.get(id).and_then(Weak::upgrade)
    }

    /// Returns the live handle for `id`, creating one via `make` on first
    /// reference. `make` runs only when no live handle currently exists.
    pub fn intern_with(&mut self, id: Id, make: impl FnOnce() -> T) -> Arc<T> {
        if let Some(arc) = self.entries.get(&id).and_then(Weak::upgrade) {
            return arc;
        }
        let arc = Arc::new(make());
        self.entries.insert(id, Arc::downgrade(&arc));
        arc
    }

    /// Drops dead (zero-strong-count) entries from the table.
    pub fn gc(&mut self) {
        self.entries.retain(|_, weak| weak.strong_count() > 0);
    }

    /// Number of ids currently tracked, live or not (call `gc` first for an
    /// accurate live count).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn live_count(&self) -> usize {
        self.entries.values().filter(|w| w.strong_count() > 0).count()
    }
}

impl<Id: Eq + Hash + Clone, T> Default for InternTable<Id, T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_returns_same_handle_for_same_id() {
        let mut table: InternTable<u32, String> = InternTable::new();
        let a = table.intern_with(1, || "hello".to_string());
        let b = table.intern_with(1, || panic!("must not remake an already-interned entry"));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn dropping_all_handles_allows_gc_to_reclaim() {
        let mut table: InternTable<u32, String> = InternTable::new();
        {
            let _a = table.intern_with(1, || "x".into());
            assert_eq!(table.live_count(), 1);
        }
        table.gc();
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn get_without_intern_is_none_for_unknown_id() {
        let table: InternTable<u32, String> = InternTable::new();
        assert!(table.get(&42).is_none());
    }
}
