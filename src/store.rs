// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Ownership of the canonical [`FormState`] and transactional values commits.

use crate::{
    ArrayIdentity, DirtyMap, EditRecord, FormState,
    draft::{Draft, produce},
    error::PathError,
    reconcile::reconcile,
};
use serde_json::Value;
use std::rc::Rc;
use tracing::debug;

/// The outcome of a values mutation that changed something.
#[derive(Debug, Clone)]
pub struct ValuesCommit {
    /// The newly published snapshot.
    pub state: Rc<FormState>,
    /// What changed, relative to the previous snapshot.
    pub records: Vec<EditRecord>,
    /// The entries merged into the dirty map.
    pub delta: DirtyMap,
}

/// Holds the current snapshot and produces the next one.
///
/// Every commit builds a fresh [`FormState`]; published snapshots are never modified.
///
/// Values commits happen in two steps. [`SnapshotStore::prepare_values`] runs the mutator and
/// the reconciler against a snapshot without touching the store, so the store may be read while
/// user code runs. [`SnapshotStore::install`] then makes the result current.
#[derive(Debug)]
pub struct SnapshotStore {
    state: Rc<FormState>,
    identity: Rc<ArrayIdentity>,
}

impl SnapshotStore {
    pub fn new(
        initial_values: Value,
        is_valid: bool,
        is_validating: bool,
        identity: ArrayIdentity,
    ) -> Self {
        Self {
            state: Rc::new(FormState::new(Rc::new(initial_values), is_valid, is_validating)),
            identity: Rc::new(identity),
        }
    }

    #[inline]
    pub fn state(&self) -> &Rc<FormState> {
        &self.state
    }

    pub fn identity(&self) -> &Rc<ArrayIdentity> {
        &self.identity
    }

    /// Applies `mutator` to a draft of `base.values` and builds the snapshot that follows.
    ///
    /// Returns `Ok(None)` if the mutation changed nothing. Otherwise the new snapshot carries
    /// the new values, `is_validating` set to `start_validation` and the dirty map with the
    /// reconciler delta merged in. If `mutator` fails, nothing is built.
    pub fn prepare_values<F>(
        base: &FormState,
        identity: &ArrayIdentity,
        mutator: F,
        start_validation: bool,
    ) -> Result<Option<ValuesCommit>, PathError>
    where
        F: FnOnce(&mut Draft) -> Result<(), PathError>,
    {
        let (values, records) = produce(&base.values, mutator)?;
        if records.is_empty() {
            return Ok(None);
        }

        let delta = reconcile(
            &records,
            &values,
            &base.initial_values,
            &base.dirty_fields,
            identity,
        );
        debug!(
            records = records.len(),
            removals = records.iter().filter(|record| record.is_removal()).count(),
            delta = delta.len(),
            start_validation,
            "committing values"
        );

        let mut dirty_fields = DirtyMap::clone(&base.dirty_fields);
        dirty_fields.extend(delta.iter().map(|(path, dirty)| (path.clone(), *dirty)));

        let mut next = base.clone();
        next.values = Rc::new(values);
        next.is_validating = start_validation;
        next.dirty_fields = Rc::new(dirty_fields);
        Ok(Some(ValuesCommit {
            state: Rc::new(next),
            records,
            delta,
        }))
    }

    /// Makes a prepared commit current.
    pub fn install(&mut self, commit: &ValuesCommit) {
        self.state = Rc::clone(&commit.state);
    }

    /// Commits a change that does not touch the values, such as a flag transition.
    pub fn update(&mut self, f: impl FnOnce(&mut FormState)) -> Rc<FormState> {
        let mut next = FormState::clone(&self.state);
        f(&mut next);
        self.state = Rc::new(next);
        Rc::clone(&self.state)
    }

    /// Makes `values` the new baseline and the current values, forgetting all dirty state.
    pub fn reset(&mut self, values: Value) -> Rc<FormState> {
        debug!("resetting values baseline");
        let values = Rc::new(values);
        self.update(|state| {
            state.values = Rc::clone(&values);
            state.initial_values = values;
            state.dirty_fields = Rc::default();
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldPath;
    use serde_json::json;

    fn store(initial: Value) -> SnapshotStore {
        SnapshotStore::new(initial, true, false, ArrayIdentity::none())
    }

    impl SnapshotStore {
        fn update_values(
            &mut self,
            mutator: impl FnOnce(&mut Draft) -> Result<(), PathError>,
            start_validation: bool,
        ) -> Result<Option<ValuesCommit>, PathError> {
            let commit =
                Self::prepare_values(&self.state, &self.identity, mutator, start_validation)?;
            if let Some(commit) = &commit {
                self.install(commit);
            }
            Ok(commit)
        }
    }

    fn path(dotted: &str) -> FieldPath {
        dotted.parse().unwrap()
    }

    #[test]
    fn no_op_mutation_publishes_nothing() {
        let mut store = store(json!({ "a": 1 }));
        let before = Rc::clone(store.state());
        let commit = store.update_values(|d| d.set("a", 1), true).unwrap();
        assert!(commit.is_none());
        assert!(Rc::ptr_eq(&before, store.state()));
    }

    #[test]
    fn commit_merges_dirty_delta_and_sets_validating() {
        let mut store = store(json!({ "a": { "x": "1", "y": "1" } }));
        let commit = store
            .update_values(|d| d.set("a.x", "2"), true)
            .unwrap()
            .unwrap();
        assert_eq!(commit.records.len(), 1);
        assert_eq!(commit.delta.len(), 2);
        assert!(commit.state.is_validating);
        assert!(commit.state.is_field_dirty(&path("a.x")));

        let commit = store
            .update_values(|d| d.set("a.y", "2"), false)
            .unwrap()
            .unwrap();
        assert!(!commit.state.is_validating);
        assert!(commit.state.is_field_dirty(&path("a.x")));
        assert!(commit.state.is_field_dirty(&path("a.y")));
    }

    #[test]
    fn failed_mutation_leaves_state_untouched() {
        let mut store = store(json!({ "a": 1 }));
        let before = Rc::clone(store.state());
        let result = store.update_values(
            |d| {
                d.set("a", 2)?;
                d.set("b.", 4)
            },
            true,
        );
        assert!(result.is_err());
        assert!(Rc::ptr_eq(&before, store.state()));
    }

    #[test]
    fn published_snapshots_are_never_modified() {
        let mut store = store(json!({ "a": 1 }));
        let first = Rc::clone(store.state());
        store.update_values(|d| d.set("a", 2), true).unwrap();
        assert_eq!(*first.values, json!({ "a": 1 }));
        assert!(first.dirty_fields.is_empty());
    }

    #[test]
    fn preparing_leaves_the_store_alone() {
        let store = store(json!({ "a": 1 }));
        let commit = SnapshotStore::prepare_values(
            store.state(),
            store.identity(),
            |d| d.remove("a").map(drop),
            false,
        )
        .unwrap()
        .unwrap();
        assert!(commit.records[0].is_removal());
        assert_eq!(*store.state().values, json!({ "a": 1 }));
        assert_eq!(*commit.state.values, json!({}));
    }

    #[test]
    fn flag_updates_share_documents() {
        let mut store = store(json!({ "a": 1 }));
        let before = Rc::clone(store.state());
        let after = store.update(|state| state.is_submitting = true);
        assert!(Rc::ptr_eq(&before.values, &after.values));
        assert!(Rc::ptr_eq(&before.dirty_fields, &after.dirty_fields));
        assert!(after.is_submitting);
    }

    #[test]
    fn reset_establishes_a_clean_baseline() {
        let mut store = store(json!({ "a": 1 }));
        store.update_values(|d| d.set("a", 2), true).unwrap();
        assert!(store.state().is_dirty());

        let state = store.reset(json!({ "a": 2 }));
        assert!(!state.is_dirty());
        assert_eq!(*state.initial_values, json!({ "a": 2 }));

        store.update_values(|d| d.set("a", 1), true).unwrap();
        assert!(store.state().is_field_dirty(&path("a")));
        store.update_values(|d| d.set("a", 2), true).unwrap();
        assert!(!store.state().is_field_dirty(&path("a")));
    }
}
