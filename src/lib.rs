// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! # formstate: Reactive Form State with Path-Level Dirty Tracking
//!
//! This crate holds the state of a form: a JSON-like values document, the snapshot it started
//! from, which fields diverged from that snapshot ("dirty" tracking), whether the form is valid,
//! and whether it is currently being validated or submitted. Observers are notified of every
//! committed change, optionally only when the slice of state they watch actually changed.
//!
//! It is meant to sit underneath a UI binding layer. It does not render anything and has no
//! opinion on how validation rules are written.
//!
//! ## Core Concepts
//!
//! - [`FormToolkit`]: the handle applications talk to. Cheap to clone; all clones share one
//!   form.
//! - [`FormState`]: an immutable snapshot, rebuilt on every committed change and handed to
//!   subscribers.
//! - [`FieldPath`]: a parsed path into the values document. Public APIs also accept dotted
//!   strings such as `"address.lines.0"`, where numeric segments are sequence indices. Mapping
//!   keys therefore must be non-empty and must not contain `.`.
//! - [`Draft`]: a scratch copy of the values handed to mutators. Whatever the mutator does to
//!   it is diffed against the previous values into [`EditRecord`]s when it returns.
//!
//! ## Dirty Tracking
//!
//! A field is dirty if its value differs from its initial value, or if any field below it is
//! dirty. The [`DirtyMap`] is never recomputed from scratch: each values commit only
//! re-evaluates the paths its edit records touched, their ancestors, and the paths inside any
//! subtree that was added or removed as a whole. See [`reconcile`] for the rules.
//!
//! Some consequences worth knowing:
//!
//! - Setting a field back to its initial value makes it clean again, and so are its ancestors
//!   unless a sibling is still dirty.
//! - Removing a field, or replacing its parent with `null`, makes every field that used to be
//!   there dirty.
//! - A field with no initial counterpart is dirty, and so is every ancestor up to the root.
//! - Sequence elements are compared by position unless an [`ArrayIdentity`] names a key field
//!   for that sequence, in which case reordering alone does not make anything dirty.
//!
//! ## Validation
//!
//! Validation is asynchronous and sequenced by dispatch order, not by completion order. Each
//! [`FormToolkit::validate`] call supersedes every earlier one; superseded passes still run to
//! completion but their results are discarded. Passes wait a few executor ticks before running
//! the validator, so a burst of calls results in a single validator invocation. See
//! [`validation`] for details.
//!
//! Validation passes run as tasks on a [`futures::task::LocalSpawn`] given at construction,
//! which keeps the crate independent of any particular runtime.
//!
//! ## Getting Started
//!
//! ```rust
//! use formstate::FormOptions;
//! use futures::{executor::LocalPool, future};
//! use serde_json::{Value, json};
//! use std::rc::Rc;
//!
//! let mut pool = LocalPool::new();
//! let form = FormOptions::new(pool.spawner())
//!     .initial_values(json!({ "user": { "name": "", "email": "" } }))
//!     .validate(|values: Rc<Value>| {
//!         let ok = values["user"]["email"].as_str().is_some_and(|e| e.contains('@'));
//!         future::ready(Ok::<_, &'static str>(ok))
//!     })
//!     .on_submit(|values: Rc<Value>| {
//!         println!("submitting {values}");
//!         future::ready(Ok::<_, &'static str>(()))
//!     })
//!     .build()
//!     .unwrap();
//!
//! form.update_field("user.email", "ada@example.com").unwrap();
//! assert!(form.is_field_dirty("user.email"));
//! assert!(form.is_field_dirty("user"));
//! assert!(!form.is_field_dirty("user.name"));
//!
//! pool.run_until(form.submit()).unwrap();
//! assert!(form.get_state().is_valid);
//! assert!(!form.get_state().is_submitting);
//! ```
//!
//! ## Features
//!
//! - `arbitrary`: Implements `quickcheck::Arbitrary` for path types, useful for property-based
//!   testing.
//!
//! ## License
//!
//! This project is licensed under either of
//!
//! - Apache License, Version 2.0, ([LICENSE-APACHE](LICENSE-APACHE) or http://www.apache.org/licenses/LICENSE-2.0)
//! - MIT license ([LICENSE-MIT](LICENSE-MIT) or http://opensource.org/licenses/MIT)
//!
//! at your option.
#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;

pub mod config;
pub use config::{FormConfig, FormOptions};
pub mod draft;
pub use draft::Draft;
pub mod error;
pub use error::{ConfigError, FormError, FormResult, HandlerError, PathError};
pub mod hub;
pub use hub::{NotificationHub, Subscription};
mod identity;
pub use identity::ArrayIdentity;
mod patch;
pub use patch::{EditOp, EditRecord};
mod path;
pub use path::{FieldPath, Segment, ToFieldPath};
pub mod path_set;
pub mod reconcile;
mod shallow;
pub use shallow::ShallowEq;
mod state;
pub use state::{DirtyMap, FormState};
pub mod store;
pub use store::{SnapshotStore, ValuesCommit};
mod toolkit;
pub use toolkit::FormToolkit;
pub mod validation;
pub use validation::{
    Deferral, SubmitHandler, Validation, ValidationSequencer, ValidationToken, Validator,
};
