// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! The externally consumed form handle.

use crate::{
    FormOptions, FormState, ShallowEq, SubmitHandler, ToFieldPath, Validator,
    config::values_document,
    draft::Draft,
    error::{ConfigError, FormError, FormResult, PathError},
    hub::{NotificationHub, Subscription},
    path::check_keys,
    store::SnapshotStore,
    validation::{Deferral, Validation, ValidationSequencer, ValidationToken},
};
use futures::{
    channel::oneshot,
    future::{self, FutureExt, LocalBoxFuture},
    task::{LocalSpawn, LocalSpawnExt},
};
use serde_json::Value;
use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::{Rc, Weak},
};
use tracing::{debug, warn};

/// A form: values, dirty tracking, validation and submission behind one handle.
///
/// Handles are cheap to clone and all clones refer to the same form. Everything happens on one
/// thread: state changes are committed synchronously and published to subscribers before the
/// call that caused them returns. Validation passes run as tasks on the spawner given in
/// [`FormOptions`].
///
/// # Example
///
/// ```
/// use formstate::{FormOptions, FormToolkit};
/// use futures::executor::LocalPool;
/// use serde_json::json;
///
/// let mut pool = LocalPool::new();
/// let form = FormOptions::new(pool.spawner())
///     .initial_values(json!({ "a": { "x": "1", "y": "1" } }))
///     .build()
///     .unwrap();
///
/// form.update_field("a.x", "2").unwrap();
/// assert!(form.is_field_dirty("a"));
/// assert!(form.is_field_dirty("a.x"));
/// assert!(!form.is_field_dirty("a.y"));
///
/// form.update_field("a.x", "1").unwrap();
/// assert!(!form.is_field_dirty("a"));
///
/// pool.run_until_stalled();
/// assert!(!form.get_state().is_validating);
/// ```
#[derive(Clone)]
pub struct FormToolkit {
    inner: Rc<Inner>,
}

struct Inner {
    store: RefCell<SnapshotStore>,
    sequencer: RefCell<ValidationSequencer>,
    latest: RefCell<Validation>,
    hub: NotificationHub,
    validator: Option<Box<dyn Validator>>,
    on_submit: Option<Box<dyn SubmitHandler>>,
    spawner: Box<dyn LocalSpawn>,
    delay_ticks: usize,
    committing: Cell<bool>,
}

/// Clears the commit flag even if a subscriber panics.
struct CommitGuard<'a>(&'a Cell<bool>);

impl Drop for CommitGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl Inner {
    fn state(&self) -> Rc<FormState> {
        Rc::clone(self.store.borrow().state())
    }

    fn guard(&self) -> Result<CommitGuard<'_>, FormError> {
        if self.committing.replace(true) {
            return Err(FormError::ReentrantCommit);
        }
        Ok(CommitGuard(&self.committing))
    }

    /// Commits a flag change and publishes the result.
    fn commit(&self, f: impl FnOnce(&mut FormState)) -> Result<Rc<FormState>, FormError> {
        let _guard = self.guard()?;
        let state = self.store.borrow_mut().update(f);
        self.hub.publish(&state);
        Ok(state)
    }

    fn is_current(&self, token: ValidationToken) -> bool {
        self.sequencer.borrow().is_current(token)
    }
}

impl fmt::Debug for FormToolkit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormToolkit")
            .field("state", &self.inner.state())
            .field("hub", &self.inner.hub)
            .finish_non_exhaustive()
    }
}

impl FormToolkit {
    /// Builds a form. If the initial state is validating, the first validation pass is
    /// dispatched right away.
    pub fn new(options: FormOptions) -> Result<Self, ConfigError> {
        let FormOptions {
            spawner,
            initial_values,
            config,
            validator,
            on_submit,
        } = options;

        let initial_values = values_document(initial_values)
            .map_err(|found| ConfigError::InitialValuesNotContainer { found })?;
        check_keys(&initial_values).map_err(ConfigError::InitialValues)?;
        let identity = config.identity()?;
        let store = SnapshotStore::new(
            initial_values,
            config.initial_is_valid,
            config.initial_is_validating,
            identity,
        );

        let settled: Validation = future::ready(Ok(config.initial_is_valid))
            .boxed_local()
            .shared();
        let form = Self {
            inner: Rc::new(Inner {
                store: RefCell::new(store),
                sequencer: RefCell::new(ValidationSequencer::new()),
                latest: RefCell::new(settled),
                hub: NotificationHub::new(),
                validator,
                on_submit,
                spawner,
                delay_ticks: config.validation_delay_ticks,
                committing: Cell::new(false),
            }),
        };

        if config.initial_is_validating {
            drop(form.validate());
        }
        Ok(form)
    }

    /// The current snapshot.
    pub fn get_state(&self) -> Rc<FormState> {
        self.inner.state()
    }

    /// Applies `mutator` to a draft of the values and commits the change.
    ///
    /// A mutation that changes nothing publishes nothing and starts no validation. Otherwise the
    /// new state is published to subscribers, and a validation pass is dispatched if
    /// `start_validation` is set. If `mutator` fails, nothing is committed and its error is
    /// returned.
    ///
    /// `mutator` may read the form, and sees it as it was before the mutation. Mutating the form
    /// from inside `mutator` fails with [`FormError::ReentrantCommit`].
    pub fn update_values<F>(&self, mutator: F, start_validation: bool) -> FormResult<()>
    where
        F: FnOnce(&mut Draft) -> Result<(), PathError>,
    {
        {
            let _guard = self.inner.guard()?;
            let (base, identity) = {
                let store = self.inner.store.borrow();
                (Rc::clone(store.state()), Rc::clone(store.identity()))
            };
            let Some(commit) =
                SnapshotStore::prepare_values(&base, &identity, mutator, start_validation)?
            else {
                return Ok(());
            };
            self.inner.store.borrow_mut().install(&commit);
            self.inner.hub.publish(&commit.state);
        }

        if start_validation {
            drop(self.validate());
        }
        Ok(())
    }

    /// Sets one field and starts validation.
    pub fn update_field(
        &self,
        path: impl ToFieldPath,
        value: impl Into<Value>,
    ) -> FormResult<()> {
        let path = path.to_field_path()?.into_owned();
        self.update_values(|draft| draft.set(&path, value), true)
    }

    /// Whether `path` differs from its initial value or contains a field that does.
    ///
    /// Paths that were never evaluated, or do not parse, are clean. The root path reports
    /// whether any field is dirty.
    pub fn is_field_dirty(&self, path: impl ToFieldPath) -> bool {
        path.to_field_path()
            .is_ok_and(|path| self.inner.state().is_field_dirty(&path))
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.state().is_dirty()
    }

    /// Starts a validation pass and makes it the current one.
    ///
    /// The validator runs with the values as they are now, after the configured number of
    /// executor ticks, and only if no later pass was started in between. A pass that is
    /// superseded before or while its validator runs resolves with the last committed validity
    /// and leaves the state alone. The returned future may be cloned and awaited any number of
    /// times; it does not need to be polled for the pass to run.
    pub fn validate(&self) -> Validation {
        let inner = &self.inner;
        if inner.committing.get() {
            return future::ready(Err(FormError::ReentrantCommit))
                .boxed_local()
                .shared();
        }

        let token = inner.sequencer.borrow_mut().issue();
        let values = Rc::clone(&inner.state().values);
        debug!(%token, "dispatching validation");

        let (tx, rx) = oneshot::channel();
        let pass = run_validation(Rc::downgrade(inner), token, values, inner.delay_ticks);
        if let Err(err) = inner.spawner.spawn_local(async move {
            let _ = tx.send(pass.await);
        }) {
            warn!(error = %err, "failed to schedule validation");
            let failed: Validation = future::ready(Err(FormError::Schedule(Rc::new(err))))
                .boxed_local()
                .shared();
            *inner.latest.borrow_mut() = failed.clone();
            // Earlier passes are stale now, so nothing else would clear the flag.
            if inner.state().is_validating {
                if let Err(err) = inner.commit(|state| state.is_validating = false) {
                    return future::ready(Err(err)).boxed_local().shared();
                }
            }
            return failed;
        }

        let validation: Validation = rx
            .map(|outcome| outcome.unwrap_or(Err(FormError::Detached)))
            .boxed_local()
            .shared();
        *inner.latest.borrow_mut() = validation.clone();

        if !inner.state().is_validating {
            if let Err(err) = inner.commit(|state| state.is_validating = true) {
                return future::ready(Err(err)).boxed_local().shared();
            }
        }
        validation
    }

    /// Submits the form once the most recent validation pass has resolved.
    ///
    /// If that pass found the form invalid, the submit handler is not invoked and
    /// `is_submitting` never changes. Otherwise `is_submitting` is set for as long as the
    /// handler runs. A failing handler still clears `is_submitting` before its error is
    /// returned.
    pub fn submit(&self) -> LocalBoxFuture<'static, FormResult<()>> {
        let latest = self.inner.latest.borrow().clone();
        run_submission(Rc::downgrade(&self.inner), latest).boxed_local()
    }

    /// Registers `callback` for every committed state change.
    pub fn subscribe(&self, callback: impl Fn(&Rc<FormState>) + 'static) -> Subscription {
        self.inner.hub.subscribe(callback)
    }

    /// Registers `listener` for changes of a projection of the state.
    ///
    /// `listener` is only called when the projection is not [`ShallowEq`] to the one it last
    /// saw, starting from the projection of the current state.
    pub fn subscribe_selector<T, S, L>(&self, selector: S, listener: L) -> Subscription
    where
        T: ShallowEq + 'static,
        S: Fn(&FormState) -> T + 'static,
        L: Fn(&T) + 'static,
    {
        self.inner
            .hub
            .subscribe_selector(&self.inner.state(), selector, listener)
    }

    /// Makes `values` the new baseline and the current values. All fields become clean.
    pub fn reset(&self, values: Value) -> FormResult<()> {
        let values = values_document(values).map_err(|found| FormError::NotContainer { found })?;
        check_keys(&values)?;
        let _guard = self.inner.guard()?;
        let state = self.inner.store.borrow_mut().reset(values);
        self.inner.hub.publish(&state);
        Ok(())
    }
}

/// One submission attempt, gated on the outcome of `latest`.
async fn run_submission(inner: Weak<Inner>, latest: Validation) -> FormResult<()> {
    if !latest.await? {
        debug!("form is invalid; skipping submit");
        return Ok(());
    }

    let pending = {
        let inner = inner.upgrade().ok_or(FormError::Detached)?;
        let state = inner.commit(|state| state.is_submitting = true)?;
        debug!("submitting");
        inner
            .on_submit
            .as_ref()
            .map(|handler| handler.submit(Rc::clone(&state.values)))
    };
    let outcome = match pending {
        Some(pending) => pending.await,
        None => Ok(()),
    };

    let inner = inner.upgrade().ok_or(FormError::Detached)?;
    inner.commit(|state| state.is_submitting = false)?;
    if let Err(err) = outcome {
        warn!(error = %err, "submit handler failed");
        return Err(FormError::submit(err));
    }
    debug!("submitted");
    Ok(())
}

/// One validation pass. Holds the form weakly so a dropped form does not linger.
async fn run_validation(
    inner: Weak<Inner>,
    token: ValidationToken,
    values: Rc<Value>,
    delay_ticks: usize,
) -> FormResult<bool> {
    Deferral::new(delay_ticks).await;

    let pending = {
        let inner = inner.upgrade().ok_or(FormError::Detached)?;
        if !inner.is_current(token) {
            return Ok(inner.state().is_valid);
        }
        match &inner.validator {
            Some(validator) => validator.validate(values),
            None => future::ready(Ok(inner.state().is_valid)).boxed_local(),
        }
    };
    let result = pending.await;

    let inner = inner.upgrade().ok_or(FormError::Detached)?;
    if !inner.is_current(token) {
        return Ok(inner.state().is_valid);
    }
    match result {
        Ok(is_valid) => {
            inner.commit(|state| {
                state.is_validating = false;
                state.is_valid = is_valid;
            })?;
            debug!(%token, is_valid, "validation committed");
            Ok(is_valid)
        }
        Err(err) => {
            warn!(%token, error = %err, "validate handler failed");
            inner.commit(|state| state.is_validating = false)?;
            Err(FormError::validate(err))
        }
    }
}
