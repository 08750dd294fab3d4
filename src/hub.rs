// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Delivery of committed snapshots to subscribers.

use crate::{FormState, ShallowEq};
use std::{
    cell::RefCell,
    collections::BTreeMap,
    fmt,
    rc::{Rc, Weak},
};

type Callback = Rc<dyn Fn(&Rc<FormState>)>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    callbacks: BTreeMap<u64, Callback>,
}

/// Invokes every registered callback, in registration order, on each publication.
///
/// Callbacks may subscribe and unsubscribe while being notified; such changes take effect from
/// the next publication.
#[derive(Clone, Default)]
pub struct NotificationHub {
    registry: Rc<RefCell<Registry>>,
}

impl fmt::Debug for NotificationHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationHub")
            .field("subscribers", &self.len())
            .finish()
    }
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: impl Fn(&Rc<FormState>) + 'static) -> Subscription {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.callbacks.insert(id, Rc::new(callback));
        Subscription {
            registry: Rc::downgrade(&self.registry),
            id: Some(id),
        }
    }

    /// Subscribes `listener` to a projection of the state.
    ///
    /// `selector` runs on every publication; `listener` only hears about projections that are
    /// not [`ShallowEq`] to the last one it was given (or to the projection of `current`, before
    /// the first delivery).
    pub fn subscribe_selector<T, S, L>(
        &self,
        current: &FormState,
        selector: S,
        listener: L,
    ) -> Subscription
    where
        T: ShallowEq + 'static,
        S: Fn(&FormState) -> T + 'static,
        L: Fn(&T) + 'static,
    {
        let last = RefCell::new(selector(current));
        self.subscribe(move |state| {
            let next = selector(state.as_ref());
            if last.borrow().shallow_eq(&next) {
                return;
            }
            listener(&next);
            last.replace(next);
        })
    }

    /// Hands `state` to every current subscriber.
    pub fn publish(&self, state: &Rc<FormState>) {
        let callbacks: Vec<Callback> = self.registry.borrow().callbacks.values().cloned().collect();
        for callback in callbacks {
            callback(state);
        }
    }

    pub fn len(&self) -> usize {
        self.registry.borrow().callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keeps a callback registered for as long as it lives.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    registry: Weak<RefCell<Registry>>,
    id: Option<u64>,
}

impl Subscription {
    /// Removes the callback now.
    pub fn unsubscribe(self) {}

    /// Keeps the callback registered until the hub itself goes away.
    pub fn detach(mut self) {
        self.id = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let (Some(id), Some(registry)) = (self.id.take(), self.registry.upgrade()) {
            registry.borrow_mut().callbacks.remove(&id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
