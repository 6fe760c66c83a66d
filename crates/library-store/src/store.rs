use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::rc::{Rc, Weak};

use chrono::Utc;
use serde_json::Value;

use crate::actions::{Action, ActionError};
use crate::middleware::Middleware;
use crate::reducer::reduce;
use crate::state::{AppState, StateKey, StateUpdate, StateValue};

/// Subscriber callback: `(new value, key, full state)`
///
/// Identity is the `Rc` allocation, so registering a clone of the same
/// listener twice under one key is a single registration.
pub type Listener = Rc<dyn Fn(StateValue<'_>, StateKey, &AppState) -> anyhow::Result<()>>;

#[derive(Default)]
struct Registry {
    listeners: HashMap<StateKey, Vec<Listener>>,
}

fn same_listener(a: &Listener, b: &Listener) -> bool {
    ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

impl Registry {
    fn add(&mut self, key: StateKey, listener: &Listener) {
        let listeners = self.listeners.entry(key).or_default();
        if !listeners.iter().any(|l| same_listener(l, listener)) {
            listeners.push(Rc::clone(listener));
        }
    }

    fn remove(&mut self, key: StateKey, listener: &Listener) {
        if let Some(listeners) = self.listeners.get_mut(&key) {
            listeners.retain(|l| !same_listener(l, listener));
            if listeners.is_empty() {
                self.listeners.remove(&key);
            }
        }
    }

    fn contains(&self, key: StateKey, listener: &Listener) -> bool {
        self.listeners
            .get(&key)
            .is_some_and(|listeners| listeners.iter().any(|l| same_listener(l, listener)))
    }

    fn snapshot(&self, key: StateKey) -> Vec<Listener> {
        self.listeners.get(&key).cloned().unwrap_or_default()
    }

    fn count(&self, key: StateKey) -> usize {
        self.listeners.get(&key).map_or(0, Vec::len)
    }
}

/// One key or an ordered list of keys
pub trait IntoStateKeys {
    fn into_state_keys(self) -> Vec<StateKey>;
}

impl IntoStateKeys for StateKey {
    fn into_state_keys(self) -> Vec<StateKey> {
        vec![self]
    }
}

impl<const N: usize> IntoStateKeys for [StateKey; N] {
    fn into_state_keys(self) -> Vec<StateKey> {
        self.to_vec()
    }
}

impl IntoStateKeys for &[StateKey] {
    fn into_state_keys(self) -> Vec<StateKey> {
        self.to_vec()
    }
}

impl IntoStateKeys for Vec<StateKey> {
    fn into_state_keys(self) -> Vec<StateKey> {
        self
    }
}

/// Handle returned by [`AppStore::subscribe`]
///
/// Dropping the handle keeps the subscription. It does not keep the store
/// alive; unsubscribing after the store is gone does nothing.
#[must_use = "keep the handle to be able to unsubscribe"]
pub struct Unsubscribe {
    registry: Weak<RefCell<Registry>>,
    listener: Listener,
    keys: Vec<StateKey>,
}

impl Unsubscribe {
    /// Remove the listener from the keys it was subscribed with
    ///
    /// Calling this more than once is a no-op.
    pub fn unsubscribe(&self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut registry = registry.borrow_mut();
        for key in &self.keys {
            registry.remove(*key, &self.listener);
        }
    }

    pub fn keys(&self) -> &[StateKey] {
        &self.keys
    }
}

/// AppStore - holds application state and notifies keyed subscribers
///
/// Single-threaded. Listeners and middleware may call back into the store.
pub struct AppStore {
    state: RefCell<AppState>,
    initial_state: AppState,
    registry: Rc<RefCell<Registry>>,
    middleware: RefCell<Vec<Box<dyn Middleware>>>,
}

impl Default for AppStore {
    fn default() -> Self {
        Self::new(AppState::default())
    }
}

impl AppStore {
    pub fn new(initial_state: AppState) -> Self {
        Self {
            state: RefCell::new(initial_state.clone()),
            initial_state,
            registry: Rc::default(),
            middleware: RefCell::new(Vec::new()),
        }
    }

    /// Add middleware to the store
    pub fn add_middleware(&self, middleware: impl Middleware + 'static) {
        self.middleware.borrow_mut().push(Box::new(middleware));
    }

    /// Shallow copy of the current state
    pub fn get_state(&self) -> AppState {
        self.state.borrow().clone()
    }

    /// Process an action through the middleware chain and reducer, then
    /// notify listeners of every key that changed
    pub fn dispatch(&self, action: Action) {
        log::debug!("Store action: {}", action.kind());

        let Some(action) = self.apply_middleware(action) else {
            log::debug!("Action consumed by middleware");
            return;
        };

        let previous = self.get_state();
        let next = reduce(previous.clone(), &action);
        self.commit(&previous, next);
    }

    /// Dispatch the JSON form of an action
    ///
    /// Malformed actions are logged and ignored; the state is left as is.
    pub fn dispatch_json(&self, value: Value) -> Result<(), ActionError> {
        match Action::from_json(value, Utc::now()) {
            Ok(action) => {
                self.dispatch(action);
                Ok(())
            }
            Err(e @ ActionError::UnknownType(_)) => {
                log::warn!("Ignoring action: {}", e);
                Err(e)
            }
            Err(e) => {
                log::error!("Invalid action dispatched: {}", e);
                Err(e)
            }
        }
    }

    /// Write a single key without going through middleware or the reducer
    ///
    /// Listeners are notified exactly as for a dispatch.
    pub fn set_state(&self, update: StateUpdate) {
        let previous = self.get_state();
        let next = previous.clone().apply(update);
        self.commit(&previous, next);
    }

    /// Register `listener` under one or more keys
    pub fn subscribe<F>(&self, keys: impl IntoStateKeys, listener: F) -> Unsubscribe
    where
        F: Fn(StateValue<'_>, StateKey, &AppState) -> anyhow::Result<()> + 'static,
    {
        let listener: Listener = Rc::new(listener);
        self.subscribe_listener(keys, listener)
    }

    /// Register an already shared listener; re-registering it under a key it
    /// already watches has no effect
    pub fn subscribe_listener(&self, keys: impl IntoStateKeys, listener: Listener) -> Unsubscribe {
        let keys = keys.into_state_keys();
        {
            let mut registry = self.registry.borrow_mut();
            for key in &keys {
                registry.add(*key, &listener);
            }
        }

        Unsubscribe {
            registry: Rc::downgrade(&self.registry),
            listener,
            keys,
        }
    }

    pub fn listener_count(&self, key: StateKey) -> usize {
        self.registry.borrow().count(key)
    }

    /// Restore the initial state; listeners and middleware are kept and
    /// nobody is notified
    pub fn reset(&self) {
        log::debug!("Store reset");
        *self.state.borrow_mut() = self.initial_state.clone();
    }

    fn apply_middleware(&self, action: Action) -> Option<Action> {
        // Detached while running, middleware may re-enter the store
        let mut chain = std::mem::take(&mut *self.middleware.borrow_mut());
        let state = self.get_state();

        let mut result = Some(action);
        for middleware in chain.iter_mut() {
            match result {
                Some(action) => result = middleware.handle(action, &state),
                None => break,
            }
        }

        let mut slot = self.middleware.borrow_mut();
        let added = std::mem::replace(&mut *slot, chain);
        slot.extend(added);

        result
    }

    fn commit(&self, previous: &AppState, next: AppState) {
        let changed = previous.changed_keys(&next);
        *self.state.borrow_mut() = next;

        for key in changed {
            self.notify(key);
        }
    }

    fn notify(&self, key: StateKey) {
        let listeners = self.registry.borrow().snapshot(key);

        for listener in listeners {
            // Skip listeners removed by an earlier callback in this round
            if !self.registry.borrow().contains(key, &listener) {
                continue;
            }

            let state = self.get_state();
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| listener(state.value(key), key, &state)));

            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::error!("Error in state subscriber for '{}': {:#}", key, e),
                Err(payload) => log::error!(
                    "State subscriber for '{}' panicked: {}",
                    key,
                    panic_message(payload.as_ref())
                ),
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
