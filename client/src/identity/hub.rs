//! Named event channels for identity lifecycle notifications.
//!
//! A listener stays registered exactly as long as its [`ListenerHandle`]
//! lives; removing or dropping the handle is the only way to deregister.

#[cfg(test)]
#[path = "hub_test.rs"]
mod hub_test;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde_json::Value;

/// Channel carrying `signIn` / `signOut` / `signIn_failure` events.
pub const AUTH_CHANNEL: &str = "auth";

pub const SIGN_IN: &str = "signIn";
pub const SIGN_OUT: &str = "signOut";
pub const SIGN_IN_FAILURE: &str = "signIn_failure";

/// Event broadcast on a channel.
#[derive(Clone, Debug, PartialEq)]
pub struct HubPayload {
    pub event: String,
    pub data: Option<Value>,
    pub message: Option<String>,
}

impl HubPayload {
    #[must_use]
    pub fn new(event: impl Into<String>) -> Self {
        Self { event: event.into(), data: None, message: None }
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

type Callback = Rc<dyn Fn(&HubPayload)>;

struct Listener {
    id: u64,
    channel: String,
    callback: Callback,
}

#[derive(Default)]
struct HubInner {
    next_id: u64,
    listeners: Vec<Listener>,
}

/// Single-threaded event hub. Cloning shares the same listener set.
#[derive(Clone, Default)]
pub struct Hub {
    inner: Rc<RefCell<HubInner>>,
}

impl Hub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for events on `channel`.
    pub fn listen<F>(&self, channel: &str, callback: F) -> ListenerHandle
    where
        F: Fn(&HubPayload) + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.listeners.push(Listener { id, channel: channel.to_owned(), callback: Rc::new(callback) });
        ListenerHandle { hub: Rc::downgrade(&self.inner), id, active: true }
    }

    /// Deliver `payload` to every listener on `channel`, in registration order.
    ///
    /// Callbacks run after the listener set is released, so they may listen,
    /// remove handles, or dispatch again.
    pub fn dispatch(&self, channel: &str, payload: &HubPayload) {
        let callbacks: Vec<Callback> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .filter(|l| l.channel == channel)
            .map(|l| Rc::clone(&l.callback))
            .collect();
        for callback in callbacks {
            callback(payload);
        }
    }

    #[must_use]
    pub fn listener_count(&self, channel: &str) -> usize {
        self.inner
            .borrow()
            .listeners
            .iter()
            .filter(|l| l.channel == channel)
            .count()
    }
}

/// Registration returned by [`Hub::listen`].
pub struct ListenerHandle {
    hub: Weak<RefCell<HubInner>>,
    id: u64,
    active: bool,
}

impl ListenerHandle {
    /// Stop receiving events.
    pub fn remove(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(hub) = self.hub.upgrade() {
            hub.borrow_mut().listeners.retain(|l| l.id != self.id);
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerHandle").field("id", &self.id).field("active", &self.active).finish()
    }
}
