//! Auth session: drives [`AuthState`] from the identity provider.
//!
//! LIFECYCLE
//! =========
//! `mount` registers one `auth` hub listener and starts a user fetch.
//! A `signIn` event sets the re-fetch trigger and fetches again.
//! `teardown` disposes the listener and bumps the mount epoch.
//!
//! Every fetch captures `(epoch, fetch_seq)`. Its result is applied only
//! while the session is mounted and both values are unchanged, so results
//! from a previous mount, or from a fetch a newer one superseded, are dropped.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use futures::task::{LocalSpawn, LocalSpawnExt};
use leptos::logging::{error, log, warn};

use super::auth::{AuthAction, AuthState, reduce};
use crate::identity::hub::{AUTH_CHANNEL, Hub, HubPayload, ListenerHandle, SIGN_IN};
use crate::identity::{IdentityError, IdentityProvider};

type Sink = Rc<dyn Fn(&AuthState)>;

#[derive(Default)]
struct SessionCell {
    state: AuthState,
    epoch: u64,
    fetch_seq: u64,
    mounted: bool,
    refetch_trigger: bool,
    listener: Option<ListenerHandle>,
    sink: Option<Sink>,
}

struct SessionShared {
    provider: Rc<dyn IdentityProvider>,
    hub: Hub,
    spawner: Rc<dyn LocalSpawn>,
    cell: RefCell<SessionCell>,
}

/// Cloning shares the session.
#[derive(Clone)]
pub struct AuthSession {
    shared: Rc<SessionShared>,
}

impl AuthSession {
    pub fn new(provider: Rc<dyn IdentityProvider>, hub: Hub, spawner: Rc<dyn LocalSpawn>) -> Self {
        Self {
            shared: Rc::new(SessionShared { provider, hub, spawner, cell: RefCell::new(SessionCell::default()) }),
        }
    }

    /// Call `sink` with the new state after every transition.
    pub fn on_change(&self, sink: impl Fn(&AuthState) + 'static) {
        self.shared.cell.borrow_mut().sink = Some(Rc::new(sink));
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        self.shared.cell.borrow().state.clone()
    }

    #[must_use]
    pub fn refetch_trigger(&self) -> bool {
        self.shared.cell.borrow().refetch_trigger
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.shared.cell.borrow().mounted
    }

    /// Register the hub listener and fetch the current user. Mounting an
    /// already mounted session does nothing.
    pub fn mount(&self) {
        if self.is_mounted() {
            return;
        }
        let weak: Weak<SessionShared> = Rc::downgrade(&self.shared);
        let listener = self.shared.hub.listen(AUTH_CHANNEL, move |payload| {
            if let Some(shared) = weak.upgrade() {
                AuthSession { shared }.on_auth_event(payload);
            }
        });
        {
            let mut cell = self.shared.cell.borrow_mut();
            cell.mounted = true;
            cell.listener = Some(listener);
        }
        self.initialize();
    }

    /// Fetch the current user, replacing any fetch still in flight.
    pub fn initialize(&self) {
        let (epoch, seq) = {
            let mut cell = self.shared.cell.borrow_mut();
            if !cell.mounted {
                return;
            }
            cell.fetch_seq += 1;
            (cell.epoch, cell.fetch_seq)
        };
        self.dispatch(AuthAction::FetchInit);

        let session = self.clone();
        let fetch = async move {
            let result = session.shared.provider.current_authenticated_user().await;
            if !session.is_current(epoch, Some(seq)) {
                return;
            }
            let action = match result {
                Ok(Some(user)) => AuthAction::FetchSuccess(user),
                Ok(None) => AuthAction::FetchEmpty,
                Err(e) => {
                    warn!("current user unavailable: {e}");
                    AuthAction::FetchFailure
                }
            };
            session.dispatch(action);
        };
        if let Err(e) = self.shared.spawner.spawn_local(fetch) {
            error!("could not start user fetch: {e}");
        }
    }

    /// Sign out through the provider, then clear the user.
    ///
    /// # Errors
    ///
    /// Returns the provider's error; the state is left unchanged.
    pub async fn sign_out(&self) -> Result<(), IdentityError> {
        let epoch = self.shared.cell.borrow().epoch;
        log!("signed out");
        if let Err(e) = self.shared.provider.sign_out().await {
            error!("Error signing out user {e}");
            return Err(e);
        }
        if self.is_current(epoch, None) {
            {
                let mut cell = self.shared.cell.borrow_mut();
                cell.refetch_trigger = false;
                // A fetch started before sign-out must not restore the user.
                cell.fetch_seq += 1;
            }
            self.dispatch(AuthAction::Reset);
        }
        Ok(())
    }

    /// Start redirect-based sign-in.
    ///
    /// # Errors
    ///
    /// Returns the provider's error, e.g. when sign-in is not configured.
    pub fn federated_sign_in(&self) -> Result<(), IdentityError> {
        self.shared
            .provider
            .federated_sign_in()
            .inspect_err(|e| error!("Error starting sign in {e}"))
    }

    /// Dispose the hub listener and drop any in-flight results.
    pub fn teardown(&self) {
        let listener = {
            let mut cell = self.shared.cell.borrow_mut();
            cell.mounted = false;
            cell.epoch += 1;
            cell.listener.take()
        };
        if let Some(listener) = listener {
            listener.remove();
        }
    }

    fn on_auth_event(&self, payload: &HubPayload) {
        if payload.event != SIGN_IN || !self.is_mounted() {
            return;
        }
        self.shared.cell.borrow_mut().refetch_trigger = true;
        log!("signed in");
        self.initialize();
    }

    fn is_current(&self, epoch: u64, seq: Option<u64>) -> bool {
        let cell = self.shared.cell.borrow();
        cell.mounted && cell.epoch == epoch && seq.is_none_or(|seq| seq == cell.fetch_seq)
    }

    fn dispatch(&self, action: AuthAction) {
        let (next, sink) = {
            let mut cell = self.shared.cell.borrow_mut();
            let next = reduce(&cell.state, action);
            cell.state = next.clone();
            (next, cell.sink.clone())
        };
        if let Some(sink) = sink {
            sink(&next);
        }
    }
}
