//! Session tracking.
//!
//! The [`SessionTracker`] is the single source of truth for who is logged in.
//! It derives everything from the credential in storage: no credential, or one
//! that does not resolve, means nobody is logged in. It re-derives on demand
//! and whenever the bus reports that the credential or the auth state changed.
//!
//! Observers (the cart, UI state) follow the tracker through a `watch`
//! channel of [`SessionSnapshot`]s. Work that must happen the moment the
//! session signs out registers a [`SignOutObserver`].

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use buen_sabor_core::Identity;

use crate::bus::{InstanceId, Notification, NotificationBus};
use crate::credential::Credential;
use crate::identity::IdentityResolver;
use crate::storage::{KeyValueStore, StorageError};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// The first check has not run yet.
    Loading,
    /// A stored credential resolved to an identity.
    Authenticated,
    /// No usable credential.
    Unauthenticated,
}

/// Published session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Current phase.
    pub phase: SessionPhase,
    /// The logged-in user, present exactly when `phase` is `Authenticated`.
    pub identity: Option<Identity>,
    /// How many times the session has settled into `Unauthenticated` from
    /// another phase. Observers compare it with the last value they saw to
    /// notice a sign-out even if a new login happened since.
    pub sign_out_epoch: u64,
}

impl SessionSnapshot {
    const fn loading() -> Self {
        Self {
            phase: SessionPhase::Loading,
            identity: None,
            sign_out_epoch: 0,
        }
    }

    /// Whether someone is logged in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.phase, SessionPhase::Authenticated)
    }

    /// Whether the first check is still pending.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self.phase, SessionPhase::Loading)
    }
}

/// Told when the session signs out.
///
/// Registered with [`SessionTracker::on_sign_out`] and called synchronously
/// from whatever tracker call caused the transition.
pub trait SignOutObserver: Send + Sync {
    /// The session settled into `Unauthenticated`; `sign_out_epoch` is the
    /// epoch it moved to.
    fn on_sign_out(&self, sign_out_epoch: u64);
}

impl<F> SignOutObserver for F
where
    F: Fn(u64) + Send + Sync,
{
    fn on_sign_out(&self, sign_out_epoch: u64) {
        self(sign_out_epoch);
    }
}

/// Tracks the logged-in user.
///
/// Created in [`SessionPhase::Loading`]; call [`SessionTracker::check`] once
/// at startup to resolve the stored credential.
pub struct SessionTracker {
    store: Arc<dyn KeyValueStore>,
    resolver: Box<dyn IdentityResolver>,
    bus: NotificationBus,
    notifications: broadcast::Receiver<Notification>,
    credential_key: String,
    origin: InstanceId,
    state: watch::Sender<SessionSnapshot>,
    sign_out_observers: Vec<Box<dyn SignOutObserver>>,
}

impl SessionTracker {
    /// Create a tracker reading the credential under `credential_key`.
    ///
    /// Subscribes to `bus` immediately, so notifications published from here
    /// on are seen by [`SessionTracker::process_notifications`]. The tracker
    /// gets a random [`InstanceId`]; use [`SessionTracker::with_origin`] when
    /// its storage is an [`ObservedStore`](crate::storage::ObservedStore) so
    /// its own writes are recognised.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        resolver: impl IdentityResolver + 'static,
        bus: &NotificationBus,
        credential_key: impl Into<String>,
    ) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::loading());
        Self {
            store,
            resolver: Box::new(resolver),
            bus: bus.clone(),
            notifications: bus.subscribe(),
            credential_key: credential_key.into(),
            origin: InstanceId::new(),
            state,
            sign_out_observers: Vec::new(),
        }
    }

    /// Set the instance this tracker belongs to.
    #[must_use]
    pub const fn with_origin(mut self, origin: InstanceId) -> Self {
        self.origin = origin;
        self
    }

    /// Register `observer` to run on every sign-out this tracker observes,
    /// including the first check finding no usable credential.
    pub fn on_sign_out(&mut self, observer: impl SignOutObserver + 'static) {
        self.sign_out_observers.push(Box::new(observer));
    }

    /// The instance this tracker belongs to.
    #[must_use]
    pub const fn origin(&self) -> InstanceId {
        self.origin
    }

    /// Re-derive the session from the stored credential.
    ///
    /// Never fails: a missing, unreadable or unresolvable credential means
    /// unauthenticated. Returns whether someone is logged in afterwards.
    #[instrument(skip(self), fields(origin = %self.origin))]
    pub fn check(&mut self) -> bool {
        let identity = self
            .read_credential()
            .and_then(|credential| match self.resolver.resolve(&credential) {
                Ok(identity) => Some(identity),
                Err(e) => {
                    warn!(error = %e, "Stored credential did not resolve");
                    None
                }
            });

        self.apply(identity);
        self.is_authenticated()
    }

    /// Re-run [`SessionTracker::check`], typically after a login elsewhere
    /// stored a new credential.
    pub fn refresh(&mut self) -> bool {
        self.check()
    }

    /// Drop the stored credential and sign out.
    ///
    /// Publishes [`Notification::AuthChanged`] so other trackers re-check.
    /// Nothing is sent to the backend.
    #[instrument(skip(self), fields(origin = %self.origin))]
    pub fn logout(&mut self) {
        if let Err(e) = self.store.remove(&self.credential_key) {
            warn!(error = %e, "Failed to remove stored credential");
        }
        self.apply(None);
        self.bus.auth_changed();
    }

    /// Store a credential obtained by a login flow and resolve it.
    ///
    /// Publishes [`Notification::AuthChanged`] after storing. Returns the
    /// resolved identity, or `None` if the token is blank or does not resolve.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential cannot be written.
    #[instrument(skip(self, token), fields(origin = %self.origin))]
    pub fn login(&mut self, token: &str) -> Result<Option<Identity>, StorageError> {
        let Some(credential) = Credential::new(token) else {
            debug!("Ignoring blank credential");
            return Ok(None);
        };

        self.store.set(&self.credential_key, credential.expose())?;
        self.bus.auth_changed();
        self.check();
        Ok(self.identity())
    }

    /// Drain pending bus notifications and re-check once if any concerned
    /// the session.
    ///
    /// Returns how many relevant notifications were seen. A lagged
    /// subscription counts as one, since the dropped messages may have been
    /// relevant.
    pub fn process_notifications(&mut self) -> usize {
        let mut relevant = 0;
        loop {
            match self.notifications.try_recv() {
                Ok(notification) => {
                    if self.is_relevant(&notification) {
                        relevant += 1;
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "Notification subscription lagged");
                    relevant += 1;
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }

        if relevant > 0 {
            debug!(relevant, "Re-checking session after notifications");
            self.check();
        }
        relevant
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.state.borrow().phase
    }

    /// The logged-in user.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity.clone()
    }

    /// Whether someone is logged in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Whether the first check is still pending.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    /// Follow session changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    fn is_relevant(&self, notification: &Notification) -> bool {
        match notification {
            Notification::AuthChanged => true,
            Notification::StorageChanged { key, origin } => {
                *key == self.credential_key && *origin != self.origin
            }
        }
    }

    fn read_credential(&self) -> Option<Credential> {
        match self.store.get(&self.credential_key) {
            Ok(Some(token)) => Credential::new(&token),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read stored credential");
                None
            }
        }
    }

    fn apply(&self, identity: Option<Identity>) {
        let phase = if identity.is_some() {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Unauthenticated
        };
        let user_id = identity.as_ref().map(|identity| identity.id);

        let mut previous = phase;
        let mut signed_out = None;
        self.state.send_if_modified(|snapshot| {
            previous = snapshot.phase;
            if previous != SessionPhase::Unauthenticated && phase == SessionPhase::Unauthenticated
            {
                snapshot.sign_out_epoch += 1;
                signed_out = Some(snapshot.sign_out_epoch);
            }
            let changed = previous != phase || snapshot.identity != identity;
            snapshot.phase = phase;
            snapshot.identity = identity;
            changed
        });

        if previous != phase {
            info!(from = ?previous, to = ?phase, user_id = ?user_id, "Session state changed");
        }

        if let Some(epoch) = signed_out {
            for observer in &self.sign_out_observers {
                observer.on_sign_out(epoch);
            }
        }
    }
}
