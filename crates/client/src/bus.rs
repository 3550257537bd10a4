//! Process-wide notification bus.
//!
//! Carries the two signals the session tracker reacts to: a storage key was
//! changed by some instance, and the authentication state was changed by
//! someone (logout, or a login flow that just stored a credential).

use std::fmt;

use tokio::sync::broadcast;
use uuid::Uuid;

/// Identifies one running client instance (one "tab").
///
/// Storage notifications are tagged with the instance that caused them so an
/// instance can skip its own writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(Uuid);

impl InstanceId {
    /// A fresh random instance ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A storage key was written or removed.
    StorageChanged {
        /// The key that changed.
        key: String,
        /// The instance that made the change.
        origin: InstanceId,
    },
    /// Authentication state changed and every tracker should re-check.
    AuthChanged,
}

/// Publish/subscribe channel for [`Notification`]s.
///
/// Cheap to clone; all clones publish to the same subscribers. Publishing
/// with no subscribers is not an error.
#[derive(Debug, Clone)]
pub struct NotificationBus {
    sender: broadcast::Sender<Notification>,
}

impl NotificationBus {
    /// Create a bus that queues up to `capacity` messages per subscriber.
    /// Slower subscribers lose the oldest messages and are told they lagged.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a notification to every current subscriber.
    pub fn publish(&self, notification: Notification) {
        tracing::trace!(?notification, "Publishing notification");
        // An error only means nobody is subscribed yet
        let _ = self.sender.send(notification);
    }

    /// Publish [`Notification::AuthChanged`].
    pub fn auth_changed(&self) {
        self.publish(Notification::AuthChanged);
    }

    /// Subscribe to notifications published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(64)
    }
}
