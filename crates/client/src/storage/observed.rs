//! Store wrapper that announces its writes on the notification bus.

use tracing::debug;

use super::{KeyValueStore, StorageError};
use crate::bus::{InstanceId, Notification, NotificationBus};

/// Wraps a store and publishes [`Notification::StorageChanged`] after every
/// successful write or removal.
///
/// This stands in for the browser's storage event: give each instance its own
/// `ObservedStore` over shared inner storage, with its own [`InstanceId`], and
/// the other instances' trackers hear about credential changes.
#[derive(Debug)]
pub struct ObservedStore<S> {
    inner: S,
    bus: NotificationBus,
    origin: InstanceId,
}

impl<S: KeyValueStore> ObservedStore<S> {
    /// Wrap `inner`, tagging notifications with `origin`.
    pub const fn new(inner: S, bus: NotificationBus, origin: InstanceId) -> Self {
        Self { inner, bus, origin }
    }

    /// The instance this store reports writes as.
    #[must_use]
    pub const fn origin(&self) -> InstanceId {
        self.origin
    }

    /// The wrapped store.
    #[must_use]
    pub const fn inner(&self) -> &S {
        &self.inner
    }

    fn announce(&self, key: &str) {
        debug!(key, origin = %self.origin, "Storage changed");
        self.bus.publish(Notification::StorageChanged {
            key: key.to_string(),
            origin: self.origin,
        });
    }
}

impl<S: KeyValueStore> KeyValueStore for ObservedStore<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.set(key, value)?;
        self.announce(key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key)?;
        self.announce(key);
        Ok(())
    }
}
