//! El Buen Sabor client core.
//!
//! The two stateful pieces of the ordering client live here:
//!
//! - [`session::SessionTracker`] works out who is logged in from the persisted
//!   credential and tells observers when that changes.
//! - [`cart::CartStore`] holds the basket, persists it after every change and
//!   refuses to change it while nobody is logged in.
//!
//! Both are plain values built once by the application and handed to whoever
//! needs them. They talk to the outside through three seams: a
//! [`storage::KeyValueStore`], an [`identity::IdentityResolver`] and the
//! [`bus::NotificationBus`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod bus;
pub mod cart;
pub mod config;
pub mod credential;
pub mod error;
pub mod identity;
pub mod session;
pub mod storage;

pub use bus::{InstanceId, Notification, NotificationBus};
pub use cart::{BlockedNotifier, CartStore, LogNotifier};
pub use config::{ClientConfig, StorageKeys};
pub use credential::Credential;
pub use error::{ClientError, Result};
pub use identity::{IdentityResolver, JwtPayloadResolver, ResolveError};
pub use session::{SessionPhase, SessionSnapshot, SessionTracker, SignOutObserver};
pub use storage::{FileStore, KeyValueStore, MemoryStore, ObservedStore, StorageError};
