//! Integration tests for the El Buen Sabor client core.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p buen-sabor-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_session` - Cart behavior driven through a real session tracker
//! - `cross_instance` - Several app instances sharing one store and bus
//!
//! Nothing here talks to a backend. Tokens are minted locally with the claim
//! layout the backend uses and are never signed.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rust_decimal::Decimal;
use serde_json::json;

use buen_sabor_client::{
    CartStore, InstanceId, JwtPayloadResolver, KeyValueStore, NotificationBus, ObservedStore,
    SessionTracker, StorageKeys,
};
use buen_sabor_core::{Product, ProductId, ProductKind};

/// Expiry far enough ahead that minted tokens never lapse during a run.
const FAR_FUTURE_EXP: i64 = 4_102_444_800;

/// Mint an unsigned token for a customer.
#[must_use]
pub fn customer_token(id: i32, name: &str, email: &str) -> String {
    token(&json!({
        "id": id,
        "nombre": name,
        "email": email,
        "rol": "CLIENTE",
        "activo": true,
        "exp": FAR_FUTURE_EXP,
    }))
}

/// Mint a token whose `exp` lies in the past.
#[must_use]
pub fn expired_token(id: i32) -> String {
    token(&json!({
        "id": id,
        "nombre": "Expired",
        "email": "expired@buensabor.com",
        "rol": "CLIENTE",
        "exp": 1_000_000_000,
    }))
}

/// Mint a token carrying arbitrary claims.
#[must_use]
pub fn token(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.dW5zaWduZWQ")
}

/// A product fixture.
#[must_use]
pub fn product(id: i32, kind: Option<ProductKind>, name: &str, price: i64) -> Product {
    Product::new(ProductId::new(id), kind, name, Decimal::from(price))
}

/// One running app instance: its own tracker and cart over shared storage.
pub struct Tab {
    pub origin: InstanceId,
    pub tracker: SessionTracker,
    pub cart: CartStore,
}

impl Tab {
    /// Open an instance over `storage`, announcing its writes on `bus`.
    ///
    /// Mirrors app startup: the cart is restored while the session is still
    /// loading, then the first check runs.
    #[must_use]
    pub fn open<S>(storage: S, bus: &NotificationBus) -> Self
    where
        S: KeyValueStore + 'static,
    {
        let keys = StorageKeys::default();
        let origin = InstanceId::new();
        let store: Arc<dyn KeyValueStore> =
            Arc::new(ObservedStore::new(storage, bus.clone(), origin));

        let mut tracker = SessionTracker::new(
            Arc::clone(&store),
            JwtPayloadResolver::default(),
            bus,
            keys.credential,
        )
        .with_origin(origin);
        let cart = CartStore::attach(store, keys.cart, &mut tracker);
        tracker.check();

        Self {
            origin,
            tracker,
            cart,
        }
    }

    /// Handle pending notifications from other instances.
    pub fn poll(&mut self) -> usize {
        self.tracker.process_notifications()
    }
}
