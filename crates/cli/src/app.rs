//! Wiring of the store, session tracker and cart for one CLI invocation.

use std::sync::Arc;

use buen_sabor_client::{
    CartStore, ClientConfig, FileStore, InstanceId, JwtPayloadResolver, KeyValueStore,
    NotificationBus, ObservedStore, SessionTracker,
};
use buen_sabor_core::Product;

use crate::telemetry;

/// Everything a command needs.
pub struct App {
    pub tracker: SessionTracker,
    pub cart: CartStore,
}

impl App {
    /// Build the client over the configured storage file and run the initial
    /// session check.
    pub fn open(config: &ClientConfig) -> Self {
        let bus = NotificationBus::new(config.bus_capacity);
        let origin = InstanceId::new();
        let store: Arc<dyn KeyValueStore> = Arc::new(ObservedStore::new(
            FileStore::new(config.storage_path.clone()),
            bus.clone(),
            origin,
        ));

        let mut tracker = SessionTracker::new(
            Arc::clone(&store),
            JwtPayloadResolver::new(config.token_leeway),
            &bus,
            config.keys.credential.clone(),
        )
        .with_origin(origin);

        // Must exist before the first check: a cart persisted under a
        // still-valid token survives it, any other is erased by it.
        let cart = CartStore::attach(store, config.keys.cart.clone(), &mut tracker)
            .with_notifier(print_login_hint);

        tracker.check();
        if let Some(identity) = tracker.identity() {
            telemetry::set_sentry_user(&identity);
        }

        tracing::debug!(storage = %config.storage_path.display(), %origin, "Client opened");
        Self { tracker, cart }
    }
}

#[allow(clippy::print_stdout)]
fn print_login_hint(product: &Product) {
    println!(
        "Log in to add \"{}\" to your cart: bs-cli login --token <TOKEN>",
        product.name
    );
}
