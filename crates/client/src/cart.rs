//! Shopping cart.
//!
//! The cart lives on the client only. It is tied to "someone is logged in",
//! not to a particular user: logging out empties it, logging back in starts
//! from an empty cart.
//!
//! # Matching products
//!
//! `add` identifies products by the exact `(id, kind)` key. `remove`,
//! `set_quantity` and `quantity_of` take the kind as optional and, when it is
//! left out, act on every entry with that ID whatever its kind. Callers that
//! know the kind should always pass it.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use buen_sabor_core::{LineItem, Product, ProductId, ProductKey, ProductKind};

use crate::session::{SessionPhase, SessionSnapshot, SessionTracker, SignOutObserver};
use crate::storage::KeyValueStore;

/// Told when an add is refused because nobody is logged in.
pub trait BlockedNotifier: Send + Sync {
    /// `product` could not be added.
    fn on_blocked(&self, product: &Product);
}

impl<F> BlockedNotifier for F
where
    F: Fn(&Product) + Send + Sync,
{
    fn on_blocked(&self, product: &Product) {
        self(product);
    }
}

/// Default notifier: logs the refusal.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl BlockedNotifier for LogNotifier {
    fn on_blocked(&self, product: &Product) {
        info!(
            product_id = %product.id,
            product = %product.name,
            "Log in to add products to the cart"
        );
    }
}

/// The shopping cart.
///
/// Every change is written straight through to storage under the cart key.
/// While nobody is logged in the cart reads as empty and ignores changes.
pub struct CartStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
    session: watch::Receiver<SessionSnapshot>,
    // Sign-out epoch the items belong to; `None` until it is known the items
    // were not left over from a signed-out session.
    seen_epoch: Option<u64>,
    items: Vec<LineItem>,
    notifier: Box<dyn BlockedNotifier>,
}

impl CartStore {
    /// Create the cart, restoring whatever was persisted under `key`.
    ///
    /// Unreadable or malformed data yields an empty cart. If the session is
    /// already signed out, the restored items are discarded on first use.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        key: impl Into<String>,
        session: watch::Receiver<SessionSnapshot>,
    ) -> Self {
        let key = key.into();
        let items = rehydrate(store.as_ref(), &key);

        let seen_epoch = {
            let snapshot = session.borrow();
            match snapshot.phase {
                SessionPhase::Unauthenticated => None,
                _ => Some(snapshot.sign_out_epoch),
            }
        };

        debug!(key = %key, items = items.len(), "Cart restored");
        Self {
            store,
            key,
            session,
            seen_epoch,
            items,
            notifier: Box::new(LogNotifier),
        }
    }

    /// Create the cart for `tracker`'s session.
    ///
    /// Like [`CartStore::new`], and also registers with the tracker so the
    /// persisted cart is erased the moment the session signs out, without
    /// waiting for the next cart call.
    pub fn attach(
        store: Arc<dyn KeyValueStore>,
        key: impl Into<String>,
        tracker: &mut SessionTracker,
    ) -> Self {
        let key = key.into();
        tracker.on_sign_out(PersistedCartEraser {
            store: Arc::clone(&store),
            key: key.clone(),
        });
        Self::new(store, key, tracker.subscribe())
    }

    /// Replace the notifier used when an add is refused.
    #[must_use]
    pub fn with_notifier(mut self, notifier: impl BlockedNotifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    /// Add one of `product`.
    ///
    /// Returns `false` without changing anything when nobody is logged in,
    /// after telling the notifier if `notify_if_blocked` is set.
    #[instrument(skip(self, product), fields(product_id = %product.id, kind = ?product.kind))]
    pub fn add(&mut self, product: Product, notify_if_blocked: bool) -> bool {
        self.sync_session();
        if !self.is_active() {
            debug!("Add refused, not logged in");
            if notify_if_blocked {
                self.notifier.on_blocked(&product);
            }
            return false;
        }

        let key = product.key();
        match self.items.iter_mut().find(|line| line.key() == key) {
            Some(line) => line.quantity = line.quantity.saturating_add(1),
            None => self.items.push(LineItem::new(product, 1)),
        }
        self.persist();
        true
    }

    /// Remove every entry for `id`, restricted to `kind` when given.
    ///
    /// Does nothing when nobody is logged in.
    #[instrument(skip(self))]
    pub fn remove(&mut self, id: ProductId, kind: Option<ProductKind>) {
        self.sync_session();
        if !self.is_active() {
            return;
        }

        let before = self.items.len();
        self.items.retain(|line| !line.key().matches(id, kind));
        if self.items.len() != before {
            self.persist();
        }
    }

    /// Set the quantity of every entry for `id` (restricted to `kind` when
    /// given). A quantity of zero or less removes them.
    ///
    /// Does nothing when nobody is logged in.
    #[instrument(skip(self))]
    pub fn set_quantity(&mut self, id: ProductId, quantity: i64, kind: Option<ProductKind>) {
        if quantity <= 0 {
            self.remove(id, kind);
            return;
        }

        self.sync_session();
        if !self.is_active() {
            return;
        }

        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        let mut changed = false;
        for line in self
            .items
            .iter_mut()
            .filter(|line| line.key().matches(id, kind))
        {
            line.quantity = quantity;
            changed = true;
        }
        if changed {
            self.persist();
        }
    }

    /// Quantity of the first entry for `id` (restricted to `kind` when given),
    /// or 0.
    #[must_use]
    pub fn quantity_of(&self, id: ProductId, kind: Option<ProductKind>) -> u32 {
        self.items()
            .iter()
            .find(|line| line.key().matches(id, kind))
            .map_or(0, |line| line.quantity)
    }

    /// Empty the cart, e.g. after an order was placed.
    ///
    /// Works whether or not someone is logged in.
    #[instrument(skip(self))]
    pub fn clear(&mut self) {
        self.items.clear();
        self.persist();
    }

    /// The entries, in the order they were first added. Empty while nobody is
    /// logged in.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        if self.is_active() {
            self.items.as_slice()
        } else {
            &[]
        }
    }

    /// Whether the cart reads as empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    /// Total number of units across all entries.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.items()
            .iter()
            .fold(0u32, |total, line| total.saturating_add(line.quantity))
    }

    /// Sum of all line subtotals.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.items().iter().map(LineItem::subtotal).sum()
    }

    /// Whether an entry with exactly this key exists.
    #[must_use]
    pub fn contains(&self, key: ProductKey) -> bool {
        self.items().iter().any(|line| line.key() == key)
    }

    /// Catch up with the session: if it signed out since the items were
    /// loaded, drop them and erase the persisted cart.
    ///
    /// Every mutating call does this first. Returns whether the cart was
    /// cleared.
    pub fn sync_session(&mut self) -> bool {
        let (phase_known, epoch) = {
            let snapshot = self.session.borrow_and_update();
            (!snapshot.is_loading(), snapshot.sign_out_epoch)
        };
        if !phase_known || self.seen_epoch == Some(epoch) {
            return false;
        }

        self.seen_epoch = Some(epoch);
        let dropped = self.items.len();
        self.items.clear();
        self.erase();
        info!(dropped, "Session signed out, cart cleared");
        true
    }

    /// Whether the session is logged in and the items belong to it.
    fn is_active(&self) -> bool {
        let snapshot = self.session.borrow();
        snapshot.is_authenticated() && self.seen_epoch == Some(snapshot.sign_out_epoch)
    }

    fn persist(&self) {
        match serde_json::to_string(&self.items) {
            Ok(json) => {
                if let Err(e) = self.store.set(&self.key, &json) {
                    error!(key = %self.key, error = %e, "Failed to persist cart");
                }
            }
            Err(e) => error!(error = %e, "Failed to serialize cart"),
        }
    }

    fn erase(&self) {
        if let Err(e) = self.store.remove(&self.key) {
            error!(key = %self.key, error = %e, "Failed to erase persisted cart");
        }
    }
}

/// Removes the persisted cart on sign-out. The in-memory items are hidden by
/// the epoch check and dropped on the cart's next sync.
struct PersistedCartEraser {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl SignOutObserver for PersistedCartEraser {
    fn on_sign_out(&self, sign_out_epoch: u64) {
        match self.store.remove(&self.key) {
            Ok(()) => debug!(key = %self.key, sign_out_epoch, "Persisted cart erased"),
            Err(e) => error!(key = %self.key, error = %e, "Failed to erase persisted cart"),
        }
    }
}

/// Load the persisted cart, falling back to empty on anything unexpected.
///
/// Entries with a zero quantity are dropped and repeated keys merged, so the
/// cart's invariants hold from the start.
fn rehydrate(store: &dyn KeyValueStore, key: &str) -> Vec<LineItem> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!(key, error = %e, "Failed to read persisted cart");
            return Vec::new();
        }
    };

    let stored: Vec<LineItem> = match serde_json::from_str(&raw) {
        Ok(stored) => stored,
        Err(e) => {
            warn!(key, error = %e, "Discarding malformed persisted cart");
            return Vec::new();
        }
    };

    let mut items: Vec<LineItem> = Vec::with_capacity(stored.len());
    for line in stored.into_iter().filter(|line| line.quantity > 0) {
        match items.iter_mut().find(|existing| existing.key() == line.key()) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(line.quantity);
            }
            None => items.push(line),
        }
    }
    items
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use buen_sabor_core::{Email, Identity, UserId, UserRole};

    use super::*;
    use crate::storage::MemoryStore;

    fn snapshot(phase: SessionPhase, sign_out_epoch: u64) -> SessionSnapshot {
        let identity = (phase == SessionPhase::Authenticated).then(|| Identity {
            id: UserId::new(1),
            name: "Lucía".to_string(),
            email: Email::parse("lucia@buensabor.com").unwrap(),
            role: UserRole::Customer,
            phone: None,
            active: true,
            first_login: false,
        });
        SessionSnapshot {
            phase,
            identity,
            sign_out_epoch,
        }
    }

    fn product(id: i32, kind: Option<ProductKind>, price: i64) -> Product {
        Product::new(ProductId::new(id), kind, format!("product {id}"), Decimal::new(price, 0))
    }

    struct Harness {
        store: Arc<MemoryStore>,
        session: watch::Sender<SessionSnapshot>,
        cart: CartStore,
    }

    fn harness(phase: SessionPhase) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let (session, rx) = watch::channel(snapshot(phase, 0));
        let cart = CartStore::new(store.clone(), "cart", rx);
        Harness {
            store,
            session,
            cart,
        }
    }

    fn persisted(store: &MemoryStore) -> Option<Vec<LineItem>> {
        store
            .get("cart")
            .unwrap()
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }

    #[test]
    fn test_add_increments_existing_key() {
        let mut h = harness(SessionPhase::Authenticated);
        let pizza = product(1, Some(ProductKind::Manufactured), 10);

        for _ in 0..3 {
            assert!(h.cart.add(pizza.clone(), true));
        }

        assert_eq!(h.cart.items().len(), 1);
        assert_eq!(h.cart.quantity_of(ProductId::new(1), Some(ProductKind::Manufactured)), 3);
        assert_eq!(h.cart.total_items(), 3);
        assert_eq!(h.cart.total_price(), Decimal::new(30, 0));
        assert_eq!(persisted(&h.store).unwrap(), h.cart.items());
    }

    #[test]
    fn test_add_keeps_kinds_apart() {
        let mut h = harness(SessionPhase::Authenticated);
        h.cart.add(product(7, Some(ProductKind::Manufactured), 10), true);
        h.cart.add(product(7, Some(ProductKind::Inventory), 2), true);
        h.cart.add(product(7, None, 1), true);

        assert_eq!(h.cart.items().len(), 3);
        assert!(h.cart.contains(ProductKey::new(ProductId::new(7), None)));
        // Untyped lookup finds the first entry with that id
        assert_eq!(h.cart.quantity_of(ProductId::new(7), None), 1);
        assert_eq!(h.cart.total_items(), 3);
    }

    #[test]
    fn test_blocked_add_notifies_when_asked() {
        let mut h = harness(SessionPhase::Unauthenticated);
        let prompts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&prompts);
        h.cart = h.cart.with_notifier(move |_: &Product| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!h.cart.add(product(1, None, 10), true));
        assert!(!h.cart.add(product(1, None, 10), false));

        assert_eq!(prompts.load(Ordering::SeqCst), 1);
        assert!(h.cart.is_empty());
        assert_eq!(h.cart.total_items(), 0);
        assert_eq!(persisted(&h.store), None);
    }

    #[test]
    fn test_set_quantity_zero_equals_remove() {
        let mut h = harness(SessionPhase::Authenticated);
        h.cart.add(product(1, Some(ProductKind::Manufactured), 10), true);
        h.cart.add(product(2, Some(ProductKind::Promotion), 25), true);

        h.cart.set_quantity(ProductId::new(1), 0, Some(ProductKind::Manufactured));
        h.cart.remove(ProductId::new(2), Some(ProductKind::Promotion));

        assert!(h.cart.is_empty());
        assert_eq!(persisted(&h.store).unwrap(), Vec::<LineItem>::new());
    }

    #[test]
    fn test_negative_quantity_removes() {
        let mut h = harness(SessionPhase::Authenticated);
        h.cart.add(product(1, None, 10), true);
        h.cart.set_quantity(ProductId::new(1), -4, None);
        assert!(h.cart.is_empty());
    }

    #[test]
    fn test_set_quantity_overwrites_matching_entries() {
        let mut h = harness(SessionPhase::Authenticated);
        h.cart.add(product(3, Some(ProductKind::Manufactured), 10), true);
        h.cart.add(product(3, Some(ProductKind::Inventory), 2), true);

        h.cart.set_quantity(ProductId::new(3), 4, Some(ProductKind::Inventory));
        assert_eq!(h.cart.quantity_of(ProductId::new(3), Some(ProductKind::Inventory)), 4);
        assert_eq!(h.cart.quantity_of(ProductId::new(3), Some(ProductKind::Manufactured)), 1);

        // Without a kind every entry for the id is updated
        h.cart.set_quantity(ProductId::new(3), 2, None);
        assert_eq!(h.cart.total_items(), 4);

        // Unknown ids change nothing
        h.cart.set_quantity(ProductId::new(99), 5, None);
        assert_eq!(h.cart.items().len(), 2);
    }

    #[test]
    fn test_remove_without_kind_matches_any_kind() {
        let mut h = harness(SessionPhase::Authenticated);
        h.cart.add(product(5, Some(ProductKind::Inventory), 3), true);
        h.cart.add(product(5, Some(ProductKind::Promotion), 9), true);
        h.cart.add(product(6, Some(ProductKind::Inventory), 1), true);

        h.cart.remove(ProductId::new(5), None);

        assert_eq!(h.cart.items().len(), 1);
        assert_eq!(h.cart.items()[0].product.id, ProductId::new(6));
    }

    #[test]
    fn test_mutations_ignored_while_signed_out() {
        let mut h = harness(SessionPhase::Authenticated);
        h.cart.add(product(1, None, 10), true);

        h.session.send_replace(snapshot(SessionPhase::Unauthenticated, 1));
        h.cart.set_quantity(ProductId::new(1), 5, None);
        h.cart.remove(ProductId::new(1), None);

        assert_eq!(h.cart.quantity_of(ProductId::new(1), None), 0);
        assert_eq!(h.cart.total_items(), 0);
    }

    #[test]
    fn test_sign_out_clears_and_login_does_not_restore() {
        let mut h = harness(SessionPhase::Authenticated);
        h.cart.add(product(1, None, 10), true);
        h.cart.add(product(2, None, 5), true);

        h.session.send_replace(snapshot(SessionPhase::Unauthenticated, 1));
        // Reads hide the items before the sign-out is processed
        assert!(h.cart.is_empty());
        assert!(h.cart.sync_session());
        assert_eq!(persisted(&h.store), None);

        h.session.send_replace(snapshot(SessionPhase::Authenticated, 1));
        assert!(!h.cart.sync_session());
        assert!(h.cart.is_empty());
    }

    #[test]
    fn test_missed_sign_out_is_still_applied() {
        let mut h = harness(SessionPhase::Authenticated);
        h.cart.add(product(1, None, 10), true);

        // Signed out and back in before the cart looked
        h.session.send_replace(snapshot(SessionPhase::Unauthenticated, 1));
        h.session.send_replace(snapshot(SessionPhase::Authenticated, 1));

        assert!(h.cart.is_empty());
        assert!(h.cart.add(product(2, None, 5), true));
        assert_eq!(h.cart.items().len(), 1);
        assert_eq!(h.cart.quantity_of(ProductId::new(1), None), 0);
    }

    #[test]
    fn test_clear_is_unconditional_and_persists_empty_list() {
        let mut h = harness(SessionPhase::Authenticated);
        h.cart.add(product(1, None, 10), true);
        h.cart.set_quantity(ProductId::new(1), 3, None);
        h.cart.add(product(2, None, 5), true);
        assert_eq!(h.cart.total_items(), 4);

        h.cart.clear();
        assert!(h.cart.is_empty());
        assert_eq!(h.store.get("cart").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_rehydrates_and_normalizes() {
        let store = Arc::new(MemoryStore::new());
        let a = product(1, Some(ProductKind::Manufactured), 10);
        let b = product(2, None, 4);
        let stored = vec![
            LineItem::new(a.clone(), 2),
            LineItem::new(b, 0),
            LineItem::new(a.clone(), 1),
        ];
        store
            .set("cart", &serde_json::to_string(&stored).unwrap())
            .unwrap();

        let (_session, rx) = watch::channel(snapshot(SessionPhase::Authenticated, 0));
        let cart = CartStore::new(store, "cart", rx);
        assert_eq!(cart.items(), &[LineItem::new(a, 3)]);
    }

    #[test]
    fn test_malformed_blob_yields_empty_cart() {
        for raw in ["{not json", "{\"product\": 1}", "[{\"quantity\": -1}]"] {
            let store = Arc::new(MemoryStore::new());
            store.set("cart", raw).unwrap();

            let (_session, rx) = watch::channel(snapshot(SessionPhase::Authenticated, 0));
            let cart = CartStore::new(store, "cart", rx);
            assert!(cart.is_empty(), "blob {raw:?} should give an empty cart");
        }
    }

    #[test]
    fn test_leftover_cart_from_signed_out_session_is_discarded() {
        let store = Arc::new(MemoryStore::new());
        let stored = vec![LineItem::new(product(1, None, 10), 2)];
        store
            .set("cart", &serde_json::to_string(&stored).unwrap())
            .unwrap();

        let (session, rx) = watch::channel(snapshot(SessionPhase::Unauthenticated, 1));
        let mut cart = CartStore::new(store.clone(), "cart", rx);

        session.send_replace(snapshot(SessionPhase::Authenticated, 1));
        assert!(cart.is_empty());
        assert!(cart.sync_session());
        assert_eq!(store.get("cart").unwrap(), None);
    }

    #[test]
    fn test_loading_session_keeps_restored_items() {
        let store = Arc::new(MemoryStore::new());
        let stored = vec![LineItem::new(product(1, None, 10), 2)];
        store
            .set("cart", &serde_json::to_string(&stored).unwrap())
            .unwrap();

        let (session, rx) = watch::channel(snapshot(SessionPhase::Loading, 0));
        let mut cart = CartStore::new(store, "cart", rx);
        assert!(cart.is_empty());
        assert!(!cart.sync_session());

        session.send_replace(snapshot(SessionPhase::Authenticated, 0));
        assert_eq!(cart.total_items(), 2);
    }

    #[test]
    fn test_attached_cart_is_erased_by_logout_alone() {
        use crate::bus::NotificationBus;
        use crate::credential::Credential;
        use crate::identity::ResolveError;

        let store = Arc::new(MemoryStore::new());
        store.set("token", "valid").unwrap();
        let resolver = |credential: &Credential| -> Result<Identity, ResolveError> {
            if credential.expose() == "valid" {
                Ok(snapshot(SessionPhase::Authenticated, 0).identity.unwrap())
            } else {
                Err(ResolveError::Malformed)
            }
        };
        let mut tracker = SessionTracker::new(
            store.clone(),
            resolver,
            &NotificationBus::default(),
            "token",
        );
        let mut cart = CartStore::attach(store.clone(), "cart", &mut tracker);
        tracker.check();

        assert!(cart.add(product(1, Some(ProductKind::Manufactured), 10), false));
        assert!(store.get("cart").unwrap().is_some());

        tracker.logout();

        assert_eq!(store.get("cart").unwrap(), None);
        assert!(cart.items().is_empty());
        assert_eq!(cart.total_items(), 0);
    }
}
