//! Integration tests for several app instances sharing storage.
//!
//! Each [`Tab`] has its own tracker and cart and announces its writes on a
//! shared bus, the way browser tabs share local storage.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use buen_sabor_client::{KeyValueStore, MemoryStore, NotificationBus, SessionPhase};
use buen_sabor_core::{ProductKind, UserRole};
use buen_sabor_integration_tests::{Tab, customer_token, product, token};

#[test]
fn test_login_in_one_tab_reaches_the_other() {
    let shared = Arc::new(MemoryStore::new());
    let bus = NotificationBus::new(16);
    let mut first = Tab::open(Arc::clone(&shared), &bus);
    let mut second = Tab::open(Arc::clone(&shared), &bus);
    assert_eq!(second.tracker.phase(), SessionPhase::Unauthenticated);

    first
        .tracker
        .login(&customer_token(12, "Lucía Gómez", "lucia@buensabor.com"))
        .unwrap();

    assert!(second.poll() > 0);
    assert!(second.tracker.is_authenticated());
    assert_eq!(
        second.tracker.identity().unwrap().email.as_str(),
        "lucia@buensabor.com"
    );
    assert!(second.cart.add(product(1, None, "Pizza", 10), false));
}

#[test]
fn test_logout_in_one_tab_empties_the_other() {
    let shared = Arc::new(MemoryStore::new());
    let bus = NotificationBus::default();
    let mut first = Tab::open(Arc::clone(&shared), &bus);
    let mut second = Tab::open(Arc::clone(&shared), &bus);

    first
        .tracker
        .login(&customer_token(12, "Lucía Gómez", "lucia@buensabor.com"))
        .unwrap();
    second.poll();
    second.cart.add(product(1, Some(ProductKind::Manufactured), "Pizza", 10), false);
    assert_eq!(second.cart.total_items(), 1);

    first.tracker.logout();
    first.poll();
    second.poll();

    assert!(!second.tracker.is_authenticated());
    assert!(second.cart.items().is_empty());
    assert!(!second.cart.add(product(2, None, "Flan", 2500), false));
    assert_eq!(shared.get("cart").unwrap(), None);
}

#[test]
fn test_cart_writes_do_not_trigger_session_checks() {
    let shared = Arc::new(MemoryStore::new());
    let bus = NotificationBus::default();
    let mut first = Tab::open(Arc::clone(&shared), &bus);
    let mut second = Tab::open(Arc::clone(&shared), &bus);

    first
        .tracker
        .login(&customer_token(12, "Lucía Gómez", "lucia@buensabor.com"))
        .unwrap();
    first.poll();
    second.poll();

    first.cart.add(product(1, None, "Pizza", 10), false);
    first.cart.clear();

    assert_eq!(second.poll(), 0);
    assert_eq!(first.poll(), 0);
}

#[test]
fn test_token_swapped_by_another_tab_changes_identity() {
    let shared = Arc::new(MemoryStore::new());
    let bus = NotificationBus::default();
    let mut first = Tab::open(Arc::clone(&shared), &bus);
    let mut second = Tab::open(Arc::clone(&shared), &bus);

    first
        .tracker
        .login(&customer_token(12, "Lucía Gómez", "lucia@buensabor.com"))
        .unwrap();
    second.poll();

    let cook = token(&serde_json::json!({
        "id": 30,
        "nombre": "Marcos",
        "email": "cocina@buensabor.com",
        "rol": "COCINERO",
    }));
    second.tracker.login(&cook).unwrap();
    first.poll();

    let identity = first.tracker.identity().unwrap();
    assert_eq!(identity.role, UserRole::Cook);
    assert!(identity.role.is_staff());
    assert_ne!(first.origin, second.origin);
}

#[test]
fn test_lagged_subscription_still_rechecks() {
    let shared = Arc::new(MemoryStore::new());
    let bus = NotificationBus::new(1);
    let mut first = Tab::open(Arc::clone(&shared), &bus);
    let mut second = Tab::open(Arc::clone(&shared), &bus);

    first
        .tracker
        .login(&customer_token(12, "Lucía Gómez", "lucia@buensabor.com"))
        .unwrap();
    // Overflow the second tab's queue
    for id in 0..4 {
        first.cart.add(product(id, None, "Pizza", 10), false);
    }

    assert!(second.poll() > 0);
    assert!(second.tracker.is_authenticated());
}
