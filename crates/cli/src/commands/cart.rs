//! Cart commands.
//!
//! Every command except `show` changes the persisted cart and prints the
//! resulting contents.

use rust_decimal::Decimal;

use buen_sabor_core::{Product, ProductId, ProductKind};

use crate::app::App;

/// Print the cart.
#[allow(clippy::print_stdout)]
pub fn show(app: &App) {
    let cart = &app.cart;
    if !app.tracker.is_authenticated() {
        println!("Not logged in: the cart is unavailable.");
        return;
    }
    if cart.is_empty() {
        println!("The cart is empty.");
        return;
    }

    for item in cart.items() {
        let kind = item
            .product
            .kind
            .map_or_else(|| "-".to_string(), |kind| kind.to_string());
        println!(
            "{:>5}  {:<13} {:<30} {:>4} x {:>10} = {:>10}",
            item.product.id.to_string(),
            kind,
            item.product.name,
            item.quantity,
            item.product.price.to_string(),
            item.subtotal().to_string()
        );
    }
    println!(
        "{} item(s), total {}",
        cart.total_items(),
        cart.total_price()
    );
}

/// Add one unit of a product.
pub fn add(
    app: &mut App,
    id: ProductId,
    kind: Option<ProductKind>,
    name: String,
    price: Decimal,
    image_url: Option<String>,
) {
    let mut product = Product::new(id, kind, name, price);
    product.image_url = image_url;

    if app.cart.add(product, true) {
        show(app);
    }
}

/// Remove a product, or every kind of it when `kind` is `None`.
pub fn remove(app: &mut App, id: ProductId, kind: Option<ProductKind>) {
    app.cart.remove(id, kind);
    show(app);
}

/// Set the quantity of a product.
pub fn set(app: &mut App, id: ProductId, quantity: i64, kind: Option<ProductKind>) {
    app.cart.set_quantity(id, quantity, kind);
    show(app);
}

/// Empty the cart.
pub fn clear(app: &mut App) {
    app.cart.clear();
    show(app);
}
