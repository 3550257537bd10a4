//! Products and cart line items.
//!
//! A product is identified by its ID together with its kind: the backend keeps
//! separate ID sequences for manufactured dishes, inventory goods and
//! promotions, so `(7, Manufactured)` and `(7, Inventory)` are different things.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ProductId;

/// Category of a purchasable product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    /// A dish prepared in the kitchen.
    Manufactured,
    /// A resold good taken straight from inventory (drinks, packaged items).
    Inventory,
    /// A promotion bundling several products.
    Promotion,
}

impl ProductKind {
    /// The wire name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manufactured => "manufactured",
            Self::Inventory => "inventory",
            Self::Promotion => "promotion",
        }
    }
}

impl fmt::Display for ProductKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProductKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manufactured" => Ok(Self::Manufactured),
            "inventory" => Ok(Self::Inventory),
            "promotion" => Ok(Self::Promotion),
            other => Err(format!("invalid product kind: {other}")),
        }
    }
}

/// A product as received from the catalog endpoints.
///
/// Only the fields the cart needs are typed. Everything else the backend sends
/// is kept in [`Product::extra`] so that a persisted cart reproduces the
/// original record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product ID, unique within its kind.
    pub id: ProductId,
    /// Product kind. Older records carry no kind at all.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ProductKind>,
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: Decimal,
    /// Image shown on cards and in the cart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Any other backend fields, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Product {
    /// Create a product with no image and no extra fields.
    #[must_use]
    pub fn new(
        id: ProductId,
        kind: Option<ProductKind>,
        name: impl Into<String>,
        price: Decimal,
    ) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            price,
            image_url: None,
            extra: Map::new(),
        }
    }

    /// The composite key identifying this product in a cart.
    #[must_use]
    pub const fn key(&self) -> ProductKey {
        ProductKey {
            id: self.id,
            kind: self.kind,
        }
    }
}

/// Composite `(id, kind)` key of a product.
///
/// Equality is exact, with a missing kind being a category of its own.
/// [`ProductKey::matches`] is the looser lookup used when a caller may leave the
/// kind out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProductKey {
    pub id: ProductId,
    pub kind: Option<ProductKind>,
}

impl ProductKey {
    /// Create a key.
    #[must_use]
    pub const fn new(id: ProductId, kind: Option<ProductKind>) -> Self {
        Self { id, kind }
    }

    /// Whether this key is selected by a lookup on `id` and an optional `kind`.
    ///
    /// When `kind` is `None` any kind matches, so `matches(5, None)` selects
    /// both `(5, Inventory)` and `(5, Promotion)`.
    #[must_use]
    pub fn matches(&self, id: ProductId, kind: Option<ProductKind>) -> bool {
        self.id == id && kind.is_none_or(|kind| self.kind == Some(kind))
    }
}

/// One product in the cart together with how many of it were added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product: Product,
    pub quantity: u32,
}

impl LineItem {
    /// Create a line item.
    #[must_use]
    pub const fn new(product: Product, quantity: u32) -> Self {
        Self { product, quantity }
    }

    /// The key of the product on this line.
    #[must_use]
    pub const fn key(&self) -> ProductKey {
        self.product.key()
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}
