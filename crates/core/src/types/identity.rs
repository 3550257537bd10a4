//! Logged-in user identity.

use serde::{Deserialize, Serialize};

use super::{Email, UserId};

/// Role of a user on the platform.
///
/// Serialized with the backend's role names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    /// Back-office administrator.
    #[serde(rename = "ADMIN")]
    Admin,
    /// Customer placing orders.
    #[serde(rename = "CLIENTE", alias = "CUSTOMER")]
    Customer,
    /// Kitchen staff.
    #[serde(rename = "COCINERO", alias = "COOK")]
    Cook,
    /// Cashier handling payments and invoices.
    #[serde(rename = "CAJERO", alias = "CASHIER")]
    Cashier,
    /// Delivery driver.
    #[serde(rename = "DELIVERY")]
    Delivery,
}

impl UserRole {
    /// Whether this role belongs to staff rather than a customer.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        !matches!(self, Self::Customer)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "ADMIN"),
            Self::Customer => write!(f, "CLIENTE"),
            Self::Cook => write!(f, "COCINERO"),
            Self::Cashier => write!(f, "CAJERO"),
            Self::Delivery => write!(f, "DELIVERY"),
        }
    }
}

/// The user a stored credential resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// User's backend ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: Email,
    /// Platform role.
    pub role: UserRole,
    /// Contact phone, if the user gave one.
    pub phone: Option<String>,
    /// Whether the account is enabled.
    pub active: bool,
    /// Whether the user still has to complete the first-login flow.
    pub first_login: bool,
}
