//! Core types for El Buen Sabor.
//!
//! This module provides type-safe wrappers for the domain concepts the cart
//! and session code pass around.

pub mod email;
pub mod id;
pub mod identity;
pub mod product;

pub use email::{Email, EmailError};
pub use id::*;
pub use identity::{Identity, UserRole};
pub use product::{LineItem, Product, ProductKey, ProductKind};
