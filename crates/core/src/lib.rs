//! El Buen Sabor Core - Shared domain types.
//!
//! This crate provides the types shared by the client components:
//! - `client` - Session tracking and the shopping cart
//! - `cli` - Command-line driver over a file-backed store
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage, no HTTP clients.
//! Everything here is plain data that serializes the way the backend and the
//! persisted cart blob expect it.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, products, line items and user identities

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
