//! GTM Shop storefront library.
//!
//! Client core of the GTM Shop storefront: the persisted shopping cart,
//! product catalog, and the collaborators behind accounts, orders, and
//! payments. Front ends build an [`state::AppState`] once and drive it.
//!
//! # Architecture
//!
//! - [`cart`] - Cart store with asynchronous, ordered persistence
//! - [`storage`] - Key-value slots (file-backed, in-memory)
//! - [`catalog`] - Bundled product data
//! - [`supabase`] - Hosted backend (auth, REST tables, edge functions)
//! - [`db`] - Typed repositories over the remote store
//! - [`services`] - Auth, checkout, payment, and profile flows

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod storage;
pub mod supabase;
pub mod telemetry;
