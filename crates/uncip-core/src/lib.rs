//! Core types, store traits and access rules for UNCIP.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! The store backend and the HTTP layer both depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod access;
pub mod credentials;
pub mod error;
pub mod lifecycle;
pub mod principal;
pub mod record;
pub mod service;
pub mod store;
pub mod user;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
