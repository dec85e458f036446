//! Core domain + application logic for the support ticket bot.
//!
//! This crate is intentionally framework-agnostic. Telegram lives behind the
//! notification port implemented in the adapter crate; the store never calls
//! back into the transport and only returns structured results.

pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod notify;
pub mod store;

pub use errors::{Error, Result};
