//! Inbox Sort: deterministic rule-based email classification.

pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod rules;

pub use error::{Error, Result};
