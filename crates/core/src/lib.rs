//! Retrieval of one user's Slack messages, independent of transport and storage.

pub mod application;
pub mod domain;
pub mod error;
pub mod history;
pub mod ports;
pub mod retry;
pub mod search;
pub mod utils;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
