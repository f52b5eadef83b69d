//! Infrastructure layer - External service integrations
//!
//! This layer contains:
//! - The HTTP client for the balance service
//! - Tokio runtime bridge for async operations

pub mod api;
pub mod runtime;

pub use api::{BalanceApi, HttpBalanceClient};
pub use runtime::{RuntimeBridge, RuntimeCommand, RuntimeEvent};
