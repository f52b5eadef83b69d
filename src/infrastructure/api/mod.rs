//! Balance service access

mod client;
mod wire;

pub use client::{fetch_target, ApiError, BalanceApi, HttpBalanceClient, RetryPolicy};
