//! Tally: multi-chain wallet balance queries with a terminal front end

pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod infrastructure;
pub mod logging;
pub mod store;
pub mod ui;
