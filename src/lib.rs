//! Test Ledger reporter library.
//!
//! Turns per-worker WebdriverIO JSON logs into a run report, submits it to
//! the Test Ledger API and uploads the run's screenshots and videos.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
