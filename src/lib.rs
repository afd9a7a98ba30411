//! PSN Gateway Library
//!
//! REST gateway over the PlayStation Network API. Each endpoint takes an
//! NPSSO credential in its JSON body, exchanges it for an authorization
//! context, calls one upstream operation and returns the result untouched.
//!
//! # Features
//!
//! - **Uniform endpoints**: one validate → authenticate → invoke → respond
//!   sequence, configured per route
//! - **Stateless**: credentials and tokens live for a single request
//! - **Pluggable upstream**: [`psn::PsnApi`] trait with an HTTPS implementation

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod psn;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => subscriber
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| Error::Internal(e.to_string())),
        _ => subscriber
            .with(fmt::layer())
            .try_init()
            .map_err(|e| Error::Internal(e.to_string())),
    }
}
