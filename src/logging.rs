// Announce Core - Audio clip library and announcement builder
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Logging System
//!
//! Structured logging through `tracing`. Library code only emits events;
//! binaries and tests call [`init_logging`] once to install a subscriber.
//!
//! Priority order for the filter (highest to lowest):
//! 1. `ANNOUNCE_LOG` environment variable (full `EnvFilter` syntax)
//! 2. The level passed to `init_logging`

use crate::error::{LibraryError, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Environment variable overriding the log filter
pub const LOG_ENV_VAR: &str = "ANNOUNCE_LOG";

/// Build the filter from the environment or the given level
fn build_env_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(directives) = std::env::var(LOG_ENV_VAR) {
        if !directives.trim().is_empty() {
            return EnvFilter::try_new(&directives).map_err(|e| {
                LibraryError::ConfigurationError(format!("Invalid {}: {}", LOG_ENV_VAR, e))
            });
        }
    }

    let level = level.trim().to_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" | "off" => Ok(EnvFilter::new(level)),
        other => Err(LibraryError::ConfigurationError(format!(
            "Invalid log level: {}. Must be one of: trace, debug, info, warn, error, off",
            other
        ))),
    }
}

/// Initialize the logging system
///
/// Events go to stderr so JSON printed on stdout stays machine-readable.
/// Calling this again after a subscriber is installed does nothing.
pub fn init_logging(level: &str) -> Result<()> {
    let filter = build_env_filter(level)?;

    let installed = Registry::default()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .try_init();

    if installed.is_err() {
        tracing::debug!("logging already initialized");
    }
    Ok(())
}
