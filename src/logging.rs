//! Structured logging utilities for mock synthesis and dispatch.
//!
//! This module provides helper functions for consistent, structured logging
//! across the crate using the `tracing` crate, and a subscriber installer
//! for test binaries that want to see them.

use crate::MockError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable switching the installed subscriber to JSON output.
pub const JSON_ENV: &str = "DUMMY_MOCK_JSON";

/// Install a global subscriber writing to stderr. `RUST_LOG` takes
/// precedence over `default_directive`. Returns `false` when a subscriber
/// was already installed, so it is safe to call from every test.
pub fn init(default_directive: &str) -> bool {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive.to_string().into());

    if std::env::var(JSON_ENV).is_ok() {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true);

        tracing_subscriber::registry()
            .with(filter)
            .with(json_layer)
            .try_init()
            .is_ok()
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .is_ok()
    }
}

/// Log the start of a synthesis run.
pub fn log_synthesis_start(contract: &str, operations: usize) {
    tracing::debug!(contract, operations, "Synthesizing mock type");
}

/// Log an operation whose signature cannot be rendered.
pub fn log_operation_rejected(contract: &str, operation: &str, reason: &str) {
    tracing::warn!(contract, operation, reason, "Operation cannot be synthesized");
}

pub fn log_type_built(type_name: &str, operations: usize) {
    tracing::debug!(type_name, operations, "Mock type built");
}

/// Log a relative path root that is not a known crate and is assumed to be
/// a module in scope of the contract.
pub fn log_relative_root(type_name: &str, root: &str) {
    tracing::debug!(type_name, root, "Treating path root as a module in scope");
}

pub fn log_type_cache_hit(type_name: &str) {
    tracing::trace!(type_name, "Reusing cached mock type");
}

/// Log a backend rejecting a definition.
pub fn log_compile_failed(type_name: &str, diagnostics: usize) {
    tracing::error!(type_name, diagnostics, "Mock type build failed");
}

/// Log a mock instance being handed out for the first time.
pub fn log_instance_created(contract: &str, setups: usize) {
    tracing::info!(contract, setups, "Mock instance created");
}

pub fn log_build_failed(contract: &str, error: &MockError) {
    tracing::error!(contract, error = %error, "Mock instance could not be built");
}

/// Log a setup registration.
pub fn log_setup_registered(contract: &str, operation: &str, replaced: bool) {
    tracing::debug!(contract, operation, replaced, "Setup registered");
}

/// Log a call-time failure before it is raised to the caller.
pub fn log_dispatch_failed(type_name: &str, operation: &str, error: &MockError) {
    match error {
        MockError::UnconfiguredOperation(_) => {
            tracing::warn!(type_name, operation, "No setup found for mocked call")
        }
        _ => tracing::warn!(type_name, operation, error = %error, "Mocked call failed"),
    }
}

/// Log the generated source of a mock type being written to disk.
pub fn log_definition_dumped(type_name: &str, path: &str) {
    tracing::debug!(type_name, path, "Mock type source written");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init("dummy_mock=debug");
        assert!(!init("dummy_mock=debug"));
    }
}
