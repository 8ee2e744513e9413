//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Environment variables are read by the binaries only; the helpers
//! here take the raw optional values so they can be exercised without touching process state.

use crate::constants::{DEFAULT_STORAGE_NAMESPACE, MAX_NAMESPACE_LEN};
use crate::error::{StoreError, StoreResult};
use std::path::{Path, PathBuf};

/// Whether calendar event status changes are checked against a transition table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusTransitions {
    /// Any status may replace any other.
    #[default]
    Unrestricted,
    /// Only the transitions listed in `EventStatus::can_transition_to` are accepted.
    Enforced,
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    storage_namespace: String,
    sample_data_enabled: bool,
    status_transitions: StatusTransitions,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidInput` if the namespace is not safe for use as a key prefix.
    pub fn new(data_dir: PathBuf, storage_namespace: impl Into<String>) -> StoreResult<Self> {
        let storage_namespace = storage_namespace.into();
        validate_namespace(&storage_namespace)?;

        Ok(Self {
            data_dir,
            storage_namespace,
            sample_data_enabled: false,
            status_transitions: StatusTransitions::Unrestricted,
        })
    }

    /// Enables or disables seeding of sample data.
    pub fn with_sample_data(mut self, enabled: bool) -> Self {
        self.sample_data_enabled = enabled;
        self
    }

    /// Sets the calendar event status transition policy.
    pub fn with_status_transitions(mut self, policy: StatusTransitions) -> Self {
        self.status_transitions = policy;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn storage_namespace(&self) -> &str {
        &self.storage_namespace
    }

    pub fn sample_data_enabled(&self) -> bool {
        self.sample_data_enabled
    }

    pub fn status_transitions(&self) -> StatusTransitions {
        self.status_transitions
    }
}

/// Validates that a namespace string is safe to prefix onto storage keys.
///
/// Keys double as file names in the file-backed store, so the namespace is restricted to a
/// conservative ASCII set.
pub fn validate_namespace(namespace: &str) -> StoreResult<()> {
    if namespace.trim().is_empty() {
        return Err(StoreError::InvalidInput(
            "storage namespace cannot be empty".into(),
        ));
    }

    if namespace.len() > MAX_NAMESPACE_LEN {
        return Err(StoreError::InvalidInput(format!(
            "storage namespace exceeds maximum length of {} characters",
            MAX_NAMESPACE_LEN
        )));
    }

    let ok = namespace
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'-' | b'_'));

    if !ok {
        return Err(StoreError::InvalidInput(
            "storage namespace contains invalid characters (only alphanumeric, '-', '_' allowed)"
                .into(),
        ));
    }

    Ok(())
}

/// Resolve the storage namespace from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default namespace.
pub fn namespace_from_env_value(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_STORAGE_NAMESPACE.to_string())
}

/// Parse a boolean flag from an optional string value.
///
/// `true`, `1`, `yes` and `on` (any case) are truthy; everything else, including `None`, is false.
pub fn flag_from_env_value(value: Option<String>) -> bool {
    value
        .map(|v| v.trim().to_ascii_lowercase())
        .is_some_and(|v| matches!(v.as_str(), "true" | "1" | "yes" | "on"))
}

/// Parse the status transition policy from an optional flag value.
pub fn status_transitions_from_env_value(value: Option<String>) -> StatusTransitions {
    if flag_from_env_value(value) {
        StatusTransitions::Enforced
    } else {
        StatusTransitions::Unrestricted
    }
}
