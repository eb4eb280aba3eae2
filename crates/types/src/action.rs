//! Typed boundary between the engine and action providers.
//!
//! An action provider performs one concrete side effect per invocation and
//! reports either a flat field map or a typed failure. The engine never
//! inspects how an action is implemented; it only consumes these types.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Flat field map returned by a successful action invocation.
pub type ResultFields = IndexMap<String, Value>;

/// Classifies why an action invocation failed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActionErrorKind {
    /// A resolved parameter was missing or had an unusable value.
    InvalidParameter,
    /// The host denied the permission the action needs.
    PermissionDenied,
    /// The capability's target (application, device, subsystem) is absent.
    Unavailable,
    /// The action did not complete within its own time budget.
    Timeout,
}

impl ActionErrorKind {
    /// Stable lowercase token used in reasons and logs.
    pub fn token(self) -> &'static str {
        match self {
            ActionErrorKind::InvalidParameter => "invalid_parameter",
            ActionErrorKind::PermissionDenied => "permission_denied",
            ActionErrorKind::Unavailable => "unavailable",
            ActionErrorKind::Timeout => "timeout",
        }
    }
}

impl std::fmt::Display for ActionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

/// Typed failure raised by an action provider.
///
/// Always local to the step that triggered the invocation; the engine
/// records it and moves on.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ActionError {
    /// Failure classification.
    pub kind: ActionErrorKind,
    /// Human-readable reason surfaced in the step report.
    pub message: String,
}

impl ActionError {
    /// Builds an error of the given kind.
    pub fn new(kind: ActionErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    /// Shorthand for an [`ActionErrorKind::Unavailable`] failure.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ActionErrorKind::Unavailable, message)
    }

    /// Shorthand for an [`ActionErrorKind::InvalidParameter`] failure.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(ActionErrorKind::InvalidParameter, message)
    }
}
