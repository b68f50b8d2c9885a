//! Error types for the kingdom simulation.
//!
//! Every public transition has a fallible `try_*` form returning [`Result`]
//! and an infallible form that logs the error through [`recover`] and hands
//! back the input state unchanged. A single bad call must never take down the
//! host's frame loop.

use std::fmt;

use thiserror::Error;

use crate::state::GameState;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Coarse classification of an error, used as a structured logging field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Bad or missing keys, malformed parameters.
    Validation,
    /// Arithmetic over invalid derived data.
    Calculation,
    /// A transition was refused by the current state.
    State,
}

impl ErrorCategory {
    /// Lower-case name used in log output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Calculation => "calculation",
            Self::State => "state",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error type for all simulation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GameError {
    /// The content tables failed validation.
    #[error("Invalid game configuration: {}", errors.join("; "))]
    InvalidConfig {
        /// Every problem found in the configuration.
        errors: Vec<String>,
    },

    /// Failed to parse a RON content file.
    #[error("Failed to parse config: {0}")]
    ConfigParse(String),

    /// A key does not name any entry in the relevant config table.
    #[error("Unknown {kind} '{key}'")]
    UnknownKey {
        /// Table the key was looked up in (e.g. "building").
        kind: &'static str,
        /// The offending key.
        key: String,
    },

    /// A numeric parameter was out of range or not finite.
    #[error("Invalid parameter {name}: {value}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Rendered value.
        value: String,
    },

    /// Derived arithmetic produced a non-finite or negative value.
    #[error("Calculation failed: {0}")]
    Calculation(String),

    /// Insufficient resources.
    #[error("Insufficient resources: need {required} {resource}, have {available}")]
    InsufficientResources {
        /// Resource key.
        resource: String,
        /// Amount required.
        required: f64,
        /// Amount available.
        available: f64,
    },

    /// The entry is locked behind unmet unlock conditions.
    #[error("{kind} '{key}' is locked")]
    Locked {
        /// Kind of entry (e.g. "loop action").
        kind: &'static str,
        /// The locked key.
        key: String,
    },

    /// A one-shot action is still cooling down.
    #[error("Action '{key}' is on cooldown for another {remaining_ms} ms")]
    OnCooldown {
        /// Action key.
        key: String,
        /// Milliseconds until ready.
        remaining_ms: u64,
    },

    /// The transition is not allowed in the current state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),
}

impl GameError {
    /// Category of this error for structured logging.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidConfig { .. }
            | Self::ConfigParse(_)
            | Self::UnknownKey { .. }
            | Self::InvalidParameter { .. } => ErrorCategory::Validation,
            Self::Calculation(_) => ErrorCategory::Calculation,
            Self::InsufficientResources { .. }
            | Self::Locked { .. }
            | Self::OnCooldown { .. }
            | Self::InvalidState(_) => ErrorCategory::State,
        }
    }

    pub(crate) fn unknown(kind: &'static str, key: &str) -> Self {
        Self::UnknownKey {
            kind,
            key: key.to_owned(),
        }
    }
}

/// Log a failed transition and fall back to the unchanged input state.
pub(crate) fn recover(op: &'static str, state: &GameState, result: Result<GameState>) -> GameState {
    match result {
        Ok(next) => next,
        Err(err) => {
            log_error(op, &err);
            state.clone()
        }
    }
}

/// Emit a categorised warning for `err`.
pub(crate) fn log_error(op: &'static str, err: &GameError) {
    tracing::warn!(category = err.category().as_str(), op, "{err}");
}
