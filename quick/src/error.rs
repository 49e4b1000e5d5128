//! Error types for resolution, generation, and property evaluation.

use thiserror::Error;

use crate::config::ConfigError;

/// Result alias used throughout the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Why a generator description could not be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidSpecReason {
    /// A sequence or mapping literal with no element
    EmptyLiteral,
    /// A sequence or mapping literal with more than one element
    AmbiguousLiteral(usize),
    /// A named tag that matches no supported kind
    UnknownTag(String),
    /// Nesting went past the configured cutoff
    DepthExceeded(usize),
}

impl std::fmt::Display for InvalidSpecReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidSpecReason::EmptyLiteral => write!(f, "literal has no element"),
            InvalidSpecReason::AmbiguousLiteral(n) => {
                write!(f, "literal has {} elements, expected exactly one", n)
            }
            InvalidSpecReason::UnknownTag(tag) => write!(f, "unknown generator tag `{}`", tag),
            InvalidSpecReason::DepthExceeded(depth) => {
                write!(f, "nesting exceeds maximum depth of {}", depth)
            }
        }
    }
}

/// Errors surfaced by the engine itself
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A parameter's generator description is malformed or unsupported
    #[error("invalid generator spec at `{path}`: {reason}")]
    InvalidSpec {
        path: String,
        reason: InvalidSpecReason,
    },

    /// A composite generator kept failing to build a value
    #[error("generator `{generator}` failed to build a value after {attempts} attempts: {last_error}")]
    GenerationBudgetExceeded {
        generator: String,
        attempts: usize,
        last_error: PropertyError,
    },

    /// Configuration rejected by validation
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A worker thread of the parallel suite runner died
    #[error("worker thread panicked: {message}")]
    WorkerPanicked { message: String },
}

impl Error {
    /// Create an invalid spec error for the given parameter path
    pub fn invalid_spec(path: impl Into<String>, reason: InvalidSpecReason) -> Self {
        Self::InvalidSpec {
            path: path.into(),
            reason,
        }
    }

    /// Whether this error was raised for a malformed description
    pub fn is_invalid_spec(&self) -> bool {
        matches!(self, Error::InvalidSpec { .. })
    }
}

/// Why a property evaluation (or a builder call) did not succeed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropertyError {
    /// The property returned false
    #[error("property does not hold")]
    Falsified,

    /// The property returned an error
    #[error("property raised: {0}")]
    Raised(String),

    /// The property panicked
    #[error("property panicked: {0}")]
    Panicked(String),

    /// An argument was looked up by a name that was never declared
    #[error("no argument named `{0}`")]
    MissingArgument(String),

    /// An argument does not hold the requested kind of value
    #[error("argument `{name}` is not {expected}")]
    TypeMismatch { name: String, expected: &'static str },
}

impl PropertyError {
    /// Create an error from any displayable failure
    pub fn raised(message: impl std::fmt::Display) -> Self {
        Self::Raised(message.to_string())
    }

    /// Create an error from a caught panic payload
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked(message)
    }
}
