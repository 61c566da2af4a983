//! The closed error-kind taxonomy shared by every command handler and the
//! tick engine's per-entity recovery path.

use thiserror::Error;

/// An error surfaced to a player-facing RPC, or logged during a tick.
///
/// Variants mirror the six error kinds the spec requires; no variant carries
/// enough detail to leak internal state to a client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GisaimaError {
    /// The caller could not be authenticated.
    #[error("unauthenticated")]
    Unauthenticated,
    /// The request's shape or values are invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A referenced group/tile/structure/battle does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The caller does not own, or is otherwise forbidden from touching, the target.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// The target is not in a state that allows this action.
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),
    /// An unexpected failure, e.g. the store backend is unavailable.
    #[error("internal error")]
    Internal,
}

impl GisaimaError {
    /// Builds an [`GisaimaError::InvalidArgument`].
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Builds a [`GisaimaError::NotFound`].
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Builds a [`GisaimaError::PermissionDenied`].
    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    /// Builds a [`GisaimaError::FailedPrecondition`].
    pub fn failed_precondition(msg: impl Into<String>) -> Self {
        Self::FailedPrecondition(msg.into())
    }

    /// Short machine-readable kind string, for logging/metrics tagging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::InvalidArgument(_) => "invalid-argument",
            Self::NotFound(_) => "not-found",
            Self::PermissionDenied(_) => "permission-denied",
            Self::FailedPrecondition(_) => "failed-precondition",
            Self::Internal => "internal",
        }
    }
}
