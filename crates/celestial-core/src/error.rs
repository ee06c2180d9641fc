use std::fmt;

use crate::event::EventId;

/// Machine-readable error codes surfaced to transports and operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidEventType,
    UnknownParent,
    EventNotFound,
    InvalidRootId,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidEventType => "E1001",
            Self::UnknownParent => "E1002",
            Self::EventNotFound => "E2001",
            Self::InvalidRootId => "E2002",
        }
    }

    /// Optional remediation hint for callers.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::InvalidEventType => Some("Pass a non-blank `type` when emitting."),
            Self::UnknownParent => {
                Some("Emit the parent first; parents must exist before their children.")
            }
            Self::EventNotFound => None,
            Self::InvalidRootId => Some("Traversal roots must be non-zero ids of stored events."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Why a traversal root was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    /// The id was zero, which is never assigned.
    ZeroId,
    /// No event with this id has been appended.
    Missing,
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroId => f.write_str("id must be non-zero"),
            Self::Missing => f.write_str("event not found"),
        }
    }
}

/// Errors returned by [`crate::Store`] operations.
///
/// Every variant is synchronous and local: a failed call leaves the store
/// exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Malformed emit input.
    #[error("validation error: {0}")]
    Validation(String),

    /// An emit named a parent that was never appended.
    #[error("parent {0} not found")]
    Reference(EventId),

    /// A query named an id that is zero or unknown.
    #[error("event {id}: {reason}")]
    NotFound { id: EventId, reason: NotFoundReason },
}

impl StoreError {
    pub(crate) const fn missing(id: EventId) -> Self {
        Self::NotFound {
            id,
            reason: NotFoundReason::Missing,
        }
    }

    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::InvalidEventType,
            Self::Reference(_) => ErrorCode::UnknownParent,
            Self::NotFound {
                reason: NotFoundReason::ZeroId,
                ..
            } => ErrorCode::InvalidRootId,
            Self::NotFound { .. } => ErrorCode::EventNotFound,
        }
    }

    /// Optional remediation hint.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }

    /// Returns `true` for [`StoreError::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
