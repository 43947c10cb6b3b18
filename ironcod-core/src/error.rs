/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Error types for the IronCod cancel-on-disconnect subsystem.
//!
//! This module provides a single error enum using `thiserror`. Every variant is
//! recoverable from the point of view of the control loop: failures are isolated
//! to the event that caused them and never stop the loop.

use crate::types::{CompositeKey, SurrogateSessionId};
use thiserror::Error;

/// Result type alias using [`CodError`] as the error type.
pub type Result<T> = std::result::Result<T, CodError>;

/// Top-level error type for all IronCod operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodError {
    /// A registry operation referenced a surrogate id that is not registered.
    #[error("unknown session: id={session_id}")]
    UnknownSession {
        /// The surrogate id that was referenced.
        session_id: SurrogateSessionId,
    },

    /// A reconnect referenced a composite key that is not registered.
    #[error("unknown session key: {key}")]
    UnknownKey {
        /// The composite key that was referenced.
        key: CompositeKey,
    },

    /// Registration collided with an already active composite key.
    #[error("duplicate session {key}: already registered as id={existing}")]
    DuplicateSession {
        /// The composite key of the rejected registration.
        key: CompositeKey,
        /// The surrogate id currently holding the key.
        existing: SurrogateSessionId,
    },

    /// The external timeout handler failed while being notified.
    #[error("cancel on disconnect handler failed for id={session_id} ({key}): {reason}")]
    HandlerInvocation {
        /// Surrogate id of the timed out session.
        session_id: SurrogateSessionId,
        /// Composite key of the timed out session.
        key: CompositeKey,
        /// Description of the failure.
        reason: String,
    },

    /// An event is not valid for the session's current state.
    #[error("invalid transition for id={session_id}: {event} in state {state}")]
    InvalidTransition {
        /// Surrogate id of the session.
        session_id: SurrogateSessionId,
        /// Current session state.
        state: String,
        /// The rejected event.
        event: String,
    },

    /// Unregistration attempted before the session reached TERMINATED.
    #[error("session id={session_id} cannot be unregistered in state {state}")]
    NotTerminated {
        /// Surrogate id of the session.
        session_id: SurrogateSessionId,
        /// Current session state.
        state: String,
    },

    /// The deadline for a cod timeout window cannot be represented.
    #[error("cod timeout window of {window_ms}ms overflows the clock for id={session_id}")]
    DeadlineOverflow {
        /// Surrogate id of the session.
        session_id: SurrogateSessionId,
        /// The window that could not be armed, in milliseconds.
        window_ms: u128,
    },

    /// A cancel-on-disconnect logon field carried an invalid value.
    #[error("invalid logon field tag {tag}: {reason}")]
    InvalidLogonField {
        /// The tag number of the field.
        tag: u32,
        /// Description of why the value is invalid.
        reason: String,
    },

    /// The control loop is no longer accepting commands.
    #[error("framer stopped: command queue closed")]
    FramerStopped,

    /// Framer configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl CodError {
    /// Returns true if this error was raised by the external handler.
    #[must_use]
    pub const fn is_handler_failure(&self) -> bool {
        matches!(self, Self::HandlerInvocation { .. })
    }

    /// Returns the surrogate id the error refers to, if any.
    #[must_use]
    pub const fn session_id(&self) -> Option<SurrogateSessionId> {
        match self {
            Self::UnknownSession { session_id }
            | Self::HandlerInvocation { session_id, .. }
            | Self::InvalidTransition { session_id, .. }
            | Self::NotTerminated { session_id, .. }
            | Self::DeadlineOverflow { session_id, .. } => Some(*session_id),
            Self::DuplicateSession { existing, .. } => Some(*existing),
            Self::UnknownKey { .. }
            | Self::InvalidLogonField { .. }
            | Self::FramerStopped
            | Self::Configuration(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CompId;

    fn key() -> CompositeKey {
        CompositeKey::new(
            CompId::new("ACCEPTOR").unwrap(),
            CompId::new("CLIENT").unwrap(),
        )
    }

    #[test]
    fn test_unknown_session_display() {
        let err = CodError::UnknownSession {
            session_id: SurrogateSessionId::new(7),
        };
        assert_eq!(err.to_string(), "unknown session: id=7");
        assert_eq!(err.session_id(), Some(SurrogateSessionId::new(7)));
    }

    #[test]
    fn test_duplicate_session_display() {
        let err = CodError::DuplicateSession {
            key: key(),
            existing: SurrogateSessionId::new(3),
        };
        assert_eq!(
            err.to_string(),
            "duplicate session ACCEPTOR->CLIENT: already registered as id=3"
        );
    }

    #[test]
    fn test_deadline_overflow_display() {
        let err = CodError::DeadlineOverflow {
            session_id: SurrogateSessionId::new(4),
            window_ms: 1500,
        };
        assert_eq!(
            err.to_string(),
            "cod timeout window of 1500ms overflows the clock for id=4"
        );
        assert_eq!(err.session_id(), Some(SurrogateSessionId::new(4)));
    }

    #[test]
    fn test_handler_failure() {
        let err = CodError::HandlerInvocation {
            session_id: SurrogateSessionId::new(1),
            key: key(),
            reason: "boom".to_string(),
        };
        assert!(err.is_handler_failure());
        assert!(!CodError::FramerStopped.is_handler_failure());
        assert_eq!(CodError::FramerStopped.session_id(), None);
    }
}
