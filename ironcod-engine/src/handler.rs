/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Cancel-on-disconnect timeout handler interface.
//!
//! The handler is invoked once a session that requested cancel-on-logout or
//! cancel-on-disconnect has been gone for its whole `CODTimeoutWindow`
//! without reconnecting. For that to happen:
//! - the accepted Logon carried a `CancelOnDisconnectType` (tag 35002) that
//!   covers the way the session went away
//! - the accepted Logon carried a non-zero `CODTimeoutWindow` (tag 35003)
//! - no reconnect for the same composite key arrived before the window expired
//!
//! Initiators request the behaviour with a
//! [`SessionCustomisationStrategy`](ironcod_core::SessionCustomisationStrategy).

use ironcod_core::types::{CompositeKey, SurrogateSessionId};
use thiserror::Error;

/// Error reported by a handler.
///
/// The control loop logs it and moves on: the timeout is never redelivered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    /// Human-readable description of the failure.
    pub message: String,
}

impl HandlerError {
    /// Creates a new handler error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result type returned by handlers.
pub type HandlerResult = std::result::Result<(), HandlerError>;

/// Callback invoked when a cancel-on-disconnect timeout fires.
///
/// Called on the framer thread only, synchronously. No other command is
/// processed until the call returns, so the handler should not block. Calling
/// blocking [`FramerHandle`](crate::FramerHandle) methods from inside the
/// handler deadlocks the framer.
pub trait CancelOnDisconnectTimeoutHandler: Send {
    /// Called when a cancel on disconnect is triggered.
    ///
    /// # Arguments
    /// * `session_id` - The surrogate session id of the timed out session
    /// * `fix_session_key` - The full composite key of the timed out session
    fn on_cancel_on_disconnect_timeout(
        &mut self,
        session_id: SurrogateSessionId,
        fix_session_key: &CompositeKey,
    ) -> HandlerResult;
}

impl<F> CancelOnDisconnectTimeoutHandler for F
where
    F: FnMut(SurrogateSessionId, &CompositeKey) -> HandlerResult + Send,
{
    fn on_cancel_on_disconnect_timeout(
        &mut self,
        session_id: SurrogateSessionId,
        fix_session_key: &CompositeKey,
    ) -> HandlerResult {
        self(session_id, fix_session_key)
    }
}

/// Handler that ignores every timeout.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpTimeoutHandler;

impl CancelOnDisconnectTimeoutHandler for NoOpTimeoutHandler {
    fn on_cancel_on_disconnect_timeout(
        &mut self,
        _session_id: SurrogateSessionId,
        _fix_session_key: &CompositeKey,
    ) -> HandlerResult {
        Ok(())
    }
}
