/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Commands accepted by the framer queue.

use crossbeam_channel::Sender;
use ironcod_core::cod::CodSettings;
use ironcod_core::error::Result;
use ironcod_core::types::{CompositeKey, SurrogateSessionId};
use ironcod_session::state::SessionEvent;

/// Reply channel for commands that hand a surrogate id back to the caller.
pub type Reply = Sender<Result<SurrogateSessionId>>;

/// A unit of work for the control loop.
#[derive(Debug)]
pub enum FramerCommand {
    /// Register a newly authenticated session.
    Register {
        /// Composite key of the session.
        key: CompositeKey,
        /// Where to send the allocated id or the collision error.
        reply: Option<Reply>,
    },
    /// Apply an event to a registered session.
    Event {
        /// Target session.
        session_id: SurrogateSessionId,
        /// Event to apply.
        event: SessionEvent,
    },
    /// A known composite key logged on again on a new connection.
    Reconnect {
        /// Composite key of the session.
        key: CompositeKey,
        /// CoD settings of the new logon.
        settings: CodSettings,
        /// Where to send the session's id or the error.
        reply: Option<Reply>,
    },
    /// Remove a terminated session.
    Unregister {
        /// Target session.
        session_id: SurrogateSessionId,
    },
    /// Wake the loop for an expiry scan.
    Tick,
    /// Stop the loop after the current batch.
    Shutdown,
}

impl FramerCommand {
    /// Logon accepted with the given CoD settings.
    #[must_use]
    pub const fn logon_accepted(session_id: SurrogateSessionId, settings: CodSettings) -> Self {
        Self::Event {
            session_id,
            event: SessionEvent::LogonAccepted(settings),
        }
    }

    /// Logout received from the counterparty.
    #[must_use]
    pub const fn logout_received(session_id: SurrogateSessionId) -> Self {
        Self::Event {
            session_id,
            event: SessionEvent::LogoutReceived,
        }
    }

    /// Transport closed.
    #[must_use]
    pub const fn transport_disconnected(session_id: SurrogateSessionId) -> Self {
        Self::Event {
            session_id,
            event: SessionEvent::TransportDisconnected,
        }
    }

    /// Explicit teardown.
    #[must_use]
    pub const fn terminate(session_id: SurrogateSessionId) -> Self {
        Self::Event {
            session_id,
            event: SessionEvent::Terminate,
        }
    }

    /// Short name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Register { .. } => "register",
            Self::Event { .. } => "event",
            Self::Reconnect { .. } => "reconnect",
            Self::Unregister { .. } => "unregister",
            Self::Tick => "tick",
            Self::Shutdown => "shutdown",
        }
    }
}
