/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Per-session state machine.
//!
//! The machine is expressed as a pure function from `(state, event)` to a
//! [`StateAction`]. The registry applies the action and performs the timer
//! side effects, so this module never touches the timer store.

use ironcod_core::cod::{CodSettings, DisconnectTrigger};
use std::fmt;
use std::time::Duration;

/// Lifecycle state of a registered session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Transport established, logon not yet accepted.
    Connected,
    /// Logon accepted.
    LoggedOn,
    /// Logged out or disconnected, cancel-on-disconnect timeout pending.
    AwaitingReconnect,
    /// Absorbing end state; the session may be unregistered.
    Terminated,
}

impl SessionState {
    /// Returns true for the absorbing end state.
    #[must_use]
    pub const fn is_terminated(self) -> bool {
        matches!(self, Self::Terminated)
    }

    /// Decides what an event does to a session in this state.
    ///
    /// `settings` are the CoD settings of the currently accepted logon.
    ///
    /// # Returns
    /// `None` if the event is not valid in this state.
    #[must_use]
    pub fn on_event(self, settings: &CodSettings, event: &SessionEvent) -> Option<StateAction> {
        use SessionState::*;

        let action = match (self, event) {
            (Terminated, _) => StateAction::Ignore,
            (AwaitingReconnect, SessionEvent::Terminate) => StateAction::CancelAndEnter(Terminated),
            (_, SessionEvent::Terminate) => StateAction::Enter(Terminated),

            (Connected, SessionEvent::LogonAccepted(_)) => StateAction::Enter(LoggedOn),
            (Connected, SessionEvent::LogoutReceived | SessionEvent::TransportDisconnected) => {
                StateAction::Enter(Terminated)
            }
            (Connected, SessionEvent::Reconnected(_)) => return None,

            (LoggedOn, SessionEvent::LogonAccepted(_) | SessionEvent::Reconnected(_)) => {
                StateAction::Ignore
            }
            (LoggedOn, SessionEvent::LogoutReceived | SessionEvent::TransportDisconnected) => {
                let trigger = event.trigger()?;
                match settings.arming_window(trigger) {
                    Some(window) => StateAction::Arm(window),
                    None => StateAction::Enter(Terminated),
                }
            }

            (AwaitingReconnect, SessionEvent::LogonAccepted(_)) => return None,
            (
                AwaitingReconnect,
                SessionEvent::LogoutReceived | SessionEvent::TransportDisconnected,
            ) => StateAction::Ignore,
            (AwaitingReconnect, SessionEvent::Reconnected(_)) => {
                StateAction::CancelAndEnter(LoggedOn)
            }
        };

        Some(action)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connected => "CONNECTED",
            Self::LoggedOn => "LOGGED_ON",
            Self::AwaitingReconnect => "AWAITING_RECONNECT",
            Self::Terminated => "TERMINATED",
        };
        f.write_str(name)
    }
}

/// Event applied to a registered session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A Logon was accepted with the given CoD settings.
    LogonAccepted(CodSettings),
    /// The counterparty sent a Logout.
    LogoutReceived,
    /// The transport closed.
    TransportDisconnected,
    /// The same composite key logged on again, possibly with new CoD settings.
    Reconnected(CodSettings),
    /// Explicit teardown.
    Terminate,
}

impl SessionEvent {
    /// Returns the disconnect trigger this event represents, if any.
    #[must_use]
    pub const fn trigger(&self) -> Option<DisconnectTrigger> {
        match self {
            Self::LogoutReceived => Some(DisconnectTrigger::LogoutReceived),
            Self::TransportDisconnected => Some(DisconnectTrigger::TransportDisconnected),
            _ => None,
        }
    }

    /// Returns the CoD settings carried by a logon event.
    #[must_use]
    pub const fn settings(&self) -> Option<CodSettings> {
        match self {
            Self::LogonAccepted(settings) | Self::Reconnected(settings) => Some(*settings),
            _ => None,
        }
    }
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LogonAccepted(_) => "LOGON_ACCEPTED",
            Self::LogoutReceived => "LOGOUT_RECEIVED",
            Self::TransportDisconnected => "TRANSPORT_DISCONNECTED",
            Self::Reconnected(_) => "RECONNECTED",
            Self::Terminate => "TERMINATE",
        };
        f.write_str(name)
    }
}

/// Outcome of applying an event to a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAction {
    /// Duplicate or late event; nothing changes.
    Ignore,
    /// Move to the given state, no timer involved.
    Enter(SessionState),
    /// Move to `AwaitingReconnect` and arm a timeout of the given window.
    Arm(Duration),
    /// Cancel the pending timeout, then move to the given state.
    CancelAndEnter(SessionState),
}
