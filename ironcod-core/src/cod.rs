/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Cancel-on-disconnect logon settings.
//!
//! A counterparty requests cancel-on-disconnect behaviour through two logon
//! fields: `CancelOnDisconnectType` (tag 35002) and `CODTimeoutWindow`
//! (tag 35003, milliseconds). This module holds the decoded values and the
//! rule deciding whether a logout or disconnect arms a timeout.

use crate::error::{CodError, Result};
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Tag number of the `CancelOnDisconnectType` logon field.
pub const CANCEL_ON_DISCONNECT_TYPE_TAG: u32 = 35002;

/// Tag number of the `CODTimeoutWindow` logon field.
pub const COD_TIMEOUT_WINDOW_TAG: u32 = 35003;

/// Requested cancel-on-disconnect behaviour (tag 35002).
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    FromPrimitive,
    ToPrimitive,
)]
#[repr(u8)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancelOnDisconnectType {
    /// Do not cancel on disconnect or logout.
    #[default]
    None = 0,
    /// Cancel only when the transport disconnects.
    CancelOnDisconnect = 1,
    /// Cancel only when the counterparty logs out.
    CancelOnLogout = 2,
    /// Cancel on either a disconnect or a logout.
    CancelOnEither = 3,
}

impl CancelOnDisconnectType {
    /// Creates a type from its wire value.
    ///
    /// # Returns
    /// `Some(type)` for values 0 to 3, `None` otherwise.
    #[must_use]
    pub fn from_wire(value: u64) -> Option<Self> {
        Self::from_u64(value)
    }

    /// Returns the wire value of this type.
    #[must_use]
    pub const fn as_wire(self) -> u8 {
        self as u8
    }

    /// Returns true if the given trigger should start a timeout for this type.
    #[must_use]
    pub const fn qualifies(self, trigger: DisconnectTrigger) -> bool {
        match (self, trigger) {
            (Self::CancelOnEither, _)
            | (Self::CancelOnDisconnect, DisconnectTrigger::TransportDisconnected)
            | (Self::CancelOnLogout, DisconnectTrigger::LogoutReceived) => true,
            _ => false,
        }
    }
}

impl fmt::Display for CancelOnDisconnectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "NONE",
            Self::CancelOnDisconnect => "CANCEL_ON_DISCONNECT",
            Self::CancelOnLogout => "CANCEL_ON_LOGOUT",
            Self::CancelOnEither => "CANCEL_ON_EITHER",
        };
        f.write_str(name)
    }
}

/// The way a logged on session went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisconnectTrigger {
    /// The counterparty sent a Logout.
    LogoutReceived,
    /// The transport closed without a Logout.
    TransportDisconnected,
}

/// Cancel-on-disconnect values accepted on one logon instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodSettings {
    /// Requested behaviour.
    pub cod_type: CancelOnDisconnectType,
    /// Grace window before the handler fires.
    pub window: Duration,
}

impl CodSettings {
    /// Creates settings from a type and a window.
    #[must_use]
    pub const fn new(cod_type: CancelOnDisconnectType, window: Duration) -> Self {
        Self { cod_type, window }
    }

    /// Settings for a session that did not ask for cancel-on-disconnect.
    #[must_use]
    pub const fn none() -> Self {
        Self::new(CancelOnDisconnectType::None, Duration::ZERO)
    }

    /// Returns true if some trigger could arm a timeout with these settings.
    #[must_use]
    pub fn requires_timer(&self) -> bool {
        self.cod_type != CancelOnDisconnectType::None && !self.window.is_zero()
    }

    /// Returns the window to arm for the given trigger.
    ///
    /// A zero window never arms, whatever the type.
    #[must_use]
    pub fn arming_window(&self, trigger: DisconnectTrigger) -> Option<Duration> {
        (self.cod_type.qualifies(trigger) && !self.window.is_zero()).then_some(self.window)
    }

    /// Returns a copy whose window does not exceed `max`.
    #[must_use]
    pub fn clamped(self, max: Duration) -> Self {
        Self {
            cod_type: self.cod_type,
            window: self.window.min(max),
        }
    }

    /// Decodes the settings from the fields of an accepted logon message.
    ///
    /// Fields other than tags 35002 and 35003 are ignored. Absent fields mean
    /// `NONE` and a zero window.
    ///
    /// # Errors
    /// Returns `CodError::InvalidLogonField` if either field is not a valid
    /// unsigned integer or the type is outside 0 to 3.
    pub fn from_logon_fields<'a, I>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u32, &'a [u8])>,
    {
        let mut settings = Self::none();

        for (tag, value) in fields {
            match tag {
                CANCEL_ON_DISCONNECT_TYPE_TAG => {
                    let raw = parse_uint(tag, value)?;
                    settings.cod_type = CancelOnDisconnectType::from_wire(raw).ok_or_else(|| {
                        CodError::InvalidLogonField {
                            tag,
                            reason: format!("unknown cancel on disconnect type {raw}"),
                        }
                    })?;
                }
                COD_TIMEOUT_WINDOW_TAG => {
                    settings.window = Duration::from_millis(parse_uint(tag, value)?);
                }
                _ => {}
            }
        }

        Ok(settings)
    }
}

fn parse_uint(tag: u32, value: &[u8]) -> Result<u64> {
    std::str::from_utf8(value)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| CodError::InvalidLogonField {
            tag,
            reason: format!("expected unsigned integer, got {:?}", String::from_utf8_lossy(value)),
        })
}

impl fmt::Display for CodSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} window={}ms", self.cod_type, self.window.as_millis())
    }
}
