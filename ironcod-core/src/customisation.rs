/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Initiator-side logon customisation.
//!
//! An initiator that wants cancel-on-disconnect protection sets tags 35002 and
//! 35003 on its outbound Logon. The acceptor side only consumes the accepted
//! values, so nothing in the control loop calls these strategies.

use crate::cod::{CANCEL_ON_DISCONNECT_TYPE_TAG, COD_TIMEOUT_WINDOW_TAG, CodSettings};
use crate::types::CompositeKey;

/// Strategy for adding fields to outbound Logon messages.
pub trait SessionCustomisationStrategy: Send + Sync {
    /// Appends extra `(tag, value)` fields to an outbound Logon.
    ///
    /// # Arguments
    /// * `fields` - The logon body fields, in wire order
    /// * `key` - The session the logon is sent for
    fn configure_logon(&self, fields: &mut Vec<(u32, String)>, key: &CompositeKey);
}

/// Strategy that leaves the Logon untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSessionCustomisation;

impl SessionCustomisationStrategy for NoSessionCustomisation {
    fn configure_logon(&self, _fields: &mut Vec<(u32, String)>, _key: &CompositeKey) {}
}

/// Strategy that requests cancel-on-disconnect on every Logon it configures.
#[derive(Debug, Clone, Copy)]
pub struct CancelOnDisconnectCustomisation {
    settings: CodSettings,
}

impl CancelOnDisconnectCustomisation {
    /// Creates a strategy requesting the given settings.
    #[must_use]
    pub const fn new(settings: CodSettings) -> Self {
        Self { settings }
    }

    /// Returns the requested settings.
    #[must_use]
    pub const fn settings(&self) -> CodSettings {
        self.settings
    }
}

impl SessionCustomisationStrategy for CancelOnDisconnectCustomisation {
    fn configure_logon(&self, fields: &mut Vec<(u32, String)>, _key: &CompositeKey) {
        let mut buf = itoa::Buffer::new();
        fields.push((
            CANCEL_ON_DISCONNECT_TYPE_TAG,
            buf.format(self.settings.cod_type.as_wire()).to_owned(),
        ));

        let millis = u64::try_from(self.settings.window.as_millis()).unwrap_or(u64::MAX);
        fields.push((COD_TIMEOUT_WINDOW_TAG, buf.format(millis).to_owned()));
    }
}
