/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Session identity types.
//!
//! This module provides the two identities every session carries:
//! - [`CompositeKey`]: the full, reconnect-stable identity of a counterparty session
//! - [`SurrogateSessionId`]: a compact process-local handle used for fast lookup
//! - [`CompId`]: component identifier used inside the composite key

use arrayvec::ArrayString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length for CompID strings in bytes.
pub const COMP_ID_MAX_LEN: usize = 32;

/// Process-local surrogate session identifier.
///
/// Unique among currently registered sessions. Ids are recycled once a session
/// has been fully torn down, so an id on its own does not identify a logon
/// instance. The value `0` is reserved and never allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct SurrogateSessionId(u64);

impl SurrogateSessionId {
    /// Reserved value meaning "no session".
    pub const NONE: Self = Self(0);

    /// Creates a surrogate id from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw id value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns true if this id can refer to a registered session.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl From<u64> for SurrogateSessionId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<SurrogateSessionId> for u64 {
    fn from(id: SurrogateSessionId) -> Self {
        id.0
    }
}

impl fmt::Display for SurrogateSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Component identifier for FIX sessions.
///
/// Used for SenderCompID (tag 49), TargetCompID (tag 56), and related fields.
/// Maximum length is 32 characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct CompId(ArrayString<COMP_ID_MAX_LEN>);

impl CompId {
    /// Creates a new CompId from a string slice.
    ///
    /// # Returns
    /// `Some(CompId)` if the string fits within the maximum length, `None` otherwise.
    #[must_use]
    pub fn new(s: &str) -> Option<Self> {
        ArrayString::from(s).ok().map(Self)
    }

    /// Returns the CompId as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns true if the CompId is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<str> for CompId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for CompId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompId {
    type Err = arrayvec::CapacityError<()>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or_else(|| arrayvec::CapacityError::new(()))
    }
}

/// Full identity of a logical FIX counterparty session.
///
/// Seen from the acceptor: the local side is the engine's own CompID and the
/// remote side is the counterparty. Equality and hashing are structural, so
/// the same key is produced by every reconnect of the same logical session.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CompositeKey {
    local_comp_id: CompId,
    local_sub_id: Option<String>,
    local_location_id: Option<String>,
    remote_comp_id: CompId,
    remote_sub_id: Option<String>,
    remote_location_id: Option<String>,
}

impl CompositeKey {
    /// Creates a key from the local and remote CompIDs.
    #[must_use]
    pub fn new(local_comp_id: CompId, remote_comp_id: CompId) -> Self {
        Self {
            local_comp_id,
            local_sub_id: None,
            local_location_id: None,
            remote_comp_id,
            remote_sub_id: None,
            remote_location_id: None,
        }
    }

    /// Sets the local sub id (tag 50 on outbound messages).
    #[must_use]
    pub fn with_local_sub_id(mut self, sub_id: impl Into<String>) -> Self {
        self.local_sub_id = Some(sub_id.into());
        self
    }

    /// Sets the local location id (tag 142 on outbound messages).
    #[must_use]
    pub fn with_local_location_id(mut self, location_id: impl Into<String>) -> Self {
        self.local_location_id = Some(location_id.into());
        self
    }

    /// Sets the remote sub id (tag 57 on outbound messages).
    #[must_use]
    pub fn with_remote_sub_id(mut self, sub_id: impl Into<String>) -> Self {
        self.remote_sub_id = Some(sub_id.into());
        self
    }

    /// Sets the remote location id (tag 143 on outbound messages).
    #[must_use]
    pub fn with_remote_location_id(mut self, location_id: impl Into<String>) -> Self {
        self.remote_location_id = Some(location_id.into());
        self
    }

    /// Returns the local CompID.
    #[must_use]
    pub fn local_comp_id(&self) -> &CompId {
        &self.local_comp_id
    }

    /// Returns the local sub id, if any.
    #[must_use]
    pub fn local_sub_id(&self) -> Option<&str> {
        self.local_sub_id.as_deref()
    }

    /// Returns the local location id, if any.
    #[must_use]
    pub fn local_location_id(&self) -> Option<&str> {
        self.local_location_id.as_deref()
    }

    /// Returns the remote CompID.
    #[must_use]
    pub fn remote_comp_id(&self) -> &CompId {
        &self.remote_comp_id
    }

    /// Returns the remote sub id, if any.
    #[must_use]
    pub fn remote_sub_id(&self) -> Option<&str> {
        self.remote_sub_id.as_deref()
    }

    /// Returns the remote location id, if any.
    #[must_use]
    pub fn remote_location_id(&self) -> Option<&str> {
        self.remote_location_id.as_deref()
    }
}

fn write_side(
    f: &mut fmt::Formatter<'_>,
    comp_id: &CompId,
    sub_id: Option<&str>,
    location_id: Option<&str>,
) -> fmt::Result {
    f.write_str(comp_id.as_str())?;
    if let Some(sub_id) = sub_id {
        write!(f, "/{sub_id}")?;
    }
    if let Some(location_id) = location_id {
        write!(f, "@{location_id}")?;
    }
    Ok(())
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_side(
            f,
            &self.local_comp_id,
            self.local_sub_id(),
            self.local_location_id(),
        )?;
        f.write_str("->")?;
        write_side(
            f,
            &self.remote_comp_id,
            self.remote_sub_id(),
            self.remote_location_id(),
        )
    }
}
