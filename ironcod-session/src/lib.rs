/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # IronCod Session
//!
//! Session bookkeeping for the IronCod cancel-on-disconnect subsystem.
//!
//! This crate provides:
//! - **State machine**: Per-session lifecycle driven by logon, logout,
//!   disconnect, reconnect and terminate events
//! - **Registry**: Arena of sessions with O(1) lookup by surrogate id or composite key
//! - **Timer store**: At most one generation-tagged timeout per session
//!
//! None of these types are thread-safe on purpose: they are owned and mutated
//! by the single control loop thread.

pub mod registry;
pub mod state;
pub mod timer;

pub use registry::{ArmedTimer, SessionRegistry, Transition};
pub use state::{SessionEvent, SessionState, StateAction};
pub use timer::{CodTimerStore, ExpiredTimer, TimerEntry};
