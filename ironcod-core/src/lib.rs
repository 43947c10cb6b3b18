/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # IronCod Core
//!
//! Core types and error definitions for the IronCod cancel-on-disconnect subsystem.
//!
//! This crate provides the building blocks shared by the session and engine crates:
//! - **Error types**: Unified error handling with `thiserror`
//! - **Identity types**: `CompId`, `CompositeKey` and `SurrogateSessionId`
//! - **Cancel-on-disconnect settings**: `CancelOnDisconnectType`, `CodSettings`
//!   and logon field decoding (tags 35002 and 35003)
//! - **Customisation**: Strategy trait for setting CoD fields on outbound logons

pub mod cod;
pub mod customisation;
pub mod error;
pub mod types;

pub use cod::{CancelOnDisconnectType, CodSettings, DisconnectTrigger};
pub use customisation::{
    CancelOnDisconnectCustomisation, NoSessionCustomisation, SessionCustomisationStrategy,
};
pub use error::{CodError, Result};
pub use types::{CompId, CompositeKey, SurrogateSessionId};
