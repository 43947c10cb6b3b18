/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # IronCod
//!
//! Cancel-on-disconnect (CoD) timeout handling for FIX acceptors.
//!
//! A counterparty that negotiates CoD on its Logon (tags 35002 and 35003)
//! asks the acceptor to cancel its resting orders if the session drops and
//! does not come back within the agreed window. IronCod tracks those sessions,
//! arms a timer when the qualifying trigger occurs, cancels it on reconnect,
//! and notifies the application exactly once when a window elapses.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ironcod::prelude::*;
//!
//! let framer = FramerBuilder::new()
//!     .with_handler(|session_id: SurrogateSessionId, key: &CompositeKey| -> HandlerResult {
//!         println!("cancel all orders for {key} ({session_id})");
//!         Ok(())
//!     })
//!     .spawn()?;
//!
//! let handle = framer.handle();
//! let id = handle.register(key)?;
//! handle.logon_accepted(id, CodSettings::from_logon_fields(fields)?)?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`]: Identifiers, CoD settings, and error definitions
//! - [`session`]: Session registry, state machine, and timer store
//! - [`engine`]: Control loop, framer thread, and timeout handler contract

pub mod core {
    //! Identifiers, CoD settings, and error definitions.
    pub use ironcod_core::*;
}

pub mod session {
    //! Session registry, state machine, and timer store.
    pub use ironcod_session::*;
}

pub mod engine {
    //! Control loop, framer thread, and timeout handler contract.
    pub use ironcod_engine::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    // Core types
    pub use ironcod_core::{
        CancelOnDisconnectCustomisation, CancelOnDisconnectType, CodError, CodSettings, CompId,
        CompositeKey, DisconnectTrigger, Result, SessionCustomisationStrategy,
        SurrogateSessionId,
    };

    // Session
    pub use ironcod_session::{SessionEvent, SessionState};

    // Engine
    pub use ironcod_engine::{
        CancelOnDisconnectTimeoutHandler, CollisionPolicy, Framer, FramerBuilder, FramerConfig,
        FramerHandle, HandlerError, HandlerResult,
    };
}
