/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # IronCod Engine
//!
//! The cancel-on-disconnect control loop ("framer") for the IronCod subsystem.
//!
//! This crate provides:
//! - **Handler trait**: Callback invoked when a session's CoD window elapses
//! - **Control loop**: Exclusive owner of the session registry and timer store
//! - **Framer thread**: Dedicated thread draining one command queue and a tick source
//! - **Builder API**: Fluent configuration for the framer
//!
//! ## Threading
//!
//! Producers on any thread send [`FramerCommand`]s through a [`FramerHandle`].
//! The framer thread applies them in queue order, then scans for expired
//! timeouts and calls the handler synchronously, one session at a time.

pub mod builder;
pub mod command;
pub mod config;
pub mod control;
pub mod framer;
pub mod handler;
pub mod stats;

pub use builder::FramerBuilder;
pub use command::{FramerCommand, Reply};
pub use config::{CollisionPolicy, FramerConfig, MAX_COD_WINDOW_LIMIT};
pub use control::{ControlLoop, LoopControl};
pub use framer::{Framer, FramerHandle};
pub use handler::{
    CancelOnDisconnectTimeoutHandler, HandlerError, HandlerResult, NoOpTimeoutHandler,
};
pub use stats::{FramerStats, StatsSnapshot};
