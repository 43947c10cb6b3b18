/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Framer builder for fluent configuration.
//!
//! This module provides a builder API for configuring the cancel-on-disconnect
//! framer and choosing its timeout handler.

use crate::config::{CollisionPolicy, FramerConfig};
use crate::control::ControlLoop;
use crate::framer::Framer;
use crate::handler::{CancelOnDisconnectTimeoutHandler, NoOpTimeoutHandler};
use ironcod_core::error::Result;
use std::time::Duration;

/// Builder for configuring a framer.
#[derive(Debug)]
pub struct FramerBuilder<H: CancelOnDisconnectTimeoutHandler = NoOpTimeoutHandler> {
    /// Timeout handler.
    handler: H,
    /// Framer configuration.
    config: FramerConfig,
}

impl Default for FramerBuilder<NoOpTimeoutHandler> {
    fn default() -> Self {
        Self::new()
    }
}

impl FramerBuilder<NoOpTimeoutHandler> {
    /// Creates a new builder with default settings and a no-op handler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handler: NoOpTimeoutHandler,
            config: FramerConfig::new(),
        }
    }
}

impl<H: CancelOnDisconnectTimeoutHandler> FramerBuilder<H> {
    /// Sets the timeout handler.
    #[must_use]
    pub fn with_handler<B: CancelOnDisconnectTimeoutHandler>(self, handler: B) -> FramerBuilder<B> {
        FramerBuilder {
            handler,
            config: self.config,
        }
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub fn with_config(mut self, config: FramerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the tick interval.
    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.config.tick_interval = interval;
        self
    }

    /// Sets the command queue capacity.
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Sets the collision policy.
    #[must_use]
    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.config.collision_policy = policy;
        self
    }

    /// Sets the maximum accepted CoD window.
    #[must_use]
    pub fn with_max_cod_window(mut self, window: Duration) -> Self {
        self.config.max_cod_window = window;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &FramerConfig {
        &self.config
    }

    /// Builds a control loop to be driven by the caller.
    #[must_use]
    pub fn build(self) -> ControlLoop<H> {
        ControlLoop::new(self.handler, self.config)
    }

    /// Starts the framer thread.
    ///
    /// # Errors
    /// Returns `CodError::Configuration` if the configuration is invalid.
    pub fn spawn(self) -> Result<Framer<H>>
    where
        H: 'static,
    {
        Framer::spawn(self.handler, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framer_builder_default() {
        let builder = FramerBuilder::new();
        assert_eq!(builder.config(), &FramerConfig::new());
    }

    #[test]
    fn test_framer_builder_with_settings() {
        let builder = FramerBuilder::new()
            .with_tick_interval(Duration::from_millis(10))
            .with_queue_capacity(16)
            .with_collision_policy(CollisionPolicy::SupersedeOld)
            .with_max_cod_window(Duration::from_secs(30));

        assert_eq!(builder.config().tick_interval, Duration::from_millis(10));
        assert_eq!(builder.config().queue_capacity, 16);
        assert_eq!(
            builder.config().collision_policy,
            CollisionPolicy::SupersedeOld
        );

        let control = builder.build();
        assert_eq!(control.config().max_cod_window, Duration::from_secs(30));
        assert!(control.registry().is_empty());
    }

    #[test]
    fn test_framer_builder_spawn() {
        let framer = FramerBuilder::new()
            .with_handler(NoOpTimeoutHandler)
            .with_tick_interval(Duration::from_millis(5))
            .spawn()
            .unwrap();

        let control = framer.shutdown().unwrap();
        assert!(control.registry().is_empty());
    }
}
