/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Framer configuration.
//!
//! This module provides configuration options for the cancel-on-disconnect
//! control loop and its thread.

use ironcod_core::error::{CodError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest `max_cod_window` accepted by [`FramerConfig::validate`].
pub const MAX_COD_WINDOW_LIMIT: Duration = Duration::from_secs(24 * 60 * 60);

/// What to do when a logon arrives for a composite key that is still active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Reject the new registration with `DuplicateSession`.
    #[default]
    RejectNew,
    /// Terminate the old session without notifying the handler, then register the new one.
    SupersedeOld,
}

/// Configuration for the framer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FramerConfig {
    /// Interval of the timer tick that drives expiry scans.
    pub tick_interval: Duration,
    /// Capacity of the bounded command queue.
    pub queue_capacity: usize,
    /// Maximum commands drained per loop iteration.
    pub max_batch_size: usize,
    /// Policy applied on registration collisions.
    pub collision_policy: CollisionPolicy,
    /// Upper bound for accepted `CODTimeoutWindow` values.
    pub max_cod_window: Duration,
    /// Whether terminated sessions are unregistered immediately.
    pub unregister_on_terminate: bool,
    /// Name of the framer thread.
    pub thread_name: String,
}

impl FramerConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            queue_capacity: 1024,
            max_batch_size: 256,
            collision_policy: CollisionPolicy::RejectNew,
            max_cod_window: Duration::from_secs(60),
            unregister_on_terminate: false,
            thread_name: "ironcod-framer".to_string(),
        }
    }

    /// Sets the tick interval.
    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Sets the command queue capacity.
    #[must_use]
    pub const fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Sets the maximum batch size.
    #[must_use]
    pub const fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    /// Sets the collision policy.
    #[must_use]
    pub const fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }

    /// Sets the maximum CoD window.
    #[must_use]
    pub fn with_max_cod_window(mut self, window: Duration) -> Self {
        self.max_cod_window = window;
        self
    }

    /// Sets whether terminated sessions are unregistered immediately.
    #[must_use]
    pub const fn with_unregister_on_terminate(mut self, enabled: bool) -> Self {
        self.unregister_on_terminate = enabled;
        self
    }

    /// Sets the framer thread name.
    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Checks the configuration for values the framer cannot run with.
    ///
    /// # Errors
    /// Returns `CodError::Configuration` if the tick interval, queue capacity
    /// or batch size is zero, or if `max_cod_window` exceeds
    /// [`MAX_COD_WINDOW_LIMIT`].
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval.is_zero() {
            return Err(CodError::Configuration(
                "tick_interval must be greater than zero".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(CodError::Configuration(
                "queue_capacity must be greater than zero".to_string(),
            ));
        }
        if self.max_batch_size == 0 {
            return Err(CodError::Configuration(
                "max_batch_size must be greater than zero".to_string(),
            ));
        }
        if self.max_cod_window > MAX_COD_WINDOW_LIMIT {
            return Err(CodError::Configuration(format!(
                "max_cod_window must not exceed {}s",
                MAX_COD_WINDOW_LIMIT.as_secs()
            )));
        }
        Ok(())
    }
}

impl Default for FramerConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framer_config_defaults() {
        let config = FramerConfig::new();
        assert_eq!(config.tick_interval, Duration::from_millis(100));
        assert_eq!(config.queue_capacity, 1024);
        assert_eq!(config.max_batch_size, 256);
        assert_eq!(config.collision_policy, CollisionPolicy::RejectNew);
        assert_eq!(config.max_cod_window, Duration::from_secs(60));
        assert!(!config.unregister_on_terminate);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_framer_config_with() {
        let config = FramerConfig::new()
            .with_tick_interval(Duration::from_millis(10))
            .with_collision_policy(CollisionPolicy::SupersedeOld)
            .with_unregister_on_terminate(true)
            .with_thread_name("cod");

        assert_eq!(config.tick_interval, Duration::from_millis(10));
        assert_eq!(config.collision_policy, CollisionPolicy::SupersedeOld);
        assert!(config.unregister_on_terminate);
        assert_eq!(config.thread_name, "cod");
    }

    #[test]
    fn test_framer_config_validate() {
        let config = FramerConfig::new().with_queue_capacity(0);
        assert!(matches!(
            config.validate(),
            Err(CodError::Configuration(_))
        ));

        let config = FramerConfig::new().with_tick_interval(Duration::ZERO);
        assert!(config.validate().is_err());

        let config = FramerConfig::new().with_max_batch_size(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_framer_config_rejects_unbounded_window() {
        let config = FramerConfig::new().with_max_cod_window(MAX_COD_WINDOW_LIMIT);
        assert!(config.validate().is_ok());

        let config = FramerConfig::new().with_max_cod_window(Duration::MAX);
        assert_eq!(
            config.validate(),
            Err(CodError::Configuration(
                "max_cod_window must not exceed 86400s".to_string()
            ))
        );
    }
}
