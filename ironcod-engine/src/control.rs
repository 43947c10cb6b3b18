/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! The cancel-on-disconnect control loop.
//!
//! [`ControlLoop`] is the exclusive owner of the session registry and the
//! timer store and the only caller of the timeout handler. One iteration
//! applies a batch of commands in queue order, then scans the timer store
//! once and notifies the handler for every expired session, one at a time.
//!
//! The loop itself is synchronous and takes `now` as an argument; the
//! [`Framer`](crate::Framer) thread supplies commands and the clock.

use crate::command::{FramerCommand, Reply};
use crate::config::{CollisionPolicy, FramerConfig};
use crate::handler::CancelOnDisconnectTimeoutHandler;
use crate::stats::FramerStats;
use ironcod_core::cod::CodSettings;
use ironcod_core::error::{CodError, Result};
use ironcod_core::types::{CompositeKey, SurrogateSessionId};
use ironcod_session::registry::{SessionRegistry, Transition};
use ironcod_session::state::{SessionEvent, SessionState};
use ironcod_session::timer::CodTimerStore;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Whether the loop keeps running after a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    /// Keep processing.
    Continue,
    /// A shutdown command was processed.
    Shutdown,
}

/// Single-threaded owner of all cancel-on-disconnect state.
#[derive(Debug)]
pub struct ControlLoop<H> {
    registry: SessionRegistry,
    timers: CodTimerStore,
    handler: H,
    config: FramerConfig,
    stats: Arc<FramerStats>,
}

impl<H: CancelOnDisconnectTimeoutHandler> ControlLoop<H> {
    /// Creates a control loop with fresh counters.
    #[must_use]
    pub fn new(handler: H, config: FramerConfig) -> Self {
        Self::with_stats(handler, config, Arc::new(FramerStats::new()))
    }

    /// Creates a control loop that updates the given counters.
    #[must_use]
    pub fn with_stats(handler: H, config: FramerConfig, stats: Arc<FramerStats>) -> Self {
        Self {
            registry: SessionRegistry::new(),
            timers: CodTimerStore::new(),
            handler,
            config,
            stats,
        }
    }

    /// Processes a batch of commands, then scans for expired timeouts once.
    ///
    /// Commands following a `Shutdown` in the same batch are dropped; their
    /// reply channels close, which callers observe as `FramerStopped`.
    pub fn run_batch<I>(&mut self, commands: I, now: Instant) -> LoopControl
    where
        I: IntoIterator<Item = FramerCommand>,
    {
        let mut control = LoopControl::Continue;

        for command in commands {
            if control == LoopControl::Shutdown {
                warn!(command = command.name(), "dropping command queued after shutdown");
                continue;
            }
            control = self.handle(command, now);
        }

        self.poll_timeouts(now);
        control
    }

    /// Applies a single command without scanning timers.
    pub fn handle(&mut self, command: FramerCommand, now: Instant) -> LoopControl {
        match command {
            FramerCommand::Register { key, reply } => {
                let result = self.register(key, now);
                self.respond("register", result, reply);
            }
            FramerCommand::Event { session_id, event } => {
                self.stats.record_event();
                if let Err(err) = self.apply_event(session_id, event, now) {
                    self.stats.record_rejected();
                    warn!(%session_id, %event, %err, "dropping session event");
                }
            }
            FramerCommand::Reconnect {
                key,
                settings,
                reply,
            } => {
                let result = self.reconnect(&key, settings, now);
                self.respond("reconnect", result, reply);
            }
            FramerCommand::Unregister { session_id } => {
                self.stats.record_event();
                if let Err(err) = self.unregister(session_id) {
                    self.stats.record_rejected();
                    warn!(%session_id, %err, "dropping unregister");
                }
            }
            FramerCommand::Tick => {}
            FramerCommand::Shutdown => {
                info!("framer shutdown requested");
                return LoopControl::Shutdown;
            }
        }
        LoopControl::Continue
    }

    /// Registers a newly authenticated session, applying the collision policy.
    ///
    /// # Errors
    /// Returns `CodError::DuplicateSession` if the key is active and the
    /// policy is `RejectNew`.
    pub fn register(&mut self, key: CompositeKey, now: Instant) -> Result<SurrogateSessionId> {
        match self.registry.register(key.clone()) {
            Err(CodError::DuplicateSession { existing, .. })
                if self.config.collision_policy == CollisionPolicy::SupersedeOld =>
            {
                warn!(session_id = %existing, %key, "superseding active session");
                let transition = self.registry.transition(
                    existing,
                    SessionEvent::Terminate,
                    now,
                    &mut self.timers,
                )?;
                self.record(&transition);
                self.registry.unregister(existing)?;
                self.registry.register(key)
            }
            result => result,
        }
    }

    /// Applies an event to a registered session.
    ///
    /// Logon settings are clamped to the configured maximum window first.
    ///
    /// # Errors
    /// Returns `CodError::UnknownSession` or `CodError::InvalidTransition`
    /// from the registry.
    pub fn apply_event(
        &mut self,
        session_id: SurrogateSessionId,
        event: SessionEvent,
        now: Instant,
    ) -> Result<Transition> {
        let event = match event {
            SessionEvent::LogonAccepted(settings) => {
                SessionEvent::LogonAccepted(self.clamp(session_id, settings))
            }
            SessionEvent::Reconnected(settings) => {
                SessionEvent::Reconnected(self.clamp(session_id, settings))
            }
            other => other,
        };

        let transition = self
            .registry
            .transition(session_id, event, now, &mut self.timers)?;
        self.record(&transition);
        self.settle(&transition);
        Ok(transition)
    }

    /// Handles a logon from a composite key that is already registered.
    ///
    /// # Errors
    /// Returns `CodError::UnknownKey` if the key is not registered and
    /// `CodError::InvalidTransition` if the session cannot return to
    /// `LoggedOn`, for example because its timeout already fired.
    pub fn reconnect(
        &mut self,
        key: &CompositeKey,
        settings: CodSettings,
        now: Instant,
    ) -> Result<SurrogateSessionId> {
        let session_id = self
            .registry
            .lookup_id(key)
            .ok_or_else(|| CodError::UnknownKey { key: key.clone() })?;

        let transition = self.apply_event(session_id, SessionEvent::Reconnected(settings), now)?;
        if transition.to != SessionState::LoggedOn {
            return Err(CodError::InvalidTransition {
                session_id,
                state: transition.to.to_string(),
                event: SessionEvent::Reconnected(settings).to_string(),
            });
        }
        Ok(session_id)
    }

    /// Removes a terminated session.
    ///
    /// # Errors
    /// Returns `CodError::UnknownSession` or `CodError::NotTerminated`.
    pub fn unregister(&mut self, session_id: SurrogateSessionId) -> Result<CompositeKey> {
        let key = self.registry.unregister(session_id)?;
        if self.timers.cancel(session_id).is_some() {
            self.stats.record_anomaly();
            error!(%session_id, %key, "timer armed for a terminated session, discarded");
        }
        Ok(key)
    }

    /// Scans the timer store and notifies the handler for every expired session.
    ///
    /// # Returns
    /// The number of handler invocations.
    pub fn poll_timeouts(&mut self, now: Instant) -> usize {
        let expired = self.timers.poll_expired(now);
        let mut delivered = 0;

        for timer in expired {
            let session_id = timer.session_id;
            let Some(key) = self.registry.lookup_key(session_id).cloned() else {
                self.stats.record_anomaly();
                error!(
                    %session_id,
                    generation = timer.generation,
                    "cancel on disconnect timeout for unregistered session, discarded"
                );
                continue;
            };

            let transition = match self.registry.expire(session_id) {
                Ok(transition) => transition,
                Err(err) => {
                    self.stats.record_anomaly();
                    error!(%session_id, %key, %err, "cancel on disconnect timeout discarded");
                    continue;
                }
            };

            self.deliver(session_id, timer.generation, &key);
            delivered += 1;
            self.settle(&transition);
        }

        delivered
    }

    /// Returns the session registry.
    #[must_use]
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Returns the timer store.
    #[must_use]
    pub fn timers(&self) -> &CodTimerStore {
        &self.timers
    }

    /// Returns the handler.
    #[must_use]
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Returns the handler mutably.
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &FramerConfig {
        &self.config
    }

    /// Returns the shared counters.
    #[must_use]
    pub fn stats(&self) -> &Arc<FramerStats> {
        &self.stats
    }

    /// Consumes the loop and returns the handler.
    #[must_use]
    pub fn into_handler(self) -> H {
        self.handler
    }

    fn deliver(&mut self, session_id: SurrogateSessionId, generation: u64, key: &CompositeKey) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.handler.on_cancel_on_disconnect_timeout(session_id, key)
        }));
        self.stats.record_delivered();

        let reason = match outcome {
            Ok(Ok(())) => {
                info!(%session_id, %key, generation, "cancel on disconnect timeout delivered");
                return;
            }
            Ok(Err(err)) => err.message,
            Err(payload) => panic_message(payload.as_ref()),
        };

        self.stats.record_handler_failure();
        let err = CodError::HandlerInvocation {
            session_id,
            key: key.clone(),
            reason,
        };
        error!(%session_id, %key, generation, %err, "cancel on disconnect handler failed");
    }

    fn clamp(&self, session_id: SurrogateSessionId, settings: CodSettings) -> CodSettings {
        let clamped = settings.clamped(self.config.max_cod_window);
        if clamped != settings {
            warn!(
                %session_id,
                requested_ms = settings.window.as_millis() as u64,
                max_ms = self.config.max_cod_window.as_millis() as u64,
                "cod timeout window clamped"
            );
        }
        clamped
    }

    fn record(&self, transition: &Transition) {
        if transition.armed.is_some() {
            self.stats.record_armed();
        }
        if transition.cancelled.is_some() {
            self.stats.record_cancelled();
        }
    }

    fn settle(&mut self, transition: &Transition) {
        if !self.config.unregister_on_terminate
            || transition.to != SessionState::Terminated
            || transition.from == SessionState::Terminated
        {
            return;
        }
        if let Err(err) = self.unregister(transition.session_id) {
            self.stats.record_anomaly();
            error!(session_id = %transition.session_id, %err, "failed to unregister terminated session");
        }
    }

    fn respond(&self, command: &str, result: Result<SurrogateSessionId>, reply: Option<Reply>) {
        self.stats.record_event();
        if let Err(err) = &result {
            self.stats.record_rejected();
            warn!(command, %err, "session command rejected");
        }
        if let Some(reply) = reply
            && reply.send(result).is_err()
        {
            debug!(command, "reply receiver dropped");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("handler panicked: {message}")
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{HandlerError, HandlerResult};
    use crossbeam_channel::bounded;
    use ironcod_core::cod::CancelOnDisconnectType;
    use ironcod_core::types::CompId;
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct Recorder {
        calls: Vec<(SurrogateSessionId, CompositeKey)>,
        fail_with: Option<&'static str>,
        panic_with: Option<&'static str>,
    }

    impl CancelOnDisconnectTimeoutHandler for Recorder {
        fn on_cancel_on_disconnect_timeout(
            &mut self,
            session_id: SurrogateSessionId,
            fix_session_key: &CompositeKey,
        ) -> HandlerResult {
            self.calls.push((session_id, fix_session_key.clone()));
            if let Some(message) = self.panic_with {
                panic!("{message}");
            }
            match self.fail_with {
                Some(message) => Err(HandlerError::new(message)),
                None => Ok(()),
            }
        }
    }

    fn key(remote: &str) -> CompositeKey {
        CompositeKey::new(CompId::new("EXCH").unwrap(), CompId::new(remote).unwrap())
    }

    fn cod(cod_type: CancelOnDisconnectType, secs: u64) -> CodSettings {
        CodSettings::new(cod_type, Duration::from_secs(secs))
    }

    fn logged_on(
        control: &mut ControlLoop<Recorder>,
        remote: &str,
        settings: CodSettings,
        now: Instant,
    ) -> SurrogateSessionId {
        let id = control.register(key(remote), now).unwrap();
        control
            .apply_event(id, SessionEvent::LogonAccepted(settings), now)
            .unwrap();
        id
    }

    #[test]
    fn test_timeout_delivered_once() {
        let t0 = Instant::now();
        let mut control = ControlLoop::new(Recorder::default(), FramerConfig::new());
        let id = logged_on(
            &mut control,
            "FIRM",
            cod(CancelOnDisconnectType::CancelOnDisconnect, 30),
            t0,
        );

        control.run_batch([FramerCommand::transport_disconnected(id)], t0);
        assert_eq!(control.poll_timeouts(t0 + Duration::from_secs(29)), 0);
        assert_eq!(control.poll_timeouts(t0 + Duration::from_secs(30)), 1);
        assert_eq!(control.poll_timeouts(t0 + Duration::from_secs(90)), 0);

        assert_eq!(control.handler().calls, vec![(id, key("FIRM"))]);
        assert_eq!(control.registry().state(id), Some(SessionState::Terminated));

        let stats = control.stats().snapshot();
        assert_eq!(stats.timers_armed, 1);
        assert_eq!(stats.timeouts_delivered, 1);
        assert_eq!(stats.handler_failures, 0);
    }

    #[test]
    fn test_handler_error_is_swallowed() {
        let t0 = Instant::now();
        let recorder = Recorder {
            fail_with: Some("gateway down"),
            ..Recorder::default()
        };
        let mut control = ControlLoop::new(recorder, FramerConfig::new());
        let a = logged_on(
            &mut control,
            "A",
            cod(CancelOnDisconnectType::CancelOnEither, 1),
            t0,
        );
        let b = logged_on(
            &mut control,
            "B",
            cod(CancelOnDisconnectType::CancelOnEither, 1),
            t0,
        );

        control.run_batch(
            [
                FramerCommand::logout_received(a),
                FramerCommand::transport_disconnected(b),
            ],
            t0,
        );
        assert_eq!(control.poll_timeouts(t0 + Duration::from_secs(1)), 2);

        assert_eq!(control.handler().calls.len(), 2);
        assert_eq!(control.registry().state(a), Some(SessionState::Terminated));
        assert_eq!(control.registry().state(b), Some(SessionState::Terminated));
        assert_eq!(control.stats().snapshot().handler_failures, 2);
        assert_eq!(control.poll_timeouts(t0 + Duration::from_secs(5)), 0);
    }

    #[test]
    fn test_handler_panic_is_caught() {
        let t0 = Instant::now();
        let recorder = Recorder {
            panic_with: Some("handler bug"),
            ..Recorder::default()
        };
        let mut control = ControlLoop::new(recorder, FramerConfig::new());
        let id = logged_on(
            &mut control,
            "FIRM",
            cod(CancelOnDisconnectType::CancelOnDisconnect, 1),
            t0,
        );

        control.run_batch([FramerCommand::transport_disconnected(id)], t0);
        control.run_batch([FramerCommand::Tick], t0 + Duration::from_secs(2));

        assert_eq!(control.handler().calls.len(), 1);
        assert_eq!(control.registry().state(id), Some(SessionState::Terminated));
        assert_eq!(control.stats().snapshot().handler_failures, 1);
    }

    #[test]
    fn test_register_reply_and_collision_reject() {
        let t0 = Instant::now();
        let mut control = ControlLoop::new(Recorder::default(), FramerConfig::new());
        let (tx, rx) = bounded(2);

        control.run_batch(
            [
                FramerCommand::Register {
                    key: key("FIRM"),
                    reply: Some(tx.clone()),
                },
                FramerCommand::Register {
                    key: key("FIRM"),
                    reply: Some(tx),
                },
            ],
            t0,
        );

        let first = rx.recv().unwrap().unwrap();
        let second = rx.recv().unwrap().unwrap_err();
        assert_eq!(
            second,
            CodError::DuplicateSession {
                key: key("FIRM"),
                existing: first,
            }
        );
        assert_eq!(control.stats().snapshot().events_rejected, 1);
    }

    #[test]
    fn test_collision_supersede_cancels_without_notifying() {
        let t0 = Instant::now();
        let config = FramerConfig::new().with_collision_policy(CollisionPolicy::SupersedeOld);
        let mut control = ControlLoop::new(Recorder::default(), config);
        let old = logged_on(
            &mut control,
            "FIRM",
            cod(CancelOnDisconnectType::CancelOnDisconnect, 5),
            t0,
        );
        control
            .apply_event(old, SessionEvent::TransportDisconnected, t0)
            .unwrap();
        assert!(control.timers().is_armed(old));

        let new = control.register(key("FIRM"), t0).unwrap();
        assert_eq!(control.registry().state(new), Some(SessionState::Connected));
        assert_eq!(control.registry().lookup_id(&key("FIRM")), Some(new));
        assert!(control.timers().is_empty());

        assert_eq!(control.poll_timeouts(t0 + Duration::from_secs(10)), 0);
        assert!(control.handler().calls.is_empty());
    }

    #[test]
    fn test_unknown_session_event_is_dropped() {
        let t0 = Instant::now();
        let mut control = ControlLoop::new(Recorder::default(), FramerConfig::new());

        let control_flow = control.run_batch(
            [FramerCommand::transport_disconnected(SurrogateSessionId::new(42))],
            t0,
        );
        assert_eq!(control_flow, LoopControl::Continue);

        let stats = control.stats().snapshot();
        assert_eq!(stats.events_processed, 1);
        assert_eq!(stats.events_rejected, 1);
    }

    #[test]
    fn test_reconnect_by_key() {
        let t0 = Instant::now();
        let mut control = ControlLoop::new(Recorder::default(), FramerConfig::new());
        let id = logged_on(
            &mut control,
            "FIRM",
            cod(CancelOnDisconnectType::CancelOnDisconnect, 30),
            t0,
        );
        control
            .apply_event(id, SessionEvent::TransportDisconnected, t0)
            .unwrap();

        let renewed = cod(CancelOnDisconnectType::CancelOnLogout, 10);
        let reconnected = control
            .reconnect(&key("FIRM"), renewed, t0 + Duration::from_secs(29))
            .unwrap();
        assert_eq!(reconnected, id);
        assert_eq!(control.registry().settings(id), Some(renewed));
        assert!(control.timers().is_empty());

        let err = control
            .reconnect(&key("OTHER"), renewed, t0)
            .unwrap_err();
        assert_eq!(err, CodError::UnknownKey { key: key("OTHER") });
    }

    #[test]
    fn test_reconnect_after_timeout_is_rejected() {
        let t0 = Instant::now();
        let mut control = ControlLoop::new(Recorder::default(), FramerConfig::new());
        let id = logged_on(
            &mut control,
            "FIRM",
            cod(CancelOnDisconnectType::CancelOnDisconnect, 1),
            t0,
        );
        control.run_batch([FramerCommand::transport_disconnected(id)], t0);
        control.run_batch([FramerCommand::Tick], t0 + Duration::from_secs(1));

        let err = control
            .reconnect(&key("FIRM"), CodSettings::none(), t0 + Duration::from_secs(2))
            .unwrap_err();
        assert!(matches!(err, CodError::InvalidTransition { .. }));

        let again = control.register(key("FIRM"), t0 + Duration::from_secs(2)).unwrap();
        assert_eq!(again, id);
        assert_eq!(control.handler().calls.len(), 1);
    }

    #[test]
    fn test_window_is_clamped() {
        let t0 = Instant::now();
        let config = FramerConfig::new().with_max_cod_window(Duration::from_secs(60));
        let mut control = ControlLoop::new(Recorder::default(), config);
        let id = logged_on(
            &mut control,
            "FIRM",
            cod(CancelOnDisconnectType::CancelOnDisconnect, 3600),
            t0,
        );

        assert_eq!(
            control.registry().settings(id).map(|s| s.window),
            Some(Duration::from_secs(60))
        );
        control
            .apply_event(id, SessionEvent::TransportDisconnected, t0)
            .unwrap();
        assert_eq!(
            control.timers().deadline(id),
            Some(t0 + Duration::from_secs(60))
        );
    }

    #[test]
    fn test_unregister_on_terminate() {
        let t0 = Instant::now();
        let config = FramerConfig::new().with_unregister_on_terminate(true);
        let mut control = ControlLoop::new(Recorder::default(), config);
        let a = logged_on(
            &mut control,
            "A",
            cod(CancelOnDisconnectType::CancelOnDisconnect, 1),
            t0,
        );
        let b = logged_on(&mut control, "B", CodSettings::none(), t0);

        control.run_batch(
            [
                FramerCommand::transport_disconnected(a),
                FramerCommand::transport_disconnected(b),
            ],
            t0,
        );
        assert!(!control.registry().contains(b));
        assert!(control.registry().contains(a));

        control.run_batch([FramerCommand::Tick], t0 + Duration::from_secs(1));
        assert!(control.registry().is_empty());
        assert_eq!(control.handler().calls, vec![(a, key("A"))]);
    }

    #[test]
    fn test_unregister_command() {
        let t0 = Instant::now();
        let mut control = ControlLoop::new(Recorder::default(), FramerConfig::new());
        let id = logged_on(&mut control, "FIRM", CodSettings::none(), t0);

        control.run_batch([FramerCommand::Unregister { session_id: id }], t0);
        assert!(control.registry().contains(id));
        assert_eq!(control.stats().snapshot().events_rejected, 1);

        control.run_batch(
            [
                FramerCommand::terminate(id),
                FramerCommand::Unregister { session_id: id },
            ],
            t0,
        );
        assert!(!control.registry().contains(id));
    }

    #[test]
    fn test_unrepresentable_deadline_does_not_stop_loop() {
        let t0 = Instant::now();
        let config = FramerConfig::new().with_max_cod_window(Duration::MAX);
        let mut control = ControlLoop::new(Recorder::default(), config);
        let id = logged_on(
            &mut control,
            "FIRM",
            CodSettings::new(CancelOnDisconnectType::CancelOnDisconnect, Duration::MAX),
            t0,
        );

        let control_flow = control.run_batch([FramerCommand::transport_disconnected(id)], t0);
        assert_eq!(control_flow, LoopControl::Continue);
        assert_eq!(control.registry().state(id), Some(SessionState::LoggedOn));
        assert!(control.timers().is_empty());
        assert_eq!(control.stats().snapshot().events_rejected, 1);

        control.run_batch([FramerCommand::terminate(id)], t0);
        assert_eq!(control.registry().state(id), Some(SessionState::Terminated));
    }

    #[test]
    fn test_timer_for_unregistered_session_is_discarded() {
        let t0 = Instant::now();
        let mut control = ControlLoop::new(Recorder::default(), FramerConfig::new());
        let orphan = SurrogateSessionId::new(42);
        control.timers.arm(orphan, t0);

        assert_eq!(control.poll_timeouts(t0 + Duration::from_secs(1)), 0);
        assert!(control.handler().calls.is_empty());
        assert!(control.timers().is_empty());

        let stats = control.stats().snapshot();
        assert_eq!(stats.anomalies, 1);
        assert_eq!(stats.timeouts_delivered, 0);
    }

    #[test]
    fn test_timer_for_session_not_awaiting_reconnect_is_discarded() {
        let t0 = Instant::now();
        let mut control = ControlLoop::new(Recorder::default(), FramerConfig::new());
        let id = logged_on(&mut control, "FIRM", CodSettings::none(), t0);
        control.timers.arm(id, t0);

        assert_eq!(control.poll_timeouts(t0), 0);
        assert!(control.handler().calls.is_empty());
        assert_eq!(control.registry().state(id), Some(SessionState::LoggedOn));
        assert_eq!(control.stats().snapshot().anomalies, 1);
    }

    #[test]
    fn test_shutdown_drops_trailing_commands() {
        let t0 = Instant::now();
        let mut control = ControlLoop::new(Recorder::default(), FramerConfig::new());
        let (tx, rx) = bounded(1);

        let control_flow = control.run_batch(
            [
                FramerCommand::Shutdown,
                FramerCommand::Register {
                    key: key("FIRM"),
                    reply: Some(tx),
                },
            ],
            t0,
        );

        assert_eq!(control_flow, LoopControl::Shutdown);
        assert!(rx.recv().is_err());
        assert!(control.registry().is_empty());
    }
}
