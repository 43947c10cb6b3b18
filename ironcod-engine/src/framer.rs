/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! The framer thread.
//!
//! ```text
//! ┌─────────────────┐   bounded queue    ┌──────────────────────────┐
//! │ Session layer   │ ─────────────────▶ │      Framer thread       │
//! │ (any thread)    │   FramerCommand    │  registry + timer store  │
//! └─────────────────┘                    │            │             │
//! ┌─────────────────┐   tick channel     │            ▼             │
//! │ crossbeam tick  │ ─────────────────▶ │  timeout handler (sync)  │
//! └─────────────────┘                    └──────────────────────────┘
//! ```
//!
//! The thread blocks until a command or a tick arrives, drains whatever else
//! is queued up to the batch limit, and hands the batch to the
//! [`ControlLoop`].

use crate::command::{FramerCommand, Reply};
use crate::config::FramerConfig;
use crate::control::{ControlLoop, LoopControl};
use crate::handler::CancelOnDisconnectTimeoutHandler;
use crate::stats::{FramerStats, StatsSnapshot};
use crossbeam_channel::{Receiver, Sender, bounded, select, tick};
use ironcod_core::cod::CodSettings;
use ironcod_core::error::{CodError, Result};
use ironcod_core::types::{CompositeKey, SurrogateSessionId};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// A running framer thread.
#[derive(Debug)]
pub struct Framer<H> {
    handle: FramerHandle,
    thread: JoinHandle<ControlLoop<H>>,
}

impl<H> Framer<H>
where
    H: CancelOnDisconnectTimeoutHandler + 'static,
{
    /// Starts the framer thread.
    ///
    /// # Errors
    /// Returns `CodError::Configuration` if the configuration is invalid or
    /// the thread cannot be spawned.
    pub fn spawn(handler: H, config: FramerConfig) -> Result<Self> {
        config.validate()?;

        let (sender, receiver) = bounded(config.queue_capacity);
        let stats = Arc::new(FramerStats::new());
        let control = ControlLoop::with_stats(handler, config.clone(), Arc::clone(&stats));

        let thread = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || run(control, receiver))
            .map_err(|err| {
                CodError::Configuration(format!("failed to spawn framer thread: {err}"))
            })?;

        info!(thread = %config.thread_name, "framer started");
        Ok(Self {
            handle: FramerHandle { sender, stats },
            thread,
        })
    }

    /// Returns a new producer handle.
    #[must_use]
    pub fn handle(&self) -> FramerHandle {
        self.handle.clone()
    }

    /// Requests shutdown and waits for the thread to finish.
    ///
    /// Commands queued before the shutdown request are processed first.
    ///
    /// # Returns
    /// The control loop with its final registry and timer state.
    ///
    /// # Errors
    /// Returns `CodError::FramerStopped` if the thread panicked.
    pub fn shutdown(self) -> Result<ControlLoop<H>> {
        // The thread may already be gone; joining reports that.
        let _ = self.handle.shutdown();
        self.thread.join().map_err(|_| {
            error!("framer thread panicked");
            CodError::FramerStopped
        })
    }
}

fn run<H: CancelOnDisconnectTimeoutHandler>(
    mut control: ControlLoop<H>,
    commands: Receiver<FramerCommand>,
) -> ControlLoop<H> {
    let ticker = tick(control.config().tick_interval);
    let max_batch_size = control.config().max_batch_size;
    let mut batch = Vec::with_capacity(max_batch_size);

    loop {
        select! {
            recv(commands) -> command => match command {
                Ok(command) => batch.push(command),
                Err(_) => {
                    info!("framer queue closed, stopping");
                    break;
                }
            },
            recv(ticker) -> _ => {}
        }

        while batch.len() < max_batch_size {
            match commands.try_recv() {
                Ok(command) => batch.push(command),
                Err(_) => break,
            }
        }

        if control.run_batch(batch.drain(..), Instant::now()) == LoopControl::Shutdown {
            break;
        }
    }

    info!("framer stopped");
    control
}

/// Cloneable producer side of the framer queue.
#[derive(Debug, Clone)]
pub struct FramerHandle {
    sender: Sender<FramerCommand>,
    stats: Arc<FramerStats>,
}

impl FramerHandle {
    /// Enqueues a command, blocking while the queue is full.
    ///
    /// # Errors
    /// Returns `CodError::FramerStopped` if the framer has exited.
    pub fn send(&self, command: FramerCommand) -> Result<()> {
        self.sender
            .send(command)
            .map_err(|_| CodError::FramerStopped)
    }

    /// Enqueues a command, waiting at most `timeout` for queue space.
    ///
    /// # Errors
    /// Returns `CodError::FramerStopped` if the framer has exited or the queue
    /// stayed full.
    pub fn send_timeout(&self, command: FramerCommand, timeout: Duration) -> Result<()> {
        self.sender
            .send_timeout(command, timeout)
            .map_err(|_| CodError::FramerStopped)
    }

    /// Registers a newly authenticated session and waits for its id.
    ///
    /// Must not be called from the timeout handler.
    ///
    /// # Errors
    /// Returns `CodError::DuplicateSession` on a rejected collision and
    /// `CodError::FramerStopped` if the framer has exited.
    pub fn register(&self, key: CompositeKey) -> Result<SurrogateSessionId> {
        self.request(|reply| FramerCommand::Register {
            key,
            reply: Some(reply),
        })
    }

    /// Reports a logon from an already registered key and waits for its id.
    ///
    /// Must not be called from the timeout handler.
    ///
    /// # Errors
    /// Returns `CodError::UnknownKey`, `CodError::InvalidTransition` or
    /// `CodError::FramerStopped`.
    pub fn reconnected(
        &self,
        key: CompositeKey,
        settings: CodSettings,
    ) -> Result<SurrogateSessionId> {
        self.request(|reply| FramerCommand::Reconnect {
            key,
            settings,
            reply: Some(reply),
        })
    }

    /// Reports an accepted logon.
    ///
    /// # Errors
    /// Returns `CodError::FramerStopped` if the framer has exited.
    pub fn logon_accepted(&self, session_id: SurrogateSessionId, settings: CodSettings) -> Result<()> {
        self.send(FramerCommand::logon_accepted(session_id, settings))
    }

    /// Reports a received Logout.
    ///
    /// # Errors
    /// Returns `CodError::FramerStopped` if the framer has exited.
    pub fn logout_received(&self, session_id: SurrogateSessionId) -> Result<()> {
        self.send(FramerCommand::logout_received(session_id))
    }

    /// Reports a closed transport.
    ///
    /// # Errors
    /// Returns `CodError::FramerStopped` if the framer has exited.
    pub fn transport_disconnected(&self, session_id: SurrogateSessionId) -> Result<()> {
        self.send(FramerCommand::transport_disconnected(session_id))
    }

    /// Requests explicit teardown of a session.
    ///
    /// # Errors
    /// Returns `CodError::FramerStopped` if the framer has exited.
    pub fn terminate(&self, session_id: SurrogateSessionId) -> Result<()> {
        self.send(FramerCommand::terminate(session_id))
    }

    /// Requests removal of a terminated session.
    ///
    /// # Errors
    /// Returns `CodError::FramerStopped` if the framer has exited.
    pub fn unregister(&self, session_id: SurrogateSessionId) -> Result<()> {
        self.send(FramerCommand::Unregister { session_id })
    }

    /// Wakes the framer for an expiry scan.
    ///
    /// # Errors
    /// Returns `CodError::FramerStopped` if the framer has exited.
    pub fn tick(&self) -> Result<()> {
        self.send(FramerCommand::Tick)
    }

    /// Asks the framer to stop after the commands already queued.
    ///
    /// # Errors
    /// Returns `CodError::FramerStopped` if the framer has exited.
    pub fn shutdown(&self) -> Result<()> {
        self.send(FramerCommand::Shutdown)
    }

    /// Returns a copy of the framer counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    fn request<F>(&self, build: F) -> Result<SurrogateSessionId>
    where
        F: FnOnce(Reply) -> FramerCommand,
    {
        let (reply, response) = bounded(1);
        self.send(build(reply))?;
        response.recv().unwrap_or_else(|_| {
            debug!("framer dropped reply channel");
            Err(CodError::FramerStopped)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{HandlerResult, NoOpTimeoutHandler};
    use ironcod_core::cod::CancelOnDisconnectType;
    use ironcod_core::types::CompId;
    use ironcod_session::state::SessionState;

    const WAIT: Duration = Duration::from_secs(5);

    fn key(remote: &str) -> CompositeKey {
        CompositeKey::new(CompId::new("EXCH").unwrap(), CompId::new(remote).unwrap())
    }

    fn fast_config() -> FramerConfig {
        FramerConfig::new().with_tick_interval(Duration::from_millis(5))
    }

    #[test]
    fn test_spawn_rejects_invalid_config() {
        let result = Framer::spawn(NoOpTimeoutHandler, FramerConfig::new().with_queue_capacity(0));
        assert!(matches!(result, Err(CodError::Configuration(_))));
    }

    #[test]
    fn test_register_and_shutdown() {
        let framer = Framer::spawn(NoOpTimeoutHandler, fast_config()).unwrap();
        let handle = framer.handle();

        let id = handle.register(key("FIRM")).unwrap();
        assert!(matches!(
            handle.register(key("FIRM")),
            Err(CodError::DuplicateSession { .. })
        ));
        handle
            .logon_accepted(id, CodSettings::none())
            .unwrap();

        let control = framer.shutdown().unwrap();
        assert_eq!(control.registry().state(id), Some(SessionState::LoggedOn));
        assert!(matches!(
            handle.register(key("OTHER")),
            Err(CodError::FramerStopped)
        ));
    }

    #[test]
    fn test_timeout_fires_on_framer_thread() {
        let (fired_tx, fired_rx) = bounded(4);
        let handler = move |session_id: SurrogateSessionId, key: &CompositeKey| -> HandlerResult {
            let thread_name = thread::current().name().map(str::to_owned);
            fired_tx
                .send((session_id, key.clone(), thread_name))
                .map_err(|err| crate::handler::HandlerError::new(err.to_string()))
        };

        let framer = Framer::spawn(handler, fast_config().with_thread_name("cod-test")).unwrap();
        let handle = framer.handle();

        let id = handle.register(key("FIRM")).unwrap();
        handle
            .logon_accepted(
                id,
                CodSettings::new(
                    CancelOnDisconnectType::CancelOnDisconnect,
                    Duration::from_millis(20),
                ),
            )
            .unwrap();
        handle.transport_disconnected(id).unwrap();

        let (fired_id, fired_key, thread_name) = fired_rx.recv_timeout(WAIT).unwrap();
        assert_eq!(fired_id, id);
        assert_eq!(fired_key, key("FIRM"));
        assert_eq!(thread_name.as_deref(), Some("cod-test"));

        let control = framer.shutdown().unwrap();
        assert_eq!(control.registry().state(id), Some(SessionState::Terminated));
        assert!(fired_rx.try_recv().is_err());
        assert_eq!(handle.stats().timeouts_delivered, 1);
    }
}
