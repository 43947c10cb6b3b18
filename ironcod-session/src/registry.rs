/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Session registry.
//!
//! The registry is an arena: a dense slot table indexed by surrogate id plus a
//! hash map from composite key to surrogate id. It is the only place session
//! state is stored. State changes go through [`SessionRegistry::transition`],
//! which also arms or cancels the session's timeout in the [`CodTimerStore`].

use crate::state::{SessionEvent, SessionState, StateAction};
use crate::timer::CodTimerStore;
use ironcod_core::cod::CodSettings;
use ironcod_core::error::{CodError, Result};
use ironcod_core::types::{CompositeKey, SurrogateSessionId};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Instant;
use tracing::debug;

/// Bookkeeping for one registered session.
#[derive(Debug, Clone)]
struct SessionEntry {
    key: CompositeKey,
    state: SessionState,
    settings: CodSettings,
}

/// A timeout armed by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmedTimer {
    /// Generation returned by the timer store.
    pub generation: u64,
    /// Deadline of the armed entry.
    pub deadline: Instant,
}

/// Result of applying an event to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Session the event was applied to.
    pub session_id: SurrogateSessionId,
    /// State before the event.
    pub from: SessionState,
    /// State after the event.
    pub to: SessionState,
    /// Timeout armed by this transition.
    pub armed: Option<ArmedTimer>,
    /// Generation after cancelling a pending timeout.
    pub cancelled: Option<u64>,
}

impl Transition {
    /// Returns true if the event changed nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.from == self.to && self.armed.is_none() && self.cancelled.is_none()
    }
}

/// Registry of live and recently disconnected sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    /// Slot `n` holds surrogate id `n + 1`.
    slots: Vec<Option<SessionEntry>>,
    /// Reverse index from composite key.
    by_key: HashMap<CompositeKey, SurrogateSessionId>,
    /// Ids released by `unregister`, lowest first.
    free_ids: BinaryHeap<Reverse<u64>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry with room for `capacity` sessions.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            by_key: HashMap::with_capacity(capacity),
            free_ids: BinaryHeap::new(),
        }
    }

    /// Registers a newly authenticated session in the `Connected` state.
    ///
    /// A terminated session still holding the same key is unregistered first.
    ///
    /// # Errors
    /// Returns `CodError::DuplicateSession` if the key belongs to a session
    /// that is not terminated.
    pub fn register(&mut self, key: CompositeKey) -> Result<SurrogateSessionId> {
        if let Some(existing) = self.by_key.get(&key).copied() {
            match self.state(existing) {
                Some(SessionState::Terminated) => {
                    self.unregister(existing)?;
                }
                _ => return Err(CodError::DuplicateSession { key, existing }),
            }
        }

        let session_id = self.allocate_id();
        let slot = self
            .slot_entry(session_id)
            .ok_or(CodError::UnknownSession { session_id })?;
        *slot = Some(SessionEntry {
            key: key.clone(),
            state: SessionState::Connected,
            settings: CodSettings::none(),
        });
        self.by_key.insert(key, session_id);

        debug!(%session_id, "registered session");
        Ok(session_id)
    }

    /// Applies an event to a session.
    ///
    /// Arms the session's timeout on entry to `AwaitingReconnect` and cancels
    /// it on the way out.
    ///
    /// # Arguments
    /// * `session_id` - The session to update
    /// * `event` - The event to apply
    /// * `now` - Current monotonic time, used to compute deadlines
    /// * `timers` - The timer store owned by the same control loop
    ///
    /// # Errors
    /// Returns `CodError::UnknownSession` if the id is not registered,
    /// `CodError::InvalidTransition` if the event is not valid in the
    /// session's state and `CodError::DeadlineOverflow` if the window cannot
    /// be added to `now`. The session is left untouched on error.
    pub fn transition(
        &mut self,
        session_id: SurrogateSessionId,
        event: SessionEvent,
        now: Instant,
        timers: &mut CodTimerStore,
    ) -> Result<Transition> {
        let entry = self
            .slot_mut(session_id)
            .ok_or(CodError::UnknownSession { session_id })?;

        let from = entry.state;
        let action = from
            .on_event(&entry.settings, &event)
            .ok_or_else(|| CodError::InvalidTransition {
                session_id,
                state: from.to_string(),
                event: event.to_string(),
            })?;

        // Settings are fixed for a logon instance; duplicates must not rewrite them.
        let adopts_settings = matches!(
            action,
            StateAction::Enter(SessionState::LoggedOn)
                | StateAction::CancelAndEnter(SessionState::LoggedOn)
        );

        let mut transition = Transition {
            session_id,
            from,
            to: from,
            armed: None,
            cancelled: None,
        };

        match action {
            StateAction::Ignore => {}
            StateAction::Enter(to) => transition.to = to,
            StateAction::Arm(window) => {
                let deadline = now.checked_add(window).ok_or(CodError::DeadlineOverflow {
                    session_id,
                    window_ms: window.as_millis(),
                })?;
                let generation = timers.arm(session_id, deadline);
                transition.to = SessionState::AwaitingReconnect;
                transition.armed = Some(ArmedTimer {
                    generation,
                    deadline,
                });
            }
            StateAction::CancelAndEnter(to) => {
                transition.cancelled = timers.cancel(session_id);
                transition.to = to;
            }
        }

        if adopts_settings
            && let Some(settings) = event.settings()
        {
            entry.settings = settings;
        }
        entry.state = transition.to;

        if transition.is_noop() {
            debug!(%session_id, %event, state = %from, "ignored duplicate session event");
        } else {
            debug!(%session_id, %event, %from, to = %transition.to, "session transition");
        }

        Ok(transition)
    }

    /// Moves a session whose timeout fired from `AwaitingReconnect` to `Terminated`.
    ///
    /// The timer store has already removed the entry, so no timer is touched.
    ///
    /// # Errors
    /// Returns `CodError::UnknownSession` if the id is not registered and
    /// `CodError::InvalidTransition` if the session is not awaiting reconnect.
    pub fn expire(&mut self, session_id: SurrogateSessionId) -> Result<Transition> {
        let entry = self
            .slot_mut(session_id)
            .ok_or(CodError::UnknownSession { session_id })?;

        if entry.state != SessionState::AwaitingReconnect {
            return Err(CodError::InvalidTransition {
                session_id,
                state: entry.state.to_string(),
                event: "COD_TIMEOUT".to_string(),
            });
        }
        entry.state = SessionState::Terminated;

        debug!(%session_id, "session terminated by cancel on disconnect timeout");
        Ok(Transition {
            session_id,
            from: SessionState::AwaitingReconnect,
            to: SessionState::Terminated,
            armed: None,
            cancelled: None,
        })
    }

    /// Removes all bookkeeping for a terminated session and frees its id.
    ///
    /// # Returns
    /// The composite key the session was registered under.
    ///
    /// # Errors
    /// Returns `CodError::UnknownSession` if the id is not registered and
    /// `CodError::NotTerminated` if the session is not terminated.
    pub fn unregister(&mut self, session_id: SurrogateSessionId) -> Result<CompositeKey> {
        let state = self
            .state(session_id)
            .ok_or(CodError::UnknownSession { session_id })?;
        if !state.is_terminated() {
            return Err(CodError::NotTerminated {
                session_id,
                state: state.to_string(),
            });
        }

        let entry = self
            .slot_entry(session_id)
            .and_then(Option::take)
            .ok_or(CodError::UnknownSession { session_id })?;
        self.by_key.remove(&entry.key);
        self.free_ids.push(Reverse(session_id.value()));

        debug!(%session_id, "unregistered session");
        Ok(entry.key)
    }

    /// Looks up the composite key of a registered session.
    #[must_use]
    pub fn lookup_key(&self, session_id: SurrogateSessionId) -> Option<&CompositeKey> {
        self.slot(session_id).map(|entry| &entry.key)
    }

    /// Looks up the surrogate id registered for a composite key.
    #[must_use]
    pub fn lookup_id(&self, key: &CompositeKey) -> Option<SurrogateSessionId> {
        self.by_key.get(key).copied()
    }

    /// Returns the state of a registered session.
    #[must_use]
    pub fn state(&self, session_id: SurrogateSessionId) -> Option<SessionState> {
        self.slot(session_id).map(|entry| entry.state)
    }

    /// Returns the CoD settings of the session's accepted logon.
    #[must_use]
    pub fn settings(&self, session_id: SurrogateSessionId) -> Option<CodSettings> {
        self.slot(session_id).map(|entry| entry.settings)
    }

    /// Returns true if the id is registered.
    #[must_use]
    pub fn contains(&self, session_id: SurrogateSessionId) -> bool {
        self.slot(session_id).is_some()
    }

    /// Returns the number of registered sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Returns true if no session is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Iterates over registered sessions in surrogate id order.
    pub fn iter(&self) -> impl Iterator<Item = (SurrogateSessionId, &CompositeKey, SessionState)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref()
                .map(|entry| (id_for_index(index), &entry.key, entry.state))
        })
    }

    fn allocate_id(&mut self) -> SurrogateSessionId {
        match self.free_ids.pop() {
            Some(Reverse(value)) => SurrogateSessionId::new(value),
            None => {
                self.slots.push(None);
                id_for_index(self.slots.len() - 1)
            }
        }
    }

    fn slot(&self, session_id: SurrogateSessionId) -> Option<&SessionEntry> {
        index_for_id(session_id)
            .and_then(|index| self.slots.get(index))
            .and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, session_id: SurrogateSessionId) -> Option<&mut SessionEntry> {
        index_for_id(session_id)
            .and_then(|index| self.slots.get_mut(index))
            .and_then(Option::as_mut)
    }

    /// Slot for an id handed out by `allocate_id`, occupied or not.
    fn slot_entry(&mut self, session_id: SurrogateSessionId) -> Option<&mut Option<SessionEntry>> {
        index_for_id(session_id).and_then(|index| self.slots.get_mut(index))
    }
}

fn id_for_index(index: usize) -> SurrogateSessionId {
    SurrogateSessionId::new(index as u64 + 1)
}

fn index_for_id(session_id: SurrogateSessionId) -> Option<usize> {
    if !session_id.is_valid() {
        return None;
    }
    usize::try_from(session_id.value() - 1).ok()
}
