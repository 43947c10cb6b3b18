/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Cancel-on-disconnect timer store.
//!
//! Holds at most one pending timeout per session. Every arm and every
//! effective cancel bumps a per-session generation counter, and only an entry
//! whose generation matches the current one can be returned by
//! [`CodTimerStore::poll_expired`]. Expired entries are removed by the same
//! scan that returns them, so no entry is ever delivered twice.
//!
//! Generations are kept after a session is unregistered. A recycled surrogate
//! id therefore continues from its previous generation and a
//! `(session_id, generation)` pair is never repeated within the process.

use ironcod_core::types::SurrogateSessionId;
use std::collections::{BTreeSet, HashMap};
use std::time::Instant;
use tracing::{error, trace};

/// A pending timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerEntry {
    /// Session the timeout belongs to.
    pub session_id: SurrogateSessionId,
    /// Instant at which the timeout fires.
    pub deadline: Instant,
    /// Generation assigned when the entry was armed.
    pub generation: u64,
}

/// A timeout returned by [`CodTimerStore::poll_expired`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiredTimer {
    /// Session the timeout belongs to.
    pub session_id: SurrogateSessionId,
    /// Generation of the entry at expiry.
    pub generation: u64,
    /// Deadline the entry was armed with.
    pub deadline: Instant,
}

/// Store of pending cancel-on-disconnect timeouts.
#[derive(Debug, Default)]
pub struct CodTimerStore {
    /// Live entries indexed by session.
    entries: HashMap<SurrogateSessionId, TimerEntry>,
    /// Deadline order; ties resolve by ascending session id.
    schedule: BTreeSet<(Instant, SurrogateSessionId)>,
    /// Current generation per session, never removed.
    generations: HashMap<SurrogateSessionId, u64>,
}

impl CodTimerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a timeout for a session, replacing any live entry.
    ///
    /// # Arguments
    /// * `session_id` - The session to arm
    /// * `deadline` - Instant at which the timeout fires
    ///
    /// # Returns
    /// The generation of the new entry.
    pub fn arm(&mut self, session_id: SurrogateSessionId, deadline: Instant) -> u64 {
        let generation = self.bump(session_id);
        let entry = TimerEntry {
            session_id,
            deadline,
            generation,
        };

        if let Some(previous) = self.entries.insert(session_id, entry) {
            self.schedule.remove(&(previous.deadline, session_id));
            trace!(
                %session_id,
                superseded_generation = previous.generation,
                "re-armed cancel on disconnect timer"
            );
        }
        self.schedule.insert((deadline, session_id));

        trace!(%session_id, generation, "armed cancel on disconnect timer");
        generation
    }

    /// Cancels the pending timeout of a session.
    ///
    /// Cancelling a session without a live entry is a no-op and does not
    /// change its generation.
    ///
    /// # Returns
    /// The bumped generation if an entry was removed, `None` otherwise.
    pub fn cancel(&mut self, session_id: SurrogateSessionId) -> Option<u64> {
        let entry = self.entries.remove(&session_id)?;
        self.schedule.remove(&(entry.deadline, session_id));
        let generation = self.bump(session_id);

        trace!(
            %session_id,
            cancelled_generation = entry.generation,
            generation,
            "cancelled cancel on disconnect timer"
        );
        Some(generation)
    }

    /// Removes and returns every entry whose deadline is at or before `now`.
    ///
    /// Entries are returned in deadline order, ties broken by ascending
    /// session id.
    pub fn poll_expired(&mut self, now: Instant) -> Vec<ExpiredTimer> {
        let mut expired = Vec::new();

        while let Some(&(deadline, session_id)) = self.schedule.first() {
            if deadline > now {
                break;
            }
            self.schedule.pop_first();

            let Some(entry) = self.entries.remove(&session_id) else {
                error!(%session_id, "scheduled timer without a live entry, discarding");
                continue;
            };

            let current = self.current_generation(session_id);
            if entry.generation != current || entry.deadline != deadline {
                error!(
                    %session_id,
                    generation = entry.generation,
                    current,
                    "stale timer entry reached expiry, discarding"
                );
                continue;
            }

            expired.push(ExpiredTimer {
                session_id,
                generation: entry.generation,
                deadline,
            });
        }

        expired
    }

    /// Returns the live entry of a session, if any.
    #[must_use]
    pub fn entry(&self, session_id: SurrogateSessionId) -> Option<&TimerEntry> {
        self.entries.get(&session_id)
    }

    /// Returns the deadline of a session's live entry, if any.
    #[must_use]
    pub fn deadline(&self, session_id: SurrogateSessionId) -> Option<Instant> {
        self.entries.get(&session_id).map(|entry| entry.deadline)
    }

    /// Returns true if the session has a live entry.
    #[must_use]
    pub fn is_armed(&self, session_id: SurrogateSessionId) -> bool {
        self.entries.contains_key(&session_id)
    }

    /// Returns the current generation of a session, `0` if it was never armed.
    #[must_use]
    pub fn current_generation(&self, session_id: SurrogateSessionId) -> u64 {
        self.generations.get(&session_id).copied().unwrap_or(0)
    }

    /// Returns the earliest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.schedule.first().map(|&(deadline, _)| deadline)
    }

    /// Returns the number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entry is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn bump(&mut self, session_id: SurrogateSessionId) -> u64 {
        let generation = self.generations.entry(session_id).or_insert(0);
        *generation += 1;
        *generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn id(value: u64) -> SurrogateSessionId {
        SurrogateSessionId::new(value)
    }

    #[test]
    fn test_arm_and_poll() {
        let t0 = Instant::now();
        let mut store = CodTimerStore::new();

        let generation = store.arm(id(1), t0 + Duration::from_secs(30));
        assert_eq!(generation, 1);
        assert!(store.is_armed(id(1)));
        assert_eq!(store.deadline(id(1)), Some(t0 + Duration::from_secs(30)));

        assert!(store.poll_expired(t0 + Duration::from_secs(29)).is_empty());

        let expired = store.poll_expired(t0 + Duration::from_secs(30));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].session_id, id(1));
        assert_eq!(expired[0].generation, 1);
        assert!(store.is_empty());

        assert!(store.poll_expired(t0 + Duration::from_secs(60)).is_empty());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let t0 = Instant::now();
        let mut store = CodTimerStore::new();

        assert_eq!(store.cancel(id(1)), None);
        assert_eq!(store.current_generation(id(1)), 0);

        store.arm(id(1), t0 + Duration::from_secs(1));
        assert_eq!(store.cancel(id(1)), Some(2));
        assert_eq!(store.cancel(id(1)), None);
        assert_eq!(store.current_generation(id(1)), 2);

        assert!(store.poll_expired(t0 + Duration::from_secs(10)).is_empty());
    }

    #[test]
    fn test_rearm_supersedes() {
        let t0 = Instant::now();
        let mut store = CodTimerStore::new();

        store.arm(id(4), t0 + Duration::from_secs(10));
        let generation = store.arm(id(4), t0 + Duration::from_secs(13));
        assert_eq!(generation, 2);
        assert_eq!(store.len(), 1);

        assert!(store.poll_expired(t0 + Duration::from_secs(10)).is_empty());

        let expired = store.poll_expired(t0 + Duration::from_secs(13));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].generation, 2);
    }

    #[test]
    fn test_poll_order_by_deadline_then_id() {
        let t0 = Instant::now();
        let mut store = CodTimerStore::new();

        store.arm(id(9), t0 + Duration::from_secs(2));
        store.arm(id(3), t0 + Duration::from_secs(5));
        store.arm(id(1), t0 + Duration::from_secs(5));
        store.arm(id(7), t0 + Duration::from_secs(1));
        store.arm(id(8), t0 + Duration::from_secs(60));

        assert_eq!(store.next_deadline(), Some(t0 + Duration::from_secs(1)));

        let order: Vec<_> = store
            .poll_expired(t0 + Duration::from_secs(5))
            .into_iter()
            .map(|timer| timer.session_id.value())
            .collect();
        assert_eq!(order, vec![7, 9, 1, 3]);
        assert_eq!(store.len(), 1);
        assert!(store.is_armed(id(8)));
    }

    #[test]
    fn test_generation_survives_expiry() {
        let t0 = Instant::now();
        let mut store = CodTimerStore::new();

        store.arm(id(2), t0);
        assert_eq!(store.poll_expired(t0).len(), 1);

        let generation = store.arm(id(2), t0 + Duration::from_secs(1));
        assert_eq!(generation, 2);
        assert_eq!(store.entry(id(2)).map(|entry| entry.generation), Some(2));
    }
}
