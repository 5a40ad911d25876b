use crate::round::ElementId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which engine time deferred tasks are measured against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timebase {
    /// Keeps running while the session is paused.
    #[default]
    Wall,
    /// Only advances while the session is running.
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredAction {
    ExpireBonus(ElementId),
    DecayMultiplier,
    EndReveal,
    StartNextSequence,
}

#[derive(Debug, Clone)]
struct Deferred {
    due: Duration,
    generation: u64,
    seq: u64,
    action: DeferredAction,
}

/// Fire-once tasks. Entries from an older session generation never fire.
#[derive(Debug, Default)]
pub struct Scheduler {
    pending: Vec<Deferred>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: Duration, generation: u64, action: DeferredAction) {
        self.next_seq += 1;
        self.pending.push(Deferred {
            due,
            generation,
            seq: self.next_seq,
            action,
        });
    }

    /// Removes and returns every task due at `now` with its deadline, oldest first.
    pub fn drain_due(&mut self, now: Duration, generation: u64) -> Vec<(Duration, DeferredAction)> {
        let (mut due, rest): (Vec<Deferred>, Vec<Deferred>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|d| d.due <= now || d.generation != generation);
        self.pending = rest;

        let stale = due.iter().filter(|d| d.generation != generation).count();
        if stale > 0 {
            log::debug!("dropped {stale} stale deferred task(s)");
        }

        due.retain(|d| d.generation == generation);
        due.sort_by_key(|d| (d.due, d.seq));
        due.into_iter().map(|d| (d.due, d.action)).collect()
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn cancel(&mut self, action: DeferredAction) {
        self.pending.retain(|d| d.action != action);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_fires_early() {
        let mut s = Scheduler::new();
        s.schedule(Duration::from_secs(8), 1, DeferredAction::DecayMultiplier);
        assert!(s.drain_due(Duration::from_secs(7), 1).is_empty());
        assert_eq!(s.len(), 1);
        assert_eq!(
            s.drain_due(Duration::from_secs(8), 1),
            vec![(Duration::from_secs(8), DeferredAction::DecayMultiplier)]
        );
        assert!(s.is_empty());
    }

    #[test]
    fn fires_in_deadline_then_insertion_order() {
        let mut s = Scheduler::new();
        s.schedule(Duration::from_secs(5), 1, DeferredAction::ExpireBonus(ElementId(2)));
        s.schedule(Duration::from_secs(3), 1, DeferredAction::DecayMultiplier);
        s.schedule(Duration::from_secs(5), 1, DeferredAction::ExpireBonus(ElementId(1)));
        let fired: Vec<DeferredAction> = s
            .drain_due(Duration::from_secs(10), 1)
            .into_iter()
            .map(|(_, action)| action)
            .collect();
        assert_eq!(
            fired,
            vec![
                DeferredAction::DecayMultiplier,
                DeferredAction::ExpireBonus(ElementId(2)),
                DeferredAction::ExpireBonus(ElementId(1)),
            ]
        );
    }

    #[test]
    fn stale_generations_are_inert() {
        let mut s = Scheduler::new();
        s.schedule(Duration::from_secs(1), 1, DeferredAction::DecayMultiplier);
        s.schedule(Duration::from_secs(60), 1, DeferredAction::EndReveal);
        s.schedule(Duration::from_secs(1), 2, DeferredAction::StartNextSequence);
        assert_eq!(
            s.drain_due(Duration::from_secs(2), 2),
            vec![(Duration::from_secs(1), DeferredAction::StartNextSequence)]
        );
        // the far-future stale entry was dropped too
        assert!(s.is_empty());
    }

    #[test]
    fn multiple_decays_are_independent() {
        let mut s = Scheduler::new();
        s.schedule(Duration::from_secs(8), 1, DeferredAction::DecayMultiplier);
        s.schedule(Duration::from_secs(9), 1, DeferredAction::DecayMultiplier);
        assert_eq!(s.drain_due(Duration::from_secs(8), 1).len(), 1);
        assert_eq!(s.drain_due(Duration::from_secs(9), 1).len(), 1);
    }

    #[test]
    fn cancel_by_action_and_all() {
        let mut s = Scheduler::new();
        s.schedule(Duration::from_secs(1), 1, DeferredAction::ExpireBonus(ElementId(4)));
        s.schedule(Duration::from_secs(1), 1, DeferredAction::DecayMultiplier);
        s.cancel(DeferredAction::ExpireBonus(ElementId(4)));
        assert_eq!(s.len(), 1);
        s.cancel_all();
        assert!(s.drain_due(Duration::from_secs(5), 1).is_empty());
    }
}
