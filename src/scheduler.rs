use std::mem;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug)]
struct Pending<A> {
    id: TimerId,
    due: Instant,
    action: A,
}

/// One-shot deferred actions run from the frame loop.
///
/// Nothing here sleeps: the loop asks for whatever is due and handles it in
/// place. An action may outlive the thing it refers to, so whoever handles
/// it must check the target still exists.
#[derive(Debug)]
pub struct Scheduler<A> {
    pending: Vec<Pending<A>>,
    next_id: u64,
}

impl<A> Scheduler<A> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            next_id: 0,
        }
    }

    pub fn schedule(&mut self, due: Instant, action: A) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.push(Pending { id, due, action });
        id
    }

    pub fn schedule_after(&mut self, now: Instant, delay: Duration, action: A) -> TimerId {
        self.schedule(now + delay, action)
    }

    /// Drops a pending action. Returns false if it already ran or never existed.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.id != id);
        self.pending.len() != before
    }

    /// Removes and returns every action due at `now`, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<(TimerId, A)> {
        let (mut ready, waiting): (Vec<_>, Vec<_>) = mem::take(&mut self.pending)
            .into_iter()
            .partition(|p| p.due <= now);
        self.pending = waiting;

        ready.sort_by_key(|p| (p.due, p.id));
        ready.into_iter().map(|p| (p.id, p.action)).collect()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl<A> Default for Scheduler<A> {
    fn default() -> Self {
        Self::new()
    }
}
