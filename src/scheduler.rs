use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Duration;
use tokio::time::Instant;

/// How soon a table's next step comes due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Immediate,
    Delayed(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Slot {
    due: Instant,
    seq: u64,
    table: usize,
    generation: u64,
}

/// Due-time ordered run queue. Ties run in the order they were queued.
#[derive(Default)]
pub struct Scheduler {
    queue: BinaryHeap<Reverse<Slot>>,
    seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, table: usize, generation: u64, policy: Policy, now: Instant) {
        let due = match policy {
            Policy::Immediate => now,
            Policy::Delayed(delay) => now + delay,
        };
        self.seq += 1;
        self.queue.push(Reverse(Slot {
            due,
            seq: self.seq,
            table,
            generation,
        }));
    }

    /// Pops the earliest slot that is due at `now`, as `(table, generation)`.
    pub fn pop_due(&mut self, now: Instant) -> Option<(usize, u64)> {
        match self.queue.peek() {
            Some(Reverse(slot)) if slot.due <= now => {
                let Reverse(slot) = self.queue.pop()?;
                Some((slot.table, slot.generation))
            }
            _ => None,
        }
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.queue.peek().map(|Reverse(slot)| slot.due)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
