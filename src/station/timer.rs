use std::{cmp::Reverse, time::Instant};

use keyed_priority_queue::KeyedPriorityQueue;

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum TimerId {
    /// Retransmission timer of a sender slot.
    Data(usize),
    /// The shared deferred acknowledgment timer.
    Ack,
}

/// Deadlines of every armed timer, earliest first.
pub struct TimerQueue {
    deadlines: KeyedPriorityQueue<TimerId, Reverse<Instant>>,
}

impl TimerQueue {
    #[must_use]
    pub fn new() -> Self {
        TimerQueue {
            deadlines: KeyedPriorityQueue::new(),
        }
    }

    /// Arming an armed timer restarts its countdown.
    pub fn arm(&mut self, id: TimerId, deadline: Instant) {
        self.deadlines.push(id, Reverse(deadline));
    }

    pub fn cancel(&mut self, id: TimerId) {
        self.deadlines.remove(&id);
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.peek().map(|(_, x)| x.0)
    }

    /// Disarms and returns the earliest timer due at `now`.
    pub fn pop_expired(&mut self, now: Instant) -> Option<TimerId> {
        let deadline = self.next_deadline()?;
        if now < deadline {
            return None;
        }
        self.deadlines.pop().map(|(id, _)| id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_order() {
        let now = Instant::now();
        let mut timers = TimerQueue::new();
        timers.arm(TimerId::Data(3), now + Duration::from_millis(30));
        timers.arm(TimerId::Ack, now + Duration::from_millis(10));
        timers.arm(TimerId::Data(1), now + Duration::from_millis(20));
        assert_eq!(timers.next_deadline(), Some(now + Duration::from_millis(10)));

        assert_eq!(timers.pop_expired(now), None);
        let later = now + Duration::from_millis(25);
        assert_eq!(timers.pop_expired(later), Some(TimerId::Ack));
        assert_eq!(timers.pop_expired(later), Some(TimerId::Data(1)));
        assert_eq!(timers.pop_expired(later), None);
        assert_eq!(timers.len(), 1);
    }

    #[test]
    fn test_rearm() {
        let now = Instant::now();
        let mut timers = TimerQueue::new();
        timers.arm(TimerId::Ack, now + Duration::from_millis(10));
        timers.arm(TimerId::Ack, now + Duration::from_millis(50));
        assert_eq!(timers.len(), 1);
        assert_eq!(timers.next_deadline(), Some(now + Duration::from_millis(50)));
        assert_eq!(timers.pop_expired(now + Duration::from_millis(10)), None);
    }

    #[test]
    fn test_cancel() {
        let now = Instant::now();
        let mut timers = TimerQueue::new();
        timers.cancel(TimerId::Data(0));
        timers.arm(TimerId::Data(0), now);
        timers.cancel(TimerId::Data(0));
        timers.cancel(TimerId::Data(0));
        assert!(timers.is_empty());
        assert_eq!(timers.pop_expired(now), None);
    }
}
