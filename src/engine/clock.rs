//! Logical time.

use crate::core::LogicalTime;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ClockError {
    #[error("Clock cannot move backwards (now: {now}, requested: {requested})")]
    NonMonotonic {
        now: LogicalTime,
        requested: LogicalTime,
    },

    #[error("Clock overflow advancing {now} by {delta}")]
    Overflow {
        now: LogicalTime,
        delta: LogicalTime,
    },
}

/// Monotonic logical clock shared by every state of one interpreter.
///
/// The clock only moves when the host says so; `after(n)` guards compare
/// its reading with the entry time of their source state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogicalClock {
    now: LogicalTime,
}

impl LogicalClock {
    pub fn new(start: LogicalTime) -> Self {
        Self { now: start }
    }

    pub fn now(&self) -> LogicalTime {
        self.now
    }

    pub fn advance(&mut self, delta: LogicalTime) -> Result<LogicalTime, ClockError> {
        self.now = self.now.checked_add(delta).ok_or(ClockError::Overflow {
            now: self.now,
            delta,
        })?;
        Ok(self.now)
    }

    pub fn set(&mut self, time: LogicalTime) -> Result<LogicalTime, ClockError> {
        if time < self.now {
            return Err(ClockError::NonMonotonic {
                now: self.now,
                requested: time,
            });
        }
        self.now = time;
        Ok(self.now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_advances_and_sets_forward() {
        let mut clock = LogicalClock::new(5);
        assert_eq!(clock.advance(3), Ok(8));
        assert_eq!(clock.set(8), Ok(8));
        assert_eq!(clock.set(20), Ok(20));
        assert_eq!(clock.now(), 20);
    }

    #[test]
    fn clock_rejects_going_backwards() {
        let mut clock = LogicalClock::new(10);
        assert_eq!(
            clock.set(9),
            Err(ClockError::NonMonotonic {
                now: 10,
                requested: 9
            })
        );
        assert_eq!(clock.now(), 10);
    }

    #[test]
    fn clock_reports_overflow() {
        let mut clock = LogicalClock::new(LogicalTime::MAX);
        assert!(matches!(clock.advance(1), Err(ClockError::Overflow { .. })));
        assert_eq!(clock.advance(0), Ok(LogicalTime::MAX));
    }
}
