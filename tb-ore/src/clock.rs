//! Monotonic wall-clock utilities.

use std::time::{SystemTime, UNIX_EPOCH};

/// Hands out wall-clock instants, as nanoseconds since the Unix epoch, that strictly
/// increase for the lifetime of the generator.
///
/// Two calls within the same clock tick, or a wall clock that steps backwards, would
/// otherwise hand out the same instant twice. In either case we return one nanosecond
/// past the last instant instead.
#[derive(Debug)]
pub struct NanoClock<Id> {
    last: Option<u128>,
    phantom: std::marker::PhantomData<fn() -> Id>,
}

impl<Id> Default for NanoClock<Id> {
    fn default() -> Self {
        NanoClock {
            last: None,
            phantom: std::marker::PhantomData,
        }
    }
}

impl<Id: From<u128>> NanoClock<Id> {
    /// Returns the next instant based on the current system time.
    pub fn next(&mut self) -> Id {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or(0);
        self.next_from(now)
    }

    /// Returns the next instant given an observation of "now".
    pub fn next_from(&mut self, now_nanos: u128) -> Id {
        let next = match self.last {
            Some(last) if now_nanos <= last => last + 1,
            _ => now_nanos,
        };
        self.last = Some(next);
        Id::from(next)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bumps_on_repeated_instant() {
        let mut clock = NanoClock::<u128>::default();
        assert_eq!(clock.next_from(100), 100);
        assert_eq!(clock.next_from(100), 101);
        assert_eq!(clock.next_from(50), 102);
        assert_eq!(clock.next_from(500), 500);
    }

    #[test]
    fn system_time_never_repeats() {
        let mut clock = NanoClock::<u128>::default();
        let mut prev = clock.next();
        for _ in 0..10_000 {
            let next = clock.next();
            assert!(next > prev);
            prev = next;
        }
    }
}
