//! Manually driven clock.

use kyc_types::{Clock, Timestamp};
use std::sync::atomic::{AtomicU64, Ordering};

/// Unix seconds held in an atomic; `today()` follows from it via [`Clock`].
pub struct NullClock {
    current: AtomicU64,
}

impl NullClock {
    pub fn new(initial_secs: u64) -> Self {
        Self {
            current: AtomicU64::new(initial_secs),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.current.fetch_add(secs, Ordering::SeqCst);
    }

    pub fn set(&self, secs: u64) {
        self.current.store(secs, Ordering::SeqCst);
    }
}

impl Clock for NullClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.current.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_moves_when_told() {
        let clock = NullClock::new(86_400);
        assert_eq!(clock.now(), Timestamp::new(86_400));
        assert_eq!(clock.today().to_string(), "1970-01-02");
        clock.advance(10);
        assert_eq!(clock.now().as_secs(), 86_410);
        clock.set(5);
        assert_eq!(clock.now().as_secs(), 5);
    }
}
