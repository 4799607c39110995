//! Injectable time source for the mailbox polling loop.
//!
//! The code-retrieval loop sleeps between poll iterations and compares
//! message ages against wall-clock "now". Both go through this trait so
//! tests can simulate elapsed time without real waiting.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// Wall-clock time source with a blocking sleep.
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;

    /// Block the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Real system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

type AdvanceHook = Box<dyn Fn(DateTime<Utc>) + Send>;

#[derive(Default)]
struct FakeState {
    now: Option<DateTime<Utc>>,
    on_advance: Option<AdvanceHook>,
}

/// Deterministic clock for tests: `sleep` advances virtual time
/// instantly. Clones share the same virtual time.
#[derive(Clone, Default)]
pub struct FakeClock {
    state: Arc<Mutex<FakeState>>,
}

impl FakeClock {
    /// Create a fake clock starting at `start`.
    #[must_use]
    pub fn at(start: DateTime<Utc>) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                now: Some(start),
                on_advance: None,
            })),
        }
    }

    /// Run `hook` with the new virtual time after every advance. Lets a
    /// test deliver events "while" the code under test is sleeping.
    pub fn on_advance(&self, hook: impl Fn(DateTime<Utc>) + Send + 'static) {
        self.state.lock().expect("clock lock").on_advance = Some(Box::new(hook));
    }

    /// Advance virtual time by `duration` without sleeping.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.state.lock().expect("clock lock");
        let now = state.now.get_or_insert_with(Utc::now);
        *now += TimeDelta::from_std(duration).expect("duration fits");
        let now = *now;
        if let Some(hook) = state.on_advance.take() {
            drop(state);
            hook(now);
            self.state.lock().expect("clock lock").on_advance = Some(hook);
        }
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        let mut state = self.state.lock().expect("clock lock");
        *state.now.get_or_insert_with(Utc::now)
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_clock_advances_on_sleep() {
        let start = Utc::now();
        let clock = FakeClock::at(start);
        clock.sleep(Duration::from_secs(90));
        assert_eq!(clock.now() - start, TimeDelta::seconds(90));
    }

    #[test]
    fn clones_share_virtual_time() {
        let start = Utc::now();
        let clock = FakeClock::at(start);
        let other = clock.clone();
        clock.advance(Duration::from_secs(5));
        assert_eq!(other.now() - start, TimeDelta::seconds(5));
    }

    #[test]
    fn advance_hook_sees_new_time() {
        let start = Utc::now();
        let clock = FakeClock::at(start);
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        clock.on_advance(move |now| {
            *sink.lock().unwrap() = Some(now);
        });
        clock.advance(Duration::from_secs(3));
        assert_eq!(
            seen.lock().unwrap().unwrap() - start,
            TimeDelta::seconds(3)
        );
    }

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
