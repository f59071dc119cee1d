//! Infrastructure implementation of the `Clock` port.

use std::time::{Duration, Instant};

use crate::application::ports::Clock;

/// Production `Clock` backed by the monotonic system clock and tokio timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
