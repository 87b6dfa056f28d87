use recorder_traits::Clock;
use std::thread;
use std::time::{Duration, Instant};

/// Monotonic time since construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(ms as u64));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_advances_time() {
        let mut clock = SystemClock::new();
        let before = clock.now_us();
        clock.delay_ms(5);
        assert!(clock.now_us() >= before + 5_000);
    }
}
