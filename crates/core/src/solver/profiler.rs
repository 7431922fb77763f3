//! Wall-clock timing of the solver phases.
//!
//! A [`ProfilerScope`] covers one phase of one operating point and logs its
//! duration at debug level when dropped, together with the number of items
//! the phase processed (rows, right-hand sides, vortons).

use std::time::Instant;
use tracing::debug;

/// RAII timer for one solver phase.
pub struct ProfilerScope {
    start: Instant,
    phase: &'static str,
    items: usize,
}

impl ProfilerScope {
    /// Starts timing `phase`, which processes `items` units of work.
    pub fn new(phase: &'static str, items: usize) -> Self {
        Self {
            start: Instant::now(),
            phase,
            items,
        }
    }

    /// Elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for ProfilerScope {
    fn drop(&mut self) {
        let elapsed = self.elapsed_ms();
        if self.items > 0 {
            debug!(
                "{} ({} items) took {:.3} ms, {:.4} ms per item",
                self.phase,
                self.items,
                elapsed,
                elapsed / self.items as f64
            );
        } else {
            debug!("{} took {:.3} ms", self.phase, elapsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_scope_measures_elapsed_time() {
        let scope = ProfilerScope::new("sleep", 0);
        thread::sleep(Duration::from_millis(10));
        let elapsed = scope.elapsed_ms();
        assert!(elapsed >= 10.0, "Expected at least 10ms, got {elapsed}");
    }
}
