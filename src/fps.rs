use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

const RATE_WINDOW: Duration = Duration::from_secs(1);

/// Counts result-handler invocations and derives a frames-per-second reading
/// over a sliding one-second window. `tick` never skips: the count goes up by
/// one per call whether or not a pose was found.
#[derive(Debug)]
pub struct FpsCounter {
    ticks: u64,
    samples: VecDeque<Instant>,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self {
            ticks: 0,
            samples: VecDeque::new(),
        }
    }

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    fn tick_at(&mut self, now: Instant) {
        self.ticks += 1;
        self.samples.push_back(now);
        while let Some(&oldest) = self.samples.front() {
            if now.duration_since(oldest) > RATE_WINDOW {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn fps(&self) -> f32 {
        let now = Instant::now();
        self.samples
            .iter()
            .filter(|at| now.duration_since(**at) <= RATE_WINDOW)
            .count() as f32
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_count_matches_call_count() {
        let mut counter = FpsCounter::new();
        for _ in 0..17 {
            counter.tick();
        }
        assert_eq!(counter.ticks(), 17);
    }

    #[test]
    fn old_samples_leave_the_rate_window() {
        let mut counter = FpsCounter::new();
        let start = Instant::now();
        counter.tick_at(start);
        counter.tick_at(start + Duration::from_secs(3));
        assert_eq!(counter.ticks(), 2);
        assert!(counter.samples.len() == 1);
    }
}
