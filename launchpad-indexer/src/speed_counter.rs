use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedStats {
    pub value: f64,
    /// Units per second over the window.
    pub speed: f64,
}

/// Rolling-window rate estimator over a monotonically growing value, such as
/// a request counter or a checkpoint block number.
#[derive(Clone, Debug)]
pub struct SpeedCounter {
    window: chrono::Duration,
    samples: VecDeque<(DateTime<Utc>, f64)>,
}

impl SpeedCounter {
    pub fn new(window: Duration) -> Self {
        Self {
            window: chrono::Duration::from_std(window)
                .unwrap_or_else(|_| chrono::Duration::days(365)),
            samples: VecDeque::new(),
        }
    }

    pub fn store(&mut self, value: f64) {
        self.store_at(value, Utc::now())
    }

    pub fn store_at(&mut self, value: f64, at: DateTime<Utc>) {
        self.samples.push_back((at, value));

        // Keep one sample at or before the window start as the baseline
        let window_start = at - self.window;
        while self.samples.len() > 2 && self.samples[1].0 <= window_start {
            self.samples.pop_front();
        }
    }

    pub fn get_speed(&self) -> f64 {
        match (self.samples.front(), self.samples.back()) {
            (Some((first_at, first)), Some((last_at, last))) if last_at > first_at => {
                let elapsed_ms = (*last_at - *first_at).num_milliseconds() as f64;

                (last - first) * 1_000.0 / elapsed_ms
            }
            _ => 0.0,
        }
    }

    pub fn get_stats(&self) -> SpeedStats {
        SpeedStats {
            value: self.samples.back().map(|(_, value)| *value).unwrap_or_default(),
            speed: self.get_speed(),
        }
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn measures_units_per_second() {
        let mut counter = SpeedCounter::new(Duration::from_secs(60));
        counter.store_at(100.0, at(0));
        counter.store_at(110.0, at(5));
        counter.store_at(150.0, at(10));

        assert_eq!(counter.get_speed(), 5.0);
        assert_eq!(counter.get_stats().value, 150.0);
    }

    #[test]
    fn forgets_samples_outside_the_window() {
        let mut counter = SpeedCounter::new(Duration::from_secs(10));
        counter.store_at(0.0, at(0));
        counter.store_at(1_000.0, at(20));
        counter.store_at(1_010.0, at(25));
        counter.store_at(1_020.0, at(30));

        assert_eq!(counter.get_speed(), 2.0);
    }

    #[test]
    fn a_single_sample_has_no_speed() {
        let mut counter = SpeedCounter::new(Duration::from_secs(10));
        assert_eq!(counter.get_speed(), 0.0);

        counter.store_at(42.0, at(0));
        assert_eq!(counter.get_speed(), 0.0);

        counter.reset();
        assert_eq!(counter.get_stats(), SpeedStats::default());
    }
}
