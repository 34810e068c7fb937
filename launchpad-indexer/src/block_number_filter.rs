use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

const DIFF_FACTOR: u64 = 10;
const MIN_FORWARD_ALLOWANCE: u64 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterStatus {
    /// Not enough history to judge the reading; callers must not act on it.
    Preparing,
    Success,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilterResult {
    pub status: FilterStatus,
    pub value: u64,
}

impl FilterResult {
    fn new(status: FilterStatus, value: u64) -> Self {
        Self { status, value }
    }

    pub fn is_success(&self) -> bool {
        self.status == FilterStatus::Success
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockNumberFilterStats {
    pub status: Option<FilterStatus>,
    pub history: Vec<u64>,
    pub diffs: Vec<i64>,
    pub error_count: u64,
    pub consecutive_error_count: u64,
    pub last_error: Option<u64>,
    pub last_error_at: Option<DateTime<Utc>>,
}

/// Smooths noisy chain-head readings into accepted block numbers or explicit
/// rejections.
///
/// A reading is accepted once `size` readings have been seen, when it is not
/// below the trailing minimum and does not run further ahead of the latest
/// accepted reading than recent progress allows. The forward allowance widens
/// with every consecutive rejection so a genuinely fast chain gets through;
/// regressions below the minimum are never accepted.
#[derive(Clone, Debug)]
pub struct BlockNumberFilter {
    size: usize,
    history: VecDeque<u64>,
    status: Option<FilterStatus>,
    error_count: u64,
    consecutive_error_count: u64,
    last_error: Option<u64>,
    last_error_at: Option<DateTime<Utc>>,
}

impl BlockNumberFilter {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            history: VecDeque::with_capacity(size),
            status: None,
            error_count: 0,
            consecutive_error_count: 0,
            last_error: None,
            last_error_at: None,
        }
    }

    pub fn analyze(&mut self, candidate: u64) -> FilterResult {
        let result = self.judge(candidate);
        self.status = Some(result.status);

        result
    }

    fn judge(&mut self, candidate: u64) -> FilterResult {
        if self.size == 0 {
            return FilterResult::new(FilterStatus::Success, candidate);
        }

        if self.history.len() < self.size {
            self.history.push_back(candidate);

            return FilterResult::new(FilterStatus::Preparing, candidate);
        }

        if self.is_acceptable(candidate) {
            self.history.pop_front();
            self.history.push_back(candidate);
            self.consecutive_error_count = 0;

            FilterResult::new(FilterStatus::Success, candidate)
        } else {
            self.error_count += 1;
            self.consecutive_error_count += 1;
            self.last_error = Some(candidate);
            self.last_error_at = Some(Utc::now());

            FilterResult::new(FilterStatus::Error, candidate)
        }
    }

    fn is_acceptable(&self, candidate: u64) -> bool {
        let (Some(min), Some(last)) = (self.history.iter().min(), self.history.back()) else {
            return true;
        };

        candidate >= *min && candidate <= last.saturating_add(self.get_forward_allowance())
    }

    fn get_forward_allowance(&self) -> u64 {
        let max_diff = self.get_diffs().into_iter().max().unwrap_or_default().max(0) as u64;

        max_diff
            .saturating_mul(DIFF_FACTOR)
            .max(MIN_FORWARD_ALLOWANCE)
            .saturating_mul(self.consecutive_error_count + 1)
    }

    fn get_diffs(&self) -> Vec<i64> {
        self.history
            .iter()
            .zip(self.history.iter().skip(1))
            .map(|(previous, next)| *next as i64 - *previous as i64)
            .collect()
    }

    pub fn get_stats(&self) -> BlockNumberFilterStats {
        BlockNumberFilterStats {
            status: self.status,
            history: self.history.iter().copied().collect(),
            diffs: self.get_diffs(),
            error_count: self.error_count,
            consecutive_error_count: self.consecutive_error_count,
            last_error: self.last_error,
            last_error_at: self.last_error_at,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.size);
    }
}
