// src/processing/aggregator.rs
//! Cross-channel aggregation and the rolling ratio history

use crate::config::constants::aggregation::NEUTRAL_RATIO;
use crate::utils::stats::median;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioPoint {
    pub timestamp_s: f64,
    pub ratio: f64,
}

/// Time-ordered global ratios covering at most `window_seconds`
#[derive(Debug, Clone)]
pub struct RatioHistory {
    points: VecDeque<RatioPoint>,
    window_seconds: f64,
}

impl RatioHistory {
    pub fn new(window_seconds: f64) -> Self {
        Self {
            points: VecDeque::new(),
            window_seconds,
        }
    }

    /// Append a point, clamping a backwards timestamp to the newest one, then prune
    pub fn push(&mut self, timestamp_s: f64, ratio: f64) {
        let timestamp_s = match self.points.back() {
            Some(last) if timestamp_s < last.timestamp_s => last.timestamp_s,
            _ => timestamp_s,
        };
        self.points.push_back(RatioPoint { timestamp_s, ratio });
        self.prune();
    }

    fn prune(&mut self) {
        let Some(newest) = self.points.back().map(|p| p.timestamp_s) else {
            return;
        };
        let cutoff = newest - self.window_seconds;
        while self.points.front().is_some_and(|p| p.timestamp_s < cutoff) {
            self.points.pop_front();
        }
    }

    pub fn points(&self) -> impl Iterator<Item = &RatioPoint> + '_ {
        self.points.iter()
    }

    pub fn latest(&self) -> Option<RatioPoint> {
        self.points.back().copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Time covered from the oldest to the newest point
    pub fn span_seconds(&self) -> f64 {
        match (self.points.front(), self.points.back()) {
            (Some(first), Some(last)) => last.timestamp_s - first.timestamp_s,
            _ => 0.0,
        }
    }

    pub fn window_seconds(&self) -> f64 {
        self.window_seconds
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

/// Median aggregation of per-channel ratios
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator;

impl Aggregator {
    /// Global ratio for one tick; 0.5 when there are no channels
    pub fn global_ratio(ratios: &[f64]) -> f64 {
        median(ratios).unwrap_or(NEUTRAL_RATIO)
    }

    /// Aggregate, record in `history` and return the global ratio
    pub fn fold(history: &mut RatioHistory, timestamp_s: f64, ratios: &[f64]) -> f64 {
        let global = Self::global_ratio(ratios);
        history.push(timestamp_s, global);
        global
    }
}
