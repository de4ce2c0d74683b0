//! Rotating latency time series for one ICMP host.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// One batched probe round. A null triple records a soft failure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time: DateTime<Utc>,
    pub min_ms: Option<f64>,
    pub avg_ms: Option<f64>,
    pub max_ms: Option<f64>,
}

impl Sample {
    pub fn stats(time: DateTime<Utc>, min_ms: f64, avg_ms: f64, max_ms: f64) -> Self {
        Self {
            time,
            min_ms: Some(min_ms),
            avg_ms: Some(avg_ms),
            max_ms: Some(max_ms),
        }
    }

    /// A round that completed with packet loss.
    pub fn lost(time: DateTime<Utc>) -> Self {
        Self {
            time,
            min_ms: None,
            avg_ms: None,
            max_ms: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.avg_ms.is_some()
    }
}

/// Fixed-capacity FIFO of samples; the oldest round is evicted once the
/// rotation window is full.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    capacity: usize,
    samples: VecDeque<Sample>,
}

impl SampleBuffer {
    /// Capacity is the number of rounds in the rotation window:
    /// `rotate_hours * 3600 / interval_secs`, rounded down.
    pub fn new(rotate_hours: u64, interval_secs: u64) -> Self {
        let capacity = (rotate_hours * 3600 / interval_secs.max(1)).max(1) as usize;
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Rounds that produced statistics, excluding soft failures.
    pub fn valid_len(&self) -> usize {
        self.samples.iter().filter(|s| s.is_valid()).count()
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }
}

/// Average latency points of the valid samples, oldest first.
pub fn valid_points(samples: &[Sample]) -> Vec<(DateTime<Utc>, f64)> {
    samples
        .iter()
        .filter_map(|s| s.avg_ms.map(|avg| (s.time, avg)))
        .collect()
}
