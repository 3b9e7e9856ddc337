//! Fixed-capacity rolling buffer over recent speed samples.

use std::collections::VecDeque;

/// Order-preserving ring buffer of speed samples producing a running mean.
///
/// Samples the sensor could not provide ("no speed available") are never
/// pushed here; callers skip them so they cannot drag the average toward
/// zero. `push` additionally drops non-finite or negative values, so the
/// buffer never throws and never holds junk.
#[derive(Debug, Clone)]
pub struct SpeedBuffer {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl SpeedBuffer {
    /// Capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest once at capacity. Non-finite or
    /// negative readings are ignored.
    pub fn push(&mut self, speed_mps: f64) {
        if !speed_mps.is_finite() || speed_mps < 0.0 {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(speed_mps);
    }

    /// Arithmetic mean of buffered samples, or `None` when empty.
    pub fn average(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: f64 = self.samples.iter().sum();
        Some(sum / self.samples.len() as f64)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for SpeedBuffer {
    fn default() -> Self {
        Self::new(5)
    }
}
