// Fixed-capacity metrics history
use std::collections::VecDeque;

use crate::models::Metrics;

/// Ring buffer of the most recent snapshots. The oldest entry is evicted on overflow.
#[derive(Debug, Clone)]
pub struct MetricsHistory {
    entries: VecDeque<Metrics>,
    capacity: usize,
}

impl MetricsHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, metrics: Metrics) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(metrics);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&Metrics> {
        self.entries.back()
    }

    /// Oldest first
    pub fn to_vec(&self) -> Vec<Metrics> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics_at(timestamp: i64) -> Metrics {
        Metrics {
            timestamp,
            cpu_percent: timestamp as f32,
            ..Default::default()
        }
    }

    #[test]
    fn test_evicts_oldest() {
        let mut history = MetricsHistory::new(3);
        for ts in 1..=5 {
            history.push(metrics_at(ts));
        }

        assert_eq!(history.len(), 3);
        let timestamps: Vec<i64> = history.to_vec().iter().map(|m| m.timestamp).collect();
        assert_eq!(timestamps, vec![3, 4, 5]);
        assert_eq!(history.latest().map(|m| m.timestamp), Some(5));
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut history = MetricsHistory::new(0);
        history.push(metrics_at(1));
        history.push(metrics_at(2));
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.to_vec()[0].timestamp, 2);
    }
}
