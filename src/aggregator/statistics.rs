//! Mergeable streaming statistics.
//!
//! [`Statistics`] keeps count, min, max, total and the Welford running mean
//! and `M2` (sum of squared deviations). Two accumulators built from
//! disjoint samples merge into one equivalent to replaying every sample
//! into a single accumulator, without keeping the samples around.

use crate::callstack::CalledFunction;
use serde::{Deserialize, Serialize};

/// Streaming statistics over integer samples
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statistics {
    count: u64,
    min: Option<i64>,
    max: Option<i64>,
    total: i64,
    mean: f64,
    m2: f64,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one sample
    pub fn update(&mut self, value: i64) {
        self.count += 1;
        self.total += value;
        self.min = Some(self.min.map_or(value, |min| min.min(value)));
        self.max = Some(self.max.map_or(value, |max| max.max(value)));

        let value = value as f64;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// Combine with statistics accumulated elsewhere
    pub fn merge(&mut self, other: &Statistics) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }

        let n1 = self.count as f64;
        let n2 = other.count as f64;
        let n = n1 + n2;
        let delta = other.mean - self.mean;

        self.mean = (n1 * self.mean + n2 * other.mean) / n;
        self.m2 += other.m2 + delta * delta * n1 * n2 / n;
        self.count += other.count;
        self.total += other.total;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Number of samples
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn min(&self) -> Option<i64> {
        self.min
    }

    pub fn max(&self) -> Option<i64> {
        self.max
    }

    /// Sum of all samples
    pub fn total(&self) -> i64 {
        self.total
    }

    /// Mean of the samples, `NaN` when empty
    ///
    /// Computed from the exact total so the result does not depend on the
    /// order samples were added or merged in.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return f64::NAN;
        }
        self.total as f64 / self.count as f64
    }

    /// Sample variance, `NaN` with fewer than two samples
    pub fn variance(&self) -> f64 {
        if self.count <= 1 {
            return f64::NAN;
        }
        self.m2 / (self.count - 1) as f64
    }

    /// Sample standard deviation, `NaN` with fewer than two samples
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            count: self.count,
            min: self.min,
            max: self.max,
            total: self.total,
            mean: finite(self.mean()),
            std_dev: finite(self.std_dev()),
        }
    }
}

fn finite(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value)
    }
}

/// Serializable view of a [`Statistics`]
///
/// `NaN` mean or standard deviation is reported as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    pub count: u64,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub total: i64,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
}

/// Duration, self time and CPU time statistics of one aggregated function
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedStatistics {
    durations: Statistics,
    self_times: Statistics,
    cpu_times: Statistics,
}

impl AggregatedStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one call
    ///
    /// Must be called once the call's children are all attached, so its
    /// self time is final. Unresolved CPU times are skipped.
    pub fn update(&mut self, function: &CalledFunction) {
        self.durations.update(function.duration());
        self.self_times.update(function.self_time());
        if function.has_cpu_time() {
            self.cpu_times.update(function.cpu_time());
        }
    }

    pub fn merge(&mut self, other: &AggregatedStatistics) {
        self.durations.merge(&other.durations);
        self.self_times.merge(&other.self_times);
        self.cpu_times.merge(&other.cpu_times);
    }

    pub fn durations(&self) -> &Statistics {
        &self.durations
    }

    pub fn self_times(&self) -> &Statistics {
        &self.self_times
    }

    pub fn cpu_times(&self) -> &Statistics {
        &self.cpu_times
    }
}
