//! Time sampling - the index/time mapping for animated properties.
//!
//! Scalar and Array properties reference a [`TimeSampling`] by registry
//! index; the sampling converts between sample index and time for one of
//! three disciplines (uniform, cyclic, acyclic), plus the implicit static
//! sampling reserved at registry index 0.

use crate::util::{Chrono, Error, Result};

/// Absolute tolerance for treating two times as equal.
///
/// Floor/ceil/near queries use this to keep round-off from crossing a
/// sample boundary and returning the wrong neighbor.
pub const TIME_TOLERANCE: Chrono = 1e-5;

/// Sampling discipline.
#[derive(Clone, Debug, PartialEq)]
pub enum TimeSamplingType {
    /// Single static sample pinned at time 0. Reserved at registry index 0.
    Identity,

    /// Regular intervals: sample i occurs at `start_time + i * time_per_cycle`.
    Uniform {
        time_per_cycle: Chrono,
        start_time: Chrono,
    },

    /// Repeating pattern: sample i occurs at
    /// `times[i mod N] + time_per_cycle * (i div N)`.
    Cyclic {
        time_per_cycle: Chrono,
        times: Vec<Chrono>,
    },

    /// Explicit strictly-increasing time per sample; no extrapolation.
    Acyclic { times: Vec<Chrono> },
}

impl TimeSamplingType {
    /// Number of stored times per cycle (1 for identity/uniform).
    pub fn samples_per_cycle(&self) -> usize {
        match self {
            Self::Identity | Self::Uniform { .. } => 1,
            Self::Cyclic { times, .. } => times.len(),
            Self::Acyclic { times } => times.len(),
        }
    }
}

impl Default for TimeSamplingType {
    fn default() -> Self {
        Self::Identity
    }
}

/// Immutable index/time mapping for a property's samples.
///
/// Validated at construction; see [`Error::InvalidTimeSampling`].
#[derive(Clone, Debug, PartialEq)]
pub struct TimeSampling {
    sampling_type: TimeSamplingType,
}

fn check_increasing(times: &[Chrono]) -> Result<()> {
    if times.is_empty() {
        return Err(Error::InvalidTimeSampling("empty sample time list".into()));
    }
    if times.iter().any(|t| !t.is_finite()) {
        return Err(Error::InvalidTimeSampling("non-finite sample time".into()));
    }
    for pair in times.windows(2) {
        if pair[1] <= pair[0] {
            return Err(Error::InvalidTimeSampling(format!(
                "sample times not strictly increasing ({} then {})",
                pair[0], pair[1]
            )));
        }
    }
    Ok(())
}

impl TimeSampling {
    /// The static sampling (single sample at time 0).
    pub const IDENTITY: Self = Self {
        sampling_type: TimeSamplingType::Identity,
    };

    /// Create uniform sampling with the given period and first-sample time.
    pub fn uniform(time_per_cycle: Chrono, start_time: Chrono) -> Result<Self> {
        if !time_per_cycle.is_finite() || time_per_cycle <= 0.0 {
            return Err(Error::InvalidTimeSampling(format!(
                "uniform period must be positive, got {}",
                time_per_cycle
            )));
        }
        if !start_time.is_finite() {
            return Err(Error::InvalidTimeSampling("non-finite start time".into()));
        }
        Ok(Self {
            sampling_type: TimeSamplingType::Uniform {
                time_per_cycle,
                start_time,
            },
        })
    }

    /// Create cyclic sampling from in-cycle offsets and a cycle period.
    ///
    /// The offsets must be strictly increasing and span at most one period.
    pub fn cyclic(time_per_cycle: Chrono, times: Vec<Chrono>) -> Result<Self> {
        if !time_per_cycle.is_finite() || time_per_cycle <= 0.0 {
            return Err(Error::InvalidTimeSampling(format!(
                "cyclic period must be positive, got {}",
                time_per_cycle
            )));
        }
        check_increasing(&times)?;
        let span = times[times.len() - 1] - times[0];
        if span > time_per_cycle {
            return Err(Error::InvalidTimeSampling(format!(
                "cycle offsets span {} exceeds period {}",
                span, time_per_cycle
            )));
        }
        Ok(Self {
            sampling_type: TimeSamplingType::Cyclic {
                time_per_cycle,
                times,
            },
        })
    }

    /// Create acyclic sampling from an explicit strictly-increasing time list.
    pub fn acyclic(times: Vec<Chrono>) -> Result<Self> {
        check_increasing(&times)?;
        Ok(Self {
            sampling_type: TimeSamplingType::Acyclic { times },
        })
    }

    /// The sampling discipline.
    pub fn sampling_type(&self) -> &TimeSamplingType {
        &self.sampling_type
    }

    /// True for the static identity sampling.
    pub fn is_identity(&self) -> bool {
        matches!(self.sampling_type, TimeSamplingType::Identity)
    }

    /// Time of the given sample index.
    ///
    /// Acyclic sampling has no extrapolation: an index past the stored
    /// list fails with [`Error::SampleOutOfBounds`].
    pub fn sample_time(&self, index: usize) -> Result<Chrono> {
        match &self.sampling_type {
            TimeSamplingType::Acyclic { times } => {
                times
                    .get(index)
                    .copied()
                    .ok_or(Error::SampleOutOfBounds {
                        index,
                        count: times.len(),
                    })
            }
            _ => Ok(self.time_of(index)),
        }
    }

    /// Time of `index`, clamping acyclic indices into the stored list.
    /// Internal: callers pass indices already clamped to a valid range.
    fn time_of(&self, index: usize) -> Chrono {
        match &self.sampling_type {
            TimeSamplingType::Identity => 0.0,
            TimeSamplingType::Uniform {
                time_per_cycle,
                start_time,
            } => start_time + index as Chrono * time_per_cycle,
            TimeSamplingType::Cyclic {
                time_per_cycle,
                times,
            } => {
                let n = times.len();
                times[index % n] + (index / n) as Chrono * time_per_cycle
            }
            TimeSamplingType::Acyclic { times } => times[index.min(times.len() - 1)],
        }
    }

    /// Largest valid index whose time is <= `time`, clamped to
    /// `[0, num_samples - 1]`, and that sample's time.
    ///
    /// `num_samples < 1` yields the deterministic `(0, 0.0)` default;
    /// callers must not treat it as meaningful.
    pub fn floor_index(&self, time: Chrono, num_samples: usize) -> (usize, Chrono) {
        if num_samples < 1 {
            return (0, 0.0);
        }
        let last = num_samples - 1;

        match &self.sampling_type {
            TimeSamplingType::Identity => (0, 0.0),
            TimeSamplingType::Uniform {
                time_per_cycle,
                start_time,
            } => {
                if time <= *start_time {
                    return (0, *start_time);
                }
                let mut idx = ((time - start_time) / time_per_cycle).floor() as i64;
                // Round-off can land the naive result one step off either way.
                let time_at = |i: i64| start_time + i as Chrono * time_per_cycle;
                if time_at(idx + 1) <= time + TIME_TOLERANCE {
                    idx += 1;
                } else if time_at(idx) > time + TIME_TOLERANCE {
                    idx -= 1;
                }
                let idx = idx.clamp(0, last as i64) as usize;
                (idx, time_at(idx as i64))
            }
            TimeSamplingType::Cyclic {
                time_per_cycle,
                times,
            } => {
                let n = times.len() as i64;
                if time <= times[0] {
                    return (0, times[0]);
                }
                // Whole cycles elapsed, then a linear scan of the in-cycle
                // offsets for the remainder (cycles are always short).
                let cycle = (((time - times[0]) / time_per_cycle).floor() as i64).max(0);
                let rem = time - cycle as Chrono * time_per_cycle;
                let sub = times
                    .iter()
                    .rposition(|&t| t <= rem + TIME_TOLERANCE)
                    .map(|j| j as i64)
                    .unwrap_or(-1);
                let mut idx = cycle * n + sub;
                if self.time_of((idx + 1) as usize) <= time + TIME_TOLERANCE {
                    idx += 1;
                }
                let idx = idx.clamp(0, last as i64) as usize;
                (idx, self.time_of(idx))
            }
            TimeSamplingType::Acyclic { times } => {
                let count = num_samples.min(times.len());
                let mut lo = 0usize;
                let mut hi = count;
                while lo < hi {
                    let mid = lo + (hi - lo) / 2;
                    if times[mid] <= time + TIME_TOLERANCE {
                        lo = mid + 1;
                    } else {
                        hi = mid;
                    }
                }
                let idx = lo.saturating_sub(1);
                (idx, times[idx])
            }
        }
    }

    /// Smallest valid index whose time is >= `time`, clamped, and that
    /// sample's time. Derived from [`Self::floor_index`].
    pub fn ceil_index(&self, time: Chrono, num_samples: usize) -> (usize, Chrono) {
        if num_samples < 1 {
            return (0, 0.0);
        }
        let (floor_idx, floor_time) = self.floor_index(time, num_samples);
        if floor_time >= time - TIME_TOLERANCE || floor_idx + 1 >= num_samples {
            return (floor_idx, floor_time);
        }
        let ceil_idx = floor_idx + 1;
        (ceil_idx, self.time_of(ceil_idx))
    }

    /// Index whose time is numerically closest to `time`; ties favor the
    /// floor side.
    pub fn near_index(&self, time: Chrono, num_samples: usize) -> (usize, Chrono) {
        if num_samples < 1 {
            return (0, 0.0);
        }
        let (floor_idx, floor_time) = self.floor_index(time, num_samples);
        let (ceil_idx, ceil_time) = self.ceil_index(time, num_samples);
        if ceil_idx == floor_idx || (time - floor_time).abs() <= (ceil_time - time).abs() {
            (floor_idx, floor_time)
        } else {
            (ceil_idx, ceil_time)
        }
    }
}

impl Default for TimeSampling {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_sample_time() {
        let ts = TimeSampling::uniform(1.0 / 24.0, 0.0).unwrap();
        assert_eq!(ts.sample_time(0).unwrap(), 0.0);
        assert!((ts.sample_time(24).unwrap() - 1.0).abs() < 1e-10);
        assert!((ts.sample_time(48).unwrap() - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_uniform_floor_roundtrip() {
        let ts = TimeSampling::uniform(1.0 / 24.0, 10.5).unwrap();
        for i in 0..100 {
            let t = ts.sample_time(i).unwrap();
            assert_eq!(ts.floor_index(t, 100).0, i, "index {}", i);
        }
    }

    #[test]
    fn test_uniform_floor_between_samples() {
        let ts = TimeSampling::uniform(1.0, 0.0).unwrap();
        assert_eq!(ts.floor_index(0.5, 10).0, 0);
        assert_eq!(ts.floor_index(1.5, 10).0, 1);
        assert_eq!(ts.floor_index(5.0, 10).0, 5);
        // within tolerance just below a boundary snaps up
        assert_eq!(ts.floor_index(3.0 - 1e-7, 10).0, 3);
        // beyond tolerance stays below
        assert_eq!(ts.floor_index(3.0 - 1e-3, 10).0, 2);
    }

    #[test]
    fn test_uniform_clamping() {
        let ts = TimeSampling::uniform(1.0, 0.0).unwrap();
        assert_eq!(ts.floor_index(-5.0, 10), (0, 0.0));
        assert_eq!(ts.floor_index(99.0, 10), (9, 9.0));
        assert_eq!(ts.ceil_index(99.0, 10), (9, 9.0));
        assert_eq!(ts.ceil_index(-5.0, 10), (0, 0.0));
    }

    #[test]
    fn test_cyclic_sample_time_identity() {
        let ts = TimeSampling::cyclic(1.0, vec![0.0, 0.25, 0.3]).unwrap();
        for i in 0..30 {
            let expect = ts.sample_time(i % 3).unwrap() + (i / 3) as Chrono * 1.0;
            assert!((ts.sample_time(i).unwrap() - expect).abs() < 1e-12);
        }
    }

    #[test]
    fn test_cyclic_floor() {
        let ts = TimeSampling::cyclic(1.0, vec![0.0, 0.25, 0.3]).unwrap();
        assert_eq!(ts.floor_index(0.26, 30).0, 1);
        assert_eq!(ts.floor_index(0.9, 30).0, 2);
        assert_eq!(ts.floor_index(1.1, 30).0, 3);
        assert_eq!(ts.floor_index(1.27, 30).0, 4);
        // exact sample times map to their own index
        for i in 0..30 {
            let t = ts.sample_time(i).unwrap();
            assert_eq!(ts.floor_index(t, 30).0, i, "index {}", i);
        }
    }

    #[test]
    fn test_acyclic_floor_and_clamp() {
        let ts = TimeSampling::acyclic(vec![0.0, 0.5, 1.0, 4.0]).unwrap();
        assert_eq!(ts.floor_index(-1.0, 4), (0, 0.0));
        assert_eq!(ts.floor_index(0.6, 4), (1, 0.5));
        assert_eq!(ts.floor_index(3.99999, 4).0, 3);
        assert_eq!(ts.floor_index(100.0, 4), (3, 4.0));
        // tolerance: just below a stored time counts as that time
        assert_eq!(ts.floor_index(0.5 - 1e-7, 4).0, 1);
    }

    #[test]
    fn test_acyclic_no_extrapolation() {
        let ts = TimeSampling::acyclic(vec![0.0, 1.0]).unwrap();
        assert!(matches!(
            ts.sample_time(2),
            Err(Error::SampleOutOfBounds { index: 2, count: 2 })
        ));
    }

    #[test]
    fn test_ceil_and_near() {
        let ts = TimeSampling::uniform(1.0, 0.0).unwrap();
        assert_eq!(ts.ceil_index(0.5, 10), (1, 1.0));
        assert_eq!(ts.ceil_index(1.0, 10), (1, 1.0));
        assert_eq!(ts.near_index(0.4, 10).0, 0);
        assert_eq!(ts.near_index(0.6, 10).0, 1);
        // tie favors floor
        assert_eq!(ts.near_index(0.5, 10).0, 0);
    }

    #[test]
    fn test_empty_is_deterministic_default() {
        let ts = TimeSampling::uniform(1.0, 0.0).unwrap();
        assert_eq!(ts.floor_index(3.0, 0), (0, 0.0));
        assert_eq!(ts.ceil_index(3.0, 0), (0, 0.0));
        assert_eq!(ts.near_index(3.0, 0), (0, 0.0));
    }

    #[test]
    fn test_validation() {
        assert!(TimeSampling::uniform(0.0, 0.0).is_err());
        assert!(TimeSampling::uniform(-1.0, 0.0).is_err());
        assert!(TimeSampling::acyclic(vec![]).is_err());
        assert!(TimeSampling::acyclic(vec![0.0, 0.0]).is_err());
        assert!(TimeSampling::acyclic(vec![1.0, 0.5]).is_err());
        // cycle span exceeding the period
        assert!(TimeSampling::cyclic(1.0, vec![0.0, 1.5]).is_err());
        assert!(TimeSampling::cyclic(1.0, vec![0.0, 1.0]).is_ok());
    }

    #[test]
    fn test_registry_equality() {
        let a = TimeSampling::uniform(1.0, 0.0).unwrap();
        let b = TimeSampling::uniform(1.0, 0.0).unwrap();
        let c = TimeSampling::uniform(2.0, 0.0).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
