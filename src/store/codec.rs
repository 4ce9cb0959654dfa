//! Binary codec for the time sampling registry.
//!
//! The registry is persisted as one little-endian record per sampling:
//! `u32 max_samples, f64 time_per_cycle, u32 num_times, f64 times[..]`.
//! The discipline is recovered from the record shape: a sentinel
//! time-per-cycle marks acyclic sampling, zero marks the static identity
//! sampling, a single stored time is uniform, several are cyclic.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::core::{TimeSampling, TimeSamplingType};
use crate::util::{Error, Result};

/// Time-per-cycle sentinel marking acyclic sampling.
const ACYCLIC_TIME_PER_CYCLE: f64 = -f64::MAX;

/// Append the discipline body (period + stored times) of one sampling.
///
/// Also the canonical form mixed into content digests, so it must stay
/// deterministic.
pub fn encode_sampling_body(sampling: &TimeSampling, out: &mut Vec<u8>) {
    match sampling.sampling_type() {
        TimeSamplingType::Identity => {
            out.extend_from_slice(&0.0f64.to_le_bytes());
            out.extend_from_slice(&1u32.to_le_bytes());
            out.extend_from_slice(&0.0f64.to_le_bytes());
        }
        TimeSamplingType::Uniform {
            time_per_cycle,
            start_time,
        } => {
            out.extend_from_slice(&time_per_cycle.to_le_bytes());
            out.extend_from_slice(&1u32.to_le_bytes());
            out.extend_from_slice(&start_time.to_le_bytes());
        }
        TimeSamplingType::Cyclic {
            time_per_cycle,
            times,
        } => {
            out.extend_from_slice(&time_per_cycle.to_le_bytes());
            out.extend_from_slice(&(times.len() as u32).to_le_bytes());
            for t in times {
                out.extend_from_slice(&t.to_le_bytes());
            }
        }
        TimeSamplingType::Acyclic { times } => {
            out.extend_from_slice(&ACYCLIC_TIME_PER_CYCLE.to_le_bytes());
            out.extend_from_slice(&(times.len() as u32).to_le_bytes());
            for t in times {
                out.extend_from_slice(&t.to_le_bytes());
            }
        }
    }
}

/// Encode the whole registry with its per-sampling max sample counts.
pub fn encode_samplings(samplings: &[TimeSampling], max_samples: &[u32]) -> Vec<u8> {
    let mut out = Vec::new();
    for (i, sampling) in samplings.iter().enumerate() {
        let max = max_samples.get(i).copied().unwrap_or(0);
        out.extend_from_slice(&max.to_le_bytes());
        encode_sampling_body(sampling, &mut out);
    }
    out
}

/// Decode a registry buffer back into samplings and max sample counts.
///
/// A truncated buffer is a corrupt archive and fails with
/// [`Error::MalformedDirectory`]; invalid time tables surface as
/// [`Error::InvalidTimeSampling`] from the sampling constructors.
pub fn decode_samplings(buf: &[u8]) -> Result<(Vec<TimeSampling>, Vec<u32>)> {
    let mut samplings = Vec::new();
    let mut max_samples = Vec::new();
    let mut cur = Cursor::new(buf);

    let truncated = |_| Error::malformed("time sampling registry truncated");

    while (cur.position() as usize) < buf.len() {
        let max = cur.read_u32::<LittleEndian>().map_err(truncated)?;
        let tpc = cur.read_f64::<LittleEndian>().map_err(truncated)?;
        let num_times = cur.read_u32::<LittleEndian>().map_err(truncated)? as usize;
        if num_times == 0 {
            return Err(Error::malformed("time sampling record has no times"));
        }
        let mut times = Vec::with_capacity(num_times);
        for _ in 0..num_times {
            times.push(cur.read_f64::<LittleEndian>().map_err(truncated)?);
        }

        let sampling = if tpc == ACYCLIC_TIME_PER_CYCLE {
            TimeSampling::acyclic(times)?
        } else if tpc == 0.0 {
            TimeSampling::IDENTITY
        } else if num_times == 1 {
            TimeSampling::uniform(tpc, times[0])?
        } else {
            TimeSampling::cyclic(tpc, times)?
        };
        samplings.push(sampling);
        max_samples.push(max);
    }

    Ok((samplings, max_samples))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_roundtrip() {
        let samplings = vec![
            TimeSampling::IDENTITY,
            TimeSampling::uniform(1.0 / 24.0, 0.5).unwrap(),
            TimeSampling::cyclic(1.0, vec![0.0, 0.25]).unwrap(),
            TimeSampling::acyclic(vec![0.0, 0.1, 5.0]).unwrap(),
        ];
        let max = vec![1, 100, 20, 3];
        let buf = encode_samplings(&samplings, &max);
        let (decoded, decoded_max) = decode_samplings(&buf).unwrap();
        assert_eq!(decoded, samplings);
        assert_eq!(decoded_max, max);
    }

    #[test]
    fn test_empty_registry() {
        let (samplings, max) = decode_samplings(&[]).unwrap();
        assert!(samplings.is_empty());
        assert!(max.is_empty());
    }

    #[test]
    fn test_truncated_registry() {
        let buf = encode_samplings(
            &[TimeSampling::uniform(1.0, 0.0).unwrap()],
            &[10],
        );
        let err = decode_samplings(&buf[..buf.len() - 3]).unwrap_err();
        assert!(matches!(err, Error::MalformedDirectory(_)));
    }

    #[test]
    fn test_corrupt_times_fail_validation() {
        // acyclic record with non-increasing times
        let mut buf = Vec::new();
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&ACYCLIC_TIME_PER_CYCLE.to_le_bytes());
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(&1.0f64.to_le_bytes());
        buf.extend_from_slice(&0.5f64.to_le_bytes());
        assert!(matches!(
            decode_samplings(&buf),
            Err(Error::InvalidTimeSampling(_))
        ));
    }
}
