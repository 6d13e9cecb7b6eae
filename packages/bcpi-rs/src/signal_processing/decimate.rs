//! Integer-factor decimation along the time axis

use crate::error::{BcpiError, Result};
use ndarray::{ArrayD, Axis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecimateConfig {
    /// Keep one sample in every `factor`; 1 disables decimation
    #[serde(default = "default_factor")]
    pub factor: usize,
}

fn default_factor() -> usize {
    1
}

impl Default for DecimateConfig {
    fn default() -> Self {
        Self { factor: 1 }
    }
}

impl DecimateConfig {
    pub fn validate(&self) -> Result<()> {
        if self.factor == 0 {
            return Err(BcpiError::Configuration(
                "Decimation factor must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Streaming decimator.
///
/// Input samples are grouped into runs of `factor` counted across segment
/// boundaries, and the last sample of every complete group is kept. After
/// `n` samples in total the output holds exactly `n / factor` samples, however
/// the stream was split.
#[derive(Debug, Clone)]
pub struct Decimator {
    factor: usize,
    /// Samples of the current, incomplete group already seen
    pending: usize,
}

impl Decimator {
    pub fn new(factor: usize) -> Self {
        Self {
            factor: factor.max(1),
            pending: 0,
        }
    }

    pub fn factor(&self) -> usize {
        self.factor
    }

    /// Index, within the next segment, of the first sample that will be kept
    pub fn first_kept(&self) -> usize {
        self.factor - 1 - self.pending
    }

    pub fn process(&mut self, data: &ArrayD<f64>, axis: usize) -> ArrayD<f64> {
        if self.factor == 1 {
            return data.clone();
        }

        let n = data.len_of(Axis(axis));
        let indices: Vec<usize> = (self.first_kept()..n).step_by(self.factor).collect();
        self.pending = (self.pending + n) % self.factor;
        data.select(Axis(axis), &indices)
    }

    pub fn reset(&mut self) {
        self.pending = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{concatenate, Array, IxDyn};

    fn ramp(shape: &[usize]) -> ArrayD<f64> {
        Array::from_shape_fn(IxDyn(shape), |ix| (ix[0] * 100 + ix[1]) as f64)
    }

    #[test]
    fn test_keeps_last_of_each_group() {
        let out = Decimator::new(3).process(&ramp(&[2, 7]), 1);
        assert_eq!(out.shape(), &[2, 2]);
        assert_eq!(out[[0, 0]], 2.0);
        assert_eq!(out[[0, 1]], 5.0);
        assert_eq!(out[[1, 1]], 105.0);
    }

    #[test]
    fn test_factor_one_is_identity() {
        let data = ramp(&[5, 2]);
        assert_eq!(Decimator::new(1).process(&data, 0), data);
    }

    #[test]
    fn test_uneven_segments_match_whole_stream() {
        let whole = ramp(&[2, 200]);
        let expected = Decimator::new(4).process(&whole, 1);

        let mut decimator = Decimator::new(4);
        let mut parts = Vec::new();
        let mut start = 0;
        for len in [7, 1, 50, 13, 3, 126] {
            let segment = whole.slice_axis(Axis(1), (start..start + len).into()).to_owned();
            parts.push(decimator.process(&segment, 1));
            start += len;
        }
        let views: Vec<_> = parts.iter().map(|p| p.view()).collect();
        let joined = concatenate(Axis(1), &views).unwrap();

        assert_eq!(joined, expected);
        assert_eq!(joined.len_of(Axis(1)), 200 / 4);
    }

    #[test]
    fn test_short_segments_carry_into_the_next() {
        let mut decimator = Decimator::new(4);
        let zeros = Array::<f64, _>::zeros(IxDyn(&[3, 4]));
        assert_eq!(decimator.process(&zeros, 0).shape(), &[0, 4]);
        assert_eq!(decimator.first_kept(), 0);

        let one = Array::<f64, _>::ones(IxDyn(&[1, 4]));
        assert_eq!(decimator.process(&one, 0).shape(), &[1, 4]);
        assert_eq!(decimator.first_kept(), 3);

        decimator.process(&zeros, 0);
        decimator.reset();
        assert_eq!(decimator.first_kept(), 3);
    }

    #[test]
    fn test_zero_factor_rejected() {
        assert!(DecimateConfig { factor: 0 }.validate().is_err());
        assert!(DecimateConfig::default().validate().is_ok());
    }
}
