//! Envelope slope table: per-sample amplitude ramps for a tone's rising
//! and falling edges.

use crate::CwError;

/// Checks the combination `set_slope` accepts without needing a sample
/// rate, so callers on a different thread from the table itself can
/// reject bad requests before ever touching the table.
pub fn validate_slope_request(shape: Option<SlopeShape>, length_us: Option<i32>) -> Result<(), CwError> {
    if let (Some(SlopeShape::Rectangular), Some(len)) = (shape, length_us) {
        if len > 0 {
            return Err(CwError::Invalid("rectangular slope requires length_us == 0".into()));
        }
    }
    if let Some(len) = length_us {
        if len < 0 {
            return Err(CwError::Invalid(format!("negative slope length: {len}")));
        }
    }
    Ok(())
}

/// Envelope shape applied at tone edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SlopeShape {
    Linear,
    RaisedCosine,
    Sine,
    Rectangular,
}

/// Precomputed envelope amplitudes for a rising edge; falling edges walk
/// the same table backward.
#[derive(Debug, Clone)]
pub struct SlopeTable {
    shape: SlopeShape,
    length_us: i32,
    sample_rate: u32,
    amplitudes: Vec<f32>,
}

impl SlopeTable {
    pub fn new(sample_rate: u32) -> Self {
        let mut table = SlopeTable {
            shape: SlopeShape::RaisedCosine,
            length_us: 0,
            sample_rate,
            amplitudes: Vec::new(),
        };
        table.recompute();
        table
    }

    pub fn shape(&self) -> SlopeShape {
        self.shape
    }

    pub fn length_us(&self) -> i32 {
        self.length_us
    }

    pub fn amplitudes(&self) -> &[f32] {
        &self.amplitudes
    }

    /// `shape = None` or `length_us = None` leaves that field unchanged.
    /// `shape == Rectangular` with `length_us > 0` is rejected.
    /// Setting shape to `Rectangular` forces `length_us` to 0.
    pub fn set_slope(
        &mut self,
        shape: Option<SlopeShape>,
        length_us: Option<i32>,
    ) -> Result<(), CwError> {
        validate_slope_request(shape, length_us)?;

        if let Some(s) = shape {
            self.shape = s;
            if matches!(s, SlopeShape::Rectangular) {
                self.length_us = 0;
            }
        }
        if let Some(len) = length_us {
            self.length_us = len;
            if matches!(self.shape, SlopeShape::Rectangular) {
                self.length_us = 0;
            }
        }

        self.recompute();
        Ok(())
    }

    fn recompute(&mut self) {
        if matches!(self.shape, SlopeShape::Rectangular) || self.length_us == 0 {
            self.amplitudes.clear();
            return;
        }
        let n = (self.length_us as i64 * self.sample_rate as i64 / 1_000_000).max(1) as usize;
        self.amplitudes = (0..n)
            .map(|i| {
                if n == 1 {
                    1.0
                } else {
                    let frac = i as f32 / (n - 1) as f32;
                    match self.shape {
                        SlopeShape::Linear => frac,
                        SlopeShape::RaisedCosine => (1.0 - (std::f32::consts::PI * frac).cos()) / 2.0,
                        SlopeShape::Sine => (std::f32::consts::PI * frac / 2.0).sin(),
                        SlopeShape::Rectangular => unreachable!(),
                    }
                }
            })
            .collect();
    }

    /// Envelope multiplier for sample index `k` of a tone `n_samples` long,
    /// given which edges are active.
    pub fn envelope(&self, k: usize, n_samples: usize, rising: bool, falling: bool) -> f32 {
        let n = self.amplitudes.len();
        if n == 0 {
            return 1.0;
        }
        if rising && k < n {
            return self.amplitudes[k];
        }
        if falling && n_samples >= 1 && k + n > n_samples.saturating_sub(1) {
            let from_end = n_samples - 1 - k;
            if from_end < n {
                return self.amplitudes[from_end];
            }
        }
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangular_with_positive_length_is_invalid() {
        let mut t = SlopeTable::new(8000);
        assert!(t.set_slope(Some(SlopeShape::Rectangular), Some(10)).is_err());
    }

    #[test]
    fn linear_zero_length_is_ok() {
        let mut t = SlopeTable::new(8000);
        assert!(t.set_slope(Some(SlopeShape::Linear), Some(0)).is_ok());
        assert_eq!(t.shape(), SlopeShape::Linear);
        assert_eq!(t.length_us(), 0);
    }

    #[test]
    fn none_none_is_noop() {
        let mut t = SlopeTable::new(8000);
        t.set_slope(Some(SlopeShape::Linear), Some(5000)).unwrap();
        let before = (t.shape(), t.length_us());
        t.set_slope(None, None).unwrap();
        assert_eq!((t.shape(), t.length_us()), before);
    }

    #[test]
    fn rectangular_shape_only_forces_length_zero() {
        let mut t = SlopeTable::new(8000);
        t.set_slope(Some(SlopeShape::Linear), Some(5000)).unwrap();
        t.set_slope(Some(SlopeShape::Rectangular), None).unwrap();
        assert_eq!(t.shape(), SlopeShape::Rectangular);
        assert_eq!(t.length_us(), 0);
    }

    #[test]
    fn amplitudes_rise_monotonically() {
        let mut t = SlopeTable::new(8000);
        t.set_slope(Some(SlopeShape::Linear), Some(5000)).unwrap();
        let amps = t.amplitudes();
        for w in amps.windows(2) {
            assert!(w[1] >= w[0]);
        }
        assert!((amps[0] - 0.0).abs() < 1e-6);
        assert!((amps[amps.len() - 1] - 1.0).abs() < 1e-3);
    }
}
