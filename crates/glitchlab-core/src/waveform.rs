//! Synthetic waveforms used as displacement sources.
//!
//! Two families exist: the tremolo LFO shapes, sampled over `[0, 1]` and
//! normalized to `[0, 1]`, and the wave-distortion shapes, sampled over
//! `[0, 2π]` and scaled to integer pixel offsets.

use std::f64::consts::{PI, TAU};
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// `n` evenly spaced samples over `[start, end]`, both ends included.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            let mut out: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            out[n - 1] = end;
            out
        }
    }
}

/// Sign with `sign(0) == 0`, unlike `f64::signum`.
fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

// =============================================================================
// Tremolo LFO
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LfoShape {
    Sine,
    Triangle,
    Sawtooth,
    InverseSawtooth,
    Square,
}

impl FromStr for LfoShape {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sine" => Ok(LfoShape::Sine),
            "triangle" => Ok(LfoShape::Triangle),
            "sawtooth" => Ok(LfoShape::Sawtooth),
            "inverse_sawtooth" => Ok(LfoShape::InverseSawtooth),
            "square" => Ok(LfoShape::Square),
            other => Err(CoreError::unsupported("wave type", other)),
        }
    }
}

/// Modulation wave across `len` columns, `lfo` cycles wide, normalized to `[0, 1]`.
///
/// Only the sine and square shapes honour `phase_deg`; the ramp shapes always
/// start at the origin.
pub fn lfo_wave(shape: LfoShape, lfo: f64, phase_deg: f64, len: usize) -> Vec<f64> {
    linspace(0.0, 1.0, len)
        .into_iter()
        .map(|t| {
            let x = lfo * t;
            let ramp = x - (0.5 + x).floor();
            let v = match shape {
                LfoShape::Sine => (TAU * x + (phase_deg - 90.0).to_radians()).sin(),
                LfoShape::Triangle => 2.0 * (2.0 * ramp).abs() - 1.0,
                LfoShape::Sawtooth => 2.0 * ramp,
                LfoShape::InverseSawtooth => -2.0 * ramp,
                LfoShape::Square => sign((TAU * x + phase_deg.to_radians()).sin()),
            };
            (v + 1.0) / 2.0
        })
        .collect()
}

// =============================================================================
// Wave distortion
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
    Square,
    Sawtooth,
    Pulse,
}

impl FromStr for Waveform {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sine" => Ok(Waveform::Sine),
            "triangle" => Ok(Waveform::Triangle),
            "square" => Ok(Waveform::Square),
            "sawtooth" => Ok(Waveform::Sawtooth),
            "pulse" => Ok(Waveform::Pulse),
            other => Err(CoreError::unsupported("waveform", other)),
        }
    }
}

/// Integer offsets for `len` lines: one full `[0, 2π]` sweep scaled by
/// `frequency`, shifted by `phase` (radians, taken as given), multiplied by
/// `amplitude` and truncated toward zero.
///
/// The sawtooth ignores `frequency` and always spans a single ramp.
pub fn displacement(
    waveform: Waveform,
    amplitude: f64,
    frequency: f64,
    phase: f64,
    len: usize,
) -> Vec<i64> {
    linspace(0.0, TAU, len)
        .into_iter()
        .map(|x| {
            let arg = frequency * x + phase;
            let y = match waveform {
                Waveform::Sine => arg.sin(),
                Waveform::Triangle => (2.0 / PI) * arg.sin().asin(),
                Waveform::Square => sign(arg.sin()),
                Waveform::Sawtooth => (x + phase).rem_euclid(TAU) / PI - 1.0,
                Waveform::Pulse => {
                    if arg.sin() > 0.0 {
                        1.0
                    } else {
                        0.0
                    }
                }
            };
            (amplitude * y) as i64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linspace_endpoints() {
        assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace(0.0, 1.0, 1), vec![0.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_lfo_wave_normalized() {
        for shape in [
            LfoShape::Sine,
            LfoShape::Triangle,
            LfoShape::Sawtooth,
            LfoShape::InverseSawtooth,
            LfoShape::Square,
        ] {
            let wave = lfo_wave(shape, 3.0, 45.0, 64);
            assert_eq!(wave.len(), 64);
            assert!(wave.iter().all(|&v| (0.0..=1.0).contains(&v)), "{shape:?}");
        }
    }

    #[test]
    fn test_lfo_sine_starts_at_trough() {
        // phase 0 shifts the sine by -90°, so the wave starts at its minimum.
        let wave = lfo_wave(LfoShape::Sine, 1.0, 0.0, 5);
        assert!(wave[0].abs() < 1e-12);
        assert!((wave[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_square_sign_of_zero() {
        // sin(0) == 0 normalizes to the midpoint.
        let wave = lfo_wave(LfoShape::Square, 1.0, 0.0, 3);
        assert_eq!(wave[0], 0.5);
    }

    #[test]
    fn test_displacement_zero_amplitude() {
        for waveform in [
            Waveform::Sine,
            Waveform::Triangle,
            Waveform::Square,
            Waveform::Sawtooth,
            Waveform::Pulse,
        ] {
            assert!(displacement(waveform, 0.0, 5.0, 30.0, 16).iter().all(|&d| d == 0));
        }
    }

    #[test]
    fn test_displacement_bounded_by_amplitude() {
        let d = displacement(Waveform::Sine, 10.0, 3.0, 0.0, 100);
        assert!(d.iter().all(|&v| v.abs() <= 10));
        assert!(d.iter().any(|&v| v != 0));
        let p = displacement(Waveform::Pulse, 7.0, 1.0, 0.0, 9);
        assert!(p.iter().all(|&v| v == 0 || v == 7));
    }

    #[test]
    fn test_sawtooth_is_a_single_ramp() {
        // Frequency has no effect on the sawtooth; the last sample wraps.
        let expected = vec![-10, -8, -6, -4, -2, 0, 0, 2, 4, 6, 8, -10];
        assert_eq!(displacement(Waveform::Sawtooth, 10.0, 5.0, 0.0, 12), expected);
        assert_eq!(displacement(Waveform::Sawtooth, 10.0, 1.0, 0.0, 12), expected);
    }

    #[test]
    fn test_displacement_phase_is_radians() {
        assert_eq!(
            displacement(Waveform::Sine, 10.0, 1.0, 90.0, 8),
            vec![8, 2, -6, -9, -6, 2, 9, 8]
        );
    }

    #[test]
    fn test_unknown_waveform() {
        assert!("noise".parse::<Waveform>().is_err());
        assert!("Sine".parse::<LfoShape>().is_err());
    }
}
