use rand::Rng;
use rayon::prelude::*;

use crate::buffer::{Axis, PixelBuffer, Selection, to_sample, wrap};
use crate::effects::Parameters;
use crate::error::Result;
use crate::waveform::{LfoShape, lfo_wave};

use super::{EffectContext, PixelEffect, scoped_copy};

/// Per-column horizontal offsets: the normalized LFO wave scaled by
/// `strength` (a fraction) and the buffer width, truncated.
fn column_offsets(params: &Parameters, strength: f64, width: u32) -> Result<Vec<i64>> {
    let shape: LfoShape = params.choice("wave_type")?.parse()?;
    let lfo = params.float("lfo")?;
    let phase = params.float("phase")?;
    Ok(lfo_wave(shape, lfo, phase, width as usize)
        .into_iter()
        .map(|v| (v * strength * width as f64) as i64)
        .collect())
}

/// Resample every pixel from `(x + dx[x], y + dy[y][x])`, wrapping at the
/// edges. `dy` is row-major; `None` means no vertical displacement.
fn displace(input: &PixelBuffer, dx: &[i64], dy: Option<&[i64]>) -> PixelBuffer {
    let (w, h) = (input.width() as usize, input.height() as usize);
    let mut output = input.clone();
    let stride = output.stride();
    // Row-based parallelism; every output row reads the untouched input.
    output
        .as_raw_mut()
        .par_chunks_exact_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(3).enumerate() {
                let sx = wrap(x as i64 + dx[x], w);
                let sy = match dy {
                    Some(dy) => wrap(y as i64 + dy[y * w + x], h),
                    None => y,
                };
                px.copy_from_slice(&input.pixel(sx as u32, sy as u32));
            }
        });
    output
}

// =============================================================================
// Legacy tremolo
// =============================================================================

/// Horizontal LFO displacement with no blending.
pub struct LegacyTremoloEffect;

impl PixelEffect for LegacyTremoloEffect {
    fn process(
        &self,
        input: &PixelBuffer,
        params: &Parameters,
        selections: &[Selection],
        _ctx: &EffectContext,
    ) -> Result<PixelBuffer> {
        let wet = params.float("wet")? / 100.0;
        let dx = column_offsets(params, wet, input.width())?;
        let displaced = displace(input, &dx, None);
        Ok(scoped_copy(input, displaced, selections, Axis::Horizontal))
    }

    fn is_identity(&self, params: &Parameters) -> bool {
        params.float("wet").is_ok_and(|w| w == 0.0)
    }
}

// =============================================================================
// Dynamic tremolo
// =============================================================================

/// LFO displacement across columns plus a random vertical displacement per
/// pixel, blended with the input by `wet`.
pub struct DynamicTremoloEffect;

impl PixelEffect for DynamicTremoloEffect {
    fn process(
        &self,
        input: &PixelBuffer,
        params: &Parameters,
        selections: &[Selection],
        ctx: &EffectContext,
    ) -> Result<PixelBuffer> {
        let wet = params.float("wet")? / 100.0;
        let strength = params.float("displacement_strength")? / 100.0;
        let height = input.height() as f64;

        let dx = column_offsets(params, strength, input.width())?;
        let mut rng = ctx.rng();
        let dy: Vec<i64> = (0..input.pixel_count())
            .map(|_| (rng.r#gen::<f64>() * strength * height) as i64)
            .collect();
        let displaced = displace(input, &dx, Some(&dy));

        let blended: Vec<u8> = input
            .as_raw()
            .par_iter()
            .zip(displaced.as_raw().par_iter())
            .map(|(&dry, &moved)| {
                let dry = dry as f64;
                to_sample((dry + wet * (moved as f64 - dry)) as f32)
            })
            .collect();
        let blended = PixelBuffer::from_rgb_vec(input.width(), input.height(), blended)?;
        Ok(scoped_copy(input, blended, selections, Axis::Horizontal))
    }

    fn is_identity(&self, params: &Parameters) -> bool {
        params.float("wet").is_ok_and(|w| w == 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Channel;
    use crate::effects::EffectType;

    fn stripes(width: u32, height: u32) -> PixelBuffer {
        let mut buf = PixelBuffer::new(width, height);
        for y in 0..height {
            for x in 0..width {
                buf.pixel_mut(x, y).copy_from_slice(&[(x * 10) as u8, (y * 10) as u8, 77]);
            }
        }
        buf
    }

    #[test]
    fn test_displace_horizontal_wraps() {
        let input = stripes(4, 1);
        let out = displace(&input, &[1, 1, 1, 1], None);
        let reds: Vec<u8> = (0..4).map(|x| out.sample(x, 0, Channel::Red)).collect();
        assert_eq!(reds, vec![10, 20, 30, 0]);
    }

    #[test]
    fn test_legacy_square_full_wet_is_whole_width_shift() {
        // With lfo 0 the square wave sits at +1 everywhere, so every column
        // moves by a full width, which wraps back onto itself.
        let params = EffectType::TremoloLegacy
            .default_parameters()
            .with("wave_type", "square")
            .with("wet", 100.0)
            .with("lfo", 0.0)
            .with("phase", 90.0);
        let input = stripes(5, 3);
        let out = LegacyTremoloEffect
            .process(&input, &params, &[], &EffectContext::default())
            .unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_legacy_selection_scoped() {
        let params = EffectType::TremoloLegacy
            .default_parameters()
            .with("wave_type", "sawtooth")
            .with("lfo", 3.0);
        let input = stripes(12, 4);
        let selections = [Selection::new(2, 6, Channel::Blue)];
        let out = LegacyTremoloEffect
            .process(&input, &params, &selections, &EffectContext::default())
            .unwrap();
        for y in 0..4 {
            for x in 0..12 {
                assert_eq!(out.sample(x, y, Channel::Red), input.sample(x, y, Channel::Red));
                assert_eq!(out.sample(x, y, Channel::Green), input.sample(x, y, Channel::Green));
            }
        }
    }

    #[test]
    fn test_dynamic_seeded_is_reproducible() {
        let params = EffectType::DynamicTremolo.default_parameters();
        let input = stripes(16, 8);
        let a = DynamicTremoloEffect
            .process(&input, &params, &[], &EffectContext::seeded(42))
            .unwrap();
        let b = DynamicTremoloEffect
            .process(&input, &params, &[], &EffectContext::seeded(42))
            .unwrap();
        assert_eq!(a, b);
        assert_ne!(a, input);
    }

    #[test]
    fn test_dynamic_zero_strength_is_identity_after_blend() {
        let params = EffectType::DynamicTremolo
            .default_parameters()
            .with("displacement_strength", 0.0)
            .with("wet", 70.0);
        let input = stripes(6, 6);
        let out = DynamicTremoloEffect
            .process(&input, &params, &[], &EffectContext::seeded(1))
            .unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_is_identity_when_dry() {
        let params = EffectType::TremoloLegacy.default_parameters().with("wet", 0.0);
        assert!(LegacyTremoloEffect.is_identity(&params));
        let params = EffectType::DynamicTremolo.default_parameters().with("wet", 0);
        assert!(DynamicTremoloEffect.is_identity(&params));
    }
}
