use crate::buffer::{Axis, Channel, PixelBuffer, Plane, Selection, roll_into};
use crate::effects::Parameters;
use crate::error::Result;

use super::{EffectContext, PixelEffect, process_planes};

/// Treats a region's intensity as a signal, runs it through an echo, tone
/// and mix chain, and re-projects the result onto each channel while keeping
/// that channel's mean brightness.
pub struct ReverbEffect;

#[derive(Debug, Clone, Copy)]
struct ReverbSettings {
    room_size: f64,
    pre_delay: f64,
    reverberance: f64,
    hf_damping: f64,
    tone_low: f64,
    tone_high: f64,
    wet_gain: f64,
    dry_gain: f64,
    wet_only: bool,
}

fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

impl ReverbSettings {
    fn from_params(params: &Parameters) -> Result<Self> {
        Ok(Self {
            room_size: params.float("room_size")? / 100.0,
            pre_delay: params.float("pre_delay")?,
            reverberance: params.float("reverberance")? / 100.0,
            hf_damping: params.float("hf_damping")? / 100.0,
            tone_low: params.float("tone_low")? / 100.0,
            tone_high: params.float("tone_high")? / 100.0,
            wet_gain: db_to_linear(params.float("wet_gain")?),
            dry_gain: db_to_linear(params.float("dry_gain")?),
            wet_only: params.flag("wet_only")?,
        })
    }

    /// Run the chain over a `width` x `height` signal in `[0, 1]`. Returns
    /// the mixed field normalized to `[0, 1]`, or `None` when a
    /// normalization step has nothing to divide by.
    fn mix(&self, audio: &[f64], width: usize, height: usize) -> Option<Vec<f64>> {
        let delay_samples = (self.pre_delay * height as f64 / 1000.0) as i64;
        let num_echoes = (self.room_size * 20.0) as i64;

        let mut wet = vec![0.0; audio.len()];
        let mut echo = vec![0.0; audio.len()];
        for i in 0..num_echoes {
            let gain = self.reverberance.powf(i as f64 / num_echoes as f64)
                * (1.0 - self.hf_damping).powi(i as i32);
            // The roll runs over the flattened signal, so echoes spill across rows.
            roll_into(audio, i * delay_samples, &mut echo);
            for (w, e) in wet.iter_mut().zip(&echo) {
                *w += e * gain;
            }
        }

        // Tone: low shelf on the level, high shelf on the per-row slope.
        let mut toned = vec![0.0; wet.len()];
        for y in 0..height {
            let row = &wet[y * width..(y + 1) * width];
            let mut prev = 0.0;
            for (x, &v) in row.iter().enumerate() {
                toned[y * width + x] = v * self.tone_low + (v - prev) * self.tone_high;
                prev = v;
            }
        }

        let peak = toned.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        if peak == 0.0 || !peak.is_finite() {
            tracing::debug!("reverb: silent echo, leaving region unchanged");
            return None;
        }

        let mut mixed: Vec<f64> = toned
            .iter()
            .zip(audio)
            .map(|(&w, &dry)| {
                let w = w / peak;
                if self.wet_only {
                    self.wet_gain * w
                } else {
                    self.dry_gain * dry + self.wet_gain * w
                }
            })
            .collect();

        let (min, max) = mixed
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let range = max - min;
        if range <= 0.0 || !range.is_finite() {
            tracing::debug!("reverb: flat mix, leaving region unchanged");
            return None;
        }
        mixed.iter_mut().for_each(|v| *v = (*v - min) / range);
        Some(mixed)
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len().max(1) as f64
}

/// Multiply a channel by the mixed field and rescale it back to its
/// original mean. A channel the field blacks out entirely is kept as is.
fn reproject(channel: &Plane, mixed: &[f64]) -> Plane {
    let norm: Vec<f64> = channel.data.iter().map(|&v| v as f64 / 255.0).collect();
    let reverbed: Vec<f64> = norm.iter().zip(mixed).map(|(c, m)| c * m).collect();
    let (before, after) = (mean(&norm), mean(&reverbed));
    if after == 0.0 {
        return channel.clone();
    }
    let factor = before / after;
    let data = reverbed
        .iter()
        .map(|&v| (v * factor * 255.0).clamp(0.0, 255.0) as f32)
        .collect();
    Plane::from_vec(channel.width, channel.height, data)
}

impl PixelEffect for ReverbEffect {
    fn process(
        &self,
        input: &PixelBuffer,
        params: &Parameters,
        selections: &[Selection],
        _ctx: &EffectContext,
    ) -> Result<PixelBuffer> {
        let settings = ReverbSettings::from_params(params)?;

        if !selections.is_empty() {
            return process_planes(input, selections, Axis::Horizontal, |_, _, plane| {
                let audio: Vec<f64> = plane.data.iter().map(|&v| v as f64 / 255.0).collect();
                Ok(match settings.mix(&audio, plane.width, plane.height) {
                    Some(mixed) => reproject(&plane, &mixed),
                    None => plane,
                })
            });
        }

        // Whole buffer: the signal is the per-pixel channel mean.
        let region = input.full_region();
        let planes = Channel::ALL.map(|c| input.read_plane(region, c));
        let (width, height) = (planes[0].width, planes[0].height);
        let audio: Vec<f64> = (0..width * height)
            .map(|i| planes.iter().map(|p| p.data[i] as f64).sum::<f64>() / 3.0 / 255.0)
            .collect();
        let Some(mixed) = settings.mix(&audio, width, height) else {
            return Ok(input.clone());
        };

        let mut output = input.clone();
        for (channel, plane) in Channel::ALL.into_iter().zip(&planes) {
            output.write_plane(region, channel, &reproject(plane, &mixed));
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::EffectType;

    fn noisy(width: u32, height: u32) -> PixelBuffer {
        let data = (0..width * height * 3)
            .map(|i| ((i * 97 + 13) % 251) as u8)
            .collect();
        PixelBuffer::from_rgb_vec(width, height, data).unwrap()
    }

    #[test]
    fn test_db_to_linear() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-12);
        assert!((db_to_linear(-20.0) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_zero_room_is_identity() {
        // No echoes means a zero wet signal; the region is left alone.
        let params = EffectType::Reverb.default_parameters().with("room_size", 0.0);
        let input = noisy(8, 8);
        let out = ReverbEffect
            .process(&input, &params, &[], &EffectContext::default())
            .unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_flat_region_is_identity() {
        let input = PixelBuffer::filled(6, 4, [90, 90, 90]);
        let params = EffectType::Reverb
            .default_parameters()
            .with("tone_high", 0.0)
            .with("pre_delay", 0.0);
        let out = ReverbEffect
            .process(&input, &params, &[], &EffectContext::default())
            .unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_reverb_changes_textured_image() {
        let input = noisy(16, 12);
        let out = ReverbEffect
            .process(
                &input,
                &EffectType::Reverb.default_parameters(),
                &[],
                &EffectContext::default(),
            )
            .unwrap();
        assert!(out.same_shape(&input));
        assert_ne!(out, input);
    }

    #[test]
    fn test_selection_scoped() {
        let input = noisy(10, 6);
        let selections = [Selection::new(3, 7, Channel::Green)];
        let out = ReverbEffect
            .process(
                &input,
                &EffectType::Reverb.default_parameters(),
                &selections,
                &EffectContext::default(),
            )
            .unwrap();
        for y in 0..6 {
            for x in 0..10 {
                assert_eq!(out.sample(x, y, Channel::Red), input.sample(x, y, Channel::Red));
                if !(3..7).contains(&x) {
                    assert_eq!(
                        out.sample(x, y, Channel::Green),
                        input.sample(x, y, Channel::Green)
                    );
                }
            }
        }
    }

    #[test]
    fn test_reproject_keeps_black_channel() {
        let channel = Plane::from_vec(2, 1, vec![0.0, 0.0]);
        assert_eq!(reproject(&channel, &[0.5, 1.0]), channel);
    }
}
