use rayon::prelude::*;

use crate::buffer::{Axis, PixelBuffer, Plane, Selection, roll_into, wrap};
use crate::effects::Parameters;
use crate::error::Result;
use crate::waveform::{Waveform, displacement};

use super::{EffectContext, PixelEffect, process_planes};

/// Rolls each row (or column) by a waveform-shaped offset.
pub struct WaveDistortionEffect;

#[derive(Debug, Clone, Copy)]
struct WaveSettings {
    waveform: Waveform,
    amplitude: f64,
    frequency: f64,
    phase: f64,
}

impl WaveSettings {
    fn offsets(&self, len: usize) -> Vec<i64> {
        displacement(self.waveform, self.amplitude, self.frequency, self.phase, len)
    }
}

/// Row `i` rolls by `offsets[i % width]`; the waveform is sampled across the
/// plane's width.
fn distort_rows(plane: Plane, wave: &WaveSettings) -> Plane {
    let width = plane.width.max(1);
    let offsets = wave.offsets(plane.width);
    let mut out = plane.data.clone();
    out.par_chunks_exact_mut(width)
        .zip(plane.data.par_chunks_exact(width))
        .enumerate()
        .for_each(|(i, (dst, src))| roll_into(src, offsets[i % width], dst));
    Plane::from_vec(plane.width, plane.height, out)
}

fn distort_plane(plane: Plane, wave: &WaveSettings, axis: Axis) -> Plane {
    match axis {
        Axis::Horizontal => distort_rows(plane, wave),
        Axis::Vertical => distort_rows(plane.transposed(), wave).transposed(),
    }
}

/// Whole-buffer path: pixels move as RGB triples.
fn distort_rgb(input: &PixelBuffer, wave: &WaveSettings, axis: Axis) -> PixelBuffer {
    let (w, h) = (input.width() as usize, input.height() as usize);
    let mut output = input.clone();
    let stride = output.stride();
    match axis {
        Axis::Horizontal => {
            let offsets = wave.offsets(w);
            output
                .as_raw_mut()
                .par_chunks_exact_mut(stride)
                .zip(input.as_raw().par_chunks_exact(stride))
                .enumerate()
                .for_each(|(y, (dst, src))| roll_into(src, offsets[y % w] * 3, dst));
        }
        Axis::Vertical => {
            // Column x rolls down by offsets[x % h].
            let offsets = wave.offsets(h);
            output
                .as_raw_mut()
                .par_chunks_exact_mut(stride)
                .enumerate()
                .for_each(|(y, row)| {
                    for (x, px) in row.chunks_exact_mut(3).enumerate() {
                        let sy = wrap(y as i64 - offsets[x % h], h);
                        px.copy_from_slice(&input.pixel(x as u32, sy as u32));
                    }
                });
        }
    }
    output
}

impl PixelEffect for WaveDistortionEffect {
    fn process(
        &self,
        input: &PixelBuffer,
        params: &Parameters,
        selections: &[Selection],
        _ctx: &EffectContext,
    ) -> Result<PixelBuffer> {
        let wave = WaveSettings {
            waveform: params.choice("waveform")?.parse()?,
            amplitude: params.float("amplitude")?,
            frequency: params.float("frequency")?,
            phase: params.float("phase")?,
        };
        let axis: Axis = params.choice("direction")?.parse()?;

        if selections.is_empty() {
            return Ok(distort_rgb(input, &wave, axis));
        }
        process_planes(input, selections, axis, |_, _, plane| {
            Ok(distort_plane(plane, &wave, axis))
        })
    }

    fn is_identity(&self, params: &Parameters) -> bool {
        params.float("amplitude").is_ok_and(|a| a == 0.0)
    }
}
