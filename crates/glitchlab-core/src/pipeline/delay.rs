use rayon::prelude::*;

use crate::buffer::{Axis, PixelBuffer, Plane, Selection, roll_into};
use crate::effects::Parameters;
use crate::error::Result;

use super::{EffectContext, PixelEffect, process_planes};

/// Feed-forward echo along each row: the signal plus `num_echoes` copies
/// rolled by multiples of `delay_time`, the i-th scaled by `decay_factor^i`.
pub struct DelayEffect;

fn echo_plane(plane: Plane, delay_time: i64, num_echoes: i64, decay: f32) -> Plane {
    let width = plane.width;
    let mut out = plane.data.clone();
    // Row-based parallelism; each row is an independent signal.
    out.par_chunks_exact_mut(width.max(1))
        .zip(plane.data.par_chunks_exact(width.max(1)))
        .for_each(|(dst, src)| {
            let mut echo = vec![0.0f32; src.len()];
            for i in 1..=num_echoes {
                let gain = decay.powi(i as i32);
                roll_into(src, i * delay_time, &mut echo);
                for (d, e) in dst.iter_mut().zip(&echo) {
                    *d += e * gain;
                }
            }
        });
    Plane::from_vec(width, plane.height, out)
}

impl PixelEffect for DelayEffect {
    fn process(
        &self,
        input: &PixelBuffer,
        params: &Parameters,
        selections: &[Selection],
        _ctx: &EffectContext,
    ) -> Result<PixelBuffer> {
        let delay_time = params.int("delay_time")?;
        let num_echoes = params.int("num_echoes")?;
        let decay = params.float("decay_factor")? as f32;
        process_planes(input, selections, Axis::Horizontal, |_, _, plane| {
            Ok(echo_plane(plane, delay_time, num_echoes, decay))
        })
    }

    fn is_identity(&self, params: &Parameters) -> bool {
        params.int("num_echoes").is_ok_and(|n| n == 0)
            || params.float("decay_factor").is_ok_and(|d| d == 0.0)
    }
}
