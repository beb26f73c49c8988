use std::str::FromStr;

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::buffer::{Axis, PixelBuffer, Plane, Region, Selection};
use crate::effects::Parameters;
use crate::error::{CoreError, Result};
use crate::waveform::linspace;

use super::{EffectContext, PixelEffect, process_planes};

/// Reduces each sample to one of `num_colors` evenly spaced levels, after
/// optional bit-depth truncation and dithering.
pub struct ColorQuantizationEffect;

static ORDERED_5X3: [&[f32]; 3] = [
    &[0.0, 8.0, 2.0, 10.0, 4.0],
    &[12.0, 4.0, 14.0, 6.0, 1.0],
    &[3.0, 11.0, 5.0, 9.0, 7.0],
];
static ORDERED_4X1: [&[f32]; 1] = [&[0.0, 2.0, 1.0, 3.0]];
static ORDERED_3X3: [&[f32]; 3] = [&[0.0, 7.0, 3.0], &[6.0, 5.0, 2.0], &[4.0, 1.0, 8.0]];
static ORDERED_8X8: [&[f32]; 8] = [
    &[0.0, 48.0, 12.0, 60.0, 3.0, 51.0, 15.0, 63.0],
    &[32.0, 16.0, 44.0, 28.0, 35.0, 19.0, 47.0, 31.0],
    &[8.0, 56.0, 4.0, 52.0, 11.0, 59.0, 7.0, 55.0],
    &[40.0, 24.0, 36.0, 20.0, 43.0, 27.0, 39.0, 23.0],
    &[2.0, 50.0, 14.0, 62.0, 1.0, 49.0, 13.0, 61.0],
    &[34.0, 18.0, 46.0, 30.0, 33.0, 17.0, 45.0, 29.0],
    &[10.0, 58.0, 6.0, 54.0, 9.0, 57.0, 5.0, 53.0],
    &[42.0, 26.0, 38.0, 22.0, 41.0, 25.0, 37.0, 21.0],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DitherMode {
    None,
    Random,
    Ordered5x3,
    Ordered4x1,
    Ordered3x3,
    Ordered8x8,
}

impl FromStr for DitherMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(DitherMode::None),
            "random" => Ok(DitherMode::Random),
            "ordered_5x3" => Ok(DitherMode::Ordered5x3),
            "ordered_4x1" => Ok(DitherMode::Ordered4x1),
            "ordered_3x3" => Ok(DitherMode::Ordered3x3),
            "ordered_8x8" => Ok(DitherMode::Ordered8x8),
            other => Err(CoreError::unsupported("dither mode", other)),
        }
    }
}

impl DitherMode {
    /// Matrix rows and the divisor that maps entries into `[0, 1)`.
    fn matrix(self) -> Option<(&'static [&'static [f32]], f32)> {
        match self {
            DitherMode::Ordered5x3 => Some((ORDERED_5X3.as_slice(), 15.0)),
            DitherMode::Ordered4x1 => Some((ORDERED_4X1.as_slice(), 4.0)),
            DitherMode::Ordered3x3 => Some((ORDERED_3X3.as_slice(), 9.0)),
            DitherMode::Ordered8x8 => Some((ORDERED_8X8.as_slice(), 64.0)),
            DitherMode::None | DitherMode::Random => None,
        }
    }
}

struct Quantizer {
    levels: Vec<f32>,
    /// Low bits cleared by bit reduction; 0 when disabled.
    drop_bits: u32,
    dither: DitherMode,
    amount: f32,
}

impl Quantizer {
    fn from_params(params: &Parameters) -> Result<Self> {
        let num_colors = params.int("num_colors")?;
        let bit_reduction = params.int("bit_reduction")?;
        Ok(Self {
            levels: linspace(0.0, 255.0, num_colors as usize)
                .into_iter()
                .map(|l| l as f32)
                .collect(),
            drop_bits: (8 - bit_reduction.clamp(1, 8)) as u32,
            dither: params.choice("dither_mode")?.parse()?,
            amount: params.float("dither_amount")? as f32,
        })
    }

    /// Largest level not above `v` (a bucket lower bound).
    fn level(&self, v: f32) -> f32 {
        let idx = self.levels.partition_point(|&l| l <= v).saturating_sub(1);
        self.levels[idx]
    }

    /// Quantize one plane whose top-left sits at `origin` in the image, so
    /// ordered dither tiles line up across selections.
    fn apply(&self, mut plane: Plane, origin: Region, rng: &mut ChaCha8Rng) -> Plane {
        let matrix = if self.amount > 0.0 { self.dither.matrix() } else { None };
        // Any non-ordered mode dithers randomly, `none` included.
        let random = self.amount > 0.0 && matrix.is_none();
        for y in 0..plane.height {
            for x in 0..plane.width {
                let mut v = plane.get(x, y);
                if self.drop_bits > 0 {
                    v = (((v as u8) >> self.drop_bits) << self.drop_bits) as f32;
                }
                if let Some((rows, divisor)) = matrix {
                    let row = rows[(origin.y as usize + y) % rows.len()];
                    v += row[(origin.x as usize + x) % row.len()] / divisor * self.amount;
                } else if random {
                    v += rng.gen_range(-self.amount..self.amount);
                }
                plane.set(x, y, self.level(v.clamp(0.0, 255.0)));
            }
        }
        plane
    }
}

impl PixelEffect for ColorQuantizationEffect {
    fn process(
        &self,
        input: &PixelBuffer,
        params: &Parameters,
        selections: &[Selection],
        ctx: &EffectContext,
    ) -> Result<PixelBuffer> {
        let quantizer = Quantizer::from_params(params)?;
        let mut rng = ctx.rng();
        process_planes(input, selections, Axis::Horizontal, |region, _, plane| {
            Ok(quantizer.apply(plane, region, &mut rng))
        })
    }
}
