use glitchlab_core::buffer::{Channel, PixelBuffer, Selection};
use glitchlab_core::effects::{EffectRecord, EffectType, ParameterValue, Parameters};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

enum Fill {
    Solid([u8; 3]),
    Gradient,
    Checkerboard { cell: u32, a: [u8; 3], b: [u8; 3] },
    Noise(u64),
}

/// Builder for test PixelBuffers. Defaults to a 16x16 mid-gray image.
pub struct PixelBufferBuilder {
    width: u32,
    height: u32,
    fill: Fill,
}

impl PixelBufferBuilder {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fill: Fill::Solid([128, 128, 128]),
        }
    }

    pub fn solid(mut self, rgb: [u8; 3]) -> Self {
        self.fill = Fill::Solid(rgb);
        self
    }

    /// Red ramps along x, green along y, blue along the diagonal.
    pub fn gradient(mut self) -> Self {
        self.fill = Fill::Gradient;
        self
    }

    pub fn checkerboard(mut self, cell: u32, a: [u8; 3], b: [u8; 3]) -> Self {
        self.fill = Fill::Checkerboard {
            cell: cell.max(1),
            a,
            b,
        };
        self
    }

    /// Uniform random samples from a seeded generator.
    pub fn noise(mut self, seed: u64) -> Self {
        self.fill = Fill::Noise(seed);
        self
    }

    pub fn build(self) -> PixelBuffer {
        let (w, h) = (self.width, self.height);
        let mut buf = PixelBuffer::new(w, h);
        let mut rng = match self.fill {
            Fill::Noise(seed) => Some(ChaCha8Rng::seed_from_u64(seed)),
            _ => None,
        };
        for y in 0..h {
            for x in 0..w {
                let px = match &self.fill {
                    Fill::Solid(rgb) => *rgb,
                    Fill::Gradient => [
                        (x * 255 / w.saturating_sub(1).max(1)) as u8,
                        (y * 255 / h.saturating_sub(1).max(1)) as u8,
                        ((x + y) * 255 / (w + h).saturating_sub(2).max(1)) as u8,
                    ],
                    Fill::Checkerboard { cell, a, b } => {
                        if (x / cell + y / cell) % 2 == 0 {
                            *a
                        } else {
                            *b
                        }
                    }
                    Fill::Noise(_) => match rng.as_mut() {
                        Some(rng) => [rng.r#gen(), rng.r#gen(), rng.r#gen()],
                        None => [0, 0, 0],
                    },
                };
                buf.pixel_mut(x, y).copy_from_slice(&px);
            }
        }
        buf
    }
}

/// Builder for EffectRecords: schema defaults plus overrides.
pub struct EffectRecordBuilder {
    effect_type: EffectType,
    parameters: Parameters,
    selections: Vec<Selection>,
    seed: Option<u64>,
}

impl EffectRecordBuilder {
    pub fn new(effect_type: EffectType) -> Self {
        Self {
            effect_type,
            parameters: effect_type.default_parameters(),
            selections: Vec::new(),
            seed: None,
        }
    }

    pub fn param(mut self, name: &str, value: impl Into<ParameterValue>) -> Self {
        self.parameters.set(name, value);
        self
    }

    pub fn select(mut self, start: u32, end: u32, channel: Channel) -> Self {
        self.selections.push(Selection::new(start, end, channel));
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn build(self) -> EffectRecord {
        let record = EffectRecord::with_parameters(self.effect_type, self.parameters)
            .selections(self.selections);
        match self.seed {
            Some(seed) => record.seed(seed),
            None => record,
        }
    }
}
