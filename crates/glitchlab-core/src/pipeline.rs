use std::collections::HashMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::buffer::{Axis, Channel, PixelBuffer, Plane, Region, Selection};
use crate::effects::{EffectRecord, EffectType, Parameters};
use crate::error::{CoreError, Result};

mod channel_shift;
mod delay;
mod pixel_sort;
mod quantize;
mod reverb;
mod tremolo;
mod wave_distortion;

pub use channel_shift::ChannelShiftEffect;
pub use delay::DelayEffect;
pub use pixel_sort::PixelSortEffect;
pub use quantize::ColorQuantizationEffect;
pub use reverb::ReverbEffect;
pub use tremolo::{DynamicTremoloEffect, LegacyTremoloEffect};
pub use wave_distortion::WaveDistortionEffect;

// =============================================================================
// PixelEffect trait and EffectContext
// =============================================================================

/// Per-invocation inputs that aren't effect parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EffectContext {
    /// Seed for effects that draw random numbers. `None` draws a fresh one.
    pub seed: Option<u64>,
}

impl EffectContext {
    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    /// The random source for this invocation.
    pub fn rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.seed.unwrap_or_else(rand::random))
    }
}

/// Trait for glitch effects. `process` reads the input buffer and returns a
/// new buffer of the same dimensions. Parameters have already been validated
/// against the effect's schema when called through [`EffectRegistry`].
pub trait PixelEffect: Send + Sync {
    fn process(
        &self,
        input: &PixelBuffer,
        params: &Parameters,
        selections: &[Selection],
        ctx: &EffectContext,
    ) -> Result<PixelBuffer>;

    /// Returns true if the given parameters produce an identity transform
    /// (output == input). Used to skip processing.
    fn is_identity(&self, params: &Parameters) -> bool {
        let _ = params;
        false
    }
}

// =============================================================================
// Selection scoping
// =============================================================================

/// The `(region, channel)` slices an effect runs over: one per usable
/// selection, or every channel of the whole buffer when there are none.
pub(crate) fn scopes(
    input: &PixelBuffer,
    selections: &[Selection],
    axis: Axis,
) -> Vec<(Region, Channel)> {
    if selections.is_empty() {
        return Channel::ALL
            .iter()
            .map(|&c| (input.full_region(), c))
            .collect();
    }
    selections
        .iter()
        .filter_map(|sel| match sel.region(axis, input.width(), input.height()) {
            Some(region) => Some((region, sel.channel)),
            None => {
                tracing::debug!(?sel, "skipping empty selection");
                None
            }
        })
        .collect()
}

/// Run `transform` on each scoped channel plane. Every plane is read from
/// `input` and written into one shared output, in selection order.
pub(crate) fn process_planes<F>(
    input: &PixelBuffer,
    selections: &[Selection],
    axis: Axis,
    mut transform: F,
) -> Result<PixelBuffer>
where
    F: FnMut(Region, Channel, Plane) -> Result<Plane>,
{
    let mut output = input.clone();
    for (region, channel) in scopes(input, selections, axis) {
        let plane = input.read_plane(region, channel);
        let processed = transform(region, channel, plane)?;
        output.write_plane(region, channel, &processed);
    }
    Ok(output)
}

/// Copy each selected slice of `processed` over `input`; the whole of
/// `processed` when there are no selections.
pub(crate) fn scoped_copy(
    input: &PixelBuffer,
    processed: PixelBuffer,
    selections: &[Selection],
    axis: Axis,
) -> PixelBuffer {
    if selections.is_empty() {
        return processed;
    }
    let mut output = input.clone();
    for (region, channel) in scopes(input, selections, axis) {
        output.copy_region_from(&processed, region, channel);
    }
    output
}

// =============================================================================
// Effect Registry
// =============================================================================

/// Maps EffectType to its PixelEffect implementation. Built-in effects are
/// registered at startup.
pub struct EffectRegistry {
    effects: HashMap<EffectType, Box<dyn PixelEffect>>,
}

impl EffectRegistry {
    /// Create a registry with all built-in effects registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            effects: HashMap::new(),
        };
        registry.register(EffectType::ChannelShift, Box::new(ChannelShiftEffect));
        registry.register(EffectType::Delay, Box::new(DelayEffect));
        registry.register(EffectType::PixelSort, Box::new(PixelSortEffect));
        registry.register(EffectType::TremoloLegacy, Box::new(LegacyTremoloEffect));
        registry.register(EffectType::DynamicTremolo, Box::new(DynamicTremoloEffect));
        registry.register(EffectType::Reverb, Box::new(ReverbEffect));
        registry.register(EffectType::WaveDistortion, Box::new(WaveDistortionEffect));
        registry.register(EffectType::ColorQuantization, Box::new(ColorQuantizationEffect));
        registry
    }

    /// Look up the pixel effect implementation for a given type.
    pub fn get(&self, effect_type: &EffectType) -> Option<&dyn PixelEffect> {
        self.effects.get(effect_type).map(|e| e.as_ref())
    }

    /// Register (or replace) an effect implementation.
    pub fn register(&mut self, effect_type: EffectType, effect: Box<dyn PixelEffect>) {
        self.effects.insert(effect_type, effect);
    }

    /// Validate `params` and run one effect. Nothing is computed when
    /// validation fails.
    #[tracing::instrument(
        level = "debug",
        skip(self, input, params, selections),
        fields(effect = %effect_type)
    )]
    pub fn execute(
        &self,
        effect_type: EffectType,
        input: &PixelBuffer,
        params: &Parameters,
        selections: &[Selection],
        ctx: &EffectContext,
    ) -> Result<PixelBuffer> {
        let effect = self
            .get(&effect_type)
            .ok_or_else(|| CoreError::unsupported("effect", effect_type.id()))?;
        effect_type.validate(params)?;

        if input.is_empty() || effect.is_identity(params) {
            tracing::debug!("identity parameters, skipping");
            return Ok(input.clone());
        }

        let output = effect.process(input, params, selections, ctx)?;
        debug_assert!(output.same_shape(input), "{effect_type} changed the buffer shape");
        Ok(output)
    }

    /// Run one recorded effect.
    pub fn apply_record(&self, input: &PixelBuffer, record: &EffectRecord) -> Result<PixelBuffer> {
        self.execute(
            record.effect_type,
            input,
            &record.parameters,
            &record.selections,
            &EffectContext { seed: record.seed },
        )
    }

    /// Fold `records` over `original` in order, recomputing every effect.
    pub fn replay<'a, I>(&self, original: &PixelBuffer, records: I) -> Result<PixelBuffer>
    where
        I: IntoIterator<Item = &'a EffectRecord>,
    {
        let mut buffer = original.clone();
        for record in records {
            buffer = self.apply_record(&buffer, record)?;
        }
        Ok(buffer)
    }
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

// =============================================================================
// Tests
// =============================================================================
