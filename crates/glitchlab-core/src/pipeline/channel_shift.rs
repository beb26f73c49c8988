use crate::buffer::{Axis, Channel, PixelBuffer, Selection};
use crate::effects::Parameters;
use crate::error::Result;

use super::{EffectContext, PixelEffect, process_planes};

/// Circularly rolls each color channel by its own `shift_<c>` along `axis_<c>`.
pub struct ChannelShiftEffect;

fn channel_params(params: &Parameters, channel: Channel) -> Result<(i64, Axis)> {
    let s = channel.suffix();
    let shift = params.int(&format!("shift_{s}"))?;
    let axis = params.choice(&format!("axis_{s}"))?.parse()?;
    Ok((shift, axis))
}

impl PixelEffect for ChannelShiftEffect {
    fn process(
        &self,
        input: &PixelBuffer,
        params: &Parameters,
        selections: &[Selection],
        _ctx: &EffectContext,
    ) -> Result<PixelBuffer> {
        let per_channel = [
            channel_params(params, Channel::Red)?,
            channel_params(params, Channel::Green)?,
            channel_params(params, Channel::Blue)?,
        ];
        process_planes(input, selections, Axis::Horizontal, |_, channel, plane| {
            let (shift, axis) = per_channel[channel.index()];
            if shift == 0 {
                return Ok(plane);
            }
            Ok(plane.rolled(axis, shift))
        })
    }

    fn is_identity(&self, params: &Parameters) -> bool {
        Channel::ALL
            .iter()
            .all(|c| params.int(&format!("shift_{}", c.suffix())).unwrap_or(0) == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::EffectType;

    fn shift_params(r: i64, axis_r: &str) -> Parameters {
        EffectType::ChannelShift
            .default_parameters()
            .with("shift_r", r)
            .with("axis_r", axis_r)
    }

    fn ramp(width: u32, height: u32) -> PixelBuffer {
        let data = (0..width * height)
            .flat_map(|i| [i as u8, 100 + i as u8, 200])
            .collect();
        PixelBuffer::from_rgb_vec(width, height, data).unwrap()
    }

    #[test]
    fn test_shift_red_right_by_one() {
        let input = ramp(4, 2);
        let out = ChannelShiftEffect
            .process(&input, &shift_params(1, "horizontal"), &[], &EffectContext::default())
            .unwrap();
        let reds: Vec<u8> = (0..4).map(|x| out.sample(x, 0, Channel::Red)).collect();
        assert_eq!(reds, vec![3, 0, 1, 2]);
        for x in 0..4 {
            assert_eq!(out.sample(x, 1, Channel::Green), input.sample(x, 1, Channel::Green));
        }
    }

    #[test]
    fn test_shift_vertical_negative() {
        let input = ramp(2, 3);
        let out = ChannelShiftEffect
            .process(&input, &shift_params(-1, "vertical"), &[], &EffectContext::default())
            .unwrap();
        // Row 0 takes row 1's reds.
        assert_eq!(out.sample(0, 0, Channel::Red), input.sample(0, 1, Channel::Red));
        assert_eq!(out.sample(1, 2, Channel::Red), input.sample(1, 0, Channel::Red));
    }

    #[test]
    fn test_shift_round_trip() {
        let input = ramp(5, 3);
        let ctx = EffectContext::default();
        let there = ChannelShiftEffect
            .process(&input, &shift_params(7, "horizontal"), &[], &ctx)
            .unwrap();
        let back = ChannelShiftEffect
            .process(&there, &shift_params(-7, "horizontal"), &[], &ctx)
            .unwrap();
        assert_eq!(back, input);
    }

    #[test]
    fn test_selection_rolls_within_range() {
        let input = ramp(6, 1);
        let selections = [Selection::new(2, 5, Channel::Red)];
        let out = ChannelShiftEffect
            .process(&input, &shift_params(1, "horizontal"), &selections, &EffectContext::default())
            .unwrap();
        let reds: Vec<u8> = (0..6).map(|x| out.sample(x, 0, Channel::Red)).collect();
        assert_eq!(reds, vec![0, 1, 4, 2, 3, 5]);
    }

    #[test]
    fn test_is_identity() {
        let params = EffectType::ChannelShift.default_parameters();
        assert!(ChannelShiftEffect.is_identity(&params));
        assert!(!ChannelShiftEffect.is_identity(&params.with("shift_b", 3)));
    }
}
