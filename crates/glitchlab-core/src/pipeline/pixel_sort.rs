use std::collections::HashMap;
use std::str::FromStr;

use rayon::prelude::*;

use crate::buffer::{Axis, PixelBuffer, Plane, Selection};
use crate::effects::Parameters;
use crate::error::{CoreError, Result};

use super::{EffectContext, PixelEffect, process_planes};

/// Threshold-masked sort of each row (or column). Pixels whose metric
/// exceeds the threshold are sorted in descending metric order and written
/// back over the masked positions; everything else stays put.
pub struct PixelSortEffect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortMetric {
    Intensity,
    Hue,
    Saturation,
}

impl FromStr for SortMetric {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "intensity" => Ok(SortMetric::Intensity),
            "hue" => Ok(SortMetric::Hue),
            "saturation" => Ok(SortMetric::Saturation),
            other => Err(CoreError::unsupported("sorting function", other)),
        }
    }
}

impl SortMetric {
    /// Threshold on the metric's own scale.
    fn scaled_threshold(self, threshold: f64) -> f64 {
        match self {
            SortMetric::Intensity => threshold,
            SortMetric::Hue => threshold / 360.0,
            SortMetric::Saturation => threshold / 100.0,
        }
    }

    fn key(self, px: [u8; 3], hue_cache: &mut HashMap<[u8; 3], f64>) -> f64 {
        match self {
            SortMetric::Intensity => px.iter().map(|&v| v as f64).sum::<f64>() / 3.0,
            SortMetric::Hue => *hue_cache.entry(px).or_insert_with(|| hue(px)),
            SortMetric::Saturation => saturation(px),
        }
    }
}

/// HLS hue in `[0, 1)`; grays are 0.
fn hue([r, g, b]: [u8; 3]) -> f64 {
    let (r, g, b) = (r as f64, g as f64, b as f64);
    let maxc = r.max(g).max(b);
    let minc = r.min(g).min(b);
    if maxc == minc {
        return 0.0;
    }
    let span = maxc - minc;
    let rc = (maxc - r) / span;
    let gc = (maxc - g) / span;
    let bc = (maxc - b) / span;
    let h = if r == maxc {
        bc - gc
    } else if g == maxc {
        2.0 + rc - bc
    } else {
        4.0 + gc - rc
    };
    (h / 6.0).rem_euclid(1.0)
}

/// `(max - min) / max`, 0 for black.
fn saturation(px: [u8; 3]) -> f64 {
    let max = px.iter().copied().max().unwrap_or(0) as f64;
    let min = px.iter().copied().min().unwrap_or(0) as f64;
    if max == 0.0 { 0.0 } else { (max - min) / max }
}

/// Sort the items whose key exceeds `threshold` in descending key order,
/// in place over their own positions. Ties keep their original order.
fn sort_masked<T: Copy>(items: &mut [T], keys: &[f64], threshold: f64) {
    let positions: Vec<usize> = (0..items.len()).filter(|&i| keys[i] > threshold).collect();
    if positions.len() < 2 {
        return;
    }
    let mut masked: Vec<(f64, T)> = positions.iter().map(|&i| (keys[i], items[i])).collect();
    masked.sort_by(|a, b| b.0.total_cmp(&a.0));
    for (&pos, (_, item)) in positions.iter().zip(masked) {
        items[pos] = item;
    }
}

/// Whole-buffer path: pixels move as RGB triples.
fn sort_rgb(input: &PixelBuffer, metric: SortMetric, threshold: f64, axis: Axis) -> PixelBuffer {
    let (w, h) = (input.width(), input.height());
    let (lines, len) = match axis {
        Axis::Horizontal => (h, w),
        Axis::Vertical => (w, h),
    };
    let coord = move |line: u32, i: u32| match axis {
        Axis::Horizontal => (i, line),
        Axis::Vertical => (line, i),
    };
    let threshold = metric.scaled_threshold(threshold);

    // One hue cache per worker, dropped when the call returns.
    let sorted: Vec<Vec<[u8; 3]>> = (0..lines)
        .into_par_iter()
        .map_init(HashMap::new, |cache, line| {
            let mut pixels: Vec<[u8; 3]> = (0..len)
                .map(|i| {
                    let (x, y) = coord(line, i);
                    input.pixel(x, y)
                })
                .collect();
            let keys: Vec<f64> = pixels.iter().map(|&px| metric.key(px, cache)).collect();
            sort_masked(&mut pixels, &keys, threshold);
            pixels
        })
        .collect();

    let mut output = input.clone();
    for (line, pixels) in sorted.into_iter().enumerate() {
        for (i, px) in pixels.into_iter().enumerate() {
            let (x, y) = coord(line as u32, i as u32);
            output.pixel_mut(x, y).copy_from_slice(&px);
        }
    }
    output
}

/// Single-channel path: every metric reduces to the raw sample value.
fn sort_plane(plane: Plane, threshold: f64, axis: Axis) -> Plane {
    let mut plane = match axis {
        Axis::Horizontal => plane,
        Axis::Vertical => plane.transposed(),
    };
    let width = plane.width.max(1);
    plane.data.par_chunks_exact_mut(width).for_each(|row| {
        let keys: Vec<f64> = row.iter().map(|&v| v as f64).collect();
        sort_masked(row, &keys, threshold);
    });
    match axis {
        Axis::Horizontal => plane,
        Axis::Vertical => plane.transposed(),
    }
}

impl PixelEffect for PixelSortEffect {
    fn process(
        &self,
        input: &PixelBuffer,
        params: &Parameters,
        selections: &[Selection],
        _ctx: &EffectContext,
    ) -> Result<PixelBuffer> {
        let threshold = params.int("threshold")? as f64;
        let metric: SortMetric = params.choice("sorting_function")?.parse()?;
        let axis: Axis = params.choice("direction")?.parse()?;

        if selections.is_empty() {
            return Ok(sort_rgb(input, metric, threshold, axis));
        }
        process_planes(input, selections, axis, |_, _, plane| {
            Ok(sort_plane(plane, threshold, axis))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Channel;
    use crate::effects::EffectType;

    fn params(threshold: i64, function: &str, direction: &str) -> Parameters {
        EffectType::PixelSort
            .default_parameters()
            .with("threshold", threshold)
            .with("sorting_function", function)
            .with("direction", direction)
    }

    #[test]
    fn test_sort_masked_streak() {
        let mut row = [180.0f32, 10.0, 200.0, 5.0];
        let keys: Vec<f64> = row.iter().map(|&v| v as f64).collect();
        sort_masked(&mut row, &keys, 100.0);
        assert_eq!(row, [200.0, 10.0, 180.0, 5.0]);
    }

    #[test]
    fn test_sort_masked_already_descending() {
        let mut row = [10.0f32, 200.0, 5.0, 180.0];
        let keys: Vec<f64> = row.iter().map(|&v| v as f64).collect();
        sort_masked(&mut row, &keys, 100.0);
        assert_eq!(row, [10.0, 200.0, 5.0, 180.0]);
    }

    #[test]
    fn test_sort_masked_stable_ties() {
        let mut items = ['a', 'b', 'c'];
        sort_masked(&mut items, &[0.5, 0.9, 0.5], 0.1);
        assert_eq!(items, ['b', 'a', 'c']);
    }

    #[test]
    fn test_single_channel_selection_row() {
        let data = [180u8, 10, 200, 5]
            .iter()
            .flat_map(|&r| [r, 7, 9])
            .collect();
        let input = PixelBuffer::from_rgb_vec(4, 1, data).unwrap();
        let selections = [Selection::new(0, 4, Channel::Red)];
        let out = PixelSortEffect
            .process(
                &input,
                &params(100, "intensity", "horizontal"),
                &selections,
                &EffectContext::default(),
            )
            .unwrap();
        let reds: Vec<u8> = (0..4).map(|x| out.sample(x, 0, Channel::Red)).collect();
        assert_eq!(reds, vec![200, 10, 180, 5]);
        assert!((0..4).all(|x| out.sample(x, 0, Channel::Green) == 7));
    }

    #[test]
    fn test_rgb_intensity_moves_whole_pixels() {
        let data = vec![200, 200, 200, 0, 0, 0, 250, 250, 250];
        let input = PixelBuffer::from_rgb_vec(3, 1, data).unwrap();
        let out = PixelSortEffect
            .process(
                &input,
                &params(100, "intensity", "horizontal"),
                &[],
                &EffectContext::default(),
            )
            .unwrap();
        assert_eq!(out.pixel(0, 0), [250, 250, 250]);
        assert_eq!(out.pixel(1, 0), [0, 0, 0]);
        assert_eq!(out.pixel(2, 0), [200, 200, 200]);
    }

    #[test]
    fn test_vertical_sorts_columns() {
        let data = vec![50, 50, 50, 220, 220, 220, 180, 180, 180];
        let input = PixelBuffer::from_rgb_vec(1, 3, data).unwrap();
        let out = PixelSortEffect
            .process(&input, &params(40, "intensity", "vertical"), &[], &EffectContext::default())
            .unwrap();
        assert_eq!(out.pixel(0, 0), [220, 220, 220]);
        assert_eq!(out.pixel(0, 1), [180, 180, 180]);
        assert_eq!(out.pixel(0, 2), [50, 50, 50]);
    }

    fn row(pixels: &[[u8; 3]]) -> PixelBuffer {
        let data = pixels.iter().flatten().copied().collect();
        PixelBuffer::from_rgb_vec(pixels.len() as u32, 1, data).unwrap()
    }

    fn pixels(buffer: &PixelBuffer) -> Vec<[u8; 3]> {
        (0..buffer.width()).map(|x| buffer.pixel(x, 0)).collect()
    }

    #[test]
    fn test_rgb_hue_order() {
        const RED: [u8; 3] = [255, 0, 0];
        const GREEN: [u8; 3] = [0, 255, 0];
        const BLUE: [u8; 3] = [0, 0, 255];
        const YELLOW: [u8; 3] = [255, 255, 0];
        // Threshold 30 is 1/12 of the hue circle: red (0) stays put, the
        // rest sort by descending hue.
        let input = row(&[RED, GREEN, BLUE, YELLOW]);
        let out = PixelSortEffect
            .process(&input, &params(30, "hue", "horizontal"), &[], &EffectContext::default())
            .unwrap();
        assert_eq!(pixels(&out), vec![RED, BLUE, GREEN, YELLOW]);
    }

    #[test]
    fn test_rgb_saturation_ties_keep_order() {
        const RED: [u8; 3] = [255, 0, 0];
        const BLUE: [u8; 3] = [0, 0, 200];
        const GRAY: [u8; 3] = [90, 90, 90];
        const OLIVE: [u8; 3] = [200, 200, 50];
        let sort = |input: PixelBuffer| {
            let out = PixelSortEffect
                .process(
                    &input,
                    &params(50, "saturation", "horizontal"),
                    &[],
                    &EffectContext::default(),
                )
                .unwrap();
            pixels(&out)
        };
        // Red and blue both have saturation 1.0; gray (0) is unmasked.
        assert_eq!(sort(row(&[OLIVE, RED, GRAY, BLUE])), vec![RED, BLUE, GRAY, OLIVE]);
        assert_eq!(sort(row(&[OLIVE, BLUE, GRAY, RED])), vec![BLUE, RED, GRAY, OLIVE]);
    }

    #[test]
    fn test_hue_and_saturation() {
        assert_eq!(hue([128, 128, 128]), 0.0);
        assert!((hue([0, 255, 0]) - 1.0 / 3.0).abs() < 1e-12);
        assert!((hue([0, 0, 255]) - 2.0 / 3.0).abs() < 1e-12);
        // Magenta-ish red wraps to the top of the range.
        assert!(hue([255, 0, 10]) > 0.9);
        assert_eq!(saturation([0, 0, 0]), 0.0);
        assert_eq!(saturation([200, 100, 200]), 0.5);
    }

    #[test]
    fn test_unknown_metric() {
        assert!("brightness".parse::<SortMetric>().is_err());
    }
}
