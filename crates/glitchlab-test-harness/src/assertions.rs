use std::collections::BTreeSet;

use glitchlab_core::buffer::{Axis, Channel, PixelBuffer, Selection};

/// Assert two buffers have the same dimensions.
pub fn assert_same_shape(actual: &PixelBuffer, expected: &PixelBuffer) {
    assert!(
        actual.same_shape(expected),
        "buffer is {}x{}, expected {}x{}",
        actual.width(),
        actual.height(),
        expected.width(),
        expected.height()
    );
    assert_eq!(actual.as_raw().len(), expected.as_raw().len());
}

/// Assert every sample outside the selected `(range, channel)` slices is
/// unchanged.
pub fn assert_unchanged_outside(
    before: &PixelBuffer,
    after: &PixelBuffer,
    selections: &[Selection],
    axis: Axis,
) {
    assert_same_shape(after, before);
    let regions: Vec<_> = selections
        .iter()
        .filter_map(|s| {
            s.region(axis, before.width(), before.height())
                .map(|r| (r, s.channel))
        })
        .collect();
    for y in 0..before.height() {
        for x in 0..before.width() {
            for channel in Channel::ALL {
                let selected = regions
                    .iter()
                    .any(|(r, c)| *c == channel && r.contains(x, y));
                if selected {
                    continue;
                }
                assert_eq!(
                    after.sample(x, y, channel),
                    before.sample(x, y, channel),
                    "{channel:?} at ({x}, {y}) changed outside the selection"
                );
            }
        }
    }
}

/// Distinct values of one channel across the whole buffer.
pub fn distinct_values(buffer: &PixelBuffer, channel: Channel) -> BTreeSet<u8> {
    (0..buffer.height())
        .flat_map(|y| (0..buffer.width()).map(move |x| (x, y)))
        .map(|(x, y)| buffer.sample(x, y, channel))
        .collect()
}

/// Assert a channel uses at most `max` distinct values.
pub fn assert_at_most_distinct(buffer: &PixelBuffer, channel: Channel, max: usize) {
    let values = distinct_values(buffer, channel);
    assert!(
        values.len() <= max,
        "{channel:?} has {} distinct values, expected at most {max}: {values:?}",
        values.len()
    );
}

/// Assert one channel is identical between two buffers.
pub fn assert_channel_eq(actual: &PixelBuffer, expected: &PixelBuffer, channel: Channel) {
    assert_same_shape(actual, expected);
    for y in 0..expected.height() {
        for x in 0..expected.width() {
            assert_eq!(
                actual.sample(x, y, channel),
                expected.sample(x, y, channel),
                "{channel:?} differs at ({x}, {y})"
            );
        }
    }
}
