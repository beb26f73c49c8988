use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

// =============================================================================
// PixelBuffer
// =============================================================================

/// An owned RGB pixel buffer. 3 bytes per pixel, row-major.
///
/// The dimensions are fixed at construction; effects return new buffers of the
/// same shape and never resize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Create a new black buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize * 3],
        }
    }

    /// Create a buffer where every pixel has the same color.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize * 3);
        for _ in 0..width as usize * height as usize {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Create from existing RGB data. Fails if the length doesn't match the dimensions.
    pub fn from_rgb_vec(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        if data.len() != width as usize * height as usize * 3 {
            return Err(CoreError::BufferSizeMismatch {
                width,
                height,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw samples, `[r, g, b, r, g, b, ...]` row-major.
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Total number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.pixel_count() == 0
    }

    pub fn same_shape(&self, other: &PixelBuffer) -> bool {
        self.width == other.width && self.height == other.height
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 3
    }

    /// Get pixel RGB at (x, y). Panics if out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = self.offset(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Get mutable pixel RGB at (x, y). Panics if out of bounds.
    pub fn pixel_mut(&mut self, x: u32, y: u32) -> &mut [u8] {
        let i = self.offset(x, y);
        &mut self.data[i..i + 3]
    }

    pub fn sample(&self, x: u32, y: u32, channel: Channel) -> u8 {
        self.data[self.offset(x, y) + channel.index()]
    }

    pub fn set_sample(&mut self, x: u32, y: u32, channel: Channel, value: u8) {
        let i = self.offset(x, y) + channel.index();
        self.data[i] = value;
    }

    pub(crate) fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width.max(1) as usize * 3
    }

    /// The region covering the whole buffer.
    pub fn full_region(&self) -> Region {
        Region::new(0, 0, self.width, self.height)
    }

    /// Copy one channel of a rectangular region into a float plane.
    pub fn read_plane(&self, region: Region, channel: Channel) -> Plane {
        let region = region.clamp_to(self.width, self.height);
        let mut plane = Plane::new(region.width as usize, region.height as usize);
        for py in 0..region.height {
            for px in 0..region.width {
                let v = self.sample(region.x + px, region.y + py, channel);
                plane.set(px as usize, py as usize, v as f32);
            }
        }
        plane
    }

    /// Write a plane back into one channel of a region. Values are clamped to
    /// [0, 255] and truncated. A plane whose shape doesn't match the clamped
    /// region only writes the overlapping cells.
    pub fn write_plane(&mut self, region: Region, channel: Channel, plane: &Plane) {
        let region = region.clamp_to(self.width, self.height);
        let h = (region.height as usize).min(plane.height);
        let w = (region.width as usize).min(plane.width);
        for py in 0..h {
            for px in 0..w {
                let v = to_sample(plane.get(px, py));
                self.set_sample(region.x + px as u32, region.y + py as u32, channel, v);
            }
        }
    }

    /// Copy one channel of a region from another buffer of the same shape.
    pub fn copy_region_from(&mut self, source: &PixelBuffer, region: Region, channel: Channel) {
        debug_assert!(self.same_shape(source));
        let region = region.clamp_to(self.width, self.height);
        for y in region.y..region.y + region.height {
            for x in region.x..region.x + region.width {
                self.set_sample(x, y, channel, source.sample(x, y, channel));
            }
        }
    }
}

/// Clamp a float sample into [0, 255] and truncate toward zero.
#[inline]
pub fn to_sample(v: f32) -> u8 {
    v.clamp(0.0, 255.0) as u8
}

// =============================================================================
// Channel / Axis
// =============================================================================

/// One of the three color channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];

    pub fn index(self) -> usize {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
            Channel::Blue => 2,
        }
    }

    /// Lowercase suffix used in per-channel parameter names (`shift_r`, ...).
    pub fn suffix(self) -> &'static str {
        match self {
            Channel::Red => "r",
            Channel::Green => "g",
            Channel::Blue => "b",
        }
    }
}

impl TryFrom<u8> for Channel {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Channel::Red),
            1 => Ok(Channel::Green),
            2 => Ok(Channel::Blue),
            other => Err(CoreError::unsupported("channel", other.to_string())),
        }
    }
}

impl From<Channel> for u8 {
    fn from(channel: Channel) -> u8 {
        channel.index() as u8
    }
}

impl FromStr for Channel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "r" | "red" => Ok(Channel::Red),
            "1" | "g" | "green" => Ok(Channel::Green),
            "2" | "b" | "blue" => Ok(Channel::Blue),
            _ => Err(CoreError::unsupported("channel", s)),
        }
    }
}

/// Direction an effect runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// Along rows; selections index columns.
    #[default]
    Horizontal,
    /// Along columns; selections index rows.
    Vertical,
}

impl Axis {
    pub const NAMES: [&'static str; 2] = ["horizontal", "vertical"];

    pub fn as_str(self) -> &'static str {
        match self {
            Axis::Horizontal => "horizontal",
            Axis::Vertical => "vertical",
        }
    }
}

impl FromStr for Axis {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "horizontal" => Ok(Axis::Horizontal),
            "vertical" => Ok(Axis::Vertical),
            other => Err(CoreError::unsupported("direction", other)),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Region / Selection
// =============================================================================

/// A rectangle in buffer pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    /// Intersect with a `width` x `height` buffer.
    pub fn clamp_to(&self, width: u32, height: u32) -> Region {
        let x = self.x.min(width);
        let y = self.y.min(height);
        let right = self.x.saturating_add(self.width).min(width);
        let bottom = self.y.saturating_add(self.height).min(height);
        Region::new(x, y, right - x, bottom - y)
    }
}

/// A channel-scoped range of columns (or rows) restricting an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub start: u32,
    pub end: u32,
    pub channel: Channel,
}

impl Selection {
    pub fn new(start: u32, end: u32, channel: Channel) -> Self {
        Self {
            start,
            end,
            channel,
        }
    }

    /// Resolve the selection against a buffer. Horizontal selections span all
    /// rows over columns `[start, end)`; vertical ones span all columns over
    /// rows `[start, end)`. Bounds are clamped; `None` when nothing remains.
    pub fn region(&self, axis: Axis, width: u32, height: u32) -> Option<Region> {
        let limit = match axis {
            Axis::Horizontal => width,
            Axis::Vertical => height,
        };
        let start = self.start.min(limit);
        let end = self.end.min(limit);
        if start >= end {
            return None;
        }
        let region = match axis {
            Axis::Horizontal => Region::new(start, 0, end - start, height),
            Axis::Vertical => Region::new(0, start, width, end - start),
        };
        (!region.is_empty()).then_some(region)
    }
}

impl FromStr for Selection {
    type Err = CoreError;

    /// Parses `start:end:channel`, e.g. `0:120:r` or `40:80:2`.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        let [start, end, channel] = parts.as_slice() else {
            return Err(CoreError::unsupported("selection", s));
        };
        let start = start
            .trim()
            .parse::<u32>()
            .map_err(|_| CoreError::unsupported("selection", s))?;
        let end = end
            .trim()
            .parse::<u32>()
            .map_err(|_| CoreError::unsupported("selection", s))?;
        Ok(Selection::new(start, end, channel.parse()?))
    }
}

// =============================================================================
// Plane
// =============================================================================

/// A single-channel 2-D float array, row-major. Effects do their arithmetic
/// on planes and write them back through [`PixelBuffer::write_plane`].
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl Plane {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    pub fn from_vec(width: usize, height: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: f32) {
        self.data[y * self.width + x] = v;
    }

    /// Circular shift along `axis`: element `i` moves to `i + shift`.
    /// Negative shifts move the other way.
    pub fn rolled(&self, axis: Axis, shift: i64) -> Plane {
        let mut out = Plane::new(self.width, self.height);
        if self.is_empty() {
            return out;
        }
        for y in 0..self.height {
            for x in 0..self.width {
                let v = match axis {
                    Axis::Horizontal => self.get(wrap(x as i64 - shift, self.width), y),
                    Axis::Vertical => self.get(x, wrap(y as i64 - shift, self.height)),
                };
                out.set(x, y, v);
            }
        }
        out
    }

    pub fn transposed(&self) -> Plane {
        let mut out = Plane::new(self.height, self.width);
        for y in 0..self.height {
            for x in 0..self.width {
                out.set(y, x, self.get(x, y));
            }
        }
        out
    }
}

/// Wrap a possibly negative index into `[0, n)`.
#[inline]
pub fn wrap(i: i64, n: usize) -> usize {
    i.rem_euclid(n as i64) as usize
}

/// Copy `src` into `dst` circularly shifted by `shift`; element `i` lands at `i + shift`.
pub fn roll_into<T: Copy>(src: &[T], shift: i64, dst: &mut [T]) {
    let n = src.len();
    if n == 0 {
        return;
    }
    for (i, &v) in src.iter().enumerate() {
        dst[wrap(i as i64 + shift, n)] = v;
    }
}

// =============================================================================
// Tests
// =============================================================================
