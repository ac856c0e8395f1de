use crate::foundation::error::{FxError, FxResult};

pub use kurbo::{Affine, Point, Rect, Vec2};

/// Integer pixel rectangle, half-open: `[x0, x1) × [y0, y1)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct IRect {
    /// Inclusive left edge.
    pub x0: i32,
    /// Inclusive top edge.
    pub y0: i32,
    /// Exclusive right edge.
    pub x1: i32,
    /// Exclusive bottom edge.
    pub y1: i32,
}

impl IRect {
    pub const fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Rectangle covering a whole `width × height` surface.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, to_i32(width), to_i32(height))
    }

    /// Truncates each edge toward zero, the way a float rectangle is snapped to pixels.
    pub fn from_rect_trunc(r: Rect) -> Self {
        Self::new(r.x0 as i32, r.y0 as i32, r.x1 as i32, r.y1 as i32)
    }

    pub fn width(self) -> i32 {
        (self.x1 - self.x0).max(0)
    }

    pub fn height(self) -> i32 {
        (self.y1 - self.y0).max(0)
    }

    /// Degenerate or inverted rectangles are empty: callers draw nothing.
    pub fn is_empty(self) -> bool {
        self.x1 <= self.x0 || self.y1 <= self.y0
    }

    pub fn contains(self, x: i32, y: i32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }

    pub fn intersect(self, other: IRect) -> IRect {
        IRect::new(
            self.x0.max(other.x0),
            self.y0.max(other.y0),
            self.x1.min(other.x1),
            self.y1.min(other.y1),
        )
    }

    /// Clamp into `[0, width) × [0, height)`.
    pub fn clamp_to_size(self, width: u32, height: u32) -> IRect {
        self.intersect(IRect::from_size(width, height))
    }
}

pub(crate) fn to_i32(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

/// Coordinate system used to interpret lengths of a filter, mask or clip-path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordUnits {
    /// Absolute user-space coordinates.
    #[default]
    UserSpaceOnUse,
    /// Fractions (0..1) of the element's bounding box.
    ObjectBoundingBox,
}

/// An already-parsed length.
///
/// `Percent` is stored as a fraction (`-10%` is `-0.1`) and resolves against a reference
/// dimension of the current viewport.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Length {
    /// Plain user units.
    User(f64),
    /// Fraction of the reference dimension.
    Percent(f64),
}

impl Length {
    pub fn normalize(self, reference: f64) -> f64 {
        match self {
            Length::User(v) => v,
            Length::Percent(f) => f * reference,
        }
    }
}

impl Default for Length {
    fn default() -> Self {
        Length::User(0.0)
    }
}

/// Logical colour channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    R,
    G,
    B,
    A,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::R, Channel::G, Channel::B, Channel::A];

    pub fn logical_index(self) -> usize {
        match self {
            Channel::R => 0,
            Channel::G => 1,
            Channel::B => 2,
            Channel::A => 3,
        }
    }
}

/// Maps logical R/G/B/A to the physical byte offset inside a 4-byte pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChannelMap([usize; 4]);

impl ChannelMap {
    /// Bytes stored as R, G, B, A.
    pub const RGBA: ChannelMap = ChannelMap([0, 1, 2, 3]);
    /// Bytes stored as B, G, R, A (little-endian ARGB32).
    pub const BGRA: ChannelMap = ChannelMap([2, 1, 0, 3]);

    /// Parse a four-digit order string such as `"2103"`.
    pub fn from_order(order: &str) -> FxResult<Self> {
        let bytes = order.as_bytes();
        if bytes.len() != 4 {
            return Err(FxError::validation(format!(
                "channel order '{order}' must have exactly 4 digits"
            )));
        }
        let mut map = [0usize; 4];
        let mut seen = [false; 4];
        for (slot, &b) in map.iter_mut().zip(bytes) {
            let idx = match b {
                b'0'..=b'3' => usize::from(b - b'0'),
                _ => {
                    return Err(FxError::validation(format!(
                        "channel order '{order}' contains an invalid digit"
                    )));
                }
            };
            if seen[idx] {
                return Err(FxError::validation(format!(
                    "channel order '{order}' repeats offset {idx}"
                )));
            }
            seen[idx] = true;
            *slot = idx;
        }
        Ok(Self(map))
    }

    /// Physical offset of logical channel index `logical` (0 = R … 3 = A).
    #[inline]
    pub fn offset(self, logical: usize) -> usize {
        self.0[logical]
    }

    #[inline]
    pub fn of(self, ch: Channel) -> usize {
        self.0[ch.logical_index()]
    }

    #[inline]
    pub fn alpha(self) -> usize {
        self.0[3]
    }
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self::RGBA
    }
}

/// Straight (non-premultiplied) 8-bit RGBA colour, as resolved from style properties.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(default = "opaque")]
    pub a: u8,
}

fn opaque() -> u8 {
    255
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Premultiplied logical RGBA with `(c*a+127)/255` rounding.
    pub fn to_premul(self) -> [u8; 4] {
        fn mul(c: u8, a: u8) -> u8 {
            ((u16::from(c) * u16::from(a) + 127) / 255) as u8
        }
        [mul(self.r, self.a), mul(self.g, self.a), mul(self.b, self.a), self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
