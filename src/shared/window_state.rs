//! Shared window geometry
//!
//! Bounds and decoration insets of toplevel windows, in root coordinates.

/// Window geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Whether the root-relative point lies inside these bounds
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x
            && y >= self.y
            && (x as i64) < self.x as i64 + self.width as i64
            && (y as i64) < self.y as i64 + self.height as i64
    }

    /// Translate a root-relative point into coordinates local to these bounds
    pub fn to_local(&self, root_x: i32, root_y: i32) -> (i32, i32) {
        (root_x - self.x, root_y - self.y)
    }
}

/// Thickness of the decorations the window manager draws around a client area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Insets {
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
}

impl Insets {
    pub const fn new(top: i32, left: i32, bottom: i32, right: i32) -> Self {
        Self { top, left, bottom, right }
    }

    pub const fn zero() -> Self {
        Self::new(0, 0, 0, 0)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    /// Clamp every side into `0..=max`.
    ///
    /// Window managers occasionally publish garbage extents (negative values
    /// encoded as CARD32, or a whole screen height); nothing above `max` is
    /// a believable border.
    pub fn clamped(self, max: i32) -> Self {
        let clamp = |v: i32| v.clamp(0, max.max(0));
        Self {
            top: clamp(self.top),
            left: clamp(self.left),
            bottom: clamp(self.bottom),
            right: clamp(self.right),
        }
    }

    /// Decode the `[left, right, top, bottom]` CARD32 layout shared by
    /// `_NET_FRAME_EXTENTS`, `_KDE_NET_WM_FRAME_STRUT` and `_E_FRAME_SIZE`
    pub fn from_extents(values: &[u32]) -> Option<Self> {
        match values {
            [left, right, top, bottom, ..] => Some(Self {
                top: *top as i32,
                left: *left as i32,
                bottom: *bottom as i32,
                right: *right as i32,
            }),
            _ => None,
        }
    }
}
