//! Client Flags
//!
//! Bitfields for decoration/function hints, size hints and window state.

use bitflags::bitflags;

bitflags! {
    /// `_MOTIF_WM_HINTS` decoration bits
    ///
    /// When `ALL` is set, every other bit *removes* that decoration instead
    /// of adding it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MwmDecorations: u32 {
        const ALL = 1 << 0;
        const BORDER = 1 << 1;
        const RESIZEH = 1 << 2;
        const TITLE = 1 << 3;
        const MENU = 1 << 4;
        const MINIMIZE = 1 << 5;
        const MAXIMIZE = 1 << 6;
    }
}

bitflags! {
    /// `_MOTIF_WM_HINTS` function bits, with the same `ALL` convention
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MwmFunctions: u32 {
        const ALL = 1 << 0;
        const RESIZE = 1 << 1;
        const MOVE = 1 << 2;
        const MINIMIZE = 1 << 3;
        const MAXIMIZE = 1 << 4;
        const CLOSE = 1 << 5;
    }
}

bitflags! {
    /// Which `_MOTIF_WM_HINTS` fields are meaningful
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MwmHintFlags: u32 {
        const FUNCTIONS = 1 << 0;
        const DECORATIONS = 1 << 1;
        const INPUT_MODE = 1 << 2;
        const STATUS = 1 << 3;
    }
}

impl MwmDecorations {
    /// Every decoration a window can carry, without the `ALL` marker
    pub const FULL: Self = Self::BORDER
        .union(Self::RESIZEH)
        .union(Self::TITLE)
        .union(Self::MENU)
        .union(Self::MINIMIZE)
        .union(Self::MAXIMIZE);

    /// Turn the subtractive `ALL` form into an explicit positive mask.
    pub fn normalized(self) -> Self {
        if !self.contains(Self::ALL) {
            return self;
        }
        Self::FULL.difference(self)
    }
}

impl MwmFunctions {
    /// Every window function, without the `ALL` marker
    pub const FULL: Self = Self::RESIZE
        .union(Self::MOVE)
        .union(Self::MINIMIZE)
        .union(Self::MAXIMIZE)
        .union(Self::CLOSE);

    pub fn normalized(self) -> Self {
        if !self.contains(Self::ALL) {
            return self;
        }
        Self::FULL.difference(self)
    }
}

bitflags! {
    /// Extended frame state, layered over the ICCCM base state
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ExtendedState: u32 {
        const ICONIFIED = 1 << 0;
        const MAXIMIZED_HORIZ = 1 << 1;
        const MAXIMIZED_VERT = 1 << 2;
        const MAXIMIZED_BOTH = Self::MAXIMIZED_HORIZ.bits() | Self::MAXIMIZED_VERT.bits();
        /// Mirrors [`Layer::AlwaysOnTop`]
        const ALWAYS_ON_TOP = 1 << 3;
    }
}

bitflags! {
    /// `WM_HINTS` flags (XWMHints)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WmHintFlags: u32 {
        const INPUT = 1 << 0;
        const STATE = 1 << 1;
        const ICON_PIXMAP = 1 << 2;
        const ICON_WINDOW = 1 << 3;
        const ICON_POSITION = 1 << 4;
        const ICON_MASK = 1 << 5;
        const WINDOW_GROUP = 1 << 6;
        const URGENCY = 1 << 8;
    }
}

bitflags! {
    /// `WM_NORMAL_HINTS` flags (XSizeHints)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SizeHintFlags: u32 {
        const US_POSITION = 1 << 0;
        const US_SIZE = 1 << 1;
        const P_POSITION = 1 << 2;
        const P_SIZE = 1 << 3;
        const P_MIN_SIZE = 1 << 4;
        const P_MAX_SIZE = 1 << 5;
        const P_RESIZE_INC = 1 << 6;
        const P_ASPECT = 1 << 7;
        const P_BASE_SIZE = 1 << 8;
        const P_WIN_GRAVITY = 1 << 9;
    }
}

/// ICCCM `WM_STATE` base state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WmState {
    #[default]
    Withdrawn,
    Normal,
    Iconic,
}

impl WmState {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => WmState::Normal,
            3 => WmState::Iconic,
            _ => WmState::Withdrawn,
        }
    }

    pub fn to_raw(self) -> u32 {
        match self {
            WmState::Withdrawn => 0,
            WmState::Normal => 1,
            WmState::Iconic => 3,
        }
    }
}

/// Stacking layer a toplevel asks the window manager for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Layer {
    #[default]
    Normal,
    AlwaysOnTop,
}
