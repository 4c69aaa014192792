//! Hints Module
//!
//! `WM_NORMAL_HINTS` (XSizeHints) as written by a toplevel: min/max size
//! is how resizability is expressed to the window manager. `WM_HINTS`
//! carries the state a window asks to be mapped in.

use tracing::debug;
use x11rb::protocol::xproto::Window;

use crate::error::Result;
use crate::wm::client_flags::{SizeHintFlags, WmHintFlags, WmState};
use crate::wm::display::XServer;
use crate::wm::ewmh::Atoms;

/// Number of CARD32 fields in XSizeHints
const SIZE_HINTS_LEN: usize = 18;
/// Number of CARD32 fields in XWMHints
const WM_HINTS_LEN: usize = 9;

/// Size hints (XSizeHints equivalent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizeHints {
    pub flags: SizeHintFlags,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub min_width: u32,
    pub min_height: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub width_inc: u32,
    pub height_inc: u32,
    pub min_aspect_num: u32,
    pub min_aspect_den: u32,
    pub max_aspect_num: u32,
    pub max_aspect_den: u32,
    pub base_width: u32,
    pub base_height: u32,
    pub win_gravity: u32,
}

impl SizeHints {
    pub fn from_values(values: &[u32]) -> Option<Self> {
        if values.len() < SIZE_HINTS_LEN {
            return None;
        }
        Some(Self {
            flags: SizeHintFlags::from_bits_retain(values[0]),
            x: values[1] as i32,
            y: values[2] as i32,
            width: values[3],
            height: values[4],
            min_width: values[5],
            min_height: values[6],
            max_width: values[7],
            max_height: values[8],
            width_inc: values[9],
            height_inc: values[10],
            min_aspect_num: values[11],
            min_aspect_den: values[12],
            max_aspect_num: values[13],
            max_aspect_den: values[14],
            base_width: values[15],
            base_height: values[16],
            win_gravity: values[17],
        })
    }

    pub fn to_values(&self) -> [u32; SIZE_HINTS_LEN] {
        [
            self.flags.bits(),
            self.x as u32,
            self.y as u32,
            self.width,
            self.height,
            self.min_width,
            self.min_height,
            self.max_width,
            self.max_height,
            self.width_inc,
            self.height_inc,
            self.min_aspect_num,
            self.min_aspect_den,
            self.max_aspect_num,
            self.max_aspect_den,
            self.base_width,
            self.base_height,
            self.win_gravity,
        ]
    }

    /// Pin the size: min and max both equal to `width` x `height`
    pub fn fix_size(&mut self, width: u32, height: u32) {
        self.flags |= SizeHintFlags::P_MIN_SIZE | SizeHintFlags::P_MAX_SIZE;
        self.min_width = width;
        self.min_height = height;
        self.max_width = width;
        self.max_height = height;
    }

    /// Drop the max size, keeping `min` (if any) as the lower bound
    pub fn release_size(&mut self, min: Option<(u32, u32)>) {
        self.flags.remove(SizeHintFlags::P_MAX_SIZE);
        self.max_width = 0;
        self.max_height = 0;
        match min {
            Some((width, height)) => {
                self.flags |= SizeHintFlags::P_MIN_SIZE;
                self.min_width = width;
                self.min_height = height;
            }
            None => {
                self.flags.remove(SizeHintFlags::P_MIN_SIZE);
                self.min_width = 0;
                self.min_height = 0;
            }
        }
    }

    pub fn is_fixed(&self) -> bool {
        self.flags
            .contains(SizeHintFlags::P_MIN_SIZE | SizeHintFlags::P_MAX_SIZE)
            && self.min_width == self.max_width
            && self.min_height == self.max_height
    }

    /// Read size hints for a window
    pub fn read(server: &dyn XServer, atoms: &Atoms, window: Window) -> Result<Option<Self>> {
        Ok(server
            .get_property32(window, atoms.wm_normal_hints)?
            .and_then(|values| Self::from_values(&values)))
    }

    pub fn write(&self, server: &dyn XServer, atoms: &Atoms, window: Window) -> Result<()> {
        debug!(
            "WM_NORMAL_HINTS for 0x{:x}: flags {:?}, min {}x{}, max {}x{}",
            window, self.flags, self.min_width, self.min_height, self.max_width, self.max_height
        );
        server.set_property32(
            window,
            atoms.wm_normal_hints,
            atoms.wm_size_hints,
            &self.to_values(),
        )
    }
}

/// WM hints (XWMHints equivalent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WmHints {
    pub flags: WmHintFlags,
    pub input: bool,
    /// Raw ICCCM state, meaningful with [`WmHintFlags::STATE`]
    pub initial_state: u32,
    pub icon_pixmap: u32,
    pub icon_window: u32,
    pub icon_x: i32,
    pub icon_y: i32,
    pub icon_mask: u32,
    pub window_group: u32,
}

impl WmHints {
    pub fn from_values(values: &[u32]) -> Option<Self> {
        if values.len() < WM_HINTS_LEN {
            return None;
        }
        Some(Self {
            flags: WmHintFlags::from_bits_retain(values[0]),
            input: values[1] != 0,
            initial_state: values[2],
            icon_pixmap: values[3],
            icon_window: values[4],
            icon_x: values[5] as i32,
            icon_y: values[6] as i32,
            icon_mask: values[7],
            window_group: values[8],
        })
    }

    pub fn to_values(&self) -> [u32; WM_HINTS_LEN] {
        [
            self.flags.bits(),
            u32::from(self.input),
            self.initial_state,
            self.icon_pixmap,
            self.icon_window,
            self.icon_x as u32,
            self.icon_y as u32,
            self.icon_mask,
            self.window_group,
        ]
    }

    /// State the window manager maps the window in
    pub fn initial_state(&self) -> Option<WmState> {
        self.flags
            .contains(WmHintFlags::STATE)
            .then(|| WmState::from_raw(self.initial_state))
    }

    pub fn set_initial_state(&mut self, state: WmState) {
        self.flags |= WmHintFlags::STATE;
        self.initial_state = state.to_raw();
    }

    pub fn read(server: &dyn XServer, atoms: &Atoms, window: Window) -> Result<Option<Self>> {
        Ok(server
            .get_property32(window, atoms.wm_hints)?
            .and_then(|values| Self::from_values(&values)))
    }

    pub fn write(&self, server: &dyn XServer, atoms: &Atoms, window: Window) -> Result<()> {
        debug!(
            "WM_HINTS for 0x{:x}: flags {:?}, initial state {}",
            window, self.flags, self.initial_state
        );
        server.set_property32(window, atoms.wm_hints, atoms.wm_hints, &self.to_values())
    }
}
