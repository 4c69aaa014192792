//! Window manager hint atoms
//!
//! Every atom the toplevel peers read or write, interned once per session,
//! plus the Motif hint record and the ICCCM `WM_STATE` accessor shared by the
//! state and decoration code.

use tracing::debug;
use x11rb::protocol::xproto::{Atom, AtomEnum, Window};

use crate::error::Result;
use crate::wm::client_flags::{MwmDecorations, MwmFunctions, MwmHintFlags, WmState};
use crate::wm::display::XServer;

/// Holds all interned atoms
#[derive(Debug, Clone)]
pub struct Atoms {
    // ICCCM
    pub wm_state: Atom,
    pub wm_change_state: Atom,
    pub wm_transient_for: Atom,
    pub wm_normal_hints: Atom,
    pub wm_size_hints: Atom,
    pub wm_hints: Atom,
    /// `WM_S<screen>` manager selection
    pub wm_screen_selection: Atom,
    pub cardinal: Atom,
    pub window: Atom,
    pub atom: Atom,
    pub utf8_string: Atom,
    // EWMH
    pub net_supporting_wm_check: Atom,
    pub net_supported: Atom,
    pub net_wm_name: Atom,
    pub net_wm_state: Atom,
    pub _net_wm_state_maximized_horz: Atom,
    pub _net_wm_state_maximized_vert: Atom,
    pub _net_wm_state_above: Atom,
    pub _net_wm_state_hidden: Atom,
    pub net_frame_extents: Atom,
    pub _net_request_frame_extents: Atom,
    // GNOME 1.x
    pub win_supporting_wm_check: Atom,
    pub win_protocols: Atom,
    pub win_state: Atom,
    pub win_layer: Atom,
    // Motif / CDE
    pub motif_wm_hints: Atom,
    pub motif_wm_info: Atom,
    pub dt_sm_window_info: Atom,
    pub dt_sm_state_info: Atom,
    // OpenLook
    pub ol_decor_del: Atom,
    pub ol_decor_header: Atom,
    pub ol_decor_resize: Atom,
    pub ol_decor_close: Atom,
    pub sun_wm_protocols: Atom,
    // WM specific
    pub enlightenment_comms: Atom,
    pub kde_net_wm_frame_strut: Atom,
    pub e_frame_size: Atom,
    pub icewm_winopthint: Atom,
}

impl Atoms {
    /// Intern all atoms through `server`
    pub fn new(server: &dyn XServer) -> Result<Self> {
        let intern = |name: &str| -> Result<Atom> { server.intern_atom(name) };
        let selection = format!("WM_S{}", server.screen_number());

        let atoms = Self {
            wm_state: intern("WM_STATE")?,
            wm_change_state: intern("WM_CHANGE_STATE")?,
            wm_transient_for: AtomEnum::WM_TRANSIENT_FOR.into(),
            wm_normal_hints: AtomEnum::WM_NORMAL_HINTS.into(),
            wm_size_hints: AtomEnum::WM_SIZE_HINTS.into(),
            wm_hints: AtomEnum::WM_HINTS.into(),
            wm_screen_selection: intern(&selection)?,
            cardinal: AtomEnum::CARDINAL.into(),
            window: AtomEnum::WINDOW.into(),
            atom: AtomEnum::ATOM.into(),
            utf8_string: intern("UTF8_STRING")?,
            net_supporting_wm_check: intern("_NET_SUPPORTING_WM_CHECK")?,
            net_supported: intern("_NET_SUPPORTED")?,
            net_wm_name: intern("_NET_WM_NAME")?,
            net_wm_state: intern("_NET_WM_STATE")?,
            _net_wm_state_maximized_horz: intern("_NET_WM_STATE_MAXIMIZED_HORZ")?,
            _net_wm_state_maximized_vert: intern("_NET_WM_STATE_MAXIMIZED_VERT")?,
            _net_wm_state_above: intern("_NET_WM_STATE_ABOVE")?,
            _net_wm_state_hidden: intern("_NET_WM_STATE_HIDDEN")?,
            net_frame_extents: intern("_NET_FRAME_EXTENTS")?,
            _net_request_frame_extents: intern("_NET_REQUEST_FRAME_EXTENTS")?,
            win_supporting_wm_check: intern("_WIN_SUPPORTING_WM_CHECK")?,
            win_protocols: intern("_WIN_PROTOCOLS")?,
            win_state: intern("_WIN_STATE")?,
            win_layer: intern("_WIN_LAYER")?,
            motif_wm_hints: intern("_MOTIF_WM_HINTS")?,
            motif_wm_info: intern("_MOTIF_WM_INFO")?,
            dt_sm_window_info: intern("_DT_SM_WINDOW_INFO")?,
            dt_sm_state_info: intern("_DT_SM_STATE_INFO")?,
            ol_decor_del: intern("_OL_DECOR_DEL")?,
            ol_decor_header: intern("_OL_DECOR_HEADER")?,
            ol_decor_resize: intern("_OL_DECOR_RESIZE")?,
            ol_decor_close: intern("_OL_DECOR_CLOSE")?,
            sun_wm_protocols: intern("_SUN_WM_PROTOCOLS")?,
            enlightenment_comms: intern("ENLIGHTENMENT_COMMS")?,
            kde_net_wm_frame_strut: intern("_KDE_NET_WM_FRAME_STRUT")?,
            e_frame_size: intern("_E_FRAME_SIZE")?,
            icewm_winopthint: intern("_ICEWM_WINOPTHINT")?,
        };
        debug!("Interned toplevel atoms ({})", selection);
        Ok(atoms)
    }

    /// Atoms whose change means the frame extents may have moved
    pub fn is_frame_extents(&self, atom: Atom) -> bool {
        atom == self.net_frame_extents
            || atom == self.kde_net_wm_frame_strut
            || atom == self.e_frame_size
    }
}

/// Contents of `_MOTIF_WM_HINTS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotifWmHints {
    pub flags: MwmHintFlags,
    pub functions: MwmFunctions,
    pub decorations: MwmDecorations,
    pub input_mode: u32,
    pub status: u32,
}

impl MotifWmHints {
    /// Read the hints; a missing or short property yields the empty record
    pub fn read(server: &dyn XServer, atoms: &Atoms, window: Window) -> Result<Self> {
        let Some(values) = server.get_property32(window, atoms.motif_wm_hints)? else {
            return Ok(Self::default());
        };
        if values.len() < 5 {
            return Ok(Self::default());
        }
        Ok(Self {
            flags: MwmHintFlags::from_bits_retain(values[0]),
            functions: MwmFunctions::from_bits_retain(values[1]),
            decorations: MwmDecorations::from_bits_retain(values[2]),
            input_mode: values[3],
            status: values[4],
        })
    }

    pub fn write(&self, server: &dyn XServer, atoms: &Atoms, window: Window) -> Result<()> {
        server.set_property32(
            window,
            atoms.motif_wm_hints,
            atoms.motif_wm_hints,
            &[
                self.flags.bits(),
                self.functions.bits(),
                self.decorations.bits(),
                self.input_mode,
                self.status,
            ],
        )
    }
}

/// Read the ICCCM `WM_STATE` base state; absent means withdrawn
pub fn read_wm_state(server: &dyn XServer, atoms: &Atoms, window: Window) -> Result<WmState> {
    Ok(server
        .get_property32(window, atoms.wm_state)?
        .and_then(|v| v.first().copied())
        .map(WmState::from_raw)
        .unwrap_or_default())
}

/// Read the `_NET_WM_STATE` atom list
pub fn read_net_wm_state(server: &dyn XServer, atoms: &Atoms, window: Window) -> Result<Vec<Atom>> {
    Ok(server
        .get_property32(window, atoms.net_wm_state)?
        .unwrap_or_default())
}
