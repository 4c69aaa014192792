//! State and layer protocols
//!
//! The window manager may speak EWMH (`_NET_WM_STATE`), the GNOME 1.x `_WIN`
//! hints, both, or neither. Each active protocol is one [`WmProtocol`]
//! variant; a [`ProtocolSet`] keeps them in priority order (EWMH first) and
//! callers walk it front to back.

use tracing::debug;
use x11rb::protocol::xproto::{Atom, Window};

use crate::error::Result;
use crate::wm::client_flags::{ExtendedState, Layer};
use crate::wm::display::XServer;
use crate::wm::ewmh::{read_net_wm_state, Atoms};

const NET_WM_STATE_REMOVE: u32 = 0;
const NET_WM_STATE_ADD: u32 = 1;
/// Source indication: normal application
const NET_SOURCE_APPLICATION: u32 = 1;

const WIN_STATE_MAXIMIZED_VERT: u32 = 1 << 2;
const WIN_STATE_MAXIMIZED_HORIZ: u32 = 1 << 3;
const WIN_STATE_MAXIMIZED: u32 = WIN_STATE_MAXIMIZED_VERT | WIN_STATE_MAXIMIZED_HORIZ;

const WIN_LAYER_NORMAL: u32 = 4;
const WIN_LAYER_ONTOP: u32 = 6;

/// EWMH as advertised through `_NET_SUPPORTING_WM_CHECK`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetProtocol {
    pub check_window: Window,
    /// Contents of `_NET_SUPPORTED` on the root
    pub supported: Vec<Atom>,
    /// `_NET_WM_NAME` of the check window
    pub wm_name: Option<String>,
}

/// GNOME 1.x hints as advertised through `_WIN_SUPPORTING_WM_CHECK`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinProtocol {
    pub check_window: Window,
    /// Contents of `_WIN_PROTOCOLS` on the root
    pub protocols: Vec<Atom>,
}

/// One active state/layer protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WmProtocol {
    Net(NetProtocol),
    Win(WinProtocol),
}

impl NetProtocol {
    pub fn supports(&self, atom: Atom) -> bool {
        self.supported.contains(&atom)
    }

    fn state_atoms(atoms: &Atoms, state: ExtendedState) -> Vec<Atom> {
        let mut list = Vec::new();
        if state.contains(ExtendedState::MAXIMIZED_HORIZ) {
            list.push(atoms._net_wm_state_maximized_horz);
        }
        if state.contains(ExtendedState::MAXIMIZED_VERT) {
            list.push(atoms._net_wm_state_maximized_vert);
        }
        list
    }

    /// Ask the WM through a root client message (mapped windows)
    fn send_state_change(
        server: &dyn XServer,
        atoms: &Atoms,
        window: Window,
        add: bool,
        changed: &[Atom],
    ) -> Result<()> {
        let action = if add { NET_WM_STATE_ADD } else { NET_WM_STATE_REMOVE };
        let first = changed.first().copied().unwrap_or(0);
        let second = changed.get(1).copied().unwrap_or(0);
        server.send_client_message(
            server.root(),
            window,
            atoms.net_wm_state,
            [action, first, second, NET_SOURCE_APPLICATION, 0],
        )
    }

    /// Edit the property directly (withdrawn windows, read when mapped)
    fn edit_state_property(
        server: &dyn XServer,
        atoms: &Atoms,
        window: Window,
        add: &[Atom],
        remove: &[Atom],
    ) -> Result<()> {
        let mut list = read_net_wm_state(server, atoms, window)?;
        list.retain(|a| !remove.contains(a));
        for atom in add {
            if !list.contains(atom) {
                list.push(*atom);
            }
        }
        if list.is_empty() {
            server.delete_property(window, atoms.net_wm_state)
        } else {
            server.set_property32(window, atoms.net_wm_state, atoms.atom, &list)
        }
    }
}

impl WmProtocol {
    /// Whether this protocol can perform `state` on its own
    pub fn supports_state(&self, atoms: &Atoms, state: ExtendedState) -> bool {
        match self {
            WmProtocol::Net(net) => {
                if state.is_empty() || state.contains(ExtendedState::ICONIFIED) {
                    return false;
                }
                NetProtocol::state_atoms(atoms, state)
                    .iter()
                    .all(|atom| net.supports(*atom))
            }
            WmProtocol::Win(win) => {
                !state.is_empty()
                    && !state.contains(ExtendedState::ICONIFIED)
                    && win.protocols.contains(&atoms.win_state)
            }
        }
    }

    /// Move `window` from `old` to `new` maximize bits
    pub fn set_state(
        &self,
        server: &dyn XServer,
        atoms: &Atoms,
        window: Window,
        old: ExtendedState,
        new: ExtendedState,
        visible: bool,
    ) -> Result<()> {
        let maximized = ExtendedState::MAXIMIZED_BOTH;
        let old = old & maximized;
        let new = new & maximized;
        match self {
            WmProtocol::Net(_) => {
                let added = NetProtocol::state_atoms(atoms, new.difference(old));
                let removed = NetProtocol::state_atoms(atoms, old.difference(new));
                debug!(
                    "_NET_WM_STATE for 0x{:x}: {:?} -> {:?} (visible: {})",
                    window, old, new, visible
                );
                if visible {
                    if !removed.is_empty() {
                        NetProtocol::send_state_change(server, atoms, window, false, &removed)?;
                    }
                    if !added.is_empty() {
                        NetProtocol::send_state_change(server, atoms, window, true, &added)?;
                    }
                    Ok(())
                } else {
                    NetProtocol::edit_state_property(server, atoms, window, &added, &removed)
                }
            }
            WmProtocol::Win(_) => {
                let to_bits = |s: ExtendedState| {
                    let mut bits = 0;
                    if s.contains(ExtendedState::MAXIMIZED_HORIZ) {
                        bits |= WIN_STATE_MAXIMIZED_HORIZ;
                    }
                    if s.contains(ExtendedState::MAXIMIZED_VERT) {
                        bits |= WIN_STATE_MAXIMIZED_VERT;
                    }
                    bits
                };
                let bits = to_bits(new);
                debug!("_WIN_STATE for 0x{:x}: 0x{:x} (visible: {})", window, bits, visible);
                if visible {
                    server.send_client_message(
                        server.root(),
                        window,
                        atoms.win_state,
                        [WIN_STATE_MAXIMIZED, bits, 0, 0, 0],
                    )
                } else {
                    server.set_property32(window, atoms.win_state, atoms.cardinal, &[bits])
                }
            }
        }
    }

    /// Maximize and layer bits this protocol currently reports for `window`
    pub fn get_state(
        &self,
        server: &dyn XServer,
        atoms: &Atoms,
        window: Window,
    ) -> Result<ExtendedState> {
        let mut state = ExtendedState::empty();
        match self {
            WmProtocol::Net(_) => {
                let list = read_net_wm_state(server, atoms, window)?;
                if list.contains(&atoms._net_wm_state_maximized_horz) {
                    state |= ExtendedState::MAXIMIZED_HORIZ;
                }
                if list.contains(&atoms._net_wm_state_maximized_vert) {
                    state |= ExtendedState::MAXIMIZED_VERT;
                }
                if list.contains(&atoms._net_wm_state_above) {
                    state |= ExtendedState::ALWAYS_ON_TOP;
                }
            }
            WmProtocol::Win(_) => {
                let bits = server
                    .get_property32(window, atoms.win_state)?
                    .and_then(|v| v.first().copied())
                    .unwrap_or(0);
                if bits & WIN_STATE_MAXIMIZED_HORIZ != 0 {
                    state |= ExtendedState::MAXIMIZED_HORIZ;
                }
                if bits & WIN_STATE_MAXIMIZED_VERT != 0 {
                    state |= ExtendedState::MAXIMIZED_VERT;
                }
                let layer = server
                    .get_property32(window, atoms.win_layer)?
                    .and_then(|v| v.first().copied());
                if layer.is_some_and(|l| l >= WIN_LAYER_ONTOP) {
                    state |= ExtendedState::ALWAYS_ON_TOP;
                }
            }
        }
        Ok(state)
    }

    /// Whether a change of `atom` is one of this protocol's state markers
    pub fn is_state_change(&self, atoms: &Atoms, atom: Atom) -> bool {
        match self {
            WmProtocol::Net(_) => atom == atoms.net_wm_state,
            WmProtocol::Win(_) => atom == atoms.win_state || atom == atoms.win_layer,
        }
    }

    pub fn supports_layer(&self, atoms: &Atoms) -> bool {
        match self {
            WmProtocol::Net(net) => net.supports(atoms._net_wm_state_above),
            WmProtocol::Win(win) => win.protocols.contains(&atoms.win_layer),
        }
    }

    pub fn set_layer(
        &self,
        server: &dyn XServer,
        atoms: &Atoms,
        window: Window,
        layer: Layer,
        visible: bool,
    ) -> Result<()> {
        let on_top = layer == Layer::AlwaysOnTop;
        match self {
            WmProtocol::Net(_) => {
                let above = [atoms._net_wm_state_above];
                if visible {
                    NetProtocol::send_state_change(server, atoms, window, on_top, &above)
                } else if on_top {
                    NetProtocol::edit_state_property(server, atoms, window, &above, &[])
                } else {
                    NetProtocol::edit_state_property(server, atoms, window, &[], &above)
                }
            }
            WmProtocol::Win(_) => {
                let value = if on_top { WIN_LAYER_ONTOP } else { WIN_LAYER_NORMAL };
                if visible {
                    server.send_client_message(
                        server.root(),
                        window,
                        atoms.win_layer,
                        [value, 0, 0, 0, 0],
                    )
                } else {
                    server.set_property32(window, atoms.win_layer, atoms.cardinal, &[value])
                }
            }
        }
    }
}

/// Active protocols in priority order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtocolSet {
    protocols: Vec<WmProtocol>,
}

impl ProtocolSet {
    /// Build the set; EWMH always precedes `_WIN`
    pub fn new(net: Option<NetProtocol>, win: Option<WinProtocol>) -> Self {
        let protocols = net
            .map(WmProtocol::Net)
            .into_iter()
            .chain(win.map(WmProtocol::Win))
            .collect();
        Self { protocols }
    }

    pub fn iter(&self) -> impl Iterator<Item = &WmProtocol> {
        self.protocols.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }

    pub fn net(&self) -> Option<&NetProtocol> {
        self.protocols.iter().find_map(|p| match p {
            WmProtocol::Net(net) => Some(net),
            WmProtocol::Win(_) => None,
        })
    }

    pub fn win(&self) -> Option<&WinProtocol> {
        self.protocols.iter().find_map(|p| match p {
            WmProtocol::Win(win) => Some(win),
            WmProtocol::Net(_) => None,
        })
    }

    /// Advertised `_NET_WM_NAME`, if EWMH is active
    pub fn net_wm_name(&self) -> Option<&str> {
        self.net().and_then(|n| n.wm_name.as_deref())
    }

    pub fn is_state_change(&self, atoms: &Atoms, atom: Atom) -> bool {
        self.protocols.iter().any(|p| p.is_state_change(atoms, atom))
    }
}
