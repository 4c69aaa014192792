//! Window manager identification
//!
//! Classifies the running window manager once per session by probing root
//! window properties and selections in a fixed order; the first fingerprint
//! that matches wins.
//!
//! There is no re-detection: if the window manager is replaced mid-session
//! the stale identity is kept, since everything downstream assumes it never
//! changes.

use tracing::{debug, info};
use x11rb::protocol::xproto::Window;
use x11rb::NONE;

use crate::config::DetectionConfig;
use crate::error::Result;
use crate::wm::display::XServer;
use crate::wm::ewmh::Atoms;
use crate::wm::protocols::{NetProtocol, ProtocolSet, WinProtocol};

/// Known window managers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WmIdentity {
    #[default]
    Undetermined,
    NoWm,
    Other,
    OpenLook,
    Motif,
    Cde,
    Enlightenment,
    Kde2,
    Sawfish,
    IceWm,
    Metacity,
    Compiz,
    Lg3d,
    Cwm,
    Mutter,
    UnityCompiz,
    Xmonad,
    Awesome,
    I3,
}

impl WmIdentity {
    pub const ALL: [WmIdentity; 19] = [
        WmIdentity::Undetermined,
        WmIdentity::NoWm,
        WmIdentity::Other,
        WmIdentity::OpenLook,
        WmIdentity::Motif,
        WmIdentity::Cde,
        WmIdentity::Enlightenment,
        WmIdentity::Kde2,
        WmIdentity::Sawfish,
        WmIdentity::IceWm,
        WmIdentity::Metacity,
        WmIdentity::Compiz,
        WmIdentity::Lg3d,
        WmIdentity::Cwm,
        WmIdentity::Mutter,
        WmIdentity::UnityCompiz,
        WmIdentity::Xmonad,
        WmIdentity::Awesome,
        WmIdentity::I3,
    ];
}

/// Outcome of detection: who is running and which protocols it speaks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    pub identity: WmIdentity,
    pub protocols: ProtocolSet,
}

/// Run the detection sequence
pub fn detect(server: &dyn XServer, atoms: &Atoms, config: &DetectionConfig) -> Result<Detection> {
    let vendor = server.vendor();
    if config.no_wm_vendors.iter().any(|v| vendor.contains(v.as_str())) {
        info!("X server vendor {:?} never runs a window manager", vendor);
        return Ok(Detection {
            identity: WmIdentity::NoWm,
            protocols: ProtocolSet::default(),
        });
    }

    if !is_wm_running(server, atoms)? {
        info!("No window manager running");
        return Ok(Detection {
            identity: WmIdentity::NoWm,
            protocols: ProtocolSet::default(),
        });
    }

    let protocols = ProtocolSet::new(probe_net(server, atoms)?, probe_win(server, atoms)?);
    let identity = classify(server, atoms, &protocols)?;
    info!(
        "Detected window manager: {:?} (EWMH: {}, WIN: {}, name: {:?})",
        identity,
        protocols.net().is_some(),
        protocols.win().is_some(),
        protocols.net_wm_name()
    );
    Ok(Detection {
        identity,
        protocols,
    })
}

/// A manager selection owner, or a refused SubstructureRedirect, means a WM
fn is_wm_running(server: &dyn XServer, atoms: &Atoms) -> Result<bool> {
    let owner = server.get_selection_owner(atoms.wm_screen_selection)?;
    if owner != NONE {
        debug!("WM_S{} owned by 0x{:x}", server.screen_number(), owner);
        return Ok(true);
    }
    server.substructure_redirect_owned()
}

/// Follow a supporting-WM-check property to a window that points to itself
fn check_window(server: &dyn XServer, property: u32) -> Result<Option<Window>> {
    let root = server.root();
    let Some(window) = server
        .get_property32(root, property)?
        .and_then(|v| v.first().copied())
    else {
        return Ok(None);
    };
    let self_ref = server
        .get_property32(window, property)?
        .and_then(|v| v.first().copied());
    if self_ref != Some(window) {
        debug!("Stale supporting window 0x{:x} for atom {}", window, property);
        return Ok(None);
    }
    Ok(Some(window))
}

fn probe_net(server: &dyn XServer, atoms: &Atoms) -> Result<Option<NetProtocol>> {
    let Some(check) = check_window(server, atoms.net_supporting_wm_check)? else {
        return Ok(None);
    };
    let supported = server
        .get_property32(server.root(), atoms.net_supported)?
        .unwrap_or_default();
    let wm_name = server.get_string_property(check, atoms.net_wm_name)?;
    Ok(Some(NetProtocol {
        check_window: check,
        supported,
        wm_name,
    }))
}

fn probe_win(server: &dyn XServer, atoms: &Atoms) -> Result<Option<WinProtocol>> {
    let Some(check) = check_window(server, atoms.win_supporting_wm_check)? else {
        return Ok(None);
    };
    let protocols = server
        .get_property32(server.root(), atoms.win_protocols)?
        .unwrap_or_default();
    Ok(Some(WinProtocol {
        check_window: check,
        protocols,
    }))
}

fn classify(server: &dyn XServer, atoms: &Atoms, protocols: &ProtocolSet) -> Result<WmIdentity> {
    let name = protocols.net_wm_name().unwrap_or("");
    let named = |n: &str| name == n;

    if is_enlightenment(server, atoms)? {
        return Ok(WmIdentity::Enlightenment);
    }
    if named("Metacity") {
        return Ok(WmIdentity::Metacity);
    }
    if name.starts_with("Mutter") || named("GNOME Shell") {
        return Ok(WmIdentity::Mutter);
    }
    if named("Sawfish") {
        return Ok(WmIdentity::Sawfish);
    }
    if named("KWin") {
        return Ok(WmIdentity::Kde2);
    }
    if named("compiz") {
        return Ok(WmIdentity::Compiz);
    }
    if named("LG3D") {
        return Ok(WmIdentity::Lg3d);
    }
    if named("CWM") {
        return Ok(WmIdentity::Cwm);
    }
    if is_icewm(server, atoms, protocols)? {
        return Ok(WmIdentity::IceWm);
    }
    if named("Compiz") {
        return Ok(WmIdentity::UnityCompiz);
    }
    if named("xmonad") {
        return Ok(WmIdentity::Xmonad);
    }
    if named("awesome") {
        return Ok(WmIdentity::Awesome);
    }
    if named("i3") {
        return Ok(WmIdentity::I3);
    }

    if !protocols.is_empty() {
        return Ok(WmIdentity::Other);
    }

    if is_cde(server, atoms)? {
        return Ok(WmIdentity::Cde);
    }
    if is_motif(server, atoms)? {
        return Ok(WmIdentity::Motif);
    }
    if server
        .get_property(server.root(), atoms.sun_wm_protocols)?
        .is_some()
    {
        return Ok(WmIdentity::OpenLook);
    }
    Ok(WmIdentity::Other)
}

/// `ENLIGHTENMENT_COMMS` names a window whose own copy reads `WINID <hex>`
fn is_enlightenment(server: &dyn XServer, atoms: &Atoms) -> Result<bool> {
    let Some(comms) = server
        .get_property32(server.root(), atoms.enlightenment_comms)?
        .and_then(|v| v.first().copied())
    else {
        return Ok(false);
    };
    let Some(text) = server.get_string_property(comms, atoms.enlightenment_comms)? else {
        return Ok(false);
    };
    let id = text
        .trim()
        .strip_prefix("WINID")
        .and_then(|rest| u32::from_str_radix(rest.trim(), 16).ok());
    Ok(id == Some(comms))
}

fn is_icewm(server: &dyn XServer, atoms: &Atoms, protocols: &ProtocolSet) -> Result<bool> {
    if protocols.net_wm_name().is_some_and(|n| n.starts_with("IceWM")) {
        return Ok(true);
    }
    Ok(server
        .get_property(server.root(), atoms.icewm_winopthint)?
        .is_some())
}

/// The CDE session manager window carries `_DT_SM_STATE_INFO`
fn is_cde(server: &dyn XServer, atoms: &Atoms) -> Result<bool> {
    let Some(window) = server
        .get_property32(server.root(), atoms.dt_sm_window_info)?
        .and_then(|v| v.first().copied())
    else {
        return Ok(false);
    };
    Ok(server.get_property(window, atoms.dt_sm_state_info)?.is_some())
}

/// `_MOTIF_WM_INFO` names mwm's window, which must sit directly under the root
fn is_motif(server: &dyn XServer, atoms: &Atoms) -> Result<bool> {
    let Some(info) = server.get_property32(server.root(), atoms.motif_wm_info)? else {
        return Ok(false);
    };
    let Some(window) = info.get(1).copied() else {
        return Ok(false);
    };
    Ok(server
        .query_tree(window)?
        .is_some_and(|tree| tree.parent == server.root()))
}
