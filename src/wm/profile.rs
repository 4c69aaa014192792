//! Per window manager policy
//!
//! Fixed knowledge about each identified window manager: how thick its
//! frames usually are, whether it reparents, which decoration hints it
//! honours and which extent property it publishes besides
//! `_NET_FRAME_EXTENTS`.

use crate::shared::Insets;
use crate::wm::identity::WmIdentity;

/// Which decoration hint conventions to write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecorDialect {
    /// `_MOTIF_WM_HINTS`
    pub motif: bool,
    /// `_OL_DECOR_DEL`
    pub open_look: bool,
}

/// Bespoke frame extent property, beyond `_NET_FRAME_EXTENTS`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtentsProperty {
    /// `_KDE_NET_WM_FRAME_STRUT`
    KdeFrameStrut,
    /// `_E_FRAME_SIZE`
    EnlightenmentFrameSize,
}

/// Policy record for one identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WmProfile {
    /// Guess used before real insets are known
    pub default_insets: Insets,
    pub non_reparenting: bool,
    /// Whether the WM relayouts while the user drags a frame edge
    pub supports_dynamic_layout: bool,
    /// Whether maximizing a single axis is honoured
    pub supports_unidirectional_maximize: bool,
    pub decor: DecorDialect,
    pub extents_property: Option<ExtentsProperty>,
}

/// Look up the policy for `identity`
pub fn profile_for(identity: WmIdentity) -> WmProfile {
    use WmIdentity::*;

    let default_insets = match identity {
        Enlightenment => Insets::new(19, 4, 4, 4),
        Cde => Insets::new(28, 6, 6, 6),
        UnityCompiz => Insets::new(28, 1, 1, 1),
        NoWm | Lg3d | Compiz | Cwm | Xmonad => Insets::zero(),
        _ => Insets::new(25, 5, 5, 5),
    };

    WmProfile {
        default_insets,
        non_reparenting: matches!(identity, Compiz | Lg3d | Cwm | Xmonad),
        supports_dynamic_layout: matches!(
            identity,
            Enlightenment | Kde2 | Sawfish | IceWm | Metacity
        ),
        supports_unidirectional_maximize: !matches!(identity, Metacity | Mutter),
        decor: DecorDialect {
            motif: true,
            open_look: matches!(identity, OpenLook | Other | Undetermined),
        },
        extents_property: match identity {
            Kde2 => Some(ExtentsProperty::KdeFrameStrut),
            Enlightenment => Some(ExtentsProperty::EnlightenmentFrameSize),
            _ => None,
        },
    }
}
