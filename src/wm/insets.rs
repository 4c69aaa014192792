//! Frame insets
//!
//! How thick the window manager's frame is around a toplevel. Asked for in
//! order: `_NET_FRAME_EXTENTS`, the WM's own extents property, then by
//! measuring the window against the frame it was reparented into.

use tracing::{debug, trace, warn};
use x11rb::protocol::xproto::Window;
use x11rb::NONE;

use crate::error::Result;
use crate::shared::Insets;
use crate::wm::client::WindowKind;
use crate::wm::display::XServer;
use crate::wm::events::PeerEvent;
use crate::wm::identity::WmIdentity;
use crate::wm::profile::ExtentsProperty;
use crate::wm::session::SessionState;

/// Outcome of one geometric probe
enum Probe {
    Found(Insets),
    /// Reparent not finished yet; ask again
    Retry,
}

impl SessionState {
    /// Work out the insets of `window`, store them and report a change.
    ///
    /// `None` means the frame is not settled yet; callers try again on the
    /// next configure or reparent notification.
    pub fn compute_insets(&mut self, server: &dyn XServer, window: Window) -> Result<Option<Insets>> {
        let (kind, embedded) = {
            let w = self.window(window)?;
            (w.kind, w.embedded)
        };
        let identity = self.identity(server)?;

        let raw = if embedded || identity == WmIdentity::NoWm {
            Some(Insets::zero())
        } else {
            self.query_insets(server, window)?
        };
        let Some(raw) = raw else {
            debug!("Insets of 0x{:x} not known yet", window);
            return Ok(None);
        };

        let insets = raw.clamped(self.config.insets.max_inset);
        if insets != raw {
            warn!("Clamped bogus insets {:?} of 0x{:x} to {:?}", raw, window, insets);
        }
        if !embedded {
            self.insets_cache.insert(kind, insets);
        }

        let w = self.window_mut(window)?;
        let changed = w.insets != Some(insets);
        w.insets = Some(insets);
        if changed {
            debug!("Insets of 0x{:x}: {:?}", window, insets);
            self.emit(PeerEvent::InsetsChanged { window, insets });
        }
        Ok(Some(insets))
    }

    fn query_insets(&mut self, server: &dyn XServer, window: Window) -> Result<Option<Insets>> {
        if let Some(values) = server.get_property32(window, self.atoms.net_frame_extents)? {
            if let Some(insets) = Insets::from_extents(&values) {
                trace!("_NET_FRAME_EXTENTS of 0x{:x}: {:?}", window, insets);
                return Ok(Some(insets));
            }
        }

        let profile = self.profile(server)?;
        if let Some(property) = profile.extents_property {
            let atom = match property {
                ExtentsProperty::KdeFrameStrut => self.atoms.kde_net_wm_frame_strut,
                ExtentsProperty::EnlightenmentFrameSize => self.atoms.e_frame_size,
            };
            if let Some(insets) = server
                .get_property32(window, atom)?
                .and_then(|v| Insets::from_extents(&v))
            {
                trace!("{:?} of 0x{:x}: {:?}", property, window, insets);
                return Ok(Some(insets));
            }
        }

        if self.is_non_reparenting(server)? {
            return Ok(Some(profile.default_insets));
        }

        let attempts = self.config.insets.retry_limit.max(1);
        for attempt in 0..attempts {
            if attempt > 0 {
                server.sync()?;
            }
            match self.probe_frame(server, window)? {
                Some(Probe::Found(insets)) => return Ok(Some(insets)),
                Some(Probe::Retry) => trace!("Frame of 0x{:x} not settled (attempt {})", window, attempt + 1),
                None => return Ok(None),
            }
        }
        Ok(None)
    }

    /// Measure `window` inside its parent, or its grandparent when the WM
    /// double-reparents. `None` when the window is gone.
    fn probe_frame(&self, server: &dyn XServer, window: Window) -> Result<Option<Probe>> {
        let Some(attrs) = server.query_window_attributes(window)? else {
            return Ok(None);
        };
        if attrs.parent == self.root || attrs.parent == NONE {
            return Ok(Some(Probe::Retry));
        }
        let Some(parent) = server.query_window_attributes(attrs.parent)? else {
            return Ok(Some(Probe::Retry));
        };

        let bw = attrs.border_width as i32;
        let width = attrs.width as i32 + 2 * bw;
        let height = attrs.height as i32 + 2 * bw;

        // A parent exactly our size is an inner container; the frame is above it
        let double = attrs.x == 0
            && attrs.y == 0
            && width == parent.width as i32
            && height == parent.height as i32;
        let (x, y, frame) = if double {
            if parent.parent == self.root || parent.parent == NONE {
                return Ok(Some(Probe::Retry));
            }
            let Some(grandparent) = server.query_window_attributes(parent.parent)? else {
                return Ok(Some(Probe::Retry));
            };
            trace!("0x{:x} is double reparented, frame 0x{:x}", window, parent.parent);
            (parent.x, parent.y, grandparent)
        } else {
            (attrs.x, attrs.y, parent)
        };

        let insets = Insets::new(
            y + bw,
            x + bw,
            frame.height as i32 - (y + height),
            frame.width as i32 - (x + width),
        );
        Ok(Some(Probe::Found(insets)))
    }

    /// Best guess for a new window of `kind` before its real insets are known
    pub fn guess_insets(&mut self, server: &dyn XServer, kind: WindowKind) -> Result<Insets> {
        if let Some(insets) = self.insets_cache.get(&kind) {
            return Ok(*insets);
        }
        Ok(self.profile(server)?.default_insets)
    }

    /// Ask the WM to publish `_NET_FRAME_EXTENTS` before mapping
    pub fn request_frame_extents(&mut self, server: &dyn XServer, window: Window) -> Result<()> {
        let protocols = self.protocols(server)?;
        let supported = protocols
            .net()
            .is_some_and(|n| n.supports(self.atoms._net_request_frame_extents));
        if !supported {
            return Ok(());
        }
        debug!("Requesting frame extents for 0x{:x}", window);
        server.send_client_message(
            server.root(),
            window,
            self.atoms._net_request_frame_extents,
            [0; 5],
        )
    }
}
