//! Input grab and pointer retargeting
//!
//! While a toplevel holds the grab the server sends it every pointer event.
//! Events are handed back to the owned window under the pointer, a drag
//! stays with the window it started in, and a press outside the grabbing
//! hierarchy ends the grab.

use tracing::{debug, trace, warn};
use x11rb::protocol::xproto::Window;

use crate::error::Result;
use crate::wm::display::XServer;
use crate::wm::events::{PeerEvent, PointerInput, PointerKind};
use crate::wm::session::SessionState;

/// Which toplevel holds the input grab
#[derive(Debug, Default)]
pub struct GrabState {
    pub grab_window: Option<Window>,
    /// Window that got the last press; drags and the release go there
    pub press_target: Option<Window>,
}

impl SessionState {
    /// Grab pointer and keyboard for `window`.
    ///
    /// A previous holder is told with [`PeerEvent::Ungrab`]. Returns false
    /// when the server refused the grab.
    pub fn grab_input(&mut self, server: &dyn XServer, window: Window) -> Result<bool> {
        self.window(window)?;
        if self.grab.grab_window == Some(window) {
            return Ok(true);
        }
        if let Some(previous) = self.grab.grab_window.take() {
            debug!("Grab moves from 0x{:x} to 0x{:x}", previous, window);
            self.emit(PeerEvent::Ungrab { window: previous });
        }
        self.grab.press_target = None;

        if !self.config.grab.disable_grab && !server.grab_input(window)? {
            warn!("Server refused input grab for 0x{:x}", window);
            server.ungrab_input()?;
            return Ok(false);
        }
        debug!("Input grabbed by 0x{:x}", window);
        self.grab.grab_window = Some(window);
        Ok(true)
    }

    /// Release the grab held by `window`, if it holds one
    pub fn ungrab_input(&mut self, server: &dyn XServer, window: Window) -> Result<()> {
        if self.grab.grab_window != Some(window) {
            return Ok(());
        }
        debug!("Input released by 0x{:x}", window);
        self.release_grab(server)
    }

    fn release_grab(&mut self, server: &dyn XServer) -> Result<()> {
        self.grab.grab_window = None;
        self.grab.press_target = None;
        if !self.config.grab.disable_grab {
            server.ungrab_input()?;
        }
        Ok(())
    }

    /// `window` is `grab` or owned, possibly indirectly, by it
    fn in_grab_hierarchy(&self, grab: Window, window: Window) -> bool {
        let mut current = Some(window);
        for _ in 0..=self.windows.len() {
            match current {
                Some(w) if w == grab => return true,
                Some(w) => current = self.windows.get(&w).and_then(|t| t.owner),
                None => return false,
            }
        }
        false
    }

    /// Topmost visible window of the grab hierarchy under the root point.
    ///
    /// Only client areas count; decorations belong to the window manager.
    fn grab_target(&self, server: &dyn XServer, grab: Window, input: &PointerInput) -> Result<Option<Window>> {
        let order = self.collect_toplevels(server)?;
        Ok(order.into_iter().rev().find(|w| {
            self.in_grab_hierarchy(grab, *w)
                && self.windows.get(w).is_some_and(|t| {
                    t.visible && t.bounds.contains(input.root_x, input.root_y)
                })
        }))
    }

    /// Plain delivery when nobody grabs: blocked windows get nothing
    fn ungrabbed_target(&self, input: &PointerInput) -> Option<Window> {
        self.windows
            .get(&input.window)
            .filter(|t| !t.is_modal_blocked())
            .map(|t| t.window)
    }

    fn deliver(&mut self, target: Window, kind: PointerKind, input: &PointerInput) -> Result<()> {
        let (x, y) = if target == input.window {
            (input.x, input.y)
        } else {
            self.window(target)?.bounds.to_local(input.root_x, input.root_y)
        };
        self.emit(PeerEvent::Pointer {
            window: target,
            kind,
            button: input.button,
            x,
            y,
            root_x: input.root_x,
            root_y: input.root_y,
        });
        Ok(())
    }

    pub fn on_button_press(&mut self, server: &dyn XServer, input: PointerInput) -> Result<()> {
        let Some(grab) = self.grab.grab_window else {
            match self.ungrabbed_target(&input) {
                Some(target) => self.deliver(target, PointerKind::Press, &input)?,
                None => trace!("Press on 0x{:x} dropped", input.window),
            }
            return Ok(());
        };

        match self.grab_target(server, grab, &input)? {
            Some(target) => {
                self.grab.press_target = Some(target);
                self.deliver(target, PointerKind::Press, &input)
            }
            None if input.is_wheel() => {
                trace!("Wheel outside grab of 0x{:x} dropped", grab);
                Ok(())
            }
            None => {
                debug!(
                    "Press at {},{} outside grab of 0x{:x}, ungrabbing",
                    input.root_x, input.root_y, grab
                );
                self.release_grab(server)?;
                self.emit(PeerEvent::Ungrab { window: grab });
                Ok(())
            }
        }
    }

    pub fn on_button_release(&mut self, server: &dyn XServer, input: PointerInput) -> Result<()> {
        let Some(grab) = self.grab.grab_window else {
            if let Some(target) = self.ungrabbed_target(&input) {
                self.deliver(target, PointerKind::Release, &input)?;
            }
            return Ok(());
        };

        let pressed = self.grab.press_target.take().filter(|w| self.is_registered(*w));
        let target = match pressed {
            Some(target) => target,
            None => self.grab_target(server, grab, &input)?.unwrap_or(grab),
        };
        self.deliver(target, PointerKind::Release, &input)
    }

    pub fn on_pointer_motion(&mut self, server: &dyn XServer, input: PointerInput) -> Result<()> {
        let Some(grab) = self.grab.grab_window else {
            if let Some(target) = self.ungrabbed_target(&input) {
                self.deliver(target, PointerKind::Motion, &input)?;
            }
            return Ok(());
        };

        let dragged = self
            .grab
            .press_target
            .filter(|w| input.is_dragging() && self.is_registered(*w));
        let target = match dragged {
            Some(target) => target,
            None => self.grab_target(server, grab, &input)?.unwrap_or(grab),
        };
        self.deliver(target, PointerKind::Motion, &input)
    }
}
