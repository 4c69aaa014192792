//! Session Module
//!
//! A display session owns everything the toplevel peers share: the detected
//! window manager, the window registry, the transient-for chains, focus and
//! grab state, and the queue of events waiting for the toolkit.
//!
//! All of it sits behind one recursive lock. Every public operation takes
//! the lock for its whole duration, native round trips included; callers
//! that need several operations to be atomic hold [`Session::lock`] across
//! them.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use tracing::{debug, info};
use x11rb::protocol::xproto::{Atom, NotifyDetail, NotifyMode, Window};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::shared::{Geometry, Insets};
use crate::wm::client::{ToplevelWindow, WindowKind};
use crate::wm::client_flags::{ExtendedState, Layer, MwmDecorations, MwmFunctions};
use crate::wm::display::XServer;
use crate::wm::events::{PeerEvent, PointerInput};
use crate::wm::ewmh::Atoms;
use crate::wm::focus::{FocusResponse, FocusState};
use crate::wm::grab::GrabState;
use crate::wm::identity::{detect, Detection, WmIdentity};
use crate::wm::profile::{profile_for, WmProfile};
use crate::wm::protocols::ProtocolSet;
use crate::wm::state::WindowState;

/// Shared state of one display session, only reachable under the lock
#[derive(Debug)]
pub struct SessionState {
    pub(crate) config: Config,
    pub(crate) atoms: Atoms,
    pub(crate) root: Window,
    detection: Option<Detection>,
    pub(crate) windows: HashMap<Window, ToplevelWindow>,
    /// Last real insets seen per window kind
    pub(crate) insets_cache: HashMap<WindowKind, Insets>,
    pub(crate) focus: FocusState,
    pub(crate) grab: GrabState,
    pub(crate) events: VecDeque<PeerEvent>,
}

impl SessionState {
    pub fn new(server: &dyn XServer, config: Config) -> Result<Self> {
        Ok(Self {
            atoms: Atoms::new(server)?,
            root: server.root(),
            config,
            detection: None,
            windows: HashMap::new(),
            insets_cache: HashMap::new(),
            focus: FocusState::default(),
            grab: GrabState::default(),
            events: VecDeque::new(),
        })
    }

    /// Detect the window manager on first use
    fn detection(&mut self, server: &dyn XServer) -> Result<&Detection> {
        if self.detection.is_none() {
            let detection = detect(server, &self.atoms, &self.config.detection)?;
            self.detection = Some(detection);
        }
        Ok(self.detection.get_or_insert_with(Detection::default))
    }

    pub fn identity(&mut self, server: &dyn XServer) -> Result<WmIdentity> {
        Ok(self.detection(server)?.identity)
    }

    pub fn protocols(&mut self, server: &dyn XServer) -> Result<ProtocolSet> {
        Ok(self.detection(server)?.protocols.clone())
    }

    pub fn profile(&mut self, server: &dyn XServer) -> Result<WmProfile> {
        Ok(profile_for(self.identity(server)?))
    }

    /// Whether frames wrap toplevels, after the configured override
    pub fn is_non_reparenting(&mut self, server: &dyn XServer) -> Result<bool> {
        Ok(self.config.detection.non_reparenting || self.profile(server)?.non_reparenting)
    }

    pub fn set_identity_override(&mut self, server: &dyn XServer, identity: WmIdentity) -> Result<()> {
        let protocols = self.protocols(server)?;
        info!("Window manager identity overridden to {:?}", identity);
        self.detection = Some(Detection {
            identity,
            protocols,
        });
        Ok(())
    }

    pub fn window(&self, window: Window) -> Result<&ToplevelWindow> {
        self.windows.get(&window).ok_or(Error::UnknownWindow(window))
    }

    pub fn window_mut(&mut self, window: Window) -> Result<&mut ToplevelWindow> {
        self.windows
            .get_mut(&window)
            .ok_or(Error::UnknownWindow(window))
    }

    pub fn is_registered(&self, window: Window) -> bool {
        self.windows.contains_key(&window)
    }

    pub(crate) fn emit(&mut self, event: PeerEvent) {
        debug!("Peer event: {:?}", event);
        self.events.push_back(event);
    }

    pub fn register_window(&mut self, server: &dyn XServer, toplevel: ToplevelWindow) -> Result<()> {
        let window = toplevel.window;
        let has_owner = toplevel.owner.is_some();
        debug!("Registering toplevel 0x{:x} ({:?})", window, toplevel.kind);
        self.windows.insert(window, toplevel);
        if has_owner {
            self.restore_transient_for(server, window)?;
        }
        Ok(())
    }

    /// Forget `window`, releasing every relation other windows hold on it
    pub fn dispose_window(&mut self, server: &dyn XServer, window: Window) -> Result<()> {
        if !self.is_registered(window) {
            return Ok(());
        }
        debug!("Disposing toplevel 0x{:x}", window);

        let blocked: Vec<Window> = self
            .windows
            .values()
            .filter(|w| w.modal_blocker == Some(window))
            .map(|w| w.window)
            .collect();
        for w in blocked {
            self.set_modal_blocked(server, w, window, false)?;
        }
        if let Some(blocker) = self.window(window)?.modal_blocker {
            self.set_modal_blocked(server, window, blocker, false)?;
        }

        if self.grab.grab_window == Some(window) {
            self.ungrab_input(server, window)?;
        }
        if self.grab.press_target == Some(window) {
            self.grab.press_target = None;
        }
        if self.focus.focused_window == Some(window) {
            self.focus.focused_window = None;
        }
        for w in self.windows.values_mut() {
            if w.actual_focused_window == Some(window) {
                w.actual_focused_window = None;
            }
            if w.owner == Some(window) {
                w.owner = None;
            }
        }
        self.windows.remove(&window);
        Ok(())
    }

    pub fn show_window(&mut self, server: &dyn XServer, window: Window) -> Result<()> {
        self.window_mut(window)?.visible = true;
        debug!("Showing 0x{:x}", window);
        server.map_window(window)?;
        self.update_transient_for(server, window)?;
        Ok(())
    }

    pub fn hide_window(&mut self, server: &dyn XServer, window: Window) -> Result<()> {
        let w = self.window_mut(window)?;
        w.visible = false;
        debug!("Hiding 0x{:x}", window);
        server.unmap_window(window)?;
        if self.grab.grab_window == Some(window) {
            self.ungrab_input(server, window)?;
        }
        if self.focus.focused_window == Some(window) {
            self.focus.focused_window = None;
        }
        Ok(())
    }
}

/// Held toolkit lock; may be taken again on the same thread
pub struct SessionLock<'a> {
    _guard: ReentrantMutexGuard<'a, RefCell<SessionState>>,
}

/// A display session over an [`XServer`]
pub struct Session<S: XServer> {
    server: S,
    state: ReentrantMutex<RefCell<SessionState>>,
}

impl<S: XServer> Session<S> {
    pub fn new(server: S, config: Config) -> Result<Self> {
        let state = SessionState::new(&server, config)?;
        Ok(Self {
            server,
            state: ReentrantMutex::new(RefCell::new(state)),
        })
    }

    pub fn server(&self) -> &S {
        &self.server
    }

    /// Take the toolkit lock for a sequence of operations
    pub fn lock(&self) -> SessionLock<'_> {
        SessionLock {
            _guard: self.state.lock(),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&dyn XServer, &mut SessionState) -> Result<R>) -> Result<R> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        f(&self.server, &mut state)
    }

    fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        let guard = self.state.lock();
        let state = guard.borrow();
        f(&state)
    }

    pub fn atoms(&self) -> Atoms {
        self.read(|s| s.atoms.clone())
    }

    pub fn identity(&self) -> Result<WmIdentity> {
        self.with(|server, s| s.identity(server))
    }

    pub fn protocols(&self) -> Result<ProtocolSet> {
        self.with(|server, s| s.protocols(server))
    }

    pub fn profile(&self) -> Result<WmProfile> {
        self.with(|server, s| s.profile(server))
    }

    pub fn set_identity_override(&self, identity: WmIdentity) -> Result<()> {
        self.with(|server, s| s.set_identity_override(server, identity))
    }

    // Registry

    pub fn register_window(&self, toplevel: ToplevelWindow) -> Result<()> {
        self.with(|server, s| s.register_window(server, toplevel))
    }

    pub fn dispose_window(&self, window: Window) -> Result<()> {
        self.with(|server, s| s.dispose_window(server, window))
    }

    /// Snapshot of a registered window
    pub fn window(&self, window: Window) -> Option<ToplevelWindow> {
        self.read(|s| s.windows.get(&window).cloned())
    }

    pub fn show_window(&self, window: Window) -> Result<()> {
        self.with(|server, s| s.show_window(server, window))
    }

    pub fn hide_window(&self, window: Window) -> Result<()> {
        self.with(|server, s| s.hide_window(server, window))
    }

    // Decorations and insets

    pub fn compute_insets(&self, window: Window) -> Result<Option<Insets>> {
        self.with(|server, s| s.compute_insets(server, window))
    }

    pub fn guess_insets(&self, kind: WindowKind) -> Result<Insets> {
        self.with(|server, s| s.guess_insets(server, kind))
    }

    pub fn request_frame_extents(&self, window: Window) -> Result<()> {
        self.with(|server, s| s.request_frame_extents(server, window))
    }

    pub fn apply_decoration(
        &self,
        window: Window,
        resizable: bool,
        decorations: MwmDecorations,
        functions: MwmFunctions,
    ) -> Result<(MwmDecorations, MwmFunctions)> {
        self.with(|server, s| s.apply_decoration(server, window, resizable, decorations, functions))
    }

    pub fn make_resizable(&self, window: Window) -> Result<()> {
        self.with(|server, s| s.make_resizable(server, window))
    }

    pub fn make_non_resizable(&self, window: Window, size: (u32, u32), shell_bounds: Geometry) -> Result<()> {
        self.with(|server, s| s.make_non_resizable(server, window, size, shell_bounds))
    }

    // State and stacking

    pub fn get_state(&self, window: Window) -> Result<WindowState> {
        self.with(|server, s| s.get_state(server, window))
    }

    pub fn set_extended_state(&self, window: Window, state: ExtendedState) -> Result<()> {
        self.with(|server, s| s.set_extended_state(server, window, state))
    }

    pub fn supports_extended_state(&self, state: ExtendedState) -> Result<bool> {
        self.with(|server, s| s.supports_extended_state(server, state))
    }

    pub fn is_state_change(&self, window: Window, atom: Atom) -> Result<bool> {
        self.with(|server, s| s.is_state_change(server, window, atom))
    }

    pub fn set_layer(&self, window: Window, layer: Layer) -> Result<()> {
        self.with(|server, s| s.set_layer(server, window, layer))
    }

    pub fn to_front(&self, window: Window) -> Result<()> {
        self.with(|server, s| s.to_front(server, window))
    }

    /// Topmost visible toplevel under a root point
    pub fn window_at(&self, root_x: i32, root_y: i32) -> Result<Option<Window>> {
        self.with(|server, s| s.window_at(server, root_x, root_y))
    }

    /// Registered toplevels in server stacking order, bottom first
    pub fn collect_toplevels(&self) -> Result<Vec<Window>> {
        self.with(|server, s| s.collect_toplevels(server))
    }

    // Modal blocking

    pub fn set_modal_blocked(&self, window: Window, dialog: Window, blocked: bool) -> Result<()> {
        self.with(|server, s| s.set_modal_blocked(server, window, dialog, blocked))
    }

    /// The transient-for chain through `window`, head first
    pub fn transient_chain(&self, window: Window) -> Vec<Window> {
        self.read(|s| s.transient_chain(window))
    }

    // Focus and grab

    pub fn request_window_focus(&self, window: Window) -> Result<FocusResponse> {
        self.with(|server, s| s.request_window_focus(server, window))
    }

    pub fn focused_window(&self) -> Option<Window> {
        self.read(|s| s.focus.focused_window)
    }

    pub fn actual_focused_window(&self, window: Window) -> Option<Window> {
        self.read(|s| s.windows.get(&window).and_then(|w| w.actual_focused_window))
    }

    pub fn grab_input(&self, window: Window) -> Result<bool> {
        self.with(|server, s| s.grab_input(server, window))
    }

    pub fn ungrab_input(&self, window: Window) -> Result<()> {
        self.with(|server, s| s.ungrab_input(server, window))
    }

    pub fn grab_window(&self) -> Option<Window> {
        self.read(|s| s.grab.grab_window)
    }

    // Inbound events

    pub fn on_configure_notify(
        &self,
        window: Window,
        bounds: Geometry,
        synthetic: bool,
    ) -> Result<()> {
        self.with(|server, s| s.on_configure_notify(server, window, bounds, synthetic))
    }

    pub fn on_map_notify(&self, window: Window) -> Result<()> {
        self.with(|server, s| s.on_map_notify(server, window))
    }

    pub fn on_unmap_notify(&self, window: Window) -> Result<()> {
        self.with(|server, s| s.on_unmap_notify(server, window))
    }

    pub fn on_reparent_notify(&self, window: Window, parent: Window) -> Result<()> {
        self.with(|server, s| s.on_reparent_notify(server, window, parent))
    }

    pub fn on_property_changed(&self, window: Window, atom: Atom, time: u32) -> Result<()> {
        self.with(|server, s| s.on_property_changed(server, window, atom, time))
    }

    pub fn on_focus_in(&self, window: Window, mode: NotifyMode) -> Result<()> {
        self.with(|server, s| s.on_focus_in(server, window, mode))
    }

    pub fn on_focus_out(&self, window: Window, mode: NotifyMode, detail: NotifyDetail) -> Result<()> {
        self.with(|server, s| s.on_focus_out(server, window, mode, detail))
    }

    pub fn on_button_press(&self, input: PointerInput) -> Result<()> {
        self.with(|server, s| s.on_button_press(server, input))
    }

    pub fn on_button_release(&self, input: PointerInput) -> Result<()> {
        self.with(|server, s| s.on_button_release(server, input))
    }

    pub fn on_pointer_motion(&self, input: PointerInput) -> Result<()> {
        self.with(|server, s| s.on_pointer_motion(server, input))
    }

    /// Take every event queued for the toolkit
    pub fn drain_events(&self) -> Vec<PeerEvent> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        state.events.drain(..).collect()
    }
}
