//! Display Module
//!
//! The native side of the toplevel peers: every X request the negotiation
//! layer issues goes through [`XServer`]. [`X11Display`] implements it over
//! an x11rb connection; tests swap in an in-memory server.
//!
//! Errors that a racing window manager can provoke (BadWindow while a frame
//! is torn down, BadAccess while probing for redirect ownership) are trapped
//! here and come back as `None`/`false`.

use tracing::{debug, info, trace};
use x11rb::connection::Connection;
use x11rb::errors::ReplyError;
use x11rb::protocol::xproto::{
    Atom, AtomEnum, ChangeWindowAttributesAux, ClientMessageEvent, ConfigureWindowAux,
    ConnectionExt as _, EventMask, GrabMode, GrabStatus, InputFocus, MapState, PropMode,
    StackMode, Window,
};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::{CURRENT_TIME, NONE};

use crate::error::Result;
use crate::shared::Geometry;

/// Geometry and tree position of a window, as the server reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowAttributes {
    /// Position relative to `parent`
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub border_width: u32,
    pub parent: Window,
    pub root: Window,
    pub mapped: bool,
    pub override_redirect: bool,
}

/// Result of a tree query; `children` are in stacking order, bottom first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTree {
    pub root: Window,
    pub parent: Window,
    pub children: Vec<Window>,
}

/// A property value as stored on the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub type_: Atom,
    pub format: u8,
    pub value: Vec<u8>,
}

impl Property {
    pub fn from_u32(type_: Atom, values: &[u32]) -> Self {
        Self {
            type_,
            format: 32,
            value: values.iter().flat_map(|v| v.to_ne_bytes()).collect(),
        }
    }

    pub fn from_text(type_: Atom, text: &str) -> Self {
        Self {
            type_,
            format: 8,
            value: text.as_bytes().to_vec(),
        }
    }

    /// Decode a format-32 property; `None` for any other format
    pub fn value32(&self) -> Option<Vec<u32>> {
        if self.format != 32 {
            return None;
        }
        Some(
            self.value
                .chunks_exact(4)
                .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        )
    }

    /// Decode a format-8 property as text, dropping a trailing NUL
    pub fn as_string(&self) -> Option<String> {
        if self.format != 8 {
            return None;
        }
        let bytes = self.value.strip_suffix(&[0]).unwrap_or(&self.value);
        Some(String::from_utf8_lossy(bytes).into_owned())
    }
}

/// Outbound protocol operations consumed by the negotiation layer
pub trait XServer {
    fn root(&self) -> Window;

    fn screen_number(&self) -> usize;

    /// Server vendor string from the connection setup
    fn vendor(&self) -> String;

    fn intern_atom(&self, name: &str) -> Result<Atom>;

    /// `None` when the window no longer exists
    fn query_window_attributes(&self, window: Window) -> Result<Option<WindowAttributes>>;

    /// `None` when the window no longer exists
    fn query_tree(&self, window: Window) -> Result<Option<QueryTree>>;

    /// `None` when the property is absent or the window is gone
    fn get_property(&self, window: Window, property: Atom) -> Result<Option<Property>>;

    fn set_property(&self, window: Window, property: Atom, value: &Property) -> Result<()>;

    fn delete_property(&self, window: Window, property: Atom) -> Result<()>;

    /// Send a format-32 client message about `window` to `destination`
    fn send_client_message(
        &self,
        destination: Window,
        window: Window,
        type_: Atom,
        data: [u32; 5],
    ) -> Result<()>;

    fn map_window(&self, window: Window) -> Result<()>;

    fn unmap_window(&self, window: Window) -> Result<()>;

    fn raise_window(&self, window: Window) -> Result<()>;

    /// Restack so that `order` (bottom first) ends up consecutive
    fn restack_windows(&self, order: &[Window]) -> Result<()>;

    fn move_resize_window(&self, window: Window, bounds: Geometry) -> Result<()>;

    /// Write or remove `WM_TRANSIENT_FOR`
    fn set_transient_for(&self, window: Window, target: Option<Window>) -> Result<()>;

    fn get_selection_owner(&self, selection: Atom) -> Result<Window>;

    /// Whether another client already holds SubstructureRedirect on the root.
    ///
    /// Probes by trying to take it; on success the root event mask is put
    /// back the way it was.
    fn substructure_redirect_owned(&self) -> Result<bool>;

    fn get_input_focus(&self) -> Result<Window>;

    fn set_input_focus(&self, window: Window, time: u32) -> Result<()>;

    /// Grab pointer and keyboard for `window`; `false` if either grab failed
    fn grab_input(&self, window: Window) -> Result<bool>;

    fn ungrab_input(&self) -> Result<()>;

    /// Flush and wait until the server has processed every request
    fn sync(&self) -> Result<()>;

    fn get_property32(&self, window: Window, property: Atom) -> Result<Option<Vec<u32>>> {
        Ok(self
            .get_property(window, property)?
            .and_then(|p| p.value32()))
    }

    fn get_string_property(&self, window: Window, property: Atom) -> Result<Option<String>> {
        Ok(self
            .get_property(window, property)?
            .and_then(|p| p.as_string()))
    }

    fn set_property32(
        &self,
        window: Window,
        property: Atom,
        type_: Atom,
        values: &[u32],
    ) -> Result<()> {
        self.set_property(window, property, &Property::from_u32(type_, values))
    }
}

/// Convert an X error reply into `None`, keep connection failures as errors
fn trap<T>(result: std::result::Result<T, ReplyError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ReplyError::X11Error(e)) => {
            trace!("Trapped X11 error: {:?} (bad value 0x{:x})", e.error_kind, e.bad_value);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// [`XServer`] over a live x11rb connection
pub struct X11Display {
    conn: RustConnection,
    screen_num: usize,
    root: Window,
}

impl X11Display {
    /// Connect to `display` (or `$DISPLAY`)
    pub fn connect(display: Option<&str>) -> Result<Self> {
        let (conn, screen_num) = RustConnection::connect(display)?;
        let root = conn.setup().roots[screen_num].root;
        info!("Connected to X server, screen {} root 0x{:x}", screen_num, root);
        Ok(Self {
            conn,
            screen_num,
            root,
        })
    }

    pub fn connection(&self) -> &RustConnection {
        &self.conn
    }
}

impl XServer for X11Display {
    fn root(&self) -> Window {
        self.root
    }

    fn screen_number(&self) -> usize {
        self.screen_num
    }

    fn vendor(&self) -> String {
        String::from_utf8_lossy(&self.conn.setup().vendor).into_owned()
    }

    fn intern_atom(&self, name: &str) -> Result<Atom> {
        Ok(self.conn.intern_atom(false, name.as_bytes())?.reply()?.atom)
    }

    fn query_window_attributes(&self, window: Window) -> Result<Option<WindowAttributes>> {
        let Some(geometry) = trap(self.conn.get_geometry(window)?.reply())? else {
            return Ok(None);
        };
        let Some(tree) = trap(self.conn.query_tree(window)?.reply())? else {
            return Ok(None);
        };
        let Some(attrs) = trap(self.conn.get_window_attributes(window)?.reply())? else {
            return Ok(None);
        };
        Ok(Some(WindowAttributes {
            x: geometry.x as i32,
            y: geometry.y as i32,
            width: geometry.width as u32,
            height: geometry.height as u32,
            border_width: geometry.border_width as u32,
            parent: tree.parent,
            root: tree.root,
            mapped: attrs.map_state == MapState::VIEWABLE,
            override_redirect: attrs.override_redirect,
        }))
    }

    fn query_tree(&self, window: Window) -> Result<Option<QueryTree>> {
        Ok(trap(self.conn.query_tree(window)?.reply())?.map(|tree| QueryTree {
            root: tree.root,
            parent: tree.parent,
            children: tree.children,
        }))
    }

    fn get_property(&self, window: Window, property: Atom) -> Result<Option<Property>> {
        let reply = trap(
            self.conn
                .get_property(false, window, property, AtomEnum::ANY, 0, u32::MAX / 4)?
                .reply(),
        )?;
        Ok(reply
            .filter(|r| r.type_ != NONE)
            .map(|r| Property {
                type_: r.type_,
                format: r.format,
                value: r.value,
            }))
    }

    fn set_property(&self, window: Window, property: Atom, value: &Property) -> Result<()> {
        let unit = (value.format as usize / 8).max(1);
        self.conn.change_property(
            PropMode::REPLACE,
            window,
            property,
            value.type_,
            value.format,
            (value.value.len() / unit) as u32,
            &value.value,
        )?;
        Ok(())
    }

    fn delete_property(&self, window: Window, property: Atom) -> Result<()> {
        self.conn.delete_property(window, property)?;
        Ok(())
    }

    fn send_client_message(
        &self,
        destination: Window,
        window: Window,
        type_: Atom,
        data: [u32; 5],
    ) -> Result<()> {
        let event = ClientMessageEvent::new(32, window, type_, data);
        let mask = if destination == self.root {
            EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY
        } else {
            EventMask::NO_EVENT
        };
        self.conn.send_event(false, destination, mask, event)?;
        Ok(())
    }

    fn map_window(&self, window: Window) -> Result<()> {
        self.conn.map_window(window)?;
        Ok(())
    }

    fn unmap_window(&self, window: Window) -> Result<()> {
        self.conn.unmap_window(window)?;
        Ok(())
    }

    fn raise_window(&self, window: Window) -> Result<()> {
        self.conn.configure_window(
            window,
            &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
        )?;
        Ok(())
    }

    fn restack_windows(&self, order: &[Window]) -> Result<()> {
        for pair in order.windows(2) {
            self.conn.configure_window(
                pair[1],
                &ConfigureWindowAux::new()
                    .sibling(pair[0])
                    .stack_mode(StackMode::ABOVE),
            )?;
        }
        Ok(())
    }

    fn move_resize_window(&self, window: Window, bounds: Geometry) -> Result<()> {
        self.conn.configure_window(
            window,
            &ConfigureWindowAux::new()
                .x(bounds.x)
                .y(bounds.y)
                .width(bounds.width.max(1))
                .height(bounds.height.max(1)),
        )?;
        Ok(())
    }

    fn set_transient_for(&self, window: Window, target: Option<Window>) -> Result<()> {
        match target {
            Some(target) => {
                self.conn.change_property32(
                    PropMode::REPLACE,
                    window,
                    AtomEnum::WM_TRANSIENT_FOR,
                    AtomEnum::WINDOW,
                    &[target],
                )?;
            }
            None => {
                self.conn
                    .delete_property(window, Atom::from(AtomEnum::WM_TRANSIENT_FOR))?;
            }
        }
        Ok(())
    }

    fn get_selection_owner(&self, selection: Atom) -> Result<Window> {
        Ok(self.conn.get_selection_owner(selection)?.reply()?.owner)
    }

    fn substructure_redirect_owned(&self) -> Result<bool> {
        let current = self.conn.get_window_attributes(self.root)?.reply()?.your_event_mask;
        let probe = self.conn.change_window_attributes(
            self.root,
            &ChangeWindowAttributesAux::new()
                .event_mask(current | EventMask::SUBSTRUCTURE_REDIRECT),
        )?;
        match trap(probe.check())? {
            None => {
                debug!("SubstructureRedirect on root refused: a window manager is running");
                Ok(true)
            }
            Some(()) => {
                self.conn.change_window_attributes(
                    self.root,
                    &ChangeWindowAttributesAux::new().event_mask(current),
                )?;
                self.conn.flush()?;
                debug!("SubstructureRedirect on root was free: no window manager");
                Ok(false)
            }
        }
    }

    fn get_input_focus(&self) -> Result<Window> {
        Ok(self.conn.get_input_focus()?.reply()?.focus)
    }

    fn set_input_focus(&self, window: Window, time: u32) -> Result<()> {
        self.conn
            .set_input_focus(InputFocus::PARENT, window, time)?;
        Ok(())
    }

    fn grab_input(&self, window: Window) -> Result<bool> {
        let mask = EventMask::BUTTON_PRESS
            | EventMask::BUTTON_RELEASE
            | EventMask::ENTER_WINDOW
            | EventMask::LEAVE_WINDOW
            | EventMask::POINTER_MOTION
            | EventMask::BUTTON_MOTION;
        let pointer = self
            .conn
            .grab_pointer(
                true,
                window,
                mask,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                NONE,
                NONE,
                CURRENT_TIME,
            )?
            .reply()?;
        if pointer.status != GrabStatus::SUCCESS {
            debug!("Pointer grab failed: {:?}", pointer.status);
            self.conn.ungrab_pointer(CURRENT_TIME)?;
            return Ok(false);
        }
        let keyboard = self
            .conn
            .grab_keyboard(true, window, CURRENT_TIME, GrabMode::ASYNC, GrabMode::ASYNC)?
            .reply()?;
        if keyboard.status != GrabStatus::SUCCESS {
            debug!("Keyboard grab failed: {:?}", keyboard.status);
            self.conn.ungrab_pointer(CURRENT_TIME)?;
            self.conn.ungrab_keyboard(CURRENT_TIME)?;
            return Ok(false);
        }
        Ok(true)
    }

    fn ungrab_input(&self) -> Result<()> {
        self.conn.ungrab_pointer(CURRENT_TIME)?;
        self.conn.ungrab_keyboard(CURRENT_TIME)?;
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        self.conn.flush()?;
        // Any round trip works as a barrier
        self.conn.get_input_focus()?.reply()?;
        Ok(())
    }
}
