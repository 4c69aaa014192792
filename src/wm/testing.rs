//! In-memory X server for tests
//!
//! Models just enough of the window tree, properties and selections for the
//! negotiation code, and records every mutating request so tests can assert
//! on what would have gone over the wire.

use std::cell::RefCell;
use std::collections::HashMap;

use x11rb::protocol::xproto::{Atom, Window};

use crate::error::Result;
use crate::shared::Geometry;
use crate::wm::display::{Property, QueryTree, WindowAttributes, XServer};

pub const ROOT: Window = 1;
const WM_TRANSIENT_FOR: Atom = 68;
const WINDOW: Atom = 33;

/// A request the code under test issued
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    SetProperty(Window, Atom),
    DeleteProperty(Window, Atom),
    ClientMessage {
        destination: Window,
        window: Window,
        type_: Atom,
        data: [u32; 5],
    },
    Map(Window),
    Unmap(Window),
    Raise(Window),
    Restack(Vec<Window>),
    MoveResize(Window, Geometry),
    SetTransientFor(Window, Option<Window>),
    SetInputFocus(Window),
    GrabInput(Window),
    UngrabInput,
    Sync,
}

#[derive(Debug, Clone, Default)]
struct FakeWindow {
    parent: Window,
    children: Vec<Window>,
    geometry: Geometry,
    border_width: u32,
    mapped: bool,
    properties: HashMap<Atom, Property>,
}

#[derive(Debug)]
struct FakeState {
    next_window: Window,
    next_atom: Atom,
    atoms: HashMap<String, Atom>,
    windows: HashMap<Window, FakeWindow>,
    selections: HashMap<Atom, Window>,
    vendor: String,
    redirect_owned: bool,
    focus: Window,
    grab_succeeds: bool,
    requests: Vec<Request>,
}

/// Fake [`XServer`]
#[derive(Debug)]
pub struct FakeServer {
    state: RefCell<FakeState>,
}

impl Default for FakeServer {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeServer {
    /// A server with an empty root and a window manager present
    pub fn new() -> Self {
        let mut windows = HashMap::new();
        windows.insert(
            ROOT,
            FakeWindow {
                geometry: Geometry::new(0, 0, 1920, 1080),
                mapped: true,
                ..Default::default()
            },
        );
        Self {
            state: RefCell::new(FakeState {
                next_window: 0x200,
                next_atom: 0x100,
                atoms: HashMap::new(),
                windows,
                selections: HashMap::new(),
                vendor: "The X.Org Foundation".to_string(),
                redirect_owned: true,
                focus: ROOT,
                grab_succeeds: true,
                requests: Vec::new(),
            }),
        }
    }

    pub fn set_vendor(&self, vendor: &str) {
        self.state.borrow_mut().vendor = vendor.to_string();
    }

    pub fn set_redirect_owned(&self, owned: bool) {
        self.state.borrow_mut().redirect_owned = owned;
    }

    pub fn set_grab_succeeds(&self, succeeds: bool) {
        self.state.borrow_mut().grab_succeeds = succeeds;
    }

    pub fn set_selection_owner(&self, selection: Atom, owner: Window) {
        self.state.borrow_mut().selections.insert(selection, owner);
    }

    pub fn set_focus(&self, window: Window) {
        self.state.borrow_mut().focus = window;
    }

    pub fn atom(&self, name: &str) -> Atom {
        self.intern(name)
    }

    fn intern(&self, name: &str) -> Atom {
        let mut state = self.state.borrow_mut();
        if let Some(atom) = state.atoms.get(name) {
            return *atom;
        }
        let atom = state.next_atom;
        state.next_atom += 1;
        state.atoms.insert(name.to_string(), atom);
        atom
    }

    /// Create a window on top of `parent`'s children
    pub fn create_window(&self, parent: Window, x: i32, y: i32, width: u32, height: u32) -> Window {
        let mut state = self.state.borrow_mut();
        let id = state.next_window;
        state.next_window += 1;
        state.windows.insert(
            id,
            FakeWindow {
                parent,
                geometry: Geometry::new(x, y, width, height),
                ..Default::default()
            },
        );
        if let Some(p) = state.windows.get_mut(&parent) {
            p.children.push(id);
        }
        id
    }

    /// Move `window` under `parent` at `(x, y)`, as a reparenting WM would
    pub fn reparent(&self, window: Window, parent: Window, x: i32, y: i32) {
        let mut state = self.state.borrow_mut();
        if let Some(old) = state.windows.get(&window).map(|w| w.parent) {
            if let Some(o) = state.windows.get_mut(&old) {
                o.children.retain(|c| *c != window);
            }
        }
        if let Some(p) = state.windows.get_mut(&parent) {
            p.children.push(window);
        }
        if let Some(w) = state.windows.get_mut(&window) {
            w.parent = parent;
            w.geometry.x = x;
            w.geometry.y = y;
        }
    }


    pub fn set_geometry(&self, window: Window, geometry: Geometry) {
        if let Some(w) = self.state.borrow_mut().windows.get_mut(&window) {
            w.geometry = geometry;
        }
    }

    pub fn set_border(&self, window: Window, border_width: u32) {
        if let Some(w) = self.state.borrow_mut().windows.get_mut(&window) {
            w.border_width = border_width;
        }
    }

    pub fn set_mapped(&self, window: Window, mapped: bool) {
        if let Some(w) = self.state.borrow_mut().windows.get_mut(&window) {
            w.mapped = mapped;
        }
    }



    pub fn set_prop32(&self, window: Window, property: Atom, type_: Atom, values: &[u32]) {
        self.put_property(window, property, Property::from_u32(type_, values));
    }

    pub fn set_prop_string(&self, window: Window, property: Atom, text: &str) {
        let type_ = self.intern("UTF8_STRING");
        self.put_property(window, property, Property::from_text(type_, text));
    }

    fn put_property(&self, window: Window, property: Atom, value: Property) {
        if let Some(w) = self.state.borrow_mut().windows.get_mut(&window) {
            w.properties.insert(property, value);
        }
    }

    pub fn prop32(&self, window: Window, property: Atom) -> Option<Vec<u32>> {
        self.state
            .borrow()
            .windows
            .get(&window)
            .and_then(|w| w.properties.get(&property))
            .and_then(|p| p.value32())
    }

    /// Current `WM_TRANSIENT_FOR` target of `window`
    pub fn transient_for(&self, window: Window) -> Option<Window> {
        self.prop32(window, WM_TRANSIENT_FOR)
            .and_then(|v| v.first().copied())
    }

    pub fn requests(&self) -> Vec<Request> {
        self.state.borrow().requests.clone()
    }

    pub fn clear_requests(&self) {
        self.state.borrow_mut().requests.clear();
    }

    /// `(destination, window, data)` of every client message of `type_`
    pub fn client_messages(&self, type_: Atom) -> Vec<(Window, Window, [u32; 5])> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                Request::ClientMessage {
                    destination,
                    window,
                    type_: t,
                    data,
                } if t == type_ => Some((destination, window, data)),
                _ => None,
            })
            .collect()
    }

    fn log(&self, request: Request) {
        self.state.borrow_mut().requests.push(request);
    }

    fn restack_after(&self, below: Window, window: Window) {
        let mut state = self.state.borrow_mut();
        let Some(parent) = state.windows.get(&window).map(|w| w.parent) else {
            return;
        };
        if state.windows.get(&below).map(|w| w.parent) != Some(parent) {
            return;
        }
        if let Some(p) = state.windows.get_mut(&parent) {
            p.children.retain(|c| *c != window);
            if let Some(pos) = p.children.iter().position(|c| *c == below) {
                p.children.insert(pos + 1, window);
            } else {
                p.children.push(window);
            }
        }
    }
}

impl XServer for FakeServer {
    fn root(&self) -> Window {
        ROOT
    }

    fn screen_number(&self) -> usize {
        0
    }

    fn vendor(&self) -> String {
        self.state.borrow().vendor.clone()
    }

    fn intern_atom(&self, name: &str) -> Result<Atom> {
        Ok(self.intern(name))
    }

    fn query_window_attributes(&self, window: Window) -> Result<Option<WindowAttributes>> {
        let state = self.state.borrow();
        Ok(state.windows.get(&window).map(|w| WindowAttributes {
            x: w.geometry.x,
            y: w.geometry.y,
            width: w.geometry.width,
            height: w.geometry.height,
            border_width: w.border_width,
            parent: w.parent,
            root: ROOT,
            mapped: w.mapped,
            override_redirect: false,
        }))
    }

    fn query_tree(&self, window: Window) -> Result<Option<QueryTree>> {
        let state = self.state.borrow();
        Ok(state.windows.get(&window).map(|w| QueryTree {
            root: ROOT,
            parent: w.parent,
            children: w.children.clone(),
        }))
    }

    fn get_property(&self, window: Window, property: Atom) -> Result<Option<Property>> {
        let state = self.state.borrow();
        Ok(state
            .windows
            .get(&window)
            .and_then(|w| w.properties.get(&property))
            .cloned())
    }

    fn set_property(&self, window: Window, property: Atom, value: &Property) -> Result<()> {
        self.log(Request::SetProperty(window, property));
        self.put_property(window, property, value.clone());
        Ok(())
    }

    fn delete_property(&self, window: Window, property: Atom) -> Result<()> {
        self.log(Request::DeleteProperty(window, property));
        if let Some(w) = self.state.borrow_mut().windows.get_mut(&window) {
            w.properties.remove(&property);
        }
        Ok(())
    }

    fn send_client_message(
        &self,
        destination: Window,
        window: Window,
        type_: Atom,
        data: [u32; 5],
    ) -> Result<()> {
        self.log(Request::ClientMessage {
            destination,
            window,
            type_,
            data,
        });
        Ok(())
    }

    fn map_window(&self, window: Window) -> Result<()> {
        self.log(Request::Map(window));
        self.set_mapped(window, true);
        Ok(())
    }

    fn unmap_window(&self, window: Window) -> Result<()> {
        self.log(Request::Unmap(window));
        self.set_mapped(window, false);
        Ok(())
    }

    fn raise_window(&self, window: Window) -> Result<()> {
        self.log(Request::Raise(window));
        let mut state = self.state.borrow_mut();
        let Some(parent) = state.windows.get(&window).map(|w| w.parent) else {
            return Ok(());
        };
        if let Some(p) = state.windows.get_mut(&parent) {
            p.children.retain(|c| *c != window);
            p.children.push(window);
        }
        Ok(())
    }

    fn restack_windows(&self, order: &[Window]) -> Result<()> {
        self.log(Request::Restack(order.to_vec()));
        for pair in order.windows(2) {
            self.restack_after(pair[0], pair[1]);
        }
        Ok(())
    }

    fn move_resize_window(&self, window: Window, bounds: Geometry) -> Result<()> {
        self.log(Request::MoveResize(window, bounds));
        self.set_geometry(window, bounds);
        Ok(())
    }

    fn set_transient_for(&self, window: Window, target: Option<Window>) -> Result<()> {
        self.log(Request::SetTransientFor(window, target));
        let mut state = self.state.borrow_mut();
        if let Some(w) = state.windows.get_mut(&window) {
            match target {
                Some(t) => {
                    w.properties
                        .insert(WM_TRANSIENT_FOR, Property::from_u32(WINDOW, &[t]));
                }
                None => {
                    w.properties.remove(&WM_TRANSIENT_FOR);
                }
            }
        }
        Ok(())
    }

    fn get_selection_owner(&self, selection: Atom) -> Result<Window> {
        Ok(self
            .state
            .borrow()
            .selections
            .get(&selection)
            .copied()
            .unwrap_or(0))
    }

    fn substructure_redirect_owned(&self) -> Result<bool> {
        Ok(self.state.borrow().redirect_owned)
    }

    fn get_input_focus(&self) -> Result<Window> {
        Ok(self.state.borrow().focus)
    }

    fn set_input_focus(&self, window: Window, _time: u32) -> Result<()> {
        self.log(Request::SetInputFocus(window));
        Ok(())
    }

    fn grab_input(&self, window: Window) -> Result<bool> {
        self.log(Request::GrabInput(window));
        Ok(self.state.borrow().grab_succeeds)
    }

    fn ungrab_input(&self) -> Result<()> {
        self.log(Request::UngrabInput);
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        self.log(Request::Sync);
        Ok(())
    }
}
