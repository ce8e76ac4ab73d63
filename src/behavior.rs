//! Per-box behaviors.
//!
//! A behavior is a bundle of hooks threaded through a box's lifecycle:
//! creation, resize, every drawn cell, and event handling. Each box carries
//! an ordered chain of them; hook returns are OR-ed together and a truthy
//! event hook marks the event handled. While a hook runs, the chain is
//! detached from its node so the hook may freely mutate the tree through
//! the [`Gui`] it receives.
//!
//! Behavior kinds are declared by name in a [`BoxSpec`](crate::tree::BoxSpec)
//! and resolved once at construction through a [`BehaviorRegistry`].

use std::collections::HashMap;

use crate::event::Event;
use crate::gui::Gui;
use crate::style::StyleMap;
use crate::tree::BoxId;

/// A box-local event handler, run between the pre- and post-event hooks.
pub type EventHandler = Box<dyn FnMut(&mut Gui, BoxId, &Event) -> bool>;

/// The cell a draw hook is looking at.
#[derive(Debug, Clone, Copy)]
pub struct DrawParams {
    pub x: i32,
    pub y: i32,
    pub ch: char,
}

/// Hook bundle attached to a box.
///
/// All hooks default to doing nothing. Returns participate in the chain's
/// OR-aggregation; only the event hooks' results affect propagation.
#[allow(unused_variables)]
pub trait Behavior {
    fn pre_create(&mut self, gui: &mut Gui, id: BoxId) -> bool {
        false
    }

    fn post_create(&mut self, gui: &mut Gui, id: BoxId) -> bool {
        false
    }

    fn pre_resize(&mut self, gui: &mut Gui, id: BoxId) -> bool {
        false
    }

    fn post_resize(&mut self, gui: &mut Gui, id: BoxId) -> bool {
        false
    }

    fn setup_draw(&mut self, gui: &mut Gui, id: BoxId) -> bool {
        false
    }

    fn cleanup_draw(&mut self, gui: &mut Gui, id: BoxId) -> bool {
        false
    }

    fn pre_draw_border(&mut self, gui: &mut Gui, id: BoxId, params: &DrawParams) -> bool {
        false
    }

    fn post_draw_border(&mut self, gui: &mut Gui, id: BoxId, params: &DrawParams) -> bool {
        false
    }

    fn pre_draw_background(&mut self, gui: &mut Gui, id: BoxId, params: &DrawParams) -> bool {
        false
    }

    fn post_draw_background(&mut self, gui: &mut Gui, id: BoxId, params: &DrawParams) -> bool {
        false
    }

    fn pre_draw_text(&mut self, gui: &mut Gui, id: BoxId, params: &DrawParams) -> bool {
        false
    }

    fn post_draw_text(&mut self, gui: &mut Gui, id: BoxId, params: &DrawParams) -> bool {
        false
    }

    fn pre_event(&mut self, gui: &mut Gui, id: BoxId, ev: &Event) -> bool {
        false
    }

    fn post_event(&mut self, gui: &mut Gui, id: BoxId, ev: &Event) -> bool {
        false
    }
}

/// Ordered behavior chain of one box.
#[derive(Default)]
pub struct BehaviorChain {
    items: Vec<Box<dyn Behavior>>,
}

impl BehaviorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, behavior: Box<dyn Behavior>) {
        self.items.push(behavior);
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Behavior>> {
        self.items.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Factory building one behavior instance from its declared attributes.
pub type BehaviorFactory = fn(&StyleMap) -> Box<dyn Behavior>;

/// Maps behavior kind names to factories.
///
/// Box specs refer to behaviors by kind string; construction resolves them
/// here. Unknown kinds are silently skipped (the spec may target an
/// application that registers more kinds than this binary).
#[derive(Default)]
pub struct BehaviorRegistry {
    factories: HashMap<String, BehaviorFactory>,
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: impl Into<String>, factory: BehaviorFactory) {
        self.factories.insert(kind.into(), factory);
    }

    pub fn build(&self, kind: &str, attrs: &StyleMap) -> Option<Box<dyn Behavior>> {
        self.factories.get(kind).map(|factory| factory(attrs))
    }
}

/// The behavior every box starts with.
///
/// Activates the box on its configured activate-key; while active, handles
/// the scroll keys, the deactivate-key, and sibling navigation.
pub struct DefaultBehavior;

impl Behavior for DefaultBehavior {
    fn pre_event(&mut self, gui: &mut Gui, id: BoxId, ev: &Event) -> bool {
        let matches = gui
            .tree()
            .get(id)
            .and_then(|node| node.style.get("activate-key"))
            .and_then(|v| v.as_str())
            .map(|key| ev.is(key))
            .unwrap_or(false);
        if matches {
            gui.activate(id);
            return true;
        }
        false
    }

    fn post_event(&mut self, gui: &mut Gui, id: BoxId, ev: &Event) -> bool {
        // Snapshot the key bindings so the tree borrow ends before any
        // mutation below.
        let keys = match gui.tree().get(id) {
            Some(node) if node.active => [
                node.style.str_or("scroll-up-key", "").to_owned(),
                node.style.str_or("scroll-down-key", "").to_owned(),
                node.style.str_or("deactivate-key", "").to_owned(),
                node.style.str_or("navigate-forwards", "").to_owned(),
                node.style.str_or("navigate-backwards", "").to_owned(),
            ],
            _ => return false,
        };
        let [up, down, deactivate, forwards, backwards] = keys;

        if !up.is_empty() && ev.is(&up) {
            gui.scroll(id, (0, -1));
            true
        } else if !down.is_empty() && ev.is(&down) {
            gui.scroll(id, (0, 1));
            true
        } else if !deactivate.is_empty() && ev.is(&deactivate) {
            gui.deactivate(id);
            true
        } else if !forwards.is_empty() && ev.is(&forwards) {
            gui.activate_sibling(id, false);
            true
        } else if !backwards.is_empty() && ev.is(&backwards) {
            gui.activate_sibling(id, true);
            true
        } else {
            false
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
