//! The box tree.
//!
//! Boxes live in a slotmap arena keyed by [`BoxId`]; parent and child links
//! are kept in secondary maps, so the arena is the single owner of every
//! node and a `BoxId` held elsewhere (event targets, the tab registry) can
//! never keep a removed box alive. Child order is paint and propagation
//! order.

use slotmap::{new_key_type, SecondaryMap, SlotMap};

use crate::behavior::{BehaviorChain, EventHandler};
use crate::clip::Clip;
use crate::geometry::{DeclaredRect, Margin, Rect};
use crate::style::{default_style, StyleMap, StyleValue, ACTIVE_VARIANT_KEYS};
use crate::text::TextEngine;

new_key_type! {
    /// Stable handle to a box in the tree.
    pub struct BoxId;
}

// ---------------------------------------------------------------------------
// Dirty flags
// ---------------------------------------------------------------------------

/// What parts of a box need repainting next draw pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyFlags {
    pub border: bool,
    pub background: bool,
    pub text: bool,
    pub all: bool,
}

impl DirtyFlags {
    /// Everything dirty — the state of a freshly created box.
    pub const ALL: DirtyFlags = DirtyFlags {
        border: false,
        background: false,
        text: false,
        all: true,
    };

    pub const CLEAN: DirtyFlags = DirtyFlags {
        border: false,
        background: false,
        text: false,
        all: false,
    };

    /// `all` implies every individual part.
    pub fn border(&self) -> bool {
        self.all || self.border
    }

    pub fn background(&self) -> bool {
        self.all || self.background
    }

    pub fn text(&self) -> bool {
        self.all || self.text
    }

    pub fn any(&self) -> bool {
        self.all || self.border || self.background || self.text
    }
}

impl Default for DirtyFlags {
    fn default() -> Self {
        Self::ALL
    }
}

/// One paintable part of a box, used to address dirty flags and draw hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawPart {
    Border,
    Background,
    Text,
    All,
}

// ---------------------------------------------------------------------------
// BoxNode
// ---------------------------------------------------------------------------

/// A single box: resolved style, geometry, text and behaviors.
///
/// Geometry fields are re-derived from `declared_rect`/`declared_margin`
/// on every resize; `rect` and `content_rect` are positioned relative to
/// the parent's content area.
pub struct BoxNode {
    pub name: String,
    /// Full slash path, e.g. `/root/menu/item`.
    pub path: String,
    pub style: StyleMap,

    pub declared_rect: DeclaredRect,
    pub declared_margin: Margin,
    pub rect: Rect,
    pub content_rect: Rect,

    pub z_index: i64,
    pub active: bool,
    pub visible: bool,
    pub scroll: (i32, i32),
    pub dirty: DirtyFlags,

    pub text: TextEngine,
    /// Detached while hooks run; see `Gui::run_chain`.
    pub(crate) behaviors: Option<BehaviorChain>,
    pub(crate) handler: Option<EventHandler>,

    /// Cached clip, refreshed after resizes and before each draw.
    pub clip: Clip,
    /// Cached global position of local (0, 0).
    pub origin: (i32, i32),

    /// Set once construction (styles, text, resize, children, hooks) has
    /// finished; public operations on a not-yet-ready box fail.
    pub ready: bool,
}

impl BoxNode {
    /// A bare node with the default style. Construction through `Gui`
    /// fills in everything else.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: String::new(),
            style: default_style(),
            declared_rect: DeclaredRect::fill(),
            declared_margin: Margin::ZERO,
            rect: Rect::EMPTY,
            content_rect: Rect::EMPTY,
            z_index: 0,
            active: false,
            visible: true,
            scroll: (0, 0),
            dirty: DirtyFlags::ALL,
            text: TextEngine::default(),
            behaviors: Some(BehaviorChain::new()),
            handler: None,
            clip: Clip::Offscreen,
            origin: (0, 0),
            ready: false,
        }
    }

    pub fn border(&self) -> bool {
        self.style.bool_or("border", false)
    }

    /// Declared margin, widened by one cell per side when bordered.
    pub fn margin(&self) -> Margin {
        if self.border() {
            self.declared_margin.widen(1)
        } else {
            self.declared_margin
        }
    }

    /// Style lookup that resolves `:active` variants transparently while
    /// the box is active.
    pub fn effective(&self, key: &str) -> Option<&StyleValue> {
        if self.active && ACTIVE_VARIANT_KEYS.contains(&key) {
            if let Some(v) = self.style.get(&format!("{key}:active")) {
                return Some(v);
            }
        }
        self.style.get(key)
    }

    pub fn effective_str(&self, key: &str, default: &str) -> String {
        self.effective(key)
            .and_then(StyleValue::as_str)
            .unwrap_or(default)
            .to_owned()
    }

    pub fn effective_char(&self, key: &str, default: char) -> char {
        self.effective(key)
            .and_then(StyleValue::as_char)
            .unwrap_or(default)
    }
}

// ---------------------------------------------------------------------------
// BoxSpec
// ---------------------------------------------------------------------------

/// Declarative description of a box subtree, consumed by construction.
#[derive(Default)]
pub struct BoxSpec {
    pub name: String,
    pub style: StyleMap,
    pub text: String,
    /// Behavior kinds (resolved through the registry) with their attributes.
    pub behaviors: Vec<(String, StyleMap)>,
    pub children: Vec<BoxSpec>,
    pub handler: Option<EventHandler>,
}

impl BoxSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn style(mut self, key: &str, value: impl Into<StyleValue>) -> Self {
        self.style.set(key, value);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn behavior(mut self, kind: impl Into<String>, attrs: StyleMap) -> Self {
        self.behaviors.push((kind.into(), attrs));
        self
    }

    pub fn child(mut self, child: BoxSpec) -> Self {
        self.children.push(child);
        self
    }

    /// Install a box-local event handler, run between the pre- and
    /// post-event hooks.
    pub fn on_event(mut self, handler: impl FnMut(&mut crate::gui::Gui, BoxId, &crate::event::Event) -> bool + 'static) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }
}

// ---------------------------------------------------------------------------
// BoxTree
// ---------------------------------------------------------------------------

/// Arena of boxes plus the parent/child relation.
#[derive(Default)]
pub struct BoxTree {
    nodes: SlotMap<BoxId, BoxNode>,
    children: SecondaryMap<BoxId, Vec<BoxId>>,
    parent: SecondaryMap<BoxId, BoxId>,
}

impl BoxTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, optionally attaching it to a parent (at the end of
    /// its child list).
    pub fn insert(&mut self, node: BoxNode, parent: Option<BoxId>) -> BoxId {
        let id = self.nodes.insert(node);
        self.children.insert(id, Vec::new());
        if let Some(parent_id) = parent {
            self.parent.insert(id, parent_id);
            if let Some(siblings) = self.children.get_mut(parent_id) {
                siblings.push(id);
            }
        }
        id
    }

    pub fn contains(&self, id: BoxId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: BoxId) -> Option<&BoxNode> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: BoxId) -> Option<&mut BoxNode> {
        self.nodes.get_mut(id)
    }

    pub fn parent(&self, id: BoxId) -> Option<BoxId> {
        self.parent.get(id).copied()
    }

    pub fn children(&self, id: BoxId) -> &[BoxId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Position of `id` among its siblings.
    pub fn sibling_index(&self, id: BoxId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pre-order walk of the subtree rooted at `id`, including `id`.
    pub fn walk_depth_first(&self, id: BoxId) -> Vec<BoxId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.contains(current) {
                continue;
            }
            out.push(current);
            for &child in self.children(current).iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Remove a subtree, descendants first. Returns the removed ids in
    /// removal order.
    pub fn remove(&mut self, id: BoxId) -> Vec<BoxId> {
        let mut order = self.walk_depth_first(id);
        order.reverse();

        if let Some(parent_id) = self.parent(id) {
            if let Some(siblings) = self.children.get_mut(parent_id) {
                siblings.retain(|&c| c != id);
            }
        }

        for &node in &order {
            self.nodes.remove(node);
            self.children.remove(node);
            self.parent.remove(node);
        }
        order
    }

    /// Resolve a slash path like `/root/menu/item` by walking child names
    /// from the given root.
    pub fn find_path(&self, root: BoxId, path: &str) -> Option<BoxId> {
        let names: Vec<&str> = path.split('/').filter(|n| !n.is_empty()).collect();
        let root_name = &self.get(root)?.name;
        if names.first() != Some(&root_name.as_str()) {
            return None;
        }

        let mut current = root;
        for name in &names[1..] {
            let next = self
                .children(current)
                .iter()
                .find(|&&c| self.get(c).map(|n| n.name == *name).unwrap_or(false))
                .copied();
            current = next?;
        }
        Some(current)
    }

    /// Detach a node's behavior chain so hooks can run with mutable access
    /// to the whole tree.
    pub(crate) fn take_behaviors(&mut self, id: BoxId) -> Option<BehaviorChain> {
        self.get_mut(id).and_then(|n| n.behaviors.take())
    }

    /// Put a detached chain back. A no-op if the node was removed while
    /// its hooks ran.
    pub(crate) fn restore_behaviors(&mut self, id: BoxId, chain: BehaviorChain) {
        if let Some(node) = self.get_mut(id) {
            node.behaviors = Some(chain);
        }
    }

    pub(crate) fn take_handler(&mut self, id: BoxId) -> Option<EventHandler> {
        self.get_mut(id).and_then(|n| n.handler.take())
    }

    pub(crate) fn restore_handler(&mut self, id: BoxId, handler: EventHandler) {
        if let Some(node) = self.get_mut(id) {
            node.handler = Some(handler);
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn named(tree: &mut BoxTree, name: &str, parent: Option<BoxId>) -> BoxId {
        let mut node = BoxNode::new(name);
        let parent_path = parent
            .and_then(|p| tree.get(p))
            .map(|n| n.path.clone())
            .unwrap_or_default();
        node.path = format!("{parent_path}/{name}");
        tree.insert(node, parent)
    }

    // ── structure ────────────────────────────────────────────────────

    #[test]
    fn insert_links_parent_and_children() {
        let mut tree = BoxTree::new();
        let root = named(&mut tree, "root", None);
        let a = named(&mut tree, "a", Some(root));
        let b = named(&mut tree, "b", Some(root));

        assert_eq!(tree.children(root), &[a, b]);
        assert_eq!(tree.parent(a), Some(root));
        assert_eq!(tree.parent(root), None);
        assert_eq!(tree.sibling_index(b), Some(1));
    }

    #[test]
    fn walk_is_preorder_in_child_order() {
        let mut tree = BoxTree::new();
        let root = named(&mut tree, "root", None);
        let a = named(&mut tree, "a", Some(root));
        let b = named(&mut tree, "b", Some(root));
        let a1 = named(&mut tree, "a1", Some(a));

        assert_eq!(tree.walk_depth_first(root), vec![root, a, a1, b]);
    }

    #[test]
    fn remove_takes_descendants_first() {
        let mut tree = BoxTree::new();
        let root = named(&mut tree, "root", None);
        let a = named(&mut tree, "a", Some(root));
        let a1 = named(&mut tree, "a1", Some(a));
        let a2 = named(&mut tree, "a2", Some(a));

        let removed = tree.remove(a);
        assert_eq!(removed, vec![a2, a1, a]);
        assert!(!tree.contains(a));
        assert!(!tree.contains(a1));
        assert!(tree.contains(root));
        assert!(tree.children(root).is_empty());
    }

    // ── paths ────────────────────────────────────────────────────────

    #[test]
    fn find_path_walks_names() {
        let mut tree = BoxTree::new();
        let root = named(&mut tree, "root", None);
        let menu = named(&mut tree, "menu", Some(root));
        let item = named(&mut tree, "item", Some(menu));

        assert_eq!(tree.find_path(root, "/root"), Some(root));
        assert_eq!(tree.find_path(root, "/root/menu/item"), Some(item));
        assert_eq!(tree.find_path(root, "/root/nope"), None);
        assert_eq!(tree.find_path(root, "/other"), None);
    }

    // ── node style resolution ────────────────────────────────────────

    #[test]
    fn effective_prefers_active_variant() {
        let mut node = BoxNode::new("x");
        node.style.set("border-style", "green");
        node.style.set("border-style:active", "red");

        assert_eq!(node.effective_str("border-style", ""), "green");
        node.active = true;
        assert_eq!(node.effective_str("border-style", ""), "red");
        // Keys outside the dynamic set are unaffected by activation.
        node.style.set("deactivate-key", "KEY_ESCAPE");
        assert_eq!(node.effective_str("deactivate-key", ""), "KEY_ESCAPE");
    }

    #[test]
    fn margin_widens_with_border() {
        let mut node = BoxNode::new("x");
        node.declared_margin = Margin::new(1, 0, 0, 2);
        assert_eq!(node.margin(), Margin::new(1, 0, 0, 2));
        node.style.set("border", true);
        assert_eq!(node.margin(), Margin::new(2, 1, 1, 3));
    }

    #[test]
    fn dirty_all_implies_parts() {
        let dirty = DirtyFlags::ALL;
        assert!(dirty.border() && dirty.background() && dirty.text());
        let clean = DirtyFlags::CLEAN;
        assert!(!clean.any());
    }
}
