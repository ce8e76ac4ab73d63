//! The GUI engine: tree construction, activation, drawing and the run loop.
//!
//! `Gui` owns the box tree, the frame buffer, the event queue and the tab
//! registry. Construction consumes a [`BoxSpec`] subtree; afterwards every
//! mutation flows through events and the dirty flags, and a draw pass
//! repaints exactly the parts marked dirty, in ascending z order.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::behavior::{Behavior, BehaviorChain, BehaviorRegistry, DefaultBehavior, DrawParams};
use crate::buffer::FrameBuffer;
use crate::clip;
use crate::error::{Error, Result};
use crate::event::{names, Event, EventQueue, PayloadValue};
use crate::geometry::{DeclaredRect, Dim};
use crate::layout;
use crate::schedule::Scheduler;
use crate::style::{backfill_active_variants, default_style, Z_INHERIT};
use crate::terminal::{PolledInput, Terminal, TerminalGuard};
use crate::text::{TextConfig, TextEngine, TextOp};
use crate::tree::{BoxId, BoxNode, BoxSpec, BoxTree, DirtyFlags, DrawPart};

const ULCORNER: char = '┌';
const URCORNER: char = '┐';
const LLCORNER: char = '└';
const LRCORNER: char = '┘';
const VLINE: char = '│';
const HLINE: char = '─';

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Run-loop timing knobs.
#[derive(Debug, Clone, Copy)]
pub struct GuiConfig {
    /// How long one loop iteration waits for terminal input.
    pub key_timeout: Duration,
    /// Sleep between iterations when nothing was handled.
    pub loop_wait: Duration,
}

impl Default for GuiConfig {
    fn default() -> Self {
        Self {
            key_timeout: Duration::from_millis(10),
            loop_wait: Duration::from_millis(10),
        }
    }
}

// ---------------------------------------------------------------------------
// Tab registry
// ---------------------------------------------------------------------------

/// Maps tab indices to boxes for Tab/Shift-Tab cycling.
struct TabRegistry {
    entries: BTreeMap<i64, BoxId>,
    max_index: i64,
}

impl TabRegistry {
    fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            max_index: -1,
        }
    }

    /// Register a box under its declared index, or auto-assign the next
    /// free one when the declared index is negative. Returns the index
    /// actually used.
    fn register(&mut self, declared: i64, id: BoxId) -> i64 {
        if declared > -1 {
            self.entries.insert(declared, id);
            self.max_index = self.max_index.max(declared);
            declared
        } else {
            self.max_index += 1;
            self.entries.insert(self.max_index, id);
            self.max_index
        }
    }

    fn unregister(&mut self, id: BoxId) {
        self.entries.retain(|_, v| *v != id);
    }
}

// ---------------------------------------------------------------------------
// Gui
// ---------------------------------------------------------------------------

/// The engine. One instance per screen.
pub struct Gui {
    tree: BoxTree,
    buffer: FrameBuffer,
    queue: EventQueue,
    registry: BehaviorRegistry,
    scheduler: Scheduler,
    config: GuiConfig,
    tabs: TabRegistry,
    root: BoxId,
    active: Option<BoxId>,
    driver: Option<Terminal>,
    terminate: bool,
}

impl Gui {
    /// Build a GUI sized to the current terminal and attach the output
    /// driver. The spec becomes the first child of an internal root box
    /// that always spans the whole screen.
    pub fn new(spec: BoxSpec) -> Result<Self> {
        Self::with_config(spec, GuiConfig::default(), BehaviorRegistry::new())
    }

    pub fn with_config(spec: BoxSpec, config: GuiConfig, registry: BehaviorRegistry) -> Result<Self> {
        let (width, height) = Terminal::size()?;
        let mut gui = Self::build(spec, width, height, config, registry);
        gui.driver = Some(Terminal::new());
        Ok(gui)
    }

    /// Build a GUI against an in-memory frame buffer only. No terminal is
    /// touched; drive it with [`queue_event`](Self::queue_event),
    /// [`process_events`](Self::process_events) and [`draw`](Self::draw).
    pub fn new_headless(spec: BoxSpec, width: i32, height: i32) -> Self {
        Self::build(spec, width, height, GuiConfig::default(), BehaviorRegistry::new())
    }

    pub fn new_headless_with(
        spec: BoxSpec,
        width: i32,
        height: i32,
        registry: BehaviorRegistry,
    ) -> Self {
        Self::build(spec, width, height, GuiConfig::default(), registry)
    }

    fn build(
        spec: BoxSpec,
        width: i32,
        height: i32,
        config: GuiConfig,
        registry: BehaviorRegistry,
    ) -> Self {
        let mut tree = BoxTree::new();
        let mut root = BoxNode::new("root");
        root.path = "/root".to_owned();
        root.declared_rect = DeclaredRect::new(
            Dim::Abs(0),
            Dim::Abs(0),
            Dim::Abs(width),
            Dim::Abs(height),
        );
        root.style = default_style();
        root.style.set("z-index", 0i64);
        root.behaviors = Some(BehaviorChain::new());
        root.ready = true;
        let root_id = tree.insert(root, None);

        let mut gui = Self {
            tree,
            buffer: FrameBuffer::new(width, height),
            queue: EventQueue::new(),
            registry,
            scheduler: Scheduler::new(),
            config,
            tabs: TabRegistry::new(),
            root: root_id,
            active: None,
            driver: None,
            terminate: false,
        };
        layout::resolve_rect(&mut gui.tree, root_id);
        clip::recalculate(&mut gui.tree, root_id);
        gui.build_box(spec, root_id);
        gui.resize_all();
        if gui.active.is_none() {
            if let Some(&first) = gui.tree.children(root_id).first() {
                gui.activate(first);
            }
        }
        gui
    }

    // -- accessors ----------------------------------------------------------

    pub fn tree(&self) -> &BoxTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut BoxTree {
        &mut self.tree
    }

    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    pub fn root(&self) -> BoxId {
        self.root
    }

    pub fn active(&self) -> Option<BoxId> {
        self.active
    }

    pub fn config(&self) -> &GuiConfig {
        &self.config
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// Resolve a slash path like `/root/menu/item`.
    pub fn find(&self, path: &str) -> Option<BoxId> {
        self.tree.find_path(self.root, path)
    }

    /// Ask the run loop to stop after the current iteration.
    pub fn exit(&mut self) {
        self.terminate = true;
    }

    // -- construction -------------------------------------------------------

    /// Add a box subtree under an existing parent.
    pub fn add_box(&mut self, spec: BoxSpec, parent: BoxId) -> Result<BoxId> {
        if !self.tree.contains(parent) {
            return Err(Error::NotReady("unknown parent box".to_owned()));
        }
        let id = self.build_box(spec, parent);
        self.set_dirty(parent, DrawPart::All, true);
        Ok(id)
    }

    fn build_box(&mut self, spec: BoxSpec, parent: BoxId) -> BoxId {
        let BoxSpec {
            name,
            style: overlay,
            text,
            behaviors,
            children,
            handler,
        } = spec;

        let mut style = default_style();
        style.merge(overlay);
        backfill_active_variants(&mut style);

        let name = if name.is_empty() {
            format!("child:{}", self.tree.children(parent).len())
        } else {
            name
        };
        let parent_path = self
            .tree
            .get(parent)
            .map(|n| n.path.clone())
            .unwrap_or_default();
        let parent_z = self.tree.get(parent).map(|n| n.z_index).unwrap_or(0);

        let mut node = BoxNode::new(&name);
        node.path = format!("{parent_path}/{name}");
        if let Some(rect) = style.get("rect").and_then(|v| v.as_rect()) {
            node.declared_rect = *rect;
        }
        if let Some(margin) = style.get("margin").and_then(|v| v.as_margin()) {
            node.declared_margin = *margin;
        }
        let declared_z = style.int_or("z-index", Z_INHERIT);
        node.z_index = if declared_z == Z_INHERIT {
            parent_z + 1
        } else {
            declared_z
        };
        style.set("z-index", node.z_index);
        node.visible = style.bool_or("visible", true);
        if let Some(scroll) = style.get("scroll-pos").and_then(|v| v.as_pair()) {
            node.scroll = scroll;
        }
        let wants_active = style.bool_or("active", false);
        let declared_tab = style.int_or("tab-index", -1);

        node.text = TextEngine::new(&text, TextConfig::from_style(&style));
        node.handler = handler;

        let mut chain = BehaviorChain::new();
        chain.push(Box::new(DefaultBehavior));
        for (kind, attrs) in &behaviors {
            match self.registry.build(kind, attrs) {
                Some(behavior) => chain.push(behavior),
                None => warn!(kind, "skipping unregistered behavior kind"),
            }
        }
        node.behaviors = Some(chain);
        node.style = style;

        let id = self.tree.insert(node, Some(parent));

        let assigned = self.tabs.register(declared_tab, id);
        if let Some(node) = self.tree.get_mut(id) {
            node.style.set("tab-index", assigned);
        }
        if wants_active {
            self.activate(id);
        }

        self.run_chain(id, |b, g, i| b.pre_create(g, i));
        self.resize_box(id);

        for child in children {
            self.build_box(child, id);
        }

        self.run_chain(id, |b, g, i| b.post_create(g, i));
        if let Some(node) = self.tree.get_mut(id) {
            node.ready = true;
        }
        if let Some(node) = self.tree.get(id) {
            debug!(path = %node.path, z = node.z_index, "box created");
        }
        id
    }

    /// Remove a box and its descendants. The root cannot be removed.
    pub fn remove_box(&mut self, id: BoxId) {
        if id == self.root || !self.tree.contains(id) {
            return;
        }
        let parent = self.tree.parent(id);
        for removed in self.tree.remove(id) {
            self.tabs.unregister(removed);
            if self.active == Some(removed) {
                self.active = None;
            }
        }
        if let Some(parent) = parent {
            self.set_dirty(parent, DrawPart::All, true);
        }
    }

    // -- behavior plumbing --------------------------------------------------

    /// Run one hook across a box's behavior chain, OR-ing the results.
    ///
    /// The chain is detached from the node while hooks run so they can
    /// mutate the tree, and restored afterwards (a no-op if a hook removed
    /// the box).
    fn run_chain<F>(&mut self, id: BoxId, mut hook: F) -> bool
    where
        F: FnMut(&mut dyn Behavior, &mut Gui, BoxId) -> bool,
    {
        let mut chain = match self.tree.take_behaviors(id) {
            Some(chain) => chain,
            None => return false,
        };
        let mut handled = false;
        for behavior in chain.iter_mut() {
            handled |= hook(behavior.as_mut(), self, id);
        }
        self.tree.restore_behaviors(id, chain);
        handled
    }

    // -- activation ---------------------------------------------------------

    /// Make a box the single active one. Deactivates the previous holder
    /// first, so a `DEACTIVATE` event always precedes the `ACTIVATE`.
    pub fn activate(&mut self, id: BoxId) {
        if self.active == Some(id) || !self.tree.contains(id) {
            return;
        }
        if let Some(previous) = self.active {
            self.deactivate(previous);
        }
        if let Some(node) = self.tree.get_mut(id) {
            node.active = true;
            node.style.set("active", true);
        }
        self.set_dirty(id, DrawPart::All, true);
        self.active = Some(id);
        self.queue.push(Event::new(names::ACTIVATE).from_box(id).to_box(id));
    }

    pub fn deactivate(&mut self, id: BoxId) {
        if self.active != Some(id) {
            return;
        }
        if let Some(node) = self.tree.get_mut(id) {
            node.active = false;
            node.style.set("active", false);
        }
        self.set_dirty(id, DrawPart::All, true);
        self.active = None;
        self.queue
            .push(Event::new(names::DEACTIVATE).from_box(id).to_box(id));
    }

    /// Activate the next or previous sibling, wrapping around.
    pub fn activate_sibling(&mut self, id: BoxId, backwards: bool) {
        let parent = match self.tree.parent(id) {
            Some(p) => p,
            None => return,
        };
        let count = self.tree.children(parent).len() as isize;
        let ind = match self.tree.sibling_index(id) {
            Some(i) => i as isize,
            None => return,
        };
        if count == 0 {
            return;
        }
        let step: isize = if backwards { -1 } else { 1 };
        let next = (ind + step).rem_euclid(count) as usize;
        let sibling = self.tree.children(parent)[next];
        if sibling != id {
            self.activate(sibling);
        }
    }

    /// Cycle activation through the tab registry (Tab / Shift-Tab).
    pub fn activate_next(&mut self, backwards: bool) {
        if self.tabs.entries.is_empty() {
            return;
        }
        let active_tab = self
            .active
            .and_then(|id| self.tree.get(id))
            .map(|n| n.style.int_or("tab-index", 0))
            .unwrap_or(0);

        let mut order: Vec<i64> = self.tabs.entries.keys().copied().collect();
        if backwards {
            order.reverse();
        }
        let count = order.len();
        let tab = match order.iter().position(|&t| t == active_tab) {
            Some(ind) if ind + 1 < count => order[ind + 1],
            Some(_) => order[0],
            None => {
                // The active box never registered this index; land on the
                // first entry past it in cycle order.
                let mut tab = order[count - 1];
                for &candidate in &order {
                    let past = if backwards {
                        candidate < active_tab
                    } else {
                        candidate > active_tab
                    };
                    if past {
                        tab = candidate;
                        break;
                    }
                }
                tab
            }
        };

        let chosen = if tab > -1 && tab != active_tab { tab } else { order[0] };
        match self.tabs.entries.get(&chosen).copied() {
            Some(id) if self.tree.contains(id) => self.activate(id),
            _ => {
                if let Some(&first) = self.tree.children(self.root).first() {
                    self.activate(first);
                }
            }
        }
    }

    // -- visibility and scrolling -------------------------------------------

    pub fn hide(&mut self, id: BoxId) {
        self.set_visible(id, false, names::HIDE);
    }

    pub fn show(&mut self, id: BoxId) {
        self.set_visible(id, true, names::SHOW);
    }

    fn set_visible(&mut self, id: BoxId, visible: bool, event_name: &str) {
        match self.tree.get_mut(id) {
            Some(node) => {
                node.visible = visible;
                node.style.set("visible", visible);
            }
            None => return,
        }
        // The parent repaints the vacated (or newly covered) cells.
        let repaint = self.tree.parent(id).unwrap_or(id);
        self.set_dirty(repaint, DrawPart::All, true);
        self.queue.push(Event::new(event_name).from_box(id).to_box(id));
    }

    /// Scroll a box's contents by a delta, per-axis gated by the
    /// `scroll-x` / `scroll-y` styles.
    pub fn scroll(&mut self, id: BoxId, delta: (i32, i32)) {
        match self.tree.get_mut(id) {
            Some(node) => {
                if node.style.bool_or("scroll-x", true) {
                    node.scroll.0 += delta.0;
                }
                if node.style.bool_or("scroll-y", true) {
                    node.scroll.1 += delta.1;
                }
                let scroll = node.scroll;
                node.style.set("scroll-pos", scroll);
            }
            None => return,
        }
        self.set_dirty(id, DrawPart::All, true);
    }

    // -- text ---------------------------------------------------------------

    fn ready_node_mut(&mut self, id: BoxId) -> Result<&mut BoxNode> {
        match self.tree.get_mut(id) {
            Some(node) if node.ready => Ok(node),
            Some(node) => Err(Error::NotReady(node.path.clone())),
            None => Err(Error::NotReady("unknown box".to_owned())),
        }
    }

    pub fn set_text(&mut self, id: BoxId, text: &str) -> Result<()> {
        self.ready_node_mut(id)?.text.set(text);
        self.set_dirty(id, DrawPart::Background, false);
        self.set_dirty(id, DrawPart::Text, false);
        Ok(())
    }

    pub fn get_text(&self, id: BoxId, raw: bool) -> Result<String> {
        match self.tree.get(id) {
            Some(node) if node.ready => Ok(node.text.get(raw)),
            Some(node) => Err(Error::NotReady(node.path.clone())),
            None => Err(Error::NotReady("unknown box".to_owned())),
        }
    }

    /// Splice or delete text at an explicit position.
    pub fn modify_text(
        &mut self,
        id: BoxId,
        op: TextOp<'_>,
        pos: usize,
        overwrite: bool,
        mv: Option<isize>,
    ) -> Result<()> {
        self.ready_node_mut(id)?.text.modify(op, pos, overwrite, mv);
        self.set_dirty(id, DrawPart::Background, false);
        self.set_dirty(id, DrawPart::Text, false);
        Ok(())
    }

    /// Splice or delete text at the cursor.
    pub fn modify_text_by_cursor(
        &mut self,
        id: BoxId,
        op: TextOp<'_>,
        overwrite: bool,
        mv: Option<isize>,
    ) -> Result<()> {
        self.ready_node_mut(id)?.text.modify_by_cursor(op, overwrite, mv);
        self.set_dirty(id, DrawPart::Background, false);
        self.set_dirty(id, DrawPart::Text, false);
        Ok(())
    }

    pub fn move_text_cursor(&mut self, id: BoxId, delta: isize) -> Result<()> {
        self.ready_node_mut(id)?.text.move_cursor(delta);
        self.set_dirty(id, DrawPart::Text, false);
        Ok(())
    }

    // -- geometry -----------------------------------------------------------

    /// Re-derive one box's geometry from its declared values, bracketed by
    /// the resize hooks.
    pub fn resize_box(&mut self, id: BoxId) {
        self.run_chain(id, |b, g, i| b.pre_resize(g, i));
        layout::resolve_rect(&mut self.tree, id);
        clip::recalculate(&mut self.tree, id);
        if let Some(node) = self.tree.get_mut(id) {
            node.dirty = DirtyFlags::ALL;
        }
        self.run_chain(id, |b, g, i| b.post_resize(g, i));
    }

    pub fn resize_subtree(&mut self, id: BoxId) {
        self.resize_box(id);
        for child in self.tree.children(id).to_vec() {
            self.resize_subtree(child);
        }
    }

    /// Reflow everything after a terminal size change.
    fn resize_all(&mut self) {
        let (width, height) = (self.buffer.width(), self.buffer.height());
        if let Some(root) = self.tree.get_mut(self.root) {
            root.declared_rect = DeclaredRect::new(
                Dim::Abs(0),
                Dim::Abs(0),
                Dim::Abs(width),
                Dim::Abs(height),
            );
        }
        self.resize_subtree(self.root);
    }

    /// Mark part of a box dirty and request a redraw. With `propagate`,
    /// full and background repaints cascade to descendants (their cells
    /// are about to be painted over).
    pub fn set_dirty(&mut self, id: BoxId, part: DrawPart, propagate: bool) {
        match self.tree.get_mut(id) {
            Some(node) => match part {
                DrawPart::Border => node.dirty.border = true,
                DrawPart::Background => node.dirty.background = true,
                DrawPart::Text => node.dirty.text = true,
                DrawPart::All => node.dirty.all = true,
            },
            None => return,
        }
        self.queue
            .push(Event::new(names::DRAW).from_box(id).to_path("/root"));
        if propagate && matches!(part, DrawPart::All | DrawPart::Background) {
            for child in self.tree.children(id).to_vec() {
                self.set_dirty(child, DrawPart::All, true);
            }
        }
    }

    // -- drawing ------------------------------------------------------------

    /// Paint every box in ascending z order into the frame buffer.
    pub fn draw(&mut self) {
        let mut buckets: BTreeMap<i64, Vec<BoxId>> = BTreeMap::new();
        if let Some(root) = self.tree.get(self.root) {
            buckets.entry(root.z_index).or_default().push(self.root);
        }
        self.bucket_children(self.root, &mut buckets);
        for ids in buckets.into_values() {
            for id in ids {
                self.draw_box(id);
            }
        }
    }

    /// Bucket the subtree's boxes by their own z-index. A child below its
    /// parent's layer is skipped with its subtree, as is an invisible one.
    fn bucket_children(&self, id: BoxId, buckets: &mut BTreeMap<i64, Vec<BoxId>>) {
        let parent_z = self.tree.get(id).map(|n| n.z_index).unwrap_or(0);
        for &child in self.tree.children(id) {
            let node = match self.tree.get(child) {
                Some(n) => n,
                None => continue,
            };
            if node.z_index < parent_z || !node.visible {
                continue;
            }
            buckets.entry(node.z_index).or_default().push(child);
            self.bucket_children(child, buckets);
        }
    }

    fn draw_box(&mut self, id: BoxId) {
        self.run_chain(id, |b, g, i| b.setup_draw(g, i));
        clip::recalculate(&mut self.tree, id);

        let (visible, dirty) = match self.tree.get(id) {
            Some(node) => (node.visible && node.clip.visible().is_some(), node.dirty),
            None => return,
        };
        if visible {
            if dirty.border() {
                self.draw_border(id);
            }
            if dirty.background() {
                self.draw_background(id);
            }
            if dirty.text() {
                self.draw_text(id);
            }
        }
        if let Some(node) = self.tree.get_mut(id) {
            node.dirty = DirtyFlags::CLEAN;
        }
        self.run_chain(id, |b, g, i| b.cleanup_draw(g, i));
    }

    /// Write one cell, bracketed by the draw hooks for its part.
    fn draw_cell(&mut self, id: BoxId, x: i32, y: i32, ch: char, part: DrawPart) {
        let params = DrawParams { x, y, ch };
        match part {
            DrawPart::Border => self.run_chain(id, move |b, g, i| b.pre_draw_border(g, i, &params)),
            DrawPart::Background => {
                self.run_chain(id, move |b, g, i| b.pre_draw_background(g, i, &params))
            }
            _ => self.run_chain(id, move |b, g, i| b.pre_draw_text(g, i, &params)),
        };
        self.buffer.set_xy(x, y, ch);
        match part {
            DrawPart::Border => self.run_chain(id, move |b, g, i| b.post_draw_border(g, i, &params)),
            DrawPart::Background => {
                self.run_chain(id, move |b, g, i| b.post_draw_background(g, i, &params))
            }
            _ => self.run_chain(id, move |b, g, i| b.post_draw_text(g, i, &params)),
        };
    }

    fn draw_cell_style(&mut self, id: BoxId, x: i32, y: i32, style: &str) {
        let z = self.tree.get(id).map(|n| n.z_index).unwrap_or(0);
        self.buffer.set_style(x, y, z, style);
    }

    fn draw_border(&mut self, id: BoxId) {
        let (rect, info, style) = match self.tree.get(id) {
            Some(node) if node.border() => match node.clip.visible() {
                Some(info) => (node.rect, *info, node.effective_str("border-style", "normal")),
                None => return,
            },
            _ => return,
        };

        for x in 0..rect.width {
            if x < info.left() || x >= rect.width - info.right() {
                continue;
            }
            for y in 0..rect.height {
                if y < info.top() || y >= rect.height - info.bottom() {
                    continue;
                }
                let glyph = if x == 0 && y == 0 {
                    Some(ULCORNER)
                } else if x == 0 && y == rect.height - 1 {
                    Some(LLCORNER)
                } else if x == rect.width - 1 && y == 0 {
                    Some(URCORNER)
                } else if x == rect.width - 1 && y == rect.height - 1 {
                    Some(LRCORNER)
                } else if x == 0 || x == rect.width - 1 {
                    Some(VLINE)
                } else if y == 0 || y == rect.height - 1 {
                    Some(HLINE)
                } else {
                    None
                };
                if let Some(ch) = glyph {
                    let gx = info.area.x + x - info.left();
                    let gy = info.area.y + y - info.top();
                    self.draw_cell(id, gx, gy, ch, DrawPart::Border);
                    self.draw_cell_style(id, gx, gy, &style);
                }
            }
        }
    }

    fn draw_background(&mut self, id: BoxId) {
        let (info, border, ch, style) = match self.tree.get(id) {
            Some(node) => match node.clip.visible() {
                Some(info) => (
                    *info,
                    node.border(),
                    node.effective_char("background", ' '),
                    node.effective_str("background-style", "normal"),
                ),
                None => return,
            },
            None => return,
        };

        let mut x1 = info.area.x;
        let mut y1 = info.area.y;
        let mut x2 = info.area.right();
        let mut y2 = info.area.bottom();
        if border {
            // Don't paint over edges the clip hasn't already cut away.
            if info.left() == 0 {
                x1 += 1;
            }
            if info.top() == 0 {
                y1 += 1;
            }
            if info.right() == 0 {
                x2 -= 1;
            }
            if info.bottom() == 0 {
                y2 -= 1;
            }
        }
        for y in y1..y2 {
            for x in x1..x2 {
                self.draw_cell(id, x, y, ch, DrawPart::Background);
                self.draw_cell_style(id, x, y, &style);
            }
        }
    }

    /// Window (x1, y1, x2, y2) a box's text may appear in: its clip area
    /// pulled in by the un-clipped parts of margin and border.
    fn visible_area(&self, id: BoxId) -> Option<(i32, i32, i32, i32)> {
        let node = self.tree.get(id)?;
        let info = node.clip.visible()?;
        let margin = node.declared_margin;

        let mut x1 = info.area.x + (margin.left - info.left()).max(0);
        let mut y1 = info.area.y + (margin.top - info.top()).max(0);
        let mut x2 = info.area.right() - (margin.right - info.right()).max(0);
        let mut y2 = info.area.bottom() - (margin.bottom - info.bottom()).max(0);
        if node.border() {
            if info.left() == 0 {
                x1 += 1;
            }
            if info.top() == 0 {
                y1 += 1;
            }
            if info.right() == 0 {
                x2 -= 1;
            }
            if info.bottom() == 0 {
                y2 -= 1;
            }
        }
        Some((x1, y1, x2, y2))
    }

    /// Where the text's (0, 0) lands on screen, shifted by scroll. Unlike
    /// the visible window this may extend past the clip; cells are gated
    /// against [`visible_area`](Self::visible_area) when painted.
    fn drawable_origin(&self, id: BoxId) -> Option<(i32, i32)> {
        let node = self.tree.get(id)?;
        let info = node.clip.visible()?;
        let margin = node.margin();
        Some((
            info.area.x + margin.left - info.left() - node.scroll.0,
            info.area.y + margin.top - info.top() - node.scroll.1,
        ))
    }

    fn draw_text(&mut self, id: BoxId) {
        let width = match self.tree.get(id) {
            Some(node) => node.content_rect.width,
            None => return,
        };
        if width < 1 {
            return;
        }
        {
            let node = match self.tree.get_mut(id) {
                Some(n) => n,
                None => return,
            };
            let active = node.active;
            if let Err(err) = node.text.parse(active, width) {
                warn!(path = %node.path, error = %err, "text not drawn");
                return;
            }
        }
        let origin = match self.drawable_origin(id) {
            Some(o) => o,
            None => return,
        };
        let window = match self.visible_area(id) {
            Some(w) => w,
            None => return,
        };
        let rows: Vec<String> = match self.tree.get(id) {
            Some(node) => node.text.rows().to_vec(),
            None => return,
        };

        for (row, line) in rows.iter().enumerate() {
            for (col, ch) in line.chars().enumerate() {
                let x = origin.0 + col as i32;
                let y = origin.1 + row as i32;
                if x < window.0 || x >= window.2 || y < window.1 || y >= window.3 {
                    continue;
                }
                self.draw_cell(id, x, y, ch, DrawPart::Text);
                let style = self
                    .tree
                    .get_mut(id)
                    .map(|n| n.text.style_at(col, row))
                    .unwrap_or_default();
                self.draw_cell_style(id, x, y, &style);
            }
        }
    }

    // -- events -------------------------------------------------------------

    pub fn queue_event(&mut self, event: Event) {
        self.queue.push(event);
    }

    /// Drain the queue, dispatching each event. Returns whether any event
    /// was handled (i.e. the frame may have changed).
    pub fn process_events(&mut self) -> bool {
        let mut handled = false;
        while let Some(event) = self.queue.pop() {
            handled |= self.dispatch(&event);
        }
        handled
    }

    /// Deliver one event: engine-level handling first, then the active
    /// subtree, then the rest of the tree depth-first, then the root
    /// itself.
    fn dispatch(&mut self, event: &Event) -> bool {
        if self.engine_event(event) {
            return true;
        }
        if let Some(active) = self.active {
            if self.propagate(active, event, None) {
                return true;
            }
        }
        let skip = self.active;
        for child in self.tree.children(self.root).to_vec() {
            if self.propagate(child, event, skip) {
                return true;
            }
        }
        self.box_event(self.root, event)
    }

    fn propagate(&mut self, id: BoxId, event: &Event, skip: Option<BoxId>) -> bool {
        if skip == Some(id) {
            return false;
        }
        if self.box_event(id, event) {
            return true;
        }
        for child in self.tree.children(id).to_vec() {
            if self.propagate(child, event, skip) {
                return true;
            }
        }
        false
    }

    /// One box's shot at an event: pre-event hooks, its own handler, then
    /// post-event hooks, OR-ed.
    fn box_event(&mut self, id: BoxId, event: &Event) -> bool {
        let addressed = match self.tree.get(id) {
            Some(node) => event.is_target(id, &node.path),
            None => return false,
        };
        if !addressed {
            return false;
        }
        let mut handled = self.run_chain(id, |b, g, i| b.pre_event(g, i, event));
        if let Some(mut handler) = self.tree.take_handler(id) {
            handled |= handler(self, id, event);
            self.tree.restore_handler(id, handler);
        }
        handled |= self.run_chain(id, |b, g, i| b.post_event(g, i, event));
        handled
    }

    /// Events the engine consumes before any box sees them.
    fn engine_event(&mut self, event: &Event) -> bool {
        match event.name.as_str() {
            names::RESIZE => {
                let width = event.int("width").unwrap_or(self.buffer.width() as i64) as i32;
                let height = event.int("height").unwrap_or(self.buffer.height() as i64) as i32;
                self.buffer.resize(width, height);
                self.resize_all();
                true
            }
            names::INTERRUPT => {
                self.exit();
                true
            }
            "KEY_TAB" => {
                self.activate_next(false);
                true
            }
            "KEY_BTAB" => {
                self.activate_next(true);
                true
            }
            names::QUIT => {
                self.buffer.clear();
                self.exit();
                true
            }
            // A dirty flag was raised somewhere; the flags themselves say
            // what to repaint.
            names::DRAW => true,
            _ => false,
        }
    }

    // -- run loop -----------------------------------------------------------

    /// Take over the terminal and run until [`exit`](Self::exit) or
    /// Ctrl+C. Raw mode and the alternate screen are restored on the way
    /// out, also when the loop fails.
    pub fn run(&mut self) -> Result<()> {
        let guard = TerminalGuard::acquire()?;
        let result = self.run_loop();
        drop(guard);
        if let Err(err) = &result {
            error!(error = %err, "run loop aborted");
        }
        result
    }

    fn run_loop(&mut self) -> Result<()> {
        self.draw();
        self.flush()?;
        while !self.terminate {
            self.poll_input()?;
            for event in self.scheduler.run_pending() {
                self.queue.push(event);
            }
            if self.process_events() {
                self.draw();
                self.flush()?;
            } else {
                std::thread::sleep(self.config.loop_wait);
            }
        }
        Ok(())
    }

    fn poll_input(&mut self) -> Result<()> {
        let timeout = self.config.key_timeout;
        let polled = match self.driver.as_mut() {
            Some(driver) => driver.poll_input(timeout)?,
            None => None,
        };
        match polled {
            Some(PolledInput::Char(c)) => {
                self.queue.push(Event::new(c.to_string()).from_tag("KBD"));
            }
            Some(PolledInput::Key(name)) => {
                self.queue.push(Event::new(name).from_tag("KBD"));
            }
            Some(PolledInput::Resize(width, height)) => {
                // Geometry changes outrank everything already queued.
                self.queue.push_priority(
                    Event::new(names::RESIZE)
                        .from_tag("SYS")
                        .to_path("/root")
                        .with("width", PayloadValue::Int(i64::from(width)))
                        .with("height", PayloadValue::Int(i64::from(height))),
                );
            }
            None => {}
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(driver) = self.driver.as_mut() {
            driver.flush_frame(&self.buffer)?;
        }
        Ok(())
    }
}

// ===========================================================================
// Tests
// ===========================================================================
