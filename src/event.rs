//! Events and the FIFO event queue.
//!
//! Events are immutable values identified by `(name, source, target)`;
//! the payload is auxiliary data and never part of identity. The queue is
//! strictly FIFO and deduplicates on enqueue: pushing an event identical to
//! one already pending is a no-op, which keeps repeated draw requests from
//! piling up within a tick.

use std::collections::{HashMap, VecDeque};

use crate::tree::BoxId;

/// Well-known event names.
pub mod names {
    pub const ACTIVATE: &str = "ACTIVATE";
    pub const DEACTIVATE: &str = "DEACTIVATE";
    pub const DRAW: &str = "DRAW";
    pub const SCHEDULED: &str = "SCHEDULED";
    pub const RESIZE: &str = "RESIZE";
    pub const QUIT: &str = "QUIT";
    pub const HIDE: &str = "HIDE";
    pub const SHOW: &str = "SHOW";
    /// Reserved for button-like behaviors; the core never emits it.
    pub const PRESSED: &str = "PRESSED";
    /// The interrupt key (Ctrl+C), mapped by the terminal driver.
    pub const INTERRUPT: &str = "KEY_INTERRUPT";
}

/// Where an event came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSource {
    Box(BoxId),
    /// A non-box origin, e.g. `"KBD"` or a scheduler job tag.
    Tag(String),
    None,
}

/// Who an event is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTarget {
    Box(BoxId),
    /// A slash path like `/root/menu`, matched against box paths at
    /// propagation time.
    Path(String),
    /// Every box matches.
    All,
}

/// Auxiliary event data.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadValue {
    Str(String),
    Int(i64),
    Float(f64),
}

/// An event flowing through the queue.
///
/// Equality compares `(name, source, target)` only.
#[derive(Debug, Clone)]
pub struct Event {
    pub name: String,
    pub source: EventSource,
    pub target: EventTarget,
    pub payload: HashMap<String, PayloadValue>,
}

impl Event {
    /// A new event addressed to everyone, with no source.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: EventSource::None,
            target: EventTarget::All,
            payload: HashMap::new(),
        }
    }

    pub fn from_box(mut self, id: BoxId) -> Self {
        self.source = EventSource::Box(id);
        self
    }

    pub fn from_tag(mut self, tag: impl Into<String>) -> Self {
        self.source = EventSource::Tag(tag.into());
        self
    }

    pub fn to_box(mut self, id: BoxId) -> Self {
        self.target = EventTarget::Box(id);
        self
    }

    pub fn to_path(mut self, path: impl Into<String>) -> Self {
        self.target = EventTarget::Path(path.into());
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: PayloadValue) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        match self.payload.get(key) {
            Some(PayloadValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// Whether the box with the given id and path is addressed by this
    /// event.
    pub fn is_target(&self, id: BoxId, path: &str) -> bool {
        match &self.target {
            EventTarget::All => true,
            EventTarget::Path(p) => p == path,
            EventTarget::Box(b) => *b == id,
        }
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.source == other.source && self.target == other.target
    }
}

/// FIFO queue with dedup-on-enqueue.
#[derive(Debug, Default)]
pub struct EventQueue {
    queue: VecDeque<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue at the back unless an identical event is already pending.
    pub fn push(&mut self, event: Event) {
        if !self.queue.contains(&event) {
            self.queue.push_back(event);
        }
    }

    /// Enqueue at the front (system signals go ahead of ordinary input).
    pub fn push_priority(&mut self, event: Event) {
        if !self.queue.contains(&event) {
            self.queue.push_front(event);
        }
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ── identity ─────────────────────────────────────────────────────

    #[test]
    fn identity_ignores_payload() {
        let a = Event::new("DRAW").with("n", PayloadValue::Int(1));
        let b = Event::new("DRAW").with("n", PayloadValue::Int(2));
        assert_eq!(a, b);
    }

    #[test]
    fn identity_includes_source_and_target() {
        let a = Event::new("DRAW").from_tag("x").to_path("/root");
        let b = Event::new("DRAW").from_tag("y").to_path("/root");
        let c = Event::new("DRAW").from_tag("x").to_path("/root/menu");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    // ── queue ────────────────────────────────────────────────────────

    #[test]
    fn queue_is_fifo() {
        let mut q = EventQueue::new();
        q.push(Event::new("A"));
        q.push(Event::new("B"));
        assert_eq!(q.pop().map(|e| e.name), Some("A".to_owned()));
        assert_eq!(q.pop().map(|e| e.name), Some("B".to_owned()));
        assert!(q.pop().is_none());
    }

    #[test]
    fn duplicate_enqueue_is_dropped() {
        let mut q = EventQueue::new();
        q.push(Event::new("DRAW").to_path("/root"));
        q.push(Event::new("DRAW").to_path("/root"));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn dedup_allows_requeue_after_pop() {
        let mut q = EventQueue::new();
        q.push(Event::new("DRAW"));
        let _ = q.pop();
        q.push(Event::new("DRAW"));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn priority_push_goes_first() {
        let mut q = EventQueue::new();
        q.push(Event::new("key"));
        q.push_priority(Event::new(names::RESIZE));
        assert_eq!(q.pop().map(|e| e.name), Some(names::RESIZE.to_owned()));
    }

    // ── target matching ──────────────────────────────────────────────

    #[test]
    fn target_matching() {
        let mut ids = slotmap::SlotMap::<BoxId, ()>::with_key();
        let a = ids.insert(());
        let b = ids.insert(());

        let ev = Event::new("X");
        assert!(ev.is_target(a, "/root/a"));

        let ev = Event::new("X").to_path("/root/a");
        assert!(ev.is_target(a, "/root/a"));
        assert!(!ev.is_target(a, "/root/b"));

        let ev = Event::new("X").to_box(a);
        assert!(ev.is_target(a, "/root/a"));
        assert!(!ev.is_target(b, "/root/a"));
    }
}
