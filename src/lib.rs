//! # boxtui
//!
//! A retained-mode terminal UI toolkit built around a tree of styled boxes.
//!
//! Boxes are declared as [`BoxSpec`] subtrees with nested style maps;
//! geometry is relative to the parent's content area and may be absolute
//! or ratio-based. A single box is *active* at a time and receives events
//! first; everything else follows depth-first. Drawing is dirty-flag
//! driven into a z-layered frame buffer, flushed through crossterm.
//!
//! ## Core Systems
//!
//! - **[`geometry`]** — Rect, Margin and declared (ratio) dimensions
//! - **[`style`]** — Nested style maps with dotted-path access and `:active` variants
//! - **[`tree`]** — Slotmap-backed box tree with paths and child order
//! - **[`layout`]** — Declared-rect resolution and stretch distribution
//! - **[`clip`]** — Ancestor clipping and global coordinate translation
//! - **[`text`]** — Markup parsing, wrapping, styles and cursor editing
//! - **[`behavior`]** — Per-box hook chains and the behavior registry
//! - **[`event`]** — Events, targeting, and the deduplicating FIFO queue
//! - **[`buffer`]** — Character grid with z-keyed style layers
//! - **[`gui`]** — The engine: construction, activation, drawing, run loop
//! - **[`terminal`]** — Crossterm input mapping and frame flushing
//! - **[`schedule`]** — Interval jobs feeding the event queue
//! - **[`testing`]** — Plain-text snapshot helpers

// Foundation
pub mod error;
pub mod geometry;
pub mod style;

// Core systems
pub mod buffer;
pub mod clip;
pub mod layout;
pub mod text;
pub mod tree;

// Events and behaviors
pub mod behavior;
pub mod event;
pub mod schedule;

// Engine and backend
pub mod gui;
pub mod terminal;

// Test support
pub mod testing;

pub use error::{Error, Result};
pub use event::Event;
pub use gui::{Gui, GuiConfig};
pub use tree::{BoxId, BoxSpec};
