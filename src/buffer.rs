//! The frame buffer: one character and a stack of styles per cell.
//!
//! Boxes draw into the buffer in z order, so for characters last-write-wins
//! is already correct. Styles are kept per cell in a map keyed by the
//! writing box's z-index and the highest entry wins at flush time, which
//! lets a lower box repaint without clobbering an overlay's colors.

use std::collections::BTreeMap;

use tracing::warn;

/// Character grid plus z-keyed style layers, sized to the terminal.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    width: i32,
    height: i32,
    frame: Vec<char>,
    styles: Vec<BTreeMap<i64, String>>,
}

impl FrameBuffer {
    pub fn new(width: i32, height: i32) -> Self {
        let mut buffer = Self::default();
        buffer.resize(width, height);
        buffer
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Reallocate for a new terminal size, dropping all contents.
    pub fn resize(&mut self, width: i32, height: i32) {
        self.width = width.max(0);
        self.height = height.max(0);
        let cells = (self.width * self.height) as usize;
        self.frame = vec![' '; cells];
        self.styles = vec![BTreeMap::new(); cells];
    }

    /// Blank every cell without resizing.
    pub fn clear(&mut self) {
        for c in &mut self.frame {
            *c = ' ';
        }
        for s in &mut self.styles {
            s.clear();
        }
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            None
        } else {
            Some((y * self.width + x) as usize)
        }
    }

    /// Write a character. Out-of-bounds writes are logged and dropped;
    /// clipping upstream should have prevented them.
    pub fn set_xy(&mut self, x: i32, y: i32, c: char) {
        match self.index(x, y) {
            Some(ind) => self.frame[ind] = c,
            None => warn!(
                x,
                y,
                width = self.width,
                height = self.height,
                "dropped out-of-bounds cell write"
            ),
        }
    }

    pub fn get_xy(&self, x: i32, y: i32) -> Option<char> {
        self.index(x, y).map(|ind| self.frame[ind])
    }

    /// Record a style for the cell at the given z layer.
    pub fn set_style(&mut self, x: i32, y: i32, z: i64, style: impl Into<String>) {
        match self.index(x, y) {
            Some(ind) => {
                self.styles[ind].insert(z, style.into());
            }
            None => warn!(
                x,
                y,
                width = self.width,
                height = self.height,
                "dropped out-of-bounds style write"
            ),
        }
    }

    /// The winning (highest-z) style for a cell, if any.
    pub fn style_at(&self, x: i32, y: i32) -> Option<&str> {
        self.index(x, y)
            .and_then(|ind| self.styles[ind].values().next_back())
            .map(String::as_str)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
