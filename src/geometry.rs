//! Geometry primitives.
//!
//! Boxes are laid out in whole character cells, so all resolved geometry is
//! integral. Declared geometry may mix absolute cell counts with fractional
//! ratios of the parent's content area; [`Dim`] carries that distinction and
//! [`DeclaredRect`] groups the four declared fields of a box.

/// An axis-aligned rectangle in cell coordinates.
///
/// `x`/`y` are the top-left corner, `width`/`height` the extent. A rect with
/// non-positive extent is considered empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    /// The empty rectangle at the origin.
    pub const EMPTY: Rect = Rect {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };

    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub const fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub const fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Whether the cell at `(x, y)` lies inside this rect.
    pub const fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Shrink by a margin on each side. The result may be empty.
    pub const fn shrink(&self, margin: &Margin) -> Rect {
        Rect {
            x: self.x + margin.left,
            y: self.y + margin.top,
            width: self.width - margin.left - margin.right,
            height: self.height - margin.top - margin.bottom,
        }
    }

    /// Intersection of two rects, or [`Rect::EMPTY`] when disjoint.
    pub fn intersection(&self, other: &Rect) -> Rect {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        if x2 <= x1 || y2 <= y1 {
            Rect::EMPTY
        } else {
            Rect::new(x1, y1, x2 - x1, y2 - y1)
        }
    }
}

/// Per-side spacing around a box's content, in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Margin {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

impl Margin {
    pub const ZERO: Margin = Margin {
        top: 0,
        right: 0,
        bottom: 0,
        left: 0,
    };

    pub const fn new(top: i32, right: i32, bottom: i32, left: i32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Widen every side by `n`. Bordered boxes widen their declared margin
    /// by one cell per side.
    pub const fn widen(&self, n: i32) -> Margin {
        Margin {
            top: self.top + n,
            right: self.right + n,
            bottom: self.bottom + n,
            left: self.left + n,
        }
    }
}

/// A declared dimension: either an absolute cell count or a ratio of the
/// parent's content dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dim {
    Abs(i32),
    Ratio(f64),
}

impl Dim {
    /// Resolve against a parent content dimension.
    ///
    /// Ratios are clamped to be non-negative and the product is rounded to
    /// the nearest cell. Absolute values pass through unchanged.
    pub fn resolve(&self, parent: i32) -> i32 {
        match *self {
            Dim::Abs(v) => v,
            Dim::Ratio(r) => (parent as f64 * r.max(0.0)).round() as i32,
        }
    }
}

impl From<i32> for Dim {
    fn from(v: i32) -> Self {
        Dim::Abs(v)
    }
}

impl From<f64> for Dim {
    fn from(v: f64) -> Self {
        Dim::Ratio(v)
    }
}

/// The four declared geometry fields of a box, before resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeclaredRect {
    pub x: Dim,
    pub y: Dim,
    pub width: Dim,
    pub height: Dim,
}

impl DeclaredRect {
    pub const fn new(x: Dim, y: Dim, width: Dim, height: Dim) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The default declared rect: origin at the parent's content origin,
    /// filling the parent entirely.
    pub const fn fill() -> Self {
        Self {
            x: Dim::Abs(0),
            y: Dim::Abs(0),
            width: Dim::Ratio(1.0),
            height: Dim::Ratio(1.0),
        }
    }
}

impl Default for DeclaredRect {
    fn default() -> Self {
        Self::fill()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
