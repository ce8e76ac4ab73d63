//! Layout: declared-rect resolution and stretch distribution.
//!
//! A box's rect is always derived from its declared geometry and the
//! parent's *content* rect, never mutated in place, so a full top-down
//! pass after a terminal resize reflows everything deterministically.

use crate::geometry::Rect;
use crate::tree::{BoxId, BoxTree};

/// Resolve one box's rect and content rect from its declared geometry.
///
/// Ratio fields resolve against the parent's content dimensions (the root
/// resolves against an empty rect, so its declared values must be
/// absolute). `align-x: right` / `align-y: bottom` flip the declared
/// offset to measure from the far edge.
pub fn resolve_rect(tree: &mut BoxTree, id: BoxId) {
    let parent_content = tree
        .parent(id)
        .and_then(|p| tree.get(p))
        .map(|n| n.content_rect)
        .unwrap_or(Rect::EMPTY);

    let node = match tree.get_mut(id) {
        Some(n) => n,
        None => return,
    };

    let declared = node.declared_rect;
    let mut x = declared.x.resolve(parent_content.width);
    let mut y = declared.y.resolve(parent_content.height);
    let width = declared.width.resolve(parent_content.width);
    let height = declared.height.resolve(parent_content.height);

    if node.style.str_or("align-x", "left") == "right" {
        x = parent_content.width - x - width;
    }
    if node.style.str_or("align-y", "top") == "bottom" {
        y = parent_content.height - y - height;
    }

    node.rect = Rect::new(x, y, width, height);
    node.content_rect = node.rect.shrink(&node.margin());
}

/// Split `total` cells among children weighted by stretch ratios.
///
/// Ratios are clamped non-negative and normalized by their sum; an all-zero
/// set keeps the degenerate sum of 1, yielding all-zero lengths. Each
/// length is `floor(total * ratio)` minus `spacing` (spacing is not taken
/// after the last child); offsets accumulate. Returns `(offset, length)`
/// per child.
pub fn distribute(total: i32, ratios: &[f64], spacing: i32) -> Vec<(i32, i32)> {
    let clamped: Vec<f64> = ratios.iter().map(|r| r.max(0.0)).collect();
    let mut sum: f64 = clamped.iter().sum();
    if sum == 0.0 {
        sum = 1.0;
    }

    let count = clamped.len();
    let mut out = Vec::with_capacity(count);
    let mut start = 0i32;
    for (i, ratio) in clamped.iter().enumerate() {
        let mut length = (total as f64 * (ratio / sum)) as i32;
        if i + 1 < count {
            length -= spacing;
        }
        out.push((start, length));
        start += length + spacing;
    }
    out
}

// ===========================================================================
// Tests
// ===========================================================================
