//! Clipping and coordinate translation.
//!
//! A box's geometry is local to its parent's content area; drawing needs
//! absolute terminal coordinates and the visible portion of the box after
//! every ancestor has clipped it. Both are computed here and cached on the
//! node (`origin`, `clip`) after resizes and before each draw pass.

use crate::geometry::{Margin, Rect};
use crate::tree::{BoxId, BoxTree};

/// Visible area of a box in absolute coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipInfo {
    /// The visible rectangle on screen.
    pub area: Rect,
    /// Cells clipped away per edge: left, top, right, bottom.
    pub clipped: [i32; 4],
}

impl ClipInfo {
    pub fn left(&self) -> i32 {
        self.clipped[0]
    }

    pub fn top(&self) -> i32 {
        self.clipped[1]
    }

    pub fn right(&self) -> i32 {
        self.clipped[2]
    }

    pub fn bottom(&self) -> i32 {
        self.clipped[3]
    }
}

/// Result of clipping a box against its ancestors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clip {
    Visible(ClipInfo),
    /// No overlap with the parent's visible area; the box is skipped for
    /// the frame.
    Offscreen,
}

impl Clip {
    pub fn visible(&self) -> Option<&ClipInfo> {
        match self {
            Clip::Visible(info) => Some(info),
            Clip::Offscreen => None,
        }
    }
}

/// Translate a local position inside `id` to absolute coordinates.
///
/// Walks up the tree adding each box's rect origin and, for every parent,
/// subtracting its scroll position and adding its content margin.
pub fn to_global(tree: &BoxTree, id: BoxId, x: i32, y: i32) -> (i32, i32) {
    let (mut x, mut y) = (x, y);
    let mut current = Some(id);
    while let Some(cur) = current {
        let node = match tree.get(cur) {
            Some(n) => n,
            None => break,
        };
        x += node.rect.x;
        y += node.rect.y;

        let parent = tree.parent(cur);
        if let Some(parent_node) = parent.and_then(|p| tree.get(p)) {
            let pmargin = parent_node.margin();
            x += pmargin.left - parent_node.scroll.0;
            y += pmargin.top - parent_node.scroll.1;
        }
        current = parent;
    }
    (x, y)
}

/// Clip a box against its parent's already-clipped area.
///
/// `with_margin` shrinks the box's own edges by its margin first (used
/// when the caller wants the parent's *content* area; a box clipping
/// itself for drawing passes `false`). The root clips to its own rect.
pub fn clip(tree: &BoxTree, id: BoxId, with_margin: bool) -> Clip {
    let node = match tree.get(id) {
        Some(n) => n,
        None => return Clip::Offscreen,
    };
    let margin = if with_margin { node.margin() } else { Margin::ZERO };

    let parent = match tree.parent(id) {
        Some(p) => p,
        None => {
            let area = node.rect.shrink(&margin);
            return Clip::Visible(ClipInfo {
                area,
                clipped: [0; 4],
            });
        }
    };

    let pclip = match clip(tree, parent, true) {
        Clip::Visible(info) => info,
        Clip::Offscreen => return Clip::Offscreen,
    };
    let parea = pclip.area;

    let (gx, gy) = to_global(tree, id, 0, 0);
    let origin = (gx + margin.left, gy + margin.top);
    let end = (
        gx + node.rect.width - margin.right,
        gy + node.rect.height - margin.bottom,
    );

    if end.0 <= parea.x || end.1 <= parea.y || origin.0 >= parea.right() || origin.1 >= parea.bottom()
    {
        return Clip::Offscreen;
    }

    let clipped = [
        (origin.0 - parea.x).min(0).abs(),
        (origin.1 - parea.y).min(0).abs(),
        (end.0 - parea.right()).max(0),
        (end.1 - parea.bottom()).max(0),
    ];

    let x1 = origin.0.max(parea.x);
    let y1 = origin.1.max(parea.y);
    let x2 = end.0.min(parea.right());
    let y2 = end.1.min(parea.bottom());

    Clip::Visible(ClipInfo {
        area: Rect::new(x1, y1, x2 - x1, y2 - y1),
        clipped,
    })
}

/// Refresh a node's cached origin and clip.
pub fn recalculate(tree: &mut BoxTree, id: BoxId) {
    let origin = to_global(tree, id, 0, 0);
    let clipped = clip(tree, id, false);
    if let Some(node) = tree.get_mut(id) {
        node.origin = origin;
        node.clip = clipped;
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Margin;
    use crate::tree::BoxNode;

    fn tree_with_root(w: i32, h: i32) -> (BoxTree, BoxId) {
        let mut tree = BoxTree::new();
        let mut root = BoxNode::new("root");
        root.rect = Rect::new(0, 0, w, h);
        root.content_rect = Rect::new(0, 0, w, h);
        let root_id = tree.insert(root, None);
        (tree, root_id)
    }

    fn child_at(tree: &mut BoxTree, parent: BoxId, rect: Rect) -> BoxId {
        let mut node = BoxNode::new("child");
        node.rect = rect;
        node.content_rect = rect;
        tree.insert(node, Some(parent))
    }

    // ── to_global ────────────────────────────────────────────────────

    #[test]
    fn global_adds_ancestor_origins() {
        let (mut tree, root) = tree_with_root(80, 24);
        let a = child_at(&mut tree, root, Rect::new(2, 3, 20, 10));
        let b = child_at(&mut tree, a, Rect::new(4, 1, 5, 5));

        assert_eq!(to_global(&tree, a, 0, 0), (2, 3));
        assert_eq!(to_global(&tree, b, 0, 0), (6, 4));
        assert_eq!(to_global(&tree, b, 1, 1), (7, 5));
    }

    #[test]
    fn global_subtracts_parent_scroll() {
        let (mut tree, root) = tree_with_root(80, 24);
        let a = child_at(&mut tree, root, Rect::new(0, 0, 20, 10));
        let b = child_at(&mut tree, a, Rect::new(3, 3, 5, 5));

        tree.get_mut(a).map(|n| n.scroll = (1, 2)).unwrap();
        assert_eq!(to_global(&tree, b, 0, 0), (2, 1));
    }

    #[test]
    fn global_adds_parent_margin() {
        let (mut tree, root) = tree_with_root(80, 24);
        let a = child_at(&mut tree, root, Rect::new(5, 5, 20, 10));
        let b = child_at(&mut tree, a, Rect::new(0, 0, 5, 5));

        tree.get_mut(a)
            .map(|n| n.declared_margin = Margin::new(1, 0, 0, 2))
            .unwrap();
        assert_eq!(to_global(&tree, b, 0, 0), (7, 6));
    }

    // ── clip ─────────────────────────────────────────────────────────

    #[test]
    fn root_clips_to_own_rect() {
        let (tree, root) = tree_with_root(80, 24);
        let info = clip(&tree, root, false);
        assert_eq!(
            info.visible().map(|c| c.area),
            Some(Rect::new(0, 0, 80, 24))
        );
        assert_eq!(info.visible().map(|c| c.clipped), Some([0; 4]));
    }

    #[test]
    fn contained_child_is_unclipped() {
        let (mut tree, root) = tree_with_root(80, 24);
        let a = child_at(&mut tree, root, Rect::new(10, 5, 20, 10));

        let info = clip(&tree, a, false);
        let info = info.visible().unwrap();
        assert_eq!(info.area, Rect::new(10, 5, 20, 10));
        assert_eq!(info.clipped, [0; 4]);
    }

    #[test]
    fn child_past_right_edge_is_clipped() {
        let (mut tree, root) = tree_with_root(20, 10);
        let a = child_at(&mut tree, root, Rect::new(15, 2, 10, 4));

        let info = clip(&tree, a, false);
        let info = info.visible().unwrap();
        assert_eq!(info.area, Rect::new(15, 2, 5, 4));
        assert_eq!(info.clipped, [0, 0, 5, 0]);
    }

    #[test]
    fn child_with_negative_origin_is_clipped_left_top() {
        let (mut tree, root) = tree_with_root(20, 10);
        let a = child_at(&mut tree, root, Rect::new(-3, -1, 10, 4));

        let info = clip(&tree, a, false);
        let info = info.visible().unwrap();
        assert_eq!(info.area, Rect::new(0, 0, 7, 3));
        assert_eq!(info.clipped, [3, 1, 0, 0]);
    }

    #[test]
    fn offscreen_iff_zero_overlap() {
        let (mut tree, root) = tree_with_root(20, 10);
        let gone = child_at(&mut tree, root, Rect::new(20, 0, 5, 5));
        assert_eq!(clip(&tree, gone, false), Clip::Offscreen);

        // One cell of overlap is still visible.
        let edge = child_at(&mut tree, root, Rect::new(19, 0, 5, 5));
        let info = clip(&tree, edge, false);
        assert_eq!(
            info.visible().map(|c| c.area),
            Some(Rect::new(19, 0, 1, 5))
        );
    }

    #[test]
    fn area_is_contained_in_parent_area() {
        let (mut tree, root) = tree_with_root(20, 10);
        let a = child_at(&mut tree, root, Rect::new(5, 5, 30, 30));
        let b = child_at(&mut tree, a, Rect::new(10, 2, 20, 20));

        let pinfo = clip(&tree, a, false).visible().copied().unwrap();
        let cinfo = clip(&tree, b, false).visible().copied().unwrap();
        let both = pinfo.area.intersection(&cinfo.area);
        assert_eq!(both, cinfo.area);
        assert!(cinfo.clipped.iter().all(|&c| c >= 0));
    }

    #[test]
    fn parent_margin_narrows_child_clip() {
        let (mut tree, root) = tree_with_root(20, 10);
        let a = child_at(&mut tree, root, Rect::new(0, 0, 20, 10));
        tree.get_mut(a)
            .map(|n| n.declared_margin = Margin::new(1, 1, 1, 1))
            .unwrap();
        // Fills the parent rect, ignoring the parent's margin offset.
        let b = child_at(&mut tree, a, Rect::new(-1, -1, 20, 10));

        let info = clip(&tree, b, false).visible().copied().unwrap();
        // The parent's content area is (1,1)..(19,9).
        assert_eq!(info.area, Rect::new(1, 1, 18, 8));
    }

    #[test]
    fn offscreen_parent_hides_children() {
        let (mut tree, root) = tree_with_root(20, 10);
        let a = child_at(&mut tree, root, Rect::new(100, 100, 5, 5));
        let b = child_at(&mut tree, a, Rect::new(0, 0, 2, 2));
        assert_eq!(clip(&tree, b, false), Clip::Offscreen);
    }

    // ── recalculate ──────────────────────────────────────────────────

    #[test]
    fn recalculate_caches_origin_and_clip() {
        let (mut tree, root) = tree_with_root(20, 10);
        let a = child_at(&mut tree, root, Rect::new(3, 4, 5, 5));
        recalculate(&mut tree, a);

        let node = tree.get(a).unwrap();
        assert_eq!(node.origin, (3, 4));
        assert_eq!(
            node.clip.visible().map(|c| c.area),
            Some(Rect::new(3, 4, 5, 5))
        );
    }
}
