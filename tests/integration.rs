//! Integration tests for boxtui.
//!
//! These exercise the public API from outside the crate: building a GUI
//! from specs, driving it with events, and checking rendered frames.

use boxtui::event::{names, Event, PayloadValue};
use boxtui::geometry::{DeclaredRect, Dim, Margin, Rect};
use boxtui::layout;
use boxtui::testing::render_to_string;
use boxtui::text::{invert_style, TextConfig, TextEngine};
use boxtui::{BoxSpec, Gui};
use pretty_assertions::assert_eq;

fn abs_rect(x: i32, y: i32, w: i32, h: i32) -> DeclaredRect {
    DeclaredRect::new(Dim::Abs(x), Dim::Abs(y), Dim::Abs(w), Dim::Abs(h))
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

#[test]
fn ratio_fields_round_against_parent_content() {
    let spec = BoxSpec::new("app").child(
        BoxSpec::new("half").style(
            "rect",
            DeclaredRect::new(Dim::Abs(0), Dim::Abs(0), Dim::Ratio(0.5), Dim::Ratio(0.5)),
        ),
    );
    let gui = Gui::new_headless(spec, 9, 9);
    let half = gui.find("/root/app/half").unwrap();
    assert_eq!(gui.tree().get(half).unwrap().rect, Rect::new(0, 0, 5, 5));
}

#[test]
fn absolute_fields_pass_through() {
    let spec = BoxSpec::new("app")
        .child(BoxSpec::new("fixed").style("rect", abs_rect(3, 2, 10, 5)));
    let gui = Gui::new_headless(spec, 80, 24);
    let fixed = gui.find("/root/app/fixed").unwrap();
    assert_eq!(gui.tree().get(fixed).unwrap().rect, Rect::new(3, 2, 10, 5));
}

#[test]
fn content_rect_is_rect_shrunk_by_margin_and_border() {
    let spec = BoxSpec::new("app").child(
        BoxSpec::new("panel")
            .style("rect", abs_rect(0, 0, 20, 10))
            .style("margin", Margin::new(1, 1, 1, 1))
            .style("border", true),
    );
    let gui = Gui::new_headless(spec, 40, 20);
    let panel = gui.tree().get(gui.find("/root/app/panel").unwrap()).unwrap();

    // Margin of 1 widened to 2 per side by the border.
    assert_eq!(panel.rect, Rect::new(0, 0, 20, 10));
    assert_eq!(panel.content_rect, Rect::new(2, 2, 16, 6));
}

#[test]
fn children_resolve_against_parent_content() {
    let spec = BoxSpec::new("app").child(
        BoxSpec::new("panel")
            .style("rect", abs_rect(0, 0, 20, 10))
            .style("border", true)
            .child(BoxSpec::new("inner")),
    );
    let gui = Gui::new_headless(spec, 40, 20);
    let inner = gui.find("/root/app/panel/inner").unwrap();
    // The default fill rect spans the bordered parent's 18x8 content.
    assert_eq!(gui.tree().get(inner).unwrap().rect, Rect::new(0, 0, 18, 8));
}

#[test]
fn terminal_resize_reflows_the_whole_tree() {
    let spec = BoxSpec::new("app").child(BoxSpec::new("half").style(
        "rect",
        DeclaredRect::new(Dim::Abs(0), Dim::Abs(0), Dim::Ratio(0.5), Dim::Ratio(1.0)),
    ));
    let mut gui = Gui::new_headless(spec, 20, 10);
    gui.queue_event(
        Event::new(names::RESIZE)
            .to_path("/root")
            .with("width", PayloadValue::Int(60))
            .with("height", PayloadValue::Int(20)),
    );
    gui.process_events();

    let half = gui.find("/root/app/half").unwrap();
    assert_eq!(gui.tree().get(half).unwrap().rect, Rect::new(0, 0, 30, 20));
}

// ---------------------------------------------------------------------------
// Stretch distribution
// ---------------------------------------------------------------------------

#[test]
fn two_even_stretch_children_split_ten_cells() {
    assert_eq!(layout::distribute(10, &[0.5, 0.5], 0), vec![(0, 5), (5, 5)]);
}

#[test]
fn stretch_lengths_sum_at_most_total() {
    for ratios in [&[0.2, 0.3, 0.5][..], &[1.0, 1.0, 1.0][..], &[0.7][..]] {
        let parts = layout::distribute(17, ratios, 0);
        let sum: i32 = parts.iter().map(|&(_, len)| len).sum();
        assert!(sum <= 17, "{parts:?} overflows");
    }
}

#[test]
fn all_zero_stretch_ratios_collapse() {
    let parts = layout::distribute(10, &[0.0, 0.0], 0);
    assert_eq!(parts, vec![(0, 0), (0, 0)]);
}

// ---------------------------------------------------------------------------
// Clipping
// ---------------------------------------------------------------------------

#[test]
fn clip_trims_to_the_parent_and_records_amounts() {
    let spec = BoxSpec::new("app")
        .child(BoxSpec::new("wide").style("rect", abs_rect(15, 2, 10, 4)));
    let mut gui = Gui::new_headless(spec, 20, 10);
    gui.draw();

    let wide = gui.tree().get(gui.find("/root/app/wide").unwrap()).unwrap();
    let info = wide.clip.visible().unwrap();
    assert_eq!(info.area, Rect::new(15, 2, 5, 4));
    assert_eq!(info.clipped, [0, 0, 5, 0]);
    assert!(info.clipped.iter().all(|&c| c >= 0));
}

#[test]
fn zero_overlap_is_offscreen_but_one_cell_is_not() {
    let spec = BoxSpec::new("app")
        .child(BoxSpec::new("gone").style("rect", abs_rect(20, 0, 5, 5)))
        .child(BoxSpec::new("edge").style("rect", abs_rect(19, 0, 5, 5)));
    let mut gui = Gui::new_headless(spec, 20, 10);
    gui.draw();

    let gone = gui.tree().get(gui.find("/root/app/gone").unwrap()).unwrap();
    assert!(gone.clip.visible().is_none());

    let edge = gui.tree().get(gui.find("/root/app/edge").unwrap()).unwrap();
    assert_eq!(
        edge.clip.visible().map(|c| c.area),
        Some(Rect::new(19, 0, 1, 5))
    );
}

// ---------------------------------------------------------------------------
// Activation and tab navigation
// ---------------------------------------------------------------------------

#[test]
fn at_most_one_box_is_active() {
    let spec = BoxSpec::new("app")
        .child(BoxSpec::new("a"))
        .child(BoxSpec::new("b"))
        .child(BoxSpec::new("c"));
    let mut gui = Gui::new_headless(spec, 20, 10);
    let ids: Vec<_> = ["a", "b", "c"]
        .iter()
        .map(|n| gui.find(&format!("/root/app/{n}")).unwrap())
        .collect();

    for &id in &ids {
        gui.activate(id);
        let active_count = ids
            .iter()
            .filter(|&&other| gui.tree().get(other).unwrap().active)
            .count();
        assert_eq!(active_count, 1);
        assert_eq!(gui.active(), Some(id));
    }
}

#[test]
fn tab_cycles_declared_indices_with_wraparound() {
    let spec = BoxSpec::new("app")
        .style("tab-index", 0i64)
        .child(BoxSpec::new("a").style("tab-index", 2i64))
        .child(BoxSpec::new("b").style("tab-index", 5i64));
    let mut gui = Gui::new_headless(spec, 20, 10);
    let app = gui.find("/root/app").unwrap();
    let a = gui.find("/root/app/a").unwrap();
    let b = gui.find("/root/app/b").unwrap();

    gui.activate(app);
    gui.process_events();

    let mut seen = Vec::new();
    for _ in 0..4 {
        gui.queue_event(Event::new("KEY_TAB").from_tag("KBD"));
        gui.process_events();
        seen.push(gui.active().unwrap());
    }
    assert_eq!(seen, vec![a, b, app, a]);

    gui.queue_event(Event::new("KEY_BTAB").from_tag("KBD"));
    gui.process_events();
    assert_eq!(gui.active(), Some(app));
}

// ---------------------------------------------------------------------------
// Text engine
// ---------------------------------------------------------------------------

#[test]
fn raw_markup_survives_wrapping() {
    let raw = "<t s=\"red\">some</t> long text that wraps";
    let mut engine = TextEngine::new(raw, TextConfig::default());
    engine.parse(false, 10).unwrap();
    assert!(engine.rows().len() > 1);
    assert_eq!(engine.get(true), raw);
}

#[test]
fn greedy_wrap_keeps_attached_trailing_space() {
    let mut engine = TextEngine::new("test test", TextConfig::default());
    engine.parse(false, 7).unwrap();
    assert_eq!(engine.rows(), ["test ", "test"]);
}

#[test]
fn invert_transform() {
    assert_eq!(invert_style("normal"), "black_on_white");
    assert_eq!(invert_style(""), "black_on_white");
    assert_eq!(invert_style("red_on_white"), "white_on_red");
    assert_eq!(invert_style("green"), "on_green");
}

#[test]
fn text_edits_flow_through_the_gui() {
    let spec = BoxSpec::new("app").child(BoxSpec::new("label").text("hello"));
    let mut gui = Gui::new_headless(spec, 20, 5);
    let label = gui.find("/root/app/label").unwrap();

    gui.set_text(label, "bye").unwrap();
    let frame = render_to_string(&mut gui);
    assert!(frame.contains("bye"));
    assert!(!frame.contains("hello"));
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

#[test]
fn bordered_background_box_snapshot() {
    let spec = BoxSpec::new("app")
        .style("border", true)
        .style("background", 'X');
    let mut gui = Gui::new_headless(spec, 9, 9);
    let frame = render_to_string(&mut gui);
    insta::assert_snapshot!(frame, @r"
    ┌───────┐
    │XXXXXXX│
    │XXXXXXX│
    │XXXXXXX│
    │XXXXXXX│
    │XXXXXXX│
    │XXXXXXX│
    │XXXXXXX│
    └───────┘
    ");
}

#[test]
fn side_by_side_boxes_snapshot() {
    // Two even halves of a 10-cell row, as distribute() lays them out.
    let parts = layout::distribute(10, &[0.5, 0.5], 0);
    let mut spec = BoxSpec::new("app").style("rect", abs_rect(0, 0, 10, 3));
    for (i, &(offset, length)) in parts.iter().enumerate() {
        let fill = if i == 0 { 'l' } else { 'r' };
        spec = spec.child(
            BoxSpec::new(format!("col{i}"))
                .style("rect", abs_rect(offset, 0, length, 3))
                .style("background", fill),
        );
    }
    let mut gui = Gui::new_headless(spec, 10, 3);
    let frame = render_to_string(&mut gui);
    insta::assert_snapshot!(frame, @r"
    lllllrrrrr
    lllllrrrrr
    lllllrrrrr
    ");
}

#[test]
fn text_is_clipped_to_the_box() {
    let spec = BoxSpec::new("app").child(
        BoxSpec::new("label")
            .style("rect", abs_rect(0, 0, 4, 1))
            .text("abcdefgh"),
    );
    let mut gui = Gui::new_headless(spec, 4, 1);
    let frame = render_to_string(&mut gui);
    // Only one 4-cell row exists; the rest of the wrap is out of view.
    assert_eq!(frame, "abcd");
}

#[test]
fn scrolling_shifts_rendered_text() {
    let spec = BoxSpec::new("app").child(
        BoxSpec::new("pager")
            .style("rect", abs_rect(0, 0, 6, 1))
            .text("one two three"),
    );
    let mut gui = Gui::new_headless(spec, 6, 1);
    let pager = gui.find("/root/app/pager").unwrap();

    let frame = render_to_string(&mut gui);
    assert_eq!(frame, "one");

    gui.scroll(pager, (0, 1));
    let frame = render_to_string(&mut gui);
    assert_eq!(frame, "two");
}

#[test]
fn quit_clears_the_frame() {
    let spec = BoxSpec::new("app").style("background", '#');
    let mut gui = Gui::new_headless(spec, 6, 2);
    let frame = render_to_string(&mut gui);
    assert!(frame.contains('#'));

    gui.queue_event(Event::new(names::QUIT));
    gui.process_events();
    assert_eq!(gui.buffer().get_xy(0, 0), Some(' '));
}
