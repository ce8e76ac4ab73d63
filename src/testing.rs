//! Snapshot rendering helpers.
//!
//! Functions for turning a rendered [`FrameBuffer`] or a whole headless
//! [`Gui`](crate::gui::Gui) into plain-text strings suitable for snapshot
//! testing and assertions.

use crate::buffer::FrameBuffer;
use crate::gui::Gui;

/// Render a frame buffer to a plain text string.
///
/// Each row becomes one line with trailing spaces trimmed; rows are joined
/// by `'\n'` and the final line carries no trailing newline.
pub fn buffer_to_string(buffer: &FrameBuffer) -> String {
    let mut lines = Vec::with_capacity(buffer.height() as usize);
    for y in 0..buffer.height() {
        let row: String = (0..buffer.width())
            .map(|x| buffer.get_xy(x, y).unwrap_or(' '))
            .collect();
        lines.push(row.trim_end().to_owned());
    }
    lines.join("\n")
}

/// Draw a headless GUI and snapshot its frame.
pub fn render_to_string(gui: &mut Gui) -> String {
    gui.process_events();
    gui.draw();
    buffer_to_string(gui.buffer())
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_spaces_per_row() {
        let mut buffer = FrameBuffer::new(6, 3);
        buffer.set_xy(0, 0, 'a');
        buffer.set_xy(2, 1, 'b');
        assert_eq!(buffer_to_string(&buffer), "a\n  b\n");
    }

    #[test]
    fn empty_buffer_is_blank_lines() {
        let buffer = FrameBuffer::new(4, 2);
        assert_eq!(buffer_to_string(&buffer), "\n");
    }
}
