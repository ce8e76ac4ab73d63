//! Crossterm terminal backend.
//!
//! The `Terminal` wraps a buffered stdout writer, maps crossterm input into
//! key-name strings (`KEY_UP`, `KEY_TAB`, ...) or plain characters, and
//! flushes a [`FrameBuffer`] to the screen. Style strings use the
//! `attr..._fg_on_bg` token form, e.g. `bold_red_on_black`; tokens before
//! the last `on` describe attributes and the foreground, tokens after it
//! the background.

use std::io::{self, BufWriter, Stdout, Write};
use std::time::Duration;

use crossterm::{
    cursor, event, execute, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};

use crate::buffer::FrameBuffer;
use crate::event::names;

// ---------------------------------------------------------------------------
// TerminalGuard
// ---------------------------------------------------------------------------

/// RAII guard for terminal modes.
///
/// Acquiring enters raw mode and the alternate screen and hides the cursor;
/// dropping restores all three, including on unwind, so a panicked run loop
/// never leaves the shell in raw mode.
pub struct TerminalGuard {
    _private: (),
}

impl TerminalGuard {
    pub fn acquire() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen, cursor::Hide)?;
        Ok(Self { _private: () })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), cursor::Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One piece of decoded terminal input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolledInput {
    /// A printable character.
    Char(char),
    /// A named key, e.g. `KEY_ENTER`.
    Key(String),
    Resize(i32, i32),
}

fn map_key(key: event::KeyEvent) -> Option<PolledInput> {
    use event::KeyCode;

    if key.kind == event::KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(event::KeyModifiers::CONTROL) => {
            Some(PolledInput::Key(names::INTERRUPT.to_owned()))
        }
        KeyCode::Char(c) => Some(PolledInput::Char(c)),
        KeyCode::Enter => Some(PolledInput::Key("KEY_ENTER".to_owned())),
        KeyCode::Esc => Some(PolledInput::Key("KEY_ESCAPE".to_owned())),
        KeyCode::Tab => Some(PolledInput::Key("KEY_TAB".to_owned())),
        KeyCode::BackTab => Some(PolledInput::Key("KEY_BTAB".to_owned())),
        KeyCode::Backspace => Some(PolledInput::Key("KEY_BACKSPACE".to_owned())),
        KeyCode::Delete => Some(PolledInput::Key("KEY_DELETE".to_owned())),
        KeyCode::Left => Some(PolledInput::Key("KEY_LEFT".to_owned())),
        KeyCode::Right => Some(PolledInput::Key("KEY_RIGHT".to_owned())),
        KeyCode::Up => Some(PolledInput::Key("KEY_UP".to_owned())),
        KeyCode::Down => Some(PolledInput::Key("KEY_DOWN".to_owned())),
        KeyCode::Home => Some(PolledInput::Key("KEY_HOME".to_owned())),
        KeyCode::End => Some(PolledInput::Key("KEY_END".to_owned())),
        KeyCode::PageUp => Some(PolledInput::Key("KEY_PGUP".to_owned())),
        KeyCode::PageDown => Some(PolledInput::Key("KEY_PGDOWN".to_owned())),
        KeyCode::F(n) => Some(PolledInput::Key(format!("KEY_F{n}"))),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Terminal
// ---------------------------------------------------------------------------

/// Terminal I/O backend using crossterm.
pub struct Terminal {
    writer: BufWriter<Stdout>,
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminal {
    pub fn new() -> Self {
        Self {
            writer: BufWriter::new(io::stdout()),
        }
    }

    /// Current terminal size as (columns, rows).
    pub fn size() -> io::Result<(i32, i32)> {
        let (w, h) = terminal::size()?;
        Ok((i32::from(w), i32::from(h)))
    }

    /// Wait up to `timeout` for input and decode it. Returns `None` on
    /// timeout or on input we don't map (mouse, focus, paste).
    pub fn poll_input(&mut self, timeout: Duration) -> io::Result<Option<PolledInput>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        match event::read()? {
            event::Event::Key(key) => Ok(map_key(key)),
            event::Event::Resize(w, h) => {
                Ok(Some(PolledInput::Resize(i32::from(w), i32::from(h))))
            }
            _ => Ok(None),
        }
    }

    /// Write a whole frame to the screen and flush.
    ///
    /// Style commands are only re-issued when the cell's style differs from
    /// the previous cell's, so runs of equal style cost one escape sequence.
    pub fn flush_frame(&mut self, buffer: &FrameBuffer) -> io::Result<()> {
        queue!(self.writer, cursor::MoveTo(0, 0), ResetColor)?;
        let mut current: Option<String> = None;

        for y in 0..buffer.height() {
            queue!(self.writer, cursor::MoveTo(0, y as u16))?;
            for x in 0..buffer.width() {
                let style = buffer.style_at(x, y).map(str::to_owned);
                if style != current {
                    queue!(self.writer, ResetColor, SetAttribute(Attribute::Reset))?;
                    if let Some(ref s) = style {
                        self.apply_style(&parse_style(s))?;
                    }
                    current = style;
                }
                let c = buffer.get_xy(x, y).unwrap_or(' ');
                queue!(self.writer, Print(c))?;
            }
        }
        queue!(self.writer, ResetColor, SetAttribute(Attribute::Reset))?;
        self.writer.flush()
    }

    fn apply_style(&mut self, style: &StyleSpec) -> io::Result<()> {
        for attr in &style.attrs {
            queue!(self.writer, SetAttribute(*attr))?;
        }
        if let Some(fg) = style.fg {
            queue!(self.writer, SetForegroundColor(fg))?;
        }
        if let Some(bg) = style.bg {
            queue!(self.writer, SetBackgroundColor(bg))?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Style parsing
// ---------------------------------------------------------------------------

/// A style string decoded into crossterm terms.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StyleSpec {
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub attrs: Vec<Attribute>,
}

fn named_color(name: &str, bright: bool) -> Option<Color> {
    // The eight base names map to the dark variants; `bright_` selects the
    // vivid ones, matching common terminal palettes.
    match (name, bright) {
        ("black", false) => Some(Color::Black),
        ("black", true) => Some(Color::DarkGrey),
        ("red", false) => Some(Color::DarkRed),
        ("red", true) => Some(Color::Red),
        ("green", false) => Some(Color::DarkGreen),
        ("green", true) => Some(Color::Green),
        ("yellow", false) => Some(Color::DarkYellow),
        ("yellow", true) => Some(Color::Yellow),
        ("blue", false) => Some(Color::DarkBlue),
        ("blue", true) => Some(Color::Blue),
        ("magenta", false) => Some(Color::DarkMagenta),
        ("magenta", true) => Some(Color::Magenta),
        ("cyan", false) => Some(Color::DarkCyan),
        ("cyan", true) => Some(Color::Cyan),
        ("white", false) => Some(Color::Grey),
        ("white", true) => Some(Color::White),
        ("grey" | "gray", _) => Some(Color::Grey),
        _ => None,
    }
}

fn attribute(name: &str) -> Option<Attribute> {
    match name {
        "bold" => Some(Attribute::Bold),
        "dim" => Some(Attribute::Dim),
        "italic" => Some(Attribute::Italic),
        "underline" => Some(Attribute::Underlined),
        "blink" => Some(Attribute::SlowBlink),
        "invert" | "reverse" | "standout" => Some(Attribute::Reverse),
        "strikethrough" => Some(Attribute::CrossedOut),
        _ => None,
    }
}

/// Decode a style token string like `bold_bright_red_on_black`.
///
/// `normal` (or the empty string) decodes to no colors and no attributes.
/// Unknown tokens are ignored rather than failing the frame.
pub fn parse_style(s: &str) -> StyleSpec {
    let mut spec = StyleSpec::default();
    if s.is_empty() || s == "normal" {
        return spec;
    }

    let words: Vec<&str> = s.split('_').collect();
    let split = words.iter().rposition(|&w| w == "on");
    let (fg_words, bg_words) = match split {
        Some(ind) => (&words[..ind], &words[ind + 1..]),
        None => (&words[..], &[][..]),
    };

    let mut bright = false;
    for &word in fg_words {
        if word == "bright" {
            bright = true;
        } else if let Some(attr) = attribute(word) {
            spec.attrs.push(attr);
        } else if let Some(color) = named_color(word, bright) {
            spec.fg = Some(color);
            bright = false;
        }
    }
    let mut bright = false;
    for &word in bg_words {
        if word == "bright" {
            bright = true;
        } else if let Some(color) = named_color(word, bright) {
            spec.bg = Some(color);
            bright = false;
        }
    }
    spec
}

// ===========================================================================
// Tests
// ===========================================================================
