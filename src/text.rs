//! Rich-text engine.
//!
//! Raw text may carry style markup of the form `<t s="STYLE">…</t>` (tags
//! nest; the inner style stacks on the outer). Literal `<`, `>` and `&` are
//! written as the entities `&lt;`, `&gt;`, `&amp;`, or pre-escaped with the
//! placeholder codes `\u{1}`, `\u{2}`, `\u{3}` by code that edits raw text
//! (a text-area behavior inserting what the user typed, say) — placeholders
//! are turned into entities right before parsing and turned back into the
//! literal characters by [`TextEngine::get`] with `raw = true`.
//!
//! Parsing strips the markup into a display string plus a map from display
//! index to the style stack in force from that index on. The display string
//! is then wrapped into rows that fit the owning box's content width.

use std::collections::{BTreeMap, HashMap};

use logos::Logos;

use crate::error::{Error, Result};
use crate::style::StyleMap;

/// Placeholder for a literal `<` in raw text.
pub const PLACEHOLDER_LT: char = '\u{1}';
/// Placeholder for a literal `>` in raw text.
pub const PLACEHOLDER_GT: char = '\u{2}';
/// Placeholder for a literal `&` in raw text.
pub const PLACEHOLDER_AMP: char = '\u{3}';

// ---------------------------------------------------------------------------
// Markup lexer
// ---------------------------------------------------------------------------

#[derive(Logos, Debug, Clone, PartialEq)]
enum MarkupToken {
    /// Opening tag with a style attribute, e.g. `<t s="bold_red">`.
    #[regex(r#"<t s="[^"]*">"#)]
    Open,

    #[token("</t>")]
    Close,

    #[token("&lt;")]
    Lt,

    #[token("&gt;")]
    Gt,

    #[token("&amp;")]
    Amp,

    /// Any run of characters free of markup delimiters.
    #[regex(r"[^<&]+")]
    Text,
}

fn open_tag_style(slice: &str) -> &str {
    // The regex guarantees the delimiters; slicing cannot fail.
    slice
        .strip_prefix("<t s=\"")
        .and_then(|s| s.strip_suffix("\">"))
        .unwrap_or("")
}

// ---------------------------------------------------------------------------
// Style inversion
// ---------------------------------------------------------------------------

/// Invert a style token: swap its foreground and background colors.
///
/// "normal" (and the empty string) inverts to "black_on_white". Otherwise
/// the token is split on `_`, the words adjacent to the last `on` are
/// swapped, and a token with no `on` at all gets an `on_` prefix (the color
/// becomes the background).
pub fn invert_style(style: &str) -> String {
    if style.is_empty() || style == "normal" {
        return "black_on_white".to_owned();
    }

    let mut words: Vec<&str> = style.split('_').collect();
    match words.iter().rposition(|w| *w == "on") {
        Some(on) if on > 0 && on + 1 < words.len() => words.swap(on - 1, on + 1),
        Some(_) => {} // malformed ("on" at an edge): leave untouched
        None => {
            // No separator: the sole color becomes the background.
            let last = words.len() - 1;
            let mut out = words[..last].join("_");
            if !out.is_empty() {
                out.push('_');
            }
            out.push_str("on_");
            out.push_str(words[last]);
            return out;
        }
    }

    words.join("_")
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Per-box text settings, snapshotted from the box style at construction.
#[derive(Debug, Clone)]
pub struct TextConfig {
    /// Style used to render the character under the cursor. `None` disables
    /// the cursor entirely.
    pub cursor: Option<String>,
    /// Spaces a tab expands to before parsing.
    pub tab_length: usize,
    /// Base style wrapped around the whole text.
    pub style: String,
    /// Base style while the owning box is active.
    pub style_active: String,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            cursor: None,
            tab_length: 4,
            style: "normal".to_owned(),
            style_active: "normal".to_owned(),
        }
    }
}

impl TextConfig {
    /// Snapshot the `text.*` keys of a box style.
    pub fn from_style(style: &StyleMap) -> Self {
        Self {
            cursor: style
                .get("text.cursor")
                .and_then(|v| v.as_str())
                .map(str::to_owned),
            tab_length: style.int_or("text.tab-length", 4).max(0) as usize,
            style: style.str_or("text.style", "normal").to_owned(),
            style_active: style.str_or("text.style:active", "normal").to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// TextEngine
// ---------------------------------------------------------------------------

/// Parsed, wrapped, cursor-aware text state for one box.
#[derive(Debug, Clone, Default)]
pub struct TextEngine {
    /// Raw text, markup included. Stored as chars: every index below is a
    /// character index, never a byte offset.
    raw: Vec<char>,
    /// Display text with markup stripped and entities decoded.
    display: Vec<char>,
    /// Display index → style stack in force from that index on
    /// ("normal" filtered out).
    style_map: BTreeMap<usize, Vec<String>>,
    /// Wrapped rows of the display text.
    rows: Vec<String>,
    /// Row index → display index of the row's first character.
    row_starts: HashMap<usize, usize>,
    row_width: i32,
    /// Cursor position in raw text; −1 means "at the end".
    cursor: isize,
    config: TextConfig,
}

impl TextEngine {
    pub fn new(text: &str, config: TextConfig) -> Self {
        let mut engine = Self {
            cursor: -1,
            config,
            ..Self::default()
        };
        if engine.config.cursor.is_some() {
            // A trailing space gives the cursor a cell to sit on at the
            // end of the text.
            engine.set(&format!("{text} "));
        } else {
            engine.set(text);
        }
        engine
    }

    /// Replace the raw text. The cursor is clamped into the new text; the
    /// display state stays stale until the next [`parse`](Self::parse).
    pub fn set(&mut self, text: &str) {
        self.raw = text.chars().collect();
        self.cursor = self.cursor.min(self.raw.len() as isize - 1);
    }

    /// Raw text (placeholders decoded) or the parsed display text.
    pub fn get(&self, raw: bool) -> String {
        if raw {
            self.raw
                .iter()
                .map(|&c| match c {
                    PLACEHOLDER_LT => '<',
                    PLACEHOLDER_GT => '>',
                    PLACEHOLDER_AMP => '&',
                    c => c,
                })
                .collect()
        } else {
            self.display.iter().collect()
        }
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn cursor(&self) -> isize {
        self.cursor
    }

    pub fn config(&self) -> &TextConfig {
        &self.config
    }

    /// Move the cursor horizontally, clamped to the raw text.
    pub fn move_cursor(&mut self, delta: isize) {
        self.cursor = (self.cursor + delta).clamp(0, (self.raw.len() as isize - 1).max(0));
    }

    /// Edit the raw text.
    ///
    /// [`TextOp::Insert`] places a string at `pos` (or overwrites the same
    /// number of characters there when `overwrite` is set); the cursor then
    /// moves by `mv`, defaulting to +1. [`TextOp::Delete`] removes one
    /// character at `pos + delta` (−1 = backspace, 0 = delete under the
    /// position) and moves the cursor by the same delta. A cursor-enabled
    /// text always keeps its trailing space.
    pub fn modify(&mut self, op: TextOp<'_>, pos: usize, overwrite: bool, mv: Option<isize>) {
        match op {
            TextOp::Insert(s) => {
                let add: Vec<char> = s.chars().collect();
                let pos = pos.min(self.raw.len());
                if overwrite {
                    let end = (pos + add.len()).min(self.raw.len());
                    self.raw.splice(pos..end, add);
                } else {
                    self.raw.splice(pos..pos, add);
                }
                self.move_cursor(mv.unwrap_or(1));
            }
            TextOp::Delete(delta) => {
                let at = pos as isize + delta;
                if at >= 0 && (at as usize) < self.raw.len() {
                    self.raw.remove(at as usize);
                }
                self.move_cursor(delta);
            }
        }

        if self.raw.last() != Some(&' ') {
            self.raw.push(' ');
        }
    }

    /// [`modify`](Self::modify) at the cursor position.
    pub fn modify_by_cursor(&mut self, op: TextOp<'_>, overwrite: bool, mv: Option<isize>) {
        let pos = if self.cursor < 0 {
            self.raw.len().saturating_sub(1)
        } else {
            self.cursor as usize
        };
        self.modify(op, pos, overwrite, mv);
    }

    /// Parse markup and rewrap for a content area `width` cells wide.
    ///
    /// `active` selects the active base style. Malformed markup fails the
    /// whole update and leaves raw text untouched.
    pub fn parse(&mut self, active: bool, width: i32) -> Result<()> {
        self.display.clear();
        self.style_map.clear();

        if self.raw.is_empty() {
            self.rows.clear();
            self.row_starts.clear();
            return Ok(());
        }

        let src = self
            .with_cursor()
            .replace('\t', &" ".repeat(self.config.tab_length))
            .replace(PLACEHOLDER_LT, "&lt;")
            .replace(PLACEHOLDER_GT, "&gt;")
            .replace(PLACEHOLDER_AMP, "&amp;");

        let base = if active {
            self.config.style_active.clone()
        } else {
            self.config.style.clone()
        };

        let mut stack: Vec<String> = vec![base];
        self.record_stack(&stack);

        let mut lexer = MarkupToken::lexer(&src);
        while let Some(token) = lexer.next() {
            match token {
                Ok(MarkupToken::Open) => {
                    let style = open_tag_style(lexer.slice());
                    if style.is_empty() {
                        // An empty style inherits the enclosing one.
                        let top = stack.last().cloned().unwrap_or_default();
                        stack.push(top);
                    } else {
                        stack.push(style.to_owned());
                    }
                    self.record_stack(&stack);
                }
                Ok(MarkupToken::Close) => {
                    if stack.len() <= 1 {
                        return Err(Error::Markup("unbalanced closing tag".to_owned()));
                    }
                    stack.pop();
                    self.record_stack(&stack);
                }
                Ok(MarkupToken::Lt) => self.display.push('<'),
                Ok(MarkupToken::Gt) => self.display.push('>'),
                Ok(MarkupToken::Amp) => self.display.push('&'),
                Ok(MarkupToken::Text) => self.display.extend(lexer.slice().chars()),
                Err(()) => {
                    return Err(Error::Markup(format!(
                        "unexpected character at offset {}",
                        lexer.span().start
                    )))
                }
            }
        }

        if stack.len() != 1 {
            return Err(Error::Markup("unclosed tag".to_owned()));
        }
        stack.pop();
        self.record_stack(&stack);

        self.update_rows(width);
        Ok(())
    }

    /// Style of the display character at `(col, row)`.
    ///
    /// Scans backward from the position, through earlier columns and then
    /// earlier rows, for the nearest recorded style stack. An `invert`
    /// marker found there is consumed (it fires once per parse) and the
    /// invert transform is applied on top.
    pub fn style_at(&mut self, col: usize, row: usize) -> String {
        let mut style = String::from("normal");
        let mut inverted = false;

        'rows: for i in (0..=row).rev() {
            let start = match self.row_starts.get(&i) {
                Some(&s) => s,
                None => continue,
            };
            let col_start = if i == row {
                col
            } else {
                self.rows
                    .get(i)
                    .map(|r| r.chars().count().saturating_sub(1))
                    .unwrap_or(0)
            };

            for j in (0..=col_start).rev() {
                if let Some(stack) = self.style_map.get_mut(&(start + j)) {
                    if stack.iter().any(|s| s == "invert") {
                        stack.retain(|s| s != "invert");
                        inverted = true;
                    }
                    style = stack.join("_");
                    break 'rows;
                }
            }
        }

        if style.is_empty() {
            style = "normal".to_owned();
        }

        if inverted {
            invert_style(&style)
        } else {
            style
        }
    }

    // --- internals -----------------------------------------------------

    fn record_stack(&mut self, stack: &[String]) {
        let filtered: Vec<String> = stack.iter().filter(|s| *s != "normal").cloned().collect();
        self.style_map.insert(self.display.len(), filtered);
    }

    /// Raw text with the cursor character wrapped in a cursor-style tag.
    /// Resolves a pending end-of-text cursor to a concrete index.
    fn with_cursor(&mut self) -> String {
        let style = match &self.config.cursor {
            Some(style) => style.clone(),
            None => return self.raw.iter().collect(),
        };

        if self.cursor < 0 {
            self.cursor = self.raw.len() as isize - 1;
        }
        let at = (self.cursor.max(0) as usize).min(self.raw.len() - 1);

        let pre: String = self.raw[..at].iter().collect();
        let post: String = self.raw[at + 1..].iter().collect();
        format!("{pre}<t s=\"{style}\">{}</t>{post}", self.raw[at])
    }

    /// Greedy word wrap of the display text into rows of `width` cells.
    ///
    /// Tokens are words with their following space attached; a token wider
    /// than a whole row is hard-split at the width. Records each row's
    /// starting display index for style lookup.
    fn update_rows(&mut self, width: i32) {
        self.rows.clear();
        self.row_starts.clear();
        self.row_width = width;

        if width <= 0 {
            return;
        }
        let width = width as usize;

        let display: String = self.display.iter().collect();
        let mut text_ind = 0usize;

        for line in display.split('\n') {
            self.row_starts.insert(self.rows.len(), text_ind);
            let mut row = String::new();

            let mut words: Vec<String> = line.split(' ').map(str::to_owned).collect();
            let word_count = words.len();

            let mut i = 0;
            while i < word_count {
                let attached_space = i < word_count - 1;
                let mut word = words[i].clone();
                if attached_space {
                    word.push(' ');
                }

                let lr = row.chars().count();
                let lw = word.chars().count();

                if lw <= width - lr {
                    row.push_str(&word);
                    text_ind += lw;
                    i += 1;
                } else if lr == 0 {
                    // The token alone is wider than a row: hard-split it.
                    row.extend(word.chars().take(width));
                    text_ind += width;
                    self.rows.push(std::mem::take(&mut row));
                    self.row_starts.insert(self.rows.len(), text_ind);

                    let mut rest: String = word.chars().skip(width).collect();
                    if attached_space {
                        rest.pop(); // drop the space; it is re-attached above
                    }
                    words[i] = rest;
                } else {
                    self.rows.push(std::mem::take(&mut row));
                    self.row_starts.insert(self.rows.len(), text_ind);
                }
            }

            text_ind += 1; // the newline itself
            self.rows.push(row);
        }
    }
}

/// An edit applied to raw text.
#[derive(Debug, Clone, Copy)]
pub enum TextOp<'a> {
    /// Insert (or overwrite with) a string.
    Insert(&'a str),
    /// Delete one character at `pos + delta`.
    Delete(isize),
}

// ===========================================================================
// Tests
// ===========================================================================
