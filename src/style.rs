//! Declarative style storage.
//!
//! Every box owns a [`StyleMap`] resolved once at construction: the default
//! table below, overlaid with the values declared in the box spec, then
//! back-filled with `:active` variants. Keys are dotted paths into nested
//! maps (`"text.cursor"`). Reads are pure — a miss returns `None` and never
//! creates intermediate nodes; only [`StyleMap::set`] creates them.
//!
//! Style *strings* ("bold_red_on_white", "normal") are opaque tokens here;
//! only the terminal driver interprets them.

use std::collections::HashMap;

use crate::geometry::{DeclaredRect, Margin};

/// Sentinel for `z-index`: inherit `parent z + 1` at construction.
pub const Z_INHERIT: i64 = i64::MIN;

/// Keys that resolve through their `:active` variant while the owning box
/// is active.
pub const ACTIVE_VARIANT_KEYS: [&str; 3] = ["background", "background-style", "border-style"];

/// A single style value.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Char(char),
    Rect(DeclaredRect),
    Margin(Margin),
    Pair(i32, i32),
    Map(StyleMap),
}

impl StyleValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            StyleValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match *self {
            StyleValue::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match *self {
            StyleValue::Float(v) => Some(v),
            StyleValue::Int(v) => Some(v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            StyleValue::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_char(&self) -> Option<char> {
        match *self {
            StyleValue::Char(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_rect(&self) -> Option<&DeclaredRect> {
        match self {
            StyleValue::Rect(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_margin(&self) -> Option<&Margin> {
        match self {
            StyleValue::Margin(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_pair(&self) -> Option<(i32, i32)> {
        match *self {
            StyleValue::Pair(a, b) => Some((a, b)),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&StyleMap> {
        match self {
            StyleValue::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl From<&str> for StyleValue {
    fn from(v: &str) -> Self {
        StyleValue::Str(v.to_owned())
    }
}

impl From<String> for StyleValue {
    fn from(v: String) -> Self {
        StyleValue::Str(v)
    }
}

impl From<i64> for StyleValue {
    fn from(v: i64) -> Self {
        StyleValue::Int(v)
    }
}

impl From<f64> for StyleValue {
    fn from(v: f64) -> Self {
        StyleValue::Float(v)
    }
}

impl From<bool> for StyleValue {
    fn from(v: bool) -> Self {
        StyleValue::Bool(v)
    }
}

impl From<char> for StyleValue {
    fn from(v: char) -> Self {
        StyleValue::Char(v)
    }
}

impl From<DeclaredRect> for StyleValue {
    fn from(v: DeclaredRect) -> Self {
        StyleValue::Rect(v)
    }
}

impl From<Margin> for StyleValue {
    fn from(v: Margin) -> Self {
        StyleValue::Margin(v)
    }
}

impl From<(i32, i32)> for StyleValue {
    fn from(v: (i32, i32)) -> Self {
        StyleValue::Pair(v.0, v.1)
    }
}

/// Nested key → value store with dotted-path access.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StyleMap {
    entries: HashMap<String, StyleValue>,
}

impl StyleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a dotted path. Never creates nodes.
    pub fn get(&self, path: &str) -> Option<&StyleValue> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        let mut value = self.entries.get(first)?;
        for part in parts {
            value = value.as_map()?.entries.get(part)?;
        }
        Some(value)
    }

    /// Set a dotted path, creating intermediate maps as needed.
    ///
    /// A non-map value along the path is replaced by a map.
    pub fn set(&mut self, path: &str, value: impl Into<StyleValue>) {
        let mut parts: Vec<&str> = path.split('.').collect();
        let last = match parts.pop() {
            Some(last) => last,
            None => return,
        };
        let mut map = self;
        for part in parts {
            let entry = map
                .entries
                .entry(part.to_owned())
                .or_insert_with(|| StyleValue::Map(StyleMap::new()));
            if !matches!(entry, StyleValue::Map(_)) {
                *entry = StyleValue::Map(StyleMap::new());
            }
            map = match entry {
                StyleValue::Map(m) => m,
                _ => unreachable!(),
            };
        }
        map.entries.insert(last.to_owned(), value.into());
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Overlay `other` on top of this map, replacing top-level entries.
    pub fn merge(&mut self, other: StyleMap) {
        for (key, value) in other.entries {
            self.entries.insert(key, value);
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    // --- typed accessors with defaults ---------------------------------

    pub fn str_or<'a>(&'a self, path: &str, default: &'a str) -> &'a str {
        self.get(path).and_then(StyleValue::as_str).unwrap_or(default)
    }

    pub fn int_or(&self, path: &str, default: i64) -> i64 {
        self.get(path).and_then(StyleValue::as_int).unwrap_or(default)
    }

    pub fn float_or(&self, path: &str, default: f64) -> f64 {
        self.get(path).and_then(StyleValue::as_float).unwrap_or(default)
    }

    pub fn bool_or(&self, path: &str, default: bool) -> bool {
        self.get(path).and_then(StyleValue::as_bool).unwrap_or(default)
    }

    pub fn char_or(&self, path: &str, default: char) -> char {
        self.get(path).and_then(StyleValue::as_char).unwrap_or(default)
    }
}

/// The default style table every box starts from.
pub fn default_style() -> StyleMap {
    let mut s = StyleMap::new();
    s.set("z-index", Z_INHERIT);
    s.set("visible", true);
    s.set("border", false);
    s.set("border-style", "normal");
    s.set("rect", DeclaredRect::fill());
    s.set("margin", Margin::ZERO);
    s.set("active", false);
    s.set("scroll-pos", StyleValue::Pair(0, 0));
    s.set("scroll-x", true);
    s.set("scroll-y", true);
    s.set("background", ' ');
    s.set("background-style", "normal");
    s.set("text.tab-length", 4);
    s.set("text.style", "normal");
    s.set("tab-index", -1);
    s.set("deactivate-key", "KEY_ESCAPE");
    s.set("scroll-up-key", "KEY_PGUP");
    s.set("scroll-down-key", "KEY_PGDOWN");
    s.set("navigate-forwards", "KEY_DOWN");
    s.set("navigate-backwards", "KEY_UP");
    s.set("align-x", "left");
    s.set("align-y", "top");
    s.set("stretch-ratio", 0.0);
    s
}

/// Back-fill unset `:active` variants from their base keys.
///
/// Runs once during box construction, after the spec overlay is merged.
pub fn backfill_active_variants(style: &mut StyleMap) {
    for key in ACTIVE_VARIANT_KEYS {
        let variant = format!("{key}:active");
        if !style.contains(&variant) {
            if let Some(base) = style.get(key).cloned() {
                style.set(&variant, base);
            }
        }
    }
    if !style.contains("text.style:active") {
        if let Some(base) = style.get("text.style").cloned() {
            style.set("text.style:active", base);
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Dim;

    // ── dotted-path access ───────────────────────────────────────────

    #[test]
    fn set_then_get_nested() {
        let mut s = StyleMap::new();
        s.set("text.cursor", "invert");
        assert_eq!(s.get("text.cursor").and_then(StyleValue::as_str), Some("invert"));
    }

    #[test]
    fn get_never_creates_nodes() {
        let s = StyleMap::new();
        assert!(s.get("a.b.c").is_none());
        // A second read still misses: nothing was vivified.
        assert!(s.get("a").is_none());
    }

    #[test]
    fn get_through_non_map_misses() {
        let mut s = StyleMap::new();
        s.set("a", 1i64);
        assert!(s.get("a.b").is_none());
    }

    #[test]
    fn set_replaces_non_map_on_path() {
        let mut s = StyleMap::new();
        s.set("a", 1i64);
        s.set("a.b", 2i64);
        assert_eq!(s.int_or("a.b", 0), 2);
    }

    #[test]
    fn merge_replaces_top_level() {
        let mut base = default_style();
        let mut overlay = StyleMap::new();
        overlay.set("border", true);
        base.merge(overlay);
        assert!(base.bool_or("border", false));
        // Untouched defaults survive.
        assert_eq!(base.str_or("deactivate-key", ""), "KEY_ESCAPE");
    }

    // ── defaults ─────────────────────────────────────────────────────

    #[test]
    fn default_table_values() {
        let s = default_style();
        assert_eq!(s.int_or("z-index", 0), Z_INHERIT);
        assert!(s.bool_or("visible", false));
        assert!(!s.bool_or("border", true));
        assert_eq!(s.char_or("background", 'x'), ' ');
        assert_eq!(s.int_or("tab-index", 0), -1);
        assert_eq!(s.int_or("text.tab-length", 0), 4);
        let rect = s.get("rect").and_then(StyleValue::as_rect).copied();
        assert_eq!(rect.map(|r| r.width), Some(Dim::Ratio(1.0)));
    }

    // ── :active back-fill ────────────────────────────────────────────

    #[test]
    fn backfill_copies_base_values() {
        let mut s = default_style();
        s.set("background-style", "red_on_white");
        backfill_active_variants(&mut s);
        assert_eq!(s.str_or("background-style:active", ""), "red_on_white");
        assert_eq!(s.char_or("background:active", 'x'), ' ');
    }

    #[test]
    fn backfill_keeps_explicit_variant() {
        let mut s = default_style();
        s.set("border-style", "blue");
        s.set("border-style:active", "bold_blue");
        backfill_active_variants(&mut s);
        assert_eq!(s.str_or("border-style:active", ""), "bold_blue");
    }
}
