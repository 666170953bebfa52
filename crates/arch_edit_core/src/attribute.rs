//! The attribute-text engine: line-oriented diff/merge over sparse
//! `key value` override buffers.
//!
//! An object's attribute text holds only its deltas from the default
//! archetype. Reads scan the object's own lines first and fall back to the
//! default's lines via [`AttrText::diff`], so the merged view is never
//! materialized unless a caller asks for it. Within one buffer the *last*
//! line with a matching key wins - the format is append-only and hand-edited,
//! and repeated edits simply stack new lines on top of old ones.

/// A sparse attribute buffer: `key value` lines, one per line.
///
/// The buffer is kept as raw text rather than a parsed map. Duplicate keys
/// are legal and resolved last-wins at read time, which preserves the
/// override order of successive edits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttrText {
    text: String,
}

impl AttrText {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer from existing text.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Append raw text. The caller supplies the trailing newline, matching
    /// how parsed lines are accumulated.
    pub fn append(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Append one `key value` line, adding the newline.
    pub fn append_line(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');
    }

    /// Drop all lines.
    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// Replace the whole buffer.
    pub fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// The raw buffer contents.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Number of non-empty lines.
    pub fn line_count(&self) -> usize {
        self.text.split('\n').filter(|l| !l.trim().is_empty()).count()
    }

    /// Look up the integer value of `key`, falling back to `default` when
    /// this buffer has no line for it.
    ///
    /// The last matching line wins. A value that does not parse as an
    /// integer yields 0, as does a missing key - malformed hand-edited data
    /// never becomes an error here.
    pub fn value_of(&self, key: &str, default: Option<&AttrText>) -> i32 {
        let mut result = 0;
        let prefix = format!("{} ", key.trim());
        let mut scan = |text: &str| {
            for raw in text.split('\n') {
                let line = raw.trim();
                if let Some(rest) = line.strip_prefix(&prefix) {
                    result = rest.trim().parse::<i32>().unwrap_or(0);
                }
            }
        };
        scan(&self.text);
        if let Some(def) = default {
            scan(&self.diff(def.as_str(), true));
        }
        result
    }

    /// Look up the string value of `key`, falling back to `default` when
    /// this buffer has no line for it.
    ///
    /// The last matching line wins; a missing key yields the empty string,
    /// never an error. A line holding the bare key with no value also reads
    /// as empty.
    pub fn string_of(&self, key: &str, default: Option<&AttrText>) -> String {
        let mut result = String::new();
        let prefix = format!("{} ", key.trim());
        let mut scan = |text: &str| {
            for raw in text.split('\n') {
                let line = raw.trim();
                if let Some(rest) = line.strip_prefix(&prefix) {
                    result = rest.trim().to_string();
                }
            }
        };
        scan(&self.text);
        if let Some(def) = default {
            scan(&self.diff(def.as_str(), true));
        }
        result
    }

    /// Collect every line of `other` that has no counterpart in this buffer.
    ///
    /// With `ignore_values` a line counts as present when this buffer has
    /// *any* line with the same key token, whatever its value; lines of
    /// `other` that carry no value part are never taken. Without
    /// `ignore_values` the entire line (key and value) must match exactly.
    ///
    /// Appending the result to this buffer materializes the inheritance from
    /// `other` without touching any key this buffer already overrides.
    pub fn diff(&self, other: &str, ignore_values: bool) -> String {
        let mut result = String::new();
        for raw in other.split('\n') {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if ignore_values {
                // Only lines with a real value part can be inherited.
                match line.find(' ') {
                    Some(pos) if pos > 0 => {
                        let key_token = &line[..pos + 1];
                        if self.find_line(key_token, true).is_none() {
                            result.push_str(line);
                            result.push('\n');
                        }
                    }
                    _ => {}
                }
            } else if self.find_line(line, false).is_none() {
                result.push_str(line);
                result.push('\n');
            }
        }
        result
    }

    /// Find the first own line matching `token`: by key token (trailing
    /// space included) when `by_key`, else by the whole trimmed line.
    fn find_line(&self, token: &str, by_key: bool) -> Option<&str> {
        for raw in self.text.split('\n') {
            let line = raw.trim();
            if by_key {
                // A line without a space has no key token and shadows nothing.
                if let Some(pos) = line.find(' ') {
                    if &line[..pos + 1] == token {
                        return Some(line);
                    }
                }
            } else if line == token {
                return Some(line);
            }
        }
        None
    }
}

impl std::fmt::Display for AttrText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_line_wins() {
        let text = AttrText::from_text("hp 5\nhp 10\n");
        assert_eq!(text.value_of("hp", None), 10);
    }

    #[test]
    fn test_missing_key_is_zero() {
        let text = AttrText::from_text("hp 5\n");
        assert_eq!(text.value_of("missing_key", None), 0);
        assert_eq!(text.string_of("missing_key", None), "");
    }

    #[test]
    fn test_bad_value_is_zero() {
        let text = AttrText::from_text("hp five\n");
        assert_eq!(text.value_of("hp", None), 0);
        // A later bad value overrides an earlier good one.
        let text = AttrText::from_text("hp 5\nhp x\n");
        assert_eq!(text.value_of("hp", None), 0);
    }

    #[test]
    fn test_no_trailing_newline() {
        let text = AttrText::from_text("hp 7");
        assert_eq!(text.value_of("hp", None), 7);
    }

    #[test]
    fn test_fallback_to_default() {
        let own = AttrText::from_text("name Bob\n");
        let def = AttrText::from_text("name Default\nhp 10\n");
        assert_eq!(own.string_of("name", Some(&def)), "Bob");
        assert_eq!(own.value_of("hp", Some(&def)), 10);
    }

    #[test]
    fn test_read_is_idempotent() {
        let own = AttrText::from_text("level 3\n");
        let def = AttrText::from_text("level 1\nac 5\n");
        let first = own.string_of("ac", Some(&def));
        let second = own.string_of("ac", Some(&def));
        assert_eq!(first, second);
        assert_eq!(first, "5");
    }

    #[test]
    fn test_diff_by_key() {
        let own = AttrText::from_text("hp 5\n");
        let diff = own.diff("hp 10\nsp 3\n", true);
        assert_eq!(diff, "sp 3\n");
    }

    #[test]
    fn test_diff_exact_line() {
        let own = AttrText::from_text("hp 5\n");
        let diff = own.diff("hp 5\nhp 10\n", false);
        assert_eq!(diff, "hp 10\n");
    }

    #[test]
    fn test_diff_skips_valueless_lines() {
        let own = AttrText::new();
        assert_eq!(own.diff("no_pass\nhp 4\n", true), "hp 4\n");
    }

    #[test]
    fn test_valueless_own_line_shadows_nothing() {
        let own = AttrText::from_text("hp\n");
        assert_eq!(own.diff("hp 10\n", true), "hp 10\n");
    }

    #[test]
    fn test_diff_materializes_inheritance() {
        let own = AttrText::from_text("hp 5\n");
        let def = AttrText::from_text("hp 1\nsp 2\nlevel 9\n");

        let mut merged = own.clone();
        merged.append(&own.diff(def.as_str(), true));

        for key in ["hp", "sp", "level"] {
            assert_eq!(merged.value_of(key, None), own.value_of(key, Some(&def)));
        }
    }

    #[test]
    fn test_merged_text_reparses_equal() {
        let own = AttrText::from_text("hp 5\ntitle hero\n");
        let def = AttrText::from_text("hp 10\nac 2\nname Default\n");

        let mut merged = own.as_str().to_string();
        merged.push_str(&own.diff(def.as_str(), true));
        let fresh = AttrText::from_text(&merged);

        for key in ["hp", "title", "ac", "name"] {
            assert_eq!(fresh.string_of(key, Some(&def)), own.string_of(key, Some(&def)));
            assert_eq!(fresh.string_of(key, None), own.string_of(key, Some(&def)));
        }
    }

    #[test]
    fn test_whitespace_tolerant_scan() {
        let text = AttrText::from_text("  hp 12  \n");
        assert_eq!(text.value_of("hp", None), 12);
        assert_eq!(text.string_of("hp", None), "12");
    }
}
