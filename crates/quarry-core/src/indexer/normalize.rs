//! Line normalization: strips comments, string literals and template
//! literals so declaration and brace patterns only see code.
//!
//! Stripped spans are removed rather than blanked, so `^`-anchored patterns
//! still see the line's real indentation. Block comments and template
//! literals can span lines; their state is carried in [`NormalizerState`].

use regex::Regex;

const BLOCK_START: &str = "/*";
const BLOCK_END: &str = "*/";

/// Window of continuation lines consulted by [`match_multi_line`].
pub const MULTI_LINE_WINDOW: usize = 16;

/// Carry-over state between consecutive lines of one file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NormalizerState {
    pub in_block_comment: bool,
    pub in_template_literal: bool,
}

/// Normalize one raw line, updating the carried state.
pub fn normalize_line(raw: &str, state: &mut NormalizerState) -> String {
    let line = remove_line_comment(raw);
    let (line, in_comment) = remove_block_comments(line, state.in_block_comment);
    state.in_block_comment = in_comment;

    // A backtick before any quote means the literal owns the quotes inside it.
    let literal_first = state.in_template_literal || backtick_before_quote(&line);
    if literal_first {
        let (line, in_literal) = remove_template_literals(&line, state.in_template_literal);
        state.in_template_literal = in_literal;
        remove_strings(&line)
    } else {
        let line = remove_strings(&line);
        let (line, in_literal) = remove_template_literals(&line, state.in_template_literal);
        state.in_template_literal = in_literal;
        line
    }
}

fn backtick_before_quote(line: &str) -> bool {
    for c in line.chars() {
        match c {
            '`' => return true,
            '\'' | '"' => return false,
            _ => {}
        }
    }
    false
}

/// Cut a `//` comment unless the marker sits inside a quoted span.
pub fn remove_line_comment(line: &str) -> &str {
    let mut from = 0;
    while let Some(offset) = line[from..].find("//") {
        let index = from + offset;
        if !within_string(line, index) {
            return &line[..index];
        }
        from = index + 2;
    }
    line
}

/// Quote-parity check for the position `index` (byte offset).
pub fn within_string(line: &str, index: usize) -> bool {
    let mut open: Option<char> = None;
    for c in line[..index].chars() {
        if matches!(c, '"' | '\'' | '`') {
            match open {
                Some(q) if q == c => open = None,
                Some(_) => {}
                None => open = Some(c),
            }
        }
    }
    open.is_some()
}

/// Remove `/* ... */` spans. Returns the remaining text and whether a block
/// comment is still open at end of line.
pub fn remove_block_comments(line: &str, mut in_comment: bool) -> (String, bool) {
    let target = if in_comment { BLOCK_END } else { BLOCK_START };
    if !line.contains(target) {
        return if in_comment {
            (String::new(), true)
        } else {
            (line.to_string(), false)
        };
    }

    let mut kept = String::with_capacity(line.len());
    let mut cursor = 0;
    loop {
        let target = if in_comment { BLOCK_END } else { BLOCK_START };
        let Some(offset) = line[cursor..].find(target) else {
            break;
        };
        let at = cursor + offset;
        if in_comment {
            in_comment = false;
        } else {
            kept.push_str(&line[cursor..at]);
            in_comment = true;
        }
        cursor = at + target.len();
    }
    if !in_comment {
        kept.push_str(&line[cursor..]);
    }
    (kept, in_comment)
}

/// Drop quoted string contents, quotes included. No escape handling.
pub fn remove_strings(line: &str) -> String {
    if !line.contains(['\'', '"']) {
        return line.to_string();
    }
    let mut kept = String::with_capacity(line.len());
    let mut quote: Option<char> = None;
    for c in line.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None if c == '"' || c == '\'' => quote = Some(c),
            None => kept.push(c),
        }
    }
    kept
}

/// Drop template-literal contents, backticks included.
pub fn remove_template_literals(line: &str, mut in_literal: bool) -> (String, bool) {
    if !line.contains('`') {
        return if in_literal {
            (String::new(), true)
        } else {
            (line.to_string(), false)
        };
    }
    let mut kept = String::with_capacity(line.len());
    for c in line.chars() {
        if c == '`' {
            in_literal = !in_literal;
        } else if !in_literal {
            kept.push(c);
        }
    }
    (kept, in_literal)
}

// ---------------------------------------------------------------------------
// Multi-line continuation matching
// ---------------------------------------------------------------------------

/// Owned capture groups of a successful match (group 0 is the whole match).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineMatch {
    groups: Vec<Option<String>>,
}

impl LineMatch {
    pub fn from_captures(caps: &regex::Captures<'_>) -> Self {
        Self {
            groups: caps
                .iter()
                .map(|g| g.map(|m| m.as_str().to_string()))
                .collect(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.groups.get(index).and_then(|g| g.as_deref())
    }
}

/// Match `full` against `line` directly, as a single-line declaration.
pub fn match_single(full: &Regex, line: &str) -> Option<LineMatch> {
    full.captures(line).map(|caps| LineMatch::from_captures(&caps))
}

/// When `start` matches the line at `line_no`, append following lines (block
/// and `//` comments stripped) one at a time and test `full` after each.
pub fn match_multi_line(
    text: &str,
    line_no: usize,
    lines: &[&str],
    start: &Regex,
    full: &Regex,
) -> Option<LineMatch> {
    if !start.is_match(text) {
        return None;
    }
    let max = (line_no + MULTI_LINE_WINDOW).min(lines.len());
    let mut joined = text.to_string();
    let mut in_comment = false;
    for raw in lines.iter().take(max).skip(line_no + 1) {
        let (stripped, still_open) = remove_block_comments(raw, in_comment);
        in_comment = still_open;
        if in_comment {
            continue;
        }
        let code = stripped.split("//").next().unwrap_or_default();
        joined.push_str(code);
        if let Some(caps) = full.captures(&joined) {
            return Some(LineMatch::from_captures(&caps));
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize_all(lines: &[&str]) -> Vec<String> {
        let mut state = NormalizerState::default();
        lines.iter().map(|l| normalize_line(l, &mut state)).collect()
    }

    #[test]
    fn test_line_comment_outside_string() {
        assert_eq!(remove_line_comment("foo(); // call"), "foo(); ");
        assert_eq!(
            remove_line_comment("const u = 'http://x'; // c"),
            "const u = 'http://x'; "
        );
        assert_eq!(remove_line_comment("const u = 'http://x';"), "const u = 'http://x';");
    }

    #[test]
    fn test_block_comment_spans_lines() {
        let out = normalize_all(&["a /* start", "still comment", "end */ b {", "c"]);
        assert_eq!(out, vec!["a ", "", " b {", "c"]);
    }

    #[test]
    fn test_inline_block_comments() {
        let (text, open) = remove_block_comments("x /* a */ y /* b */ z", false);
        assert_eq!(text, "x  y  z");
        assert!(!open);
    }

    #[test]
    fn test_strings_removed_not_blanked() {
        assert_eq!(remove_strings("f('{', \"}\") {"), "f(, ) {");
    }

    #[test]
    fn test_template_literal_carries_state() {
        let out = normalize_all(&["const t = `line {", "more } text", "done` + 1;"]);
        assert_eq!(out, vec!["const t = ", "", " + 1;"]);
    }

    #[test]
    fn test_quotes_inside_template_literal() {
        let out = normalize_all(&["const t = `it's {`;"]);
        assert_eq!(out, vec!["const t = ;"]);
    }

    #[test]
    fn test_multi_line_match() {
        let start = Regex::new(r"^\s*class\s+(\w+)\b[^{]*$").unwrap();
        let full = Regex::new(r"^\s*class\s+(\w+)\s+extends\s+(\w+)\s*\{").unwrap();
        let lines = vec!["class Dog", "    // parent next", "    extends Animal {", "}"];
        let m = match_multi_line(lines[0], 0, &lines, &start, &full).unwrap();
        assert_eq!(m.get(1), Some("Dog"));
        assert_eq!(m.get(2), Some("Animal"));
    }

    #[test]
    fn test_multi_line_window_is_bounded() {
        let start = Regex::new(r"^f\($").unwrap();
        let full = Regex::new(r"^f\(\)").unwrap();
        let mut lines = vec!["f("];
        lines.extend(std::iter::repeat("").take(MULTI_LINE_WINDOW + 2));
        lines.push(")");
        assert!(match_multi_line(lines[0], 0, &lines, &start, &full).is_none());
    }
}
