//! Line-oriented view of a text file
//!
//! Line mutations never touch raw bytes directly: the file is parsed into a
//! [`TextDocument`], edited as a list of lines, and rendered back. Every line
//! keeps its own terminator, so lines outside an edited range come back
//! byte-for-byte even in files that mix `\n` and `\r\n`.

use std::ops::RangeInclusive;

/// Line terminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    /// Most common terminator in `content`; LF on a tie or when there is none
    #[must_use]
    pub fn detect(content: &str) -> Self {
        let crlf = content.matches("\r\n").count();
        let lf = content.matches('\n').count() - crlf;
        if crlf > lf {
            Self::CrLf
        } else {
            Self::Lf
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Line {
    body: String,
    eol: Option<LineEnding>,
}

impl Line {
    fn parse(piece: &str) -> Self {
        let (body, eol) = if let Some(body) = piece.strip_suffix("\r\n") {
            (body, Some(LineEnding::CrLf))
        } else if let Some(body) = piece.strip_suffix('\n') {
            (body, Some(LineEnding::Lf))
        } else {
            (piece, None)
        };
        Self {
            body: body.to_owned(),
            eol,
        }
    }
}

/// Parsed text file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDocument {
    lines: Vec<Line>,
    ending: LineEnding,
    trailing_newline: bool,
}

impl TextDocument {
    /// Split content into lines
    ///
    /// Empty content counts as zero lines ending in a newline, so the first
    /// insertion into an empty file produces a terminated line.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        Self {
            lines: content.split_inclusive('\n').map(Line::parse).collect(),
            ending: LineEnding::detect(content),
            trailing_newline: content.is_empty() || content.ends_with('\n'),
        }
    }

    /// Number of lines
    #[inline]
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Line by 1-based number, without its terminator
    #[must_use]
    pub fn line(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|idx| self.lines.get(idx))
            .map(|line| line.body.as_str())
    }

    /// Dominant terminator of the file
    #[inline]
    #[must_use]
    pub fn line_ending(&self) -> LineEnding {
        self.ending
    }

    #[inline]
    #[must_use]
    pub fn has_trailing_newline(&self) -> bool {
        self.trailing_newline
    }

    /// Replace the 1-based inclusive `range` with `replacement`
    ///
    /// New lines take the terminator of the first replaced line. The caller
    /// validates the range.
    pub fn splice(&mut self, range: RangeInclusive<usize>, replacement: Vec<String>) {
        let start = range.start().saturating_sub(1);
        let end = (*range.end()).min(self.lines.len());
        let eol = self.ending_near(start);
        self.lines
            .splice(start..end, replacement.into_iter().map(|body| Line { body, eol: Some(eol) }));
        self.seal(eol);
    }

    /// Insert `block` after 1-based line `after` (0 = before the first line)
    ///
    /// New lines take the terminator of the line they follow.
    pub fn insert_after(&mut self, after: usize, block: Vec<String>) {
        let at = after.min(self.lines.len());
        let eol = self.ending_near(at.saturating_sub(1));
        self.lines
            .splice(at..at, block.into_iter().map(|body| Line { body, eol: Some(eol) }));
        self.seal(eol);
    }

    /// Remove the 1-based inclusive `range`
    pub fn remove(&mut self, range: RangeInclusive<usize>) {
        self.splice(range, Vec::new());
    }

    /// Render back to text
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.body);
            if let Some(eol) = line.eol {
                out.push_str(eol.as_str());
            }
        }
        out
    }

    /// Terminator of line `idx`, else of the line before it, else the dominant one
    fn ending_near(&self, idx: usize) -> LineEnding {
        self.lines
            .get(idx)
            .and_then(|line| line.eol)
            .or_else(|| {
                idx.checked_sub(1)
                    .and_then(|prev| self.lines.get(prev))
                    .and_then(|line| line.eol)
            })
            .unwrap_or(self.ending)
    }

    /// Every line but the last is terminated; the last follows the file's
    /// original trailing-newline state
    fn seal(&mut self, fill: LineEnding) {
        let trailing_newline = self.trailing_newline;
        let Some((last, rest)) = self.lines.split_last_mut() else {
            return;
        };
        for line in rest.iter_mut().filter(|line| line.eol.is_none()) {
            line.eol = Some(fill);
        }
        if !trailing_newline {
            last.eol = None;
        } else if last.eol.is_none() {
            last.eol = Some(fill);
        }
    }
}

/// Split caller-supplied text into lines; empty text is zero lines
#[must_use]
pub fn split_block(text: &str) -> Vec<String> {
    text.lines().map(str::to_owned).collect()
}

/// Leading spaces and tabs of `line`
#[must_use]
pub fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}

/// Re-indent `block` so its shallowest non-blank line starts at `indent`
///
/// Blank lines are emitted empty.
#[must_use]
pub fn reindent(block: &[String], indent: &str) -> Vec<String> {
    let common = common_indent(block);
    block
        .iter()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                let body = line.strip_prefix(common.as_str()).unwrap_or(line.as_str());
                format!("{indent}{body}")
            }
        })
        .collect()
}

fn common_indent(block: &[String]) -> String {
    let mut common: Option<&str> = None;
    for line in block.iter().filter(|l| !l.trim().is_empty()) {
        let ws = leading_whitespace(line);
        common = Some(match common {
            None => ws,
            Some(prev) => {
                let shared = prev
                    .char_indices()
                    .zip(ws.chars())
                    .take_while(|((_, a), b)| a == b)
                    .last()
                    .map_or(0, |((i, c), _)| i + c.len_utf8());
                &prev[..shared]
            }
        });
    }
    common.unwrap_or_default().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn owned(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn parse_and_render_roundtrip_preserves_shape() {
        for content in ["", "a", "a\n", "a\nb", "a\nb\n", "a\r\nb\r\n", "\n\n"] {
            assert_eq!(TextDocument::parse(content).render(), content, "{content:?}");
        }
    }

    #[test]
    fn mixed_endings_roundtrip() {
        let content = "a\nb\r\nc\n\r\nd";
        assert_eq!(TextDocument::parse(content).render(), content);
    }

    #[test]
    fn crlf_is_detected() {
        let doc = TextDocument::parse("x\r\ny\r\n");
        assert_eq!(doc.line_ending(), LineEnding::CrLf);
        assert_eq!(doc.line_count(), 2);
        assert_eq!(doc.line(2), Some("y"));
        assert_eq!(doc.line(0), None);
        assert_eq!(doc.line(3), None);
    }

    #[test]
    fn splice_replaces_range() {
        let mut doc = TextDocument::parse("1\n2\n3\n4\n");
        doc.splice(2..=3, owned(&["X", "Y", "Z"]));
        assert_eq!(doc.render(), "1\nX\nY\nZ\n4\n");
    }

    #[test]
    fn insert_at_start_and_end() {
        let mut doc = TextDocument::parse("a\nb\n");
        doc.insert_after(0, owned(&["top"]));
        doc.insert_after(3, owned(&["bottom"]));
        assert_eq!(doc.render(), "top\na\nb\nbottom\n");
    }

    #[test]
    fn insert_into_empty_file_terminates_line() {
        let mut doc = TextDocument::parse("");
        doc.insert_after(0, owned(&["first"]));
        assert_eq!(doc.render(), "first\n");
    }

    #[test]
    fn missing_trailing_newline_is_kept() {
        let mut doc = TextDocument::parse("a\nb");
        doc.remove(1..=1);
        assert_eq!(doc.render(), "b");
    }

    #[test]
    fn crlf_survives_edits() {
        let mut doc = TextDocument::parse("a\r\nb\r\n");
        doc.insert_after(1, owned(&["new"]));
        assert_eq!(doc.render(), "a\r\nnew\r\nb\r\n");
    }

    #[test]
    fn mixed_endings_outside_range_are_untouched() {
        let mut doc = TextDocument::parse("a\nb\nc\r\nd\n");
        assert_eq!(doc.line_ending(), LineEnding::Lf);
        doc.splice(4..=4, owned(&["D"]));
        assert_eq!(doc.render(), "a\nb\nc\r\nD\n");

        let mut doc = TextDocument::parse("a\nb\r\nc\n");
        doc.remove(1..=1);
        assert_eq!(doc.render(), "b\r\nc\n");
    }

    #[test]
    fn inserted_lines_follow_the_preceding_terminator() {
        let mut doc = TextDocument::parse("a\nb\r\nc\n");
        doc.insert_after(2, owned(&["x", "y"]));
        assert_eq!(doc.render(), "a\nb\r\nx\r\ny\r\nc\n");

        let mut doc = TextDocument::parse("a\r\nb\n");
        doc.insert_after(0, owned(&["top"]));
        assert_eq!(doc.render(), "top\r\na\r\nb\n");
    }

    #[test]
    fn appending_after_unterminated_last_line() {
        let mut doc = TextDocument::parse("a\r\nb");
        doc.insert_after(2, owned(&["c"]));
        assert_eq!(doc.render(), "a\r\nb\r\nc");
    }

    #[test]
    fn deleting_everything_yields_empty() {
        let mut doc = TextDocument::parse("a\nb\n");
        doc.remove(1..=2);
        assert_eq!(doc.render(), "");
    }

    #[test]
    fn split_block_treats_empty_as_no_lines() {
        assert!(split_block("").is_empty());
        assert_eq!(split_block("a\nb\n"), owned(&["a", "b"]));
        assert_eq!(split_block("a\r\n\r\nb"), owned(&["a", "", "b"]));
    }

    #[test]
    fn reindent_strips_common_prefix() {
        let block = owned(&["    if x {", "        y();", "", "    }"]);
        let out = reindent(&block, "\t");
        assert_eq!(out, owned(&["\tif x {", "\t    y();", "", "\t}"]));
    }

    #[test]
    fn reindent_unindented_block() {
        let out = reindent(&owned(&["a", "  b"]), "  ");
        assert_eq!(out, owned(&["  a", "    b"]));
    }

    #[test]
    fn leading_whitespace_mixes_tabs_and_spaces() {
        assert_eq!(leading_whitespace("\t  x"), "\t  ");
        assert_eq!(leading_whitespace("x  "), "");
        assert_eq!(leading_whitespace("   "), "   ");
    }
}
