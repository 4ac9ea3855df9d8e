//! Unified diff rendering
//!
//! Produces the human-reviewable preview attached to every proposal. Lines are
//! compared with their terminators, so a dropped final newline shows up as a
//! change followed by a `\ No newline at end of file` marker.

use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};

/// Rendered diff plus counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffPreview {
    /// Unified diff text; empty when old and new are identical
    pub unified: String,
    /// Number of hunks
    pub hunks: usize,
    /// Lines added
    pub added: usize,
    /// Lines removed
    pub removed: usize,
}

impl DiffPreview {
    /// Whether the diff carries no changes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hunks == 0
    }
}

/// Render a unified diff between `old` and `new`
///
/// `label` appears in the `---`/`+++` headers. `context` is the number of
/// unchanged lines kept around each change.
#[must_use]
pub fn unified_diff(label: &str, old: &str, new: &str, context: usize) -> DiffPreview {
    if old == new {
        return DiffPreview::default();
    }

    let diff = TextDiff::from_lines(old, new);
    let hunks = diff
        .grouped_ops(context)
        .iter()
        .filter(|group| !group.is_empty())
        .count();
    let (mut added, mut removed) = (0, 0);
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => added += 1,
            ChangeTag::Delete => removed += 1,
            ChangeTag::Equal => {}
        }
    }

    let unified = diff
        .unified_diff()
        .context_radius(context)
        .header(&format!("a/{label}"), &format!("b/{label}"))
        .to_string();

    DiffPreview {
        unified,
        hunks,
        added,
        removed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn numbered(n: usize) -> String {
        (1..=n).map(|i| format!("{i}\n")).collect()
    }

    /// Rebuild the new text from a single full-context hunk
    fn new_side(old: &str, diff: &DiffPreview) -> String {
        if diff.is_empty() {
            return old.to_string();
        }
        diff.unified
            .lines()
            .skip(3)
            .filter_map(|line| line.strip_prefix(' ').or_else(|| line.strip_prefix('+')))
            .map(|line| format!("{line}\n"))
            .collect()
    }

    fn with_line(text: &str, line_no: usize, replacement: &str) -> String {
        text.lines()
            .enumerate()
            .map(|(i, l)| {
                if i + 1 == line_no {
                    format!("{replacement}\n")
                } else {
                    format!("{l}\n")
                }
            })
            .collect()
    }

    #[test]
    fn identical_inputs_produce_empty_preview() {
        let text = numbered(5);
        let diff = unified_diff("f.txt", &text, &text, 3);
        assert!(diff.is_empty());
        assert_eq!(diff, DiffPreview::default());
    }

    #[test]
    fn single_line_replacement() {
        let old = numbered(5);
        let new = "1\n2\nX\n4\n5\n";
        let diff = unified_diff("f.txt", &old, new, 3);

        let expected = "\
--- a/f.txt
+++ b/f.txt
@@ -1,5 +1,5 @@
 1
 2
-3
+X
 4
 5
";
        assert_eq!(diff.unified, expected);
        assert_eq!(diff.hunks, 1);
        assert_eq!(diff.added, 1);
        assert_eq!(diff.removed, 1);
    }

    #[test]
    fn context_limits_hunk() {
        let old = numbered(20);
        let new = with_line(&old, 10, "ten");
        let diff = unified_diff("f.txt", &old, &new, 2);

        let expected = "\
--- a/f.txt
+++ b/f.txt
@@ -8,5 +8,5 @@
 8
 9
-10
+ten
 11
 12
";
        assert_eq!(diff.unified, expected);
    }

    #[test]
    fn distant_changes_form_separate_hunks() {
        let old = numbered(30);
        let new = with_line(&with_line(&old, 2, "two"), 28, "twenty-eight");
        let diff = unified_diff("f.txt", &old, &new, 3);
        assert_eq!(diff.hunks, 2);
        assert!(diff.unified.contains("@@ -1,5 +1,5 @@"));
        assert!(diff.unified.contains("@@ -25,6 +25,6 @@"));
    }

    #[test]
    fn nearby_changes_merge() {
        let old = numbered(12);
        let new = with_line(&with_line(&old, 4, "four"), 8, "eight");
        let diff = unified_diff("f.txt", &old, &new, 3);
        assert_eq!(diff.hunks, 1);
        assert_eq!(diff.added, 2);
        assert_eq!(diff.removed, 2);
    }

    #[test]
    fn insertion_into_empty_file() {
        let diff = unified_diff("empty.txt", "", "hello\n", 3);
        assert!(diff.unified.contains("@@ -0,0 +1 @@"));
        assert!(diff.unified.ends_with("+hello\n"));
        assert_eq!(diff.added, 1);
        assert_eq!(diff.removed, 0);
    }

    #[test]
    fn deleting_everything() {
        let diff = unified_diff("f.txt", "a\nb\n", "", 3);
        assert!(diff.unified.contains("@@ -1,2 +0,0 @@"));
        assert_eq!(diff.removed, 2);
    }

    #[test]
    fn pure_insertion_header_counts() {
        let old = numbered(3);
        let new = "1\n2\nnew\n3\n";
        let diff = unified_diff("f.txt", &old, new, 0);
        assert!(diff.unified.contains("@@ -2,0 +3 @@"));
    }

    #[test]
    fn missing_final_newline_is_marked() {
        let diff = unified_diff("f.txt", "a\nb\n", "a\nb", 3);
        assert_eq!(diff.hunks, 1);
        assert!(diff.unified.contains("-b\n+b\n\\ No newline at end of file\n"));
    }

    #[test]
    fn crlf_lines_keep_their_terminators() {
        let diff = unified_diff("f.txt", "a\r\nb\r\n", "a\r\nc\r\n", 3);
        assert!(diff.unified.contains(" a\r\n-b\r\n+c\r\n"));
        assert_eq!((diff.added, diff.removed), (1, 1));
    }

    #[test]
    fn fully_rewritten_file_is_one_hunk() {
        let old: String = (0..2100).map(|i| format!("old {i}\n")).collect();
        let new: String = (0..2100).map(|i| format!("new {i}\n")).collect();
        let diff = unified_diff("big.txt", &old, &new, 3);
        assert_eq!(diff.hunks, 1);
        assert_eq!(diff.removed, 2100);
        assert_eq!(diff.added, 2100);
        assert!(diff.unified.contains("@@ -1,2100 +1,2100 @@"));
    }

    proptest! {
        #[test]
        fn counts_match_line_delta(
            old in prop::collection::vec("[abc]{0,2}", 0..12),
            new in prop::collection::vec("[abc]{0,2}", 0..12),
        ) {
            let old_text: String = old.iter().map(|l| format!("{l}\n")).collect();
            let new_text: String = new.iter().map(|l| format!("{l}\n")).collect();
            let diff = unified_diff("p.txt", &old_text, &new_text, 3);

            prop_assert_eq!(diff.is_empty(), old_text == new_text);
            prop_assert_eq!(
                old.len() as isize - diff.removed as isize,
                new.len() as isize - diff.added as isize
            );
        }

        #[test]
        fn full_context_diff_reconstructs_new(
            old in prop::collection::vec("[ab]{0,2}", 0..10),
            new in prop::collection::vec("[ab]{0,2}", 0..10),
        ) {
            let old_text: String = old.iter().map(|l| format!("{l}\n")).collect();
            let new_text: String = new.iter().map(|l| format!("{l}\n")).collect();
            let diff = unified_diff("p.txt", &old_text, &new_text, 100);
            prop_assert_eq!(new_side(&old_text, &diff), new_text);
        }
    }
}
