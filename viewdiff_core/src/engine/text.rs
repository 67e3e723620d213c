use similar::{ChangeTag, TextDiff};
use std::borrow::Cow;

/// One line of a line-based diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub old_line: Option<usize>,
    pub new_line: Option<usize>,
    pub content: String,
    pub change_type: DiffChangeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffChangeType {
    Equal,
    Insert,
    Delete,
}

/// Line diff of text leaves
#[derive(Debug, Clone)]
pub struct TextDiffEngine {
    /// Unchanged lines kept around each hunk
    context_radius: usize,
    /// Normalize line endings (CRLF vs LF)
    normalize_line_endings: bool,
}

impl Default for TextDiffEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextDiffEngine {
    pub fn new() -> Self {
        Self {
            context_radius: 3,
            normalize_line_endings: true,
        }
    }

    pub fn with_context_radius(mut self, radius: usize) -> Self {
        self.context_radius = radius;
        self
    }

    fn preprocess<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if self.normalize_line_endings && text.contains('\r') {
            Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
        } else {
            Cow::Borrowed(text)
        }
    }

    /// Compare two texts line by line with the Myers algorithm
    pub fn compare_lines(&self, old: &str, new: &str) -> Vec<DiffLine> {
        let old = self.preprocess(old);
        let new = self.preprocess(new);
        let diff = TextDiff::from_lines(old.as_ref(), new.as_ref());

        let mut old_line_num = 1;
        let mut new_line_num = 1;
        let mut result = Vec::new();

        for change in diff.iter_all_changes() {
            let (change_type, old_line, new_line) = match change.tag() {
                ChangeTag::Equal => {
                    let lines = (DiffChangeType::Equal, Some(old_line_num), Some(new_line_num));
                    old_line_num += 1;
                    new_line_num += 1;
                    lines
                }
                ChangeTag::Insert => {
                    let lines = (DiffChangeType::Insert, None, Some(new_line_num));
                    new_line_num += 1;
                    lines
                }
                ChangeTag::Delete => {
                    let lines = (DiffChangeType::Delete, Some(old_line_num), None);
                    old_line_num += 1;
                    lines
                }
            };

            result.push(DiffLine {
                old_line,
                new_line,
                content: change.to_string().trim_end_matches('\n').to_string(),
                change_type,
            });
        }

        result
    }

    /// Unified diff of the two texts, headed by the leaf name
    pub fn unified(&self, name: &str, old: &str, new: &str) -> String {
        let old = self.preprocess(old);
        let new = self.preprocess(new);
        let diff = TextDiff::from_lines(old.as_ref(), new.as_ref());

        diff.unified_diff()
            .context_radius(self.context_radius)
            .header(
                &format!("{} (Previous Version)", name),
                &format!("{} (Current Version)", name),
            )
            .to_string()
    }
}
