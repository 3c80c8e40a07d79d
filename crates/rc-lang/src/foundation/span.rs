//! Source location tracking for diagnostics.
//!
//! - `Span` — compact byte range in a single source file
//! - `SourceMap` — all source files of a compilation, with lookup operations
//! - `SourceFile` — one source file with a line-start index

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Compact source location reference.
///
/// Points at a byte range in one file of the [`SourceMap`]. The starting line
/// is cached so error headers can be printed without a line lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Index into `SourceMap::files`.
    pub file_id: u16,
    /// Byte offset of the first covered byte.
    pub start: u32,
    /// Byte offset one past the last covered byte.
    pub end: u32,
    /// 1-based line number of `start`.
    pub line: u32,
}

impl Span {
    pub fn new(file_id: u16, start: u32, end: u32, line: u32) -> Self {
        Self {
            file_id,
            start,
            end,
            line,
        }
    }

    /// Zero-length span at the start of a file.
    pub fn zero(file_id: u16) -> Self {
        Self::new(file_id, 0, 0, 1)
    }

    /// Span covering both `self` and `other`.
    ///
    /// # Panics
    /// Panics if the spans come from different files.
    pub fn merge(&self, other: &Span) -> Span {
        assert_eq!(
            self.file_id, other.file_id,
            "cannot merge spans from different files"
        );
        Span {
            file_id: self.file_id,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line: self.line.min(other.line),
        }
    }
}

/// All source files of a compilation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

/// A single source file with precomputed line starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: PathBuf,
    pub source: String,
    /// Byte offset of each line start; the final entry is an EOF sentinel.
    line_starts: Vec<u32>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source file and return its id.
    pub fn add_file(&mut self, path: PathBuf, source: String) -> u16 {
        let file_id = self.files.len();
        assert!(file_id < u16::MAX as usize, "too many source files");
        self.files.push(SourceFile::new(path, source));
        file_id as u16
    }

    pub fn file(&self, span: &Span) -> &SourceFile {
        &self.files[span.file_id as usize]
    }

    pub fn file_path(&self, span: &Span) -> &Path {
        &self.files[span.file_id as usize].path
    }

    /// The source text covered by `span`.
    pub fn snippet(&self, span: &Span) -> &str {
        let file = self.file(span);
        &file.source[span.start as usize..span.end as usize]
    }

    /// 1-based (line, column) of the span's start.
    pub fn line_col(&self, span: &Span) -> (u32, u32) {
        self.file(span).line_col(span.start)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

impl SourceFile {
    pub fn new(path: PathBuf, source: String) -> Self {
        let line_starts = line_starts(&source);
        Self {
            path,
            source,
            line_starts,
        }
    }

    /// 1-based (line, column) of a byte offset.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        debug_assert!(offset <= self.source.len() as u32);
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.max(1) - 1,
        };
        let line_idx = line_idx.min(self.line_starts.len().saturating_sub(2));
        ((line_idx + 1) as u32, offset - self.line_starts[line_idx] + 1)
    }

    /// Text of a 1-based line, without its terminator.
    pub fn line_text(&self, line: u32) -> Option<&str> {
        if line == 0 || line as usize >= self.line_starts.len() {
            return None;
        }
        let start = self.line_starts[(line - 1) as usize] as usize;
        let end = self.line_starts[line as usize] as usize;
        Some(self.source[start..end].trim_end_matches(['\n', '\r']))
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len() - 1
    }
}

fn line_starts(source: &str) -> Vec<u32> {
    let mut starts = vec![0];
    for (idx, ch) in source.char_indices() {
        if ch == '\n' {
            starts.push((idx + 1) as u32);
        }
    }
    if starts.last() != Some(&(source.len() as u32)) {
        starts.push(source.len() as u32);
    }
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_merge_covers_both() {
        let a = Span::new(0, 4, 9, 1);
        let b = Span::new(0, 7, 20, 2);
        let m = a.merge(&b);
        assert_eq!((m.start, m.end, m.line), (4, 20, 1));
    }

    #[test]
    #[should_panic(expected = "different files")]
    fn span_merge_rejects_cross_file() {
        let _ = Span::new(0, 0, 1, 1).merge(&Span::new(1, 0, 1, 1));
    }

    #[test]
    fn line_col_lookup() {
        let file = SourceFile::new(PathBuf::from("t.rc"), "instance a\ninstance b\n".to_string());
        assert_eq!(file.line_col(0), (1, 1));
        assert_eq!(file.line_col(11), (2, 1));
        assert_eq!(file.line_col(15), (2, 5));
        assert_eq!(file.line_count(), 2);
    }

    #[test]
    fn line_text_strips_terminator() {
        let file = SourceFile::new(PathBuf::from("t.rc"), "type T int\nvar x T\n".to_string());
        assert_eq!(file.line_text(1), Some("type T int"));
        assert_eq!(file.line_text(2), Some("var x T"));
        assert_eq!(file.line_text(3), None);
    }

    #[test]
    fn snippet_and_path() {
        let mut map = SourceMap::new();
        let id = map.add_file(PathBuf::from("t.rc"), "const k = 42".to_string());
        let span = Span::new(id, 6, 7, 1);
        assert_eq!(map.snippet(&span), "k");
        assert_eq!(map.file_path(&span).to_str(), Some("t.rc"));
        assert_eq!(map.line_col(&span), (1, 7));
    }
}
