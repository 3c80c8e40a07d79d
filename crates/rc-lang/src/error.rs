//! Structured error reporting for the RC compiler.
//!
//! Every constraint failure in the compiler is a [`CompileError`] recorded on
//! an [`ErrorReporter`]; no pass unwinds or exits. The driver inspects the
//! reporter's count at phase boundaries and decides whether to continue.
//!
//! - `ErrorCode` — stable `Exxx` codes, one per diagnosable condition
//! - `CompileError` — code + span + message + optional notes
//! - `ErrorReporter` — ordered collection with a stop-after-N limit
//! - `DiagnosticFormatter` — renders diagnostics with source snippets

use crate::foundation::{SourceMap, Span};
use std::fmt;

/// Stable diagnostic codes.
///
/// The numeric values are part of the tool's observable output (tests match
/// on them), so variants are never renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // Built-in templates
    FuncExpectsCount = 1,
    FuncExpectsArg = 2,

    // Kind and type mismatch
    CannotBeApplied = 3,
    Undefined = 4,
    Hidden = 5,
    RequiresValueOrVariable = 6,
    RequiresType = 7,

    // Mutability and escape
    LeaksPointers = 8,

    // Lexing and parsing
    Syntax = 9,

    // Control contexts
    CannotCallPushPort = 28,
    PullPortNotInReadContext = 29,
    CallInMutableSection = 30,
    InitializerNotInInitializer = 31,
    GetterNotInReadContext = 32,

    // Composition
    MultiplyBoundReaction = 71,
    RecursiveComposition = 72,
    IndexOutOfRange = 75,
    RecursiveType = 87,
    NegativePortIndex = 100,

    // Declarations
    Redefined = 110,
    NotAssignable = 113,
    UnboundPullPort = 118,
    MultiplyBoundPullPort = 119,
    NonDeterministicPull = 120,
    TargetNotMutable = 121,
    NotConvertible = 122,
    SignatureNotForeignSafe = 123,
    NotRepresentable = 124,
    SliceOutOfRange = 125,
    RequiresConstant = 126,
    NotCallable = 127,
    ActivateNotInActionOrReaction = 128,
    ActivateNested = 129,
    ReturnTypeMismatch = 130,
    NoInitializer = 131,
    WrongNumberOfInitializers = 132,
    MissingType = 133,
    NonDeterministicActivation = 137,
    NonDeterministicPushPort = 138,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", *self as u16)
    }
}

/// A single compilation diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub code: ErrorCode,
    pub span: Span,
    pub message: String,
    /// Additional context lines (e.g. "first defined here").
    pub notes: Vec<String>,
}

impl CompileError {
    pub fn new(code: ErrorCode, span: Span, message: impl Into<String>) -> Self {
        Self {
            code,
            span,
            message: message.into(),
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error: {} ({})", self.message, self.code)
    }
}

impl std::error::Error for CompileError {}

/// Collects diagnostics in report order.
///
/// When the configured limit is reached, further reports are dropped but the
/// count keeps advancing, so the current top-level construct can finish
/// checking before the driver aborts the pipeline.
#[derive(Debug, Default)]
pub struct ErrorReporter {
    errors: Vec<CompileError>,
    suppressed: usize,
    limit: usize,
}

impl ErrorReporter {
    /// A reporter with no limit.
    pub fn new() -> Self {
        Self::with_limit(0)
    }

    /// A reporter that stops recording after `limit` errors (0 = unlimited).
    pub fn with_limit(limit: usize) -> Self {
        Self {
            errors: Vec::new(),
            suppressed: 0,
            limit,
        }
    }

    /// Record a diagnostic. Returns its code for convenient tail-reporting.
    pub fn report(&mut self, error: CompileError) -> ErrorCode {
        let code = error.code;
        if self.limit != 0 && self.errors.len() >= self.limit {
            self.suppressed += 1;
        } else {
            self.errors.push(error);
        }
        code
    }

    /// Total number of errors seen, including suppressed ones.
    pub fn count(&self) -> usize {
        self.errors.len() + self.suppressed
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn errors(&self) -> &[CompileError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<CompileError> {
        self.errors
    }

    /// True if any recorded error carries `code`.
    pub fn has(&self, code: ErrorCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }
}

/// Renders diagnostics with file/line/column headers and source carets.
pub struct DiagnosticFormatter<'a> {
    sources: &'a SourceMap,
}

impl<'a> DiagnosticFormatter<'a> {
    pub fn new(sources: &'a SourceMap) -> Self {
        Self { sources }
    }

    pub fn format(&self, error: &CompileError) -> String {
        let mut out = String::new();
        out.push_str(&format!("error: {} ({})\n", error.message, error.code));

        if self.sources.file_count() > error.span.file_id as usize {
            let (line, col) = self.sources.line_col(&error.span);
            let path = self.sources.file_path(&error.span);
            out.push_str(&format!("  --> {}:{}:{}\n", path.display(), line, col));

            let file = self.sources.file(&error.span);
            if let Some(text) = file.line_text(line) {
                out.push_str(&format!("{:4} | {}\n", line, text));
                let width = (error.span.end.saturating_sub(error.span.start)).max(1) as usize;
                let width = width.min(text.len().saturating_sub(col as usize - 1).max(1));
                out.push_str(&format!(
                    "     | {}{}\n",
                    " ".repeat(col as usize - 1),
                    "^".repeat(width)
                ));
            }
        }

        for note in &error.notes {
            out.push_str(&format!("     = note: {}\n", note));
        }
        out
    }

    pub fn format_all(&self, errors: &[CompileError]) -> String {
        errors
            .iter()
            .map(|e| self.format(e))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn span() -> Span {
        Span::new(0, 8, 11, 1)
    }

    #[test]
    fn codes_display_with_prefix() {
        assert_eq!(ErrorCode::LeaksPointers.to_string(), "E8");
        assert_eq!(ErrorCode::RecursiveComposition.to_string(), "E72");
        assert_eq!(ErrorCode::NonDeterministicPushPort.to_string(), "E138");
    }

    #[test]
    fn reporter_counts_and_limits() {
        let mut er = ErrorReporter::with_limit(2);
        for _ in 0..4 {
            er.report(CompileError::new(ErrorCode::Undefined, span(), "no such name"));
        }
        assert_eq!(er.count(), 4);
        assert_eq!(er.errors().len(), 2);
        assert!(er.has(ErrorCode::Undefined));
        assert!(!er.has(ErrorCode::Hidden));
    }

    #[test]
    fn formatter_includes_location_and_caret() {
        let mut sources = SourceMap::new();
        sources.add_file(PathBuf::from("t.rc"), "var x = foo".to_string());
        let err = CompileError::new(ErrorCode::Undefined, span(), "foo is not defined")
            .with_note("names must be declared before use");

        let text = DiagnosticFormatter::new(&sources).format(&err);
        assert!(text.contains("foo is not defined (E4)"));
        assert!(text.contains("t.rc:1:9"));
        assert!(text.contains("var x = foo"));
        assert!(text.contains("^^^"));
        assert!(text.contains("note: names must be declared"));
    }
}
