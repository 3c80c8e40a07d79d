//! High-level compile pipeline.
//!
//! 1. Lex and parse every source file.
//! 2. Run the semantic passes ([`crate::semantic::analyze`]).
//! 3. When no errors were reported, run composition analysis.
//!
//! The pipeline never panics on bad input: all failures surface as
//! [`CompileError`]s on the result.

use crate::ast::Program;
use crate::composition::{analyze_composition, Composition};
use crate::error::{CompileError, DiagnosticFormatter, ErrorCode, ErrorReporter};
use crate::foundation::{SourceMap, Span};
use crate::parser;
use crate::semantic::{self, Context};
use std::path::{Path, PathBuf};

/// A fully analyzed program.
#[derive(Debug)]
pub struct CheckedProgram {
    pub context: Context,
    pub composition: Option<Composition>,
}

/// Outcome of a compilation: the checked program when analysis succeeded,
/// plus all diagnostics and the source map for rendering them.
#[derive(Debug)]
pub struct CompileResult {
    pub program: Option<CheckedProgram>,
    pub errors: Vec<CompileError>,
    pub source_map: SourceMap,
}

impl CompileResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Render all diagnostics with source context.
    pub fn format_diagnostics(&self) -> String {
        DiagnosticFormatter::new(&self.source_map).format_all(&self.errors)
    }
}

/// Compile a single in-memory source text.
pub fn compile_source(name: &str, source: &str) -> CompileResult {
    compile_sources(vec![(PathBuf::from(name), source.to_string())], 0)
}

/// Compile one or more source files from disk.
pub fn compile_files(paths: &[PathBuf], max_errors: usize) -> CompileResult {
    let mut sources = Vec::new();
    let mut source_map = SourceMap::new();
    let mut errors = Vec::new();
    for path in paths {
        match std::fs::read_to_string(path) {
            Ok(text) => sources.push((path.clone(), text)),
            Err(e) => errors.push(CompileError::new(
                ErrorCode::Syntax,
                Span::zero(0),
                format!("cannot read {}: {}", path.display(), e),
            )),
        }
    }
    if !errors.is_empty() {
        for (path, text) in sources {
            source_map.add_file(path, text);
        }
        return CompileResult {
            program: None,
            errors,
            source_map,
        };
    }
    compile_sources(sources, max_errors)
}

fn compile_sources(sources: Vec<(PathBuf, String)>, max_errors: usize) -> CompileResult {
    let mut source_map = SourceMap::new();
    let mut program = Program::default();
    let mut errors = Vec::new();

    for (path, text) in sources {
        let file_id = source_map.add_file(path.clone(), text);
        let text = &source_map.file(&Span::zero(file_id)).source;
        match parser::parse_source(text, file_id) {
            Ok(parsed) => program.decls.extend(parsed.decls),
            Err(parse_errors) => {
                tracing::debug!(
                    file = %path.display(),
                    count = parse_errors.len(),
                    "parse failed"
                );
                errors.extend(parse_errors.into_iter().map(|e| {
                    CompileError::new(ErrorCode::Syntax, e.span, e.message)
                }));
            }
        }
    }

    if !errors.is_empty() {
        return CompileResult {
            program: None,
            errors,
            source_map,
        };
    }

    let mut reporter = ErrorReporter::with_limit(max_errors);
    let context = semantic::analyze(&program, &mut reporter);
    if reporter.count() > 0 {
        return CompileResult {
            program: None,
            errors: reporter.into_errors(),
            source_map,
        };
    }

    let composition = analyze_composition(&context, &mut reporter);
    tracing::info!(
        instances = composition.instances.len(),
        nodes = composition.nodes.len(),
        errors = reporter.count(),
        "composition analyzed"
    );
    if reporter.count() > 0 {
        return CompileResult {
            program: None,
            errors: reporter.into_errors(),
            source_map,
        };
    }

    CompileResult {
        program: Some(CheckedProgram {
            context,
            composition: Some(composition),
        }),
        errors: Vec::new(),
        source_map,
    }
}

/// Convenience entry point for a directory-free single file.
pub fn compile_file(path: &Path) -> CompileResult {
    compile_files(&[path.to_path_buf()], 0)
}
