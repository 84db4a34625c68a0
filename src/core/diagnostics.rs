// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Error types, diagnostics, and accumulation for the compiler.
//!
//! Diagnostics are collected, not thrown: a pass reports a problem and
//! continues wherever structurally possible, so one compile surfaces as many
//! independent problems as it can. Only internal-consistency violations and
//! exceeding the configured error limit abort a run.

use std::fmt;

/// Severity ladder, least to most severe. The three warning levels map to
/// escalating strictness settings; a configured threshold suppresses levels
/// below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Optimization = 0,
    Remark = 1,
    Warning3 = 2,
    Warning2 = 3,
    Warning = 4,
    Error = 5,
}

impl Level {
    pub fn label(self) -> &'static str {
        match self {
            Level::Optimization => "Optimize",
            Level::Remark => "Remark",
            Level::Warning3 | Level::Warning2 | Level::Warning => "Warning",
            Level::Error => "Error",
        }
    }
}

/// Categories of compiler errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Internal,
    Namespace,
    Resolver,
    Analyzer,
    Codegen,
    Expression,
    Table,
    Io,
}

/// A compiler error with a kind and message.
#[derive(Debug, Clone)]
pub struct CompilerError {
    kind: ErrorKind,
    message: String,
}

impl CompilerError {
    pub fn new(kind: ErrorKind, msg: &str, param: Option<&str>) -> Self {
        Self {
            kind,
            message: format_message(msg, param),
        }
    }

    /// Internal-consistency violation. Always fatal.
    pub fn internal(msg: &str) -> Self {
        Self::new(ErrorKind::Internal, msg, None)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CompilerError {}

/// Source position carried by every parse node and data-table field.
///
/// `logical_line` is the cumulative line number across included sources and
/// is the key diagnostics are ordered by.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLoc {
    pub file: Option<String>,
    pub line: u32,
    pub logical_line: u32,
    pub column: u32,
    pub offset: u32,
}

impl SourceLoc {
    pub fn new(line: u32, column: u32) -> Self {
        Self {
            file: None,
            line,
            logical_line: line,
            column,
            offset: 0,
        }
    }
}

/// A diagnostic message with level, code, and location.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub(crate) level: Level,
    pub(crate) code: String,
    pub(crate) loc: SourceLoc,
    pub(crate) error: CompilerError,
    pub(crate) notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(level: Level, error: CompilerError, loc: SourceLoc) -> Self {
        Self {
            level,
            code: default_diagnostic_code(error.kind()).to_string(),
            loc,
            error,
            notes: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn format(&self) -> String {
        let mut out = match &self.loc.file {
            Some(file) => format!(
                "{file}:{}: {} [{}] - {}",
                self.loc.line,
                self.level.label(),
                self.code,
                self.error.message()
            ),
            None => format!(
                "{}: {} [{}] - {}",
                self.loc.line,
                self.level.label(),
                self.code,
                self.error.message()
            ),
        };
        for note in &self.notes {
            out.push_str("\nnote: ");
            out.push_str(note);
        }
        out
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn code(&self) -> &str {
        self.code.as_str()
    }

    pub fn loc(&self) -> &SourceLoc {
        &self.loc
    }

    pub fn message(&self) -> &str {
        self.error.message()
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }
}

/// Ordered diagnostic accumulator.
///
/// Kept sorted by cumulative source line via merge-insertion; the list is
/// never re-sorted wholesale. Passes emit in roughly ascending order, so the
/// backward scan is short in practice.
#[derive(Debug, Default)]
pub struct DiagnosticList {
    items: Vec<Diagnostic>,
}

impl DiagnosticList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, diag: Diagnostic) {
        let key = diag.loc.logical_line;
        let mut idx = self.items.len();
        while idx > 0 && self.items[idx - 1].loc.logical_line > key {
            idx -= 1;
        }
        self.items.insert(idx, diag);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn count_at(&self, level: Level) -> usize {
        self.items.iter().filter(|d| d.level == level).count()
    }

    pub fn error_count(&self) -> usize {
        self.count_at(Level::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.items
            .iter()
            .filter(|d| {
                matches!(d.level, Level::Warning | Level::Warning2 | Level::Warning3)
            })
            .count()
    }
}

fn default_diagnostic_code(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Internal => "aml001",
        ErrorKind::Namespace => "aml101",
        ErrorKind::Resolver => "aml201",
        ErrorKind::Analyzer => "aml301",
        ErrorKind::Codegen => "aml401",
        ErrorKind::Expression => "aml402",
        ErrorKind::Table => "aml501",
        ErrorKind::Io => "aml601",
    }
}

/// Format an error message with an optional parameter.
pub fn format_message(msg: &str, param: Option<&str>) -> String {
    match param {
        Some(p) => format!("{msg} ({p})"),
        None => msg.to_string(),
    }
}
