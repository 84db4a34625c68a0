// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Compilation session state.
//!
//! One `Session` owns the configuration and diagnostic list for a single
//! compile. There is no ambient global state: every pass receives the
//! session explicitly alongside the tree or field list it works on.

use crate::core::diagnostics::{
    CompilerError, Diagnostic, DiagnosticList, ErrorKind, Level, SourceLoc,
};

/// Fixed configuration for one compilation.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Table integer width: true for 32-bit (definition block revision 1),
    /// false for full 64-bit integers.
    pub integer_width_32: bool,
    /// Fold integer-constant subtrees and use the single-byte Zero/One/Ones
    /// encodings.
    pub optimize_constants: bool,
    /// On integer-width overflow, truncate and continue instead of failing.
    pub truncate_on_overflow: bool,
    /// Suppress diagnostics below this level.
    pub report_threshold: Level,
    /// Elevate all warnings to errors.
    pub warnings_as_errors: bool,
    /// Abort compilation after this many errors.
    pub max_errors: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            integer_width_32: false,
            optimize_constants: true,
            truncate_on_overflow: false,
            report_threshold: Level::Remark,
            warnings_as_errors: false,
            max_errors: 200,
        }
    }
}

/// One compilation session: configuration plus accumulated diagnostics.
pub struct Session {
    pub config: SessionConfig,
    diagnostics: DiagnosticList,
    /// Count of compiler-generated temporary names handed out, used both to
    /// build unique `_T_x` names and to recognize them as our own.
    temp_name_counter: u32,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            diagnostics: DiagnosticList::new(),
            temp_name_counter: 0,
        }
    }

    pub fn diagnostics(&self) -> &DiagnosticList {
        &self.diagnostics
    }

    /// Report a diagnostic. Returns `Err` only when the configured error
    /// limit has been exceeded, which aborts the compilation.
    pub fn report(&mut self, diag: Diagnostic) -> Result<(), CompilerError> {
        let mut diag = diag;
        if self.config.warnings_as_errors
            && matches!(
                diag.level(),
                Level::Warning | Level::Warning2 | Level::Warning3
            )
        {
            diag.level = Level::Error;
        }
        if diag.level() < self.config.report_threshold {
            return Ok(());
        }
        self.diagnostics.insert(diag);
        if self.diagnostics.error_count() > self.config.max_errors {
            let err = CompilerError::new(
                ErrorKind::Internal,
                "Maximum error count exceeded, aborting",
                Some(&self.config.max_errors.to_string()),
            );
            self.diagnostics
                .insert(Diagnostic::new(Level::Error, err.clone(), SourceLoc::default()));
            return Err(err);
        }
        Ok(())
    }

    pub fn error(
        &mut self,
        kind: ErrorKind,
        msg: &str,
        param: Option<&str>,
        loc: SourceLoc,
    ) -> Result<(), CompilerError> {
        self.report(Diagnostic::new(
            Level::Error,
            CompilerError::new(kind, msg, param),
            loc,
        ))
    }

    pub fn warning(
        &mut self,
        kind: ErrorKind,
        msg: &str,
        param: Option<&str>,
        loc: SourceLoc,
    ) -> Result<(), CompilerError> {
        self.report(Diagnostic::new(
            Level::Warning,
            CompilerError::new(kind, msg, param),
            loc,
        ))
    }

    pub fn remark(
        &mut self,
        kind: ErrorKind,
        msg: &str,
        param: Option<&str>,
        loc: SourceLoc,
    ) -> Result<(), CompilerError> {
        self.report(Diagnostic::new(
            Level::Remark,
            CompilerError::new(kind, msg, param),
            loc,
        ))
    }

    /// Allocate a compiler-internal temporary name (`_T_0` .. `_T_Z`).
    pub fn next_temp_name(&mut self) -> String {
        const SUFFIX: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
        let idx = (self.temp_name_counter as usize) % SUFFIX.len();
        self.temp_name_counter += 1;
        format!("_T_{}", SUFFIX[idx] as char)
    }

    /// True when this session has generated at least one temporary name,
    /// i.e. `_T_x` declarations in the tree can be our own.
    pub fn emitted_temp_names(&self) -> bool {
        self.temp_name_counter > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_suppresses_low_levels() {
        let config = SessionConfig {
            report_threshold: Level::Warning,
            ..Default::default()
        };
        let mut session = Session::new(config);
        session
            .remark(ErrorKind::Analyzer, "below threshold", None, SourceLoc::new(1, 1))
            .unwrap();
        session
            .warning(ErrorKind::Analyzer, "at threshold", None, SourceLoc::new(2, 1))
            .unwrap();
        assert_eq!(session.diagnostics().len(), 1);
        assert_eq!(session.diagnostics().iter().next().unwrap().message(), "at threshold");
    }

    #[test]
    fn warnings_as_errors_elevates() {
        let config = SessionConfig {
            warnings_as_errors: true,
            ..Default::default()
        };
        let mut session = Session::new(config);
        session
            .warning(ErrorKind::Codegen, "elevated", None, SourceLoc::new(1, 1))
            .unwrap();
        assert_eq!(session.diagnostics().error_count(), 1);
        assert_eq!(session.diagnostics().warning_count(), 0);
    }

    #[test]
    fn exceeding_max_errors_is_fatal() {
        let config = SessionConfig {
            max_errors: 2,
            ..Default::default()
        };
        let mut session = Session::new(config);
        for line in 1..=2u32 {
            session
                .error(ErrorKind::Resolver, "bad", None, SourceLoc::new(line, 1))
                .unwrap();
        }
        let result = session.error(ErrorKind::Resolver, "bad", None, SourceLoc::new(3, 1));
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Internal);
    }

    #[test]
    fn temp_names_cycle_through_suffix_alphabet() {
        let mut session = Session::new(SessionConfig::default());
        assert!(!session.emitted_temp_names());
        assert_eq!(session.next_temp_name(), "_T_0");
        assert_eq!(session.next_temp_name(), "_T_1");
        assert!(session.emitted_temp_names());
    }
}
