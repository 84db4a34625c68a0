// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for amlforge.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use serde_json::json;

use amlforge::core::cli::{validate_cli, Cli, DiagnosticsSinkConfig, OutputFormat};
use amlforge::core::diagnostics::{Diagnostic, Level};
use amlforge::core::session::Session;

struct DiagnosticsSink {
    writer: Option<Box<dyn Write>>,
}

impl DiagnosticsSink {
    fn from_config(config: &DiagnosticsSinkConfig) -> io::Result<Self> {
        match config {
            DiagnosticsSinkConfig::Disabled => Ok(Self { writer: None }),
            DiagnosticsSinkConfig::Stderr => Ok(Self {
                writer: Some(Box::new(io::stderr())),
            }),
            DiagnosticsSinkConfig::File { path, append } => {
                let mut opts = OpenOptions::new();
                opts.create(true).write(true);
                if *append {
                    opts.append(true);
                } else {
                    opts.truncate(true);
                }
                let file = opts.open(path)?;
                Ok(Self {
                    writer: Some(Box::new(file)),
                })
            }
        }
    }

    fn emit_line(&mut self, line: &str) {
        if let Some(writer) = &mut self.writer {
            let _ = writeln!(writer, "{line}");
        }
    }

    fn emit_diagnostics<'a>(
        &mut self,
        diagnostics: impl Iterator<Item = &'a Diagnostic>,
        file: &Path,
        format: OutputFormat,
    ) {
        for diag in diagnostics {
            self.emit_line(&format_diagnostic_line(diag, file, format));
        }
    }
}

fn level_to_str(level: Level) -> &'static str {
    match level {
        Level::Optimization => "optimization",
        Level::Remark => "remark",
        Level::Warning3 | Level::Warning2 | Level::Warning => "warning",
        Level::Error => "error",
    }
}

fn format_diagnostic_line(diag: &Diagnostic, file: &Path, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        json!({
            "code": diag.code(),
            "severity": level_to_str(diag.level()),
            "message": diag.message(),
            "file": diag.loc().file.clone()
                .unwrap_or_else(|| file.to_string_lossy().to_string()),
            "line": diag.loc().line,
            "column": diag.loc().column,
            "notes": diag.notes(),
        })
        .to_string()
    } else if diag.loc().file.is_some() {
        diag.format()
    } else {
        format!("{}:{}", file.display(), diag.format())
    }
}

fn output_path(input: &Path, out_base: Option<&str>) -> PathBuf {
    match out_base {
        Some(base) => PathBuf::from(format!("{base}.aml")),
        None => input.with_extension("aml"),
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let config = match validate_cli(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    let mut sink = match DiagnosticsSink::from_config(&config.diagnostics_sink) {
        Ok(sink) => sink,
        Err(err) => {
            eprintln!("Failed to open diagnostics sink: {err}");
            std::process::exit(1);
        }
    };

    let mut failed = false;
    for input in &config.input_paths {
        let source = match std::fs::read_to_string(input) {
            Ok(text) => text,
            Err(err) => {
                sink.emit_line(&format!("{}: failed to read input: {err}", input.display()));
                failed = true;
                continue;
            }
        };

        let mut session = Session::new(config.session.clone());
        let result = amlforge::dtc::compile_table(&mut session, &source);

        let has_errors = session.diagnostics().error_count() > 0;
        if !config.quiet || has_errors || result.is_err() {
            sink.emit_diagnostics(session.diagnostics().iter(), input, config.output_format);
        }

        match result {
            Ok(table) if !has_errors => {
                let out = output_path(input, config.out_base.as_deref());
                if let Err(err) = std::fs::write(&out, &table) {
                    sink.emit_line(&format!("{}: failed to write output: {err}", out.display()));
                    failed = true;
                }
            }
            Ok(_) => failed = true,
            Err(err) => {
                if config.output_format != OutputFormat::Json {
                    sink.emit_line(&format!("{}: {err}", input.display()));
                }
                failed = true;
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amlforge::core::diagnostics::{CompilerError, ErrorKind, SourceLoc};

    #[test]
    fn format_diagnostic_line_json_has_expected_keys() {
        let err = CompilerError::new(ErrorKind::Table, "Unknown subtable type", Some("0x7F"));
        let diag = Diagnostic::new(Level::Error, err, SourceLoc::new(12, 3));
        let line = format_diagnostic_line(&diag, Path::new("madt.dat"), OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&line).expect("valid json");
        assert_eq!(value["code"], "aml501");
        assert_eq!(value["severity"], "error");
        assert_eq!(value["message"], "Unknown subtable type (0x7F)");
        assert_eq!(value["file"], "madt.dat");
        assert_eq!(value["line"], 12);
        assert_eq!(value["column"], 3);
        assert!(value["notes"].is_array());
    }

    #[test]
    fn text_format_prefixes_the_input_file() {
        let err = CompilerError::new(ErrorKind::Table, "Reserved field must be zero", None);
        let diag = Diagnostic::new(Level::Warning, err, SourceLoc::new(4, 1));
        let line = format_diagnostic_line(&diag, Path::new("bert.dat"), OutputFormat::Text);
        assert!(line.starts_with("bert.dat:4: Warning [aml501]"));
    }

    #[test]
    fn output_path_uses_base_or_input_stem() {
        assert_eq!(
            output_path(Path::new("tables/madt.dat"), None),
            PathBuf::from("tables/madt.aml")
        );
        assert_eq!(
            output_path(Path::new("tables/madt.dat"), Some("out")),
            PathBuf::from("out.aml")
        );
    }
}
