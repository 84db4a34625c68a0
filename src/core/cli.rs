// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Command-line interface parsing and argument validation.

use std::env;
use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use crate::core::diagnostics::{CompilerError, ErrorKind, Level};
use crate::core::session::SessionConfig;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const LONG_ABOUT: &str = "ACPI data table compiler.

Inputs are Name : Value table sources as produced by the table-template
generator or the disassembler. Each input compiles to a raw binary table
image named <base>.aml next to the input, or under -o/--outfile when set.
Diagnostics go to stderr by default; use -E/--error to route them to a
file, or --format json for machine-readable output.";

#[derive(Parser, Debug)]
#[command(
    name = "amlforge",
    version = VERSION,
    about = "ACPI data table compiler (Name : Value sources to binary table images)",
    long_about = LONG_ABOUT
)]
pub struct Cli {
    #[arg(
        long = "format",
        value_enum,
        default_value_t = OutputFormat::Text,
        long_help = "Select diagnostic output format. text is default; json emits one object per diagnostic."
    )]
    pub format: OutputFormat,
    #[arg(
        short = 'q',
        long = "quiet",
        action = ArgAction::SetTrue,
        long_help = "Suppress diagnostic output for successful compiles. Errors are still reported unless --no-error is set."
    )]
    pub quiet: bool,
    #[arg(
        short = 'E',
        long = "error",
        value_name = "FILE",
        long_help = "Write diagnostics to FILE instead of stderr."
    )]
    pub error_file: Option<PathBuf>,
    #[arg(
        long = "error-append",
        action = ArgAction::SetTrue,
        requires = "error_file",
        long_help = "Append diagnostics to --error FILE instead of truncating it."
    )]
    pub error_append: bool,
    #[arg(
        long = "no-error",
        action = ArgAction::SetTrue,
        conflicts_with_all = ["error_file", "error_append"],
        long_help = "Disable all diagnostic output routing."
    )]
    pub no_error: bool,
    #[arg(
        short = 'w',
        long = "no-warn",
        action = ArgAction::SetTrue,
        conflicts_with = "warn_error",
        long_help = "Suppress warning and remark diagnostics."
    )]
    pub no_warn: bool,
    #[arg(
        long = "Werror",
        action = ArgAction::SetTrue,
        long_help = "Treat warnings as errors (non-zero exit status)."
    )]
    pub warn_error: bool,
    #[arg(
        long = "no-remarks",
        action = ArgAction::SetTrue,
        long_help = "Suppress remark and optimization diagnostics, keeping warnings."
    )]
    pub no_remarks: bool,
    #[arg(
        long = "max-errors",
        value_name = "N",
        default_value_t = 200,
        long_help = "Abort compilation after N errors. Defaults to 200."
    )]
    pub max_errors: usize,
    #[arg(
        long = "32bit",
        action = ArgAction::SetTrue,
        long_help = "Compile with 32-bit integer width (definition block revision 1 semantics)."
    )]
    pub integer_width_32: bool,
    #[arg(
        long = "truncate-overflow",
        action = ArgAction::SetTrue,
        long_help = "Truncate integers that overflow the configured width and continue with a warning, instead of failing."
    )]
    pub truncate_on_overflow: bool,
    #[arg(
        long = "no-optimize",
        action = ArgAction::SetTrue,
        long_help = "Disable constant folding and the single-byte Zero/One/Ones integer encodings."
    )]
    pub no_optimize: bool,
    #[arg(
        short = 'o',
        long = "outfile",
        value_name = "BASE",
        long_help = "Output filename base. Defaults to the input base; the .aml extension is always added."
    )]
    pub outfile: Option<String>,
    #[arg(
        short = 'i',
        long = "infile",
        value_name = "FILE",
        action = ArgAction::Append,
        long_help = "Input table source file (repeatable)."
    )]
    pub infiles: Vec<PathBuf>,
    #[arg(
        value_name = "INPUT",
        action = ArgAction::Append,
        long_help = "Positional input files, treated like -i INPUT."
    )]
    pub positional_inputs: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum DiagnosticsSinkConfig {
    Stderr,
    File { path: PathBuf, append: bool },
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Validated CLI configuration.
#[derive(Debug)]
pub struct CliConfig {
    pub input_paths: Vec<PathBuf>,
    pub out_base: Option<String>,
    pub quiet: bool,
    pub output_format: OutputFormat,
    pub diagnostics_sink: DiagnosticsSinkConfig,
    pub session: SessionConfig,
}

fn cli_error(message: impl Into<String>) -> CompilerError {
    CompilerError::new(ErrorKind::Io, &message.into(), None)
}

fn parse_env_bool(var_name: &str) -> Result<Option<bool>, CompilerError> {
    let Some(raw) = env::var_os(var_name) else {
        return Ok(None);
    };
    let value = raw.to_string_lossy().trim().to_ascii_lowercase();
    match value.as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        "" => Ok(None),
        _ => Err(cli_error(format!(
            "Invalid boolean value for {var_name}: {value}"
        ))),
    }
}

fn parse_env_usize(var_name: &str) -> Result<Option<usize>, CompilerError> {
    let Some(raw) = env::var_os(var_name) else {
        return Ok(None);
    };
    let value = raw.to_string_lossy().trim().to_string();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<usize>()
        .map(Some)
        .map_err(|_| cli_error(format!("Invalid integer value for {var_name}: {value}")))
}

/// Validate CLI arguments and return parsed configuration. Environment
/// variables fill in anything the command line leaves unset.
pub fn validate_cli(cli: &Cli) -> Result<CliConfig, CompilerError> {
    let env_quiet = parse_env_bool("AMLFORGE_QUIET")?;
    let env_no_warn = parse_env_bool("AMLFORGE_NO_WARN")?;
    let env_warn_error = parse_env_bool("AMLFORGE_WERROR")?;
    let env_max_errors = parse_env_usize("AMLFORGE_MAX_ERRORS")?;

    let input_paths = if !cli.infiles.is_empty() {
        if !cli.positional_inputs.is_empty() {
            return Err(cli_error(
                "Do not mix positional input with -i/--infile; use one style",
            ));
        }
        cli.infiles.clone()
    } else if !cli.positional_inputs.is_empty() {
        cli.positional_inputs.clone()
    } else {
        return Err(cli_error("No input files specified. Use -i/--infile"));
    };

    if input_paths.len() > 1 && cli.outfile.is_some() {
        return Err(cli_error(
            "-o/--outfile is not allowed with multiple inputs",
        ));
    }

    let quiet = cli.quiet || env_quiet.unwrap_or(false);
    let no_warn = cli.no_warn || env_no_warn.unwrap_or(false);
    let warn_error = if no_warn {
        false
    } else {
        cli.warn_error || env_warn_error.unwrap_or(false)
    };
    let max_errors = if cli.max_errors != 200 {
        cli.max_errors
    } else {
        env_max_errors.unwrap_or(cli.max_errors)
    };
    if max_errors == 0 {
        return Err(cli_error("--max-errors must be at least 1"));
    }

    let report_threshold = if no_warn {
        Level::Error
    } else if cli.no_remarks {
        Level::Warning3
    } else {
        Level::Remark
    };

    Ok(CliConfig {
        input_paths,
        out_base: cli.outfile.clone(),
        quiet,
        output_format: cli.format,
        diagnostics_sink: if cli.no_error {
            DiagnosticsSinkConfig::Disabled
        } else if let Some(path) = &cli.error_file {
            DiagnosticsSinkConfig::File {
                path: path.clone(),
                append: cli.error_append,
            }
        } else {
            DiagnosticsSinkConfig::Stderr
        },
        session: SessionConfig {
            integer_width_32: cli.integer_width_32,
            optimize_constants: !cli.no_optimize,
            truncate_on_overflow: cli.truncate_on_overflow,
            report_threshold,
            warnings_as_errors: warn_error,
            max_errors,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::ffi::OsString;
    use std::sync::{Mutex, OnceLock};

    fn with_env_vars(vars: &[(&str, Option<&str>)], test: impl FnOnce()) {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        let _guard = ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .expect("lock env mutex");

        let saved: Vec<(String, Option<OsString>)> = vars
            .iter()
            .map(|(key, _)| (key.to_string(), env::var_os(key)))
            .collect();

        for (key, value) in vars {
            match value {
                Some(value) => {
                    // SAFETY: tests serialize env access via ENV_LOCK.
                    unsafe { env::set_var(key, value) }
                }
                None => {
                    // SAFETY: tests serialize env access via ENV_LOCK.
                    unsafe { env::remove_var(key) }
                }
            }
        }

        test();

        for (key, value) in saved {
            match value {
                Some(value) => {
                    // SAFETY: tests serialize env access via ENV_LOCK.
                    unsafe { env::set_var(key, value) }
                }
                None => {
                    // SAFETY: tests serialize env access via ENV_LOCK.
                    unsafe { env::remove_var(key) }
                }
            }
        }
    }

    #[test]
    fn cli_parses_inputs_and_session_flags() {
        let cli = Cli::parse_from([
            "amlforge",
            "--format",
            "json",
            "-i",
            "madt.dat",
            "-E",
            "diag.log",
            "--error-append",
            "--Werror",
            "--32bit",
            "--truncate-overflow",
            "--no-optimize",
            "--max-errors",
            "50",
            "-o",
            "out",
        ]);
        assert_eq!(cli.infiles, vec![PathBuf::from("madt.dat")]);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.error_file, Some(PathBuf::from("diag.log")));
        assert!(cli.error_append);
        assert!(cli.warn_error);
        assert!(cli.integer_width_32);
        assert!(cli.truncate_on_overflow);
        assert!(cli.no_optimize);
        assert_eq!(cli.max_errors, 50);
        assert_eq!(cli.outfile, Some("out".to_string()));
    }

    #[test]
    fn validate_cli_accepts_positional_inputs() {
        let cli = Cli::parse_from(["amlforge", "madt.dat", "bert.dat"]);
        let config = validate_cli(&cli).expect("validate cli");
        assert_eq!(
            config.input_paths,
            vec![PathBuf::from("madt.dat"), PathBuf::from("bert.dat")]
        );
    }

    #[test]
    fn validate_cli_rejects_mixed_positional_and_infile() {
        let cli = Cli::parse_from(["amlforge", "legacy.dat", "-i", "modern.dat"]);
        let err = validate_cli(&cli).expect_err("should reject mixed input styles");
        assert_eq!(
            err.message(),
            "Do not mix positional input with -i/--infile; use one style"
        );
    }

    #[test]
    fn validate_cli_rejects_outfile_with_multiple_inputs() {
        let cli = Cli::parse_from(["amlforge", "a.dat", "b.dat", "-o", "out"]);
        let err = validate_cli(&cli).expect_err("should reject outfile");
        assert_eq!(err.message(), "-o/--outfile is not allowed with multiple inputs");
    }

    #[test]
    fn validate_cli_requires_an_input() {
        let cli = Cli::parse_from(["amlforge"]);
        let err = validate_cli(&cli).expect_err("should require input");
        assert_eq!(err.message(), "No input files specified. Use -i/--infile");
    }

    #[test]
    fn validate_cli_maps_warning_flags_to_session_config() {
        let cli = Cli::parse_from(["amlforge", "t.dat", "--Werror", "--no-remarks"]);
        let config = validate_cli(&cli).expect("validate cli");
        assert!(config.session.warnings_as_errors);
        assert_eq!(config.session.report_threshold, Level::Warning3);

        let cli = Cli::parse_from(["amlforge", "t.dat", "-w"]);
        let config = validate_cli(&cli).expect("validate cli");
        assert!(!config.session.warnings_as_errors);
        assert_eq!(config.session.report_threshold, Level::Error);
    }

    #[test]
    fn validate_cli_sets_diagnostics_sink() {
        let cli = Cli::parse_from(["amlforge", "t.dat", "-E", "diag.log", "--error-append"]);
        let config = validate_cli(&cli).expect("validate cli");
        match config.diagnostics_sink {
            DiagnosticsSinkConfig::File { path, append } => {
                assert_eq!(path, PathBuf::from("diag.log"));
                assert!(append);
            }
            other => panic!("unexpected diagnostics sink: {other:?}"),
        }

        let cli = Cli::parse_from(["amlforge", "t.dat", "--no-error"]);
        let config = validate_cli(&cli).expect("validate cli");
        assert!(matches!(
            config.diagnostics_sink,
            DiagnosticsSinkConfig::Disabled
        ));
    }

    #[test]
    fn validate_cli_applies_env_defaults_when_cli_not_set() {
        with_env_vars(
            &[
                ("AMLFORGE_QUIET", Some("true")),
                ("AMLFORGE_MAX_ERRORS", Some("25")),
            ],
            || {
                let cli = Cli::parse_from(["amlforge", "t.dat"]);
                let config = validate_cli(&cli).expect("validate cli");
                assert!(config.quiet);
                assert_eq!(config.session.max_errors, 25);
            },
        );
    }

    #[test]
    fn validate_cli_cli_values_override_env_values() {
        with_env_vars(&[("AMLFORGE_MAX_ERRORS", Some("25"))], || {
            let cli = Cli::parse_from(["amlforge", "t.dat", "--max-errors", "10"]);
            let config = validate_cli(&cli).expect("validate cli");
            assert_eq!(config.session.max_errors, 10);
        });
    }

    #[test]
    fn validate_cli_rejects_invalid_env_boolean_value() {
        with_env_vars(&[("AMLFORGE_WERROR", Some("maybe"))], || {
            let cli = Cli::parse_from(["amlforge", "t.dat"]);
            let err = validate_cli(&cli).expect_err("invalid env bool should fail");
            assert!(err
                .message()
                .contains("Invalid boolean value for AMLFORGE_WERROR"));
        });
    }

    #[test]
    fn validate_cli_rejects_zero_max_errors() {
        let cli = Cli::parse_from(["amlforge", "t.dat", "--max-errors", "0"]);
        let err = validate_cli(&cli).expect_err("should reject zero");
        assert_eq!(err.message(), "--max-errors must be at least 1");
    }
}
