// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! amlforge - ASL-to-AML compiler core and ACPI data table compiler.
//!
//! The crate covers the compilation pipeline that runs after tokenization:
//! namespace construction, cross-reference resolution, semantic analysis,
//! AML code generation, and the line-oriented data table compiler. The
//! lexer/parser that produces the initial parse tree is an external
//! collaborator; see `tree` for the input contract.

pub mod analyzer;
pub mod codegen;
pub mod core;
pub mod dtc;
pub mod namespace;
pub mod tree;
