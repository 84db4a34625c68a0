// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Semantic analysis over the resolved parse tree.
//!
//! Runs in a fixed order: per-method flow checks, return-type inference,
//! operand typechecking, and finally the reserved-name contract checks,
//! which need the inferred types.

pub mod method;
pub mod predefined;
pub mod typecheck;
pub mod typing;

use crate::core::diagnostics::CompilerError;
use crate::core::session::Session;
use crate::namespace::Namespace;
use crate::tree::ParseTree;

/// Run all semantic analysis passes.
pub fn analyze(
    session: &mut Session,
    tree: &mut ParseTree,
    ns: &mut Namespace,
) -> Result<(), CompilerError> {
    method::analyze_methods(session, tree)?;
    typing::infer_return_types(tree, ns)?;
    typecheck::check_operands(session, tree, ns)?;
    predefined::check_predefined_names(session, tree, ns)?;
    Ok(())
}
