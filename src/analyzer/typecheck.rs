// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Operand typechecking.
//!
//! Each executable operator declares a required capability class per
//! operand. An operand whose inferred type set has no overlap with the
//! required class is a type mismatch; Locals and Args are wildcards.
//! Method-call operands are checked against the callee's inferred return
//! types, so a call to a value-less method inside an `If` predicate is
//! caught here.

use log::debug;

use crate::core::diagnostics::{CompilerError, ErrorKind};
use crate::core::opcodes::{op_info, AslOp, OpFlags, TypeBits};
use crate::core::session::Session;
use crate::namespace::{Namespace, ObjectType};
use crate::tree::walk::{walk_tree, TreeVisitor, WalkAction, WalkMode};
use crate::tree::{NodeFlags, NodeId, ParseTree};

/// Typecheck every operand of every executable operator in the tree.
pub fn check_operands(
    session: &mut Session,
    tree: &mut ParseTree,
    ns: &Namespace,
) -> Result<(), CompilerError> {
    let Some(root) = tree.root() else {
        return Ok(());
    };
    let mut checker = OperandChecker { session, ns };
    walk_tree(tree, root, WalkMode::Downward, &mut checker)?;
    debug!("operand typecheck complete");
    Ok(())
}

struct OperandChecker<'a> {
    session: &'a mut Session,
    ns: &'a Namespace,
}

impl OperandChecker<'_> {
    /// Inferred type set of one operand node. `None` means the operand is
    /// unknowable here and must not be checked.
    fn operand_types(&self, tree: &ParseTree, node: NodeId) -> Option<TypeBits> {
        if tree.node(node).flags.contains(NodeFlags::UNRESOLVED) {
            return None;
        }
        match tree.node(node).op {
            AslOp::LocalRef(_) | AslOp::ArgRef(_) => None,
            AslOp::MethodCall => {
                let target = tree.node(node).ns_node?;
                Some(crate::analyzer::typing::call_value_types(self.ns, target))
            }
            AslOp::NamePath => {
                let target = tree.node(node).ns_node?;
                match self.ns.node(target).object_type {
                    // A bare method name as an operand is a reference to the
                    // method object itself.
                    ObjectType::Method => Some(TypeBits::METHOD),
                    other => Some(other.btype()),
                }
            }
            op => {
                let btype = op_info(op).btype;
                if btype.is_empty() {
                    None
                } else {
                    Some(btype)
                }
            }
        }
    }

    fn check_node(&mut self, tree: &ParseTree, node: NodeId) -> Result<(), CompilerError> {
        let info = op_info(tree.node(node).op);
        if info.runtime_args.is_empty() {
            return Ok(());
        }
        for (index, &required) in info.runtime_args.iter().enumerate() {
            if info.target_mask & (1 << index) != 0 {
                continue;
            }
            let Some(operand) = tree.child(node, index) else {
                break;
            };
            if tree.node(operand).op == AslOp::MethodCall {
                self.check_call_operand(tree, operand)?;
            }
            let Some(actual) = self.operand_types(tree, operand) else {
                continue;
            };
            if actual == TypeBits::ANY || actual.is_empty() {
                continue;
            }
            if actual.intersection(required).is_empty() {
                let loc = tree.node(operand).loc.clone();
                let param = format!("{} found, {} required", actual.describe(), required.describe());
                self.session.error(
                    ErrorKind::Analyzer,
                    "Invalid operand type",
                    Some(&param),
                    loc,
                )?;
            }
        }
        Ok(())
    }

    /// A call used as an operand must produce a value.
    fn check_call_operand(&mut self, tree: &ParseTree, call: NodeId) -> Result<(), CompilerError> {
        let Some(target) = tree.node(call).ns_node else {
            return Ok(());
        };
        if crate::analyzer::typing::call_value_types(self.ns, target).is_empty() {
            let loc = tree.node(call).loc.clone();
            self.session.error(
                ErrorKind::Analyzer,
                "Called method does not return a value",
                tree.node(call).name(),
                loc,
            )?;
        }
        Ok(())
    }

    /// Warn when an operator computes a value that nothing consumes: used
    /// as a bare statement with no target operand supplied.
    fn check_discarded_result(
        &mut self,
        tree: &ParseTree,
        node: NodeId,
    ) -> Result<(), CompilerError> {
        let op = tree.node(node).op;
        let info = op_info(op);
        if !info.flags.contains(OpFlags::EXECUTABLE)
            || info.flags.contains(OpFlags::RESULT_NOT_USED_OK)
            || info.btype.is_empty()
            || op == AslOp::MethodCall
        {
            return Ok(());
        }
        let statement_position = tree.node(node).parent.is_some_and(|p| {
            matches!(
                tree.node(p).op,
                AslOp::Method | AslOp::If | AslOp::Else | AslOp::While
            )
        });
        if !statement_position {
            return Ok(());
        }
        // Predicates of If/While are consumers, not statements.
        if let Some(parent) = tree.node(node).parent {
            if matches!(tree.node(parent).op, AslOp::If | AslOp::While)
                && tree.child_index(node) == Some(0)
            {
                return Ok(());
            }
        }
        let mut target_supplied = false;
        for index in 0..info.runtime_args.len() {
            if info.target_mask & (1 << index) == 0 {
                continue;
            }
            if let Some(target) = tree.child(node, index) {
                if !matches!(tree.node(target).op, AslOp::Zero) {
                    target_supplied = true;
                }
            }
        }
        if !target_supplied {
            let loc = tree.node(node).loc.clone();
            self.session.warning(
                ErrorKind::Analyzer,
                "Result of operation is not used",
                None,
                loc,
            )?;
        }
        Ok(())
    }
}

impl TreeVisitor for OperandChecker<'_> {
    fn descend(
        &mut self,
        tree: &mut ParseTree,
        node: NodeId,
    ) -> Result<WalkAction, CompilerError> {
        self.check_node(tree, node)?;
        self.check_discarded_result(tree, node)?;
        Ok(WalkAction::Continue)
    }
}
