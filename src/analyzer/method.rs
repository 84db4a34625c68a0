// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Per-method control and data flow checks.
//!
//! One walk carries a stack of method frames. Within a frame we track which
//! locals have been stored to, how deep in `While` loops the walk is, and
//! how the method's `Return` statements behave. The tracking is linear in
//! document order, which matches how operand lists evaluate; branches are
//! folded together, so a store on either arm of an `If` counts as
//! initializing.

use log::debug;

use crate::core::diagnostics::{CompilerError, ErrorKind};
use crate::core::opcodes::{op_info, AslOp, OpFlags};
use crate::core::session::Session;
use crate::tree::walk::{walk_tree, TreeVisitor, WalkAction, WalkMode};
use crate::tree::{NodeFlags, NodeId, ParseTree};

pub const MAX_LOCALS: usize = 8;
pub const MAX_ARGS: usize = 7;

/// Run the method-analysis walk over the whole tree.
pub fn analyze_methods(
    session: &mut Session,
    tree: &mut ParseTree,
) -> Result<(), CompilerError> {
    let Some(root) = tree.root() else {
        return Ok(());
    };
    let mut analyzer = MethodAnalyzer {
        session,
        stack: vec![],
    };
    walk_tree(tree, root, WalkMode::Twice, &mut analyzer)?;
    debug!("method analysis complete");
    Ok(())
}

/// Flow state for one method being analyzed.
struct MethodInfo {
    node: NodeId,
    arg_count: u8,
    local_initialized: [bool; MAX_LOCALS],
    arg_initialized: [bool; MAX_ARGS],
    loop_depth: u32,
    returns_value: u32,
    returns_void: u32,
}

struct MethodAnalyzer<'a> {
    session: &'a mut Session,
    stack: Vec<MethodInfo>,
}

/// Scan a statement list: the first statement that can never execute (it
/// follows a statement control flow cannot pass) and whether the list itself
/// ends on such a statement. An `If`/`Else` pair counts as a terminator only
/// when both bodies terminate.
fn scan_statements(tree: &ParseTree, node: NodeId, skip: usize) -> (Option<NodeId>, bool) {
    let mut unreachable = None;
    let mut terminated = false;
    let mut prev_if_no_exit = false;
    let mut ends_no_exit = false;
    for k in tree.children(node).into_iter().skip(skip) {
        let op = tree.node(k).op;
        let info = op_info(op);
        if !info.flags.contains(OpFlags::EXECUTABLE) {
            continue;
        }
        if terminated {
            if unreachable.is_none() {
                unreachable = Some(k);
            }
            continue;
        }
        let terminal = info.flags.contains(OpFlags::NO_EXIT)
            || (op == AslOp::Else
                && tree.node(k).flags.contains(NodeFlags::NO_EXIT)
                && prev_if_no_exit);
        prev_if_no_exit = op == AslOp::If && tree.node(k).flags.contains(NodeFlags::NO_EXIT);
        ends_no_exit = terminal;
        if terminal {
            terminated = true;
        }
    }
    (unreachable, ends_no_exit)
}

impl MethodAnalyzer<'_> {
    /// Whether the child at `index` under `parent` is a write target.
    fn is_write_target(parent: AslOp, index: usize) -> bool {
        index < 8 && op_info(parent).target_mask & (1 << index) != 0
    }

    fn check_local_ref(
        &mut self,
        tree: &ParseTree,
        node: NodeId,
        n: u8,
    ) -> Result<(), CompilerError> {
        let loc = tree.node(node).loc.clone();
        let Some(frame) = self.stack.last_mut() else {
            return self.session.error(
                ErrorKind::Analyzer,
                "Local object used outside a control method",
                None,
                loc,
            );
        };
        if usize::from(n) >= MAX_LOCALS {
            return Err(CompilerError::internal("Local register index out of range"));
        }
        let parent = tree.node(node).parent;
        let index = tree.child_index(node).unwrap_or(0);
        let parent_op = parent.map(|p| tree.node(p).op);
        if parent_op.is_some_and(|p| Self::is_write_target(p, index)) {
            frame.local_initialized[n as usize] = true;
            return Ok(());
        }
        if !frame.local_initialized[n as usize] && parent_op != Some(AslOp::ObjectType) {
            let param = format!("Local{n}");
            return self.session.error(
                ErrorKind::Analyzer,
                "Method local is not initialized before use",
                Some(&param),
                loc,
            );
        }
        Ok(())
    }

    fn check_arg_ref(
        &mut self,
        tree: &ParseTree,
        node: NodeId,
        n: u8,
    ) -> Result<(), CompilerError> {
        let loc = tree.node(node).loc.clone();
        let Some(frame) = self.stack.last_mut() else {
            return self.session.error(
                ErrorKind::Analyzer,
                "Method argument used outside a control method",
                None,
                loc,
            );
        };
        if usize::from(n) >= MAX_ARGS {
            return Err(CompilerError::internal("Arg register index out of range"));
        }
        let parent = tree.node(node).parent;
        let index = tree.child_index(node).unwrap_or(0);
        // A store into a beyond-arity Arg turns it into a usable temporary.
        if parent.is_some_and(|p| Self::is_write_target(tree.node(p).op, index)) {
            frame.arg_initialized[n as usize] = true;
            return Ok(());
        }
        if n >= frame.arg_count && !frame.arg_initialized[n as usize] {
            let param = format!("Arg{n} of a {}-argument method", frame.arg_count);
            return self.session.remark(
                ErrorKind::Analyzer,
                "Method argument is beyond the declared argument count",
                Some(&param),
                loc,
            );
        }
        Ok(())
    }

    fn finish_method(&mut self, tree: &ParseTree) -> Result<(), CompilerError> {
        let mut frame = self.stack.pop().ok_or_else(|| {
            CompilerError::internal("Method frame stack underflow")
        })?;
        let (unreachable, ends_no_exit) = scan_statements(tree, frame.node, 1);
        if let Some(stmt) = unreachable {
            let loc = tree.node(stmt).loc.clone();
            self.session.warning(
                ErrorKind::Analyzer,
                "Statement is unreachable",
                None,
                loc,
            )?;
        }
        // Falling off the end of the body is an implicit value-less return.
        if !ends_no_exit {
            frame.returns_void += 1;
        }
        if frame.returns_value > 0 && frame.returns_void > 0 {
            let loc = tree.node(frame.node).loc.clone();
            self.session.warning(
                ErrorKind::Analyzer,
                "Not all control paths return a value",
                tree.node(frame.node).name(),
                loc,
            )?;
        }
        Ok(())
    }

    fn check_block(&mut self, tree: &mut ParseTree, node: NodeId, skip: usize) -> Result<(), CompilerError> {
        let (unreachable, ends_no_exit) = scan_statements(tree, node, skip);
        if let Some(stmt) = unreachable {
            let loc = tree.node(stmt).loc.clone();
            self.session.warning(
                ErrorKind::Analyzer,
                "Statement is unreachable",
                None,
                loc,
            )?;
        }
        let op = tree.node(node).op;
        if ends_no_exit && matches!(op, AslOp::If | AslOp::Else) {
            tree.node_mut(node).flags |= NodeFlags::NO_EXIT;
        }
        Ok(())
    }
}

impl TreeVisitor for MethodAnalyzer<'_> {
    fn descend(
        &mut self,
        tree: &mut ParseTree,
        node: NodeId,
    ) -> Result<WalkAction, CompilerError> {
        match tree.node(node).op {
            AslOp::Method => {
                let flags = tree
                    .child(node, 0)
                    .and_then(|c| tree.node(c).integer())
                    .unwrap_or(0);
                self.stack.push(MethodInfo {
                    node,
                    arg_count: (flags & 0x07) as u8,
                    local_initialized: [false; MAX_LOCALS],
                    arg_initialized: [false; MAX_ARGS],
                    loop_depth: 0,
                    returns_value: 0,
                    returns_void: 0,
                });
            }
            AslOp::While => {
                if let Some(frame) = self.stack.last_mut() {
                    frame.loop_depth += 1;
                }
            }
            AslOp::Break | AslOp::Continue => {
                let in_loop = self.stack.last().is_some_and(|f| f.loop_depth > 0);
                if !in_loop {
                    let loc = tree.node(node).loc.clone();
                    self.session.error(
                        ErrorKind::Analyzer,
                        "Break or Continue outside of a While loop",
                        None,
                        loc,
                    )?;
                }
            }
            AslOp::Return => {
                let has_value = tree.child_count(node) > 0;
                let loc = tree.node(node).loc.clone();
                match self.stack.last_mut() {
                    Some(frame) => {
                        if has_value {
                            frame.returns_value += 1;
                        } else {
                            frame.returns_void += 1;
                        }
                    }
                    None => {
                        self.session.error(
                            ErrorKind::Analyzer,
                            "Return outside a control method",
                            None,
                            loc,
                        )?;
                    }
                }
            }
            AslOp::LocalRef(n) => self.check_local_ref(tree, node, n)?,
            AslOp::ArgRef(n) => self.check_arg_ref(tree, node, n)?,
            _ => {}
        }
        Ok(WalkAction::Continue)
    }

    fn ascend(&mut self, tree: &mut ParseTree, node: NodeId) -> Result<(), CompilerError> {
        match tree.node(node).op {
            AslOp::Method => self.finish_method(tree)?,
            AslOp::While => {
                if let Some(frame) = self.stack.last_mut() {
                    frame.loop_depth = frame.loop_depth.saturating_sub(1);
                }
                self.check_block(tree, node, 1)?;
            }
            AslOp::If => self.check_block(tree, node, 1)?,
            AslOp::Else => self.check_block(tree, node, 0)?,
            _ => {}
        }
        Ok(())
    }
}
