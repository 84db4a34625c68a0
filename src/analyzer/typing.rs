// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Method return-type inference.
//!
//! Every method's possible return types are unioned into one `TypeBits` set
//! and cached on its namespace node, where the operand typecheck and the
//! predefined-name checks read them. Calls to methods that have not been
//! typed yet trigger an out-of-band computation of the callee; an
//! in-progress set breaks recursion cycles, which degrade to `ANY`.

use std::collections::HashSet;

use log::debug;

use crate::core::diagnostics::CompilerError;
use crate::core::opcodes::{op_info, AslOp, TypeBits};
use crate::namespace::{Namespace, NsId, NsPayload, ObjectType};
use crate::tree::{NodeId, ParseTree};

/// Infer and cache the return-type set of every declared method.
pub fn infer_return_types(tree: &ParseTree, ns: &mut Namespace) -> Result<(), CompilerError> {
    let method_ids: Vec<NsId> = ns
        .ids()
        .filter(|&id| matches!(ns.node(id).payload, NsPayload::Method { .. }))
        .collect();
    let mut typer = MethodTyper {
        tree,
        in_progress: HashSet::new(),
    };
    for id in method_ids {
        typer.method_return_types(ns, id)?;
    }
    debug!("return-type inference complete");
    Ok(())
}

/// The inferred value type of a method call, with the no-return marker
/// stripped. Empty means the method never returns a value.
pub fn call_value_types(ns: &Namespace, callee: NsId) -> TypeBits {
    match ns.node(callee).payload {
        NsPayload::Method { return_types, .. } => return_types.difference(TypeBits::NO_RETURN),
        _ => TypeBits::ANY,
    }
}

struct MethodTyper<'a> {
    tree: &'a ParseTree,
    in_progress: HashSet<NsId>,
}

impl MethodTyper<'_> {
    /// Compute (or fetch the cached) return-type set of one method.
    fn method_return_types(
        &mut self,
        ns: &mut Namespace,
        id: NsId,
    ) -> Result<TypeBits, CompilerError> {
        let NsPayload::Method {
            return_types,
            external,
            ..
        } = ns.node(id).payload
        else {
            return Err(CompilerError::internal("Typing a non-method object"));
        };
        if !return_types.is_empty() {
            return Ok(return_types);
        }
        if external {
            self.store(ns, id, TypeBits::ANY);
            return Ok(TypeBits::ANY);
        }
        if self.in_progress.contains(&id) {
            // Recursive cycle; the fixed point is unknowable here.
            return Ok(TypeBits::ANY);
        }
        let Some(decl) = ns.node(id).decl else {
            self.store(ns, id, TypeBits::ANY);
            return Ok(TypeBits::ANY);
        };

        self.in_progress.insert(id);
        let mut types = TypeBits::empty();
        let mut saw_value_return = false;
        let mut stack = vec![decl];
        while let Some(node) = stack.pop() {
            if self.tree.node(node).op == AslOp::Return {
                match self.tree.child(node, 0) {
                    Some(operand) => {
                        types |= self.expr_type(ns, operand)?;
                        saw_value_return = true;
                    }
                    None => types |= TypeBits::NO_RETURN,
                }
            }
            stack.extend(self.tree.children(node));
        }
        if !saw_value_return {
            types |= TypeBits::NO_RETURN;
        }
        self.in_progress.remove(&id);
        self.store(ns, id, types);
        Ok(types)
    }

    fn store(&self, ns: &mut Namespace, id: NsId, types: TypeBits) {
        if let NsPayload::Method { return_types, .. } = &mut ns.node_mut(id).payload {
            *return_types = types;
        }
    }

    /// Type of a value-producing expression node.
    fn expr_type(&mut self, ns: &mut Namespace, node: NodeId) -> Result<TypeBits, CompilerError> {
        let op = self.tree.node(node).op;
        match op {
            AslOp::LocalRef(_) | AslOp::ArgRef(_) => Ok(TypeBits::ANY),
            AslOp::NamePath | AslOp::MethodCall => {
                let Some(target) = self.tree.node(node).ns_node else {
                    return Ok(TypeBits::ANY);
                };
                match ns.node(target).object_type {
                    ObjectType::Method => {
                        let types = self.method_return_types(ns, target)?;
                        Ok(types.difference(TypeBits::NO_RETURN))
                    }
                    other => Ok(other.btype()),
                }
            }
            _ => {
                let btype = op_info(op).btype;
                if btype.is_empty() {
                    Ok(TypeBits::ANY)
                } else {
                    Ok(btype)
                }
            }
        }
    }
}
