// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Cross-reference pass.
//!
//! The second tree walk resolves every name reference against the loaded
//! namespace. Bare single-segment names use the search-to-root algorithm;
//! root-anchored paths search from the root only; relative multi-segment
//! paths resolve segment by segment without reopening intermediate scopes.
//!
//! Resolution rewrites nodes in place: resource-field references become
//! integer literals carrying the field's offset, and a method name in a
//! value context becomes a method call. Unresolved references are reported,
//! flagged, and left behind; later passes skip them.

use log::debug;

use crate::core::diagnostics::{CompilerError, ErrorKind};
use crate::core::opcodes::{op_info, AslOp, OpFlags};
use crate::core::session::Session;
use crate::namespace::{NamePath, Namespace, NsId, NsPayload, ObjectType};
use crate::tree::walk::{walk_tree, TreeVisitor, WalkAction, WalkMode};
use crate::tree::{NodeFlags, NodeId, ParseTree};

/// Resolve all references in the tree, then sweep for never-referenced
/// names.
pub fn resolve_references(
    session: &mut Session,
    tree: &mut ParseTree,
    ns: &mut Namespace,
) -> Result<(), CompilerError> {
    let Some(root) = tree.root() else {
        return Ok(());
    };
    {
        let mut resolver = Resolver {
            session,
            ns,
            scopes: vec![],
        };
        resolver.scopes.push(resolver.ns.root());
        walk_tree(tree, root, WalkMode::Twice, &mut resolver)?;
    }
    debug!("cross-reference complete");
    check_unreferenced(session, tree, ns)
}

/// How a failed lookup is classified for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LookupFailure {
    /// The name exists elsewhere in the namespace but is not reachable
    /// from the referencing scope.
    NotReachable,
    /// The name exists nowhere.
    NotExist,
    /// A relative multi-segment path that cannot be classified either way.
    Ambiguous,
}

struct Resolver<'a> {
    session: &'a mut Session,
    ns: &'a mut Namespace,
    scopes: Vec<NsId>,
}

impl Resolver<'_> {
    fn current_scope(&self) -> NsId {
        *self.scopes.last().expect("scope stack never empty")
    }

    /// Scoped lookup per the search rules above. Does not follow aliases.
    fn lookup(&self, path: &NamePath) -> Option<NsId> {
        if path.is_single_seg() {
            return self.ns.search_to_root(self.current_scope(), path.segs[0]);
        }
        let mut scope = if path.root_anchored {
            self.ns.root()
        } else {
            self.current_scope()
        };
        for _ in 0..path.parent_hops {
            scope = self.ns.node(scope).parent?;
        }
        let mut found = scope;
        for seg in &path.segs {
            found = self.ns.lookup_in(found, *seg)?;
        }
        Some(found)
    }

    fn classify_failure(&self, path: &NamePath) -> LookupFailure {
        if path.root_anchored {
            return LookupFailure::NotExist;
        }
        let Some(final_seg) = path.segs.last() else {
            return LookupFailure::NotExist;
        };
        let exists_somewhere = self.ns.find_anywhere(*final_seg).is_some();
        match (path.is_single_seg(), exists_somewhere) {
            (true, true) => LookupFailure::NotReachable,
            (true, false) => LookupFailure::NotExist,
            (false, true) => LookupFailure::Ambiguous,
            (false, false) => LookupFailure::NotExist,
        }
    }

    fn report_failure(
        &mut self,
        tree: &mut ParseTree,
        node: NodeId,
        name: &str,
        failure: LookupFailure,
    ) -> Result<(), CompilerError> {
        tree.node_mut(node).flags |= NodeFlags::UNRESOLVED;
        let loc = tree.node(node).loc.clone();
        let msg = match failure {
            LookupFailure::NotReachable => "Object is not accessible from this scope",
            LookupFailure::NotExist => "Object does not exist",
            LookupFailure::Ambiguous => "Object does not exist or is not accessible from this scope",
        };
        self.session.error(ErrorKind::Resolver, msg, Some(name), loc)
    }

    /// Convert a resolved resource-field reference into an integer literal
    /// carrying the field's offset, in the unit its consumer expects.
    fn convert_resource_field(
        &mut self,
        tree: &mut ParseTree,
        node: NodeId,
        bit_offset: u32,
    ) -> Result<(), CompilerError> {
        let parent_op = tree.node(node).parent.map(|p| tree.node(p).op);
        let wants_bits = matches!(
            parent_op,
            Some(AslOp::CreateBitField | AslOp::CreateField)
        );
        let value = if wants_bits {
            tree.node_mut(node).flags |= NodeFlags::BIT_OFFSET;
            u64::from(bit_offset)
        } else {
            if bit_offset % 8 != 0 {
                let loc = tree.node(node).loc.clone();
                self.session.error(
                    ErrorKind::Resolver,
                    "Resource field offset is not byte-aligned for this operator",
                    tree.node(node).name(),
                    loc,
                )?;
            }
            u64::from(bit_offset / 8)
        };
        tree.node_mut(node).flags |= NodeFlags::RESOURCE_FIELD;
        tree.convert_to_integer(node, value);
        Ok(())
    }

    fn resolve_reference(
        &mut self,
        tree: &mut ParseTree,
        node: NodeId,
    ) -> Result<(), CompilerError> {
        let Some(name) = tree.node(node).name().map(str::to_string) else {
            return Err(CompilerError::internal("Reference node carries no name"));
        };
        let path = NamePath::parse(&name);
        let Some(found) = self.lookup(&path) else {
            // CondRefOf exists to probe optional objects; an unresolved
            // operand there is not an error.
            let parent_op = tree.node(node).parent.map(|p| tree.node(p).op);
            if parent_op == Some(AslOp::CondRefOf) {
                tree.node_mut(node).flags |= NodeFlags::UNRESOLVED;
                return Ok(());
            }
            let failure = self.classify_failure(&path);
            return self.report_failure(tree, node, &name, failure);
        };

        let target = self.ns.deref_alias(found);
        self.ns.node_mut(target).referenced = true;
        tree.node_mut(node).ns_node = Some(target);

        match self.ns.node(target).object_type {
            ObjectType::ResourceField => {
                let NsPayload::ResourceField { bit_offset } = self.ns.node(target).payload else {
                    return Err(CompilerError::internal("Resource field without offset"));
                };
                self.convert_resource_field(tree, node, bit_offset)?;
            }
            ObjectType::Method | ObjectType::External => {
                self.check_method_reference(tree, node, target)?;
            }
            _ => {
                if tree.node(node).op == AslOp::MethodCall {
                    let loc = tree.node(node).loc.clone();
                    self.session.error(
                        ErrorKind::Resolver,
                        "Called object is not a method",
                        Some(&name),
                        loc,
                    )?;
                }
            }
        }
        Ok(())
    }

    fn check_method_reference(
        &mut self,
        tree: &mut ParseTree,
        node: NodeId,
        target: NsId,
    ) -> Result<(), CompilerError> {
        let NsPayload::Method {
            arg_count,
            external,
            ..
        } = self.ns.node(target).payload
        else {
            return Ok(());
        };

        // A bare method name in a value context is a zero-argument call the
        // parser could not recognize.
        if tree.node(node).op == AslOp::NamePath {
            let in_value_context = tree
                .node(node)
                .parent
                .map(|p| op_info(tree.node(p).op).flags.contains(OpFlags::EXECUTABLE))
                .unwrap_or(false);
            if in_value_context {
                tree.node_mut(node).op = AslOp::MethodCall;
            } else {
                return Ok(());
            }
        }

        if !external {
            let supplied = tree.child_count(node);
            if supplied != arg_count as usize {
                let loc = tree.node(node).loc.clone();
                let detail = format!(
                    "{} supplied, {} declared",
                    supplied, arg_count
                );
                self.session.error(
                    ErrorKind::Resolver,
                    "Call argument count does not match method declaration",
                    Some(&detail),
                    loc,
                )?;
            }
        }
        Ok(())
    }

    /// Validate that no field unit in a Field/BankField group extends past
    /// its operation region, when the region length is statically known.
    fn check_field_ranges(
        &mut self,
        tree: &mut ParseTree,
        node: NodeId,
    ) -> Result<(), CompilerError> {
        let is_bank = tree.node(node).op == AslOp::BankField;
        let flags_index = if is_bank { 3 } else { 1 };
        let units_from = flags_index + 1;

        let region_ref = tree.required_child(node, 0)?;
        let Some(region_name) = tree.node(region_ref).name().map(str::to_string) else {
            return Ok(());
        };
        let Some(region_id) = self.lookup(&NamePath::parse(&region_name)) else {
            // Unresolved region reported when the walk reaches the child.
            return Ok(());
        };
        let region_id = self.ns.deref_alias(region_id);
        let NsPayload::Region {
            bit_length: Some(region_bits),
        } = self.ns.node(region_id).payload
        else {
            return Ok(());
        };

        let access_bits = {
            let flags = tree
                .child(node, flags_index)
                .and_then(|c| tree.node(c).integer())
                .unwrap_or(0);
            match flags & 0x0F {
                2 => 16u64,
                3 => 32,
                4 => 64,
                _ => 8,
            }
        };

        let mut bit_offset: u64 = 0;
        for unit in tree.children(node).into_iter().skip(units_from) {
            match tree.node(unit).op {
                AslOp::Offset => {
                    let bytes = tree
                        .child(unit, 0)
                        .and_then(|c| tree.node(c).integer())
                        .unwrap_or(0);
                    bit_offset = bytes * 8;
                }
                AslOp::FieldUnit => {
                    let bits = tree
                        .child(unit, 0)
                        .and_then(|c| tree.node(c).integer())
                        .unwrap_or(0);
                    let end = bit_offset + bits;
                    if end > region_bits {
                        let loc = tree.node(unit).loc.clone();
                        self.session.error(
                            ErrorKind::Resolver,
                            "Field unit extends beyond the operation region",
                            tree.node(unit).name(),
                            loc,
                        )?;
                    } else {
                        let padded_end = end.div_ceil(access_bits) * access_bits;
                        if padded_end > region_bits {
                            let loc = tree.node(unit).loc.clone();
                            self.session.error(
                                ErrorKind::Resolver,
                                "Access width of field unit extends beyond the operation region",
                                tree.node(unit).name(),
                                loc,
                            )?;
                        }
                    }
                    bit_offset = end;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl TreeVisitor for Resolver<'_> {
    fn descend(
        &mut self,
        tree: &mut ParseTree,
        node: NodeId,
    ) -> Result<WalkAction, CompilerError> {
        let op = tree.node(node).op;
        let info = op_info(op);

        if info.flags.contains(OpFlags::SCOPE_OPEN) {
            let scope = match op {
                AslOp::DefinitionBlock => self.ns.root(),
                _ => tree.node(node).ns_node.unwrap_or_else(|| self.current_scope()),
            };
            self.scopes.push(scope);
        }

        match op {
            AslOp::NamePath | AslOp::MethodCall => {
                self.resolve_reference(tree, node)?;
            }
            AslOp::Alias => {
                self.resolve_alias_declaration(tree, node)?;
            }
            AslOp::Field | AslOp::BankField => {
                self.check_field_ranges(tree, node)?;
            }
            _ => {}
        }
        Ok(WalkAction::Continue)
    }

    fn ascend(&mut self, tree: &mut ParseTree, node: NodeId) -> Result<(), CompilerError> {
        if op_info(tree.node(node).op).flags.contains(OpFlags::SCOPE_OPEN) {
            self.scopes.pop();
        }
        Ok(())
    }
}

impl Resolver<'_> {
    /// Bind an alias declaration to its (already loaded) target. Redirects
    /// are a single level: aliasing an alias binds to the final target.
    fn resolve_alias_declaration(
        &mut self,
        tree: &mut ParseTree,
        node: NodeId,
    ) -> Result<(), CompilerError> {
        let Some(alias_id) = tree.node(node).ns_node else {
            return Ok(());
        };
        let source = tree.required_child(node, 0)?;
        let Some(source_name) = tree.node(source).name().map(str::to_string) else {
            return Ok(());
        };
        let path = NamePath::parse(&source_name);
        let Some(found) = self.lookup(&path) else {
            let failure = self.classify_failure(&path);
            return self.report_failure(tree, source, &source_name, failure);
        };
        let target = self.ns.deref_alias(found);
        self.ns.node_mut(target).referenced = true;
        tree.node_mut(source).ns_node = Some(target);
        self.ns.node_mut(alias_id).payload = NsPayload::Alias { target };
        Ok(())
    }
}

/// Emit a remark for every declared, non-reserved name nothing ever
/// referenced.
fn check_unreferenced(
    session: &mut Session,
    tree: &ParseTree,
    ns: &Namespace,
) -> Result<(), CompilerError> {
    for id in ns.ids() {
        let n = ns.node(id);
        if n.referenced || n.decl.is_none() || n.object_type == ObjectType::Scope {
            continue;
        }
        if n.name.as_str().starts_with('_') {
            // Reserved names are invoked by the OS, not by this table.
            continue;
        }
        let loc = n
            .decl
            .map(|d| tree.node(d).loc.clone())
            .unwrap_or_default();
        session.remark(
            ErrorKind::Namespace,
            "Namespace object is not referenced",
            Some(&ns.pathname(id)),
            loc,
        )?;
    }
    Ok(())
}
