// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Namespace load pass.
//!
//! One walk of the parse tree builds the complete scoped symbol table:
//! every node whose opcode is flagged `NAMED` or `CREATES_FIELD` interns its
//! name into the current scope; `SCOPE_OPEN` opcodes push a new scope before
//! their children and pop it on the matching ascent. A duplicate name in one
//! scope is reported and processing continues.

use log::debug;

use crate::core::diagnostics::{CompilerError, ErrorKind};
use crate::core::opcodes::{op_info, AslOp, OpFlags};
use crate::core::session::Session;
use crate::namespace::{InternResult, NamePath, Namespace, NsId, NsPayload, ObjectType};
use crate::tree::walk::{walk_tree, TreeVisitor, WalkAction, WalkMode};
use crate::tree::{NodeFlags, NodeId, ParseTree};

/// Build the namespace for a parse tree.
pub fn load_namespace(
    session: &mut Session,
    tree: &mut ParseTree,
) -> Result<Namespace, CompilerError> {
    let mut ns = Namespace::new();
    let Some(root) = tree.root() else {
        return Ok(ns);
    };
    let (pushes, pops) = {
        let mut loader = NamespaceLoader {
            session,
            ns: &mut ns,
            scopes: vec![],
            push_count: 0,
            pop_count: 0,
        };
        loader.scopes.push(loader.ns.root());
        walk_tree(tree, root, WalkMode::Twice, &mut loader)?;
        (loader.push_count, loader.pop_count)
    };
    debug!(
        "namespace load: {} objects, {pushes} scope pushes, {pops} pops",
        ns.len()
    );
    Ok(ns)
}

pub(crate) struct NamespaceLoader<'a> {
    pub session: &'a mut Session,
    pub ns: &'a mut Namespace,
    scopes: Vec<NsId>,
    pub push_count: u32,
    pub pop_count: u32,
}

impl NamespaceLoader<'_> {
    fn current_scope(&self) -> NsId {
        *self.scopes.last().expect("scope stack never empty")
    }

    /// Walk a declaration path down to the scope that will own its final
    /// segment, creating missing intermediate segments as plain scopes.
    fn declaration_scope(&mut self, path: &NamePath) -> NsId {
        let mut scope = if path.root_anchored {
            self.ns.root()
        } else {
            self.current_scope()
        };
        for _ in 0..path.parent_hops {
            scope = self.ns.node(scope).parent.unwrap_or_else(|| self.ns.root());
        }
        if path.segs.len() > 1 {
            for seg in &path.segs[..path.segs.len() - 1] {
                scope = match self.ns.lookup_in(scope, *seg) {
                    Some(existing) => existing,
                    None => match self.ns.intern(scope, *seg, ObjectType::Scope, None) {
                        InternResult::Created(id) | InternResult::Exists(id) => id,
                    },
                };
            }
        }
        scope
    }

    fn intern_declaration(
        &mut self,
        tree: &mut ParseTree,
        node: NodeId,
        object_type: ObjectType,
    ) -> Result<Option<NsId>, CompilerError> {
        let Some(name) = tree.node(node).name().map(str::to_string) else {
            return Err(CompilerError::internal("Named node carries no name"));
        };
        let path = NamePath::parse(&name);
        let Some(final_seg) = path.segs.last().copied() else {
            return Err(CompilerError::internal("Declared name path is empty"));
        };
        let scope = self.declaration_scope(&path);
        match self.ns.intern(scope, final_seg, object_type, Some(node)) {
            InternResult::Created(id) => {
                tree.node_mut(node).ns_node = Some(id);
                tree.node_mut(node).flags |= NodeFlags::NAME_DECLARATION;
                Ok(Some(id))
            }
            InternResult::Exists(existing) => {
                let pathname = self.ns.pathname(existing);
                self.session.error(
                    ErrorKind::Namespace,
                    "Name already exists in scope",
                    Some(&pathname),
                    tree.node(node).loc.clone(),
                )?;
                // Leave the node pointing at the original so later passes
                // can still resolve through it.
                tree.node_mut(node).ns_node = Some(existing);
                Ok(None)
            }
        }
    }

    fn payload_for(&self, tree: &ParseTree, node: NodeId) -> Result<NsPayload, CompilerError> {
        match tree.node(node).op {
            AslOp::Method => {
                let flags_node = tree.required_child(node, 0)?;
                let flags = tree.node(flags_node).integer().unwrap_or(0);
                Ok(NsPayload::Method {
                    arg_count: (flags & 0x07) as u8,
                    return_types: crate::core::opcodes::TypeBits::empty(),
                    external: false,
                })
            }
            AslOp::External => {
                let arg_count = tree
                    .child(node, 0)
                    .and_then(|c| tree.node(c).integer())
                    .unwrap_or(0) as u8;
                Ok(NsPayload::Method {
                    arg_count,
                    return_types: crate::core::opcodes::TypeBits::ANY,
                    external: true,
                })
            }
            AslOp::OperationRegion => {
                // Children: space, offset, length. A constant length operand
                // makes the region statically checkable for field overflow.
                let bit_length = tree
                    .child(node, 2)
                    .and_then(|c| tree.node(c).integer())
                    .map(|bytes| bytes * 8);
                Ok(NsPayload::Region { bit_length })
            }
            AslOp::FieldUnit => {
                let bits_node = tree.required_child(node, 0)?;
                let bit_length = tree.node(bits_node).integer().unwrap_or(0) as u32;
                Ok(NsPayload::FieldUnit { bit_length })
            }
            AslOp::ResourceTag => {
                let offset_node = tree.required_child(node, 0)?;
                let bit_offset = tree.node(offset_node).integer().unwrap_or(0) as u32;
                Ok(NsPayload::ResourceField { bit_offset })
            }
            _ => Ok(NsPayload::None),
        }
    }

    /// The object type a `Name()` declaration takes on, inferred from its
    /// data operand.
    fn name_object_type(tree: &ParseTree, node: NodeId) -> ObjectType {
        match tree.child(node, 0).map(|c| tree.node(c).op) {
            Some(AslOp::Integer | AslOp::Zero | AslOp::One | AslOp::Ones | AslOp::Eisaid) => {
                ObjectType::Integer
            }
            Some(AslOp::String) => ObjectType::String,
            Some(AslOp::Buffer | AslOp::ToUuid | AslOp::Unicode) => ObjectType::Buffer,
            Some(AslOp::Package | AslOp::VarPackage) => ObjectType::Package,
            _ => ObjectType::Integer,
        }
    }

    fn declared_object_type(tree: &ParseTree, node: NodeId) -> ObjectType {
        match tree.node(node).op {
            AslOp::Device => ObjectType::Device,
            AslOp::Method => ObjectType::Method,
            AslOp::Name => Self::name_object_type(tree, node),
            AslOp::Alias => ObjectType::Alias,
            AslOp::External => ObjectType::External,
            AslOp::Mutex => ObjectType::Mutex,
            AslOp::Event => ObjectType::Event,
            AslOp::OperationRegion => ObjectType::Region,
            AslOp::Processor => ObjectType::Processor,
            AslOp::PowerResource => ObjectType::Power,
            AslOp::ThermalZone => ObjectType::Thermal,
            AslOp::FieldUnit => ObjectType::FieldUnit,
            AslOp::ResourceTag => ObjectType::ResourceField,
            AslOp::CreateBitField
            | AslOp::CreateByteField
            | AslOp::CreateWordField
            | AslOp::CreateDWordField
            | AslOp::CreateQWordField
            | AslOp::CreateField => ObjectType::BufferField,
            _ => ObjectType::Scope,
        }
    }

    /// Open the scope a `Scope()` construct names, creating it when absent.
    fn open_named_scope(&mut self, tree: &mut ParseTree, node: NodeId) -> NsId {
        let Some(name) = tree.node(node).name().map(str::to_string) else {
            return self.current_scope();
        };
        let path = NamePath::parse(&name);
        let Some(final_seg) = path.segs.last().copied() else {
            return self.current_scope();
        };
        let scope = self.declaration_scope(&path);
        let id = match self.ns.lookup_in(scope, final_seg) {
            Some(existing) => existing,
            None => match self.ns.intern(scope, final_seg, ObjectType::Scope, Some(node)) {
                InternResult::Created(id) | InternResult::Exists(id) => id,
            },
        };
        tree.node_mut(node).ns_node = Some(id);
        id
    }
}

impl TreeVisitor for NamespaceLoader<'_> {
    fn descend(
        &mut self,
        tree: &mut ParseTree,
        node: NodeId,
    ) -> Result<WalkAction, CompilerError> {
        let op = tree.node(node).op;
        let info = op_info(op);

        let mut opened: Option<NsId> = None;
        if info.flags.intersects(OpFlags::NAMED | OpFlags::CREATES_FIELD) {
            let object_type = Self::declared_object_type(tree, node);
            if let Some(id) = self.intern_declaration(tree, node, object_type)? {
                let payload = self.payload_for(tree, node)?;
                self.ns.node_mut(id).payload = payload;
                opened = Some(id);
            } else if let Some(existing) = tree.node(node).ns_node {
                // Redeclaration: re-open the original scope so children
                // still land somewhere sensible.
                opened = Some(existing);
            }
        }

        if info.flags.contains(OpFlags::SCOPE_OPEN) {
            let scope = match op {
                AslOp::DefinitionBlock => self.ns.root(),
                AslOp::Scope => self.open_named_scope(tree, node),
                _ => opened.unwrap_or_else(|| self.current_scope()),
            };
            self.scopes.push(scope);
            self.push_count += 1;
        }
        Ok(WalkAction::Continue)
    }

    fn ascend(&mut self, tree: &mut ParseTree, node: NodeId) -> Result<(), CompilerError> {
        let info = op_info(tree.node(node).op);
        if info.flags.contains(OpFlags::SCOPE_OPEN) {
            self.scopes.pop();
            self.pop_count += 1;
        }
        Ok(())
    }
}
