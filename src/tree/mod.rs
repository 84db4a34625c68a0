// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Parse tree arena.
//!
//! The external parser delivers a fully linked tree rooted at a single
//! `DefinitionBlock` node, with source opcodes and locations populated and
//! AML opcodes and lengths left unset. Nodes live in an arena and are
//! addressed by `NodeId`; parent/first-child/next-sibling links are plain
//! indices with no ownership semantics.
//!
//! Input contract (child conventions the passes rely on):
//!
//! - `DefinitionBlock`: children `[signature:String, revision:Integer,
//!   oem_id:String, oem_table_id:String, oem_revision:Integer, body...]`.
//! - `Method`: value = declared name, children `[flags:Integer, body...]`
//!   where bits 0-2 of the flags byte are the argument count.
//! - `Name`: value = declared name, child `[data object]`.
//! - `Alias`: value = new alias name, child `[NamePath source]`.
//! - `OperationRegion`: value = name, children `[space:Integer, offset,
//!   length]`.
//! - `Field`: children `[region:NamePath, flags:Integer, units...]`;
//!   `BankField` adds `[bank:NamePath, bank_value]` after the region.
//!   A `FieldUnit` has value = name and child `[bits:Integer]`; `Offset`
//!   has child `[bytes:Integer]`.
//! - `CreateBitField`/`Create*Field`: value = new field name, children
//!   `[buffer, index]` (plus `[num_bits]` for `CreateField`).
//! - `MethodCall`/`NamePath`: value = referenced name path.
//! - `If`/`While`: children `[predicate, body...]`; `Return` takes an
//!   optional single operand.

pub mod walk;

use bitflags::bitflags;

use crate::core::diagnostics::{CompilerError, SourceLoc};
use crate::core::opcodes::AslOp;
use crate::namespace::NsId;

/// Index of a node in the tree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Literal payload of a parse node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NodeValue {
    #[default]
    None,
    Integer(u64),
    String(String),
    Buffer(Vec<u8>),
    /// A name: the declared name for declarations, the referenced path for
    /// `NamePath` and `MethodCall` nodes.
    Name(String),
}

bitflags! {
    /// Per-node compile-time flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u32 {
        /// This node declares a name rather than referencing one.
        const NAME_DECLARATION = 1 << 0;
        /// Node was a resource-field reference before resolution retagged
        /// it to an integer.
        const RESOURCE_FIELD = 1 << 1;
        /// The integer carried here is a bit offset, not a byte offset.
        const BIT_OFFSET = 1 << 2;
        /// Control flow cannot continue past this subtree.
        const NO_EXIT = 1 << 3;
        /// Node was generated by this compiler, not written by the user.
        const COMPILER_EMITTED = 1 << 4;
        /// Name reference that could not be resolved; later passes skip it.
        const UNRESOLVED = 1 << 5;
    }
}

/// One parse tree node.
#[derive(Debug, Clone)]
pub struct ParseNode {
    pub op: AslOp,
    pub value: NodeValue,
    /// AML opcode bytes assigned by the code generator.
    pub aml: &'static [u8],
    /// Encoded byte length of this node's subtree, including any
    /// package-length prefix.
    pub aml_subtree_len: u32,
    /// Chosen package-length prefix width in bytes, 0 when none.
    pub pkg_len_width: u8,
    /// Chosen integer payload width in bytes for `Integer` nodes.
    pub int_width: u8,
    pub flags: NodeFlags,
    pub loc: SourceLoc,
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    /// Resolved namespace entry, lookup only.
    pub ns_node: Option<NsId>,
}

impl ParseNode {
    fn new(op: AslOp, loc: SourceLoc) -> Self {
        Self {
            op,
            value: NodeValue::None,
            aml: &[],
            aml_subtree_len: 0,
            pkg_len_width: 0,
            int_width: 0,
            flags: NodeFlags::empty(),
            loc,
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
            ns_node: None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match &self.value {
            NodeValue::Name(name) => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn integer(&self) -> Option<u64> {
        match &self.value {
            NodeValue::Integer(v) => Some(*v),
            _ => None,
        }
    }
}

/// Arena holding one parse tree.
#[derive(Debug, Default)]
pub struct ParseTree {
    nodes: Vec<ParseNode>,
    root: Option<NodeId>,
}

impl ParseTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &ParseNode {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut ParseNode {
        &mut self.nodes[id.index()]
    }

    /// Allocate a detached node.
    pub fn alloc(&mut self, op: AslOp, loc: SourceLoc) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(ParseNode::new(op, loc));
        id
    }

    /// Allocate a node and append it as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, op: AslOp, loc: SourceLoc) -> NodeId {
        let id = self.alloc(op, loc);
        self.append(parent, id);
        id
    }

    /// Append an existing detached node as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.index()].parent = Some(parent);
        match self.nodes[parent.index()].last_child {
            Some(last) => self.nodes[last.index()].next_sibling = Some(child),
            None => self.nodes[parent.index()].first_child = Some(child),
        }
        self.nodes[parent.index()].last_child = Some(child);
    }

    /// Snapshot of a node's direct children, in order. Walks take this
    /// snapshot before descending so a callback may replace the current
    /// node's variant without corrupting traversal.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.nodes[id.index()].first_child;
        while let Some(child) = cursor {
            out.push(child);
            cursor = self.nodes[child.index()].next_sibling;
        }
        out
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).len()
    }

    /// Nth direct child, if present.
    pub fn child(&self, id: NodeId, n: usize) -> Option<NodeId> {
        let mut cursor = self.nodes[id.index()].first_child;
        let mut idx = 0;
        while let Some(child) = cursor {
            if idx == n {
                return Some(child);
            }
            idx += 1;
            cursor = self.nodes[child.index()].next_sibling;
        }
        None
    }

    /// Nth direct child, a structural requirement. Absence is an internal
    /// consistency violation and aborts the compile.
    pub fn required_child(&self, id: NodeId, n: usize) -> Result<NodeId, CompilerError> {
        self.child(id, n).ok_or_else(|| {
            CompilerError::internal(&format!(
                "Missing required child {n} of {:?} node",
                self.nodes[id.index()].op
            ))
        })
    }

    /// Child position of `child` under its parent.
    pub fn child_index(&self, child: NodeId) -> Option<usize> {
        let parent = self.nodes[child.index()].parent?;
        self.children(parent).iter().position(|&c| c == child)
    }

    /// Retag a node as an integer literal, discarding its children. Used
    /// when resolution or constant encoding replaces a construct with its
    /// compile-time value.
    pub fn convert_to_integer(&mut self, id: NodeId, value: u64) {
        let node = &mut self.nodes[id.index()];
        node.op = AslOp::Integer;
        node.value = NodeValue::Integer(value);
        node.aml = &[];
        node.first_child = None;
        node.last_child = None;
        node.ns_node = None;
    }

    /// Retag a node as a literal buffer, discarding its children.
    pub fn convert_to_buffer(&mut self, id: NodeId, bytes: Vec<u8>) {
        let node = &mut self.nodes[id.index()];
        node.op = AslOp::Buffer;
        node.value = NodeValue::Buffer(bytes);
        node.aml = &[];
        node.first_child = None;
        node.last_child = None;
        node.ns_node = None;
    }
}
