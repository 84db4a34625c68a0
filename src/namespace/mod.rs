// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Hierarchical symbol table ("namespace").
//!
//! One namespace lives for one compilation. Nodes are arena-allocated and
//! addressed by `NsId`; child scopes are reachable only through their parent
//! and are dropped with the arena. Back-pointers to declaring parse nodes
//! are plain indices, lookup only.

pub mod load;
pub mod resolve;

use std::fmt;

use crate::core::opcodes::TypeBits;
use crate::tree::NodeId;

/// Index of a node in the namespace arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NsId(u32);

impl NsId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Fixed-width 4-character name segment. Shorter names are padded with `_`,
/// lowercase is folded to uppercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NameSeg([u8; 4]);

impl NameSeg {
    pub fn new(name: &str) -> Self {
        let mut seg = [b'_'; 4];
        for (dst, ch) in seg.iter_mut().zip(name.bytes()) {
            *dst = ch.to_ascii_uppercase();
        }
        Self(seg)
    }

    pub fn bytes(&self) -> &[u8; 4] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        // Construction only admits ASCII.
        std::str::from_utf8(&self.0).unwrap_or("????")
    }
}

impl fmt::Display for NameSeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Semantic type of a bound name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    /// Created implicitly as an intermediate path segment.
    Scope,
    Integer,
    String,
    Buffer,
    Package,
    FieldUnit,
    Device,
    Event,
    Method,
    Mutex,
    Region,
    Power,
    Processor,
    Thermal,
    BufferField,
    ResourceField,
    Alias,
    /// Declared `External`; arity and type may be unknown.
    External,
}

impl ObjectType {
    /// The type-lattice bits a reference to an object of this type carries.
    pub fn btype(self) -> TypeBits {
        match self {
            ObjectType::Scope => TypeBits::empty(),
            ObjectType::Integer => TypeBits::INTEGER,
            ObjectType::String => TypeBits::STRING,
            ObjectType::Buffer => TypeBits::BUFFER,
            ObjectType::Package => TypeBits::PACKAGE,
            ObjectType::FieldUnit => TypeBits::FIELD_UNIT,
            ObjectType::Device => TypeBits::DEVICE,
            ObjectType::Event => TypeBits::EVENT,
            ObjectType::Method => TypeBits::METHOD,
            ObjectType::Mutex => TypeBits::MUTEX,
            ObjectType::Region => TypeBits::REGION,
            ObjectType::Power => TypeBits::POWER,
            ObjectType::Processor => TypeBits::PROCESSOR,
            ObjectType::Thermal => TypeBits::THERMAL,
            ObjectType::BufferField => TypeBits::BUFFER_FIELD,
            ObjectType::ResourceField => TypeBits::RESOURCE,
            ObjectType::Alias => TypeBits::ANY,
            ObjectType::External => TypeBits::ANY,
        }
    }
}

/// Type-specific payload of a namespace node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NsPayload {
    #[default]
    None,
    Method {
        arg_count: u8,
        /// Inferred return-type bitset, empty until the typing pass runs.
        return_types: TypeBits,
        /// Declared `External`; arity checks are skipped.
        external: bool,
    },
    /// Named offset within a resource template, in bits from the start of
    /// the template buffer.
    ResourceField { bit_offset: u32 },
    /// Field unit inside a Field/BankField/IndexField group.
    FieldUnit { bit_length: u32 },
    /// One-level redirect; the target is never itself an alias.
    Alias { target: NsId },
    Region {
        /// Statically known region length in bits, when the length operand
        /// folded to a constant.
        bit_length: Option<u64>,
    },
}

/// One bound name.
#[derive(Debug, Clone)]
pub struct NsNode {
    pub name: NameSeg,
    pub object_type: ObjectType,
    pub parent: Option<NsId>,
    children: Vec<NsId>,
    /// Declaring parse node, lookup only.
    pub decl: Option<NodeId>,
    /// Set when any resolved reference points at this name.
    pub referenced: bool,
    pub payload: NsPayload,
}

/// The namespace arena. The root scope has no parent and no name of its own.
pub struct Namespace {
    nodes: Vec<NsNode>,
    root: NsId,
}

/// Result of an intern attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternResult {
    Created(NsId),
    /// The name already exists in the target scope.
    Exists(NsId),
}

impl Namespace {
    pub fn new() -> Self {
        let root = NsNode {
            name: NameSeg::new("\\"),
            object_type: ObjectType::Scope,
            parent: None,
            children: Vec::new(),
            decl: None,
            referenced: true,
            payload: NsPayload::None,
        };
        Self {
            nodes: vec![root],
            root: NsId(0),
        }
    }

    pub fn root(&self) -> NsId {
        self.root
    }

    pub fn node(&self, id: NsId) -> &NsNode {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NsId) -> &mut NsNode {
        &mut self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = NsId> {
        (0..self.nodes.len() as u32).map(NsId)
    }

    pub fn children(&self, scope: NsId) -> &[NsId] {
        &self.nodes[scope.index()].children
    }

    /// Look a segment up in exactly one scope.
    pub fn lookup_in(&self, scope: NsId, seg: NameSeg) -> Option<NsId> {
        self.nodes[scope.index()]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c.index()].name == seg)
    }

    /// Search-to-root: the current scope, then each enclosing scope up to
    /// the root.
    pub fn search_to_root(&self, scope: NsId, seg: NameSeg) -> Option<NsId> {
        let mut cursor = Some(scope);
        while let Some(s) = cursor {
            if let Some(found) = self.lookup_in(s, seg) {
                return Some(found);
            }
            cursor = self.nodes[s.index()].parent;
        }
        None
    }

    /// Exhaustive scan for a segment anywhere in the namespace. Used only to
    /// classify lookup failures.
    pub fn find_anywhere(&self, seg: NameSeg) -> Option<NsId> {
        self.ids().find(|&id| self.nodes[id.index()].name == seg)
    }

    /// Intern a segment into a single scope.
    pub fn intern(
        &mut self,
        scope: NsId,
        seg: NameSeg,
        object_type: ObjectType,
        decl: Option<NodeId>,
    ) -> InternResult {
        if let Some(existing) = self.lookup_in(scope, seg) {
            return InternResult::Exists(existing);
        }
        let id = NsId(self.nodes.len() as u32);
        self.nodes.push(NsNode {
            name: seg,
            object_type,
            parent: Some(scope),
            children: Vec::new(),
            decl,
            referenced: false,
            payload: NsPayload::None,
        });
        self.nodes[scope.index()].children.push(id);
        InternResult::Created(id)
    }

    /// Follow an alias exactly one level. Non-aliases return themselves.
    pub fn deref_alias(&self, id: NsId) -> NsId {
        match self.nodes[id.index()].payload {
            NsPayload::Alias { target } => target,
            _ => id,
        }
    }

    /// Render the fully qualified pathname of a node, e.g. `\_SB.PCI0.FOO_`.
    pub fn pathname(&self, id: NsId) -> String {
        if id == self.root {
            return "\\".to_string();
        }
        let mut segs = Vec::new();
        let mut cursor = Some(id);
        while let Some(c) = cursor {
            if c == self.root {
                break;
            }
            segs.push(self.nodes[c.index()].name.as_str().to_string());
            cursor = self.nodes[c.index()].parent;
        }
        segs.reverse();
        format!("\\{}", segs.join("."))
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

/// A parsed name path: optional root anchor, parent-prefix count, and the
/// name segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePath {
    pub root_anchored: bool,
    pub parent_hops: u32,
    pub segs: Vec<NameSeg>,
}

impl NamePath {
    /// Parse path text: a leading `\` anchors at the root, each leading `^`
    /// hops one scope outward, segments are separated by `.`.
    pub fn parse(text: &str) -> Self {
        let mut rest = text;
        let root_anchored = rest.starts_with('\\');
        if root_anchored {
            rest = &rest[1..];
        }
        let mut parent_hops = 0;
        while let Some(tail) = rest.strip_prefix('^') {
            parent_hops += 1;
            rest = tail;
        }
        let segs = rest
            .split('.')
            .filter(|s| !s.is_empty())
            .map(NameSeg::new)
            .collect();
        Self {
            root_anchored,
            parent_hops,
            segs,
        }
    }

    /// Single bare segment, eligible for search-to-root.
    pub fn is_single_seg(&self) -> bool {
        !self.root_anchored && self.parent_hops == 0 && self.segs.len() == 1
    }
}
