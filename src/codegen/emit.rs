// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Binary AML emission.
//!
//! Every node encodes as `opcode bytes ++ package length ++ head ++ term
//! children ++ tail`. The [`layout`] function is the single description of
//! that shape per opcode; the length pass and the emitter both consume it,
//! so the computed subtree lengths and the bytes written cannot drift
//! apart. Package-length prefixes are written from the widths the length
//! pass stored on each node.

use crate::core::diagnostics::{CompilerError, ErrorKind};
use crate::core::opcodes::{op_info, AslOp};
use crate::core::session::SessionConfig;
use crate::namespace::NamePath;
use crate::tree::{NodeFlags, NodeId, ParseTree};

/// Byte 1 of the standard table header where the checksum lives.
pub const HEADER_CHECKSUM_OFFSET: usize = 9;
/// Total size of the standard table header.
pub const HEADER_LEN: usize = 36;
/// Compiler id and revision stamped into emitted definition blocks.
pub const CREATOR_ID: &[u8; 4] = b"AFRG";
pub const CREATOR_REVISION: u32 = 0x0004_0000;

/// Growable little-endian output buffer.
pub struct AmlStream {
    buf: Vec<u8>,
}

impl AmlStream {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn patch_u8(&mut self, at: usize, v: u8) {
        self.buf[at] = v;
    }

    pub fn patch_u32(&mut self, at: usize, v: u32) {
        self.buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }
}

impl Default for AmlStream {
    fn default() -> Self {
        Self::new()
    }
}

/// Solve for the byte at `at` that makes the 8-bit sum of `buf` zero.
pub fn fix_checksum(buf: &mut [u8], at: usize) {
    buf[at] = 0;
    let sum = buf.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    buf[at] = 0u8.wrapping_sub(sum);
}

/// Encode a name path into AML name-string form: root/parent prefixes, then
/// a null name, a single 4-byte segment, a dual-name, or a multi-name.
pub fn encode_name_string(path: &str) -> Vec<u8> {
    let parsed = NamePath::parse(path);
    let mut out = Vec::with_capacity(2 + parsed.segs.len() * 4);
    if parsed.root_anchored {
        out.push(b'\\');
    }
    for _ in 0..parsed.parent_hops {
        out.push(b'^');
    }
    match parsed.segs.len() {
        0 => out.push(0x00),
        1 => out.extend_from_slice(parsed.segs[0].bytes()),
        2 => {
            out.push(0x2E);
            out.extend_from_slice(parsed.segs[0].bytes());
            out.extend_from_slice(parsed.segs[1].bytes());
        }
        n => {
            out.push(0x2F);
            out.push(n as u8);
            for seg in &parsed.segs {
                out.extend_from_slice(seg.bytes());
            }
        }
    }
    out
}

/// Capacity of a package-length encoding of `width` bytes, counting the
/// encoding's own bytes inside the value as AML requires.
pub fn pkg_capacity(width: u8) -> u32 {
    match width {
        1 => 0x3F,
        2 => 0xFFF,
        3 => 0xF_FFFF,
        _ => 0xFFF_FFFF,
    }
}

/// Smallest prefix width whose capacity covers `content` plus the prefix
/// itself.
pub fn pkg_width_for(content: u32) -> Result<u8, CompilerError> {
    for width in 1u8..=4 {
        let fits = content
            .checked_add(u32::from(width))
            .is_some_and(|v| v <= pkg_capacity(width));
        if fits {
            return Ok(width);
        }
    }
    Err(CompilerError::new(
        ErrorKind::Codegen,
        "Package length exceeds the encodable maximum",
        None,
    ))
}

/// Encode `value` as a package length of exactly `width` bytes.
pub fn encode_pkg_length(value: u32, width: u8) -> Vec<u8> {
    if width == 1 {
        return vec![(value & 0x3F) as u8];
    }
    let mut out = Vec::with_capacity(width as usize);
    out.push(((width - 1) << 6) | (value & 0x0F) as u8);
    let mut rest = value >> 4;
    for _ in 1..width {
        out.push((rest & 0xFF) as u8);
        rest >>= 8;
    }
    out
}

/// Encode a standalone package-length number (field-unit bit counts and
/// reserved-field skips) at its minimal width. Unlike construct prefixes,
/// the value does not include the encoding's own bytes.
pub fn encode_pkg_number(value: u32) -> Vec<u8> {
    let mut width = 1u8;
    while width < 4 && value > pkg_capacity(width) {
        width += 1;
    }
    encode_pkg_length(value, width)
}

/// Encode an integer literal: prefix byte plus little-endian payload, or
/// the one-byte canonical forms when constant optimization is on.
pub fn encode_integer(config: &SessionConfig, v: u64) -> Vec<u8> {
    if config.optimize_constants {
        let ones = if config.integer_width_32 {
            u64::from(u32::MAX)
        } else {
            u64::MAX
        };
        match v {
            0 => return vec![0x00],
            1 => return vec![0x01],
            _ if v == ones => return vec![0xFF],
            _ => {}
        }
    }
    match super::constants::minimized_width(v) {
        1 => {
            let mut out = vec![0x0A];
            out.push(v as u8);
            out
        }
        2 => {
            let mut out = vec![0x0B];
            out.extend_from_slice(&(v as u16).to_le_bytes());
            out
        }
        4 => {
            let mut out = vec![0x0C];
            out.extend_from_slice(&(v as u32).to_le_bytes());
            out
        }
        _ => {
            let mut out = vec![0x0E];
            out.extend_from_slice(&v.to_le_bytes());
            out
        }
    }
}

/// The byte shape of one node: opcode, optional package-length prefix,
/// locally encoded head bytes, children emitted as terms, and tail bytes.
pub(crate) struct Layout {
    pub opcode: &'static [u8],
    pub pkg: bool,
    pub head: Vec<u8>,
    pub terms: Vec<NodeId>,
    pub tail: Vec<u8>,
}

impl Layout {
    fn bare(opcode: &'static [u8]) -> Self {
        Self {
            opcode,
            pkg: false,
            head: Vec::new(),
            terms: Vec::new(),
            tail: Vec::new(),
        }
    }
}

fn name_of(tree: &ParseTree, node: NodeId) -> Vec<u8> {
    tree.node(node)
        .name()
        .map(encode_name_string)
        .unwrap_or_default()
}

fn child_u8(tree: &ParseTree, node: NodeId, index: usize) -> u8 {
    tree.child(node, index)
        .and_then(|c| tree.node(c).integer())
        .unwrap_or(0) as u8
}

fn child_name(tree: &ParseTree, node: NodeId, index: usize) -> Vec<u8> {
    tree.child(node, index)
        .and_then(|c| tree.node(c).name().map(encode_name_string))
        .unwrap_or_default()
}

/// Field-unit list bytes for Field/BankField groups: named units, reserved
/// skips for Offset, and access changes. Backward offsets were rejected
/// during validation; here they clamp to zero skip.
fn field_unit_list(tree: &ParseTree, node: NodeId, from: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let mut bit_offset: u64 = 0;
    for unit in tree.children(node).into_iter().skip(from) {
        match tree.node(unit).op {
            AslOp::FieldUnit => {
                let bits = tree
                    .child(unit, 0)
                    .and_then(|c| tree.node(c).integer())
                    .unwrap_or(0);
                match tree.node(unit).name() {
                    Some(name) => out.extend_from_slice(crate::namespace::NameSeg::new(name).bytes()),
                    None => out.extend_from_slice(b"____"),
                }
                out.extend_from_slice(&encode_pkg_number(bits as u32));
                bit_offset += bits;
            }
            AslOp::Offset => {
                let target = tree
                    .child(unit, 0)
                    .and_then(|c| tree.node(c).integer())
                    .unwrap_or(0)
                    * 8;
                let skip = target.saturating_sub(bit_offset);
                if skip > 0 {
                    out.push(0x00);
                    out.extend_from_slice(&encode_pkg_number(skip as u32));
                }
                bit_offset = bit_offset.max(target);
            }
            AslOp::AccessAs => {
                out.push(0x01);
                out.push(child_u8(tree, unit, 0));
                out.push(child_u8(tree, unit, 1));
            }
            _ => {}
        }
    }
    out
}

/// Compute the byte shape of `node`. Both the length pass and the emitter
/// call this, so it must be deterministic for a given tree.
pub(crate) fn layout(
    config: &SessionConfig,
    tree: &ParseTree,
    node: NodeId,
) -> Result<Layout, CompilerError> {
    let op = tree.node(node).op;
    let info = op_info(op);
    let all_children = tree.children(node);

    let lay = match op {
        // The definition-block header is written by the emitter directly.
        AslOp::DefinitionBlock => Layout {
            opcode: &[],
            pkg: false,
            head: Vec::new(),
            terms: all_children.into_iter().skip(5).collect(),
            tail: Vec::new(),
        },
        AslOp::Scope | AslOp::Device | AslOp::ThermalZone => Layout {
            opcode: info.aml,
            pkg: true,
            head: name_of(tree, node),
            terms: all_children,
            tail: Vec::new(),
        },
        AslOp::Method => {
            let mut head = name_of(tree, node);
            head.push(child_u8(tree, node, 0));
            Layout {
                opcode: info.aml,
                pkg: true,
                head,
                terms: all_children.into_iter().skip(1).collect(),
                tail: Vec::new(),
            }
        }
        AslOp::Processor => {
            let mut head = name_of(tree, node);
            head.push(child_u8(tree, node, 0));
            let addr = tree
                .child(node, 1)
                .and_then(|c| tree.node(c).integer())
                .unwrap_or(0) as u32;
            head.extend_from_slice(&addr.to_le_bytes());
            head.push(child_u8(tree, node, 2));
            Layout {
                opcode: info.aml,
                pkg: true,
                head,
                terms: all_children.into_iter().skip(3).collect(),
                tail: Vec::new(),
            }
        }
        AslOp::PowerResource => {
            let mut head = name_of(tree, node);
            head.push(child_u8(tree, node, 0));
            let order = tree
                .child(node, 1)
                .and_then(|c| tree.node(c).integer())
                .unwrap_or(0) as u16;
            head.extend_from_slice(&order.to_le_bytes());
            Layout {
                opcode: info.aml,
                pkg: true,
                head,
                terms: all_children.into_iter().skip(2).collect(),
                tail: Vec::new(),
            }
        }
        AslOp::Name => Layout {
            opcode: info.aml,
            pkg: false,
            head: name_of(tree, node),
            terms: all_children,
            tail: Vec::new(),
        },
        AslOp::Alias => Layout {
            opcode: info.aml,
            pkg: false,
            head: child_name(tree, node, 0),
            terms: Vec::new(),
            tail: name_of(tree, node),
        },
        AslOp::External => {
            let mut head = name_of(tree, node);
            // Object type Method, then the declared argument count.
            head.push(0x08);
            head.push(child_u8(tree, node, 0));
            Layout {
                opcode: info.aml,
                pkg: false,
                head,
                terms: Vec::new(),
                tail: Vec::new(),
            }
        }
        AslOp::Mutex => {
            let mut head = name_of(tree, node);
            head.push(child_u8(tree, node, 0));
            Layout {
                opcode: info.aml,
                pkg: false,
                head,
                terms: Vec::new(),
                tail: Vec::new(),
            }
        }
        AslOp::Event => Layout {
            opcode: info.aml,
            pkg: false,
            head: name_of(tree, node),
            terms: Vec::new(),
            tail: Vec::new(),
        },
        AslOp::OperationRegion => {
            let mut head = name_of(tree, node);
            head.push(child_u8(tree, node, 0));
            Layout {
                opcode: info.aml,
                pkg: false,
                head,
                terms: all_children.into_iter().skip(1).collect(),
                tail: Vec::new(),
            }
        }
        AslOp::Field => {
            let mut head = child_name(tree, node, 0);
            head.push(child_u8(tree, node, 1));
            head.extend_from_slice(&field_unit_list(tree, node, 2));
            Layout {
                opcode: info.aml,
                pkg: true,
                head,
                terms: Vec::new(),
                tail: Vec::new(),
            }
        }
        AslOp::IndexField => {
            let mut head = child_name(tree, node, 0);
            head.extend_from_slice(&child_name(tree, node, 1));
            head.push(child_u8(tree, node, 2));
            head.extend_from_slice(&field_unit_list(tree, node, 3));
            Layout {
                opcode: info.aml,
                pkg: true,
                head,
                terms: Vec::new(),
                tail: Vec::new(),
            }
        }
        AslOp::BankField => {
            let mut head = child_name(tree, node, 0);
            head.extend_from_slice(&child_name(tree, node, 1));
            // Bank value was validated to be a folded constant.
            let bank = tree
                .child(node, 2)
                .and_then(|c| tree.node(c).integer())
                .unwrap_or(0);
            head.extend_from_slice(&encode_integer(config, bank));
            head.push(child_u8(tree, node, 3));
            head.extend_from_slice(&field_unit_list(tree, node, 4));
            Layout {
                opcode: info.aml,
                pkg: true,
                head,
                terms: Vec::new(),
                tail: Vec::new(),
            }
        }
        AslOp::CreateBitField
        | AslOp::CreateByteField
        | AslOp::CreateWordField
        | AslOp::CreateDWordField
        | AslOp::CreateQWordField
        | AslOp::CreateField => Layout {
            opcode: info.aml,
            pkg: false,
            head: Vec::new(),
            terms: all_children,
            tail: name_of(tree, node),
        },
        AslOp::Integer => {
            let v = tree.node(node).integer().unwrap_or(0);
            Layout {
                opcode: &[],
                pkg: false,
                head: encode_integer(config, v),
                terms: Vec::new(),
                tail: Vec::new(),
            }
        }
        AslOp::Zero | AslOp::One | AslOp::Ones | AslOp::Revision | AslOp::Debug => {
            Layout::bare(info.aml)
        }
        AslOp::String => {
            let mut head = Vec::new();
            if let crate::tree::NodeValue::String(s) = &tree.node(node).value {
                head.extend_from_slice(s.as_bytes());
            }
            head.push(0x00);
            Layout {
                opcode: info.aml,
                pkg: false,
                head,
                terms: Vec::new(),
                tail: Vec::new(),
            }
        }
        AslOp::Buffer => {
            let data = match &tree.node(node).value {
                crate::tree::NodeValue::Buffer(bytes) => bytes.clone(),
                _ => Vec::new(),
            };
            let mut head = encode_integer(config, data.len() as u64);
            head.extend_from_slice(&data);
            Layout {
                opcode: info.aml,
                pkg: true,
                head,
                terms: all_children,
                tail: Vec::new(),
            }
        }
        AslOp::Package => {
            let count = tree
                .child(node, 0)
                .and_then(|c| tree.node(c).integer())
                .unwrap_or(0) as u8;
            Layout {
                opcode: info.aml,
                pkg: true,
                head: vec![count],
                terms: tree.children(node).into_iter().skip(1).collect(),
                tail: Vec::new(),
            }
        }
        AslOp::VarPackage => Layout {
            opcode: info.aml,
            pkg: true,
            head: Vec::new(),
            terms: all_children,
            tail: Vec::new(),
        },
        AslOp::NamePath => Layout {
            opcode: &[],
            pkg: false,
            head: name_of(tree, node),
            terms: Vec::new(),
            tail: Vec::new(),
        },
        AslOp::MethodCall => Layout {
            opcode: &[],
            pkg: false,
            head: name_of(tree, node),
            terms: all_children,
            tail: Vec::new(),
        },
        AslOp::If | AslOp::While | AslOp::Else => Layout {
            opcode: info.aml,
            pkg: true,
            head: Vec::new(),
            terms: all_children,
            tail: Vec::new(),
        },
        AslOp::Return => {
            if all_children.is_empty() {
                // Return with no operand emits the null value.
                Layout {
                    opcode: info.aml,
                    pkg: false,
                    head: vec![0x00],
                    terms: Vec::new(),
                    tail: Vec::new(),
                }
            } else {
                Layout {
                    opcode: info.aml,
                    pkg: false,
                    head: Vec::new(),
                    terms: all_children,
                    tail: Vec::new(),
                }
            }
        }
        AslOp::Acquire => {
            let timeout = tree
                .child(node, 1)
                .and_then(|c| tree.node(c).integer())
                .unwrap_or(0xFFFF) as u16;
            Layout {
                opcode: info.aml,
                pkg: false,
                head: Vec::new(),
                terms: all_children.into_iter().take(1).collect(),
                tail: timeout.to_le_bytes().to_vec(),
            }
        }
        AslOp::Fatal => {
            let mut head = vec![child_u8(tree, node, 0)];
            let code = tree
                .child(node, 1)
                .and_then(|c| tree.node(c).integer())
                .unwrap_or(0) as u32;
            head.extend_from_slice(&code.to_le_bytes());
            Layout {
                opcode: info.aml,
                pkg: false,
                head,
                terms: all_children.into_iter().skip(2).collect(),
                tail: Vec::new(),
            }
        }
        // Consumed by their parent's layout or replaced before emission.
        AslOp::FieldUnit
        | AslOp::Offset
        | AslOp::AccessAs
        | AslOp::ResourceTag
        | AslOp::Eisaid
        | AslOp::ToUuid
        | AslOp::Unicode => Layout::bare(&[]),
        // Everything else: opcode bytes followed by all children as terms.
        _ => Layout {
            opcode: info.aml,
            pkg: false,
            head: Vec::new(),
            terms: all_children,
            tail: Vec::new(),
        },
    };
    Ok(lay)
}

/// Emit one node and its subtree into the stream, using the package-length
/// widths chosen by the length pass.
pub(crate) fn emit_node(
    config: &SessionConfig,
    tree: &ParseTree,
    node: NodeId,
    out: &mut AmlStream,
) -> Result<(), CompilerError> {
    if tree.node(node).flags.contains(NodeFlags::UNRESOLVED) {
        return Ok(());
    }
    if tree.node(node).op == AslOp::DefinitionBlock {
        return emit_definition_block(config, tree, node, out);
    }
    let lay = layout(config, tree, node)?;
    out.write_bytes(lay.opcode);
    if lay.pkg {
        let n = tree.node(node);
        let value = n.aml_subtree_len - lay.opcode.len() as u32;
        out.write_bytes(&encode_pkg_length(value, n.pkg_len_width));
    }
    out.write_bytes(&lay.head);
    for term in &lay.terms {
        emit_node(config, tree, *term, out)?;
    }
    out.write_bytes(&lay.tail);
    Ok(())
}

fn header_string(tree: &ParseTree, node: NodeId, index: usize, width: usize) -> Vec<u8> {
    let mut out = vec![b' '; width];
    if let Some(child) = tree.child(node, index) {
        if let crate::tree::NodeValue::String(s) = &tree.node(child).value {
            for (slot, b) in out.iter_mut().zip(s.bytes()) {
                *slot = b;
            }
        }
    }
    out
}

/// Standard 36-byte table header, body, then length and checksum fixup.
fn emit_definition_block(
    config: &SessionConfig,
    tree: &ParseTree,
    node: NodeId,
    out: &mut AmlStream,
) -> Result<(), CompilerError> {
    let start = out.len();
    out.write_bytes(&header_string(tree, node, 0, 4));
    out.write_u32(0); // table length, patched below
    out.write_u8(child_u8(tree, node, 1));
    out.write_u8(0); // checksum, patched below
    out.write_bytes(&header_string(tree, node, 2, 6));
    out.write_bytes(&header_string(tree, node, 3, 8));
    let oem_rev = tree
        .child(node, 4)
        .and_then(|c| tree.node(c).integer())
        .unwrap_or(0) as u32;
    out.write_u32(oem_rev);
    out.write_bytes(CREATOR_ID);
    out.write_u32(CREATOR_REVISION);
    debug_assert_eq!(out.len() - start, HEADER_LEN);

    for term in tree.children(node).into_iter().skip(5) {
        emit_node(config, tree, term, out)?;
    }

    let total = (out.len() - start) as u32;
    out.patch_u32(start + 4, total);
    let sum = out.bytes()[start..]
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_add(b));
    out.patch_u8(start + HEADER_CHECKSUM_OFFSET, 0u8.wrapping_sub(sum));
    Ok(())
}
