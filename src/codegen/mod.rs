// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! AML code generation.
//!
//! Three stages over the resolved tree: opcode assignment (which also
//! replaces the compile-time macro forms and validates integer magnitudes),
//! a bottom-up length pass choosing every package-length prefix width, and
//! binary emission. Constant folding runs between the first length pass and
//! a forced second one: folding is the only transform that changes a
//! node's encoded byte length, and a shrinking child can shrink its
//! ancestors' prefix widths in turn, so lengths are recomputed until the
//! total stops moving.

pub mod constants;
pub mod emit;

use log::debug;

use crate::core::diagnostics::{CompilerError, ErrorKind};
use crate::core::opcodes::{op_info, AslOp};
use crate::core::session::{Session, SessionConfig};
use crate::tree::{NodeFlags, NodeId, ParseTree};

use emit::{emit_node, layout, pkg_width_for, AmlStream};

/// Compile the resolved tree to its binary AML image.
pub fn generate(session: &mut Session, tree: &mut ParseTree) -> Result<Vec<u8>, CompilerError> {
    let Some(root) = tree.root() else {
        return Ok(Vec::new());
    };
    assign_opcodes(session, tree, root)?;
    let mut total = compute_lengths(&session.config, tree, root)?;

    if session.config.optimize_constants {
        let folded = fold_constants(session, tree, root)?;
        downgrade_var_packages(tree, root);
        if folded {
            // Forced re-pass: folded operands may have narrowed prefix
            // widths anywhere above them.
            total = compute_lengths(&session.config, tree, root)?;
        }
    }
    loop {
        let again = compute_lengths(&session.config, tree, root)?;
        if again == total {
            break;
        }
        total = again;
    }

    let mut out = AmlStream::new();
    emit_node(&session.config, tree, root, &mut out)?;
    debug_assert_eq!(out.len() as u32, total);
    debug!("generated {} bytes of AML", out.len());
    Ok(out.into_bytes())
}

/// First stage: record output opcodes, expand macro constants, validate
/// integer magnitude against the table's integer width, and check the
/// structural constants later layout stages rely on.
fn assign_opcodes(
    session: &mut Session,
    tree: &mut ParseTree,
    node: NodeId,
) -> Result<(), CompilerError> {
    let op = tree.node(node).op;
    match op {
        AslOp::LocalRef(n) if n >= 8 => {
            return Err(CompilerError::internal("Local register index out of range"));
        }
        AslOp::ArgRef(n) if n >= 7 => {
            return Err(CompilerError::internal("Arg register index out of range"));
        }
        _ => {}
    }
    tree.node_mut(node).aml = op_info(op).aml;

    match op {
        AslOp::Integer => check_integer_width(session, tree, node)?,
        AslOp::Eisaid => {
            let text = macro_text(tree, node);
            match constants::encode_eisaid(&text) {
                Ok(v) => tree.convert_to_integer(node, u64::from(v)),
                Err(e) => {
                    let loc = tree.node(node).loc.clone();
                    session.error(ErrorKind::Codegen, e.message(), None, loc)?;
                    tree.convert_to_integer(node, 0);
                }
            }
        }
        AslOp::ToUuid => {
            let text = macro_text(tree, node);
            match constants::encode_uuid(&text) {
                Ok(bytes) => tree.convert_to_buffer(node, bytes.to_vec()),
                Err(e) => {
                    let loc = tree.node(node).loc.clone();
                    session.error(ErrorKind::Codegen, e.message(), None, loc)?;
                    tree.convert_to_buffer(node, vec![0; 16]);
                }
            }
        }
        AslOp::Unicode => {
            let text = macro_text(tree, node);
            tree.convert_to_buffer(node, constants::encode_unicode(&text));
        }
        AslOp::VarPackage => {
            // The parser always produces the variable form; a literal count
            // downgrades right away, folded counts are caught later.
            downgrade_var_packages(tree, node);
        }
        AslOp::BankField => {
            let constant = tree
                .child(node, 2)
                .is_some_and(|c| tree.node(c).integer().is_some());
            if !constant {
                let loc = tree.node(node).loc.clone();
                session.error(
                    ErrorKind::Codegen,
                    "Bank value must be a compile-time constant",
                    None,
                    loc,
                )?;
            }
            check_field_offsets(session, tree, node, 4)?;
        }
        AslOp::Field => check_field_offsets(session, tree, node, 2)?,
        AslOp::IndexField => check_field_offsets(session, tree, node, 3)?,
        _ => {}
    }

    for child in tree.children(node) {
        assign_opcodes(session, tree, child)?;
    }
    Ok(())
}

fn macro_text(tree: &ParseTree, node: NodeId) -> String {
    match &tree.node(node).value {
        crate::tree::NodeValue::String(s) => s.clone(),
        _ => String::new(),
    }
}

fn check_integer_width(
    session: &mut Session,
    tree: &mut ParseTree,
    node: NodeId,
) -> Result<(), CompilerError> {
    let v = tree.node(node).integer().unwrap_or(0);
    if session.config.integer_width_32 && v > u64::from(u32::MAX) {
        let loc = tree.node(node).loc.clone();
        let param = format!("0x{v:X}");
        if session.config.truncate_on_overflow {
            session.warning(
                ErrorKind::Codegen,
                "Integer truncated to the table's 32-bit width",
                Some(&param),
                loc,
            )?;
            tree.convert_to_integer(node, v & u64::from(u32::MAX));
        } else {
            session.error(
                ErrorKind::Codegen,
                "Integer is too large for the table's 32-bit width",
                Some(&param),
                loc,
            )?;
        }
    }
    let v = tree.node(node).integer().unwrap_or(0);
    tree.node_mut(node).int_width = constants::minimized_width(v);
    Ok(())
}

/// Offsets within one field group must be monotonically non-decreasing,
/// since the binary form encodes them as forward skips.
fn check_field_offsets(
    session: &mut Session,
    tree: &ParseTree,
    node: NodeId,
    from: usize,
) -> Result<(), CompilerError> {
    let mut bit_offset: u64 = 0;
    for unit in tree.children(node).into_iter().skip(from) {
        match tree.node(unit).op {
            AslOp::FieldUnit => {
                bit_offset += tree
                    .child(unit, 0)
                    .and_then(|c| tree.node(c).integer())
                    .unwrap_or(0);
            }
            AslOp::Offset => {
                let target = tree
                    .child(unit, 0)
                    .and_then(|c| tree.node(c).integer())
                    .unwrap_or(0)
                    * 8;
                if target < bit_offset {
                    let loc = tree.node(unit).loc.clone();
                    session.error(
                        ErrorKind::Codegen,
                        "Field offset moves backward over already-declared units",
                        None,
                        loc,
                    )?;
                }
                bit_offset = bit_offset.max(target);
            }
            _ => {}
        }
    }
    Ok(())
}

/// Retag variable-length packages whose element count folded to a small
/// constant into the fixed-length form.
fn downgrade_var_packages(tree: &mut ParseTree, node: NodeId) {
    if tree.node(node).op == AslOp::VarPackage {
        let count = tree.child(node, 0).and_then(|c| tree.node(c).integer());
        if matches!(count, Some(n) if n <= u64::from(u8::MAX)) {
            tree.node_mut(node).op = AslOp::Package;
            tree.node_mut(node).aml = op_info(AslOp::Package).aml;
        }
    }
    for child in tree.children(node) {
        downgrade_var_packages(tree, child);
    }
}

/// Bottom-up length pass: computes every node's encoded subtree length and
/// chooses its package-length prefix width.
fn compute_lengths(
    config: &SessionConfig,
    tree: &mut ParseTree,
    node: NodeId,
) -> Result<u32, CompilerError> {
    if tree.node(node).flags.contains(NodeFlags::UNRESOLVED) {
        tree.node_mut(node).aml_subtree_len = 0;
        return Ok(0);
    }
    if tree.node(node).op == AslOp::DefinitionBlock {
        let mut total = emit::HEADER_LEN as u32;
        for child in tree.children(node).into_iter().skip(5) {
            total += compute_lengths(config, tree, child)?;
        }
        tree.node_mut(node).aml_subtree_len = total;
        return Ok(total);
    }

    let lay = layout(config, tree, node)?;
    let mut content = (lay.head.len() + lay.tail.len()) as u32;
    for term in &lay.terms {
        content += compute_lengths(config, tree, *term)?;
    }
    let mut total = lay.opcode.len() as u32 + content;
    if lay.pkg {
        let width = pkg_width_for(content)?;
        tree.node_mut(node).pkg_len_width = width;
        total += u32::from(width);
    }
    tree.node_mut(node).aml_subtree_len = total;
    Ok(total)
}

/// Which operators fold, and how. Only pure integer operators with every
/// operand a literal and no target supplied are folded away.
fn fold_op(op: AslOp, operands: &[u64], mask: u64) -> Option<Result<u64, &'static str>> {
    let a = operands.first().copied().unwrap_or(0);
    let b = operands.get(1).copied().unwrap_or(0);
    let v = match op {
        AslOp::Add => a.wrapping_add(b),
        AslOp::Subtract => a.wrapping_sub(b),
        AslOp::Multiply => a.wrapping_mul(b),
        AslOp::Mod => {
            if b == 0 {
                return Some(Err("Modulo by constant zero"));
            }
            a % b
        }
        AslOp::And => a & b,
        AslOp::Or => a | b,
        AslOp::Xor => a ^ b,
        AslOp::Not => !a,
        AslOp::ShiftLeft => {
            if b >= 64 {
                0
            } else {
                a.wrapping_shl(b as u32)
            }
        }
        AslOp::ShiftRight => {
            if b >= 64 {
                0
            } else {
                a.wrapping_shr(b as u32)
            }
        }
        _ => return None,
    };
    Some(Ok(v & mask))
}

/// Post-order constant folding. Returns whether anything changed.
fn fold_constants(
    session: &mut Session,
    tree: &mut ParseTree,
    node: NodeId,
) -> Result<bool, CompilerError> {
    let mut changed = false;
    for child in tree.children(node) {
        changed |= fold_constants(session, tree, child)?;
    }

    let op = tree.node(node).op;
    let info = op_info(op);
    if info.runtime_args.is_empty() {
        return Ok(changed);
    }
    let mut operands = Vec::new();
    for (index, _) in info.runtime_args.iter().enumerate() {
        let is_target = info.target_mask & (1 << index) != 0;
        match tree.child(node, index) {
            Some(child) if is_target => {
                // A supplied target keeps the operator: it has a store side
                // effect the fold would lose.
                if !matches!(tree.node(child).op, AslOp::Zero) {
                    return Ok(changed);
                }
            }
            Some(child) => match tree.node(child).integer() {
                Some(v) => operands.push(v),
                None => return Ok(changed),
            },
            None if is_target => {}
            None => return Ok(changed),
        }
    }

    let mask = if session.config.integer_width_32 {
        u64::from(u32::MAX)
    } else {
        u64::MAX
    };
    match fold_op(op, &operands, mask) {
        Some(Ok(v)) => {
            tree.convert_to_integer(node, v);
            Ok(true)
        }
        Some(Err(msg)) => {
            let loc = tree.node(node).loc.clone();
            session.error(ErrorKind::Codegen, msg, None, loc)?;
            Ok(changed)
        }
        None => Ok(changed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::diagnostics::SourceLoc;
    use crate::core::session::SessionConfig;
    use crate::tree::NodeValue;

    fn loc(line: u32) -> SourceLoc {
        SourceLoc::new(line, 1)
    }

    fn definition_block(sig: &str) -> (ParseTree, NodeId) {
        let mut tree = ParseTree::new();
        let root = tree.alloc(AslOp::DefinitionBlock, loc(1));
        tree.set_root(root);
        let s = tree.add_child(root, AslOp::String, loc(1));
        tree.node_mut(s).value = NodeValue::String(sig.to_string());
        let rev = tree.add_child(root, AslOp::Integer, loc(1));
        tree.node_mut(rev).value = NodeValue::Integer(2);
        let oem = tree.add_child(root, AslOp::String, loc(1));
        tree.node_mut(oem).value = NodeValue::String("OEMID".to_string());
        let oemt = tree.add_child(root, AslOp::String, loc(1));
        tree.node_mut(oemt).value = NodeValue::String("OEMTABLE".to_string());
        let oemr = tree.add_child(root, AslOp::Integer, loc(1));
        tree.node_mut(oemr).value = NodeValue::Integer(1);
        (tree, root)
    }

    fn session() -> Session {
        Session::new(SessionConfig::default())
    }

    #[test]
    fn definition_block_header_is_patched_and_checksummed() {
        let (mut tree, root) = definition_block("DSDT");
        let name = tree.add_child(root, AslOp::Name, loc(2));
        tree.node_mut(name).value = NodeValue::Name("VAL0".to_string());
        let v = tree.add_child(name, AslOp::Integer, loc(2));
        tree.node_mut(v).value = NodeValue::Integer(0x42);

        let mut session = session();
        let aml = generate(&mut session, &mut tree).unwrap();
        assert_eq!(&aml[..4], b"DSDT");
        let len = u32::from_le_bytes(aml[4..8].try_into().unwrap());
        assert_eq!(len as usize, aml.len());
        assert_eq!(aml[8], 2); // revision
        let sum = aml.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
        assert_eq!(sum, 0);
        // Body: NameOp, "VAL0", BytePrefix 0x42.
        let body = &aml[36..];
        assert_eq!(body, &[0x08, b'V', b'A', b'L', b'0', 0x0A, 0x42]);
    }

    #[test]
    fn out_of_range_arg_register_is_an_internal_error() {
        let (mut tree, root) = definition_block("SSDT");
        let m = tree.add_child(root, AslOp::Method, loc(2));
        tree.node_mut(m).value = NodeValue::Name("BADR".to_string());
        let f = tree.add_child(m, AslOp::Integer, loc(2));
        tree.node_mut(f).value = NodeValue::Integer(0);
        let store = tree.add_child(m, AslOp::Store, loc(3));
        let c = tree.add_child(store, AslOp::Integer, loc(3));
        tree.node_mut(c).value = NodeValue::Integer(1);
        tree.add_child(store, AslOp::ArgRef(7), loc(3));

        let mut session = session();
        let err = generate(&mut session, &mut tree).unwrap_err();
        assert!(err.message().contains("register index"));
    }

    #[test]
    fn folding_shrinks_enclosing_package_lengths() {
        let (mut tree, root) = definition_block("SSDT");
        let m = tree.add_child(root, AslOp::Method, loc(2));
        tree.node_mut(m).value = NodeValue::Name("CALC".to_string());
        let f = tree.add_child(m, AslOp::Integer, loc(2));
        tree.node_mut(f).value = NodeValue::Integer(0);
        let store = tree.add_child(m, AslOp::Store, loc(3));
        let add = tree.add_child(store, AslOp::Add, loc(3));
        for v in [0x1000u64, 0x0234] {
            let c = tree.add_child(add, AslOp::Integer, loc(3));
            tree.node_mut(c).value = NodeValue::Integer(v);
        }
        tree.add_child(store, AslOp::LocalRef(0), loc(3));

        let mut session = session();
        let aml = generate(&mut session, &mut tree).unwrap();
        assert_eq!(session.diagnostics().error_count(), 0);
        // The Add folded into a single word literal.
        let body = &aml[36..];
        // MethodOp PkgLength "CALC" flags StoreOp WordPrefix 0x1234 Local0.
        assert_eq!(body[0], 0x14);
        assert_eq!(&body[2..6], b"CALC");
        assert_eq!(body[6], 0x00);
        assert_eq!(&body[7..], &[0x70, 0x0B, 0x34, 0x12, 0x60]);
        // PkgLength covers everything after the MethodOp byte.
        assert_eq!(body[1] as usize, body.len() - 1);
    }

    #[test]
    fn supplied_target_inhibits_folding() {
        let (mut tree, root) = definition_block("SSDT");
        let m = tree.add_child(root, AslOp::Method, loc(2));
        tree.node_mut(m).value = NodeValue::Name("KEEP".to_string());
        let f = tree.add_child(m, AslOp::Integer, loc(2));
        tree.node_mut(f).value = NodeValue::Integer(0);
        let add = tree.add_child(m, AslOp::Add, loc(3));
        for v in [2u64, 3] {
            let c = tree.add_child(add, AslOp::Integer, loc(3));
            tree.node_mut(c).value = NodeValue::Integer(v);
        }
        tree.add_child(add, AslOp::LocalRef(0), loc(3));

        let mut session = session();
        let aml = generate(&mut session, &mut tree).unwrap();
        let body = &aml[36..];
        // AddOp survives, with canonical operand encodings intact.
        assert!(body.contains(&0x72));
    }

    #[test]
    fn var_package_with_constant_count_downgrades() {
        let (mut tree, root) = definition_block("SSDT");
        let name = tree.add_child(root, AslOp::Name, loc(2));
        tree.node_mut(name).value = NodeValue::Name("PKG0".to_string());
        let pkg = tree.add_child(name, AslOp::VarPackage, loc(2));
        let count = tree.add_child(pkg, AslOp::Integer, loc(2));
        tree.node_mut(count).value = NodeValue::Integer(2);
        for v in [5u64, 6] {
            let c = tree.add_child(pkg, AslOp::Integer, loc(2));
            tree.node_mut(c).value = NodeValue::Integer(v);
        }

        let mut session = session();
        let aml = generate(&mut session, &mut tree).unwrap();
        let body = &aml[36..];
        // NameOp "PKG0" PackageOp (0x12, not 0x13) PkgLength NumElements=2.
        assert_eq!(body[5], 0x12);
        assert_eq!(body[7], 2);
    }

    #[test]
    fn integer_overflow_on_32bit_tables() {
        let (mut tree, root) = definition_block("DSDT");
        let name = tree.add_child(root, AslOp::Name, loc(2));
        tree.node_mut(name).value = NodeValue::Name("BIG0".to_string());
        let v = tree.add_child(name, AslOp::Integer, loc(2));
        tree.node_mut(v).value = NodeValue::Integer(0x1_0000_0001);

        let mut config = SessionConfig::default();
        config.integer_width_32 = true;
        let mut session = Session::new(config);
        generate(&mut session, &mut tree).unwrap();
        assert_eq!(session.diagnostics().error_count(), 1);

        // With the truncate fallback it degrades to a warning and the
        // value is masked.
        let (mut tree2, root2) = definition_block("DSDT");
        let name2 = tree2.add_child(root2, AslOp::Name, loc(2));
        tree2.node_mut(name2).value = NodeValue::Name("BIG0".to_string());
        let v2 = tree2.add_child(name2, AslOp::Integer, loc(2));
        tree2.node_mut(v2).value = NodeValue::Integer(0x1_0000_0001);
        let mut config2 = SessionConfig::default();
        config2.integer_width_32 = true;
        config2.truncate_on_overflow = true;
        let mut session2 = Session::new(config2);
        let aml = generate(&mut session2, &mut tree2).unwrap();
        assert_eq!(session2.diagnostics().error_count(), 0);
        assert_eq!(tree2.node(v2).integer(), Some(1));
        // Optimization rewrites the masked 1 to the canonical OneOp.
        assert_eq!(&aml[36..], &[0x08, b'B', b'I', b'G', b'0', 0x01]);
    }

    #[test]
    fn eisaid_macro_becomes_an_integer_literal() {
        let (mut tree, root) = definition_block("DSDT");
        let name = tree.add_child(root, AslOp::Name, loc(2));
        tree.node_mut(name).value = NodeValue::Name("_HID".to_string());
        let id = tree.add_child(name, AslOp::Eisaid, loc(2));
        tree.node_mut(id).value = NodeValue::String("PNP0501".to_string());

        let mut session = session();
        generate(&mut session, &mut tree).unwrap();
        assert_eq!(session.diagnostics().error_count(), 0);
        let encoded = constants::encode_eisaid("PNP0501").unwrap();
        assert_eq!(tree.node(id).integer(), Some(u64::from(encoded)));
    }

    #[test]
    fn unicode_macro_becomes_a_buffer() {
        let (mut tree, root) = definition_block("DSDT");
        let name = tree.add_child(root, AslOp::Name, loc(2));
        tree.node_mut(name).value = NodeValue::Name("STR0".to_string());
        let u = tree.add_child(name, AslOp::Unicode, loc(2));
        tree.node_mut(u).value = NodeValue::String("Hi".to_string());

        let mut session = session();
        let aml = generate(&mut session, &mut tree).unwrap();
        assert_eq!(tree.node(u).op, AslOp::Buffer);
        // BufferOp PkgLength size-term then UTF-16LE payload.
        let body = &aml[36..];
        assert_eq!(body[5], 0x11);
        assert!(body.ends_with(&[b'H', 0, b'i', 0, 0, 0]));
    }
}
