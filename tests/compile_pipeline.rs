// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! End-to-end test of the ASL compilation pipeline: namespace load,
//! reference resolution, semantic analysis, and AML generation over a
//! hand-built parse tree, the way the external parser delivers one.

use amlforge::analyzer;
use amlforge::codegen;
use amlforge::core::diagnostics::{Level, SourceLoc};
use amlforge::core::opcodes::{AslOp, TypeBits};
use amlforge::core::session::{Session, SessionConfig};
use amlforge::namespace::{self, NameSeg, NsPayload};
use amlforge::tree::{NodeId, NodeValue, ParseTree};

fn loc(line: u32) -> SourceLoc {
    SourceLoc::new(line, 1)
}

fn definition_block(tree: &mut ParseTree) -> NodeId {
    let root = tree.alloc(AslOp::DefinitionBlock, loc(1));
    tree.set_root(root);
    for (op, value) in [
        (AslOp::String, NodeValue::String("DSDT".to_string())),
        (AslOp::Integer, NodeValue::Integer(2)),
        (AslOp::String, NodeValue::String("ACME".to_string())),
        (AslOp::String, NodeValue::String("PIPELINE".to_string())),
        (AslOp::Integer, NodeValue::Integer(1)),
    ] {
        let child = tree.add_child(root, op, loc(1));
        tree.node_mut(child).value = value;
    }
    root
}

/// `Method (MTH0, 2) { If (Arg0) { Return (5) } Store (Arg1, Local0) }`
/// followed by a caller that consumes the result.
fn build_mixed_return_tree() -> ParseTree {
    let mut tree = ParseTree::new();
    let root = definition_block(&mut tree);

    let method = tree.add_child(root, AslOp::Method, loc(2));
    tree.node_mut(method).value = NodeValue::Name("MTH0".to_string());
    let flags = tree.add_child(method, AslOp::Integer, loc(2));
    tree.node_mut(flags).value = NodeValue::Integer(2);

    let iff = tree.add_child(method, AslOp::If, loc(3));
    tree.add_child(iff, AslOp::ArgRef(0), loc(3));
    let ret = tree.add_child(iff, AslOp::Return, loc(4));
    let five = tree.add_child(ret, AslOp::Integer, loc(4));
    tree.node_mut(five).value = NodeValue::Integer(5);

    let store = tree.add_child(method, AslOp::Store, loc(5));
    tree.add_child(store, AslOp::ArgRef(1), loc(5));
    tree.add_child(store, AslOp::LocalRef(0), loc(5));

    let caller = tree.add_child(root, AslOp::Method, loc(7));
    tree.node_mut(caller).value = NodeValue::Name("CALL".to_string());
    let flags = tree.add_child(caller, AslOp::Integer, loc(7));
    tree.node_mut(flags).value = NodeValue::Integer(0);
    let store = tree.add_child(caller, AslOp::Store, loc(8));
    let invoke = tree.add_child(store, AslOp::MethodCall, loc(8));
    tree.node_mut(invoke).value = NodeValue::Name("MTH0".to_string());
    for v in [1u64, 2] {
        let arg = tree.add_child(invoke, AslOp::Integer, loc(8));
        tree.node_mut(arg).value = NodeValue::Integer(v);
    }
    tree.add_child(store, AslOp::LocalRef(0), loc(8));

    tree
}

#[test]
fn mixed_return_method_compiles_with_warning_and_union_type() {
    let mut session = Session::new(SessionConfig::default());
    let mut tree = build_mixed_return_tree();

    let mut ns = namespace::load::load_namespace(&mut session, &mut tree).unwrap();
    namespace::resolve::resolve_references(&mut session, &mut tree, &mut ns).unwrap();
    analyzer::analyze(&mut session, &mut tree, &mut ns).unwrap();

    assert_eq!(session.diagnostics().error_count(), 0);
    let warning = session
        .diagnostics()
        .iter()
        .find(|d| d.message().contains("Not all control paths return a value"))
        .expect("mixed-return warning");
    assert_eq!(warning.level(), Level::Warning);
    assert!(warning.message().contains("MTH0"));

    // Inferred type is the union of the one explicit return and "no value".
    let method = ns.search_to_root(ns.root(), NameSeg::new("MTH0")).unwrap();
    match ns.node(method).payload {
        NsPayload::Method { return_types, .. } => {
            assert_eq!(return_types, TypeBits::INTEGER | TypeBits::NO_RETURN);
        }
        ref other => panic!("unexpected payload: {other:?}"),
    }

    let aml = codegen::generate(&mut session, &mut tree).unwrap();
    assert_eq!(&aml[..4], b"DSDT");
    assert_eq!(
        u32::from_le_bytes(aml[4..8].try_into().unwrap()) as usize,
        aml.len()
    );
    let sum = aml.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    assert_eq!(sum, 0);
    // Both method bodies made it into the image.
    assert_eq!(aml.iter().filter(|&&b| b == 0x14).count(), 2);
}

#[test]
fn unresolved_reference_degrades_without_aborting_the_pipeline() {
    let mut session = Session::new(SessionConfig::default());
    let mut tree = ParseTree::new();
    let root = definition_block(&mut tree);

    let name = tree.add_child(root, AslOp::Name, loc(2));
    tree.node_mut(name).value = NodeValue::Name("VAL0".to_string());
    let v = tree.add_child(name, AslOp::Integer, loc(2));
    tree.node_mut(v).value = NodeValue::Integer(1);

    let method = tree.add_child(root, AslOp::Method, loc(3));
    tree.node_mut(method).value = NodeValue::Name("BAD0".to_string());
    let flags = tree.add_child(method, AslOp::Integer, loc(3));
    tree.node_mut(flags).value = NodeValue::Integer(0);
    let store = tree.add_child(method, AslOp::Store, loc(4));
    let missing = tree.add_child(store, AslOp::NamePath, loc(4));
    tree.node_mut(missing).value = NodeValue::Name("GONE".to_string());
    tree.add_child(store, AslOp::LocalRef(0), loc(4));

    let mut ns = namespace::load::load_namespace(&mut session, &mut tree).unwrap();
    namespace::resolve::resolve_references(&mut session, &mut tree, &mut ns).unwrap();
    analyzer::analyze(&mut session, &mut tree, &mut ns).unwrap();
    assert_eq!(session.diagnostics().error_count(), 1);

    // Generation still runs; the unresolved node is skipped, everything
    // else is emitted with a consistent header.
    let aml = codegen::generate(&mut session, &mut tree).unwrap();
    assert_eq!(
        u32::from_le_bytes(aml[4..8].try_into().unwrap()) as usize,
        aml.len()
    );
}
