// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Reserved-name contract checks.
//!
//! Names beginning with an underscore belong to the platform firmware
//! interface. A fixed table records, per reserved name, the argument count
//! a method implementation must declare and whether the OS expects a return
//! value. Declared names outside the table are flagged, as are user
//! declarations in the compiler's own `_T_x` temporary range.

use log::debug;

use crate::core::diagnostics::{CompilerError, ErrorKind, SourceLoc};
use crate::core::opcodes::TypeBits;
use crate::core::session::Session;
use crate::namespace::{Namespace, NsPayload, ObjectType};
use crate::tree::ParseTree;

/// One reserved-name contract: 4-char padded name, required method
/// argument count, and whether a method implementation must return a value.
struct ReservedName {
    name: &'static str,
    arg_count: u8,
    must_return: bool,
}

const fn entry(name: &'static str, arg_count: u8, must_return: bool) -> ReservedName {
    ReservedName {
        name,
        arg_count,
        must_return,
    }
}

/// The reserved names this compiler knows contracts for. A subset covering
/// the common device, power, and thermal interfaces.
static RESERVED_NAMES: &[ReservedName] = &[
    entry("_AC0", 0, true),
    entry("_ADR", 0, true),
    entry("_AL0", 0, true),
    entry("_BBN", 0, true),
    entry("_BIF", 0, true),
    entry("_BST", 0, true),
    entry("_CID", 0, true),
    entry("_CRS", 0, true),
    entry("_CRT", 0, true),
    entry("_CST", 0, true),
    entry("_DIS", 0, false),
    entry("_DSM", 4, true),
    entry("_DSW", 3, false),
    entry("_EJ0", 1, false),
    entry("_FIF", 0, true),
    entry("_GPE", 0, true),
    entry("_HID", 0, true),
    entry("_INI", 0, false),
    entry("_IRC", 0, false),
    entry("_LID", 0, true),
    entry("_MAT", 0, true),
    entry("_OFF", 0, false),
    entry("_ON_", 0, false),
    entry("_OSC", 4, true),
    entry("_PR_", 0, false),
    entry("_PRS", 0, true),
    entry("_PRT", 0, true),
    entry("_PRW", 0, true),
    entry("_PS0", 0, false),
    entry("_PS3", 0, false),
    entry("_PSC", 0, true),
    entry("_PSS", 0, true),
    entry("_PSV", 0, true),
    entry("_PTS", 1, false),
    entry("_REG", 2, false),
    entry("_RMV", 0, true),
    entry("_SB_", 0, false),
    entry("_SEG", 0, true),
    entry("_SRS", 1, false),
    entry("_STA", 0, true),
    entry("_SUN", 0, true),
    entry("_TMP", 0, true),
    entry("_TTS", 1, false),
    entry("_TZ_", 0, false),
    entry("_UID", 0, true),
    entry("_WAK", 1, true),
];

fn find_reserved(name: &str) -> Option<&'static ReservedName> {
    RESERVED_NAMES.iter().find(|r| r.name == name)
}

/// True for names in the compiler's own temporary range, `_T_0` .. `_T_Z`.
fn is_temp_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() == 4
        && &bytes[..3] == b"_T_"
        && (bytes[3].is_ascii_digit() || bytes[3].is_ascii_uppercase())
}

/// Check every declared underscore-name against the contract table.
pub fn check_predefined_names(
    session: &mut Session,
    tree: &ParseTree,
    ns: &Namespace,
) -> Result<(), CompilerError> {
    for id in ns.ids() {
        let node = ns.node(id);
        let name = node.name.as_str();
        if !name.starts_with('_') || node.decl.is_none() {
            continue;
        }
        let loc = node
            .decl
            .map(|d| tree.node(d).loc.clone())
            .unwrap_or_else(SourceLoc::default);

        if is_temp_name(name) {
            if !session.emitted_temp_names() {
                session.remark(
                    ErrorKind::Analyzer,
                    "Name is in the compiler-reserved temporary range",
                    Some(name),
                    loc,
                )?;
            }
            continue;
        }

        let Some(reserved) = find_reserved(name) else {
            session.warning(
                ErrorKind::Analyzer,
                "Unknown reserved name",
                Some(name),
                loc,
            )?;
            continue;
        };

        if node.object_type != ObjectType::Method {
            continue;
        }
        let NsPayload::Method {
            arg_count,
            return_types,
            external,
        } = node.payload
        else {
            continue;
        };
        if external {
            continue;
        }
        if arg_count != reserved.arg_count {
            let param = format!(
                "{name} requires {}, found {arg_count}",
                reserved.arg_count
            );
            session.warning(
                ErrorKind::Analyzer,
                "Reserved method has an incorrect argument count",
                Some(&param),
                loc.clone(),
            )?;
        }
        if reserved.must_return && return_types == TypeBits::NO_RETURN {
            session.warning(
                ErrorKind::Analyzer,
                "Reserved method must return a value",
                Some(name),
                loc,
            )?;
        }
    }
    debug!("reserved-name check complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::diagnostics::Level;
    use crate::core::opcodes::AslOp;
    use crate::core::session::SessionConfig;
    use crate::namespace::load::load_namespace;
    use crate::tree::{NodeId, NodeValue};

    fn loc(line: u32) -> SourceLoc {
        SourceLoc::new(line, 1)
    }

    fn method(tree: &mut ParseTree, parent: NodeId, name: &str, args: u64, line: u32) -> NodeId {
        let m = tree.add_child(parent, AslOp::Method, loc(line));
        tree.node_mut(m).value = NodeValue::Name(name.to_string());
        let f = tree.add_child(m, AslOp::Integer, loc(line));
        tree.node_mut(f).value = NodeValue::Integer(args);
        m
    }

    fn run(tree: &mut ParseTree) -> Session {
        let mut session = Session::new(SessionConfig::default());
        let mut ns = load_namespace(&mut session, tree).unwrap();
        crate::analyzer::typing::infer_return_types(tree, &mut ns).unwrap();
        check_predefined_names(&mut session, tree, &ns).unwrap();
        session
    }

    fn block() -> (ParseTree, NodeId) {
        let mut tree = ParseTree::new();
        let root = tree.alloc(AslOp::DefinitionBlock, loc(1));
        tree.set_root(root);
        (tree, root)
    }

    fn warnings(session: &Session) -> Vec<String> {
        session
            .diagnostics()
            .iter()
            .filter(|d| d.level() == Level::Warning)
            .map(|d| d.message().to_string())
            .collect()
    }

    #[test]
    fn wrong_arity_for_reserved_method() {
        let (mut tree, root) = block();
        let m = method(&mut tree, root, "_DSM", 2, 2);
        let r = tree.add_child(m, AslOp::Return, loc(3));
        let v = tree.add_child(r, AslOp::Integer, loc(3));
        tree.node_mut(v).value = NodeValue::Integer(0);

        let session = run(&mut tree);
        let w = warnings(&session);
        assert_eq!(w.len(), 1);
        assert!(w[0].contains("argument count"));
        assert!(w[0].contains("_DSM requires 4, found 2"));
    }

    #[test]
    fn reserved_method_that_must_return_but_does_not() {
        let (mut tree, root) = block();
        let m = method(&mut tree, root, "_STA", 0, 2);
        tree.add_child(m, AslOp::Noop, loc(3));

        let session = run(&mut tree);
        let w = warnings(&session);
        assert_eq!(w.len(), 1);
        assert!(w[0].contains("must return a value"));
    }

    #[test]
    fn wrong_arity_and_missing_return_are_both_reported() {
        let (mut tree, root) = block();
        let m = method(&mut tree, root, "_DSM", 2, 2);
        tree.add_child(m, AslOp::Noop, loc(3));

        let session = run(&mut tree);
        let w = warnings(&session);
        assert_eq!(w.len(), 2);
        assert!(w[0].contains("argument count"));
        assert!(w[1].contains("must return a value"));
    }

    #[test]
    fn unknown_underscore_name_is_flagged() {
        let (mut tree, root) = block();
        let m = method(&mut tree, root, "_XQZ", 0, 2);
        let r = tree.add_child(m, AslOp::Return, loc(3));
        let v = tree.add_child(r, AslOp::Integer, loc(3));
        tree.node_mut(v).value = NodeValue::Integer(0);

        let session = run(&mut tree);
        let w = warnings(&session);
        assert_eq!(w.len(), 1);
        assert!(w[0].contains("Unknown reserved name"));
    }

    #[test]
    fn conforming_reserved_method_passes_clean() {
        let (mut tree, root) = block();
        let m = method(&mut tree, root, "_STA", 0, 2);
        let r = tree.add_child(m, AslOp::Return, loc(3));
        let v = tree.add_child(r, AslOp::Integer, loc(3));
        tree.node_mut(v).value = NodeValue::Integer(0x0F);

        let session = run(&mut tree);
        assert!(warnings(&session).is_empty());
    }

    #[test]
    fn data_declarations_of_reserved_names_are_not_methods() {
        let (mut tree, root) = block();
        let n = tree.add_child(root, AslOp::Name, loc(2));
        tree.node_mut(n).value = NodeValue::Name("_HID".to_string());
        let v = tree.add_child(n, AslOp::Integer, loc(2));
        tree.node_mut(v).value = NodeValue::Integer(0x0A0CD041);

        let session = run(&mut tree);
        assert!(warnings(&session).is_empty());
    }

    #[test]
    fn user_temp_names_are_remarked_compiler_ones_are_not() {
        let (mut tree, root) = block();
        let m = method(&mut tree, root, "M", 0, 2);
        let n = tree.add_child(m, AslOp::Name, loc(3));
        tree.node_mut(n).value = NodeValue::Name("_T_0".to_string());
        let v = tree.add_child(n, AslOp::Integer, loc(3));
        tree.node_mut(v).value = NodeValue::Integer(0);

        let session = run(&mut tree);
        let remarks = session
            .diagnostics()
            .iter()
            .filter(|d| d.level() == Level::Remark)
            .count();
        assert_eq!(remarks, 1);

        // Same tree, but the session has handed out temp names itself.
        let mut session2 = Session::new(SessionConfig::default());
        let _ = session2.next_temp_name();
        let mut ns = load_namespace(&mut session2, &mut tree).unwrap();
        crate::analyzer::typing::infer_return_types(&tree, &mut ns).unwrap();
        check_predefined_names(&mut session2, &tree, &ns).unwrap();
        let remarks2 = session2
            .diagnostics()
            .iter()
            .filter(|d| d.level() == Level::Remark)
            .count();
        assert_eq!(remarks2, 0);
    }
}
