// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Generic parse tree traversal.
//!
//! Every pass after parsing rides on `walk_tree`: downward-only, upward-only,
//! or both directions in one walk (open a scope on the way down, close it on
//! the matching ascent). Callbacks may abort the walk by returning an error,
//! or prune a subtree with `WalkAction::SkipSubtree`.
//!
//! The walker never mutates topology itself. Callbacks may retag or replace
//! the node currently being visited; the child snapshot is taken after the
//! descent callback returns, so replacement of the current node's variant
//! takes effect immediately, while replacement of already-visited subtrees
//! is not supported. Nested walks on disjoint subtrees are permitted and do
//! not disturb the outer walk.

use crate::core::diagnostics::CompilerError;
use crate::tree::{NodeId, ParseTree};

/// Which callbacks fire during a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkMode {
    /// Pre-order only: `descend` on the way down.
    Downward,
    /// Post-order only: `ascend` on the way up.
    Upward,
    /// Both: `descend` going down, `ascend` coming back up.
    Twice,
}

/// Result of a descent callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkAction {
    Continue,
    /// Do not descend into this node's children. The ascent callback still
    /// fires for the node itself.
    SkipSubtree,
}

/// A tree pass. Default implementations make either direction optional.
pub trait TreeVisitor {
    fn descend(
        &mut self,
        tree: &mut ParseTree,
        node: NodeId,
    ) -> Result<WalkAction, CompilerError> {
        let _ = (tree, node);
        Ok(WalkAction::Continue)
    }

    fn ascend(&mut self, tree: &mut ParseTree, node: NodeId) -> Result<(), CompilerError> {
        let _ = (tree, node);
        Ok(())
    }
}

/// Visit every node reachable from `root`, each exactly once per direction.
pub fn walk_tree(
    tree: &mut ParseTree,
    root: NodeId,
    mode: WalkMode,
    visitor: &mut dyn TreeVisitor,
) -> Result<(), CompilerError> {
    let action = match mode {
        WalkMode::Downward | WalkMode::Twice => visitor.descend(tree, root)?,
        WalkMode::Upward => WalkAction::Continue,
    };

    if action == WalkAction::Continue {
        // Snapshot before descending: the callback above may have retagged
        // `root`, and child callbacks may retag themselves.
        for child in tree.children(root) {
            walk_tree(tree, child, mode, visitor)?;
        }
    }

    match mode {
        WalkMode::Upward | WalkMode::Twice => visitor.ascend(tree, root)?,
        WalkMode::Downward => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::diagnostics::{ErrorKind, SourceLoc};
    use crate::core::opcodes::AslOp;

    fn sample_tree() -> (ParseTree, NodeId) {
        // root -> (a -> (a1, a2), b)
        let mut tree = ParseTree::new();
        let root = tree.alloc(AslOp::DefinitionBlock, SourceLoc::new(1, 1));
        tree.set_root(root);
        let a = tree.add_child(root, AslOp::Device, SourceLoc::new(2, 1));
        tree.add_child(a, AslOp::Name, SourceLoc::new(3, 1));
        tree.add_child(a, AslOp::Name, SourceLoc::new(4, 1));
        tree.add_child(root, AslOp::Method, SourceLoc::new(5, 1));
        (tree, root)
    }

    struct OrderRecorder {
        down: Vec<u32>,
        up: Vec<u32>,
    }

    impl TreeVisitor for OrderRecorder {
        fn descend(
            &mut self,
            tree: &mut ParseTree,
            node: NodeId,
        ) -> Result<WalkAction, CompilerError> {
            self.down.push(tree.node(node).loc.line);
            Ok(WalkAction::Continue)
        }

        fn ascend(&mut self, tree: &mut ParseTree, node: NodeId) -> Result<(), CompilerError> {
            self.up.push(tree.node(node).loc.line);
            Ok(())
        }
    }

    #[test]
    fn twice_walk_visits_each_node_once_per_direction() {
        let (mut tree, root) = sample_tree();
        let mut rec = OrderRecorder {
            down: Vec::new(),
            up: Vec::new(),
        };
        walk_tree(&mut tree, root, WalkMode::Twice, &mut rec).unwrap();
        assert_eq!(rec.down, vec![1, 2, 3, 4, 5]);
        assert_eq!(rec.up, vec![3, 4, 2, 5, 1]);
    }

    struct Pruner;

    impl TreeVisitor for Pruner {
        fn descend(
            &mut self,
            tree: &mut ParseTree,
            node: NodeId,
        ) -> Result<WalkAction, CompilerError> {
            if tree.node(node).op == AslOp::Device {
                Ok(WalkAction::SkipSubtree)
            } else {
                Ok(WalkAction::Continue)
            }
        }
    }

    #[test]
    fn skip_subtree_prunes_children_but_still_ascends() {
        let (mut tree, root) = sample_tree();
        struct Both {
            down: Vec<u32>,
            up: Vec<u32>,
        }
        impl TreeVisitor for Both {
            fn descend(
                &mut self,
                tree: &mut ParseTree,
                node: NodeId,
            ) -> Result<WalkAction, CompilerError> {
                self.down.push(tree.node(node).loc.line);
                if tree.node(node).op == AslOp::Device {
                    Ok(WalkAction::SkipSubtree)
                } else {
                    Ok(WalkAction::Continue)
                }
            }
            fn ascend(&mut self, tree: &mut ParseTree, node: NodeId) -> Result<(), CompilerError> {
                self.up.push(tree.node(node).loc.line);
                Ok(())
            }
        }
        let mut rec = Both {
            down: Vec::new(),
            up: Vec::new(),
        };
        walk_tree(&mut tree, root, WalkMode::Twice, &mut rec).unwrap();
        assert_eq!(rec.down, vec![1, 2, 5]);
        assert_eq!(rec.up, vec![2, 5, 1]);
        let _ = Pruner;
    }

    struct Aborter;

    impl TreeVisitor for Aborter {
        fn descend(
            &mut self,
            tree: &mut ParseTree,
            node: NodeId,
        ) -> Result<WalkAction, CompilerError> {
            if tree.node(node).loc.line == 3 {
                Err(CompilerError::new(ErrorKind::Analyzer, "stop here", None))
            } else {
                Ok(WalkAction::Continue)
            }
        }
    }

    #[test]
    fn callback_error_aborts_and_propagates() {
        let (mut tree, root) = sample_tree();
        let err = walk_tree(&mut tree, root, WalkMode::Downward, &mut Aborter).unwrap_err();
        assert_eq!(err.message(), "stop here");
    }

    struct Retagger;

    impl TreeVisitor for Retagger {
        fn descend(
            &mut self,
            tree: &mut ParseTree,
            node: NodeId,
        ) -> Result<WalkAction, CompilerError> {
            // Retag the node currently being visited; the walker must still
            // terminate and visit its (dropped) subtree zero times.
            if tree.node(node).op == AslOp::Device {
                tree.convert_to_integer(node, 7);
            }
            Ok(WalkAction::Continue)
        }
    }

    #[test]
    fn retagging_current_node_is_tolerated() {
        let (mut tree, root) = sample_tree();
        let mut rec = OrderRecorder {
            down: Vec::new(),
            up: Vec::new(),
        };
        walk_tree(&mut tree, root, WalkMode::Twice, &mut Retagger).unwrap();
        walk_tree(&mut tree, root, WalkMode::Twice, &mut rec).unwrap();
        // The Device subtree collapsed to a single integer node.
        assert_eq!(rec.down, vec![1, 2, 5]);
    }
}
