//! Secondary edge resolution by subtree duplication
//!
//! A secondary edge makes a constituent (or a single word) reachable from a
//! second parent. Trees cannot share nodes, so the referenced subtree is
//! copied: every node and every leaf of the copy is new.

use crate::builder::MalformedSentence;
use crate::leaf::LeafFactory;
use crate::token::Token;
use crate::tree::{Child, Node, NodeId, Tree};
use std::collections::VecDeque;

/// Copies subtrees of a tree under construction
pub struct SecondaryEdgeResolver<'a, F: LeafFactory + ?Sized> {
    tree: &'a mut Tree,
    tokens: &'a [Token],
    leaves: &'a F,
}

impl<'a, F: LeafFactory + ?Sized> SecondaryEdgeResolver<'a, F> {
    pub fn new(tree: &'a mut Tree, tokens: &'a [Token], leaves: &'a F) -> Self {
        Self {
            tree,
            tokens,
            leaves,
        }
    }

    /// Append a copy of `source`'s subtree as the last child of `target`.
    ///
    /// The copy's root takes `label` as its edge. Leaves are rebuilt from
    /// their tokens through the leaf factory; a leaf directly under the copy
    /// root (a duplicated word) takes `label` as well. The walk is
    /// breadth-first over an explicit queue, so depth is not bounded by the
    /// call stack.
    ///
    /// Returns the id of the copy's root.
    pub fn duplicate(
        &mut self,
        source: NodeId,
        label: &str,
        target: NodeId,
    ) -> Result<NodeId, MalformedSentence> {
        let original = self.tree.node(source);
        let copy_root = Node::new(&original.tag, Some(label), original.source_line);
        let copy_root = self.tree.add_node(copy_root);

        let mut todo: VecDeque<(NodeId, Child)> = self
            .tree
            .children(source)
            .iter()
            .map(|child| (copy_root, *child))
            .collect();

        while let Some((parent_copy, current)) = todo.pop_front() {
            match current {
                Child::Node(id) => {
                    let node = self.tree.node(id);
                    let mut copy = Node::new(&node.tag, node.edge.as_deref(), node.source_line);
                    copy.secondary = node.secondary.clone();
                    let copy_id = self.tree.add_node(copy);
                    self.tree.attach(parent_copy, copy_id);
                    todo.extend(self.tree.children(id).iter().map(|child| (copy_id, *child)));
                }
                Child::Leaf(_) => {
                    let line = self.tree.node(parent_copy).source_line;
                    let token = self
                        .tokens
                        .get(line)
                        .ok_or(MalformedSentence::MissingToken(line))?;
                    let mut leaf = self.leaves.build(line, token, parent_copy);
                    if parent_copy == copy_root {
                        if let Some(atom) = leaf.as_atom_mut() {
                            atom.edge = Some(label.to_string());
                            atom.secondary = None;
                        }
                    }
                    self.tree.push_leaf(parent_copy, leaf);
                }
            }
        }

        self.tree.attach(target, copy_root);
        Ok(copy_root)
    }
}
