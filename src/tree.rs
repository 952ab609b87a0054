//! Constituency tree data structures
//!
//! Nodes and leaves live in per-tree arenas and refer to each other by
//! index. A leaf's parent is a [`NodeId`] handle used for lookup only.

use crate::token::SecondaryEdge;
use std::fmt;

/// Index of a node in a tree's node arena
pub type NodeId = usize;

/// Index of a leaf in a tree's leaf arena
pub type LeafId = usize;

/// An entry in a node's ordered child list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Child {
    Node(NodeId),
    Leaf(LeafId),
}

/// An internal node: a constituent or a unary POS wrapper around a leaf
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Category or POS tag
    pub tag: String,
    /// Grammatical function of the edge to the parent
    pub edge: Option<String>,
    /// Secondary edge kept on the node when edges are not duplicated
    pub secondary: Option<SecondaryEdge>,
    /// Token line this node was built from
    pub source_line: usize,
    pub parent: Option<NodeId>,
    pub children: Vec<Child>,
}

impl Node {
    pub fn new(tag: &str, edge: Option<&str>, source_line: usize) -> Self {
        Self {
            tag: tag.to_string(),
            edge: edge.map(str::to_string),
            secondary: None,
            source_line,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// A word with its annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    pub word: String,
    pub tag: String,
    pub morph: Option<String>,
    pub lemma: Option<String>,
    pub edge: Option<String>,
    pub secondary: Option<SecondaryEdge>,
    pub source_line: usize,
    /// The POS node directly above this word. Lookup only.
    pub parent: NodeId,
}

impl PartialEq<str> for Atom {
    fn eq(&self, other: &str) -> bool {
        self.word == other
    }
}

/// Terminal payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Leaf {
    Bare(String),
    Atom(Atom),
}

impl Leaf {
    pub fn word(&self) -> &str {
        match self {
            Leaf::Bare(word) => word,
            Leaf::Atom(atom) => &atom.word,
        }
    }

    pub fn as_atom(&self) -> Option<&Atom> {
        match self {
            Leaf::Atom(atom) => Some(atom),
            Leaf::Bare(_) => None,
        }
    }

    pub(crate) fn as_atom_mut(&mut self) -> Option<&mut Atom> {
        match self {
            Leaf::Atom(atom) => Some(atom),
            Leaf::Bare(_) => None,
        }
    }
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.word())
    }
}

/// A constituency tree for one sentence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    nodes: Vec<Node>,
    leaves: Vec<Leaf>,
    leaf_parents: Vec<NodeId>,
    root: NodeId,
}

impl Tree {
    pub(crate) fn with_capacity(nodes: usize, leaves: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(nodes),
            leaves: Vec::with_capacity(leaves),
            leaf_parents: Vec::with_capacity(leaves),
            root: 0,
        }
    }

    /// Add an unattached node to the arena
    pub(crate) fn add_node(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Append `child` to `parent`'s children and record the back-link
    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(Child::Node(child));
    }

    /// Append a leaf as the last child of `parent`
    pub(crate) fn push_leaf(&mut self, parent: NodeId, leaf: Leaf) -> LeafId {
        let id = self.leaves.len();
        self.leaves.push(leaf);
        self.leaf_parents.push(parent);
        self.nodes[parent].children.push(Child::Leaf(id));
        id
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        self.root = root;
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_node(&self) -> &Node {
        &self.nodes[self.root]
    }

    /// Get a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Get a node by ID, panicking if it is out of range
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn get_leaf(&self, id: LeafId) -> Option<&Leaf> {
        self.leaves.get(id)
    }

    pub fn leaf(&self, id: LeafId) -> &Leaf {
        &self.leaves[id]
    }

    /// The node directly above a leaf
    pub fn leaf_parent(&self, id: LeafId) -> Option<NodeId> {
        self.leaf_parents.get(id).copied()
    }

    pub fn children(&self, id: NodeId) -> &[Child] {
        &self.nodes[id].children
    }

    /// Number of nodes in the arena, attached or not
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Leaves reachable from `id`, left to right
    pub fn subtree_leaves(&self, id: NodeId) -> Vec<LeafId> {
        let mut out = Vec::new();
        let mut stack = vec![Child::Node(id)];
        while let Some(child) = stack.pop() {
            match child {
                Child::Leaf(leaf) => out.push(leaf),
                Child::Node(node) => stack.extend(self.nodes[node].children.iter().rev()),
            }
        }
        out
    }

    /// All leaves under the root, left to right
    pub fn leaves(&self) -> Vec<LeafId> {
        self.subtree_leaves(self.root)
    }

    pub fn words(&self) -> Vec<&str> {
        self.leaves()
            .into_iter()
            .map(|id| self.leaves[id].word())
            .collect()
    }

    fn write_bracketed(&self, f: &mut fmt::Formatter<'_>, id: NodeId) -> fmt::Result {
        let node = &self.nodes[id];
        write!(f, "({}", node.tag)?;
        for child in &node.children {
            f.write_str(" ")?;
            match *child {
                Child::Node(child) => self.write_bracketed(f, child)?,
                Child::Leaf(leaf) => write!(f, "{}", self.leaves[leaf])?,
            }
        }
        f.write_str(")")
    }
}

/// Bracketed rendering, e.g. `(S (NP (DET The) (N house)) (. .))`
impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nodes.is_empty() {
            return f.write_str("()");
        }
        self.write_bracketed(f, self.root)
    }
}
