//! Tree reconstruction from a canonical token stream
//!
//! The build runs in three phases over one sentence:
//!
//! 1. **Registering**: non-terminals (the trailing block of the stream) are
//!    visited in reverse, so the root is seen first. Each gets an empty node
//!    and a parent entry; the first `parent == 0` designates the root.
//! 2. **Streaming**: terminals are visited in surface order. Each becomes a
//!    unary POS node appended to its parent. When the parent changes, the
//!    finished chunk's ancestor chain is attached up to the root.
//! 3. **Resolving**: secondary edges of non-terminals, collected in the
//!    first phase, are duplicated under their targets in the order recorded.
//!
//! A word's secondary edge is duplicated while streaming, as soon as its POS
//! node exists, so the copy sits at the word's surface position and later
//! constituent copies include it.
//!
//! A sentence that cannot be built yields [`MalformedSentence`] instead of a
//! tree. Nothing here panics on bad input.

use crate::bytes::{NodeNum, ROOT_SENTINEL};
use crate::leaf::{LeafFactory, LeafStyle};
use crate::secondary::SecondaryEdgeResolver;
use crate::token::{Sentence, Token};
use crate::tree::{Node, NodeId, Tree};
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Reasons a sentence yields no tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedSentence {
    #[error("no non-terminal attaches to the root")]
    NoRoot,

    #[error("#{second} attaches to the root but #{first} already does")]
    MultipleRoots { first: NodeNum, second: NodeNum },

    #[error("token {line} refers to unknown parent {parent}")]
    UnknownParent { line: usize, parent: NodeNum },

    #[error("ancestors of #{0} form a cycle")]
    ParentCycle(NodeNum),

    #[error("non-terminal #{0} is declared twice")]
    DuplicateNode(NodeNum),

    #[error("non-terminal at token {0} precedes a terminal")]
    NonTerminalOutOfOrder(usize),

    #[error("{0} is attached to more than one parent")]
    AttachedTwice(String),

    #[error("secondary edge points at unknown parent {target}")]
    DanglingSecondary { target: NodeNum },

    #[error("no token for line {0}")]
    MissingToken(usize),

    #[error("not a node reference: {0:?}")]
    BadReference(String),

    #[error("id {0:?} is declared twice")]
    DuplicateId(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("missing {0}")]
    MissingElement(&'static str),
}

/// What to do with secondary edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecondaryEdgeMode {
    /// Copy the referenced subtree under the secondary parent
    Duplicate,
    /// Keep the edge as an annotation on the original node
    #[default]
    Annotate,
}

/// What to do with a second non-terminal attached to the root sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RootPolicy {
    /// Reparent it under the first root
    #[default]
    Permissive,
    /// Reject the sentence
    Strict,
}

/// Tree construction settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildOptions {
    pub leaves: LeafStyle,
    pub secondary: SecondaryEdgeMode,
    pub roots: RootPolicy,
}

impl BuildOptions {
    /// Annotated leaves with secondary edges duplicated
    pub fn morph() -> Self {
        Self {
            leaves: LeafStyle::Annotated,
            secondary: SecondaryEdgeMode::Duplicate,
            roots: RootPolicy::Permissive,
        }
    }

    pub fn with_roots(mut self, roots: RootPolicy) -> Self {
        self.roots = roots;
        self
    }
}

/// A deferred non-terminal secondary edge: copy `source` under `target` as `label`
#[derive(Debug, Clone)]
struct SecondaryRequest {
    source: NodeId,
    label: String,
    target: NodeNum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Registering,
    Streaming,
    Resolving,
}

/// Single-sentence tree builder
pub struct TreeBuilder<'a, F: LeafFactory + ?Sized> {
    tokens: &'a [Token],
    leaves: &'a F,
    secondary: SecondaryEdgeMode,
    roots: RootPolicy,
    phase: Phase,
    tree: Tree,
    /// Non-terminal id -> arena node
    nodes: FxHashMap<NodeNum, NodeId>,
    /// Non-terminal id -> parent id, root substituted for the sentinel
    parents: FxHashMap<NodeNum, NodeNum>,
    root: Option<NodeNum>,
    requests: Vec<SecondaryRequest>,
}

impl<'a, F: LeafFactory + ?Sized> TreeBuilder<'a, F> {
    /// Build the tree for one sentence's tokens
    pub fn build(
        tokens: &'a [Token],
        leaves: &'a F,
        options: BuildOptions,
    ) -> Result<Tree, MalformedSentence> {
        let split = terminal_count(tokens)?;
        let mut builder = Self {
            tokens,
            leaves,
            secondary: options.secondary,
            roots: options.roots,
            phase: Phase::Registering,
            tree: Tree::with_capacity(tokens.len() * 2, split),
            nodes: FxHashMap::default(),
            parents: FxHashMap::default(),
            root: None,
            requests: Vec::new(),
        };

        let root = builder.register_nonterminals(split)?;
        builder.stream_terminals(split, root)?;
        builder.resolve_secondary(root)?;
        Ok(builder.tree)
    }

    fn register_nonterminals(&mut self, split: usize) -> Result<NodeNum, MalformedSentence> {
        debug_assert_eq!(self.phase, Phase::Registering);

        let tokens = self.tokens;
        for (line, token) in tokens.iter().enumerate().skip(split).rev() {
            let Some(num) = token.nonterminal_num() else {
                return Err(MalformedSentence::NonTerminalOutOfOrder(line));
            };
            if self.nodes.contains_key(&num) {
                return Err(MalformedSentence::DuplicateNode(num));
            }

            let mut parent = token.parent;
            if parent == ROOT_SENTINEL {
                parent = match self.root {
                    None => {
                        self.root = Some(num);
                        num
                    }
                    Some(root) => {
                        if self.roots == RootPolicy::Strict {
                            return Err(MalformedSentence::MultipleRoots {
                                first: root,
                                second: num,
                            });
                        }
                        tracing::debug!(root, node = num, "reparenting second root");
                        root
                    }
                };
            }

            let mut node = Node::new(&token.tag, token.edge.as_deref(), line);
            if self.secondary == SecondaryEdgeMode::Annotate {
                node.secondary = token.secondary.clone();
            }
            let id = self.tree.add_node(node);
            self.nodes.insert(num, id);
            self.parents.insert(num, parent);

            if self.secondary == SecondaryEdgeMode::Duplicate {
                if let Some(sec) = &token.secondary {
                    self.requests.push(SecondaryRequest {
                        source: id,
                        label: sec.label.clone(),
                        target: sec.parent,
                    });
                }
            }
        }

        let root = self.root.ok_or(MalformedSentence::NoRoot)?;
        self.phase = Phase::Streaming;
        Ok(root)
    }

    fn stream_terminals(&mut self, split: usize, root: NodeNum) -> Result<(), MalformedSentence> {
        debug_assert_eq!(self.phase, Phase::Streaming);

        let mut last_parent: Option<NodeNum> = None;
        let tokens = self.tokens;
        for (line, token) in tokens[..split].iter().enumerate() {
            let parent = if token.parent == ROOT_SENTINEL {
                root
            } else {
                token.parent
            };
            let parent_id = *self
                .nodes
                .get(&parent)
                .ok_or(MalformedSentence::UnknownParent { line, parent })?;

            match last_parent {
                Some(last) if last != parent => self.close_chunk(last, root)?,
                _ => {}
            }

            let mut pos = Node::new(&token.tag, token.edge.as_deref(), line);
            if self.secondary == SecondaryEdgeMode::Annotate {
                pos.secondary = token.secondary.clone();
            }
            let pos_id = self.tree.add_node(pos);
            let leaf = self.leaves.build(line, token, pos_id);
            self.tree.push_leaf(pos_id, leaf);
            self.tree.attach(parent_id, pos_id);

            // A word's copy goes in at its surface position
            if self.secondary == SecondaryEdgeMode::Duplicate {
                if let Some(sec) = &token.secondary {
                    let target = if sec.parent == ROOT_SENTINEL {
                        root
                    } else {
                        sec.parent
                    };
                    let target_id = *self
                        .nodes
                        .get(&target)
                        .ok_or(MalformedSentence::DanglingSecondary { target })?;
                    SecondaryEdgeResolver::new(&mut self.tree, tokens, self.leaves).duplicate(
                        pos_id,
                        &sec.label,
                        target_id,
                    )?;
                }
            }
            last_parent = Some(parent);
        }

        if let Some(last) = last_parent {
            self.close_chunk(last, root)?;
        }
        self.phase = Phase::Resolving;
        Ok(())
    }

    /// Attach every not-yet-attached ancestor of `start` up to the root
    fn close_chunk(&mut self, start: NodeNum, root: NodeNum) -> Result<(), MalformedSentence> {
        let mut num = start;
        let mut steps = 0;
        while num != root {
            // Longer chains than there are non-terminals must revisit one
            steps += 1;
            if steps > self.parents.len() {
                return Err(MalformedSentence::ParentCycle(start));
            }

            let id = self.nodes[&num];
            let parent = self.parents[&num];
            let parent_id = *self.nodes.get(&parent).ok_or(MalformedSentence::UnknownParent {
                line: self.tree.node(id).source_line,
                parent,
            })?;
            if self.tree.node(id).parent.is_none() {
                self.tree.attach(parent_id, id);
            }
            num = parent;
        }
        Ok(())
    }

    fn resolve_secondary(&mut self, root: NodeNum) -> Result<(), MalformedSentence> {
        debug_assert_eq!(self.phase, Phase::Resolving);

        let root_id = self.nodes[&root];
        self.tree.set_root(root_id);
        self.tree.node_mut(root_id).edge = None;

        let requests = std::mem::take(&mut self.requests);
        let mut resolver = SecondaryEdgeResolver::new(&mut self.tree, self.tokens, self.leaves);
        for request in requests {
            let target = if request.target == ROOT_SENTINEL {
                root
            } else {
                request.target
            };
            let target_id = *self
                .nodes
                .get(&target)
                .ok_or(MalformedSentence::DanglingSecondary { target })?;
            resolver.duplicate(request.source, &request.label, target_id)?;
        }
        Ok(())
    }
}

/// Length of the leading terminal block; non-terminals must all follow it
fn terminal_count(tokens: &[Token]) -> Result<usize, MalformedSentence> {
    let split = tokens
        .iter()
        .rposition(Token::is_terminal)
        .map_or(0, |last| last + 1);
    match tokens[..split].iter().position(|t| !t.is_terminal()) {
        Some(line) => Err(MalformedSentence::NonTerminalOutOfOrder(line)),
        None => Ok(split),
    }
}

/// Build a sentence's tree with the leaf style named in `options`
pub fn build_tree(sentence: &Sentence, options: BuildOptions) -> Result<Tree, MalformedSentence> {
    TreeBuilder::build(&sentence.tokens, &options.leaves, options)
}
