//! Leaf construction strategies
//!
//! The builder calls a [`LeafFactory`] once per terminal (and once per
//! duplicated terminal) to turn a token into a tree leaf.

use crate::token::Token;
use crate::tree::{Atom, Leaf, NodeId};

/// Turns a terminal token into a leaf hanging under `ancestor`
pub trait LeafFactory {
    fn build(&self, source_line: usize, token: &Token, ancestor: NodeId) -> Leaf;
}

/// Leaves are bare words; all annotation is dropped
#[derive(Debug, Clone, Copy, Default)]
pub struct BareLeaves;

impl LeafFactory for BareLeaves {
    fn build(&self, _source_line: usize, token: &Token, _ancestor: NodeId) -> Leaf {
        Leaf::Bare(token.label.clone())
    }
}

/// Leaves are [`Atom`]s carrying tag, morphology, lemma and edges
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnotatedLeaves;

impl LeafFactory for AnnotatedLeaves {
    fn build(&self, source_line: usize, token: &Token, ancestor: NodeId) -> Leaf {
        Leaf::Atom(Atom {
            word: token.label.clone(),
            tag: token.tag.clone(),
            morph: token.morph.clone(),
            lemma: token.lemma.clone(),
            edge: token.edge.clone(),
            secondary: token.secondary.clone(),
            source_line,
            parent: ancestor,
        })
    }
}

/// Leaf strategy selected by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeafStyle {
    #[default]
    Bare,
    Annotated,
}

impl LeafFactory for LeafStyle {
    fn build(&self, source_line: usize, token: &Token, ancestor: NodeId) -> Leaf {
        match self {
            LeafStyle::Bare => BareLeaves.build(source_line, token, ancestor),
            LeafStyle::Annotated => AnnotatedLeaves.build(source_line, token, ancestor),
        }
    }
}
