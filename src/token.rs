//! Canonical token stream
//!
//! Both surface formats normalize into the same shape: one [`Token`] per
//! terminal or non-terminal, all terminals first in surface order, then the
//! non-terminals with the sentence root last. Parent references use the
//! grid numbering, where `0` means "directly under the root".

use crate::bytes::{NONTERMINAL_MARKER, NodeNum};

/// Whether a token is a word or a constituent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Terminal,
    NonTerminal(NodeNum),
}

/// An additional attachment of a token to a second parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryEdge {
    pub label: String,
    pub parent: NodeNum,
}

/// One row of a sentence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Word text, or `#<num>` for non-terminals
    pub label: String,
    pub kind: TokenKind,
    /// POS tag for terminals, category for non-terminals
    pub tag: String,
    pub morph: Option<String>,
    pub lemma: Option<String>,
    pub parent: NodeNum,
    pub edge: Option<String>,
    pub secondary: Option<SecondaryEdge>,
    /// Position of the token within its sentence
    pub source_line: usize,
}

impl Token {
    pub fn terminal(word: &str, tag: &str, parent: NodeNum) -> Self {
        Self {
            label: word.to_string(),
            kind: TokenKind::Terminal,
            tag: tag.to_string(),
            morph: None,
            lemma: None,
            parent,
            edge: None,
            secondary: None,
            source_line: 0,
        }
    }

    pub fn nonterminal(num: NodeNum, category: &str, parent: NodeNum) -> Self {
        Self {
            label: format!("{NONTERMINAL_MARKER}{num}"),
            kind: TokenKind::NonTerminal(num),
            tag: category.to_string(),
            morph: None,
            lemma: None,
            parent,
            edge: None,
            secondary: None,
            source_line: 0,
        }
    }

    pub fn with_lemma(mut self, lemma: &str) -> Self {
        self.lemma = Some(lemma.to_string());
        self
    }

    pub fn with_morph(mut self, morph: &str) -> Self {
        self.morph = Some(morph.to_string());
        self
    }

    pub fn with_edge(mut self, edge: &str) -> Self {
        self.edge = Some(edge.to_string());
        self
    }

    pub fn with_secondary(mut self, label: &str, parent: NodeNum) -> Self {
        self.secondary = Some(SecondaryEdge {
            label: label.to_string(),
            parent,
        });
        self
    }

    pub fn at_line(mut self, source_line: usize) -> Self {
        self.source_line = source_line;
        self
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.kind == TokenKind::Terminal
    }

    /// Id of a non-terminal token, `None` for words
    #[inline]
    pub fn nonterminal_num(&self) -> Option<NodeNum> {
        match self.kind {
            TokenKind::NonTerminal(num) => Some(num),
            TokenKind::Terminal => None,
        }
    }
}

/// The normalized token stream of one sentence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sentence {
    /// `#BOS` argument or `<s id>` attribute
    pub id: Option<String>,
    pub tokens: Vec<Token>,
}

impl Sentence {
    pub fn new(id: Option<String>, tokens: Vec<Token>) -> Self {
        Self { id, tokens }
    }

    /// Terminal tokens in surface order
    pub fn terminals(&self) -> impl Iterator<Item = &Token> + '_ {
        self.tokens.iter().filter(|t| t.is_terminal())
    }

    pub fn words(&self) -> Vec<&str> {
        self.terminals().map(|t| t.label.as_str()).collect()
    }

    pub fn tagged_words(&self) -> Vec<(&str, &str)> {
        self.terminals()
            .map(|t| (t.label.as_str(), t.tag.as_str()))
            .collect()
    }

    pub fn lemmatised_words(&self) -> Vec<(&str, Option<&str>)> {
        self.terminals()
            .map(|t| (t.label.as_str(), t.lemma.as_deref()))
            .collect()
    }

    pub fn morphological_words(&self) -> Vec<(&str, Option<&str>)> {
        self.terminals()
            .map(|t| (t.label.as_str(), t.morph.as_deref()))
            .collect()
    }
}
