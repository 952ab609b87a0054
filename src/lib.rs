//! Treebank: constituency trees from NEGRA export and TIGER-XML corpora
//!
//! Both surface formats are normalized into one token stream, which a
//! single builder turns into an arena tree. Secondary edges are either kept
//! as annotations or resolved by copying the referenced subtree.

pub mod builder; // Token stream to tree, chunk-close attachment
pub mod bytes; // Numeric id decoding
pub mod corpus; // String/file/glob driver, skip-and-log
pub mod grid; // NEGRA export (grid) normalizer
pub mod leaf; // Leaf factories
pub mod secondary; // Subtree duplication for secondary edges
pub mod tiger; // TIGER-XML normalizer
pub mod token; // Canonical token stream
pub mod tree; // Arena tree with bracketed rendering

// Re-exports for convenience
pub use builder::{
    BuildOptions, MalformedSentence, RootPolicy, SecondaryEdgeMode, TreeBuilder, build_tree,
};
pub use corpus::{CorpusFormat, Treebank, TreebankError};
pub use grid::{ColumnType, ConfigError, GridBlock, GridFormat, GridReader};
pub use leaf::{AnnotatedLeaves, BareLeaves, LeafFactory, LeafStyle};
pub use secondary::SecondaryEdgeResolver;
pub use tiger::{TigerReader, XmlElement, normalize_xml};
pub use token::{SecondaryEdge, Sentence, Token, TokenKind};
pub use tree::{Atom, Child, Leaf, LeafId, Node, NodeId, Tree};
