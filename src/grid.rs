//! Grid (NEGRA export) format
//!
//! Sentences are blocks of whitespace-separated rows between `#BOS` and
//! `#EOS` marker lines. Each row is a word or, for the trailing rows whose
//! word column reads `#<num>`, a constituent. A row's parent column points
//! at a constituent number, with `0` meaning the sentence root:
//!
//! ```text
//! #BOS 1
//! The   the   DET 500
//! house house N   500
//! is    be    V   501
//! red   red   ADJ 501
//! .     --    .   502
//! #500  --    NP  502
//! #501  --    VP  502
//! #502  --    S   0
//! #EOS 1
//! ```
//!
//! Which column holds what is configurable through [`GridFormat`].

use crate::builder::MalformedSentence;
use crate::bytes::{NodeNum, ROOT_SENTINEL, bs_atoi, nonterminal_num};
use crate::token::{SecondaryEdge, Sentence, Token, TokenKind};
use regex::Regex;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Lines};
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

const DEFAULT_BOS: &str = r"^#BOS\b";
const DEFAULT_EOS: &str = r"^#EOS\b";

static BOS: LazyLock<Regex> = LazyLock::new(|| Regex::new(DEFAULT_BOS).expect("valid BOS pattern"));
static EOS: LazyLock<Regex> = LazyLock::new(|| Regex::new(DEFAULT_EOS).expect("valid EOS pattern"));

/// Everything after this on a row is an annotator comment
const COMMENT_MARKER: &str = "%%";

/// Static configuration errors, reported at setup time
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Column {0:?} is not supported")]
    UnsupportedColumn(String),

    #[error("Column {0} is required but not configured")]
    MissingColumn(ColumnType),

    #[error("Invalid sentence marker: {0}")]
    InvalidMarker(#[from] regex::Error),
}

/// Meaning of one grid column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Words,
    Lemma,
    Pos,
    Morph,
    Edge,
    Parent,
    SecEdge,
    /// Target of the secondary edge
    Comment,
}

impl ColumnType {
    /// The default column order
    pub const ALL: [ColumnType; 8] = [
        ColumnType::Words,
        ColumnType::Lemma,
        ColumnType::Pos,
        ColumnType::Morph,
        ColumnType::Edge,
        ColumnType::Parent,
        ColumnType::SecEdge,
        ColumnType::Comment,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Words => "words",
            ColumnType::Lemma => "lemma",
            ColumnType::Pos => "pos",
            ColumnType::Morph => "morph",
            ColumnType::Edge => "edge",
            ColumnType::Parent => "parent",
            ColumnType::SecEdge => "secedge",
            ColumnType::Comment => "comment",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColumnType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ColumnType::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| ConfigError::UnsupportedColumn(s.to_string()))
    }
}

/// Column layout and sentence markers of a grid corpus
#[derive(Debug, Clone)]
pub struct GridFormat {
    columns: Vec<ColumnType>,
    bos: Regex,
    eos: Regex,
}

impl Default for GridFormat {
    fn default() -> Self {
        Self {
            columns: ColumnType::ALL.to_vec(),
            bos: BOS.clone(),
            eos: EOS.clone(),
        }
    }
}

impl GridFormat {
    /// Create a format from column names, failing on any unknown name
    pub fn new(columns: &[&str]) -> Result<Self, ConfigError> {
        let columns = columns
            .iter()
            .map(|name| name.parse())
            .collect::<Result<Vec<ColumnType>, _>>()?;
        Ok(Self::with_columns(columns))
    }

    pub fn with_columns(columns: Vec<ColumnType>) -> Self {
        Self {
            columns,
            ..Self::default()
        }
    }

    /// Replace the begin/end-of-sentence patterns
    pub fn with_markers(mut self, bos: &str, eos: &str) -> Result<Self, ConfigError> {
        self.bos = Regex::new(bos)?;
        self.eos = Regex::new(eos)?;
        Ok(self)
    }

    pub fn columns(&self) -> &[ColumnType] {
        &self.columns
    }

    /// Position of a column, if configured
    pub fn column(&self, column: ColumnType) -> Option<usize> {
        self.columns.iter().position(|c| *c == column)
    }

    /// Check that all `columns` are configured
    pub fn require(&self, columns: &[ColumnType]) -> Result<(), ConfigError> {
        match columns.iter().find(|c| self.column(**c).is_none()) {
            Some(missing) => Err(ConfigError::MissingColumn(*missing)),
            None => Ok(()),
        }
    }

    /// Turn one block's rows into the canonical token stream
    pub fn normalize(&self, block: &GridBlock) -> Result<Sentence, MalformedSentence> {
        let tokens = block
            .rows
            .iter()
            .enumerate()
            .map(|(line, row)| self.parse_row(row, line))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Sentence::new(block.id.clone(), tokens))
    }

    fn parse_row(&self, row: &str, line: usize) -> Result<Token, MalformedSentence> {
        let fields: Vec<&str> = row.split_whitespace().collect();
        let field = |column: ColumnType| {
            self.column(column)
                .and_then(|i| fields.get(i).copied())
                .filter(|value| !value.is_empty())
        };

        let label = field(ColumnType::Words).unwrap_or_default();
        let kind = match nonterminal_num(label) {
            Some(num) => TokenKind::NonTerminal(num),
            None => TokenKind::Terminal,
        };

        let parent = match self.column(ColumnType::Parent) {
            Some(_) => parse_ref(field(ColumnType::Parent))?,
            None => ROOT_SENTINEL,
        };

        let secondary = match field(ColumnType::SecEdge) {
            Some(label) => Some(SecondaryEdge {
                label: label.to_string(),
                parent: parse_ref(field(ColumnType::Comment))?,
            }),
            None => None,
        };

        Ok(Token {
            label: label.to_string(),
            kind,
            tag: field(ColumnType::Pos).unwrap_or_default().to_string(),
            morph: field(ColumnType::Morph).map(str::to_string),
            lemma: field(ColumnType::Lemma).map(str::to_string),
            parent,
            edge: field(ColumnType::Edge).map(str::to_string),
            secondary,
            source_line: line,
        })
    }
}

fn parse_ref(value: Option<&str>) -> Result<NodeNum, MalformedSentence> {
    let value = value.unwrap_or_default();
    bs_atoi(value.as_bytes()).ok_or_else(|| MalformedSentence::BadReference(value.to_string()))
}

/// The raw rows of one sentence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridBlock {
    /// First argument of the BOS line
    pub id: Option<String>,
    pub rows: Vec<String>,
    /// Input line of the BOS marker, 1-based
    pub line_num: usize,
}

/// Grid reader that iterates over sentence blocks
pub struct GridReader<R: BufRead> {
    lines: Lines<R>,
    bos: Regex,
    eos: Regex,
    line_num: usize,
}

impl GridReader<BufReader<File>> {
    /// Create a reader from a file path
    pub fn from_file(format: &GridFormat, path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(format, BufReader::new(file)))
    }
}

impl GridReader<BufReader<Cursor<String>>> {
    /// Create a reader from a string
    pub fn from_string(format: &GridFormat, text: &str) -> Self {
        let cursor = Cursor::new(text.to_string());
        Self::new(format, BufReader::new(cursor))
    }
}

impl<R: BufRead> GridReader<R> {
    pub fn new(format: &GridFormat, reader: R) -> Self {
        Self {
            lines: reader.lines(),
            bos: format.bos.clone(),
            eos: format.eos.clone(),
            line_num: 0,
        }
    }
}

impl<R: BufRead> Iterator for GridReader<R> {
    type Item = std::io::Result<GridBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut block: Option<GridBlock> = None;

        loop {
            self.line_num += 1;
            let line = match self.lines.next() {
                // A block cut off by EOF still counts
                None => return block.map(Ok),
                Some(Err(e)) => return Some(Err(e)),
                Some(Ok(line)) => line,
            };

            let Some(current) = block.as_mut() else {
                // Anything between sentences is ignored
                if self.bos.is_match(&line) {
                    block = Some(GridBlock {
                        id: sentence_id(&self.bos, &line),
                        rows: Vec::new(),
                        line_num: self.line_num,
                    });
                }
                continue;
            };

            if self.eos.is_match(&line) {
                return block.map(Ok);
            }

            let row = match line.find(COMMENT_MARKER) {
                Some(pos) => &line[..pos],
                None => line.as_str(),
            };
            if !row.trim().is_empty() {
                current.rows.push(row.trim().to_string());
            }
        }
    }
}

/// First whitespace-separated word after the BOS marker
fn sentence_id(bos: &Regex, line: &str) -> Option<String> {
    let end = bos.find(line)?.end();
    line[end..].split_whitespace().next().map(str::to_string)
}
