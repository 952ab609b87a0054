//! TIGER-XML format
//!
//! Each `<s>` element holds a `<graph>` with `<terminals>` and
//! `<nonterminals>`. Constituents point *down* at their children through
//! `<edge idref=...>` elements; normalization inverts that into the parent
//! references of the token stream. The document text is read whole, then
//! each `<s>` element is parsed into its own small DOM as it is reached.
//!
//! A token carries at most one secondary edge. When an element has several
//! `<secedge>` children only the first is kept; the others are dropped with
//! a warning.

use crate::builder::MalformedSentence;
use crate::bytes::{NodeNum, ROOT_SENTINEL, bs_atoi, bs_rsplit_once};
use crate::token::{SecondaryEdge, Sentence, Token};
use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::borrow::Cow;
use std::fs::File;
use std::io::{self, Read};
use std::iter;
use std::path::Path;
use std::sync::LazyLock;

#[derive(Parser)]
#[grammar = "tiger.pest"]
struct XmlParser;

static SENTENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<s\b.*?</s\s*>").expect("valid sentence pattern"));

/// Numbering for constituents whose ids carry no usable number
const FIRST_NONTERMINAL: NodeNum = 500;

/// Root id suffix of a graph with a virtual root
const VIRTUAL_ROOT: &str = "vroot";

// ===== Minimal DOM =====

/// An XML element with its attributes and child elements; text is dropped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// Parse a document holding a single top-level element
    pub fn parse(xml: &str) -> Result<Self, MalformedSentence> {
        let document = XmlParser::parse(Rule::document, xml)
            .map_err(|e| MalformedSentence::Xml(e.to_string()))?
            .next()
            .ok_or(MalformedSentence::MissingElement("top-level element"))?;

        document
            .into_inner()
            .find(|pair| pair.as_rule() == Rule::element)
            .map(element_from_pair)
            .ok_or(MalformedSentence::MissingElement("top-level element"))
    }

    /// Attribute value with entities decoded
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First direct child named `name`
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// All descendants named `name`, in document order
    pub fn descendants(&self, name: &str) -> Vec<&XmlElement> {
        let mut found = Vec::new();
        let mut stack: Vec<&XmlElement> = self.children.iter().rev().collect();
        while let Some(element) = stack.pop() {
            if element.name == name {
                found.push(element);
            }
            stack.extend(element.children.iter().rev());
        }
        found
    }
}

fn element_from_pair(pair: Pair<Rule>) -> XmlElement {
    let mut element = XmlElement::default();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::name => element.name = inner.as_str().to_string(),
            Rule::attribute => {
                let mut parts = inner.into_inner();
                let (Some(name), Some(value)) = (parts.next(), parts.next()) else {
                    continue;
                };
                let raw = value.into_inner().next().map_or("", |chars| chars.as_str());
                element
                    .attributes
                    .push((name.as_str().to_string(), unescape(raw).into_owned()));
            }
            Rule::element => element.children.push(element_from_pair(inner)),
            _ => {}
        }
    }
    element
}

/// Decode the predefined XML entities and character references.
/// Unknown entities are kept as written.
pub fn unescape(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .and_then(|semi| decode_entity(&rest[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = entity.strip_prefix('#')?;
            let value = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}

// ===== Sentence extraction =====

/// Reader that yields the `<s>...</s>` elements of a document, in order.
/// The whole document is held in memory.
pub struct TigerReader {
    text: String,
    pos: usize,
}

impl TigerReader {
    pub fn new(mut reader: impl Read) -> io::Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Ok(Self::from_string(text))
    }

    pub fn from_file(path: &Path) -> io::Result<Self> {
        Self::new(File::open(path)?)
    }

    pub fn from_string(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            pos: 0,
        }
    }
}

impl Iterator for TigerReader {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        let found = SENTENCE.find_at(&self.text, self.pos)?;
        self.pos = found.end();
        Some(found.as_str().to_string())
    }
}

/// Parse and normalize one `<s>` element
pub fn normalize_xml(xml: &str) -> Result<Sentence, MalformedSentence> {
    normalize(&XmlElement::parse(xml)?)
}

// ===== Normalization =====

#[derive(Debug, Clone, Copy)]
enum Ref {
    Terminal(usize),
    NonTerminal(usize),
}

#[derive(Debug, Clone)]
struct Attachment {
    parent: NodeNum,
    edge: Option<String>,
}

/// Part of an id after its last `_`, or the whole id
fn id_suffix(id: &str) -> &[u8] {
    bs_rsplit_once(id.as_bytes(), b'_').map_or(id.as_bytes(), |(_, suffix)| suffix)
}

fn is_virtual_root(id: &str) -> bool {
    id_suffix(id).eq_ignore_ascii_case(VIRTUAL_ROOT.as_bytes())
}

/// Numeric id suffixes where present; the rest are numbered after the
/// largest one seen
fn number_nonterminals(ids: &[&str]) -> Vec<NodeNum> {
    let numeric: Vec<Option<NodeNum>> = ids
        .iter()
        .map(|id| bs_atoi(id_suffix(id)).filter(|&num| num != ROOT_SENTINEL))
        .collect();
    let mut next = numeric
        .iter()
        .flatten()
        .max()
        .map_or(FIRST_NONTERMINAL, |max| max.saturating_add(1));

    numeric
        .into_iter()
        .map(|num| {
            num.unwrap_or_else(|| {
                let assigned = next;
                next = next.saturating_add(1);
                assigned
            })
        })
        .collect()
}

fn element_id<'a>(
    element: &'a XmlElement,
    missing: &'static str,
) -> Result<&'a str, MalformedSentence> {
    element.attr("id").ok_or(MalformedSentence::MissingElement(missing))
}

/// Normalize an `<s>` element into the canonical token stream.
///
/// A virtual root (`..._VROOT`) is dropped when the graph has other
/// constituents: its last constituent child becomes the root and its other
/// children (usually punctuation) attach to that root.
pub fn normalize(sentence: &XmlElement) -> Result<Sentence, MalformedSentence> {
    let graph = sentence
        .child("graph")
        .ok_or(MalformedSentence::MissingElement("<graph>"))?;
    let root_ref = graph
        .attr("root")
        .ok_or(MalformedSentence::MissingElement("root attribute on <graph>"))?;

    let terminals = graph.descendants("t");
    let nonterminals = graph.descendants("nt");
    if nonterminals.is_empty() {
        return Err(MalformedSentence::NoRoot);
    }

    let mut refs: FxHashMap<&str, Ref> = FxHashMap::default();
    for (i, t) in terminals.iter().enumerate() {
        let id = element_id(t, "id attribute on <t>")?;
        if refs.insert(id, Ref::Terminal(i)).is_some() {
            return Err(MalformedSentence::DuplicateId(id.to_string()));
        }
    }
    let mut nt_ids = Vec::with_capacity(nonterminals.len());
    for (i, nt) in nonterminals.iter().enumerate() {
        let id = element_id(nt, "id attribute on <nt>")?;
        if refs.insert(id, Ref::NonTerminal(i)).is_some() {
            return Err(MalformedSentence::DuplicateId(id.to_string()));
        }
        nt_ids.push(id);
    }
    let nums = number_nonterminals(&nt_ids);

    let vroot = match refs.get(root_ref) {
        Some(Ref::NonTerminal(i)) if is_virtual_root(root_ref) && nonterminals.len() > 1 => {
            Some(*i)
        }
        _ => None,
    };

    let root = match vroot {
        Some(v) => nonterminals[v]
            .children_named("edge")
            .filter_map(|edge| match edge.attr("idref").and_then(|idref| refs.get(idref)) {
                Some(Ref::NonTerminal(i)) => Some(*i),
                _ => None,
            })
            .last()
            .ok_or(MalformedSentence::NoRoot)?,
        None => match refs.get(root_ref) {
            Some(Ref::NonTerminal(i)) => *i,
            _ => return Err(MalformedSentence::BadReference(root_ref.to_string())),
        },
    };
    let root_num = nums[root];
    if let Some(v) = vroot {
        tracing::debug!(
            sentence = sentence.attr("id").unwrap_or_default(),
            vroot = nt_ids[v],
            root = root_num,
            "eliding virtual root"
        );
    }

    // Invert the downward edges into parent references
    let mut t_parents: Vec<Option<Attachment>> = vec![None; terminals.len()];
    let mut nt_parents: Vec<Option<Attachment>> = vec![None; nonterminals.len()];
    for (i, nt) in nonterminals.iter().enumerate() {
        let parent = if Some(i) == vroot { root_num } else { nums[i] };
        for edge in nt.children_named("edge") {
            let idref = edge
                .attr("idref")
                .ok_or(MalformedSentence::MissingElement("idref attribute on <edge>"))?;
            let slot = match refs.get(idref) {
                Some(Ref::Terminal(j)) => &mut t_parents[*j],
                Some(Ref::NonTerminal(j)) if Some(i) == vroot && *j == root => continue,
                Some(Ref::NonTerminal(j)) => &mut nt_parents[*j],
                None => return Err(MalformedSentence::BadReference(idref.to_string())),
            };
            if slot.is_some() {
                return Err(MalformedSentence::AttachedTwice(idref.to_string()));
            }
            *slot = Some(Attachment {
                parent,
                edge: edge.attr("label").map(str::to_string),
            });
        }
    }
    if nt_parents[root].is_some() {
        return Err(MalformedSentence::ParentCycle(root_num));
    }

    let secondary = |element: &XmlElement| -> Result<Option<SecondaryEdge>, MalformedSentence> {
        let mut secedges = element.children_named("secedge");
        let Some(first) = secedges.next() else {
            return Ok(None);
        };
        let dropped = secedges.count();
        if dropped > 0 {
            tracing::warn!(
                id = element.attr("id").unwrap_or_default(),
                dropped,
                "keeping only the first secondary edge"
            );
        }
        let idref = first
            .attr("idref")
            .ok_or(MalformedSentence::MissingElement("idref attribute on <secedge>"))?;
        let parent = match refs.get(idref) {
            Some(Ref::NonTerminal(j)) if Some(*j) == vroot => ROOT_SENTINEL,
            Some(Ref::NonTerminal(j)) => nums[*j],
            _ => return Err(MalformedSentence::BadReference(idref.to_string())),
        };
        Ok(Some(SecondaryEdge {
            label: first.attr("label").unwrap_or_default().to_string(),
            parent,
        }))
    };

    let mut tokens = Vec::with_capacity(terminals.len() + nonterminals.len());
    for (j, t) in terminals.iter().enumerate() {
        let Attachment { parent, edge } = t_parents[j].take().unwrap_or(Attachment {
            parent: root_num,
            edge: None,
        });
        let mut token = Token::terminal(
            t.attr("word").unwrap_or_default(),
            t.attr("pos").unwrap_or_default(),
            parent,
        );
        token.lemma = t.attr("lemma").map(str::to_string);
        token.morph = t.attr("morph").map(str::to_string);
        token.edge = edge;
        token.secondary = secondary(t)?;
        tokens.push(token);
    }

    // The root goes last
    let order = (0..nonterminals.len())
        .filter(|&i| Some(i) != vroot && i != root)
        .chain(iter::once(root));
    for i in order {
        let nt = nonterminals[i];
        let Attachment { parent, edge } = if i == root {
            Attachment {
                parent: ROOT_SENTINEL,
                edge: None,
            }
        } else {
            nt_parents[i].take().unwrap_or(Attachment {
                parent: root_num,
                edge: None,
            })
        };
        let mut token = Token::nonterminal(nums[i], nt.attr("cat").unwrap_or_default(), parent);
        token.edge = edge;
        token.secondary = secondary(nt)?;
        tokens.push(token);
    }

    for (line, token) in tokens.iter_mut().enumerate() {
        token.source_line = line;
    }
    Ok(Sentence::new(sentence.attr("id").map(str::to_string), tokens))
}
