//! Byte-level helpers for constituent references
//!
//! Grid rows and XML ids both point at constituents with small integers.
//! Decoding here is strict: no signs, no whitespace, no trailing junk.

use atoi::FromRadix10Checked;

/// Numeric id of a constituent within one sentence
pub type NodeNum = u32;

/// Parent reference meaning "attach under the sentence root"
pub const ROOT_SENTINEL: NodeNum = 0;

/// Label prefix that marks a non-terminal row
pub const NONTERMINAL_MARKER: char = '#';

/// Parse an unsigned decimal, rejecting anything but ASCII digits.
///
/// Unlike `atoi::atoi`, a valid prefix followed by garbage (`"12a"`) is
/// rejected instead of truncated.
#[inline]
pub fn bs_atoi(bytes: &[u8]) -> Option<NodeNum> {
    if bytes.is_empty() {
        return None;
    }
    match NodeNum::from_radix_10_checked(bytes) {
        (Some(n), used) if used == bytes.len() => Some(n),
        _ => None,
    }
}

/// Decode the id carried by a non-terminal label such as `#500`
#[inline]
pub fn nonterminal_num(label: &str) -> Option<NodeNum> {
    label
        .strip_prefix(NONTERMINAL_MARKER)
        .and_then(|digits| bs_atoi(digits.as_bytes()))
}

// Divide a bytestring into two at the last delim
#[inline]
pub fn bs_rsplit_once(bytes: &[u8], delim: u8) -> Option<(&[u8], &[u8])> {
    let pos = bytes.iter().rposition(|b| *b == delim)?;
    Some((&bytes[..pos], &bytes[pos + 1..]))
}
