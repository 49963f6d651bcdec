//! BER-TLV field lookup
//!
//! Card responses carry structured data as nested tag-length-value objects.
//! Lookups here are addressed by a *path* of one-byte tags: every tag but the
//! last names a constructed template to descend into, the last tag names the
//! field. Repeated tags are legal (the wallet applet encodes both its version
//! and its free pairing slots under the same tag), so the primitive contract is
//! [`find_all`], returning every match in encounter order. [`find_tag`] and
//! [`find_tag_n`] pick one occurrence and make the index explicit at the call
//! site.

use bytes::Bytes;
use iso7816_tlv::ber::{Tag, Tlv, Value};

/// Errors raised while looking up TLV fields
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TlvError {
    /// No tags given to look up
    #[error("Empty tag path")]
    EmptyPath,

    /// The requested occurrence of a tag is absent
    #[error("Tag {tag:#04x} not found (occurrence {occurrence})")]
    TagNotFound {
        /// Tag that was looked up
        tag: u8,
        /// Zero-based occurrence index that was requested
        occurrence: usize,
    },

    /// A tag on the path is primitive and cannot be descended into
    #[error("Tag {0:#04x} is not a constructed template")]
    NotConstructed(u8),

    /// The byte blob is not valid BER-TLV
    #[error("Malformed TLV data: {0}")]
    Malformed(String),
}

/// Find every value stored under the last tag of `path`, in encounter order.
///
/// Constructed matches are returned re-encoded, primitive matches as their raw value.
pub fn find_all(data: &[u8], path: &[u8]) -> Result<Vec<Bytes>, TlvError> {
    let (target, parents) = path.split_last().ok_or(TlvError::EmptyPath)?;

    let mut level = parse_list(data)?;
    for &parent in parents {
        let tag = to_tag(parent)?;
        let template = level
            .iter()
            .find(|tlv| tlv.tag() == &tag)
            .ok_or(TlvError::TagNotFound {
                tag: parent,
                occurrence: 0,
            })?;

        level = match template.value() {
            Value::Constructed(children) => children.clone(),
            Value::Primitive(_) => return Err(TlvError::NotConstructed(parent)),
        };
    }

    let tag = to_tag(*target)?;
    Ok(level
        .iter()
        .filter(|tlv| tlv.tag() == &tag)
        .map(value_bytes)
        .collect())
}

/// Find the first value stored under the last tag of `path`.
pub fn find_tag(data: &[u8], path: &[u8]) -> Result<Bytes, TlvError> {
    find_tag_n(data, 0, path)
}

/// Find the `n`-th (zero-based) value stored under the last tag of `path`.
pub fn find_tag_n(data: &[u8], n: usize, path: &[u8]) -> Result<Bytes, TlvError> {
    let target = *path.last().ok_or(TlvError::EmptyPath)?;
    find_all(data, path)?
        .into_iter()
        .nth(n)
        .ok_or(TlvError::TagNotFound {
            tag: target,
            occurrence: n,
        })
}

/// Parse a sequence of sibling TLV objects, rejecting trailing garbage.
fn parse_list(mut data: &[u8]) -> Result<Vec<Tlv>, TlvError> {
    let mut tlvs = Vec::new();
    while !data.is_empty() {
        let (tlv, rest) = Tlv::parse(data);
        tlvs.push(tlv.map_err(|e| TlvError::Malformed(e.to_string()))?);
        data = rest;
    }
    Ok(tlvs)
}

fn to_tag(tag: u8) -> Result<Tag, TlvError> {
    Tag::try_from(tag).map_err(|e| TlvError::Malformed(e.to_string()))
}

fn value_bytes(tlv: &Tlv) -> Bytes {
    match tlv.value() {
        Value::Primitive(bytes) => Bytes::copy_from_slice(bytes),
        Value::Constructed(children) => children.iter().flat_map(Tlv::to_vec).collect(),
    }
}
