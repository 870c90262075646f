//! Signed models: covered ranges, signature slot, parameters digest
//!
//! Dipakai oleh field `signature`, `interest_name` dan `range_marker`
//! yang dihasilkan `#[derive(TlvModel)]`.
//!
//! Prinsip desain:
//! - Single pass: covered range dicatat saat encode/parse, bukan dihitung ulang
//! - Offset absolut: [`Covered`] menyimpan span, byte-nya diambil dari wire
//!   yang sama secara zero-copy lewat [`Covered::of`]
//! - Sealing tanpa copy: signature dan digest disambung sebagai segment baru
//!
//! Alur signing:
//! 1. `encode_with` dengan `{sig}_est_len > 0` menulis placeholder
//! 2. Hitung signature dari `ctx.{covered}.of(&wire)`
//! 3. [`seal_signature`] mengganti placeholder dengan value asli

use std::borrow::Cow;

use smallvec::SmallVec;

use super::encoder::Encoder;
use super::name::{Component, Name, TYPE_PARAMETERS_SHA256_DIGEST};
use crate::core::varnum::{put_varnum, varnum_len};
use crate::core::{tlv_len, Reader, Wire};
use crate::error::Result;

/// Length of a SHA-256 digest value
pub const DIGEST_LEN: usize = 32;

/// Byte spans of a wire covered by a signature or digest, in order.
///
/// Spans are absolute offsets of the outermost encoded or parsed wire.
/// Empty spans are not recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Covered {
    spans: SmallVec<[(usize, usize); 2]>,
}

impl Covered {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, start: usize, end: usize) {
        if start != end {
            self.spans.push((start, end));
        }
    }

    #[inline(always)]
    pub fn spans(&self) -> &[(usize, usize)] {
        &self.spans
    }

    /// Total covered bytes
    pub fn len(&self) -> usize {
        self.spans.iter().map(|&(s, e)| e.saturating_sub(s)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn clear(&mut self) {
        self.spans.clear();
    }

    /// Covered bytes of `wire` as a zero-copy wire.
    ///
    /// Fails with `MarkerSpan` when a span does not fit `wire`.
    pub fn of<'w>(&self, wire: &'w Wire<'_>) -> Result<Wire<'w>> {
        let mut segments: Vec<Cow<'w, [u8]>> = Vec::new();
        for &(start, end) in &self.spans {
            let part = wire.range(start, end)?;
            segments.extend(part.segments().iter().cloned());
        }
        Ok(Wire::from_segments(segments))
    }
}

/// Position of a written signature TLV, header included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureSlot {
    pub typ: u64,
    pub start: usize,
    pub end: usize,
}

/// Encoded size of a signature field: the value if present, otherwise
/// a placeholder of `est_len` bytes. Zero when neither applies.
pub fn signature_len(typ: u64, value: Option<&Wire<'_>>, est_len: usize) -> usize {
    match value {
        Some(wire) => tlv_len(typ, wire.len()),
        None if est_len > 0 => tlv_len(typ, est_len),
        None => 0,
    }
}

/// Write a signature field, returning where it landed.
pub fn encode_signature<'v>(
    typ: u64,
    value: Option<&'v Wire<'_>>,
    est_len: usize,
    enc: &mut Encoder<'v>,
) -> Option<SignatureSlot> {
    let start = enc.position();
    match value {
        Some(wire) => {
            enc.put_header(typ, wire.len());
            enc.put_wire(wire);
        }
        None if est_len > 0 => {
            enc.put_header(typ, est_len);
            enc.put_zeros(est_len);
        }
        None => return None,
    }
    Some(SignatureSlot {
        typ,
        start,
        end: enc.position(),
    })
}

/// Replace `start..end` of `wire` with `middle`, borrowing the rest.
fn splice<'w, I>(wire: &'w Wire<'_>, start: usize, end: usize, middle: I) -> Result<Wire<'w>>
where
    I: IntoIterator<Item = Cow<'w, [u8]>>,
{
    let head = wire.range(0, start)?;
    let tail = wire.range(end, wire.len())?;
    Ok(head
        .segments()
        .iter()
        .cloned()
        .chain(middle)
        .chain(tail.segments().iter().cloned())
        .collect())
}

/// Swap the signature TLV at `slot` for one carrying `value`.
///
/// Only the signature TLV is rewritten, so the result is well-formed
/// when the signed model is the outermost element.
pub fn seal_signature<'w>(
    wire: &'w Wire<'_>,
    slot: &SignatureSlot,
    value: &'w [u8],
) -> Result<Wire<'w>> {
    let mut header = Vec::with_capacity(varnum_len(slot.typ) + varnum_len(value.len() as u64));
    put_varnum(&mut header, slot.typ);
    put_varnum(&mut header, value.len() as u64);
    splice(
        wire,
        slot.start,
        slot.end,
        [Cow::Owned(header), Cow::Borrowed(value)],
    )
}

/// Overwrite the digest value at `at` (from `{name}_digest`).
pub fn fill_digest<'w>(wire: &'w Wire<'_>, at: usize, digest: &'w [u8]) -> Result<Wire<'w>> {
    splice(wire, at, at + digest.len(), [Cow::Borrowed(digest)])
}

#[inline]
fn split_digest(name: &Name) -> (&[Component], Option<&Component>) {
    match name.components().split_last() {
        Some((last, rest)) if last.typ == TYPE_PARAMETERS_SHA256_DIGEST => (rest, Some(last)),
        _ => (name.components(), None),
    }
}

/// Value length of an Interest name, with room for a parameters digest
/// when `need_digest` and the name does not end with one.
pub fn interest_name_len(name: &Name, need_digest: bool) -> usize {
    match split_digest(name) {
        (_, None) if need_digest => {
            name.value_len() + tlv_len(TYPE_PARAMETERS_SHA256_DIGEST, DIGEST_LEN)
        }
        _ => name.value_len(),
    }
}

/// Write an Interest name TLV.
///
/// Components before the parameters digest are added to `covered`.
/// Returns the offset of the digest value, zero-filled when it was
/// appended here.
pub fn encode_interest_name<'v>(
    typ: u64,
    name: &'v Name,
    need_digest: bool,
    enc: &mut Encoder<'v>,
    covered: &mut Covered,
) -> Option<usize> {
    enc.put_header(typ, interest_name_len(name, need_digest));
    let start = enc.position();
    let (body, digest) = split_digest(name);
    for c in body {
        enc.put_header(c.typ, c.val.len());
        enc.put_borrowed(&c.val);
    }
    covered.push(start, enc.position());

    match digest {
        Some(c) => {
            enc.put_header(c.typ, c.val.len());
            let at = enc.position();
            enc.put_borrowed(&c.val);
            Some(at)
        }
        None if need_digest => {
            enc.put_header(TYPE_PARAMETERS_SHA256_DIGEST, DIGEST_LEN);
            let at = enc.position();
            enc.put_zeros(DIGEST_LEN);
            Some(at)
        }
        None => None,
    }
}

/// Parse an Interest name value, adding the components before the
/// parameters digest to `covered`. Returns the name and the offset of
/// the digest value.
pub fn parse_interest_name(
    mut reader: Reader<'_>,
    covered: &mut Covered,
) -> Result<(Name, Option<usize>)> {
    let start = reader.pos();
    let mut cover_end = None;
    let mut digest = None;
    let mut name = Name::new();
    while !reader.is_empty() {
        let at = reader.pos();
        let c = Component::read_from(&mut reader)?;
        if c.typ == TYPE_PARAMETERS_SHA256_DIGEST {
            cover_end = Some(at);
            digest = Some(reader.pos() - c.val.len());
        }
        name.push(c);
    }
    covered.push(start, cover_end.unwrap_or(reader.pos()));
    Ok((name, digest))
}
