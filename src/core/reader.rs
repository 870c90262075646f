//! Reader: cursor di atas Wire atau slice
//!
//! Prinsip desain:
//! - Zero-Copy: read yang muat di satu segment hanya meminjam slice
//! - Copy hanya jika read melintasi batas segment
//! - Posisi absolut dipertahankan, termasuk di sub-reader (delegate)

use std::borrow::Cow;

use bytes::Buf;
use smallvec::SmallVec;

use super::varnum;
use super::wire::Wire;
use crate::error::{Error, FormatError, Result};

/// Positioned cursor over one or more borrowed segments.
///
/// The segments always sum to exactly `len` bytes. A reader created by
/// [`Reader::delegate`] is bounded: running out of bytes there means a
/// sub-length overflowed its enclosing TLV, not that more input is needed.
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    segments: SmallVec<[&'a [u8]; 4]>,
    seg: usize,
    off: usize,
    base: usize,
    consumed: usize,
    len: usize,
    bounded: bool,
}

impl<'a> Reader<'a> {
    /// Reader dari satu buffer contiguous
    pub fn from_slice(buf: &'a [u8]) -> Self {
        let mut segments = SmallVec::new();
        segments.push(buf);
        Self::with_segments(segments, buf.len(), 0, false)
    }

    /// Reader dari wire (multi-segment)
    pub fn from_wire(wire: &'a Wire<'_>) -> Self {
        let segments: SmallVec<[&'a [u8]; 4]> = wire.segments().iter().map(|s| s.as_ref()).collect();
        let len = segments.iter().map(|s| s.len()).sum();
        Self::with_segments(segments, len, 0, false)
    }

    fn with_segments(
        segments: SmallVec<[&'a [u8]; 4]>,
        len: usize,
        base: usize,
        bounded: bool,
    ) -> Self {
        Self {
            segments,
            seg: 0,
            off: 0,
            base,
            consumed: 0,
            len,
            bounded,
        }
    }

    /// Absolute position (offset from the start of the outermost input)
    #[inline(always)]
    pub fn pos(&self) -> usize {
        self.base + self.consumed
    }

    /// Total bytes covered by this reader
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.len - self.consumed
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.consumed == self.len
    }

    /// Error untuk input yang kurang `needed` byte
    fn shortage(&self, needed: usize) -> Error {
        if self.bounded {
            FormatError::LengthOverflow {
                needed,
                available: self.remaining(),
            }
            .into()
        } else {
            Error::Incomplete { needed }
        }
    }

    #[inline]
    fn ensure(&self, n: usize) -> Result<()> {
        match n.checked_sub(self.remaining()) {
            Some(needed) if needed > 0 => Err(self.shortage(needed)),
            _ => Ok(()),
        }
    }

    /// Unread part of the current segment, skipping exhausted ones
    #[inline]
    fn current(&mut self) -> &'a [u8] {
        while let Some(&seg) = self.segments.get(self.seg) {
            if self.off < seg.len() {
                return &seg[self.off..];
            }
            self.seg += 1;
            self.off = 0;
        }
        &[]
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.get_u8())
    }

    /// Baca VarNum (TYPE atau LENGTH)
    pub fn read_varnum(&mut self) -> Result<u64> {
        match varnum::get_varnum(self) {
            Err(Error::Incomplete { needed }) => Err(self.shortage(needed)),
            other => other,
        }
    }

    /// Baca LENGTH sebagai usize
    pub fn read_length(&mut self) -> Result<usize> {
        let len = self.read_varnum()?;
        usize::try_from(len).map_err(|_| self.shortage(usize::MAX))
    }

    /// Baca `n` byte.
    ///
    /// Meminjam slice jika span ada di satu segment, copy jika melintasi
    /// batas segment.
    pub fn read_buf(&mut self, n: usize) -> Result<Cow<'a, [u8]>> {
        self.ensure(n)?;
        let cur = self.current();
        if cur.len() >= n {
            self.advance(n);
            return Ok(Cow::Borrowed(&cur[..n]));
        }

        let mut out = vec![0u8; n];
        self.copy_to_slice(&mut out);
        Ok(Cow::Owned(out))
    }

    /// Baca `n` byte sebagai wire tanpa copy (bisa multi-segment)
    pub fn read_wire(&mut self, n: usize) -> Result<Wire<'a>> {
        let slices = self.take_slices(n)?;
        Ok(slices.into_iter().map(Cow::Borrowed).collect())
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.advance(n);
        Ok(())
    }

    /// Sub-reader for the next `n` bytes.
    ///
    /// Positions reported by the sub-reader stay absolute.
    pub fn delegate(&mut self, n: usize) -> Result<Reader<'a>> {
        let base = self.pos();
        let slices = self.take_slices(n)?;
        Ok(Self::with_segments(slices, n, base, true))
    }

    fn take_slices(&mut self, n: usize) -> Result<SmallVec<[&'a [u8]; 4]>> {
        self.ensure(n)?;
        let mut slices = SmallVec::new();
        let mut left = n;
        while left > 0 {
            let cur = self.current();
            if cur.is_empty() {
                break;
            }
            let take = left.min(cur.len());
            slices.push(&cur[..take]);
            self.advance(take);
            left -= take;
        }
        Ok(slices)
    }
}

impl Buf for Reader<'_> {
    #[inline]
    fn remaining(&self) -> usize {
        self.len - self.consumed
    }

    fn chunk(&self) -> &[u8] {
        let mut off = self.off;
        for seg in self.segments.iter().skip(self.seg) {
            if off < seg.len() {
                return &seg[off..];
            }
            off = 0;
        }
        &[]
    }

    fn advance(&mut self, mut cnt: usize) {
        assert!(
            cnt <= Reader::remaining(self),
            "advance past the end of the reader"
        );
        self.consumed += cnt;
        while cnt > 0 {
            let avail = self.segments[self.seg].len() - self.off;
            if cnt < avail {
                self.off += cnt;
                return;
            }
            cnt -= avail;
            self.seg += 1;
            self.off = 0;
        }
    }
}
