//! Wire: multi-segment byte buffer
//!
//! Prinsip desain:
//! - Immutable: tidak ada API mutasi setelah dibuat
//! - Zero-Copy: segment bisa meminjam buffer input (`Cow::Borrowed`)
//! - Scatter-Gather: encoder menyambung slice tanpa menyalin

use std::borrow::Cow;
use std::io::IoSlice;

use super::reader::Reader;
use crate::error::{FormatError, Result};

/// Logical byte string made of ordered segments.
///
/// Borrowed segments keep the wire tied to its source buffer through `'a`.
/// Equality compares content only, so two wires with different
/// segmentation but the same bytes are equal.
#[derive(Clone, Default)]
pub struct Wire<'a> {
    segments: Vec<Cow<'a, [u8]>>,
}

impl<'a> Wire<'a> {
    /// Wire kosong
    #[inline(always)]
    pub const fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Single borrowed segment
    #[inline]
    pub fn from_slice(buf: &'a [u8]) -> Self {
        Self::from_segments([Cow::Borrowed(buf)])
    }

    /// Build from segments, dropping empty ones
    pub fn from_segments<I>(segments: I) -> Self
    where
        I: IntoIterator<Item = Cow<'a, [u8]>>,
    {
        Self {
            segments: segments.into_iter().filter(|s| !s.is_empty()).collect(),
        }
    }

    /// Total length (sum of segment lengths)
    #[inline]
    pub fn len(&self) -> usize {
        self.segments.iter().map(|s| s.len()).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[inline(always)]
    pub fn segments(&self) -> &[Cow<'a, [u8]>] {
        &self.segments
    }

    /// Iterate segment slices
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.segments.iter().map(|s| s.as_ref())
    }

    /// Segment sebagai `IoSlice` untuk `write_vectored`
    pub fn io_slices(&self) -> Vec<IoSlice<'_>> {
        self.segments.iter().map(|s| IoSlice::new(s)).collect()
    }

    /// Copy semua segment ke satu buffer contiguous
    pub fn join(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        for seg in &self.segments {
            out.extend_from_slice(seg);
        }
        out
    }

    /// Zero-copy view of bytes `start..end`.
    ///
    /// Fails with `MarkerSpan` when the span is reversed or runs past
    /// the end of the wire.
    pub fn range(&self, start: usize, end: usize) -> Result<Wire<'_>> {
        let len = self.len();
        if start > end || end > len {
            return Err(FormatError::MarkerSpan { start, end, len }.into());
        }

        let mut out = Vec::new();
        let mut seg_start = 0usize;
        for seg in &self.segments {
            let seg_end = seg_start + seg.len();
            if seg_end > start && seg_start < end {
                let from = start.saturating_sub(seg_start);
                let to = seg.len().min(end - seg_start);
                out.push(Cow::Borrowed(&seg[from..to]));
            }
            if seg_end >= end {
                break;
            }
            seg_start = seg_end;
        }
        Ok(Wire::from_segments(out))
    }

    /// Detach from the source buffer by copying borrowed segments
    pub fn into_owned(self) -> Wire<'static> {
        Wire {
            segments: self
                .segments
                .into_iter()
                .map(|s| Cow::Owned(s.into_owned()))
                .collect(),
        }
    }

    /// Reader di atas wire ini (posisi mulai dari 0)
    #[inline]
    pub fn reader(&self) -> Reader<'_> {
        Reader::from_wire(self)
    }

    fn bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.segments.iter().flat_map(|s| s.iter().copied())
    }
}

impl PartialEq for Wire<'_> {
    fn eq(&self, other: &Wire<'_>) -> bool {
        self.len() == other.len() && self.bytes().eq(other.bytes())
    }
}

impl Eq for Wire<'_> {}

impl std::fmt::Debug for Wire<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.segments.iter().map(|s| HexSegment(s)))
            .finish()
    }
}

struct HexSegment<'s>(&'s [u8]);

impl std::fmt::Debug for HexSegment<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for b in self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl From<Vec<u8>> for Wire<'static> {
    fn from(buf: Vec<u8>) -> Self {
        Wire::from_segments([Cow::Owned(buf)])
    }
}

impl<'a> From<&'a [u8]> for Wire<'a> {
    fn from(buf: &'a [u8]) -> Self {
        Wire::from_slice(buf)
    }
}

impl<'a> FromIterator<Cow<'a, [u8]>> for Wire<'a> {
    fn from_iter<I: IntoIterator<Item = Cow<'a, [u8]>>>(iter: I) -> Self {
        Wire::from_segments(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn two_segments() -> Wire<'static> {
        Wire::from_segments([
            Cow::Owned(vec![1, 2, 3]),
            Cow::Owned(vec![4, 5, 6]),
        ])
    }

    #[test]
    fn test_len_and_join() {
        let wire = two_segments();
        assert_eq!(wire.len(), 6);
        assert_eq!(wire.segments().len(), 2);
        assert_eq!(wire.join(), [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_empty_segments_dropped() {
        let wire = Wire::from_segments([Cow::Borrowed(&[][..]), Cow::Borrowed(&[9u8][..])]);
        assert_eq!(wire.segments().len(), 1);
        assert!(Wire::from_slice(&[]).is_empty());
    }

    #[test]
    fn test_equality_ignores_segmentation() {
        let flat = Wire::from(vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(two_segments(), flat);
        assert_ne!(two_segments(), Wire::from(vec![1, 2, 3]));
    }

    #[test]
    fn test_range_across_segments() {
        let wire = two_segments();
        let view = wire.range(2, 5).unwrap();
        assert_eq!(view.segments().len(), 2);
        assert_eq!(view.join(), [3, 4, 5]);

        assert_eq!(wire.range(3, 6).unwrap().join(), [4, 5, 6]);
        assert!(wire.range(4, 4).unwrap().is_empty());
    }

    #[test]
    fn test_range_rejects_bad_span() {
        let wire = two_segments();
        assert_eq!(
            wire.range(5, 2).unwrap_err(),
            Error::InvalidFormat(FormatError::MarkerSpan {
                start: 5,
                end: 2,
                len: 6
            })
        );
        assert!(wire.range(0, 7).is_err());
    }

    #[test]
    fn test_io_slices_follow_segments() {
        let wire: Wire<'_> = [&[1u8, 2][..], &[3]].into_iter().map(Cow::Borrowed).collect();
        let slices = wire.io_slices();
        assert_eq!(slices.len(), 2);
        assert_eq!(&*slices[0], &[1, 2]);
        assert_eq!(&*slices[1], &[3]);
    }

    #[test]
    fn test_into_owned_outlives_source() {
        let owned = {
            let buf = vec![7u8, 8, 9];
            Wire::from_slice(&buf).into_owned()
        };
        assert_eq!(owned.join(), [7, 8, 9]);
    }
}
