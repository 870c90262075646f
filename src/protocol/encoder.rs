//! Two-pass encoder
//!
//! Pass 1 (`measure`) menghitung panjang setiap field tanpa menulis byte,
//! dan mencatat panjang nested struct ke [`LengthPlan`] (pre-order).
//! Pass 2 menulis ke buffer yang sudah dialokasikan tepat sebesar total,
//! memutar ulang plan dengan urutan yang sama.

use std::borrow::Cow;

use crate::core::varnum::{nat_len, put_nat, put_varnum, varnum_len};
use crate::core::Wire;

/// Lengths recorded by the measure pass, replayed by the write pass.
#[derive(Debug, Default, Clone)]
pub struct LengthPlan {
    lengths: Vec<usize>,
}

impl LengthPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve slot untuk panjang yang baru diketahui setelah children diukur
    #[inline(always)]
    pub fn reserve(&mut self) -> usize {
        self.lengths.push(0);
        self.lengths.len() - 1
    }

    #[inline(always)]
    pub fn fill(&mut self, slot: usize, len: usize) {
        if let Some(entry) = self.lengths.get_mut(slot) {
            *entry = len;
        }
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }
}

/// Output side of the write pass.
///
/// Bytes go into a buffer pre-sized from the measured total. In no-copy
/// mode, borrowed value slices are spliced into the wire as their own
/// segments instead of being copied.
pub struct Encoder<'v> {
    buffer: Vec<u8>,
    segments: Vec<Cow<'v, [u8]>>,
    plan: LengthPlan,
    cursor: usize,
    written: usize,
    total: usize,
    no_copy: bool,
}

impl<'v> Encoder<'v> {
    /// Membuat encoder untuk `total` byte dengan plan dari pass pertama
    pub fn new(plan: LengthPlan, total: usize, no_copy: bool) -> Self {
        Self {
            buffer: Vec::with_capacity(total),
            segments: Vec::new(),
            plan,
            cursor: 0,
            written: 0,
            total,
            no_copy,
        }
    }

    /// Bytes emitted so far (absolute offset in the output wire)
    #[inline(always)]
    pub fn position(&self) -> usize {
        self.written
    }

    #[inline(always)]
    pub fn is_no_copy(&self) -> bool {
        self.no_copy
    }

    #[inline(always)]
    pub fn put_varnum(&mut self, v: u64) {
        put_varnum(&mut self.buffer, v);
        self.written += varnum_len(v);
    }

    /// Tulis TYPE dan LENGTH
    #[inline(always)]
    pub fn put_header(&mut self, typ: u64, len: usize) {
        self.put_varnum(typ);
        self.put_varnum(len as u64);
    }

    #[inline(always)]
    pub fn put_nat(&mut self, v: u64) {
        put_nat(&mut self.buffer, v);
        self.written += nat_len(v);
    }

    #[inline]
    pub fn put_slice(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
        self.written += data.len();
    }

    /// Placeholder `n` byte nol, ditimpa caller setelah encode
    #[inline]
    pub fn put_zeros(&mut self, n: usize) {
        self.buffer.resize(self.buffer.len() + n, 0);
        self.written += n;
    }

    /// Tulis slice yang hidup selama `'v`.
    ///
    /// Dalam mode no-copy slice disambung sebagai segment sendiri.
    pub fn put_borrowed(&mut self, data: &'v [u8]) {
        if !self.no_copy || data.is_empty() {
            self.put_slice(data);
            return;
        }

        self.flush_buffer();
        self.segments.push(Cow::Borrowed(data));
        self.written += data.len();
    }

    /// Tulis semua segment dari `wire`
    pub fn put_wire(&mut self, wire: &'v Wire<'_>) {
        for seg in wire.segments() {
            self.put_borrowed(seg);
        }
    }

    /// Next length recorded by the measure pass
    #[inline(always)]
    pub fn next_length(&mut self) -> usize {
        let len = self.plan.lengths.get(self.cursor).copied().unwrap_or(0);
        self.cursor += 1;
        len
    }

    fn flush_buffer(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let rest = self.total.saturating_sub(self.written);
        let full = std::mem::replace(&mut self.buffer, Vec::with_capacity(rest));
        self.segments.push(Cow::Owned(full));
    }

    /// Selesaikan encode dan kembalikan wire
    pub fn finish(mut self) -> Wire<'v> {
        debug_assert_eq!(
            self.written, self.total,
            "measured length differs from bytes written"
        );
        debug_assert_eq!(self.cursor, self.plan.len(), "length plan not fully replayed");
        self.flush_buffer();
        Wire::from_segments(self.segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_replay_order() {
        let mut plan = LengthPlan::new();
        let outer = plan.reserve();
        let inner = plan.reserve();
        plan.fill(inner, 3);
        plan.fill(outer, 5);

        let mut enc = Encoder::new(plan, 0, false);
        assert_eq!(enc.next_length(), 5);
        assert_eq!(enc.next_length(), 3);
    }

    #[test]
    fn test_copy_mode_single_segment() {
        let payload = vec![0xAAu8; 4];
        let mut enc = Encoder::new(LengthPlan::new(), 6, false);
        enc.put_header(0x01, 4);
        enc.put_borrowed(&payload);
        let wire = enc.finish();
        assert_eq!(wire.segments().len(), 1);
        assert_eq!(wire.join(), [0x01, 0x04, 0xAA, 0xAA, 0xAA, 0xAA]);
    }

    #[test]
    fn test_no_copy_splices_segments() {
        let payload = [0x10u8, 0x20];
        let mut enc = Encoder::new(LengthPlan::new(), 7, true);
        enc.put_header(0x05, 2);
        enc.put_borrowed(&payload);
        enc.put_header(0x06, 1);
        enc.put_nat(0x7F);
        assert_eq!(enc.position(), 7);

        let wire = enc.finish();
        assert_eq!(wire.segments().len(), 3);
        assert!(matches!(wire.segments()[1], Cow::Borrowed(_)));
        assert_eq!(wire.join(), [0x05, 0x02, 0x10, 0x20, 0x06, 0x01, 0x7F]);
    }
}
