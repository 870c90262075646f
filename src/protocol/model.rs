//! Generated codec contract
//!
//! Setiap type yang di-derive dengan `TlvModel` mengimplementasikan
//! [`TlvEncode`] (encode tidak pernah gagal) dan [`TlvParse`]
//! (parse menghasilkan value lengkap atau error, tidak pernah setengah jadi).

use tracing::trace;

use super::encoder::{Encoder, LengthPlan};
use super::schema::Schema;
use crate::core::{is_critical, Reader, Wire};
use crate::error::{Error, FormatError, Result};

/// Encoder side of a TLV model.
///
/// A model encodes as the concatenation of its field TLVs, without an
/// outer header. Nested use wraps it in a header of the field's type.
pub trait TlvEncode {
    /// Marker offsets and procedure arguments threaded through a call.
    type Context: Default;

    /// Splice borrowed values into the output instead of copying.
    const NO_COPY: bool = false;

    const SCHEMA: &'static Schema;

    /// Pass 1: value length, recording nested lengths into `plan`.
    fn measure(&self, ctx: &Self::Context, plan: &mut LengthPlan) -> usize;

    /// Pass 2: write every present field in declared order.
    fn encode_into<'v>(&'v self, enc: &mut Encoder<'v>, ctx: &mut Self::Context);

    /// Panjang hasil encode dengan context default
    fn encoding_length(&self) -> usize {
        self.measure(&Self::Context::default(), &mut LengthPlan::new())
    }

    /// Encode with a caller-built context, returning the context with
    /// marker offsets filled in.
    fn encode_with(&self, mut ctx: Self::Context) -> (Wire<'_>, Self::Context) {
        let mut plan = LengthPlan::new();
        let total = self.measure(&ctx, &mut plan);
        let mut enc = Encoder::new(plan, total, Self::NO_COPY);
        self.encode_into(&mut enc, &mut ctx);
        (enc.finish(), ctx)
    }

    fn encode(&self) -> Wire<'_> {
        self.encode_with(Self::Context::default()).0
    }

    /// Encode lalu join ke satu buffer
    fn bytes(&self) -> Vec<u8> {
        self.encode().join()
    }
}

/// Parser side of a TLV model. `'a` is the lifetime of the input
/// buffer that no-copy fields borrow from.
pub trait TlvParse<'a>: TlvEncode + Sized {
    /// Parse every TLV left in `reader` into a value.
    fn parse_from(
        reader: &mut Reader<'a>,
        ignore_critical: bool,
        ctx: &mut Self::Context,
    ) -> Result<Self>;

    fn parse_with(
        mut reader: Reader<'a>,
        ignore_critical: bool,
        mut ctx: Self::Context,
    ) -> Result<(Self, Self::Context)> {
        let value = Self::parse_from(&mut reader, ignore_critical, &mut ctx)?;
        Ok((value, ctx))
    }

    fn parse(reader: Reader<'a>, ignore_critical: bool) -> Result<Self> {
        Self::parse_with(reader, ignore_critical, Self::Context::default()).map(|(v, _)| v)
    }

    /// Parse dari slice, critical type yang tidak dikenal ditolak
    fn from_bytes(buf: &'a [u8]) -> Result<Self> {
        Self::parse(Reader::from_slice(buf), false)
    }
}

impl<T: TlvEncode> TlvEncode for Box<T> {
    type Context = T::Context;
    const NO_COPY: bool = T::NO_COPY;
    const SCHEMA: &'static Schema = T::SCHEMA;

    #[inline(always)]
    fn measure(&self, ctx: &Self::Context, plan: &mut LengthPlan) -> usize {
        (**self).measure(ctx, plan)
    }

    #[inline(always)]
    fn encode_into<'v>(&'v self, enc: &mut Encoder<'v>, ctx: &mut Self::Context) {
        (**self).encode_into(enc, ctx)
    }
}

impl<'a, T: TlvParse<'a>> TlvParse<'a> for Box<T> {
    fn parse_from(
        reader: &mut Reader<'a>,
        ignore_critical: bool,
        ctx: &mut Self::Context,
    ) -> Result<Self> {
        T::parse_from(reader, ignore_critical, ctx).map(Box::new)
    }
}

/// Handle a TLV that no field accepts: critical types fail unless
/// `ignore_critical`, anything else is skipped.
///
/// Dipanggil oleh generated parser setelah header dibaca.
pub fn skip_unrecognized(
    reader: &mut Reader<'_>,
    typ: u64,
    len: usize,
    ignore_critical: bool,
) -> Result<()> {
    if is_critical(typ) && !ignore_critical {
        return Err(Error::UnsupportedCriticalType(typ));
    }
    trace!(typ, len, "skipping unrecognized TLV");
    reader.skip(len)
}

/// Read the header of a map value, which must directly follow its key.
/// Returns the value length.
pub fn read_map_value(reader: &mut Reader<'_>, expected: u64) -> Result<usize> {
    let found = reader.read_varnum()?;
    if found != expected {
        return Err(FormatError::MapValueType { expected, found }.into());
    }
    reader.read_length()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_non_critical() {
        let buf = [0xAA, 0xBB, 0x07];
        let mut reader = Reader::from_slice(&buf);
        assert_eq!(skip_unrecognized(&mut reader, 804, 2, false), Ok(()));
        assert_eq!(reader.pos(), 2);
    }

    #[test]
    fn test_critical_rejected_unless_ignored() {
        let buf = [0xAA];
        let mut reader = Reader::from_slice(&buf);
        assert_eq!(
            skip_unrecognized(&mut reader, 805, 1, false),
            Err(Error::UnsupportedCriticalType(805))
        );
        assert_eq!(skip_unrecognized(&mut reader, 805, 1, true), Ok(()));
        assert!(reader.is_empty());
    }

    #[test]
    fn test_map_value_type_checked() {
        let buf = [0x87, 0x01, 0xFF];
        assert_eq!(read_map_value(&mut Reader::from_slice(&buf), 0x87), Ok(1));
        assert_eq!(
            read_map_value(&mut Reader::from_slice(&buf), 0x88),
            Err(Error::InvalidFormat(FormatError::MapValueType {
                expected: 0x88,
                found: 0x87
            }))
        );
    }
}
