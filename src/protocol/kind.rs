//! Value kinds
//!
//! Setiap kind adalah marker type yang tahu cara mengukur, menulis dan
//! mem-parse value bagian dari satu TLV field. Generated code memanggil
//! `<Kind as Kind<V>>::...` sesuai anotasi `#[tlv(...)]`.

use std::borrow::Cow;
use std::marker::PhantomData;
use std::time::Duration;

use super::encoder::{Encoder, LengthPlan};
use super::model::{TlvEncode, TlvParse};
use super::name::Name;
use crate::core::varnum::{nat_len, parse_nat};
use crate::core::{Reader, Wire};
use crate::error::{Error, FormatError, Result};

/// Encode half of a value kind.
pub trait Kind<V: ?Sized> {
    /// Length of the value part (without TYPE/LENGTH).
    fn measure(value: &V, plan: &mut LengthPlan) -> usize;

    /// Write the whole TLV: header then value.
    fn encode<'v>(typ: u64, value: &'v V, enc: &mut Encoder<'v>);
}

/// Parse half of a value kind. `reader` is bounded to the value bytes.
pub trait ParseKind<'a, V>: Kind<V> {
    fn parse(reader: Reader<'a>, ignore_critical: bool) -> Result<V>;
}

/// Minimal-width big-endian unsigned integer
pub struct NaturalKind;

/// Fixed-width big-endian unsigned integer (width of the Rust type)
pub struct FixedKind;

/// Duration as a natural number of milliseconds
pub struct TimeKind;

pub struct BinaryKind;

/// UTF-8 string
pub struct TextKind;

/// Raw bytes kept as a (possibly multi-segment) wire
pub struct WireKind;

/// Hierarchical name, value is a run of component TLVs
pub struct NameKind;

/// Nested model.
///
/// Model di dalam selalu di-encode/parse dengan `T::Context::default()`:
/// marker, argument dan signature slot miliknya tidak terlihat dari model
/// luar, dan field yang di-gate argument memakai nilai default (`false`).
/// Signed model yang butuh context harus jadi model terluar.
pub struct StructKind;

/// Borrowing variant of a kind, used by `#[tlv(nocopy)]` models.
pub struct NoCopy<K>(PhantomData<K>);

impl<V: ?Sized, K: Kind<V>> Kind<V> for NoCopy<K> {
    #[inline(always)]
    fn measure(value: &V, plan: &mut LengthPlan) -> usize {
        K::measure(value, plan)
    }

    #[inline(always)]
    fn encode<'v>(typ: u64, value: &'v V, enc: &mut Encoder<'v>) {
        K::encode(typ, value, enc)
    }
}

/// Ambil seluruh sisa reader sebagai satu slice
#[inline]
fn take_all<'a>(reader: &mut Reader<'a>) -> Result<Cow<'a, [u8]>> {
    let n = reader.remaining();
    reader.read_buf(n)
}

impl Kind<u64> for NaturalKind {
    #[inline(always)]
    fn measure(value: &u64, _: &mut LengthPlan) -> usize {
        nat_len(*value)
    }

    #[inline(always)]
    fn encode<'v>(typ: u64, value: &'v u64, enc: &mut Encoder<'v>) {
        enc.put_header(typ, nat_len(*value));
        enc.put_nat(*value);
    }
}

impl<'a> ParseKind<'a, u64> for NaturalKind {
    #[inline]
    fn parse(mut reader: Reader<'a>, _: bool) -> Result<u64> {
        parse_nat(&take_all(&mut reader)?)
    }
}

macro_rules! fixed_kind {
    ($($ty:ty),*) => {$(
        impl Kind<$ty> for FixedKind {
            #[inline(always)]
            fn measure(_: &$ty, _: &mut LengthPlan) -> usize {
                std::mem::size_of::<$ty>()
            }

            #[inline(always)]
            fn encode<'v>(typ: u64, value: &'v $ty, enc: &mut Encoder<'v>) {
                enc.put_header(typ, std::mem::size_of::<$ty>());
                enc.put_slice(&value.to_be_bytes());
            }
        }

        impl<'a> ParseKind<'a, $ty> for FixedKind {
            fn parse(mut reader: Reader<'a>, _: bool) -> Result<$ty> {
                let raw = take_all(&mut reader)?;
                let bytes: [u8; std::mem::size_of::<$ty>()] = raw[..]
                    .try_into()
                    .map_err(|_| Error::NumericRange(raw.len()))?;
                Ok(<$ty>::from_be_bytes(bytes))
            }
        }
    )*};
}

fixed_kind!(u8, u16, u32, u64);

/// Millisecond count, saturating at `u64::MAX`
#[inline(always)]
fn millis(d: &Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl Kind<Duration> for TimeKind {
    #[inline(always)]
    fn measure(value: &Duration, _: &mut LengthPlan) -> usize {
        nat_len(millis(value))
    }

    #[inline(always)]
    fn encode<'v>(typ: u64, value: &'v Duration, enc: &mut Encoder<'v>) {
        let ms = millis(value);
        enc.put_header(typ, nat_len(ms));
        enc.put_nat(ms);
    }
}

impl<'a> ParseKind<'a, Duration> for TimeKind {
    fn parse(reader: Reader<'a>, ignore_critical: bool) -> Result<Duration> {
        NaturalKind::parse(reader, ignore_critical).map(Duration::from_millis)
    }
}

impl Kind<Vec<u8>> for BinaryKind {
    #[inline(always)]
    fn measure(value: &Vec<u8>, _: &mut LengthPlan) -> usize {
        value.len()
    }

    fn encode<'v>(typ: u64, value: &'v Vec<u8>, enc: &mut Encoder<'v>) {
        enc.put_header(typ, value.len());
        enc.put_borrowed(value);
    }
}

impl<'c> Kind<Cow<'c, [u8]>> for BinaryKind {
    #[inline(always)]
    fn measure(value: &Cow<'c, [u8]>, _: &mut LengthPlan) -> usize {
        value.len()
    }

    fn encode<'v>(typ: u64, value: &'v Cow<'c, [u8]>, enc: &mut Encoder<'v>) {
        enc.put_header(typ, value.len());
        enc.put_borrowed(value);
    }
}

impl<'a> ParseKind<'a, Vec<u8>> for BinaryKind {
    fn parse(mut reader: Reader<'a>, _: bool) -> Result<Vec<u8>> {
        take_all(&mut reader).map(Cow::into_owned)
    }
}

impl<'a> ParseKind<'a, Cow<'static, [u8]>> for BinaryKind {
    fn parse(mut reader: Reader<'a>, _: bool) -> Result<Cow<'static, [u8]>> {
        Ok(Cow::Owned(take_all(&mut reader)?.into_owned()))
    }
}

impl<'a> ParseKind<'a, Vec<u8>> for NoCopy<BinaryKind> {
    fn parse(reader: Reader<'a>, ignore_critical: bool) -> Result<Vec<u8>> {
        <BinaryKind as ParseKind<'a, Vec<u8>>>::parse(reader, ignore_critical)
    }
}

impl<'a> ParseKind<'a, Cow<'a, [u8]>> for NoCopy<BinaryKind> {
    fn parse(mut reader: Reader<'a>, _: bool) -> Result<Cow<'a, [u8]>> {
        take_all(&mut reader)
    }
}

impl Kind<String> for TextKind {
    #[inline(always)]
    fn measure(value: &String, _: &mut LengthPlan) -> usize {
        value.len()
    }

    fn encode<'v>(typ: u64, value: &'v String, enc: &mut Encoder<'v>) {
        enc.put_header(typ, value.len());
        enc.put_borrowed(value.as_bytes());
    }
}

impl<'a> ParseKind<'a, String> for TextKind {
    fn parse(mut reader: Reader<'a>, _: bool) -> Result<String> {
        let raw = take_all(&mut reader)?.into_owned();
        String::from_utf8(raw).map_err(|_| FormatError::Utf8.into())
    }
}

impl<'w> Kind<Wire<'w>> for WireKind {
    #[inline(always)]
    fn measure(value: &Wire<'w>, _: &mut LengthPlan) -> usize {
        value.len()
    }

    fn encode<'v>(typ: u64, value: &'v Wire<'w>, enc: &mut Encoder<'v>) {
        enc.put_header(typ, value.len());
        enc.put_wire(value);
    }
}

impl<'a> ParseKind<'a, Wire<'static>> for WireKind {
    fn parse(mut reader: Reader<'a>, _: bool) -> Result<Wire<'static>> {
        let n = reader.remaining();
        reader.read_wire(n).map(Wire::into_owned)
    }
}

impl<'a> ParseKind<'a, Wire<'a>> for NoCopy<WireKind> {
    fn parse(mut reader: Reader<'a>, _: bool) -> Result<Wire<'a>> {
        let n = reader.remaining();
        reader.read_wire(n)
    }
}

impl Kind<Name> for NameKind {
    #[inline(always)]
    fn measure(value: &Name, _: &mut LengthPlan) -> usize {
        value.value_len()
    }

    fn encode<'v>(typ: u64, value: &'v Name, enc: &mut Encoder<'v>) {
        enc.put_header(typ, value.value_len());
        value.encode_components(enc);
    }
}

impl<'a> ParseKind<'a, Name> for NameKind {
    fn parse(mut reader: Reader<'a>, _: bool) -> Result<Name> {
        Name::parse_components(&mut reader)
    }
}

impl<T: TlvEncode> Kind<T> for StructKind {
    fn measure(value: &T, plan: &mut LengthPlan) -> usize {
        let slot = plan.reserve();
        let len = value.measure(&T::Context::default(), plan);
        plan.fill(slot, len);
        len
    }

    fn encode<'v>(typ: u64, value: &'v T, enc: &mut Encoder<'v>) {
        let len = enc.next_length();
        enc.put_header(typ, len);
        value.encode_into(enc, &mut T::Context::default());
    }
}

impl<'a, T: TlvParse<'a>> ParseKind<'a, T> for StructKind {
    fn parse(mut reader: Reader<'a>, ignore_critical: bool) -> Result<T> {
        T::parse_from(&mut reader, ignore_critical, &mut T::Context::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_one<V, K: Kind<V>>(typ: u64, value: &V) -> Vec<u8> {
        let mut plan = LengthPlan::new();
        let len = crate::core::tlv_len(typ, K::measure(value, &mut plan));
        let mut enc = Encoder::new(plan, len, false);
        K::encode(typ, value, &mut enc);
        enc.finish().join()
    }

    #[test]
    fn test_natural_minimal() {
        assert_eq!(encode_one::<u64, NaturalKind>(0x18, &1), [0x18, 0x01, 0x01]);
        assert_eq!(
            encode_one::<u64, NaturalKind>(0x18, &0x1_0000),
            [0x18, 0x04, 0x00, 0x01, 0x00, 0x00]
        );
    }

    #[test]
    fn test_natural_rejects_three_bytes() {
        let buf = [0x01, 0x02, 0x03];
        assert_eq!(
            <NaturalKind as ParseKind<u64>>::parse(Reader::from_slice(&buf), false),
            Err(Error::NumericRange(3))
        );
    }

    #[test]
    fn test_fixed_width() {
        assert_eq!(encode_one::<u32, FixedKind>(0x02, &1), [0x02, 0x04, 0, 0, 0, 1]);
        assert_eq!(
            <FixedKind as ParseKind<u16>>::parse(Reader::from_slice(&[0x01, 0x02]), false),
            Ok(0x0102)
        );
        assert_eq!(
            <FixedKind as ParseKind<u32>>::parse(Reader::from_slice(&[0x01, 0x02]), false),
            Err(Error::NumericRange(2))
        );
    }

    #[test]
    fn test_time_in_millis() {
        let value = Duration::from_secs(2);
        assert_eq!(encode_one::<Duration, TimeKind>(0x19, &value), [0x19, 0x02, 0x07, 0xD0]);
        assert_eq!(
            TimeKind::parse(Reader::from_slice(&[0x07, 0xD0]), false),
            Ok(value)
        );
    }

    #[test]
    fn test_text_rejects_bad_utf8() {
        assert_eq!(
            <TextKind as ParseKind<String>>::parse(Reader::from_slice(&[0xFF, 0xFE]), false),
            Err(Error::InvalidFormat(FormatError::Utf8))
        );
    }

    #[test]
    fn test_no_copy_binary_borrows() {
        let buf = [0x0A, 0x0B, 0x0C];
        let value = <NoCopy<BinaryKind> as ParseKind<Cow<[u8]>>>::parse(
            Reader::from_slice(&buf),
            false,
        )
        .unwrap();
        assert!(matches!(value, Cow::Borrowed(_)));

        let copied = <BinaryKind as ParseKind<Vec<u8>>>::parse(Reader::from_slice(&buf), false);
        assert_eq!(copied, Ok(vec![0x0A, 0x0B, 0x0C]));
    }
}
