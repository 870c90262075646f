//! VarNum dan Natural number encoding
//!
//! VarNum dipakai untuk setiap TYPE dan LENGTH:
//! - 0..=252: 1 byte
//! - 253..=0xFFFF: `FD` + u16 big-endian
//! - ..=0xFFFF_FFFF: `FE` + u32 big-endian
//! - selebihnya: `FF` + u64 big-endian
//!
//! Natural number (value field) tidak punya marker byte: lebarnya
//! ditentukan oleh LENGTH TLV dan hanya boleh 1, 2, 4 atau 8.

use bytes::{Buf, BufMut};

use crate::error::{Error, Result};

/// Maximum encoded size of a VarNum
pub const MAX_VARNUM_LEN: usize = 9;

/// Encoded size of `v` as a VarNum
#[inline(always)]
pub const fn varnum_len(v: u64) -> usize {
    if v <= 0xFC {
        1
    } else if v <= 0xFFFF {
        3
    } else if v <= 0xFFFF_FFFF {
        5
    } else {
        9
    }
}

/// Tulis VarNum dalam bentuk minimal
#[inline(always)]
pub fn put_varnum<B: BufMut>(buf: &mut B, v: u64) {
    match v {
        0..=0xFC => buf.put_u8(v as u8),
        0xFD..=0xFFFF => {
            buf.put_u8(0xFD);
            buf.put_u16(v as u16);
        }
        0x1_0000..=0xFFFF_FFFF => {
            buf.put_u8(0xFE);
            buf.put_u32(v as u32);
        }
        _ => {
            buf.put_u8(0xFF);
            buf.put_u64(v);
        }
    }
}

/// Number of bytes that follow a VarNum's first byte
#[inline(always)]
const fn trailing_width(first: u8) -> usize {
    match first {
        0xFD => 2,
        0xFE => 4,
        0xFF => 8,
        _ => 0,
    }
}

/// Baca satu VarNum dari `buf`.
///
/// Tidak ada byte yang dikonsumsi jika input kurang; error berisi
/// jumlah byte tambahan yang dibutuhkan.
#[inline]
pub fn get_varnum<B: Buf>(buf: &mut B) -> Result<u64> {
    let first = buf
        .chunk()
        .first()
        .copied()
        .ok_or(Error::Incomplete { needed: 1 })?;
    let width = trailing_width(first);
    if buf.remaining() < 1 + width {
        return Err(Error::Incomplete {
            needed: 1 + width - buf.remaining(),
        });
    }

    buf.advance(1);
    Ok(match width {
        0 => first as u64,
        2 => buf.get_u16() as u64,
        4 => buf.get_u32() as u64,
        _ => buf.get_u64(),
    })
}

/// Decode VarNum dari slice, returns (value, bytes consumed)
#[inline]
pub fn decode_varnum(buf: &[u8]) -> Result<(u64, usize)> {
    let mut cursor = buf;
    let v = get_varnum(&mut cursor)?;
    Ok((v, buf.len() - cursor.len()))
}

/// Minimal width of `v` as a natural number
#[inline(always)]
pub const fn nat_len(v: u64) -> usize {
    if v <= 0xFF {
        1
    } else if v <= 0xFFFF {
        2
    } else if v <= 0xFFFF_FFFF {
        4
    } else {
        8
    }
}

/// Tulis natural number tanpa marker byte
#[inline(always)]
pub fn put_nat<B: BufMut>(buf: &mut B, v: u64) {
    match nat_len(v) {
        1 => buf.put_u8(v as u8),
        2 => buf.put_u16(v as u16),
        4 => buf.put_u32(v as u32),
        _ => buf.put_u64(v),
    }
}

/// Parse natural number. Panjang selain 1, 2, 4, 8 ditolak.
#[inline]
pub fn parse_nat(buf: &[u8]) -> Result<u64> {
    let mut cursor = buf;
    match buf.len() {
        1 => Ok(cursor.get_u8() as u64),
        2 => Ok(cursor.get_u16() as u64),
        4 => Ok(cursor.get_u32() as u64),
        8 => Ok(cursor.get_u64()),
        n => Err(Error::NumericRange(n)),
    }
}

/// Total size of a TLV element whose value is `len` bytes
#[inline(always)]
pub const fn tlv_len(typ: u64, len: usize) -> usize {
    varnum_len(typ) + varnum_len(len as u64) + len
}

/// Criticality rule: types 800..=959 that are multiples of 4 may be
/// skipped when unrecognized, every other type must abort parsing.
#[inline(always)]
pub const fn is_critical(typ: u64) -> bool {
    !(matches!(typ, 800..=959) && typ % 4 == 0)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn encode(v: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        put_varnum(&mut buf, v);
        buf
    }

    #[test]
    fn test_varnum_boundaries() {
        assert_eq!(encode(0), [0x00]);
        assert_eq!(encode(252), [0xFC]);
        assert_eq!(encode(253), [0xFD, 0x00, 0xFD]);
        assert_eq!(encode(0xFFFF), [0xFD, 0xFF, 0xFF]);
        assert_eq!(encode(0x1_0000), [0xFE, 0x00, 0x01, 0x00, 0x00]);
        assert_eq!(encode(0xFFFF_FFFF), [0xFE, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(
            encode(0x1_0000_0000),
            [0xFF, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_decode_incomplete() {
        assert_eq!(decode_varnum(&[]), Err(Error::Incomplete { needed: 1 }));
        assert_eq!(
            decode_varnum(&[0xFD, 0x01]),
            Err(Error::Incomplete { needed: 1 })
        );
        assert_eq!(
            decode_varnum(&[0xFF, 0x00]),
            Err(Error::Incomplete { needed: 7 })
        );
    }

    #[test]
    fn test_decode_ignores_trailing() {
        assert_eq!(decode_varnum(&[0x07, 0xAA]), Ok((7, 1)));
        assert_eq!(decode_varnum(&[0xFD, 0x03, 0x25, 0x00]), Ok((0x325, 3)));
    }

    #[test]
    fn test_nat_widths() {
        let mut buf = Vec::new();
        put_nat(&mut buf, 2000);
        assert_eq!(buf, [0x07, 0xD0]);
        assert_eq!(parse_nat(&buf), Ok(2000));
        assert_eq!(parse_nat(&[0x01, 0x00, 0x00, 0x00]), Ok(0x0100_0000));
    }

    #[test]
    fn test_nat_rejects_odd_lengths() {
        assert_eq!(parse_nat(&[]), Err(Error::NumericRange(0)));
        assert_eq!(parse_nat(&[1, 2, 3]), Err(Error::NumericRange(3)));
        assert_eq!(parse_nat(&[0; 9]), Err(Error::NumericRange(9)));
    }

    #[test]
    fn test_criticality() {
        assert!(!is_critical(800));
        assert!(!is_critical(804));
        assert!(!is_critical(956));
        assert!(is_critical(805));
        assert!(is_critical(796));
        assert!(is_critical(960));
        assert!(is_critical(0x07));
        assert!(is_critical(0x30));
    }

    #[test]
    fn test_tlv_len() {
        assert_eq!(tlv_len(0x18, 1), 3);
        assert_eq!(tlv_len(0x325, 300), 3 + 3 + 300);
    }

    proptest! {
        #[test]
        fn varnum_is_minimal(v in any::<u64>()) {
            let buf = encode(v);
            let expected = if v <= 252 {
                1
            } else if v <= 0xFFFF {
                3
            } else if v <= 0xFFFF_FFFF {
                5
            } else {
                9
            };
            prop_assert_eq!(buf.len(), expected);
            prop_assert_eq!(varnum_len(v), expected);
            prop_assert_eq!(decode_varnum(&buf), Ok((v, expected)));
        }

        #[test]
        fn nat_round_trip(v in any::<u64>()) {
            let mut buf = Vec::new();
            put_nat(&mut buf, v);
            prop_assert_eq!(buf.len(), nat_len(v));
            prop_assert_eq!(parse_nat(&buf), Ok(v));
        }
    }
}
