//! Name dan Component
//!
//! Name adalah urutan component TLV di dalam TLV bertipe 0x07.
//! Format teks mengikuti naming convention:
//! - generic (0x08) tanpa prefix, karakter di luar `A-Za-z0-9-_.~` jadi `%XX`
//! - `seg=`, `off=`, `v=`, `t=`, `seq=` untuk angka desimal
//! - `sha256digest=`, `params-sha256=` untuk digest hex
//! - type lain ditulis `<angka>=`

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use super::encoder::{Encoder, LengthPlan};
use crate::core::varnum::{nat_len, put_nat};
use crate::core::{tlv_len, Reader};
use crate::error::{Error, FormatError, Result};

/// TLV type of a Name
pub const TYPE_NAME: u64 = 0x07;

pub const TYPE_IMPLICIT_SHA256_DIGEST: u64 = 0x01;
pub const TYPE_PARAMETERS_SHA256_DIGEST: u64 = 0x02;
pub const TYPE_GENERIC: u64 = 0x08;
pub const TYPE_KEYWORD: u64 = 0x20;
pub const TYPE_SEGMENT: u64 = 0x32;
pub const TYPE_BYTE_OFFSET: u64 = 0x34;
pub const TYPE_VERSION: u64 = 0x36;
pub const TYPE_TIMESTAMP: u64 = 0x38;
pub const TYPE_SEQUENCE_NUM: u64 = 0x3A;

#[derive(Clone, Copy, PartialEq, Eq)]
enum ValueFormat {
    Text,
    Decimal,
    Hex,
}

const CONVENTIONS: &[(u64, &str, ValueFormat)] = &[
    (TYPE_IMPLICIT_SHA256_DIGEST, "sha256digest", ValueFormat::Hex),
    (TYPE_PARAMETERS_SHA256_DIGEST, "params-sha256", ValueFormat::Hex),
    (TYPE_SEGMENT, "seg", ValueFormat::Decimal),
    (TYPE_BYTE_OFFSET, "off", ValueFormat::Decimal),
    (TYPE_VERSION, "v", ValueFormat::Decimal),
    (TYPE_TIMESTAMP, "t", ValueFormat::Decimal),
    (TYPE_SEQUENCE_NUM, "seq", ValueFormat::Decimal),
];

fn convention_by_type(typ: u64) -> Option<(&'static str, ValueFormat)> {
    CONVENTIONS
        .iter()
        .find(|(t, _, _)| *t == typ)
        .map(|&(_, name, fmt)| (name, fmt))
}

fn convention_by_name(name: &str) -> Option<(u64, ValueFormat)> {
    CONVENTIONS
        .iter()
        .find(|(_, n, _)| *n == name)
        .map(|&(typ, _, fmt)| (typ, fmt))
}

#[inline(always)]
fn is_legal_text(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~')
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn syntax_error(msg: impl Into<String>) -> Error {
    FormatError::NameSyntax(msg.into()).into()
}

/// One name component: a TLV type and its raw value.
///
/// Ordering follows NDN canonical order: type, then length, then bytes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Component {
    pub typ: u64,
    pub val: Vec<u8>,
}

impl Component {
    pub fn new(typ: u64, val: impl Into<Vec<u8>>) -> Self {
        Self {
            typ,
            val: val.into(),
        }
    }

    pub fn generic(val: impl Into<Vec<u8>>) -> Self {
        Self::new(TYPE_GENERIC, val)
    }

    pub fn keyword(val: impl Into<Vec<u8>>) -> Self {
        Self::new(TYPE_KEYWORD, val)
    }

    /// Component bernilai natural number (minimal width)
    pub fn number(typ: u64, v: u64) -> Self {
        let mut val = Vec::with_capacity(nat_len(v));
        put_nat(&mut val, v);
        Self { typ, val }
    }

    pub fn segment(seg: u64) -> Self {
        Self::number(TYPE_SEGMENT, seg)
    }

    pub fn byte_offset(off: u64) -> Self {
        Self::number(TYPE_BYTE_OFFSET, off)
    }

    pub fn version(v: u64) -> Self {
        Self::number(TYPE_VERSION, v)
    }

    pub fn timestamp(t: u64) -> Self {
        Self::number(TYPE_TIMESTAMP, t)
    }

    pub fn sequence_num(seq: u64) -> Self {
        Self::number(TYPE_SEQUENCE_NUM, seq)
    }

    /// Value dibaca sebagai big-endian integer; `None` jika lebih dari 8 byte
    pub fn number_val(&self) -> Option<u64> {
        if self.val.len() > 8 {
            return None;
        }
        Some(self.val.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
    }

    /// Encoded size including TYPE and LENGTH
    #[inline]
    pub fn encoding_length(&self) -> usize {
        tlv_len(self.typ, self.val.len())
    }

    pub(crate) fn read_from(reader: &mut Reader<'_>) -> Result<Self> {
        let typ = reader.read_varnum()?;
        let len = reader.read_length()?;
        let val = reader.read_buf(len)?.into_owned();
        Ok(Self { typ, val })
    }
}

impl PartialOrd for Component {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Component {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.typ
            .cmp(&other.typ)
            .then(self.val.len().cmp(&other.val.len()))
            .then_with(|| self.val.cmp(&other.val))
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Angka lebih dari 8 byte tidak punya bentuk desimal
        let convention = convention_by_type(self.typ).filter(|&(_, format)| {
            format != ValueFormat::Decimal || self.number_val().is_some()
        });
        let format = match convention {
            Some((name, format)) => {
                write!(f, "{}=", name)?;
                format
            }
            None => {
                if self.typ != TYPE_GENERIC {
                    write!(f, "{}=", self.typ)?;
                }
                ValueFormat::Text
            }
        };

        match format {
            ValueFormat::Decimal => write!(f, "{}", self.number_val().unwrap_or_default()),
            ValueFormat::Hex => self.val.iter().try_for_each(|b| write!(f, "{:02x}", b)),
            ValueFormat::Text => self.val.iter().try_for_each(|&b| {
                if is_legal_text(b) {
                    write!(f, "{}", b as char)
                } else {
                    write!(f, "%{:02X}", b)
                }
            }),
        }
    }
}

fn parse_text(s: &str) -> Result<Vec<u8>> {
    let bytes = s.as_bytes();
    let mut val = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'%' {
            let hi = bytes.get(i + 1).copied().and_then(hex_digit);
            let lo = bytes.get(i + 2).copied().and_then(hex_digit);
            match (hi, lo) {
                (Some(hi), Some(lo)) => val.push(hi << 4 | lo),
                _ => return Err(syntax_error(format!("bad escape in component `{}`", s))),
            }
            i += 3;
        } else if matches!(b, b'=' | b'/' | b'\\') {
            return Err(syntax_error(format!("illegal character in component `{}`", s)));
        } else {
            val.push(b);
            i += 1;
        }
    }
    Ok(val)
}

fn parse_hex(s: &str) -> Result<Vec<u8>> {
    let bytes = s.as_bytes();
    if bytes.len() % 2 != 0 {
        return Err(syntax_error(format!("odd-length hex value `{}`", s)));
    }
    bytes
        .chunks(2)
        .map(|pair| match (hex_digit(pair[0]), hex_digit(pair[1])) {
            (Some(hi), Some(lo)) => Ok(hi << 4 | lo),
            _ => Err(syntax_error(format!("invalid hex value `{}`", s))),
        })
        .collect()
}

impl FromStr for Component {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (typ, format, value) = match s.split_once('=') {
            None => (TYPE_GENERIC, ValueFormat::Text, s),
            Some((typ_str, value)) => {
                if value.contains('=') {
                    return Err(syntax_error(format!("too many '=' in component `{}`", s)));
                }
                let (typ, format) = if typ_str.starts_with(|c: char| c.is_ascii_alphabetic()) {
                    convention_by_name(typ_str).ok_or_else(|| {
                        syntax_error(format!("unknown component type `{}`", typ_str))
                    })?
                } else {
                    let typ = typ_str.parse::<u64>().map_err(|_| {
                        syntax_error(format!("invalid component type `{}`", typ_str))
                    })?;
                    (typ, ValueFormat::Text)
                };
                if typ == 0 || typ > 0xFFFF {
                    return Err(syntax_error(format!("component type {} out of range", typ)));
                }
                (typ, format, value)
            }
        };

        let val = match format {
            ValueFormat::Text => parse_text(value)?,
            ValueFormat::Hex => parse_hex(value)?,
            ValueFormat::Decimal => {
                let n = value.parse::<u64>().map_err(|_| {
                    syntax_error(format!("invalid decimal value `{}`", value))
                })?;
                return Ok(Component::number(typ, n));
            }
        };
        Ok(Component { typ, val })
    }
}

/// Hierarchical name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(Vec<Component>);

impl Name {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn components(&self) -> &[Component] {
        &self.0
    }

    pub fn into_components(self) -> Vec<Component> {
        self.0
    }

    pub fn push(&mut self, component: Component) {
        self.0.push(component);
    }

    /// Builder-style push
    pub fn append(mut self, component: Component) -> Self {
        self.0.push(component);
        self
    }

    /// First `n` components (the whole name if `n` exceeds its length)
    pub fn prefix(&self, n: usize) -> Name {
        Name(self.0[..n.min(self.0.len())].to_vec())
    }

    pub fn is_prefix_of(&self, other: &Name) -> bool {
        other.0.starts_with(&self.0)
    }

    /// Panjang value TLV Name (jumlah semua component TLV)
    pub fn value_len(&self) -> usize {
        self.0.iter().map(Component::encoding_length).sum()
    }

    pub fn encoding_length(&self) -> usize {
        tlv_len(TYPE_NAME, self.value_len())
    }

    /// Tulis semua component TLV (tanpa header Name)
    pub fn encode_components<'v>(&'v self, enc: &mut Encoder<'v>) {
        for c in &self.0 {
            enc.put_header(c.typ, c.val.len());
            enc.put_borrowed(&c.val);
        }
    }

    /// Parse component TLV sampai reader habis
    pub fn parse_components(reader: &mut Reader<'_>) -> Result<Name> {
        let mut components = Vec::new();
        while !reader.is_empty() {
            components.push(Component::read_from(reader)?);
        }
        Ok(Name(components))
    }

    /// Whole Name TLV (type 0x07)
    pub fn bytes(&self) -> Vec<u8> {
        let value_len = self.value_len();
        let total = tlv_len(TYPE_NAME, value_len);
        let mut enc = Encoder::new(LengthPlan::new(), total, false);
        enc.put_header(TYPE_NAME, value_len);
        self.encode_components(&mut enc);
        enc.finish().join()
    }

    /// Parse a whole Name TLV; trailing bytes after it are ignored
    pub fn from_bytes(buf: &[u8]) -> Result<Name> {
        let mut reader = Reader::from_slice(buf);
        let typ = reader.read_varnum()?;
        if typ != TYPE_NAME {
            return Err(FormatError::UnexpectedType {
                expected: TYPE_NAME,
                found: typ,
            }
            .into());
        }
        let len = reader.read_length()?;
        Name::parse_components(&mut reader.delegate(len)?)
    }
}

impl Deref for Name {
    type Target = [Component];

    fn deref(&self) -> &[Component] {
        &self.0
    }
}

impl From<Vec<Component>> for Name {
    fn from(components: Vec<Component>) -> Self {
        Name(components)
    }
}

impl FromIterator<Component> for Name {
    fn from_iter<I: IntoIterator<Item = Component>>(iter: I) -> Self {
        Name(iter.into_iter().collect())
    }
}

impl<'n> IntoIterator for &'n Name {
    type Item = &'n Component;
    type IntoIter = std::slice::Iter<'n, Component>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.strip_prefix('/').unwrap_or(s);
        let s = s.strip_suffix('/').unwrap_or(s);
        if s.is_empty() {
            return Ok(Name::new());
        }
        s.split('/').map(Component::from_str).collect()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for c in &self.0 {
            write!(f, "/{}", c)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_name_bytes() {
        let name: Name = "/A/B".parse().unwrap();
        assert_eq!(name.bytes(), [0x07, 0x06, 0x08, 0x01, 0x41, 0x08, 0x01, 0x42]);
        assert_eq!(Name::from_bytes(&name.bytes()), Ok(name));
    }

    #[test]
    fn test_from_bytes_checks_type() {
        assert_eq!(
            Name::from_bytes(&[0x08, 0x00]),
            Err(Error::InvalidFormat(FormatError::UnexpectedType {
                expected: 0x07,
                found: 0x08
            }))
        );
        assert_eq!(
            Name::from_bytes(&[0x07, 0x03, 0x08, 0x05, 0x41]),
            Err(Error::InvalidFormat(FormatError::LengthOverflow {
                needed: 4,
                available: 1
            }))
        );
    }

    #[test]
    fn test_conventions() {
        let name: Name = "/ndn/v=3/seg=258/sha256digest=0aff".parse().unwrap();
        assert_eq!(name[1], Component::version(3));
        assert_eq!(name[2], Component::new(TYPE_SEGMENT, vec![0x01, 0x02]));
        assert_eq!(name[3], Component::new(TYPE_IMPLICIT_SHA256_DIGEST, vec![0x0A, 0xFF]));
        assert_eq!(name.to_string(), "/ndn/v=3/seg=258/sha256digest=0aff");
    }

    #[test]
    fn test_oversized_number_component() {
        assert_eq!(Component::segment(258).number_val(), Some(258));

        let wide = Component::new(TYPE_SEGMENT, vec![0x01; 9]);
        assert_eq!(wide.number_val(), None);
        let text = wide.to_string();
        assert_eq!(text, "50=%01%01%01%01%01%01%01%01%01");
        assert_eq!(text.parse::<Component>(), Ok(wide));
    }

    #[test]
    fn test_percent_escape() {
        let c = Component::generic(b"a b/".to_vec());
        assert_eq!(c.to_string(), "a%20b%2F");
        assert_eq!("a%20b%2F".parse::<Component>(), Ok(c));
        assert!("a%2".parse::<Component>().is_err());
    }

    #[test]
    fn test_numeric_type_and_errors() {
        let c: Component = "32=hello".parse().unwrap();
        assert_eq!(c, Component::keyword(b"hello".to_vec()));
        assert_eq!(c.to_string(), "32=hello");

        assert!("a=b=c".parse::<Component>().is_err());
        assert!("bogus=1".parse::<Component>().is_err());
        assert!("0=x".parse::<Component>().is_err());
        assert!("seg=abc".parse::<Component>().is_err());
        assert!("sha256digest=abc".parse::<Component>().is_err());
    }

    #[test]
    fn test_slashes_and_root() {
        assert_eq!("/".parse::<Name>(), Ok(Name::new()));
        assert_eq!("".parse::<Name>(), Ok(Name::new()));
        assert_eq!(Name::new().to_string(), "/");
        let a: Name = "a/b/".parse().unwrap();
        let b: Name = "/a/b".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn test_prefix() {
        let name: Name = "/a/b/c".parse().unwrap();
        let pre = name.prefix(2);
        assert_eq!(pre.to_string(), "/a/b");
        assert!(pre.is_prefix_of(&name));
        assert!(!name.is_prefix_of(&pre));
        assert_eq!(name.prefix(10), name);
    }

    #[test]
    fn test_canonical_order() {
        let short = Component::generic(b"z".to_vec());
        let long = Component::generic(b"aa".to_vec());
        assert!(short < long);
        assert!(Component::generic(b"zz".to_vec()) < Component::keyword(b"a".to_vec()));
    }

    fn component() -> impl Strategy<Value = Component> {
        prop_oneof![
            prop::collection::vec(any::<u8>(), 1..12).prop_map(Component::generic),
            prop::collection::vec(any::<u8>(), 0..12).prop_map(Component::keyword),
            any::<u64>().prop_map(Component::segment),
            any::<u64>().prop_map(Component::version),
            prop::collection::vec(any::<u8>(), 32)
                .prop_map(|v| Component::new(TYPE_IMPLICIT_SHA256_DIGEST, v)),
        ]
    }

    proptest! {
        #[test]
        fn name_text_round_trip(components in prop::collection::vec(component(), 0..6)) {
            let name = Name::from(components);
            let text = name.to_string();
            prop_assert_eq!(text.parse::<Name>(), Ok(name.clone()));
            prop_assert_eq!(Name::from_bytes(&name.bytes()), Ok(name));
        }
    }
}
