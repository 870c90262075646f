//! Markers dan procedure arguments
//!
//! Keduanya adalah pseudo-field tanpa representasi di wire. Nilainya
//! tidak disimpan di struct, tapi di context yang dibuat caller dan
//! dikembalikan bersama hasil encode/parse:
//! - Marker: offset absolut pada posisi field tersebut
//! - Arg: nilai dari caller yang dipakai kondisi `when`/`unless`

use std::fmt;
use std::marker::PhantomData;

use crate::core::Wire;
use crate::error::Result;

/// Zero-width offset marker field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Marker;

/// Procedure argument placeholder field. The value lives in the
/// generated context.
pub struct Arg<T>(PhantomData<fn() -> T>);

impl<T> Arg<T> {
    pub const fn new() -> Self {
        Arg(PhantomData)
    }
}

impl<T> Default for Arg<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Arg<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Arg<T> {}

impl<T> PartialEq for Arg<T> {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

impl<T> Eq for Arg<T> {}

impl<T> fmt::Debug for Arg<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Arg<{}>", std::any::type_name::<T>())
    }
}

/// Bytes between two marker offsets of an encoded or parsed wire.
///
/// A reversed span or one past the end of `wire` means the markers do
/// not belong to this wire and is reported as `MarkerSpan`.
pub fn covered<'w>(wire: &'w Wire<'_>, start: usize, end: usize) -> Result<Wire<'w>> {
    wire.range(start, end)
}

/// Slice variant of [`covered`]
pub fn covered_slice(buf: &[u8], start: usize, end: usize) -> Result<&[u8]> {
    buf.get(start..end).ok_or_else(|| {
        crate::error::FormatError::MarkerSpan {
            start,
            end,
            len: buf.len(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, FormatError};

    #[test]
    fn test_arg_is_zero_sized() {
        assert_eq!(std::mem::size_of::<Arg<Wire<'static>>>(), 0);
        assert_eq!(std::mem::size_of::<Marker>(), 0);
        assert_eq!(Arg::<u32>::new(), Arg::default());
    }

    #[test]
    fn test_covered_slice() {
        let buf = [1u8, 2, 3, 4];
        assert_eq!(covered_slice(&buf, 1, 3), Ok(&buf[1..3]));
        assert_eq!(
            covered_slice(&buf, 3, 1),
            Err(Error::InvalidFormat(FormatError::MarkerSpan {
                start: 3,
                end: 1,
                len: 4
            }))
        );
    }

    #[test]
    fn test_covered_wire() {
        let wire = Wire::from(vec![9u8, 8, 7]);
        assert_eq!(covered(&wire, 1, 3).unwrap().join(), [8, 7]);
        assert!(covered(&wire, 0, 4).is_err());
    }
}
