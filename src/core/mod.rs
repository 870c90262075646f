//! Core module: primitive TLV encoding
//!
//! Prinsip desain:
//! - Canonical: setiap angka punya tepat satu bentuk VarNum
//! - Zero-Copy: Wire dan Reader meminjam buffer input
//! - No hidden state: setiap encode/parse punya Wire/Reader sendiri

mod reader;
pub mod varnum;
mod wire;

pub use reader::Reader;
pub use varnum::{is_critical, tlv_len};
pub use wire::Wire;
