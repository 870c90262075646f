//! ndn-tlv - Declarative TLV codec untuk Named Data Networking
//!
//! Arsitektur:
//! - core: VarNum, Wire (multi-segment), Reader (zero-copy cursor)
//! - protocol: schema, value kinds, two-pass encoder, model traits, Name
//! - network: framing TLV di atas stream transport
//! - packets: model protokol (distance-vector, state-vector sync)
//!
//! Model didefinisikan dengan `#[derive(TlvModel)]`:
//!
//! ```
//! use std::time::Duration;
//! use ndn_tlv::{TlvEncode, TlvModel, TlvParse};
//!
//! #[derive(TlvModel, Debug, PartialEq)]
//! struct MetaInfo {
//!     #[tlv(0x18, natural)]
//!     content_type: u64,
//!     #[tlv(0x19, time)]
//!     freshness: Duration,
//!     #[tlv(0x1a, binary)]
//!     final_block: Option<Vec<u8>>,
//! }
//!
//! let info = MetaInfo {
//!     content_type: 1,
//!     freshness: Duration::from_secs(2),
//!     final_block: None,
//! };
//! let bytes = info.bytes();
//! assert_eq!(bytes, [0x18, 0x01, 0x01, 0x19, 0x02, 0x07, 0xD0]);
//! assert_eq!(MetaInfo::from_bytes(&bytes).unwrap(), info);
//! ```

extern crate self as ndn_tlv;

pub mod core;
pub mod error;
pub mod network;
pub mod packets;
pub mod protocol;

pub use crate::core::{is_critical, tlv_len, Reader, Wire};
pub use crate::error::{Error, FormatError, Result};
pub use crate::protocol::{
    read_map_value, skip_unrecognized, Arg, Cardinality, Component, Covered, Encoder, FieldKind,
    FieldSpec, LengthPlan, Marker, Name, Schema, SignatureSlot, TlvEncode, TlvParse,
};
pub use ndn_tlv_derive::TlvModel;
