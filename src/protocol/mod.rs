//! Protocol layer: declarative TLV models
//!
//! Prinsip desain:
//! - Two-pass encode: ukur dulu, lalu tulis ke buffer berukuran tepat
//! - Progress-ordered parse: field dicocokkan sesuai urutan deklarasi
//! - Context eksplisit: marker dan argument tidak disimpan di state tersembunyi

mod encoder;
pub mod kind;
pub mod markers;
mod model;
pub mod name;
mod schema;
pub mod signing;

pub use encoder::{Encoder, LengthPlan};
pub use markers::{Arg, Marker};
pub use model::{read_map_value, skip_unrecognized, TlvEncode, TlvParse};
pub use name::{Component, Name};
pub use schema::{Cardinality, FieldKind, FieldSpec, Schema};
pub use signing::{Covered, SignatureSlot};
