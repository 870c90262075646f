//! Schema model: static field tables
//!
//! Dihasilkan oleh `#[derive(TlvModel)]` sebagai `&'static Schema`,
//! read-only selama proses berjalan.

use std::fmt;

/// Value kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Big-endian integer in minimal 1/2/4/8 bytes
    Natural,
    /// Big-endian integer of exactly this many bytes
    Fixed(u8),
    /// Present (zero-length) means true
    Bool,
    Binary,
    /// UTF-8 text
    Text,
    /// Raw bytes kept as wire segments
    Wire,
    Name,
    /// Natural number of milliseconds
    Time,
    Struct,
    /// Signature value; records its covered range
    Signature,
    /// Interest name with optional parameters digest
    InterestName,
    /// Zero-width offset marker
    Marker,
    /// Marker that also records the range from its start marker
    RangeMarker,
    /// Caller-supplied procedure argument
    Argument,
}

impl FieldKind {
    /// Marker dan argument tidak punya representasi di wire
    #[inline(always)]
    pub const fn on_wire(self) -> bool {
        !matches!(
            self,
            FieldKind::Marker | FieldKind::RangeMarker | FieldKind::Argument
        )
    }
}

/// How many TLVs a field maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    Single,
    /// Consecutive TLVs of the same type, order preserved
    Sequence,
    /// Key TLV (of the field's type) followed by a value TLV of `value_type`
    Map {
        key: FieldKind,
        value_type: u64,
        value: FieldKind,
    },
}

/// Field metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    /// Zero for markers and arguments
    pub type_num: u64,
    pub kind: FieldKind,
    pub optional: bool,
    pub cardinality: Cardinality,
    /// Schema of the struct value (or map value) for struct kinds
    pub nested: Option<&'static Schema>,
    /// Procedure argument gating this field, with the required value
    pub condition: Option<(&'static str, bool)>,
}

impl FieldSpec {
    /// Field yang boleh tidak ada di wire
    #[inline]
    pub const fn may_be_absent(&self) -> bool {
        self.optional
            || self.condition.is_some()
            || !matches!(self.cardinality, Cardinality::Single)
            || matches!(self.kind, FieldKind::Bool)
            || !self.kind.on_wire()
    }

    #[inline]
    pub const fn is_repeated(&self) -> bool {
        !matches!(self.cardinality, Cardinality::Single)
    }
}

/// Ordered field list of one message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

impl Schema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// First wire field with this TLV type
    pub fn field_by_type(&self, type_num: u64) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|f| f.kind.on_wire() && f.type_num == type_num)
    }

    /// Fields that appear on the wire
    pub fn wire_fields(&self) -> impl Iterator<Item = &FieldSpec> + '_ {
        self.fields.iter().filter(|f| f.kind.on_wire())
    }

    /// Offset and range markers
    pub fn markers(&self) -> impl Iterator<Item = &FieldSpec> + '_ {
        self.fields
            .iter()
            .filter(|f| matches!(f.kind, FieldKind::Marker | FieldKind::RangeMarker))
    }

    /// True jika nilai dengan semua field kosong meng-encode ke nol byte
    pub fn is_all_optional(&self) -> bool {
        self.fields.iter().all(FieldSpec::may_be_absent)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {{", self.name)?;
        for field in self.fields {
            write!(f, "  {}: {:?}", field.name, field.kind)?;
            if field.kind.on_wire() {
                write!(f, " @ {:#x}", field.type_num)?;
            }
            match field.cardinality {
                Cardinality::Single => {}
                Cardinality::Sequence => write!(f, " [sequence]")?,
                Cardinality::Map {
                    key,
                    value_type,
                    value,
                } => write!(f, " [map {:?} => {:?} @ {:#x}]", key, value, value_type)?,
            }
            if field.optional {
                write!(f, " (optional)")?;
            }
            if let Some((arg, expected)) = field.condition {
                let word = if expected { "when" } else { "unless" };
                write!(f, " ({} {})", word, arg)?;
            }
            if let Some(nested) = field.nested {
                write!(f, " -> {}", nested.name)?;
            }
            writeln!(f)?;
        }
        write!(f, "}}")
    }
}
