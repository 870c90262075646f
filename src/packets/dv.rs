//! Distance-vector routing messages
//!
//! Router mengirim [`Advertisement`] berisi cost ke setiap destination,
//! dan [`PrefixOpList`] untuk mengumumkan prefix yang dia layani.

use crate::protocol::Name;
use crate::TlvModel;

/// Top-level DV packet; either part may be absent.
#[derive(TlvModel, Debug, Clone, Default, PartialEq, Eq)]
pub struct DvPacket {
    #[tlv(0xC9, struct)]
    pub advertisement: Option<Advertisement>,
    #[tlv(0x12D, struct)]
    pub prefix_op_list: Option<PrefixOpList>,
}

#[derive(TlvModel, Debug, Clone, Default, PartialEq, Eq)]
pub struct Advertisement {
    #[tlv(0xCA, sequence(struct))]
    pub entries: Vec<AdvEntry>,
}

impl Advertisement {
    /// Entry untuk destination tertentu
    pub fn entry(&self, destination: &Name) -> Option<&AdvEntry> {
        self.entries
            .iter()
            .find(|e| e.destination.as_ref().is_some_and(|d| &d.name == destination))
    }
}

/// One routing table row. Router boleh mengosongkan `destination` atau
/// `next_hop`; receiver yang memutuskan entry seperti itu dipakai atau tidak.
#[derive(TlvModel, Debug, Clone, PartialEq, Eq)]
pub struct AdvEntry {
    #[tlv(0xCC, struct)]
    pub destination: Option<Destination>,
    #[tlv(0xCE, struct)]
    pub next_hop: Option<Destination>,
    #[tlv(0xD0, natural)]
    pub cost: u64,
    /// Cost of the second-best path
    #[tlv(0xD2, natural)]
    pub other_cost: u64,
}

/// Router name wrapper
#[derive(TlvModel, Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Destination {
    #[tlv(0x07, name)]
    pub name: Name,
}

impl From<Name> for Destination {
    fn from(name: Name) -> Self {
        Self { name }
    }
}

/// Prefix changes announced by `exit_router`.
///
/// `reset` means the receiver drops every prefix it knows from this
/// router before applying `adds`.
#[derive(TlvModel, Debug, Clone, PartialEq, Eq)]
pub struct PrefixOpList {
    #[tlv(0xCC, struct)]
    pub exit_router: Option<Destination>,
    #[tlv(0x12E, bool)]
    pub reset: bool,
    #[tlv(0x130, sequence(struct))]
    pub adds: Vec<PrefixOpAdd>,
    #[tlv(0x132, sequence(struct))]
    pub removes: Vec<PrefixOpRemove>,
}

#[derive(TlvModel, Debug, Clone, PartialEq, Eq)]
pub struct PrefixOpAdd {
    #[tlv(0x07, name)]
    pub name: Name,
    #[tlv(0xD0, natural)]
    pub cost: u64,
}

#[derive(TlvModel, Debug, Clone, PartialEq, Eq)]
pub struct PrefixOpRemove {
    #[tlv(0x07, name)]
    pub name: Name,
}
