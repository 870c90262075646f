//! State Vector Sync
//!
//! State vector = daftar (node id, sequence number terbaru). Dibawa di
//! application parameters dari Sync Interest.

use crate::protocol::Name;
use crate::TlvModel;

/// Application parameters of a Sync Interest; satu Interest bisa
/// membawa beberapa state vector.
#[derive(TlvModel, Debug, Clone, Default, PartialEq, Eq)]
pub struct StateVectorAppParam {
    #[tlv(0xC9, sequence(struct))]
    pub entries: Vec<StateVector>,
}

#[derive(TlvModel, Debug, Clone, Default, PartialEq, Eq)]
pub struct StateVector {
    #[tlv(0xCA, sequence(struct))]
    pub entries: Vec<StateVectorEntry>,
}

#[derive(TlvModel, Debug, Clone, PartialEq, Eq)]
pub struct StateVectorEntry {
    #[tlv(0x07, name)]
    pub node_id: Name,
    #[tlv(0xCC, natural)]
    pub seq_no: u64,
}

impl StateVector {
    /// Sequence number of `node_id`, 0 when unknown
    pub fn get(&self, node_id: &Name) -> u64 {
        self.entries
            .iter()
            .find(|e| &e.node_id == node_id)
            .map_or(0, |e| e.seq_no)
    }

    /// Set the sequence number of `node_id`, adding an entry if needed
    pub fn set(&mut self, node_id: &Name, seq_no: u64) {
        match self.entries.iter_mut().find(|e| &e.node_id == node_id) {
            Some(entry) => entry.seq_no = seq_no,
            None => self.entries.push(StateVectorEntry {
                node_id: node_id.clone(),
                seq_no,
            }),
        }
    }

    /// Entries where `other` is ahead of us
    pub fn newer_in<'s>(
        &'s self,
        other: &'s StateVector,
    ) -> impl Iterator<Item = &'s StateVectorEntry> + 's {
        other
            .entries
            .iter()
            .filter(move |e| e.seq_no > self.get(&e.node_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{TlvEncode, TlvParse};

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    #[test]
    fn test_app_param_wire() {
        let mut sv = StateVector::default();
        sv.set(&name("/a"), 3);
        let param = StateVectorAppParam { entries: vec![sv] };
        let bytes = param.bytes();
        assert_eq!(
            bytes,
            [
                0xC9, 0x0A, 0xCA, 0x08, 0x07, 0x03, 0x08, 0x01, b'a', 0xCC, 0x01, 0x03
            ]
        );
        assert_eq!(StateVectorAppParam::from_bytes(&bytes), Ok(param));
    }

    #[test]
    fn test_app_param_multiple_vectors() {
        let bytes = [
            0xC9, 0x0A, 0xCA, 0x08, 0x07, 0x03, 0x08, 0x01, b'a', 0xCC, 0x01, 0x03, //
            0xC9, 0x0A, 0xCA, 0x08, 0x07, 0x03, 0x08, 0x01, b'b', 0xCC, 0x01, 0x05,
        ];
        let param = StateVectorAppParam::from_bytes(&bytes).unwrap();
        assert_eq!(param.entries.len(), 2);
        assert_eq!(param.entries[0].get(&name("/a")), 3);
        assert_eq!(param.entries[1].get(&name("/b")), 5);
        assert_eq!(param.entries[1].get(&name("/a")), 0);
        assert_eq!(param.bytes(), bytes);

        let empty = StateVectorAppParam::default();
        assert!(empty.bytes().is_empty());
    }

    #[test]
    fn test_get_set() {
        let mut sv = StateVector::default();
        assert_eq!(sv.get(&name("/a")), 0);
        sv.set(&name("/a"), 1);
        sv.set(&name("/b"), 7);
        sv.set(&name("/a"), 2);
        assert_eq!(sv.entries.len(), 2);
        assert_eq!(sv.get(&name("/a")), 2);
        assert_eq!(sv.get(&name("/b")), 7);
    }

    #[test]
    fn test_newer_in() {
        let mut ours = StateVector::default();
        ours.set(&name("/a"), 5);
        ours.set(&name("/b"), 2);
        let mut theirs = StateVector::default();
        theirs.set(&name("/a"), 4);
        theirs.set(&name("/b"), 3);
        theirs.set(&name("/c"), 1);

        let newer: Vec<_> = ours.newer_in(&theirs).map(|e| e.node_id.to_string()).collect();
        assert_eq!(newer, ["/b", "/c"]);
    }

    #[test]
    fn test_unknown_non_critical_entry_field_skipped() {
        // 0x0320 (800) non-critical di dalam entry
        let bytes = [
            0xCA, 0x0C, 0x07, 0x03, 0x08, 0x01, b'a', 0xFD, 0x03, 0x20, 0x00, 0xCC, 0x01, 0x09,
        ];
        let sv = StateVector::from_bytes(&bytes).unwrap();
        assert_eq!(sv.get(&name("/a")), 9);
    }
}
