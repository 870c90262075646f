//! Protocol message models end-to-end

use ndn_tlv::packets::{
    AdvEntry, Advertisement, Destination, DvPacket, PrefixOpAdd, PrefixOpList, PrefixOpRemove,
    StateVector, StateVectorAppParam,
};
use ndn_tlv::{Error, Name, Reader, TlvEncode, TlvParse, Wire};

fn name(s: &str) -> Name {
    s.parse().unwrap()
}

fn dest(s: &str) -> Option<Destination> {
    Some(Destination { name: name(s) })
}

fn sample_packet() -> DvPacket {
    DvPacket {
        advertisement: Some(Advertisement {
            entries: vec![AdvEntry {
                destination: dest("/r1"),
                next_hop: dest("/r2"),
                cost: 1,
                other_cost: 2,
            }],
        }),
        prefix_op_list: Some(PrefixOpList {
            exit_router: dest("/r1"),
            reset: false,
            adds: vec![PrefixOpAdd {
                name: name("/app/chat"),
                cost: 0,
            }],
            removes: vec![PrefixOpRemove {
                name: name("/app/old"),
            }],
        }),
    }
}

#[test]
fn test_dv_packet_round_trip() {
    let packet = sample_packet();
    let bytes = packet.bytes();
    assert_eq!(bytes.len(), packet.encoding_length());
    assert_eq!(DvPacket::from_bytes(&bytes), Ok(packet));
}

#[test]
fn test_dv_packet_from_fragmented_wire() {
    let packet = sample_packet();
    let bytes = packet.bytes();
    let wire: Wire<'_> = bytes.chunks(3).map(std::borrow::Cow::Borrowed).collect();
    assert!(wire.segments().len() > 1);
    let parsed = DvPacket::parse(Reader::from_wire(&wire), false).unwrap();
    assert_eq!(parsed, packet);
}

#[test]
fn test_advertisement_entry_wire() {
    let adv = Advertisement {
        entries: vec![AdvEntry {
            destination: dest("/a"),
            next_hop: dest("/b"),
            cost: 1,
            other_cost: 2,
        }],
    };
    assert_eq!(
        adv.bytes(),
        [
            0xCA, 0x14, // entry
            0xCC, 0x05, 0x07, 0x03, 0x08, 0x01, b'a', // destination
            0xCE, 0x05, 0x07, 0x03, 0x08, 0x01, b'b', // next hop
            0xD0, 0x01, 0x01, // cost
            0xD2, 0x01, 0x02, // other cost
        ]
    );
}

#[test]
fn test_advertisement_entry_without_next_hop() {
    let bytes = [
        0xCA, 0x0D, // entry
        0xCC, 0x05, 0x07, 0x03, 0x08, 0x01, b'a', // destination
        0xD0, 0x01, 0x01, // cost
        0xD2, 0x01, 0x00, // other cost
    ];
    let adv = Advertisement::from_bytes(&bytes).unwrap();
    let entry = adv.entry(&name("/a")).unwrap();
    assert_eq!(entry.next_hop, None);
    assert_eq!(entry.cost, 1);
    assert_eq!(entry.other_cost, 0);
    assert_eq!(adv.bytes(), bytes);
}

#[test]
fn test_dv_unknown_critical_rejected() {
    // Advertisement berisi TLV 0xCB yang tidak dikenal
    let bytes = [0xC9, 0x03, 0xCB, 0x01, 0x00];
    assert_eq!(
        DvPacket::from_bytes(&bytes),
        Err(Error::UnsupportedCriticalType(0xCB))
    );
    let parsed = DvPacket::parse(Reader::from_slice(&bytes), true).unwrap();
    assert_eq!(parsed.advertisement, Some(Advertisement::default()));
}

#[test]
fn test_state_vector_merge() {
    let mut local = StateVector::default();
    local.set(&name("/alice"), 4);

    let mut remote = StateVector::default();
    remote.set(&name("/alice"), 6);
    remote.set(&name("/bob"), 1);
    let param = StateVectorAppParam {
        entries: vec![remote],
    };
    let bytes = param.bytes();

    let received = StateVectorAppParam::from_bytes(&bytes)
        .unwrap()
        .entries
        .into_iter()
        .next()
        .unwrap_or_default();
    let updates: Vec<(Name, u64)> = local
        .newer_in(&received)
        .map(|e| (e.node_id.clone(), e.seq_no))
        .collect();
    assert_eq!(updates, [(name("/alice"), 6), (name("/bob"), 1)]);

    for (node, seq) in updates {
        local.set(&node, seq);
    }
    assert_eq!(local, received);
}

#[test]
fn test_schema_display() {
    let text = PrefixOpList::SCHEMA.to_string();
    assert!(text.starts_with("PrefixOpList {"));
    assert!(text.contains("reset: Bool @ 0x12e"));
    assert!(text.contains("adds: Struct @ 0x130 [sequence]"));
}
