//! TlvStream framing over an in-memory transport
//!
//! Transport sengaja memecah read/write menjadi potongan kecil supaya
//! jalur compact, Incomplete dan partial write ikut teruji.

use std::io::{self, Read, Write};

use ndn_tlv::network::{StreamConfig, TlvStream};
use ndn_tlv::packets::StateVector;
use ndn_tlv::{Name, TlvEncode, TlvModel, Wire};

/// Read returns at most `chunk` bytes; write accepts at most `chunk` bytes
struct ChunkedStream {
    input: Vec<u8>,
    pos: usize,
    chunk: usize,
    output: Vec<u8>,
    interrupt_next: bool,
}

impl ChunkedStream {
    fn new(input: Vec<u8>, chunk: usize) -> Self {
        Self {
            input,
            pos: 0,
            chunk,
            output: Vec::new(),
            interrupt_next: false,
        }
    }
}

impl Read for ChunkedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.interrupt_next {
            self.interrupt_next = false;
            return Err(io::Error::new(io::ErrorKind::Interrupted, "signal"));
        }
        let n = self.chunk.min(buf.len()).min(self.input.len() - self.pos);
        buf[..n].copy_from_slice(&self.input[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl Write for ChunkedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.chunk.min(buf.len());
        self.output.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(TlvModel, Debug, PartialEq)]
struct Probe {
    #[tlv(0x18, natural)]
    seq: u64,
}

#[test]
fn test_frames_split_across_reads() {
    let input = vec![0x05, 0x02, 0xAA, 0xBB, 0x06, 0x01, 0xCC];
    let mut stream = TlvStream::new(ChunkedStream::new(input, 1));

    assert_eq!(stream.next_frame().unwrap(), Some(vec![0x05, 0x02, 0xAA, 0xBB]));
    assert_eq!(stream.next_frame().unwrap(), Some(vec![0x06, 0x01, 0xCC]));
    assert_eq!(stream.next_frame().unwrap(), None);
}

#[test]
fn test_many_frames_in_one_read() {
    let mut input = Vec::new();
    for i in 0..100u8 {
        input.extend_from_slice(&[0x05, 0x01, i]);
    }
    let mut stream = TlvStream::new(ChunkedStream::new(input, 4096));
    for i in 0..100u8 {
        assert_eq!(stream.next_frame().unwrap(), Some(vec![0x05, 0x01, i]));
    }
    assert_eq!(stream.buffered(), 0);
    assert_eq!(stream.next_frame().unwrap(), None);
}

#[test]
fn test_eof_inside_frame() {
    let mut stream = TlvStream::new(ChunkedStream::new(vec![0x05, 0x03, 0xAA], 2));
    let err = stream.next_frame().unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
}

#[test]
fn test_interrupted_read_is_retried() {
    let mut transport = ChunkedStream::new(vec![0x05, 0x00], 8);
    transport.interrupt_next = true;
    let mut stream = TlvStream::new(transport);
    assert_eq!(stream.next_frame().unwrap(), Some(vec![0x05, 0x00]));
}

#[test]
fn test_oversized_frame_discarded() {
    let input = vec![0x05, 0x05, 1, 2, 3, 4, 5, 0x06, 0x01, 0xCC];
    let config = StreamConfig::default().with_max_frame(4);
    let mut stream = TlvStream::with_config(ChunkedStream::new(input, 3), config);

    assert_eq!(stream.next_frame().unwrap(), Some(vec![0x06, 0x01, 0xCC]));
    assert_eq!(stream.next_frame().unwrap(), None);
}

#[test]
fn test_partial_writes() {
    let wire: Wire<'_> = [&[0x05u8, 0x06][..], &[1, 2, 3], &[4, 5, 6]]
        .into_iter()
        .map(std::borrow::Cow::Borrowed)
        .collect();
    let mut stream = TlvStream::new(ChunkedStream::new(Vec::new(), 2));
    stream.write_wire(&wire).unwrap();
    stream.flush().unwrap();
    assert_eq!(stream.get_ref().output, wire.join());
}

#[test]
fn test_send_and_receive_element() {
    let mut sv = StateVector::default();
    sv.set(&"/node/a".parse::<Name>().unwrap(), 10);
    sv.set(&"/node/b".parse::<Name>().unwrap(), 3);

    let mut sender = TlvStream::new(ChunkedStream::new(Vec::new(), 5));
    sender.send_element(0xC9, &sv).unwrap();
    sender.send_element(0xC9, &StateVector::default()).unwrap();
    let sent = sender.into_inner().output;
    assert_eq!(sent[0], 0xC9);
    assert_eq!(sent[1] as usize, sv.encoding_length());

    let mut receiver = TlvStream::new(ChunkedStream::new(sent, 3));
    let (typ, received) = receiver.next_element::<StateVector>().unwrap().unwrap();
    assert_eq!(typ, 0xC9);
    assert_eq!(received, sv);
    let (_, empty) = receiver.next_element::<StateVector>().unwrap().unwrap();
    assert!(empty.entries.is_empty());
    assert!(receiver.next_element::<StateVector>().unwrap().is_none());
}

#[test]
fn test_ignore_critical_config() {
    // Probe { seq: 1 } + unknown critical 0x19
    let input = vec![0x50, 0x06, 0x18, 0x01, 0x01, 0x19, 0x01, 0x00];

    let mut strict = TlvStream::new(ChunkedStream::new(input.clone(), 64));
    let err = strict.next_element::<Probe>().unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);

    let config = StreamConfig::default().with_ignore_critical(true);
    let mut lenient = TlvStream::with_config(ChunkedStream::new(input, 64), config);
    let (typ, probe) = lenient.next_element::<Probe>().unwrap().unwrap();
    assert_eq!(typ, 0x50);
    assert_eq!(probe, Probe { seq: 1 });
}
