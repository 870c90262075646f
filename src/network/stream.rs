//! TLV stream framing dengan buffered I/O
//!
//! Memecah byte stream (TCP, Unix socket, pipe) menjadi elemen TLV utuh.
//! Header dibaca dengan `decode_varnum`; `Incomplete` berarti tunggu data.
//! Write memakai vectored I/O sehingga wire no-copy tidak perlu di-join.

use std::borrow::Cow;
use std::io::{self, IoSlice, Read, Write};

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::core::varnum::{decode_varnum, put_varnum};
use crate::core::{Reader, Wire};
use crate::error::{Error, Result};
use crate::protocol::{TlvEncode, TlvParse};

/// Largest NDN packet accepted by default
pub const MAX_NDN_PACKET_SIZE: usize = 8800;

/// Default read buffer - cukup untuk beberapa packet sekaligus
const READ_BUFFER_SIZE: usize = 64 * 1024; // 64KB

/// Stream framing options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Frames declaring more bytes than this are discarded
    pub max_frame: usize,
    pub read_buffer: usize,
    /// Passed to the parser by [`TlvStream::next_element`]
    pub ignore_critical: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_frame: MAX_NDN_PACKET_SIZE,
            read_buffer: READ_BUFFER_SIZE,
            ignore_critical: false,
        }
    }
}

impl StreamConfig {
    pub fn with_max_frame(mut self, max_frame: usize) -> Self {
        self.max_frame = max_frame;
        self
    }

    pub fn with_read_buffer(mut self, size: usize) -> Self {
        self.read_buffer = size;
        self
    }

    pub fn with_ignore_critical(mut self, ignore: bool) -> Self {
        self.ignore_critical = ignore;
        self
    }
}

/// Total size of the TLV element at the start of `buf`.
///
/// `Incomplete` while the TYPE or LENGTH is still cut off.
pub fn frame_len(buf: &[u8]) -> Result<usize> {
    let (_, type_len) = decode_varnum(buf)?;
    let (len, len_len) = decode_varnum(&buf[type_len..])?;
    Ok(usize::try_from(len)
        .unwrap_or(usize::MAX)
        .saturating_add(type_len + len_len))
}

/// TLV framer over a byte stream
///
/// Read buffer di-allocate sekali; data yang belum lengkap di-compact
/// ke awal buffer sebelum read berikutnya.
pub struct TlvStream<S> {
    stream: S,
    config: StreamConfig,
    read_buffer: Box<[u8]>,
    read_pos: usize,
    read_len: usize,
    discard: usize,
}

impl<S: Read + Write> TlvStream<S> {
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, StreamConfig::default())
    }

    pub fn with_config(stream: S, config: StreamConfig) -> Self {
        // Buffer harus muat satu frame maksimum plus header
        let size = config.read_buffer.max(config.max_frame + 2 * 9);
        Self {
            stream,
            config,
            read_buffer: vec![0u8; size].into_boxed_slice(),
            read_pos: 0,
            read_len: 0,
            discard: 0,
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Bytes buffered but not yet returned as a frame
    #[inline(always)]
    pub fn buffered(&self) -> usize {
        self.read_len - self.read_pos
    }

    /// Compact buffer lalu read dari stream. Returns bytes read (0 = EOF).
    fn fill_read_buffer(&mut self) -> io::Result<usize> {
        if self.read_pos > 0 {
            self.read_buffer.copy_within(self.read_pos..self.read_len, 0);
            self.read_len -= self.read_pos;
            self.read_pos = 0;
        }

        if self.read_len == self.read_buffer.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "read buffer full without a complete TLV frame",
            ));
        }

        loop {
            match self.stream.read(&mut self.read_buffer[self.read_len..]) {
                Ok(n) => {
                    self.read_len += n;
                    return Ok(n);
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Next complete TLV element, header included.
    ///
    /// `Ok(None)` on EOF at a frame boundary, `UnexpectedEof` when the
    /// stream ends inside a frame.
    pub fn next_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        loop {
            if self.discard > 0 {
                let n = self.discard.min(self.buffered());
                self.read_pos += n;
                self.discard -= n;
            }

            if self.discard == 0 {
                let readable = &self.read_buffer[self.read_pos..self.read_len];
                match frame_len(readable) {
                    Ok(total) if total > self.config.max_frame => {
                        debug!(
                            total,
                            max = self.config.max_frame,
                            "discarding oversized TLV frame"
                        );
                        self.discard = total;
                        continue;
                    }
                    Ok(total) if readable.len() >= total => {
                        let frame = readable[..total].to_vec();
                        self.read_pos += total;
                        trace!(len = total, "TLV frame received");
                        return Ok(Some(frame));
                    }
                    Ok(_) | Err(Error::Incomplete { .. }) => {}
                    Err(e) => return Err(e.into()),
                }
            }

            let pending = self.buffered() + self.discard;
            if self.fill_read_buffer()? == 0 {
                return if pending == 0 {
                    Ok(None)
                } else {
                    Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "stream ended inside a TLV frame",
                    ))
                };
            }
        }
    }

    /// Next element parsed as `T` from its value; returns the outer type too.
    pub fn next_element<T>(&mut self) -> io::Result<Option<(u64, T)>>
    where
        T: for<'a> TlvParse<'a>,
    {
        let Some(frame) = self.next_frame()? else {
            return Ok(None);
        };
        let mut reader = Reader::from_slice(&frame);
        let typ = reader.read_varnum()?;
        let len = reader.read_length()?;
        let value = T::parse(reader.delegate(len)?, self.config.ignore_critical)?;
        Ok(Some((typ, value)))
    }

    /// Write wire dengan vectored I/O, tanpa join
    pub fn write_wire(&mut self, wire: &Wire<'_>) -> io::Result<()> {
        let segments: SmallVec<[&[u8]; 8]> = wire.iter().collect();
        let mut idx = 0usize;
        let mut off = 0usize;

        while idx < segments.len() {
            let slices: SmallVec<[IoSlice<'_>; 8]> =
                std::iter::once(IoSlice::new(&segments[idx][off..]))
                    .chain(segments[idx + 1..].iter().map(|s| IoSlice::new(s)))
                    .collect();

            let mut written = match self.stream.write_vectored(&slices) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "failed to write TLV frame",
                    ));
                }
                Ok(n) => n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };

            while written > 0 && idx < segments.len() {
                let avail = segments[idx].len() - off;
                if written < avail {
                    off += written;
                    written = 0;
                } else {
                    written -= avail;
                    idx += 1;
                    off = 0;
                }
            }
        }
        Ok(())
    }

    /// Encode `value` di dalam TLV bertipe `typ` lalu kirim
    pub fn send_element<T: TlvEncode>(&mut self, typ: u64, value: &T) -> io::Result<()> {
        let body = value.encode();
        let mut header = Vec::with_capacity(18);
        put_varnum(&mut header, typ);
        put_varnum(&mut header, body.len() as u64);

        let frame: Wire<'_> = std::iter::once(Cow::Owned(header))
            .chain(body.iter().map(Cow::Borrowed))
            .collect();
        self.write_wire(&frame)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}
