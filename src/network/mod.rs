//! Network layer: TLV framing di atas stream transport
//!
//! Prinsip desain:
//! - Pre-allocated read buffer, compact sebelum read
//! - Scatter-gather write: segment wire dikirim tanpa di-join
//! - Tidak ada socket/event loop di sini; caller yang memegang transport

mod stream;

pub use stream::{frame_len, StreamConfig, TlvStream, MAX_NDN_PACKET_SIZE};
