//! Streaming packet reader
//!
//! The UM7 broadcasts continuously, so reads rarely start on a frame
//! boundary. `PacketReader` accumulates bytes in a ring buffer, skips to the
//! next `snp` marker, and hands out one whole packet at a time:
//!
//! - incomplete frame: keep the bytes, wait for more
//! - checksum failure: drop one byte past the marker and rescan (the length
//!   implied by a corrupted type byte cannot be trusted)
//! - no marker: keep only the last two bytes (a marker may be split)

use super::constants::{MARKER, MAX_FRAME_LEN};
use super::packet::{decode_at, FramingError, Packet};
use super::ring_buffer::RingBuffer;
use crate::error::Result;
use crate::transport::Transport;

/// Bytes requested from the transport per read
const READ_CHUNK: usize = 256;

/// Counters kept by the reader
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Bytes received from the transport
    pub bytes: u64,
    /// Complete packets decoded
    pub packets: u64,
    /// Frames rejected for a bad checksum
    pub checksum_errors: u64,
    /// Bytes skipped while resynchronizing or lost to overflow
    pub discarded_bytes: u64,
}

/// Ring-buffer based packet reader
pub struct PacketReader {
    buffer: RingBuffer<1024>,
    stats: StreamStats,
}

impl PacketReader {
    pub fn new() -> Self {
        Self {
            buffer: RingBuffer::new(),
            stats: StreamStats::default(),
        }
    }

    /// Read whatever the transport has and try to decode one packet
    ///
    /// Returns `Ok(None)` when no complete packet is buffered yet. Further
    /// packets already buffered are returned by `next_packet`.
    pub fn read_packet<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<Option<Packet>> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = transport.read(&mut chunk)?;
        if n > 0 {
            self.push(&chunk[..n]);
        }
        Ok(self.next_packet())
    }

    /// Append received bytes
    pub fn push(&mut self, bytes: &[u8]) {
        self.stats.bytes += bytes.len() as u64;
        let dropped = self.buffer.extend(bytes);
        if dropped > 0 {
            log::warn!("UM7 reader overflow, dropped {} bytes", dropped);
            self.stats.discarded_bytes += dropped as u64;
        }
    }

    /// Decode the next buffered packet, if a complete one is present
    pub fn next_packet(&mut self) -> Option<Packet> {
        loop {
            let Some(marker_idx) = self.buffer.find_pattern_3(MARKER) else {
                let stale = self.buffer.len().saturating_sub(MARKER.len() - 1);
                self.discard(stale);
                return None;
            };
            self.discard(marker_idx);

            let window = self.buffer.len().min(MAX_FRAME_LEN);
            let decoded = match self.buffer.get_slice(0, window) {
                Some(frame) => decode_at(frame),
                None => return None,
            };

            match decoded {
                Ok((_, packet)) => {
                    self.buffer.advance(packet.frame_len());
                    self.stats.packets += 1;
                    return Some(packet);
                }
                Err(FramingError::Truncated) => return None,
                Err(err) => {
                    if matches!(err, FramingError::BadChecksum { .. }) {
                        self.stats.checksum_errors += 1;
                    }
                    log::debug!("UM7 frame rejected: {}", err);
                    self.discard(1);
                }
            }
        }
    }

    /// Drop everything buffered (used before a request/response exchange)
    pub fn clear(&mut self) {
        let len = self.buffer.len();
        self.buffer.advance(len);
    }

    /// Bytes currently buffered
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    fn discard(&mut self, n: usize) {
        if n > 0 {
            self.buffer.advance(n);
            self.stats.discarded_bytes += n as u64;
        }
    }
}

impl Default for PacketReader {
    fn default() -> Self {
        Self::new()
    }
}
