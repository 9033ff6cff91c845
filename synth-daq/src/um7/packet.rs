//! UM7 packet codec
//!
//! Frame format:
//!
//! ```text
//! ┌───────────┬──────┬─────────┬──────────────┬───────┬───────┬──────┐
//! │ 's' 'n' 'p'│ type │ address │ data (0..64) │ ck_hi │ ck_lo │ '\n' │
//! └───────────┴──────┴─────────┴──────────────┴───────┴───────┴──────┘
//! ```
//!
//! The checksum is the 16-bit wrapping sum of every byte from the marker up
//! to the end of the data section. The data length is not transmitted; it
//! follows from the packet type: no data, one register (4 bytes), or
//! `batch_length` registers. The terminator is only sent by us; the sensor
//! does not emit one and the decoder never requires it.

use super::constants::{
    MARKER, MAX_DATA_LEN, MIN_FRAME_LEN, PT_BATCH_LENGTH_MASK, PT_BATCH_LENGTH_SHIFT,
    PT_COMMAND_FAILED, PT_HAS_DATA, PT_IS_BATCH, REGISTER_SIZE, TERMINATOR,
};
use crate::error::{Error, Result};

/// Reasons a byte buffer did not yield a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FramingError {
    /// No `snp` marker in the buffer
    #[error("no packet marker")]
    NoMarker,
    /// Marker found but the frame is incomplete
    #[error("truncated packet")]
    Truncated,
    /// Frame complete but the checksum does not match
    #[error("checksum mismatch: computed {computed:#06x}, received {received:#06x}")]
    BadChecksum {
        /// Checksum computed over the received bytes
        computed: u16,
        /// Checksum carried by the frame
        received: u16,
    },
}

/// Packet type byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketType(u8);

impl PacketType {
    /// Wrap a raw packet type byte
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Packet type describing a payload of `len` bytes
    ///
    /// Returns `None` if `len` is not 0, 4, or a multiple of 4 up to 15
    /// registers.
    pub fn for_data_len(len: usize) -> Option<Self> {
        match len {
            0 => Some(Self(0)),
            REGISTER_SIZE => Some(Self(PT_HAS_DATA)),
            _ if len % REGISTER_SIZE == 0 && len / REGISTER_SIZE <= 0x0F => {
                let batch = (len / REGISTER_SIZE) as u8;
                Some(Self(
                    PT_HAS_DATA | PT_IS_BATCH | (batch << PT_BATCH_LENGTH_SHIFT),
                ))
            }
            _ => None,
        }
    }

    /// Raw byte
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn has_data(self) -> bool {
        self.0 & PT_HAS_DATA != 0
    }

    #[inline]
    pub const fn is_batch(self) -> bool {
        self.0 & PT_IS_BATCH != 0
    }

    /// Batch length nibble (meaningful only when `is_batch`)
    #[inline]
    pub const fn batch_length(self) -> u8 {
        (self.0 & PT_BATCH_LENGTH_MASK) >> PT_BATCH_LENGTH_SHIFT
    }

    #[inline]
    pub const fn command_failed(self) -> bool {
        self.0 & PT_COMMAND_FAILED != 0
    }

    /// Number of data bytes implied by this type
    #[inline]
    pub const fn data_len(self) -> usize {
        if !self.has_data() {
            0
        } else if self.is_batch() {
            REGISTER_SIZE * self.batch_length() as usize
        } else {
            REGISTER_SIZE
        }
    }
}

/// One UM7 protocol message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    address: u8,
    packet_type: PacketType,
    data: [u8; MAX_DATA_LEN],
    data_len: usize,
    checksum: u16,
}

impl Packet {
    /// Build a packet, validating that `data` matches the packet type
    pub fn new(address: u8, packet_type: PacketType, data: &[u8]) -> Result<Self> {
        if data.len() != packet_type.data_len() {
            return Err(Error::InvalidPacket(format!(
                "type {:#04x} implies {} data bytes, got {}",
                packet_type.bits(),
                packet_type.data_len(),
                data.len()
            )));
        }
        Ok(Self::from_parts(address, packet_type, data))
    }

    /// Build a register write (or a command, when `data` is empty)
    ///
    /// The packet type is derived from the data length.
    pub fn write(address: u8, data: &[u8]) -> Result<Self> {
        let packet_type = PacketType::for_data_len(data.len()).ok_or_else(|| {
            Error::InvalidPacket(format!(
                "{} bytes is not a whole number of registers",
                data.len()
            ))
        })?;
        Ok(Self::from_parts(address, packet_type, data))
    }

    fn from_parts(address: u8, packet_type: PacketType, data: &[u8]) -> Self {
        let mut buf = [0u8; MAX_DATA_LEN];
        buf[..data.len()].copy_from_slice(data);
        Self {
            address,
            packet_type,
            data: buf,
            data_len: data.len(),
            checksum: checksum(packet_type.bits(), address, data),
        }
    }

    #[inline]
    pub fn address(&self) -> u8 {
        self.address
    }

    #[inline]
    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data[..self.data_len]
    }

    #[inline]
    pub fn checksum(&self) -> u16 {
        self.checksum
    }

    /// Bytes this packet occupies on the wire, excluding the terminator
    #[inline]
    pub fn frame_len(&self) -> usize {
        MIN_FRAME_LEN + self.data_len
    }

    /// Register `index` of the data section as a big-endian word
    pub fn register_u32(&self, index: usize) -> Option<u32> {
        let start = index * REGISTER_SIZE;
        let bytes = self.data().get(start..start + REGISTER_SIZE)?;
        Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Register `index` of the data section as an IEEE-754 single
    pub fn register_f32(&self, index: usize) -> Option<f32> {
        self.register_u32(index).map(f32::from_bits)
    }

    /// Number of whole registers carried
    #[inline]
    pub fn register_count(&self) -> usize {
        self.data_len / REGISTER_SIZE
    }
}

/// Checksum over marker, type, address and data
pub fn checksum(packet_type: u8, address: u8, data: &[u8]) -> u16 {
    MARKER
        .iter()
        .chain([packet_type, address].iter())
        .chain(data.iter())
        .fold(0u16, |sum, &b| sum.wrapping_add(b as u16))
}

/// Serialize a packet, including the trailing line terminator
pub fn encode(packet: &Packet) -> Vec<u8> {
    let mut frame = Vec::with_capacity(packet.frame_len() + 1);
    frame.extend_from_slice(&MARKER);
    frame.push(packet.packet_type.bits());
    frame.push(packet.address);
    frame.extend_from_slice(packet.data());
    frame.extend_from_slice(&packet.checksum.to_be_bytes());
    frame.push(TERMINATOR);
    frame
}

/// Decode the first packet in `buffer`
pub fn decode(buffer: &[u8]) -> std::result::Result<Packet, FramingError> {
    decode_at(buffer).map(|(_, packet)| packet)
}

/// Decode the first packet in `buffer`, also returning the marker offset
///
/// Bytes before the marker are skipped. The packet occupies
/// `offset..offset + packet.frame_len()`.
pub fn decode_at(buffer: &[u8]) -> std::result::Result<(usize, Packet), FramingError> {
    // windows(3) never starts past len - 3: the marker needs two trailing bytes
    let offset = buffer
        .windows(MARKER.len())
        .position(|w| w == MARKER)
        .ok_or(FramingError::NoMarker)?;

    let frame = &buffer[offset..];
    if frame.len() < MIN_FRAME_LEN {
        return Err(FramingError::Truncated);
    }

    let packet_type = PacketType::from_bits(frame[3]);
    let data_len = packet_type.data_len();
    if frame.len() < MIN_FRAME_LEN + data_len {
        return Err(FramingError::Truncated);
    }

    let address = frame[4];
    let data = &frame[5..5 + data_len];
    let computed = checksum(packet_type.bits(), address, data);
    let received = u16::from_be_bytes([frame[5 + data_len], frame[6 + data_len]]);
    if computed != received {
        return Err(FramingError::BadChecksum { computed, received });
    }

    Ok((offset, Packet::from_parts(address, packet_type, data)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::um7::constants::{DREG_ALL_PROC, DREG_HEALTH, RESET_EKF};

    fn sample_packets() -> Vec<Packet> {
        vec![
            Packet::write(RESET_EKF, &[]).unwrap(),
            Packet::write(DREG_HEALTH, &[0x12, 0x34, 0x56, 0x78]).unwrap(),
            Packet::write(DREG_ALL_PROC, &[0xA5; 48]).unwrap(),
            Packet::write(0xFF, &[0xFF; 60]).unwrap(),
            Packet::new(0x00, PacketType::from_bits(PT_COMMAND_FAILED), &[]).unwrap(),
        ]
    }

    #[test]
    fn test_packet_type_lengths() {
        assert_eq!(PacketType::from_bits(0x00).data_len(), 0);
        assert_eq!(PacketType::from_bits(0x80).data_len(), 4);
        // has data + batch of 12 registers
        assert_eq!(PacketType::from_bits(0xF0).data_len(), 48);
        // batch bit without has_data carries nothing
        assert_eq!(PacketType::from_bits(0x70).data_len(), 0);
        assert!(PacketType::from_bits(0x01).command_failed());
    }

    #[test]
    fn test_for_data_len() {
        assert_eq!(PacketType::for_data_len(0).unwrap().bits(), 0x00);
        assert_eq!(PacketType::for_data_len(4).unwrap().bits(), 0x80);
        assert_eq!(PacketType::for_data_len(8).unwrap().bits(), 0xC8);
        assert_eq!(PacketType::for_data_len(48).unwrap().bits(), 0xF0);
        assert!(PacketType::for_data_len(3).is_none());
        assert!(PacketType::for_data_len(64).is_none());
    }

    #[test]
    fn test_encode_layout() {
        let packet = Packet::write(RESET_EKF, &[]).unwrap();
        let bytes = encode(&packet);

        // 's'+'n'+'p' = 0x73+0x6E+0x70 = 0x151, + 0xB3 = 0x204
        assert_eq!(bytes, vec![b's', b'n', b'p', 0x00, 0xB3, 0x02, 0x04, b'\n']);
    }

    #[test]
    fn test_round_trip() {
        for packet in sample_packets() {
            assert_eq!(decode(&encode(&packet)), Ok(packet));
        }
    }

    #[test]
    fn test_resync_after_garbage() {
        let packet = Packet::write(DREG_HEALTH, &[0, 0, 4, 0]).unwrap();
        let mut buf = vec![0x00, b's', b'n', 0x13, 0xFF, b'p'];
        buf.extend(encode(&packet));

        let (offset, decoded) = decode_at(&buf).unwrap();
        assert_eq!(offset, 6);
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_no_marker() {
        assert_eq!(decode(&[]), Err(FramingError::NoMarker));
        assert_eq!(decode(b"sn"), Err(FramingError::NoMarker));
        assert_eq!(decode(&[0x55; 40]), Err(FramingError::NoMarker));
        // marker split at the very end is not found
        assert_eq!(decode(b"xxxxxxsn"), Err(FramingError::NoMarker));
    }

    #[test]
    fn test_truncated() {
        let bytes = encode(&Packet::write(DREG_ALL_PROC, &[1; 48]).unwrap());

        assert_eq!(decode(&bytes[..5]), Err(FramingError::Truncated));
        assert_eq!(decode(&bytes[..20]), Err(FramingError::Truncated));
        // checksum bytes missing
        assert_eq!(decode(&bytes[..54]), Err(FramingError::Truncated));
        assert!(decode(&bytes[..55]).is_ok());
    }

    #[test]
    fn test_single_byte_flip_detected() {
        for packet in sample_packets() {
            let bytes = encode(&packet);
            let frame_len = packet.frame_len();

            // address, data and checksum corruption is a checksum failure
            for i in 4..frame_len {
                let mut corrupted = bytes.clone();
                corrupted[i] ^= 0x5A;
                assert!(
                    matches!(decode(&corrupted), Err(FramingError::BadChecksum { .. })),
                    "flip at {} not caught as checksum error",
                    i
                );
            }

            // marker or type corruption must fail one way or another
            for i in 0..4 {
                let mut corrupted = bytes.clone();
                corrupted[i] ^= 0x5A;
                assert!(decode(&corrupted).is_err(), "flip at {} accepted", i);
            }
        }
    }

    #[test]
    fn test_register_accessors() {
        let data = [0x3F, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2A];
        let packet = Packet::write(DREG_ALL_PROC, &data).unwrap();

        assert_eq!(packet.register_count(), 2);
        assert_eq!(packet.register_f32(0), Some(1.0));
        assert_eq!(packet.register_u32(1), Some(42));
        assert_eq!(packet.register_u32(2), None);
    }

    #[test]
    fn test_new_rejects_mismatched_length() {
        assert!(Packet::new(0x10, PacketType::from_bits(0x80), &[1, 2]).is_err());
        assert!(Packet::write(0x10, &[1, 2, 3]).is_err());
    }
}
