//! Packet envelope shared by commands, acknowledgements and data uploads.
//!
//! ```text
//! offset  0   1   2   3   4   5   6    7   8    9 ..       n-2 n-1
//!        EF  01 [ address (BE) ] type [ len (BE) ] payload ..[checksum]
//! ```
//!
//! `len` is the payload length plus the two checksum bytes. The checksum is
//! the 16-bit wrapping sum of the type byte, both length bytes and every
//! payload byte.

use bytes::{BufMut, Bytes, BytesMut};
use fingerlink_core::constants::{
    CHECKSUM_LEN, HEADER_LEN, HEADER_TAIL_LEN, MIN_COMBINED_LENGTH, PACKET_PREFIX,
};

/// Packet type identifier (byte 6 of the envelope).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    /// Host to sensor command.
    Command,
    /// Data packet, more to follow.
    Data,
    /// Acknowledgement of a command.
    Ack,
    /// Last data packet of an upload.
    EndData,
    /// Anything else seen on the wire.
    Unknown(u8),
}

impl PacketType {
    pub fn as_u8(&self) -> u8 {
        match self {
            PacketType::Command => 0x01,
            PacketType::Data => 0x02,
            PacketType::Ack => 0x07,
            PacketType::EndData => 0x08,
            PacketType::Unknown(value) => *value,
        }
    }

    /// Whether the packet carries template data.
    pub fn is_data(&self) -> bool {
        matches!(self, PacketType::Data | PacketType::EndData)
    }
}

impl From<u8> for PacketType {
    fn from(value: u8) -> Self {
        match value {
            0x01 => PacketType::Command,
            0x02 => PacketType::Data,
            0x07 => PacketType::Ack,
            0x08 => PacketType::EndData,
            other => PacketType::Unknown(other),
        }
    }
}

/// The seven header bytes that follow the prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub address: u32,
    pub kind: PacketType,
    pub combined_length: u16,
}

impl PacketHeader {
    /// Decode the header tail (address, type, length).
    pub fn parse(tail: &[u8; HEADER_TAIL_LEN]) -> Self {
        Self {
            address: u32::from_be_bytes([tail[0], tail[1], tail[2], tail[3]]),
            kind: PacketType::from(tail[4]),
            combined_length: u16::from_be_bytes([tail[5], tail[6]]),
        }
    }

    /// Payload length, or `None` when the length field is below the legal minimum.
    pub fn payload_len(&self) -> Option<usize> {
        if self.combined_length < MIN_COMBINED_LENGTH {
            return None;
        }
        Some(self.combined_length as usize - CHECKSUM_LEN)
    }
}

/// One framed packet as received from or sent to the sensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    pub address: u32,
    pub kind: PacketType,
    pub payload: Bytes,
    /// Checksum as carried on the wire. Not verified on receive.
    pub checksum: u16,
}

impl RawPacket {
    /// Build a packet with a freshly computed checksum.
    pub fn new(address: u32, kind: PacketType, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        let checksum = checksum(kind, combined_length(payload.len()), &payload);
        Self {
            address,
            kind,
            payload,
            checksum,
        }
    }

    /// Value of the combined length field for this packet.
    pub fn combined_length(&self) -> u16 {
        combined_length(self.payload.len())
    }

    /// Checksum recomputed from the packet contents.
    pub fn computed_checksum(&self) -> u16 {
        checksum(self.kind, self.combined_length(), &self.payload)
    }

    /// Whether the carried checksum agrees with the contents.
    pub fn checksum_matches(&self) -> bool {
        self.checksum == self.computed_checksum()
    }

    /// Serialize the packet, including prefix and checksum.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.payload.len() + CHECKSUM_LEN);
        buf.put_slice(&PACKET_PREFIX);
        buf.put_u32(self.address);
        buf.put_u8(self.kind.as_u8());
        buf.put_u16(self.combined_length());
        buf.put_slice(&self.payload);
        buf.put_u16(self.checksum);
        buf.freeze()
    }
}

fn combined_length(payload_len: usize) -> u16 {
    (payload_len + CHECKSUM_LEN) as u16
}

/// 16-bit wrapping sum over type, length and payload bytes.
pub fn checksum(kind: PacketType, combined_length: u16, payload: &[u8]) -> u16 {
    let [len_hi, len_lo] = combined_length.to_be_bytes();
    payload.iter().fold(
        u16::from(kind.as_u8())
            .wrapping_add(u16::from(len_hi))
            .wrapping_add(u16::from(len_lo)),
        |sum, &b| sum.wrapping_add(u16::from(b)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0x01, PacketType::Command)]
    #[case(0x02, PacketType::Data)]
    #[case(0x07, PacketType::Ack)]
    #[case(0x08, PacketType::EndData)]
    #[case(0x42, PacketType::Unknown(0x42))]
    fn test_packet_type_from_byte(#[case] byte: u8, #[case] expected: PacketType) {
        let kind = PacketType::from(byte);
        assert_eq!(kind, expected);
        assert_eq!(kind.as_u8(), byte);
    }

    #[test]
    fn test_header_parse() {
        let header = PacketHeader::parse(&[0xFF, 0xFF, 0xFF, 0xFF, 0x02, 0x01, 0x02]);
        assert_eq!(header.address, 0xFFFF_FFFF);
        assert_eq!(header.kind, PacketType::Data);
        assert_eq!(header.combined_length, 258);
        assert_eq!(header.payload_len(), Some(256));
    }

    #[rstest]
    #[case(0, None)]
    #[case(2, None)]
    #[case(3, Some(1))]
    fn test_header_minimum_length(#[case] combined: u16, #[case] expected: Option<usize>) {
        let [hi, lo] = combined.to_be_bytes();
        let header = PacketHeader::parse(&[0, 0, 0, 0, 0x07, hi, lo]);
        assert_eq!(header.payload_len(), expected);
    }

    #[test]
    fn test_encode_gen_image_command() {
        // Reference bytes for the "capture image" command at the default address
        let packet = RawPacket::new(0xFFFF_FFFF, PacketType::Command, vec![0x01u8]);
        assert_eq!(
            packet.encode().as_ref(),
            &[0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x00, 0x03, 0x01, 0x00, 0x05]
        );
    }

    #[test]
    fn test_checksum_wraps() {
        let payload = vec![0xFFu8; 600];
        let packet = RawPacket::new(0, PacketType::Data, payload);
        assert!(packet.checksum_matches());

        let expected = (0x02u32 + 0x02 + 0x5A + 600 * 0xFF) as u16;
        assert_eq!(packet.checksum, expected);
    }

    #[test]
    fn test_tampered_checksum_detected() {
        let mut packet = RawPacket::new(0, PacketType::Ack, vec![0x00u8]);
        packet.checksum ^= 0x0100;
        assert!(!packet.checksum_matches());
    }
}
