//! Host-to-sensor commands and their acknowledgements.
//!
//! A command is a packet of type `0x01` whose payload starts with an
//! instruction code followed by big-endian parameters. The sensor answers
//! each command with an acknowledgement packet (type `0x07`) whose first
//! payload byte is a confirmation code and whose remaining bytes carry the
//! instruction's return values.
//!
//! # Instructions
//!
//! | Code | Instruction    | Parameters                       | Ack data          |
//! |------|----------------|----------------------------------|-------------------|
//! | 0x01 | `GenImg`       | -                                | -                 |
//! | 0x02 | `Img2Tz`       | buffer                           | -                 |
//! | 0x04 | `Search`       | buffer, start page, page count   | page id, score    |
//! | 0x05 | `RegModel`     | -                                | -                 |
//! | 0x06 | `Store`        | buffer, page id                  | -                 |
//! | 0x07 | `LoadChar`     | buffer, page id                  | -                 |
//! | 0x08 | `UpChar`       | buffer                           | data packets follow |
//! | 0x1D | `TemplateNum`  | -                                | template count    |
//!
//! # Example
//!
//! ```
//! use fingerlink_protocol::Command;
//! use fingerlink_core::{FeatureSlot, TemplateId};
//!
//! let store = Command::store(FeatureSlot::First, TemplateId::new(3).unwrap());
//! let bytes = store.encode(0xFFFF_FFFF);
//! assert_eq!(&bytes[9..13], &[0x06, 0x01, 0x00, 0x03]);
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use fingerlink_core::{FeatureSlot, TemplateId};
use std::fmt;

use crate::error::ProtocolError;
use crate::packet::{PacketType, RawPacket};

/// Instruction code carried in the first byte of a command payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// Capture a finger image into the image buffer.
    GenImg,
    /// Convert the image buffer into features in a character buffer.
    Img2Tz,
    /// Search the library with a character buffer.
    Search,
    /// Combine both character buffers into a model.
    RegModel,
    /// Store a character buffer into a library page.
    Store,
    /// Load a library page into a character buffer.
    LoadChar,
    /// Upload a character buffer to the host.
    UpChar,
    /// Read the number of stored templates.
    TemplateNum,
}

impl Instruction {
    pub fn code(&self) -> u8 {
        match self {
            Instruction::GenImg => 0x01,
            Instruction::Img2Tz => 0x02,
            Instruction::Search => 0x04,
            Instruction::RegModel => 0x05,
            Instruction::Store => 0x06,
            Instruction::LoadChar => 0x07,
            Instruction::UpChar => 0x08,
            Instruction::TemplateNum => 0x1D,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}(0x{:02X})", self.code())
    }
}

/// A command ready to be framed and sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    instruction: Instruction,
    params: Bytes,
}

impl Command {
    fn with_params(instruction: Instruction, params: impl Into<Bytes>) -> Self {
        Self {
            instruction,
            params: params.into(),
        }
    }

    fn bare(instruction: Instruction) -> Self {
        Self::with_params(instruction, Bytes::new())
    }

    fn slot_and_page(instruction: Instruction, slot: FeatureSlot, id: TemplateId) -> Self {
        let mut params = BytesMut::with_capacity(3);
        params.put_u8(slot.as_u8());
        params.put_u16(id.as_u16());
        Self::with_params(instruction, params.freeze())
    }

    pub fn capture_image() -> Self {
        Self::bare(Instruction::GenImg)
    }

    pub fn image_to_feature(slot: FeatureSlot) -> Self {
        Self::with_params(Instruction::Img2Tz, vec![slot.as_u8()])
    }

    /// Search pages `start..start + count` with the given buffer.
    pub fn search(slot: FeatureSlot, start: u16, count: u16) -> Self {
        let mut params = BytesMut::with_capacity(5);
        params.put_u8(slot.as_u8());
        params.put_u16(start);
        params.put_u16(count);
        Self::with_params(Instruction::Search, params.freeze())
    }

    pub fn build_model() -> Self {
        Self::bare(Instruction::RegModel)
    }

    pub fn store(slot: FeatureSlot, id: TemplateId) -> Self {
        Self::slot_and_page(Instruction::Store, slot, id)
    }

    pub fn load(slot: FeatureSlot, id: TemplateId) -> Self {
        Self::slot_and_page(Instruction::LoadChar, slot, id)
    }

    pub fn upload(slot: FeatureSlot) -> Self {
        Self::with_params(Instruction::UpChar, vec![slot.as_u8()])
    }

    pub fn template_count() -> Self {
        Self::bare(Instruction::TemplateNum)
    }

    pub fn instruction(&self) -> Instruction {
        self.instruction
    }

    pub fn params(&self) -> &[u8] {
        &self.params
    }

    /// Frame the command for the device at `address`.
    pub fn to_packet(&self, address: u32) -> RawPacket {
        let mut payload = BytesMut::with_capacity(1 + self.params.len());
        payload.put_u8(self.instruction.code());
        payload.put_slice(&self.params);
        RawPacket::new(address, PacketType::Command, payload.freeze())
    }

    /// Wire bytes of the framed command.
    pub fn encode(&self, address: u32) -> Bytes {
        self.to_packet(address).encode()
    }
}

/// Confirmation code returned in an acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfirmationCode {
    Ok,
    PacketReceiveError,
    NoFinger,
    ImageFail,
    ImageMessy,
    FeatureFail,
    NoMatch,
    NotFound,
    EnrollMismatch,
    BadLocation,
    DbReadFail,
    UploadFeatureFail,
    PacketResponseFail,
    UploadFail,
    DeleteFail,
    DbClearFail,
    InvalidImage,
    FlashError,
    InvalidRegister,
    Unknown(u8),
}

impl ConfirmationCode {
    pub fn as_u8(&self) -> u8 {
        match self {
            ConfirmationCode::Ok => 0x00,
            ConfirmationCode::PacketReceiveError => 0x01,
            ConfirmationCode::NoFinger => 0x02,
            ConfirmationCode::ImageFail => 0x03,
            ConfirmationCode::ImageMessy => 0x06,
            ConfirmationCode::FeatureFail => 0x07,
            ConfirmationCode::NoMatch => 0x08,
            ConfirmationCode::NotFound => 0x09,
            ConfirmationCode::EnrollMismatch => 0x0A,
            ConfirmationCode::BadLocation => 0x0B,
            ConfirmationCode::DbReadFail => 0x0C,
            ConfirmationCode::UploadFeatureFail => 0x0D,
            ConfirmationCode::PacketResponseFail => 0x0E,
            ConfirmationCode::UploadFail => 0x0F,
            ConfirmationCode::DeleteFail => 0x10,
            ConfirmationCode::DbClearFail => 0x11,
            ConfirmationCode::InvalidImage => 0x15,
            ConfirmationCode::FlashError => 0x18,
            ConfirmationCode::InvalidRegister => 0x1A,
            ConfirmationCode::Unknown(code) => *code,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ConfirmationCode::Ok)
    }
}

impl From<u8> for ConfirmationCode {
    fn from(value: u8) -> Self {
        match value {
            0x00 => ConfirmationCode::Ok,
            0x01 => ConfirmationCode::PacketReceiveError,
            0x02 => ConfirmationCode::NoFinger,
            0x03 => ConfirmationCode::ImageFail,
            0x06 => ConfirmationCode::ImageMessy,
            0x07 => ConfirmationCode::FeatureFail,
            0x08 => ConfirmationCode::NoMatch,
            0x09 => ConfirmationCode::NotFound,
            0x0A => ConfirmationCode::EnrollMismatch,
            0x0B => ConfirmationCode::BadLocation,
            0x0C => ConfirmationCode::DbReadFail,
            0x0D => ConfirmationCode::UploadFeatureFail,
            0x0E => ConfirmationCode::PacketResponseFail,
            0x0F => ConfirmationCode::UploadFail,
            0x10 => ConfirmationCode::DeleteFail,
            0x11 => ConfirmationCode::DbClearFail,
            0x15 => ConfirmationCode::InvalidImage,
            0x18 => ConfirmationCode::FlashError,
            0x1A => ConfirmationCode::InvalidRegister,
            other => ConfirmationCode::Unknown(other),
        }
    }
}

impl fmt::Display for ConfirmationCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:02X}", self.as_u8())
    }
}

/// Decoded acknowledgement packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub code: ConfirmationCode,
    /// Return values following the confirmation code.
    pub data: Bytes,
}

impl Ack {
    /// Interpret a received packet as an acknowledgement.
    ///
    /// # Errors
    /// Fails if the packet is not an ack or carries no confirmation code.
    pub fn from_packet(packet: RawPacket) -> Result<Self, ProtocolError> {
        if packet.kind != PacketType::Ack {
            return Err(ProtocolError::UnexpectedPacketType {
                expected: PacketType::Ack,
                actual: packet.kind,
            });
        }

        let Some(&first) = packet.payload.first() else {
            return Err(ProtocolError::EmptyAck);
        };

        Ok(Self {
            code: ConfirmationCode::from(first),
            data: packet.payload.slice(1..),
        })
    }

    /// Big-endian `u16` at `offset` within the return values.
    pub fn read_u16(&self, offset: usize) -> Result<u16, ProtocolError> {
        match self.data.get(offset..offset + 2) {
            Some(bytes) => Ok(u16::from_be_bytes([bytes[0], bytes[1]])),
            None => Err(ProtocolError::TruncatedAck {
                needed: offset + 2,
                actual: self.data.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const ADDR: u32 = 0xFFFF_FFFF;

    #[rstest]
    #[case(Command::capture_image(), &[0x01])]
    #[case(Command::image_to_feature(FeatureSlot::Second), &[0x02, 0x02])]
    #[case(Command::build_model(), &[0x05])]
    #[case(Command::upload(FeatureSlot::First), &[0x08, 0x01])]
    #[case(Command::template_count(), &[0x1D])]
    fn test_command_payloads(#[case] command: Command, #[case] payload: &[u8]) {
        let packet = command.to_packet(ADDR);
        assert_eq!(packet.kind, PacketType::Command);
        assert_eq!(&packet.payload[..], payload);
        assert!(packet.checksum_matches());
    }

    #[test]
    fn test_load_encodes_page_big_endian() {
        let id = TemplateId::new(0x0102).unwrap();
        let packet = Command::load(FeatureSlot::First, id).to_packet(ADDR);
        assert_eq!(&packet.payload[..], &[0x07, 0x01, 0x01, 0x02]);
    }

    #[test]
    fn test_search_parameters() {
        let packet = Command::search(FeatureSlot::First, 0, 300).to_packet(ADDR);
        assert_eq!(&packet.payload[..], &[0x04, 0x01, 0x00, 0x00, 0x01, 0x2C]);
    }

    #[test]
    fn test_encoded_upload_command() {
        assert_eq!(
            Command::upload(FeatureSlot::First).encode(ADDR).as_ref(),
            &[0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x00, 0x04, 0x08, 0x01, 0x00, 0x0E]
        );
    }

    #[rstest]
    #[case(0x00, ConfirmationCode::Ok)]
    #[case(0x02, ConfirmationCode::NoFinger)]
    #[case(0x0A, ConfirmationCode::EnrollMismatch)]
    #[case(0x18, ConfirmationCode::FlashError)]
    #[case(0x63, ConfirmationCode::Unknown(0x63))]
    fn test_confirmation_codes(#[case] byte: u8, #[case] expected: ConfirmationCode) {
        let code = ConfirmationCode::from(byte);
        assert_eq!(code, expected);
        assert_eq!(code.as_u8(), byte);
    }

    #[test]
    fn test_ack_decoding() {
        let packet = RawPacket::new(ADDR, PacketType::Ack, vec![0x00u8, 0x00, 0x05, 0x00, 0x64]);
        let ack = Ack::from_packet(packet).unwrap();
        assert!(ack.code.is_ok());
        assert_eq!(ack.read_u16(0).unwrap(), 5);
        assert_eq!(ack.read_u16(2).unwrap(), 100);
        assert_eq!(
            ack.read_u16(3),
            Err(ProtocolError::TruncatedAck {
                needed: 5,
                actual: 4
            })
        );
    }

    #[test]
    fn test_ack_rejects_data_packet() {
        let packet = RawPacket::new(ADDR, PacketType::Data, vec![0x00u8]);
        assert_eq!(
            Ack::from_packet(packet),
            Err(ProtocolError::UnexpectedPacketType {
                expected: PacketType::Ack,
                actual: PacketType::Data
            })
        );
    }

    #[test]
    fn test_empty_ack() {
        let packet = RawPacket {
            address: ADDR,
            kind: PacketType::Ack,
            payload: Bytes::new(),
            checksum: 0,
        };
        assert_eq!(Ack::from_packet(packet), Err(ProtocolError::EmptyAck));
    }
}
