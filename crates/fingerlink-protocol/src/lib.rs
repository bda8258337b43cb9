//! Wire protocol of the optical fingerprint sensor.
//!
//! Every exchange with the sensor, commands and bulk template uploads alike,
//! travels as `EF 01`-prefixed packets over a serial byte stream. This crate
//! owns the byte-level side of that link:
//!
//! - [`packet`] - packet envelope, header decoding and checksum
//! - [`stream`] - the [`ByteStream`] abstraction and its channel-backed implementation
//! - [`reader`] - [`SerialFrameReader`], header resynchronization and length-checked reads
//! - [`assembler`] - [`TemplateAssembler`], reconstruction of a 512-byte template
//! - [`command`] - host-to-sensor command packets and acknowledgement decoding

pub mod assembler;
pub mod command;
pub mod error;
pub mod packet;
pub mod reader;
pub mod stream;

pub use assembler::{Assembly, StopReason, TemplateAssembler};
pub use command::{Ack, Command, ConfirmationCode, Instruction};
pub use error::{ProtocolError, StreamError};
pub use packet::{PacketHeader, PacketType, RawPacket};
pub use reader::{ReadOutcome, ReaderStats, SerialFrameReader};
pub use stream::{ByteStream, ChannelStream, ShortRead, StreamEndpoint, StreamFeeder};
pub use tokio::time::Instant;
