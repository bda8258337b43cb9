use thiserror::Error;

use crate::packet::PacketType;

/// Errors raised by a [`ByteStream`](crate::ByteStream) implementation.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The other side of the stream has gone away.
    #[error("Stream closed")]
    Closed,

    /// Low-level I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while interpreting a received packet.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Unexpected packet type: expected {expected:?}, got {actual:?}")]
    UnexpectedPacketType {
        expected: PacketType,
        actual: PacketType,
    },

    #[error("Acknowledgement without confirmation code")]
    EmptyAck,

    #[error("Acknowledgement too short: need {needed} bytes, got {actual}")]
    TruncatedAck { needed: usize, actual: usize },
}
