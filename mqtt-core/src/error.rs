use std::fmt;

/// Failure decoding a control packet from a byte buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The buffer does not yet hold a complete packet.
    Incomplete,
    /// The remaining-length field used a fifth continuation byte.
    InvalidRemainingLength,
    /// A length-prefixed string was not valid UTF-8.
    InvalidUtf8,
    /// The fixed header carried an unrecognized packet type nibble.
    InvalidPacketType(u8),
    /// A QoS 2 PUBLISH was received; this client only supports QoS 0/1.
    UnsupportedQos2,
    /// The packet's bytes were structurally inconsistent with its declared type.
    Malformed(&'static str),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Incomplete => write!(f, "incomplete packet"),
            DecodeError::InvalidRemainingLength => write!(f, "invalid remaining length field"),
            DecodeError::InvalidUtf8 => write!(f, "string field is not valid UTF-8"),
            DecodeError::InvalidPacketType(t) => write!(f, "unrecognized packet type {:#x}", t),
            DecodeError::UnsupportedQos2 => write!(f, "QoS 2 is not supported"),
            DecodeError::Malformed(why) => write!(f, "malformed packet: {}", why),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Failure encoding a control packet into a byte buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// A remaining-length value exceeds the 4-byte variable-length encoding.
    RemainingLengthOutOfRange(usize),
    /// A UTF-8 string exceeds the 2-byte length prefix's range.
    StringTooLong(usize),
    /// The publish payload exceeds what the remaining-length field can carry.
    PayloadTooLarge(usize),
    /// The topic failed `+`/`#`/length validation.
    InvalidTopic(&'static str),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::RemainingLengthOutOfRange(v) => {
                write!(f, "remaining length {} exceeds 268435455", v)
            }
            EncodeError::StringTooLong(len) => {
                write!(f, "string of {} bytes exceeds the 65535-byte limit", len)
            }
            EncodeError::PayloadTooLarge(len) => {
                write!(f, "payload of {} bytes is too large to encode", len)
            }
            EncodeError::InvalidTopic(why) => write!(f, "invalid topic: {}", why),
        }
    }
}

impl std::error::Error for EncodeError {}
