//! MQTT 3.1.1 control packet types.
//!
//! Structures here are owned (`String`/`Vec<u8>`), not zero-copy slices into
//! the read buffer: the client reads one packet at a time into a scratch
//! buffer that is immediately reused, so there is no buffer to borrow from
//! across a receive.

use std::convert::TryFrom;
use std::fmt;

pub const PROTOCOL_NAME: &str = "MQTT";
pub const PROTOCOL_LEVEL: u8 = 0x04;

/// Maximum value the 4-byte variable-length "remaining length" field can hold.
pub const MAX_REMAINING_LENGTH: usize = 268_435_455;
/// Maximum length of a 2-byte length-prefixed UTF-8 string field.
pub const MAX_STRING_LEN: usize = 65_535;
/// Upper bound on a PUBLISH payload so total remaining length stays encodable.
pub const MAX_PAYLOAD_LEN: usize = MAX_REMAINING_LENGTH;

pub const CLIENT_ID_MIN_LEN: usize = 1;
pub const CLIENT_ID_MAX_LEN: usize = 23;

/// Packet identifier used to correlate a request with its acknowledgment.
pub type PacketId = u16;

/// MQTT Control Packet type, the top nibble of the fixed header's first byte.
#[repr(u8)]
#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash)]
pub enum PacketType {
    Connect = 1,
    ConnectAck = 2,
    Publish = 3,
    PublishAck = 4,
    Subscribe = 8,
    SubscribeAck = 9,
    Unsubscribe = 10,
    UnsubscribeAck = 11,
    PingRequest = 12,
    PingResponse = 13,
    Disconnect = 14,
}

impl TryFrom<u8> for PacketType {
    type Error = u8;

    fn try_from(nibble: u8) -> Result<Self, u8> {
        match nibble {
            1 => Ok(PacketType::Connect),
            2 => Ok(PacketType::ConnectAck),
            3 => Ok(PacketType::Publish),
            4 => Ok(PacketType::PublishAck),
            8 => Ok(PacketType::Subscribe),
            9 => Ok(PacketType::SubscribeAck),
            10 => Ok(PacketType::Unsubscribe),
            11 => Ok(PacketType::UnsubscribeAck),
            12 => Ok(PacketType::PingRequest),
            13 => Ok(PacketType::PingResponse),
            14 => Ok(PacketType::Disconnect),
            other => Err(other),
        }
    }
}

/// Fixed header common to every MQTT control packet.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct FixedHeader {
    pub packet_type: PacketType,
    pub flags: u8,
    pub remaining_length: usize,
}

/// Quality of service levels. QoS 2 (`ExactlyOnce`) is intentionally absent:
/// this client only implements 0 and 1, per spec.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QoS {
    AtMostOnce = 0,
    AtLeastOnce = 1,
}

impl TryFrom<u8> for QoS {
    type Error = u8;

    fn try_from(bits: u8) -> Result<Self, u8> {
        match bits {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            other => Err(other),
        }
    }
}

impl Default for QoS {
    fn default() -> Self {
        QoS::AtMostOnce
    }
}

/// Connect Return Code carried in byte 3 of CONNACK.
#[repr(u8)]
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum ConnectReturnCode {
    Accepted = 0,
    UnacceptableProtocolVersion = 1,
    IdentifierRejected = 2,
    ServerUnavailable = 3,
    BadUsernameOrPassword = 4,
    NotAuthorized = 5,
}

impl ConnectReturnCode {
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(ConnectReturnCode::Accepted),
            1 => Some(ConnectReturnCode::UnacceptableProtocolVersion),
            2 => Some(ConnectReturnCode::IdentifierRejected),
            3 => Some(ConnectReturnCode::ServerUnavailable),
            4 => Some(ConnectReturnCode::BadUsernameOrPassword),
            5 => Some(ConnectReturnCode::NotAuthorized),
            _ => None,
        }
    }

    /// `true` for the two refusal codes that must never be retried
    /// (bad credentials, not authorized).
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            ConnectReturnCode::BadUsernameOrPassword | ConnectReturnCode::NotAuthorized
        )
    }
}

impl fmt::Display for ConnectReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ConnectReturnCode::Accepted => "Connection Accepted",
            ConnectReturnCode::UnacceptableProtocolVersion => {
                "Connection Refused, unacceptable protocol version"
            }
            ConnectReturnCode::IdentifierRejected => "Connection Refused, identifier rejected",
            ConnectReturnCode::ServerUnavailable => "Connection Refused, Server unavailable",
            ConnectReturnCode::BadUsernameOrPassword => {
                "Connection Refused, bad user name or password"
            }
            ConnectReturnCode::NotAuthorized => "Connection Refused, not authorized",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for ConnectReturnCode {}

/// The message the broker publishes on the client's behalf on ungraceful disconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastWill {
    pub topic: String,
    pub message: Vec<u8>,
    pub qos: QoS,
    pub retain: bool,
}

/// Client request to connect to the broker.
#[derive(Debug, Clone, PartialEq)]
pub struct Connect {
    pub clean_session: bool,
    pub keep_alive: u16,
    pub client_id: String,
    pub last_will: Option<LastWill>,
    pub username: Option<String>,
    pub password: Option<Vec<u8>>,
}

/// Connect acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectAck {
    pub session_present: bool,
    pub return_code: ConnectReturnCode,
}

/// Application message, inbound or outbound.
#[derive(Debug, Clone, PartialEq)]
pub struct Publish {
    pub dup: bool,
    pub qos: QoS,
    pub retain: bool,
    pub topic: String,
    pub packet_id: Option<PacketId>,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishAck {
    pub packet_id: PacketId,
}

/// A single subscribe request.
#[derive(Debug, Clone, PartialEq)]
pub struct Subscribe {
    pub packet_id: PacketId,
    pub subscriptions: Vec<(String, QoS)>,
}

/// Per-topic outcome of a SUBSCRIBE, `0x80` (`Failure`) on refusal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeReturnCode {
    Success(QoS),
    Failure,
}

impl SubscribeReturnCode {
    pub const FAILURE_BYTE: u8 = 0x80;

    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(SubscribeReturnCode::Success(QoS::AtMostOnce)),
            0x01 => Some(SubscribeReturnCode::Success(QoS::AtLeastOnce)),
            0x02 => Some(SubscribeReturnCode::Success(QoS::AtLeastOnce)),
            Self::FAILURE_BYTE => Some(SubscribeReturnCode::Failure),
            _ => None,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, SubscribeReturnCode::Success(_))
    }
}

impl From<SubscribeReturnCode> for u8 {
    fn from(code: SubscribeReturnCode) -> u8 {
        match code {
            SubscribeReturnCode::Success(qos) => qos as u8,
            SubscribeReturnCode::Failure => SubscribeReturnCode::FAILURE_BYTE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeAck {
    pub packet_id: PacketId,
    pub return_codes: Vec<SubscribeReturnCode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unsubscribe {
    pub packet_id: PacketId,
    pub topic_filters: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsubscribeAck {
    pub packet_id: PacketId,
}

/// A fully decoded control packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Connect(Connect),
    ConnectAck(ConnectAck),
    Publish(Publish),
    PublishAck(PublishAck),
    Subscribe(Subscribe),
    SubscribeAck(SubscribeAck),
    Unsubscribe(Unsubscribe),
    UnsubscribeAck(UnsubscribeAck),
    PingRequest,
    PingResponse,
    Disconnect,
}

impl Packet {
    pub fn packet_type(&self) -> PacketType {
        match self {
            Packet::Connect(_) => PacketType::Connect,
            Packet::ConnectAck(_) => PacketType::ConnectAck,
            Packet::Publish(_) => PacketType::Publish,
            Packet::PublishAck(_) => PacketType::PublishAck,
            Packet::Subscribe(_) => PacketType::Subscribe,
            Packet::SubscribeAck(_) => PacketType::SubscribeAck,
            Packet::Unsubscribe(_) => PacketType::Unsubscribe,
            Packet::UnsubscribeAck(_) => PacketType::UnsubscribeAck,
            Packet::PingRequest => PacketType::PingRequest,
            Packet::PingResponse => PacketType::PingResponse,
            Packet::Disconnect => PacketType::Disconnect,
        }
    }
}
