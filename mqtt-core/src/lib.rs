//! Control packet codec for MQTT 3.1.1.
//!
//! Every function in this crate is a pure transform over byte buffers: there is
//! no socket, no timer, and no notion of a connection here. That lives in
//! `mqtt-sync-client`, which uses this crate to turn its state machine's
//! decisions into bytes and back.

#[macro_use]
extern crate log;

mod client_id;
mod decode;
mod encode;
mod error;
mod packet;
mod topic;

pub use client_id::generate_client_id;
pub use decode::{decode_packet, variable_length};
pub use encode::{
    encode_connect, encode_disconnect, encode_ping_request, encode_publish, encode_puback,
    encode_remaining_length, encode_subscribe, encode_unsubscribe, encode_utf8_str,
};
pub use error::{DecodeError, EncodeError};
pub use packet::{
    Connect, ConnectAck, ConnectReturnCode, FixedHeader, LastWill, Packet, PacketId, PacketType,
    Publish, PublishAck, QoS, Subscribe, SubscribeAck, SubscribeReturnCode, Unsubscribe,
    UnsubscribeAck, CLIENT_ID_MAX_LEN, CLIENT_ID_MIN_LEN, MAX_PAYLOAD_LEN, MAX_REMAINING_LENGTH,
    MAX_STRING_LEN, PROTOCOL_LEVEL, PROTOCOL_NAME,
};
pub use topic::{validate_publish_topic, validate_topic_filter, TopicError};

/// Whether a topic filter matches a concrete topic name, per the MQTT 3.1.1
/// wildcard rules: `+` matches exactly one level, `#` (only as the final
/// level) matches zero or more trailing levels.
pub fn topic_matches_filter(filter: &str, topic: &str) -> bool {
    topic::matches(filter, topic)
}
