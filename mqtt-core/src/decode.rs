use std::convert::TryFrom;
use std::str;

use nom::bytes::complete::tag;
use nom::combinator::{all_consuming, map, map_opt, map_res, verify};
use nom::multi::{length_data, many1};
use nom::number::complete::{be_u16, be_u8};
use nom::sequence::{pair, tuple};
use nom::IResult;

use crate::error::DecodeError;
use crate::packet::*;

/// Parses the variable-length "remaining length" field starting at `input`.
///
/// Returns `Ok(None)` when `input` does not yet hold a complete encoding (the
/// caller should wait for more bytes), `Ok(Some((value, bytes_consumed)))` on
/// success, and `Err` if a fifth continuation byte is seen.
pub fn variable_length(input: &[u8]) -> Result<Option<(usize, usize)>, DecodeError> {
    let mut value: usize = 0;
    let mut multiplier: usize = 1;

    for (i, &byte) in input.iter().enumerate().take(4) {
        value += usize::from(byte & 0x7F) * multiplier;
        if byte & 0x80 == 0 {
            return Ok(Some((value, i + 1)));
        }
        multiplier *= 128;
    }

    if input.len() >= 4 {
        Err(DecodeError::InvalidRemainingLength)
    } else {
        Ok(None)
    }
}

/// Attempts to decode one complete control packet from the front of `input`.
///
/// Returns `Ok(None)` if `input` does not yet contain a full packet (the
/// caller should read more bytes and retry), or `Ok(Some((packet,
/// bytes_consumed)))` on success. The caller is expected to drop
/// `bytes_consumed` bytes from its read buffer afterwards.
pub fn decode_packet(input: &[u8]) -> Result<Option<(Packet, usize)>, DecodeError> {
    if input.is_empty() {
        return Ok(None);
    }

    let type_nibble = (input[0] >> 4) & 0x0F;
    let flags = input[0] & 0x0F;
    let packet_type =
        PacketType::try_from(type_nibble).map_err(DecodeError::InvalidPacketType)?;

    let (remaining_length, length_bytes) = match variable_length(&input[1..])? {
        Some(v) => v,
        None => return Ok(None),
    };

    let header_len = 1 + length_bytes;
    let total_len = header_len + remaining_length;
    if input.len() < total_len {
        return Ok(None);
    }

    let body = &input[header_len..total_len];
    let packet = decode_body(packet_type, flags, body)?;

    Ok(Some((packet, total_len)))
}

fn decode_body(packet_type: PacketType, flags: u8, body: &[u8]) -> Result<Packet, DecodeError> {
    match packet_type {
        PacketType::Connect => run(connect, body).map(Packet::Connect),
        PacketType::ConnectAck => run(connect_ack, body).map(Packet::ConnectAck),
        PacketType::Publish => match (flags & 0b0000_0110) >> 1 {
            0 | 1 => run(|i| publish(flags, i), body).map(Packet::Publish),
            2 => Err(DecodeError::UnsupportedQos2),
            _ => Err(DecodeError::Malformed("PUBLISH flags carry the reserved QoS value 3")),
        },
        PacketType::PublishAck => run(publish_ack, body).map(Packet::PublishAck),
        PacketType::Subscribe => run(subscribe, body).map(Packet::Subscribe),
        PacketType::SubscribeAck => run(subscribe_ack, body).map(Packet::SubscribeAck),
        PacketType::Unsubscribe => run(unsubscribe, body).map(Packet::Unsubscribe),
        PacketType::UnsubscribeAck => run(unsubscribe_ack, body).map(Packet::UnsubscribeAck),
        PacketType::PingRequest => Ok(Packet::PingRequest),
        PacketType::PingResponse => Ok(Packet::PingResponse),
        PacketType::Disconnect => Ok(Packet::Disconnect),
    }
}

fn run<'a, T>(
    parser: impl FnOnce(&'a [u8]) -> IResult<&'a [u8], T>,
    input: &'a [u8],
) -> Result<T, DecodeError> {
    all_consuming(parser)(input)
        .map(|(_, value)| value)
        .map_err(|_| DecodeError::Malformed("packet body did not match its declared type"))
}

fn utf8_str(input: &[u8]) -> IResult<&[u8], String> {
    map_res(length_data(be_u16), |s: &[u8]| {
        str::from_utf8(s).map(String::from)
    })(input)
}

fn packet_id(input: &[u8]) -> IResult<&[u8], PacketId> {
    be_u16(input)
}

bitflags::bitflags! {
    struct ConnectFlags: u8 {
        const CLEAN_SESSION = 0b0000_0010;
        const LAST_WILL     = 0b0000_0100;
        const WILL_QOS_1    = 0b0000_1000;
        const WILL_RETAIN   = 0b0010_0000;
        const PASSWORD      = 0b0100_0000;
        const USERNAME      = 0b1000_0000;
    }
}

bitflags::bitflags! {
    struct ConnectAckFlags: u8 {
        const SESSION_PRESENT = 0b0000_0001;
    }
}

bitflags::bitflags! {
    struct PublishFlags: u8 {
        const RETAIN  = 0b0000_0001;
        const QOS_1   = 0b0000_0010;
        const QOS_2   = 0b0000_0100;
        const DUP     = 0b0000_1000;
    }
}

fn connect(input: &[u8]) -> IResult<&[u8], Connect> {
    let (input, (_, _, flags, keep_alive)) = tuple((
        tag(PROTOCOL_NAME.as_bytes()),
        verify(be_u8, |&level| level == PROTOCOL_LEVEL),
        map_opt(be_u8, ConnectFlags::from_bits),
        be_u16,
    ))(input)?;
    let (input, client_id) = utf8_str(input)?;

    let (input, last_will) = if flags.contains(ConnectFlags::LAST_WILL) {
        let (input, (topic, message)) = pair(utf8_str, length_data(be_u16))(input)?;
        let qos = if flags.contains(ConnectFlags::WILL_QOS_1) {
            QoS::AtLeastOnce
        } else {
            QoS::AtMostOnce
        };
        (
            input,
            Some(LastWill {
                topic,
                message: message.to_vec(),
                qos,
                retain: flags.contains(ConnectFlags::WILL_RETAIN),
            }),
        )
    } else {
        (input, None)
    };

    let (input, username) = if flags.contains(ConnectFlags::USERNAME) {
        map(utf8_str, Some)(input)?
    } else {
        (input, None)
    };
    let (input, password) = if flags.contains(ConnectFlags::PASSWORD) {
        map(length_data(be_u16), |b: &[u8]| Some(b.to_vec()))(input)?
    } else {
        (input, None)
    };

    Ok((
        input,
        Connect {
            clean_session: flags.contains(ConnectFlags::CLEAN_SESSION),
            keep_alive,
            client_id,
            last_will,
            username,
            password,
        },
    ))
}

fn connect_ack(input: &[u8]) -> IResult<&[u8], ConnectAck> {
    map(
        tuple((
            map_opt(be_u8, ConnectAckFlags::from_bits),
            map_opt(be_u8, ConnectReturnCode::from_u8),
        )),
        |(flags, return_code)| ConnectAck {
            session_present: flags.contains(ConnectAckFlags::SESSION_PRESENT),
            return_code,
        },
    )(input)
}

fn publish(flags: u8, input: &[u8]) -> IResult<&[u8], Publish> {
    let flags = PublishFlags::from_bits_truncate(flags);
    let dup = flags.contains(PublishFlags::DUP);
    let retain = flags.contains(PublishFlags::RETAIN);
    let qos = if flags.contains(PublishFlags::QOS_1) {
        QoS::AtLeastOnce
    } else {
        QoS::AtMostOnce
    };

    let (input, topic) = utf8_str(input)?;
    let (input, id) = if qos == QoS::AtLeastOnce {
        map(packet_id, Some)(input)?
    } else {
        (input, None)
    };

    Ok((
        &[][..],
        Publish {
            dup,
            qos,
            retain,
            topic,
            packet_id: id,
            payload: input.to_vec(),
        },
    ))
}

fn publish_ack(input: &[u8]) -> IResult<&[u8], PublishAck> {
    map(packet_id, |packet_id| PublishAck { packet_id })(input)
}

fn subscription(input: &[u8]) -> IResult<&[u8], (String, QoS)> {
    tuple((utf8_str, map_opt(be_u8, |b| QoS::try_from(b).ok())))(input)
}

fn subscribe(input: &[u8]) -> IResult<&[u8], Subscribe> {
    map(
        tuple((packet_id, many1(subscription))),
        |(packet_id, subscriptions)| Subscribe {
            packet_id,
            subscriptions,
        },
    )(input)
}

fn subscribe_ack(input: &[u8]) -> IResult<&[u8], SubscribeAck> {
    map(
        tuple((packet_id, many1(map_opt(be_u8, SubscribeReturnCode::from_u8)))),
        |(packet_id, return_codes)| SubscribeAck {
            packet_id,
            return_codes,
        },
    )(input)
}

fn unsubscribe(input: &[u8]) -> IResult<&[u8], Unsubscribe> {
    map(
        tuple((packet_id, many1(utf8_str))),
        |(packet_id, topic_filters)| Unsubscribe {
            packet_id,
            topic_filters,
        },
    )(input)
}

fn unsubscribe_ack(input: &[u8]) -> IResult<&[u8], UnsubscribeAck> {
    map(packet_id, |packet_id| UnsubscribeAck { packet_id })(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_length_boundaries() {
        assert_eq!(variable_length(b"\x00"), Ok(Some((0, 1))));
        assert_eq!(variable_length(b"\x7f"), Ok(Some((127, 1))));
        assert_eq!(variable_length(b"\x80\x01"), Ok(Some((128, 2))));
        assert_eq!(variable_length(b"\xff\x7f"), Ok(Some((16383, 2))));
        assert_eq!(variable_length(b"\x80\x80\x01"), Ok(Some((16384, 3))));
        assert_eq!(variable_length(b"\xff\xff\xff\x7f"), Ok(Some((268_435_455, 4))));
        assert_eq!(variable_length(b"\x80\x80\x80"), Ok(None));
        assert_eq!(
            variable_length(b"\xff\xff\xff\xff"),
            Err(DecodeError::InvalidRemainingLength)
        );
    }

    #[test]
    fn incomplete_packet_returns_none() {
        assert_eq!(decode_packet(b"\x20"), Ok(None));
        assert_eq!(decode_packet(b"\x20\x02\x01"), Ok(None));
    }

    #[test]
    fn decodes_connack() {
        let (packet, consumed) = decode_packet(b"\x20\x02\x01\x04").unwrap().unwrap();
        assert_eq!(consumed, 4);
        assert_eq!(
            packet,
            Packet::ConnectAck(ConnectAck {
                session_present: true,
                return_code: ConnectReturnCode::BadUsernameOrPassword,
            })
        );
    }

    #[test]
    fn decodes_publish_qos0() {
        let mut bytes = vec![0x30, 0x0b];
        bytes.extend_from_slice(b"\x00\x05topic");
        bytes.extend_from_slice(b"hello");
        let (packet, consumed) = decode_packet(&bytes).unwrap().unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(
            packet,
            Packet::Publish(Publish {
                dup: false,
                qos: QoS::AtMostOnce,
                retain: false,
                topic: "topic".into(),
                packet_id: None,
                payload: b"hello".to_vec(),
            })
        );
    }

    #[test]
    fn decodes_publish_qos1_with_packet_id() {
        let mut bytes = vec![0x32, 0x0d];
        bytes.extend_from_slice(b"\x00\x05topic\x12\x34");
        bytes.extend_from_slice(b"hello");
        let (packet, _) = decode_packet(&bytes).unwrap().unwrap();
        assert_eq!(
            packet,
            Packet::Publish(Publish {
                dup: false,
                qos: QoS::AtLeastOnce,
                retain: false,
                topic: "topic".into(),
                packet_id: Some(0x1234),
                payload: b"hello".to_vec(),
            })
        );
    }

    #[test]
    fn rejects_qos2_publish() {
        let mut bytes = vec![0x34, 0x03];
        bytes.extend_from_slice(b"\x00\x01a");
        assert_eq!(decode_packet(&bytes), Err(DecodeError::UnsupportedQos2));
    }

    #[test]
    fn rejects_reserved_qos3_publish() {
        let mut bytes = vec![0x36, 0x03];
        bytes.extend_from_slice(b"\x00\x01a");
        assert!(matches!(
            decode_packet(&bytes),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_unknown_packet_type() {
        assert_eq!(
            decode_packet(b"\x00\x00"),
            Err(DecodeError::InvalidPacketType(0))
        );
    }

    #[test]
    fn decodes_ping_and_disconnect() {
        assert_eq!(
            decode_packet(b"\xc0\x00"),
            Ok(Some((Packet::PingRequest, 2)))
        );
        assert_eq!(
            decode_packet(b"\xe0\x00"),
            Ok(Some((Packet::Disconnect, 2)))
        );
    }
}
