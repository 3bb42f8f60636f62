use byteorder::{BigEndian, WriteBytesExt};

use crate::error::EncodeError;
use crate::packet::{
    Connect, LastWill, PacketId, PacketType, Publish, QoS, Subscribe, Unsubscribe,
    MAX_PAYLOAD_LEN, MAX_REMAINING_LENGTH, MAX_STRING_LEN, PROTOCOL_LEVEL, PROTOCOL_NAME,
};

/// Appends the variable-length "remaining length" encoding of `len` to `buf`.
pub fn encode_remaining_length(len: usize, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
    if len > MAX_REMAINING_LENGTH {
        return Err(EncodeError::RemainingLengthOutOfRange(len));
    }

    let mut value = len;
    loop {
        let mut byte = (value % 128) as u8;
        value /= 128;
        if value > 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
    Ok(())
}

/// Appends `s` as a 2-byte-length-prefixed UTF-8 string to `buf`.
pub fn encode_utf8_str(s: &str, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
    let bytes = s.as_bytes();
    if bytes.len() > MAX_STRING_LEN {
        return Err(EncodeError::StringTooLong(bytes.len()));
    }
    buf.write_u16::<BigEndian>(bytes.len() as u16).unwrap();
    buf.extend_from_slice(bytes);
    Ok(())
}

fn encode_binary(data: &[u8], buf: &mut Vec<u8>) -> Result<(), EncodeError> {
    if data.len() > MAX_STRING_LEN {
        return Err(EncodeError::StringTooLong(data.len()));
    }
    buf.write_u16::<BigEndian>(data.len() as u16).unwrap();
    buf.extend_from_slice(data);
    Ok(())
}

fn fixed_header(packet_type: PacketType, flags: u8, remaining: &[u8], buf: &mut Vec<u8>) {
    buf.push(((packet_type as u8) << 4) | flags);
    buf.extend_from_slice(remaining);
}

fn encode_with_header(
    packet_type: PacketType,
    flags: u8,
    body: Vec<u8>,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    let mut remaining_length = Vec::with_capacity(4);
    encode_remaining_length(body.len(), &mut remaining_length)?;
    fixed_header(packet_type, flags, &remaining_length, buf);
    buf.extend_from_slice(&body);
    Ok(())
}

/// Encodes a CONNECT packet.
pub fn encode_connect(connect: &Connect, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
    let mut body = Vec::new();
    encode_utf8_str(PROTOCOL_NAME, &mut body)?;
    body.push(PROTOCOL_LEVEL);

    let mut flags = 0u8;
    if connect.clean_session {
        flags |= 0b0000_0010;
    }
    if let Some(LastWill { qos, retain, .. }) = &connect.last_will {
        flags |= 0b0000_0100;
        if *qos == QoS::AtLeastOnce {
            flags |= 0b0000_1000;
        }
        if *retain {
            flags |= 0b0010_0000;
        }
    }
    if connect.password.is_some() {
        flags |= 0b0100_0000;
    }
    if connect.username.is_some() {
        flags |= 0b1000_0000;
    }
    body.push(flags);
    body.write_u16::<BigEndian>(connect.keep_alive).unwrap();

    encode_utf8_str(&connect.client_id, &mut body)?;

    if let Some(will) = &connect.last_will {
        encode_utf8_str(&will.topic, &mut body)?;
        encode_binary(&will.message, &mut body)?;
    }
    if let Some(username) = &connect.username {
        encode_utf8_str(username, &mut body)?;
    }
    if let Some(password) = &connect.password {
        encode_binary(password, &mut body)?;
    }

    encode_with_header(PacketType::Connect, 0, body, buf)
}

/// Encodes a PUBLISH packet.
pub fn encode_publish(publish: &Publish, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
    if publish.payload.len() > MAX_PAYLOAD_LEN {
        return Err(EncodeError::PayloadTooLarge(publish.payload.len()));
    }

    let mut flags = 0u8;
    if publish.dup {
        flags |= 0b1000;
    }
    if publish.qos == QoS::AtLeastOnce {
        flags |= 0b0010;
    }
    if publish.retain {
        flags |= 0b0001;
    }

    let mut body = Vec::new();
    encode_utf8_str(&publish.topic, &mut body)?;
    if publish.qos == QoS::AtLeastOnce {
        let packet_id = publish
            .packet_id
            .ok_or(EncodeError::InvalidTopic("QoS 1 publish requires a packet id"))?;
        body.write_u16::<BigEndian>(packet_id).unwrap();
    }
    body.extend_from_slice(&publish.payload);

    encode_with_header(PacketType::Publish, flags, body, buf)
}

/// Encodes a PUBACK packet.
pub fn encode_puback(packet_id: PacketId, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
    let mut body = Vec::with_capacity(2);
    body.write_u16::<BigEndian>(packet_id).unwrap();
    encode_with_header(PacketType::PublishAck, 0, body, buf)
}

/// Encodes a SUBSCRIBE packet.
pub fn encode_subscribe(subscribe: &Subscribe, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
    let mut body = Vec::new();
    body.write_u16::<BigEndian>(subscribe.packet_id).unwrap();
    for (topic, qos) in &subscribe.subscriptions {
        encode_utf8_str(topic, &mut body)?;
        body.push(*qos as u8);
    }
    encode_with_header(PacketType::Subscribe, 0b0010, body, buf)
}

/// Encodes an UNSUBSCRIBE packet.
pub fn encode_unsubscribe(unsubscribe: &Unsubscribe, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
    let mut body = Vec::new();
    body.write_u16::<BigEndian>(unsubscribe.packet_id).unwrap();
    for topic in &unsubscribe.topic_filters {
        encode_utf8_str(topic, &mut body)?;
    }
    encode_with_header(PacketType::Unsubscribe, 0b0010, body, buf)
}

/// Encodes a PINGREQ packet.
pub fn encode_ping_request(buf: &mut Vec<u8>) {
    buf.extend_from_slice(&[(PacketType::PingRequest as u8) << 4, 0x00]);
}

/// Encodes a DISCONNECT packet.
pub fn encode_disconnect(buf: &mut Vec<u8>) {
    buf.extend_from_slice(&[(PacketType::Disconnect as u8) << 4, 0x00]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_length_boundaries() {
        let mut buf = Vec::new();
        encode_remaining_length(0, &mut buf).unwrap();
        assert_eq!(buf, vec![0x00]);

        buf.clear();
        encode_remaining_length(127, &mut buf).unwrap();
        assert_eq!(buf, vec![0x7f]);

        buf.clear();
        encode_remaining_length(128, &mut buf).unwrap();
        assert_eq!(buf, vec![0x80, 0x01]);

        buf.clear();
        encode_remaining_length(16_384, &mut buf).unwrap();
        assert_eq!(buf, vec![0x80, 0x80, 0x01]);

        buf.clear();
        encode_remaining_length(268_435_455, &mut buf).unwrap();
        assert_eq!(buf, vec![0xff, 0xff, 0xff, 0x7f]);

        buf.clear();
        assert_eq!(
            encode_remaining_length(268_435_456, &mut buf),
            Err(EncodeError::RemainingLengthOutOfRange(268_435_456))
        );
    }

    #[test]
    fn connect_wire_bytes_match_qos0_example() {
        let connect = Connect {
            clean_session: true,
            keep_alive: 60,
            client_id: "cid".into(),
            last_will: None,
            username: None,
            password: None,
        };
        let mut buf = Vec::new();
        encode_connect(&connect, &mut buf).unwrap();

        assert_eq!(buf[0], 0x10);
        assert_eq!(&buf[2..8], b"\x00\x04MQTT");
        assert_eq!(buf[8], PROTOCOL_LEVEL);
        assert_eq!(buf[9], 0b0000_0010);
    }

    #[test]
    fn publish_qos0_has_no_packet_id() {
        let publish = Publish {
            dup: false,
            qos: QoS::AtMostOnce,
            retain: false,
            topic: "a/b".into(),
            packet_id: None,
            payload: b"hi".to_vec(),
        };
        let mut buf = Vec::new();
        encode_publish(&publish, &mut buf).unwrap();
        assert_eq!(buf[0], 0x30);
        assert_eq!(buf.len(), 2 + 2 + 3 + 2);
    }

    #[test]
    fn publish_qos1_without_packet_id_is_rejected() {
        let publish = Publish {
            dup: false,
            qos: QoS::AtLeastOnce,
            retain: false,
            topic: "a/b".into(),
            packet_id: None,
            payload: b"hi".to_vec(),
        };
        let mut buf = Vec::new();
        assert!(encode_publish(&publish, &mut buf).is_err());
    }
}
