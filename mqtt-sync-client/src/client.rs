//! The connection state machine and the client's public API.
//!
//! `Client` is single-threaded and cooperative: nothing here spawns a
//! thread. Keep-alive is driven by comparing wall-clock time against the
//! timestamp of the last byte written, checked inside [`Client::poll`]
//! rather than by a background timer.

use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};
use rand::Rng;

use mqtt_core::{
    decode_packet, encode_connect, encode_disconnect, encode_ping_request, encode_puback,
    encode_publish, encode_subscribe, encode_unsubscribe, validate_publish_topic,
    validate_topic_filter, Connect, ConnectReturnCode, LastWill, Packet, PacketId, PacketType,
    Publish, QoS, Subscribe, SubscribeReturnCode, Unsubscribe,
};

use crate::callbacks::{CallbackTable, MessageCallback};
use crate::config::ClientConfig;
use crate::error::{Error, ErrorKind};
use crate::session::Session;
use crate::socket::{read_exact_until, write_all, Socket, TcpSocket};

const MAX_BACKOFF_SECS: f64 = 32.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

pub type ConnectCallback<U> = fn(&mut U, bool);
pub type DisconnectCallback<U> = fn(&mut U);
pub type PublishCallback<U> = fn(&mut U, PacketId);
pub type SubscribeCallback<U> = fn(&mut U, &str, QoS);
pub type UnsubscribeCallback<U> = fn(&mut U, &str);

/// A blocking MQTT 3.1.1 client.
///
/// `Client` deliberately does not implement `Send` or `Sync`: it owns a
/// single socket and a cooperative state machine meant to be driven from
/// one thread by repeated calls to [`Client::poll`].
pub struct Client<U = ()> {
    config: ClientConfig,
    connector: Box<dyn FnMut(Option<&str>, Option<u16>) -> Result<Box<dyn Socket>, Error>>,
    socket: Option<Box<dyn Socket>>,
    state: State,
    session: Session,
    callbacks: CallbackTable<U>,
    on_connect: Option<ConnectCallback<U>>,
    on_disconnect: Option<DisconnectCallback<U>>,
    on_publish: Option<PublishCallback<U>>,
    on_subscribe: Option<SubscribeCallback<U>>,
    on_unsubscribe: Option<UnsubscribeCallback<U>>,
    on_message: Option<MessageCallback<U>>,
    user_data: U,
}

impl<U> Client<U> {
    /// Builds a client that connects over plain or TLS-wrapped TCP, per
    /// `config.is_ssl`. TLS itself is left to the caller: use
    /// [`Client::with_connector`] to supply a connector that wraps the
    /// stream before handing it back.
    pub fn new(config: ClientConfig, user_data: U) -> Self {
        let connector = Self::tcp_connector(&config);
        Self::with_connector(config, connector, user_data)
    }

    /// Builds a client with a caller-supplied socket connector, used in
    /// tests to substitute an in-memory fake for a real TCP socket.
    pub fn with_connector(
        config: ClientConfig,
        connector: Box<dyn FnMut(Option<&str>, Option<u16>) -> Result<Box<dyn Socket>, Error>>,
        user_data: U,
    ) -> Self {
        Client {
            config,
            connector,
            socket: None,
            state: State::Disconnected,
            session: Session::new(),
            callbacks: CallbackTable::new(),
            on_connect: None,
            on_disconnect: None,
            on_publish: None,
            on_subscribe: None,
            on_unsubscribe: None,
            on_message: None,
            user_data,
        }
    }

    fn tcp_connector(
        config: &ClientConfig,
    ) -> Box<dyn FnMut(Option<&str>, Option<u16>) -> Result<Box<dyn Socket>, Error>> {
        let default_host = config.broker.clone();
        let default_port = config.port;
        let timeout = config.socket_timeout;
        Box::new(move |host, port| {
            let host = host.unwrap_or(&default_host);
            let port = port.unwrap_or(default_port);
            let mut socket = TcpSocket::connect(host, port)?;
            socket.set_timeout(Some(timeout))?;
            Ok(Box::new(socket) as Box<dyn Socket>)
        })
    }

    pub fn is_connected(&self) -> bool {
        self.state == State::Connected
    }

    pub fn user_data(&mut self) -> &mut U {
        &mut self.user_data
    }

    pub fn on_connect(&mut self, callback: ConnectCallback<U>) {
        self.on_connect = Some(callback);
    }

    pub fn on_disconnect(&mut self, callback: DisconnectCallback<U>) {
        self.on_disconnect = Some(callback);
    }

    pub fn on_publish(&mut self, callback: PublishCallback<U>) {
        self.on_publish = Some(callback);
    }

    pub fn on_subscribe(&mut self, callback: SubscribeCallback<U>) {
        self.on_subscribe = Some(callback);
    }

    pub fn on_unsubscribe(&mut self, callback: UnsubscribeCallback<U>) {
        self.on_unsubscribe = Some(callback);
    }

    pub fn on_message(&mut self, callback: MessageCallback<U>) {
        self.on_message = Some(callback);
    }

    /// Registers `callback` for every PUBLISH whose topic matches `pattern`.
    /// Must be called before `connect` re-establishes subscriptions to take
    /// effect on the next message.
    pub fn add_topic_callback(
        &mut self,
        pattern: &str,
        callback: MessageCallback<U>,
    ) -> Result<(), Error> {
        validate_topic_filter(pattern).map_err(|e| Error::state(e.to_string()))?;
        self.callbacks.insert(pattern, callback);
        Ok(())
    }

    pub fn remove_topic_callback(&mut self, pattern: &str) {
        self.callbacks.remove(pattern);
    }

    /// Sets the last-will message sent with the next CONNECT. Must be called
    /// before `connect`.
    pub fn will_set(
        &mut self,
        topic: &str,
        message: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), Error> {
        if self.state != State::Disconnected {
            return Err(Error::state("will_set must be called before connect"));
        }
        validate_publish_topic(topic).map_err(|e| Error::state(e.to_string()))?;
        self.session.last_will = Some(LastWill {
            topic: topic.to_string(),
            message: message.to_vec(),
            qos,
            retain,
        });
        Ok(())
    }

    /// Connects, retrying up to `config.connect_retries` times with
    /// exponential back-off on refusals from the remote side. Transport
    /// acquisition failures (the broker host is unreachable, DNS fails) are
    /// retried immediately and do not advance the back-off. Returns whether
    /// the broker reported a pre-existing session.
    ///
    /// `host`, `port`, `keep_alive` and `session_id` override the matching
    /// `ClientConfig` default for this connection attempt only; `None` keeps
    /// the value the client was built with.
    pub fn connect(
        &mut self,
        clean_session: bool,
        host: Option<&str>,
        port: Option<u16>,
        keep_alive: Option<u16>,
        session_id: Option<&str>,
    ) -> Result<bool, Error> {
        self.state = State::Connecting;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match self.try_connect_once(clean_session, host, port, keep_alive, session_id) {
                Ok(session_present) => {
                    self.state = State::Connected;
                    self.session.last_sent = Some(Instant::now());
                    if let Some(cb) = self.on_connect {
                        cb(&mut self.user_data, session_present);
                    }
                    return Ok(session_present);
                }
                Err(err) => {
                    if let Some(code) = err.connect_return_code() {
                        if code.is_fatal() {
                            self.state = State::Disconnected;
                            return Err(err);
                        }
                    }
                    if attempt >= self.config.connect_retries {
                        self.state = State::Disconnected;
                        return Err(Error::new(
                            err.kind().clone(),
                            format!("Repeated connect failures: {}", err),
                        ));
                    }
                    if err.connect_return_code().is_some() {
                        let delay = backoff_delay(attempt);
                        debug!("connect attempt {} refused, backing off {:.2}s", attempt, delay);
                        thread::sleep(Duration::from_secs_f64(delay));
                    } else {
                        debug!("connect attempt {} failed to acquire a transport: {}", attempt, err);
                    }
                }
            }
        }
    }

    fn try_connect_once(
        &mut self,
        clean_session: bool,
        host: Option<&str>,
        port: Option<u16>,
        keep_alive: Option<u16>,
        session_id: Option<&str>,
    ) -> Result<bool, Error> {
        let mut socket = (self.connector)(host, port)?;

        let connect = Connect {
            clean_session,
            keep_alive: keep_alive.unwrap_or(self.config.keep_alive),
            client_id: session_id
                .map(String::from)
                .unwrap_or_else(|| self.config.client_id.clone()),
            last_will: self.session.last_will.clone(),
            username: self.config.username.clone(),
            password: self.config.password.clone(),
        };
        let mut buf = Vec::new();
        encode_connect(&connect, &mut buf)?;
        write_all(socket.as_mut(), &buf)?;

        let deadline = Instant::now() + self.config.recv_timeout;
        let packet = read_packet(socket.as_mut(), deadline)?;
        match packet {
            Packet::ConnectAck(ack) if ack.return_code == ConnectReturnCode::Accepted => {
                self.session.reset_for_new_connection();
                self.socket = Some(socket);
                Ok(ack.session_present)
            }
            Packet::ConnectAck(ack) => Err(Error::connect_refused(ack.return_code)),
            other => Err(Error::protocol(format!(
                "unexpected packet while connecting: {:?}",
                other.packet_type()
            ))),
        }
    }

    /// Sends DISCONNECT and closes the socket. A no-op from the client's
    /// point of view if the broker never acknowledges: MQTT 3.1.1 has no
    /// DISCONNECT acknowledgment.
    pub fn disconnect(&mut self) -> Result<(), Error> {
        if self.state != State::Connected {
            return Err(Error::state("disconnect called while not connected"));
        }
        self.state = State::Disconnecting;

        if let Some(mut socket) = self.socket.take() {
            let mut buf = Vec::new();
            encode_disconnect(&mut buf);
            let _ = write_all(socket.as_mut(), &buf);
            let _ = socket.close();
        }
        self.session.reset_for_new_connection();
        self.state = State::Disconnected;

        if let Some(cb) = self.on_disconnect {
            cb(&mut self.user_data);
        }
        Ok(())
    }

    /// Re-establishes the connection after it was lost or deliberately
    /// closed. When `resubscribe` is set, every topic that was subscribed
    /// before the reconnect is re-subscribed at QoS 0, regardless of the
    /// QoS it originally held: the client keeps no record of per-topic QoS
    /// once a subscription succeeds.
    pub fn reconnect(&mut self, resubscribe: bool) -> Result<bool, Error> {
        let previously_subscribed = self.session.subscribed_topics.clone();
        if self.state == State::Connected {
            self.disconnect()?;
        }
        let session_present = self.connect(true, None, None, None, None)?;
        if resubscribe && !previously_subscribed.is_empty() {
            let subscriptions: Vec<(String, QoS)> = previously_subscribed
                .into_iter()
                .map(|topic| (topic, QoS::AtMostOnce))
                .collect();
            self.subscribe(subscriptions)?;
        }
        Ok(session_present)
    }

    pub fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), Error> {
        if self.state != State::Connected {
            return Err(Error::state("publish called while not connected"));
        }
        validate_publish_topic(topic).map_err(|e| Error::state(e.to_string()))?;

        let packet_id = if qos == QoS::AtLeastOnce {
            Some(self.session.allocate_packet_id())
        } else {
            None
        };
        let publish = Publish {
            dup: false,
            qos,
            retain,
            topic: topic.to_string(),
            packet_id,
            payload: payload.to_vec(),
        };
        let mut buf = Vec::new();
        encode_publish(&publish, &mut buf)?;
        self.write_and_track(&buf)?;

        if let Some(expected) = packet_id {
            self.await_ack(|packet| matches!(packet, Packet::PublishAck(ack) if ack.packet_id == expected))?;
            if let Some(cb) = self.on_publish {
                cb(&mut self.user_data, expected);
            }
        }
        Ok(())
    }

    pub fn subscribe<S>(&mut self, subscriptions: S) -> Result<(), Error>
    where
        S: Into<Vec<(String, QoS)>>,
    {
        if self.state != State::Connected {
            return Err(Error::state("subscribe called while not connected"));
        }
        let subscriptions = subscriptions.into();
        if subscriptions.is_empty() {
            return Err(Error::state("subscribe requires at least one topic filter"));
        }
        for (topic, _) in &subscriptions {
            validate_topic_filter(topic).map_err(|e| Error::state(e.to_string()))?;
        }

        let packet_id = self.session.allocate_packet_id();
        let subscribe = Subscribe {
            packet_id,
            subscriptions: subscriptions.clone(),
        };
        let mut buf = Vec::new();
        encode_subscribe(&subscribe, &mut buf)?;
        self.write_and_track(&buf)?;

        let (ack, _observed) = self.await_ack(
            |packet| matches!(packet, Packet::SubscribeAck(ack) if ack.packet_id == packet_id),
        )?;
        if let Packet::SubscribeAck(ack) = ack {
            for ((topic, _requested_qos), code) in subscriptions.iter().zip(ack.return_codes.iter()) {
                match code {
                    SubscribeReturnCode::Success(granted_qos) => {
                        self.session.remember_subscribed(topic);
                        if let Some(cb) = self.on_subscribe {
                            cb(&mut self.user_data, topic, *granted_qos);
                        }
                    }
                    SubscribeReturnCode::Failure => {
                        warn!("subscription to {} was refused by the broker", topic);
                    }
                }
            }
        }
        Ok(())
    }

    pub fn unsubscribe<S>(&mut self, topic_filters: S) -> Result<(), Error>
    where
        S: Into<Vec<String>>,
    {
        if self.state != State::Connected {
            return Err(Error::state("unsubscribe called while not connected"));
        }
        let topic_filters = topic_filters.into();
        if topic_filters.is_empty() {
            return Err(Error::state("unsubscribe requires at least one topic filter"));
        }
        for topic in &topic_filters {
            if !self.session.subscribed_topics.iter().any(|t| t == topic) {
                return Err(Error::state(format!("not subscribed to {}", topic)));
            }
        }

        let packet_id = self.session.allocate_packet_id();
        let unsubscribe = Unsubscribe {
            packet_id,
            topic_filters: topic_filters.clone(),
        };
        let mut buf = Vec::new();
        encode_unsubscribe(&unsubscribe, &mut buf)?;
        self.write_and_track(&buf)?;

        self.await_ack(
            |packet| matches!(packet, Packet::UnsubscribeAck(ack) if ack.packet_id == packet_id),
        )?;
        for topic in &topic_filters {
            self.session.forget_subscribed(topic);
            if let Some(cb) = self.on_unsubscribe {
                cb(&mut self.user_data, topic);
            }
        }
        Ok(())
    }

    /// Sends PINGREQ and waits for PINGRESP, returning every packet type
    /// observed while waiting (PUBLISH may arrive first and is dispatched
    /// normally).
    pub fn ping(&mut self) -> Result<Vec<PacketType>, Error> {
        if self.state != State::Connected {
            return Err(Error::state("ping called while not connected"));
        }
        let mut buf = Vec::new();
        encode_ping_request(&mut buf);
        self.write_and_track(&buf)?;
        let (_, observed) = self.await_ack(|packet| matches!(packet, Packet::PingResponse))?;
        Ok(observed)
    }

    /// Services the connection for up to `timeout`: sends a keep-alive
    /// PINGREQ if the keep-alive interval has elapsed since the last byte
    /// was written, then reads and dispatches packets until `timeout`
    /// elapses. Returns every packet type observed.
    ///
    /// `timeout` must be at least `config.socket_timeout`.
    pub fn poll(&mut self, timeout: Duration) -> Result<Vec<PacketType>, Error> {
        if self.state != State::Connected {
            return Err(Error::state("poll called while not connected"));
        }
        if timeout < self.config.socket_timeout {
            return Err(Error::state("poll timeout must be at least socket_timeout"));
        }

        if self.keep_alive_due() {
            self.send_ping_request()?;
        }

        let deadline = Instant::now() + timeout;
        let mut observed = Vec::new();
        while Instant::now() < deadline {
            let mut socket = match self.socket.take() {
                Some(socket) => socket,
                None => break,
            };
            let step_deadline = deadline.min(Instant::now() + self.config.socket_timeout);
            match read_packet(socket.as_mut(), step_deadline) {
                Ok(packet) => {
                    self.socket = Some(socket);
                    observed.push(packet.packet_type());
                    self.handle_unsolicited(packet)?;
                }
                Err(err) if err.is_timeout() => {
                    self.socket = Some(socket);
                    break;
                }
                Err(err) => {
                    let _ = socket.close();
                    self.state = State::Disconnected;
                    return Err(err);
                }
            }
        }
        Ok(observed)
    }

    fn keep_alive_due(&self) -> bool {
        match self.session.last_sent {
            Some(last_sent) => last_sent.elapsed() >= Duration::from_secs(u64::from(self.config.keep_alive)),
            None => false,
        }
    }

    fn send_ping_request(&mut self) -> Result<(), Error> {
        let mut buf = Vec::new();
        encode_ping_request(&mut buf);
        self.write_and_track(&buf)?;

        let deadline = Instant::now() + Duration::from_secs(u64::from(self.config.keep_alive));
        loop {
            let mut socket = self.socket.take().ok_or_else(|| Error::state("not connected"))?;
            let result = read_packet(socket.as_mut(), deadline);
            self.socket = Some(socket);
            match result {
                Ok(Packet::PingResponse) => return Ok(()),
                Ok(Packet::Publish(publish)) => self.dispatch_publish(publish)?,
                Ok(other) => {
                    self.fail_connection();
                    return Err(Error::protocol(format!(
                        "unexpected packet while awaiting PINGRESP: {:?}",
                        other.packet_type()
                    )));
                }
                Err(err) => {
                    self.fail_connection();
                    return Err(err);
                }
            }
        }
    }

    fn handle_unsolicited(&mut self, packet: Packet) -> Result<(), Error> {
        match packet {
            Packet::Publish(publish) => self.dispatch_publish(publish),
            Packet::PingResponse => Ok(()),
            other => {
                self.fail_connection();
                Err(Error::protocol(format!(
                    "unexpected unsolicited packet: {:?}",
                    other.packet_type()
                )))
            }
        }
    }

    fn dispatch_publish(&mut self, publish: Publish) -> Result<(), Error> {
        let matching = self.callbacks.matching(&publish.topic);
        if matching.is_empty() {
            if let Some(cb) = self.on_message {
                cb(&mut self.user_data, &publish.topic, &publish.payload);
            }
        } else {
            for cb in matching {
                cb(&mut self.user_data, &publish.topic, &publish.payload);
            }
        }

        if publish.qos == QoS::AtLeastOnce {
            let packet_id = publish
                .packet_id
                .ok_or_else(|| Error::protocol("QoS 1 PUBLISH is missing a packet id"))?;
            let mut buf = Vec::new();
            encode_puback(packet_id, &mut buf)?;
            self.write_and_track(&buf)?;
        }
        Ok(())
    }

    /// Waits for a packet matching `is_ack`, dispatching any PUBLISH seen in
    /// the meantime. Any other unexpected packet, or the `recv_timeout`
    /// elapsing, is a fatal protocol error that drops the connection.
    fn await_ack<F>(&mut self, mut is_ack: F) -> Result<(Packet, Vec<PacketType>), Error>
    where
        F: FnMut(&Packet) -> bool,
    {
        let deadline = Instant::now() + self.config.recv_timeout;
        let mut observed = Vec::new();
        loop {
            let mut socket = self.socket.take().ok_or_else(|| Error::state("not connected"))?;
            let result = read_packet(socket.as_mut(), deadline);
            self.socket = Some(socket);
            let packet = match result {
                Ok(packet) => packet,
                Err(err) => {
                    self.fail_connection();
                    return Err(err);
                }
            };
            observed.push(packet.packet_type());
            if is_ack(&packet) {
                return Ok((packet, observed));
            }
            match packet {
                Packet::Publish(publish) => self.dispatch_publish(publish)?,
                other => {
                    self.fail_connection();
                    return Err(Error::protocol(format!(
                        "unexpected packet while awaiting acknowledgment: {:?}",
                        other.packet_type()
                    )));
                }
            }
        }
    }

    fn write_and_track(&mut self, buf: &[u8]) -> Result<(), Error> {
        let mut socket = self.socket.take().ok_or_else(|| Error::state("not connected"))?;
        let result = write_all(socket.as_mut(), buf);
        self.socket = Some(socket);
        result?;
        self.session.last_sent = Some(Instant::now());
        Ok(())
    }

    fn fail_connection(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            let _ = socket.close();
        }
        self.state = State::Disconnected;
    }
}

fn backoff_delay(attempt: u32) -> f64 {
    let base = 2f64.powi(attempt as i32).min(MAX_BACKOFF_SECS);
    base + rand::thread_rng().gen::<f64>()
}

/// Reads one full control packet, accumulating the fixed header, the
/// variable-length remaining-length field, and the body before handing the
/// whole buffer to the codec.
fn read_packet(socket: &mut dyn Socket, deadline: Instant) -> Result<Packet, Error> {
    let mut header = [0u8; 1];
    read_exact_until(socket, &mut header, deadline)?;

    let mut length_bytes = Vec::with_capacity(4);
    let remaining_length = loop {
        let mut byte = [0u8; 1];
        read_exact_until(socket, &mut byte, deadline)?;
        length_bytes.push(byte[0]);
        match mqtt_core::variable_length(&length_bytes) {
            Ok(Some((value, _))) => break value,
            Ok(None) => continue,
            Err(_) => return Err(Error::protocol("broker sent an invalid remaining length")),
        }
    };

    let mut body = vec![0u8; remaining_length];
    read_exact_until(socket, &mut body, deadline)?;

    let mut full = Vec::with_capacity(1 + length_bytes.len() + remaining_length);
    full.push(header[0]);
    full.extend_from_slice(&length_bytes);
    full.extend_from_slice(&body);

    match decode_packet(&full) {
        Ok(Some((packet, _))) => Ok(packet),
        Ok(None) => Err(Error::new(ErrorKind::Protocol, "packet body shorter than declared")),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// An in-memory socket pair: `inbound` holds bytes the test pretends the
    /// broker sent, `outbound` records everything the client wrote.
    #[derive(Clone)]
    struct FakeSocket {
        inbound: Arc<Mutex<VecDeque<u8>>>,
        outbound: Arc<Mutex<Vec<u8>>>,
        closed: Arc<Mutex<bool>>,
    }

    impl FakeSocket {
        fn new(inbound: Vec<u8>) -> Self {
            FakeSocket {
                inbound: Arc::new(Mutex::new(inbound.into())),
                outbound: Arc::new(Mutex::new(Vec::new())),
                closed: Arc::new(Mutex::new(false)),
            }
        }
    }

    impl Socket for FakeSocket {
        fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.outbound.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn recv_into(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let mut inbound = self.inbound.lock().unwrap();
            if inbound.is_empty() {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "no more fake bytes"));
            }
            let mut n = 0;
            while n < buf.len() {
                match inbound.pop_front() {
                    Some(byte) => {
                        buf[n] = byte;
                        n += 1;
                    }
                    None => break,
                }
            }
            Ok(n)
        }

        fn close(&mut self) -> io::Result<()> {
            *self.closed.lock().unwrap() = true;
            Ok(())
        }

        fn set_timeout(&mut self, _timeout: Option<Duration>) -> io::Result<()> {
            Ok(())
        }
    }

    fn test_config() -> ClientConfig {
        crate::config::ClientConfigBuilder::new("broker.example")
            .client_id("test-client")
            .connect_retries(1)
            .build()
            .unwrap()
    }

    fn client_with_fake(connack: Vec<u8>) -> (Client<()>, FakeSocket) {
        let socket = FakeSocket::new(connack);
        let socket_for_connector = socket.clone();
        let connector: Box<dyn FnMut(Option<&str>, Option<u16>) -> Result<Box<dyn Socket>, Error>> =
            Box::new(move |_, _| Ok(Box::new(socket_for_connector.clone()) as Box<dyn Socket>));
        let client = Client::with_connector(test_config(), connector, ());
        (client, socket)
    }

    #[test]
    fn connect_accepts_session_not_present() {
        let (mut client, socket) = client_with_fake(vec![0x20, 0x02, 0x00, 0x00]);
        let session_present = client.connect(true, None, None, None, None).unwrap();
        assert!(!session_present);
        assert!(client.is_connected());
        assert_eq!(socket.outbound.lock().unwrap()[0], 0x10);
    }

    #[test]
    fn connect_fails_fatally_on_not_authorized() {
        let (mut client, _socket) = client_with_fake(vec![0x20, 0x02, 0x00, 0x05]);
        let err = client.connect(true, None, None, None, None).unwrap_err();
        assert_eq!(err.connect_return_code(), Some(ConnectReturnCode::NotAuthorized));
        assert!(!client.is_connected());
    }

    #[test]
    fn connect_reports_repeated_failures_once_retries_are_exhausted() {
        let (mut client, _socket) = client_with_fake(vec![0x20, 0x02, 0x00, 0x03]);
        let err = client.connect(true, None, None, None, None).unwrap_err();
        assert_eq!(
            err.connect_return_code(),
            Some(ConnectReturnCode::ServerUnavailable)
        );
        assert!(err.to_string().contains("Repeated connect failures"));
        assert!(!client.is_connected());
    }

    #[test]
    fn publish_qos0_does_not_wait_for_an_ack() {
        let (mut client, socket) = client_with_fake(vec![0x20, 0x02, 0x00, 0x00]);
        client.connect(true, None, None, None, None).unwrap();
        client.publish("a/b", b"hi", QoS::AtMostOnce, false).unwrap();
        let out = socket.outbound.lock().unwrap();
        assert_eq!(out[out.len() - 9], 0x30);
    }

    #[test]
    fn ping_observes_the_pingresp() {
        let (mut client, _socket) = client_with_fake(vec![
            0x20, 0x02, 0x00, 0x00, // CONNACK
            0xd0, 0x00, // PINGRESP
        ]);
        client.connect(true, None, None, None, None).unwrap();
        let observed = client.ping().unwrap();
        assert_eq!(observed, vec![PacketType::PingResponse]);
    }

    #[test]
    fn unsubscribe_from_an_untracked_topic_fails_without_touching_the_socket() {
        let (mut client, socket) = client_with_fake(vec![0x20, 0x02, 0x00, 0x00]);
        client.connect(true, None, None, None, None).unwrap();
        let before = socket.outbound.lock().unwrap().len();
        let err = client.unsubscribe(vec!["a/b".to_string()]).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::State);
        assert_eq!(socket.outbound.lock().unwrap().len(), before);
    }
}
