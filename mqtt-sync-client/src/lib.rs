//! A blocking, single-threaded MQTT 3.1.1 client.
//!
//! Built on top of [`mqtt_core`] for wire encoding/decoding. `Client` owns a
//! socket, drives CONNECT/SUBSCRIBE/PUBLISH exchanges to completion, and
//! dispatches inbound PUBLISH packets to per-topic callbacks. Nothing in
//! this crate spawns a thread: keep-alive and reconnection are the caller's
//! responsibility to drive via repeated [`Client::poll`] calls.

#[macro_use]
extern crate log;

mod callbacks;
mod client;
mod config;
mod error;
mod session;
mod socket;

pub use callbacks::MessageCallback;
pub use client::{
    Client, ConnectCallback, DisconnectCallback, PublishCallback, SubscribeCallback,
    UnsubscribeCallback,
};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{Error, ErrorKind};
pub use socket::{Socket, TcpSocket};

pub use mqtt_core::{
    ConnectReturnCode, LastWill, PacketId, PacketType, QoS, SubscribeReturnCode,
};
