use std::time::Duration;

use mqtt_core::{generate_client_id, CLIENT_ID_MAX_LEN};

use crate::error::Error;

const DEFAULT_PORT_PLAIN: u16 = 1883;
const DEFAULT_PORT_TLS: u16 = 8883;

/// Immutable-after-construction client configuration.
///
/// Built with [`ClientConfigBuilder`]; fields map 1:1 onto the recognized
/// constructor options of the client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub broker: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<Vec<u8>>,
    pub client_id: String,
    pub is_ssl: bool,
    pub keep_alive: u16,
    pub recv_timeout: Duration,
    pub socket_timeout: Duration,
    pub connect_retries: u32,
    pub use_binary_mode: bool,
}

/// Builder for [`ClientConfig`]; validates the invariants a raw struct
/// literal could otherwise violate (keep-alive range, timeout ordering,
/// client id length).
#[derive(Debug, Clone)]
pub struct ClientConfigBuilder {
    broker: String,
    port: Option<u16>,
    username: Option<String>,
    password: Option<Vec<u8>>,
    client_id: Option<String>,
    is_ssl: bool,
    keep_alive: u16,
    recv_timeout: Duration,
    socket_timeout: Duration,
    connect_retries: u32,
    use_binary_mode: bool,
}

impl ClientConfigBuilder {
    pub fn new(broker: impl Into<String>) -> Self {
        ClientConfigBuilder {
            broker: broker.into(),
            port: None,
            username: None,
            password: None,
            client_id: None,
            is_ssl: false,
            keep_alive: 60,
            recv_timeout: Duration::from_secs(10),
            socket_timeout: Duration::from_secs(1),
            connect_retries: 5,
            use_binary_mode: false,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<Vec<u8>>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn is_ssl(mut self, is_ssl: bool) -> Self {
        self.is_ssl = is_ssl;
        self
    }

    pub fn keep_alive(mut self, keep_alive: u16) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn recv_timeout(mut self, recv_timeout: Duration) -> Self {
        self.recv_timeout = recv_timeout;
        self
    }

    pub fn socket_timeout(mut self, socket_timeout: Duration) -> Self {
        self.socket_timeout = socket_timeout;
        self
    }

    pub fn connect_retries(mut self, connect_retries: u32) -> Self {
        self.connect_retries = connect_retries;
        self
    }

    pub fn use_binary_mode(mut self, use_binary_mode: bool) -> Self {
        self.use_binary_mode = use_binary_mode;
        self
    }

    pub fn build(self) -> Result<ClientConfig, Error> {
        if self.keep_alive == u16::MAX {
            return Err(Error::state("keep_alive must be less than 65535"));
        }
        if self.recv_timeout <= self.socket_timeout {
            return Err(Error::state("recv_timeout must be greater than socket_timeout"));
        }
        if self.connect_retries == 0 {
            return Err(Error::state("connect_retries must be at least 1"));
        }

        let client_id = match self.client_id {
            Some(id) => id,
            None => {
                let id = generate_client_id();
                if id.is_empty() || id.len() > CLIENT_ID_MAX_LEN {
                    return Err(Error::state("generated client id exceeds the 23-byte limit"));
                }
                id
            }
        };

        let port = self
            .port
            .unwrap_or(if self.is_ssl { DEFAULT_PORT_TLS } else { DEFAULT_PORT_PLAIN });

        Ok(ClientConfig {
            broker: self.broker,
            port,
            username: self.username,
            password: self.password,
            client_id,
            is_ssl: self.is_ssl,
            keep_alive: self.keep_alive,
            recv_timeout: self.recv_timeout,
            socket_timeout: self.socket_timeout,
            connect_retries: self.connect_retries,
            use_binary_mode: self.use_binary_mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_plain_port() {
        let config = ClientConfigBuilder::new("broker.example").build().unwrap();
        assert_eq!(config.port, DEFAULT_PORT_PLAIN);
    }

    #[test]
    fn tls_defaults_to_tls_port() {
        let config = ClientConfigBuilder::new("broker.example")
            .is_ssl(true)
            .build()
            .unwrap();
        assert_eq!(config.port, DEFAULT_PORT_TLS);
    }

    #[test]
    fn explicit_port_overrides_tls_default() {
        let config = ClientConfigBuilder::new("broker.example")
            .is_ssl(true)
            .port(1884)
            .build()
            .unwrap();
        assert_eq!(config.port, 1884);
    }

    #[test]
    fn rejects_max_keep_alive() {
        assert!(ClientConfigBuilder::new("broker.example")
            .keep_alive(65535)
            .build()
            .is_err());
        assert!(ClientConfigBuilder::new("broker.example")
            .keep_alive(65534)
            .build()
            .is_ok());
    }

    #[test]
    fn rejects_recv_timeout_not_greater_than_socket_timeout() {
        use std::time::Duration;

        assert!(ClientConfigBuilder::new("broker.example")
            .recv_timeout(Duration::from_secs(1))
            .socket_timeout(Duration::from_secs(1))
            .build()
            .is_err());
    }
}
