//! In-memory session state: the packet-id allocator, the last-will setting,
//! the set of currently-subscribed topics, and the keep-alive clock.
//!
//! None of this survives a `clean_session = false` reconnect across process
//! restarts; only the allocator and subscription list are remembered for the
//! lifetime of a single `Client`.

use std::time::Instant;

use mqtt_core::{LastWill, PacketId};

pub(crate) struct Session {
    next_packet_id: PacketId,
    pub(crate) subscribed_topics: Vec<String>,
    pub(crate) last_will: Option<LastWill>,
    pub(crate) last_sent: Option<Instant>,
}

impl Session {
    pub(crate) fn new() -> Self {
        Session {
            next_packet_id: 1,
            subscribed_topics: Vec::new(),
            last_will: None,
            last_sent: None,
        }
    }

    /// Allocates the next packet id, wrapping from `0xFFFF` back to `1`
    /// without ever handing out `0`.
    pub(crate) fn allocate_packet_id(&mut self) -> PacketId {
        let id = self.next_packet_id;
        self.next_packet_id = if id == u16::MAX { 1 } else { id + 1 };
        id
    }

    pub(crate) fn remember_subscribed(&mut self, topic: &str) {
        if !self.subscribed_topics.iter().any(|t| t == topic) {
            self.subscribed_topics.push(topic.to_string());
        }
    }

    pub(crate) fn forget_subscribed(&mut self, topic: &str) {
        self.subscribed_topics.retain(|t| t != topic);
    }

    pub(crate) fn reset_for_new_connection(&mut self) {
        self.subscribed_topics.clear();
        self.last_sent = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_ids_wrap_from_max_to_one_skipping_zero() {
        let mut session = Session::new();
        assert_eq!(session.allocate_packet_id(), 1);
        assert_eq!(session.allocate_packet_id(), 2);

        session.next_packet_id = u16::MAX;
        assert_eq!(session.allocate_packet_id(), u16::MAX);
        assert_eq!(session.allocate_packet_id(), 1);
    }

    #[test]
    fn remember_subscribed_is_idempotent() {
        let mut session = Session::new();
        session.remember_subscribed("a/b");
        session.remember_subscribed("a/b");
        assert_eq!(session.subscribed_topics, vec!["a/b".to_string()]);
    }
}
