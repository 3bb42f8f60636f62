//! The per-pattern message callback table.
//!
//! Patterns are matched in registration order and a PUBLISH may satisfy more
//! than one of them; the global `on_message` fallback only fires when no
//! pattern matched at all.

use mqtt_core::topic_matches_filter;

pub type MessageCallback<U> = fn(&mut U, &str, &[u8]);

pub(crate) struct CallbackTable<U> {
    entries: Vec<(String, MessageCallback<U>)>,
}

impl<U> CallbackTable<U> {
    pub(crate) fn new() -> Self {
        CallbackTable { entries: Vec::new() }
    }

    /// Registers `callback` for `pattern`, replacing any existing callback
    /// for the same pattern in place.
    pub(crate) fn insert(&mut self, pattern: &str, callback: MessageCallback<U>) {
        if let Some(entry) = self.entries.iter_mut().find(|(p, _)| p == pattern) {
            entry.1 = callback;
        } else {
            self.entries.push((pattern.to_string(), callback));
        }
    }

    pub(crate) fn remove(&mut self, pattern: &str) {
        self.entries.retain(|(p, _)| p != pattern);
    }

    /// Every callback whose pattern matches `topic`, in registration order.
    pub(crate) fn matching(&self, topic: &str) -> Vec<MessageCallback<U>> {
        self.entries
            .iter()
            .filter(|(pattern, _)| topic_matches_filter(pattern, topic))
            .map(|(_, cb)| *cb)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut (), _: &str, _: &[u8]) {}
    fn noop2(_: &mut (), _: &str, _: &[u8]) {}

    #[test]
    fn two_callbacks_can_match_the_same_publish() {
        let mut table: CallbackTable<()> = CallbackTable::new();
        table.insert("a/+", noop);
        table.insert("a/#", noop2);
        assert_eq!(table.matching("a/b").len(), 2);
    }

    #[test]
    fn replacing_a_pattern_keeps_a_single_entry() {
        let mut table: CallbackTable<()> = CallbackTable::new();
        table.insert("a/b", noop);
        table.insert("a/b", noop2);
        assert_eq!(table.entries.len(), 1);
    }

    #[test]
    fn removed_pattern_no_longer_matches() {
        let mut table: CallbackTable<()> = CallbackTable::new();
        table.insert("a/b", noop);
        table.remove("a/b");
        assert!(table.matching("a/b").is_empty());
    }
}
