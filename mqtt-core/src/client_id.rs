//! Generation of client identifiers when the caller does not supply one.

use rand::Rng;

use crate::packet::CLIENT_ID_MAX_LEN;

/// Generates a client identifier of the form `cpyNNNNN`, staying within the
/// broker-mandated 1-23 byte range.
pub fn generate_client_id() -> String {
    let mut rng = rand::thread_rng();
    let id = format!("cpy{}{}", rng.gen_range(0..100_000), rng.gen_range(0..100));

    debug_assert!(!id.is_empty() && id.len() <= CLIENT_ID_MAX_LEN);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_fit_the_length_limit() {
        for _ in 0..1000 {
            let id = generate_client_id();
            assert!(!id.is_empty());
            assert!(id.len() <= CLIENT_ID_MAX_LEN);
            assert!(id.starts_with("cpy"));
        }
    }
}
