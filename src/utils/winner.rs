use sha2::{Digest, Sha256};

/// Outcome of one winner selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Winning index into the full multiplied entrant sequence
    pub index: usize,
    pub winner_id: String,
    /// First 12 hex chars of the seed digest, upper-cased; stored on the
    /// record so operators can verify the draw afterwards
    pub audit_hash: String,
}

/// Length of the short audit hash in hex characters.
pub const AUDIT_HASH_LEN: usize = 12;

/// Select a winner from the entry pool.
///
/// The draw value is concatenated with a nanosecond timestamp, hashed with
/// SHA-256, and the full digest taken modulo the pool size. This is the
/// single selection routine: initial draws and rerolls both go through it,
/// so both carry the same audit properties. Returns `None` for an empty
/// pool; callers are expected to branch on emptiness first and emit a
/// "no entrants" outcome instead.
pub fn select(entrants: &[String], draw_value: u32, nanos: i64) -> Option<Selection> {
    if entrants.is_empty() {
        return None;
    }

    let seed = format!("{draw_value}{nanos}");
    let digest = Sha256::digest(seed.as_bytes());
    let hex_hash = format!("{digest:x}");

    let index = digest_mod(&digest, entrants.len());
    Some(Selection {
        index,
        winner_id: entrants[index].clone(),
        audit_hash: hex_hash[..AUDIT_HASH_LEN].to_uppercase(),
    })
}

/// [`select`] salted with the current wall clock.
pub fn select_now(entrants: &[String], draw_value: u32) -> Option<Selection> {
    select(entrants, draw_value, now_nanos())
}

fn now_nanos() -> i64 {
    let now = chrono::Utc::now();
    // timestamp_nanos overflows around year 2262; fall back to microsecond
    // resolution rather than panicking.
    now.timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1000))
}

/// The 256-bit digest interpreted as a big-endian integer, modulo `modulus`.
/// Computed byte-wise so no big-integer arithmetic is needed.
fn digest_mod(digest: &[u8], modulus: usize) -> usize {
    let m = modulus as u128;
    let mut acc: u128 = 0;
    for byte in digest {
        acc = ((acc << 8) | *byte as u128) % m;
    }
    acc as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn selection_is_deterministic_for_fixed_inputs() {
        let entrants = pool(&["alice", "bob", "carol"]);
        let a = select(&entrants, 42, 1_700_000_000_000_000_000).unwrap();
        let b = select(&entrants, 42, 1_700_000_000_000_000_000).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_timestamps_produce_different_hashes() {
        let entrants = pool(&["alice", "bob"]);
        let a = select(&entrants, 42, 1).unwrap();
        let b = select(&entrants, 42, 2).unwrap();
        assert_ne!(a.audit_hash, b.audit_hash);
    }

    #[test]
    fn index_is_always_in_range() {
        for len in 1..=17usize {
            let entrants: Vec<String> = (0..len).map(|i| format!("user{i}")).collect();
            for draw in [1u32, 50, 100] {
                for nanos in [0i64, 999, 1_700_000_000_000_000_000] {
                    let sel = select(&entrants, draw, nanos).unwrap();
                    assert!(sel.index < len);
                    assert_eq!(sel.winner_id, entrants[sel.index]);
                }
            }
        }
    }

    #[test]
    fn audit_hash_is_twelve_uppercase_hex_chars() {
        let entrants = pool(&["alice"]);
        let sel = select(&entrants, 7, 123_456_789).unwrap();
        assert_eq!(sel.audit_hash.len(), AUDIT_HASH_LEN);
        assert!(
            sel.audit_hash
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
        assert!(u64::from_str_radix(&sel.audit_hash, 16).is_ok());
    }

    #[test]
    fn empty_pool_yields_none() {
        assert!(select(&[], 42, 1).is_none());
        assert!(select_now(&[], 42).is_none());
    }

    #[test]
    fn digest_mod_matches_naive_computation() {
        // 0x0102 = 258
        assert_eq!(digest_mod(&[0x01, 0x02], 7), 258 % 7);
        assert_eq!(digest_mod(&[0xff, 0xff, 0xff], 1), 0);
        assert_eq!(digest_mod(&[0x00, 0x2a], 100), 42);
    }
}
