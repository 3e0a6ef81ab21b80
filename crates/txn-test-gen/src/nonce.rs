//! Uniqueness tokens that keep otherwise identical transfers distinct.
//!
//! Every generated transaction carries a context-free `nonce` action whose
//! data is a [`NonceToken`]. The token's sequence comes from a 64-bit counter
//! seeded once per process from the wall clock (`unix_secs << 32`) and never
//! reset, so tokens stay unique across sessions, generator instances and
//! restarts more than a second apart.

use once_cell::sync::Lazy;
use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

static PROCESS_SEQUENCE: Lazy<Arc<AtomicU64>> =
    Lazy::new(|| Arc::new(AtomicU64::new(clock_seed())));

fn clock_seed() -> u64 {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    secs << 32
}

/// A transaction uniqueness token: the session tick it was built on, and a
/// process-wide sequence number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NonceToken {
    pub prefix: u64,
    pub sequence: u64,
}

impl Ord for NonceToken {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.sequence
            .cmp(&other.sequence)
            .then(self.prefix.cmp(&other.prefix))
    }
}

impl PartialOrd for NonceToken {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for NonceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix, self.sequence)
    }
}

/// Hands out [`NonceToken`]s with strictly increasing sequence numbers.
#[derive(Clone, Debug)]
pub struct NonceGenerator {
    sequence: Arc<AtomicU64>,
}

impl NonceGenerator {
    /// A generator backed by the process-wide counter. All generators created
    /// this way share it.
    pub fn process() -> Self {
        Self {
            sequence: PROCESS_SEQUENCE.clone(),
        }
    }

    /// A generator with its own counter, for tests and replay.
    pub fn starting_at(seed: u64) -> Self {
        Self {
            sequence: Arc::new(AtomicU64::new(seed)),
        }
    }

    pub fn next(&self, prefix: u64) -> NonceToken {
        NonceToken {
            prefix,
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
        }
    }

    /// The sequence number the next token will get.
    pub fn peek(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl Default for NonceGenerator {
    fn default() -> Self {
        Self::process()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tokens_increase() {
        let nonces = NonceGenerator::starting_at(10);
        let first = nonces.next(0);
        let second = nonces.next(0);
        let third = nonces.next(1);
        assert_eq!(first.sequence, 10);
        assert!(first < second && second < third);
        assert_eq!(nonces.peek(), 13);
    }

    #[test]
    fn test_display_concatenates() {
        let token = NonceToken {
            prefix: 42,
            sequence: 7,
        };
        assert_eq!(token.to_string(), "427");
    }

    #[test]
    fn test_process_generators_share_counter() {
        let first = NonceGenerator::process();
        let second = NonceGenerator::process();
        let a = first.next(0);
        let b = second.next(0);
        assert!(b.sequence > a.sequence);
        assert!(a.sequence >= 1 << 32);
    }

    #[test]
    fn test_unique_across_threads() {
        let nonces = NonceGenerator::starting_at(0);
        let handles: Vec<_> = (0..4)
            .map(|prefix| {
                let nonces = nonces.clone();
                std::thread::spawn(move || {
                    (0..1000)
                        .map(|_| nonces.next(prefix))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut seen = HashSet::new();
        for handle in handles {
            for token in handle.join().unwrap() {
                assert!(seen.insert(token.sequence));
            }
        }
        assert_eq!(seen.len(), 4000);
    }
}
