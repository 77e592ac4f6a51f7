use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_MAX_SIZE: usize = 1000;

/// Bounded TTL duplicate-detection cache keyed by a 16-byte message id.
///
/// `check` is the only operation: it reports whether `id` was already
/// present and (re)stamps its timestamp either way, matching a `msg_id`
/// that arrives twice within the TTL window. Eviction runs a two-phase
/// collect-then-delete pass — the early version of this in the source
/// mutated the map while iterating it, which is unsound; this collects
/// expired keys into a `Vec` first and deletes them in a second pass.
pub struct BoundSet {
    ttl: Duration,
    max_size: usize,
    seen: Mutex<HashMap<[u8; 16], Instant>>,
}

impl BoundSet {
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            ttl,
            max_size,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if `id` was already present (a duplicate), `false`
    /// if this is the first sighting. Either way the timestamp is
    /// refreshed and, if the set has grown past `max_size`, expired
    /// entries are evicted.
    pub fn check(&self, id: [u8; 16]) -> bool {
        let mut seen = self.seen.lock().expect("bound set mutex poisoned");
        let now = Instant::now();
        let was_present = seen.insert(id, now).is_some();

        if seen.len() > self.max_size {
            let ttl = self.ttl;
            let expired: Vec<[u8; 16]> = seen
                .iter()
                .filter(|(_, ts)| now.duration_since(**ts) > ttl)
                .map(|(k, _)| *k)
                .collect();
            for key in expired {
                seen.remove(&key);
            }
        }

        was_present
    }

    pub fn len(&self) -> usize {
        self.seen.lock().expect("bound set mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for BoundSet {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sighting_is_not_a_duplicate() {
        let set = BoundSet::default();
        assert!(!set.check([1; 16]));
    }

    #[test]
    fn repeat_within_ttl_is_a_duplicate() {
        let set = BoundSet::default();
        assert!(!set.check([1; 16]));
        assert!(set.check([1; 16]));
    }

    #[test]
    fn eviction_does_not_panic_on_overflow() {
        let set = BoundSet::new(Duration::from_millis(1), 4);
        for i in 0..8u8 {
            let mut id = [0u8; 16];
            id[0] = i;
            set.check(id);
        }
        std::thread::sleep(Duration::from_millis(5));
        let mut id = [0u8; 16];
        id[0] = 200;
        set.check(id);
        assert!(set.len() <= 9);
    }
}
