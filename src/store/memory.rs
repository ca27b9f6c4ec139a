//! In-memory keyspace with expiration and mutation logging

use super::value::{vector_to_bytes, Value};
use crate::aof::AofWriter;
use crate::protocol::frame;
use bytes::{Bytes, BytesMut};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::warn;

/// The keyspace plus its durability hook.
///
/// Expirations live in their own map: a key absent from it never expires.
/// Every mutation that succeeds is appended to the attached log as a wire
/// frame before the caller produces its reply; only the dispatch path ever
/// touches a `Store`, so no synchronization happens here.
pub struct Store {
    values: HashMap<Bytes, Value>,
    expirations: HashMap<Bytes, Instant>,
    aof: Option<AofWriter>,
}

impl Store {
    pub fn new() -> Self {
        Store {
            values: HashMap::new(),
            expirations: HashMap::new(),
            aof: None,
        }
    }

    /// Attach the log; mutations before this point (i.e. replay) are not
    /// re-logged.
    pub fn attach_aof(&mut self, writer: AofWriter) {
        self.aof = Some(writer);
    }

    /// Overwrite `key` with a byte string, replacing any prior kind.
    pub fn set(&mut self, key: Bytes, value: Bytes) {
        self.values.insert(key.clone(), Value::Str(value.clone()));
        self.log_frame(&[Bytes::from_static(b"SET"), key, value]);
    }

    /// Overwrite `key` with a float vector, replacing any prior kind.
    pub fn vec_set(&mut self, key: Bytes, vector: Vec<f32>) {
        let raw = vector_to_bytes(&vector);
        self.values.insert(key.clone(), Value::Vector(vector));
        self.log_frame(&[Bytes::from_static(b"VECSET"), key, raw]);
    }

    /// Value for `key`, treating a passed expiry as absence.
    pub fn get(&mut self, key: &Bytes) -> Option<&Value> {
        if self.is_expired(key) {
            self.remove(key);
            return None;
        }
        self.values.get(key)
    }

    /// Set a TTL on an existing key.
    ///
    /// A non-positive `seconds` or a missing key is a no-op returning
    /// false; nothing is logged in that case.
    pub fn set_expire(&mut self, key: &Bytes, seconds: i64) -> bool {
        if seconds <= 0 {
            return false;
        }
        if self.is_expired(key) {
            self.remove(key);
            return false;
        }
        if !self.values.contains_key(key) {
            return false;
        }
        self.expirations
            .insert(key.clone(), Instant::now() + Duration::from_secs(seconds as u64));
        self.log_frame(&[
            Bytes::from_static(b"EXPIRE"),
            key.clone(),
            Bytes::from(seconds.to_string()),
        ]);
        true
    }

    /// Sweep every key whose expiry has passed out of both maps.
    pub fn cleanup_expired_keys(&mut self) -> usize {
        let now = Instant::now();
        let expired: Vec<Bytes> = self
            .expirations
            .iter()
            .filter(|(_, at)| now >= **at)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }

    /// Visit every live vector-typed entry.
    pub fn for_each_vector<F: FnMut(&Bytes, &[f32])>(&self, mut visitor: F) {
        let now = Instant::now();
        for (key, value) in &self.values {
            if let Value::Vector(vector) = value {
                let expired = self.expirations.get(key).is_some_and(|at| now >= *at);
                if !expired {
                    visitor(key, vector);
                }
            }
        }
    }

    /// Live key count (expired-but-unswept keys still count until touched).
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn is_expired(&self, key: &Bytes) -> bool {
        self.expirations
            .get(key)
            .is_some_and(|at| Instant::now() >= *at)
    }

    fn remove(&mut self, key: &Bytes) {
        self.values.remove(key);
        self.expirations.remove(key);
    }

    /// Append a mutation frame to the log and push it toward stable
    /// storage. A write failure degrades durability, not availability.
    fn log_frame(&mut self, tokens: &[Bytes]) {
        if let Some(aof) = &mut self.aof {
            let mut buf = BytesMut::new();
            frame::encode(&mut buf, tokens);
            if let Err(e) = aof.append(&buf) {
                warn!("failed to append to AOF: {}", e);
            }
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    #[test]
    fn test_set_get() {
        let mut store = Store::new();
        store.set(key("k"), key("v"));
        assert_eq!(store.get(&key("k")), Some(&Value::Str(key("v"))));
        assert_eq!(store.get(&key("missing")), None);
    }

    #[test]
    fn test_last_write_wins_across_kinds() {
        let mut store = Store::new();
        store.set(key("k"), key("v"));
        store.vec_set(key("k"), vec![1.0, 2.0]);
        assert_eq!(store.get(&key("k")), Some(&Value::Vector(vec![1.0, 2.0])));

        store.set(key("k"), key("again"));
        assert_eq!(store.get(&key("k")), Some(&Value::Str(key("again"))));
    }

    #[test]
    fn test_expire_rejects_nonpositive_and_missing() {
        let mut store = Store::new();
        store.set(key("k"), key("v"));
        assert!(!store.set_expire(&key("k"), 0));
        assert!(!store.set_expire(&key("k"), -5));
        assert!(!store.set_expire(&key("nope"), 10));
        // The rejected EXPIREs left the key untouched and permanent.
        assert!(store.get(&key("k")).is_some());
    }

    #[test]
    fn test_expired_key_reads_as_absent() {
        let mut store = Store::new();
        store.set(key("k"), key("v"));
        assert!(store.set_expire(&key("k"), 1));

        std::thread::sleep(Duration::from_millis(1100));
        assert_eq!(store.get(&key("k")), None);
        // Lazy removal cleared both maps.
        assert!(store.is_empty());
    }

    #[test]
    fn test_cleanup_sweeps_only_expired() {
        let mut store = Store::new();
        store.set(key("a"), key("1"));
        store.set(key("b"), key("2"));
        store.set(key("c"), key("3"));
        assert!(store.set_expire(&key("a"), 1));
        assert!(store.set_expire(&key("b"), 100));

        std::thread::sleep(Duration::from_millis(1100));
        assert_eq!(store.cleanup_expired_keys(), 1);
        assert_eq!(store.len(), 2);
        assert!(store.get(&key("a")).is_none());
        assert!(store.get(&key("b")).is_some());
        assert!(store.get(&key("c")).is_some());
    }

    #[test]
    fn test_for_each_vector_skips_strings() {
        let mut store = Store::new();
        store.set(key("s"), key("text"));
        store.vec_set(key("v1"), vec![1.0]);
        store.vec_set(key("v2"), vec![2.0]);

        let mut seen = Vec::new();
        store.for_each_vector(|k, v| seen.push((k.clone(), v.to_vec())));
        seen.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(seen, vec![(key("v1"), vec![1.0]), (key("v2"), vec![2.0])]);
    }
}
