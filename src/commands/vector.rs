//! Vector commands (VECSET, VECSIM)
//!
//! Vectors travel on the wire as raw little-endian f32 payloads. VECSIM is
//! a flat scan: every stored vector is scored against the query, survivors
//! above the similarity threshold are partially sorted, and the best keys
//! come back as an array.

use super::{parse_integer, Command};
use crate::protocol::Reply;
use crate::store::{vector_from_bytes, Store};
use bytes::Bytes;

/// Minimum cosine similarity (exclusive) for a vector to appear in VECSIM
/// results.
const SIMILARITY_THRESHOLD: f64 = 0.6;

/// Keeps the denominator non-zero for zero-length vectors.
const NORM_EPSILON: f64 = 1e-8;

/// VECSET command - store a float vector under a key
///
/// Syntax: VECSET key payload
///
/// The payload length must be a multiple of 4 bytes.
pub struct VecSetCommand;

impl Command for VecSetCommand {
    fn execute(&self, store: &mut Store, args: &[Bytes]) -> Reply {
        let vector = match vector_from_bytes(&args[1]) {
            Some(v) => v,
            None => return Reply::error("ERR invalid vector data"),
        };
        store.vec_set(args[0].clone(), vector);
        Reply::ok()
    }

    fn name(&self) -> &'static str {
        "VECSET"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

/// VECSIM command - rank stored vectors by cosine similarity to a query
///
/// Syntax: VECSIM query-payload top_k
///
/// Replies an array of at most `top_k` keys, best match first. Values are
/// not included, and ties fall in no defined order.
pub struct VecSimCommand;

impl Command for VecSimCommand {
    fn execute(&self, store: &mut Store, args: &[Bytes]) -> Reply {
        let query = match vector_from_bytes(&args[0]) {
            Some(v) => v,
            None => return Reply::error("ERR invalid vector data"),
        };
        let top_k = match parse_integer(&args[1]) {
            Some(k) if k >= 0 => k as usize,
            _ => return Reply::error("ERR top_k must be an integer"),
        };

        let mut matches: Vec<(Bytes, f64)> = Vec::new();
        store.for_each_vector(|key, vector| {
            let sim = cosine_similarity(&query, vector);
            if sim > SIMILARITY_THRESHOLD {
                matches.push((key.clone(), sim));
            }
        });

        // Partial sort: place the k best up front, then order just those.
        let k = top_k.min(matches.len());
        if matches.len() > k {
            matches.select_nth_unstable_by(k, |a, b| b.1.total_cmp(&a.1));
            matches.truncate(k);
        }
        matches.sort_unstable_by(|a, b| b.1.total_cmp(&a.1));

        Reply::Array(matches.into_iter().map(|(key, _)| Reply::Bulk(key)).collect())
    }

    fn name(&self) -> &'static str {
        "VECSIM"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

/// Cosine similarity accumulated in f64. Mismatched lengths score 0.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    dot / (norm_a.sqrt() * norm_b.sqrt() + NORM_EPSILON)
}
