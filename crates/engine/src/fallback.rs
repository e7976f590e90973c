//! Deterministic fallback assigner for clients that cannot make a
//! server round-trip (e.g. an embedded snippet).
//!
//! The hashing rule is a bit-exact, versioned contract: client-side
//! snippets re-implement it independently, so any change to the hash
//! or the cumulative-weight walk must bump [`FALLBACK_HASH_VERSION`]
//! to avoid assignment drift between server and client.
//!
//! Contract (version 1):
//! 1. `h = 0u64`; for each UTF-8 byte `b` of the visitor id,
//!    `h = h * 31 + b` with wrapping u64 arithmetic.
//! 2. `draw = h mod total_weight`.
//! 3. Walk the variants in listed order accumulating weights; the
//!    first variant whose cumulative boundary exceeds `draw` wins.
//!
//! The function is pure, allocation-light, and blocking-free so it
//! fits inside a hard client-side wall-clock budget
//! (`EngineConfig::fallback_budget_ms`); on budget exhaustion the
//! embedding caller fails open to the control experience.

use uuid::Uuid;

use splitflow_core::types::Variant;

/// Bump on any change to [`visitor_bucket`] or the weight walk.
pub const FALLBACK_HASH_VERSION: u32 = 1;

/// Polynomial rolling hash over the visitor id bytes.
pub fn visitor_bucket(visitor_id: &str) -> u64 {
    visitor_id
        .bytes()
        .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64))
}

/// Stateless variant assignment: same visitor id, same variant,
/// without any stored state — at the cost of not adapting to reward
/// signal. Returns `None` for degenerate input (no variants, zero
/// total weight); the caller shows the control experience.
pub fn fallback_assign(visitor_id: &str, variants: &[Variant]) -> Option<Uuid> {
    let total: u32 = variants.iter().map(|v| v.weight).sum();
    if total == 0 {
        return None;
    }
    let draw = (visitor_bucket(visitor_id) % total as u64) as u32;
    let mut cumulative = 0u32;
    for variant in variants {
        cumulative += variant.weight;
        if draw < cumulative {
            return Some(variant.id);
        }
    }
    variants.last().map(|v| v.id)
}
