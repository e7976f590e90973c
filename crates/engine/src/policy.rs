//! Variant selection policies.
//!
//! A single entry point dispatches the closed [`Algorithm`] enum.
//! Every policy breaks argmax ties by input order (first-listed
//! variant wins) and returns `None` only for degenerate input — an
//! empty variant list or a zero total weight — which the hub resolves
//! by serving the control.

use std::collections::HashMap;

use rand::Rng;
use rand_distr::{Beta, Distribution};
use uuid::Uuid;

use splitflow_core::types::{Algorithm, Variant, VariantStats};

/// Pick a variant for a first-time visitor.
///
/// Bandit policies read posterior/pull state derived on the fly from
/// the reward snapshot; a variant missing from the snapshot is treated
/// as never pulled.
pub fn select_variant<R: Rng>(
    variants: &[Variant],
    algorithm: Algorithm,
    snapshot: &HashMap<Uuid, VariantStats>,
    rng: &mut R,
) -> Option<Uuid> {
    if variants.is_empty() {
        return None;
    }
    match algorithm {
        Algorithm::Uniform => weighted_uniform(variants, rng),
        Algorithm::ThompsonSampling => thompson_sampling(variants, snapshot, rng),
        Algorithm::Ucb1 => ucb1(variants, snapshot),
        Algorithm::EpsilonGreedy { epsilon } => epsilon_greedy(variants, snapshot, epsilon, rng),
    }
}

/// Draw uniformly in `[0, total_weight)` and walk cumulative weights;
/// the first variant whose cumulative boundary exceeds the draw wins.
fn weighted_uniform<R: Rng>(variants: &[Variant], rng: &mut R) -> Option<Uuid> {
    let total: u32 = variants.iter().map(|v| v.weight).sum();
    if total == 0 {
        return None;
    }
    let draw = rng.gen_range(0..total);
    let mut cumulative = 0u32;
    for variant in variants {
        cumulative += variant.weight;
        if draw < cumulative {
            return Some(variant.id);
        }
    }
    // Unreachable with a correct total; kept as a safe default.
    variants.last().map(|v| v.id)
}

fn thompson_sampling<R: Rng>(
    variants: &[Variant],
    snapshot: &HashMap<Uuid, VariantStats>,
    rng: &mut R,
) -> Option<Uuid> {
    let mut best_sample = f64::NEG_INFINITY;
    let mut best = None;
    for variant in variants {
        let stats = snapshot.get(&variant.id).copied().unwrap_or_default();
        let sample = match Beta::new(stats.posterior_alpha(), stats.posterior_beta()) {
            Ok(dist) => dist.sample(rng),
            // Parameters are >= 1 by construction; fall back to the
            // posterior mean if the distribution cannot be built.
            Err(_) => stats.posterior_alpha() / (stats.posterior_alpha() + stats.posterior_beta()),
        };
        if sample > best_sample {
            best_sample = sample;
            best = Some(variant.id);
        }
    }
    best
}

fn ucb1(variants: &[Variant], snapshot: &HashMap<Uuid, VariantStats>) -> Option<Uuid> {
    // Forced exploration: any unpulled variant is chosen first, in
    // listed order. This also keeps ln() off the zero-pull domain.
    for variant in variants {
        let pulls = snapshot
            .get(&variant.id)
            .map(|s| s.pulls())
            .unwrap_or_default();
        if pulls == 0 {
            return Some(variant.id);
        }
    }

    let total_pulls: u64 = variants
        .iter()
        .filter_map(|v| snapshot.get(&v.id).map(|s| s.pulls()))
        .sum();
    let log_total = (total_pulls as f64).ln();

    let mut best_score = f64::NEG_INFINITY;
    let mut best = None;
    for variant in variants {
        let stats = snapshot.get(&variant.id).copied().unwrap_or_default();
        let pulls = stats.pulls() as f64;
        let score = stats.conversion_rate() + (2.0 * log_total / pulls).sqrt();
        if score > best_score {
            best_score = score;
            best = Some(variant.id);
        }
    }
    best
}

fn epsilon_greedy<R: Rng>(
    variants: &[Variant],
    snapshot: &HashMap<Uuid, VariantStats>,
    epsilon: f64,
    rng: &mut R,
) -> Option<Uuid> {
    if rng.gen::<f64>() < epsilon {
        let index = rng.gen_range(0..variants.len());
        return Some(variants[index].id);
    }

    let mut best_rate = f64::NEG_INFINITY;
    let mut best = None;
    for variant in variants {
        let rate = snapshot
            .get(&variant.id)
            .map(|s| s.conversion_rate())
            .unwrap_or_default();
        if rate > best_rate {
            best_rate = rate;
            best = Some(variant.id);
        }
    }
    best
}
