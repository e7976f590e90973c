//! Per-variant reward aggregates backing the selection policies and
//! the significance analyzer.
//!
//! Counters are mutated through atomic increments only — no coarse
//! lock, no read-modify-write — so concurrent visit/conversion events
//! for the same variant never lose updates.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use splitflow_core::types::VariantStats;

#[derive(Default)]
struct VariantCounters {
    visitors: AtomicU64,
    conversions: AtomicU64,
    /// f64 revenue stored as raw bits; added via a compare-exchange
    /// loop since std has no atomic float.
    revenue_bits: AtomicU64,
}

impl VariantCounters {
    fn add_revenue(&self, value: f64) {
        let mut current = self.revenue_bits.load(Ordering::Relaxed);
        loop {
            let updated = (f64::from_bits(current) + value).to_bits();
            match self.revenue_bits.compare_exchange_weak(
                current,
                updated,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    fn snapshot(&self) -> VariantStats {
        VariantStats {
            visitors: self.visitors.load(Ordering::Relaxed),
            conversions: self.conversions.load(Ordering::Relaxed),
            revenue: f64::from_bits(self.revenue_bits.load(Ordering::Relaxed)),
        }
    }
}

/// Single writer of per-variant stats, keyed by
/// `(experiment_id, variant_id)`.
///
/// Snapshots are point-in-time views that need not be linearizable
/// with in-flight writes; the significance test tolerates slightly
/// stale counts.
pub struct RewardModel {
    counters: DashMap<(Uuid, Uuid), Arc<VariantCounters>>,
}

impl RewardModel {
    pub fn new() -> Self {
        Self {
            counters: DashMap::new(),
        }
    }

    /// Seed zeroed counters for an experiment's variants. Idempotent;
    /// existing counters are left untouched.
    pub fn register(&self, experiment_id: Uuid, variant_ids: &[Uuid]) {
        for variant_id in variant_ids {
            self.counters
                .entry((experiment_id, *variant_id))
                .or_default();
        }
    }

    /// Atomically count a visit. Returns false when the variant was
    /// never registered.
    pub fn record_visit(&self, experiment_id: &Uuid, variant_id: &Uuid) -> bool {
        match self.counters.get(&(*experiment_id, *variant_id)) {
            Some(counters) => {
                counters.visitors.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Atomically count a conversion and accumulate its revenue.
    pub fn record_conversion(&self, experiment_id: &Uuid, variant_id: &Uuid, value: f64) -> bool {
        match self.counters.get(&(*experiment_id, *variant_id)) {
            Some(counters) => {
                counters.conversions.fetch_add(1, Ordering::Relaxed);
                if value != 0.0 {
                    counters.add_revenue(value);
                }
                true
            }
            None => false,
        }
    }

    /// Point-in-time stats for every variant of one experiment.
    pub fn snapshot(&self, experiment_id: &Uuid) -> HashMap<Uuid, VariantStats> {
        self.counters
            .iter()
            .filter(|entry| entry.key().0 == *experiment_id)
            .map(|entry| (entry.key().1, entry.value().snapshot()))
            .collect()
    }

    pub fn snapshot_variant(&self, experiment_id: &Uuid, variant_id: &Uuid) -> Option<VariantStats> {
        self.counters
            .get(&(*experiment_id, *variant_id))
            .map(|counters| counters.snapshot())
    }

    /// Drop all counters for one experiment (administrative reset).
    pub fn reset(&self, experiment_id: &Uuid) {
        self.counters.retain(|key, _| key.0 != *experiment_id);
        debug!(experiment_id = %experiment_id, "reward counters reset");
    }
}

impl Default for RewardModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_snapshot() {
        let model = RewardModel::new();
        let exp = Uuid::new_v4();
        let variant = Uuid::new_v4();
        model.register(exp, &[variant]);

        for _ in 0..10 {
            assert!(model.record_visit(&exp, &variant));
        }
        assert!(model.record_conversion(&exp, &variant, 19.99));
        assert!(model.record_conversion(&exp, &variant, 5.01));

        let stats = model.snapshot_variant(&exp, &variant).unwrap();
        assert_eq!(stats.visitors, 10);
        assert_eq!(stats.conversions, 2);
        assert!((stats.revenue - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_unregistered_variant_rejected() {
        let model = RewardModel::new();
        let exp = Uuid::new_v4();
        assert!(!model.record_visit(&exp, &Uuid::new_v4()));
        assert!(!model.record_conversion(&exp, &Uuid::new_v4(), 1.0));
    }

    #[test]
    fn test_snapshot_scoped_to_experiment() {
        let model = RewardModel::new();
        let exp_a = Uuid::new_v4();
        let exp_b = Uuid::new_v4();
        let variant_a = Uuid::new_v4();
        let variant_b = Uuid::new_v4();
        model.register(exp_a, &[variant_a]);
        model.register(exp_b, &[variant_b]);
        model.record_visit(&exp_a, &variant_a);

        let snapshot = model.snapshot(&exp_a);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[&variant_a].visitors, 1);
    }

    #[test]
    fn test_register_idempotent() {
        let model = RewardModel::new();
        let exp = Uuid::new_v4();
        let variant = Uuid::new_v4();
        model.register(exp, &[variant]);
        model.record_visit(&exp, &variant);
        model.register(exp, &[variant]);
        assert_eq!(model.snapshot_variant(&exp, &variant).unwrap().visitors, 1);
    }

    #[test]
    fn test_reset_clears_experiment() {
        let model = RewardModel::new();
        let exp = Uuid::new_v4();
        let variant = Uuid::new_v4();
        model.register(exp, &[variant]);
        model.record_visit(&exp, &variant);
        model.reset(&exp);
        assert!(model.snapshot_variant(&exp, &variant).is_none());
    }

    #[test]
    fn test_concurrent_increments_lose_nothing() {
        let model = RewardModel::new();
        let exp = Uuid::new_v4();
        let variant = Uuid::new_v4();
        model.register(exp, &[variant]);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..1000 {
                        model.record_visit(&exp, &variant);
                        model.record_conversion(&exp, &variant, 1.0);
                    }
                });
            }
        });

        let stats = model.snapshot_variant(&exp, &variant).unwrap();
        assert_eq!(stats.visitors, 8000);
        assert_eq!(stats.conversions, 8000);
        assert!((stats.revenue - 8000.0).abs() < 1e-6);
    }
}
