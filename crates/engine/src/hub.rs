//! Facade tying the sticky store, reward model, selection policies,
//! and the analyzer together behind the interface the serving layer
//! and the dashboard consume.

use std::collections::HashMap;

use dashmap::DashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use splitflow_core::config::EngineConfig;
use splitflow_core::error::{SplitError, SplitResult};
use splitflow_core::types::{EventType, ExperimentDefinition, RewardEvent, VariantStats};
use splitflow_stats::uplift::{evaluate, WinnerVerdict};

use crate::policy::select_variant;
use crate::rewards::RewardModel;
use crate::sticky::StickyStore;

pub struct ExperimentHub {
    config: EngineConfig,
    experiments: DashMap<Uuid, ExperimentDefinition>,
    sticky: StickyStore,
    rewards: RewardModel,
}

impl ExperimentHub {
    pub fn new(config: EngineConfig) -> Self {
        info!("experiment hub initialized");
        Self {
            config,
            experiments: DashMap::new(),
            sticky: StickyStore::new(),
            rewards: RewardModel::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate and register an experiment. A definition rejected here
    /// is never assignable; this is the only place configuration
    /// errors surface.
    pub fn activate(&self, definition: ExperimentDefinition) -> SplitResult<()> {
        definition.validate()?;
        let variant_ids: Vec<Uuid> = definition.variants.iter().map(|v| v.id).collect();
        self.rewards.register(definition.id, &variant_ids);
        info!(
            experiment_id = %definition.id,
            name = %definition.name,
            algorithm = ?definition.algorithm,
            variants = definition.variants.len(),
            "experiment activated"
        );
        self.experiments.insert(definition.id, definition);
        Ok(())
    }

    /// Stop assigning for an experiment. Sticky assignments and reward
    /// counters are kept so the dashboard can still analyze it.
    pub fn deactivate(&self, experiment_id: &Uuid) -> SplitResult<()> {
        self.experiments
            .remove(experiment_id)
            .map(|_| ())
            .ok_or(SplitError::ExperimentNotFound(*experiment_id))?;
        info!(experiment_id = %experiment_id, "experiment deactivated");
        Ok(())
    }

    /// Administrative reset: clear sticky assignments and reward
    /// counters for one experiment. An active experiment keeps its
    /// definition and restarts from zeroed counters.
    pub fn reset(&self, experiment_id: &Uuid) {
        self.sticky.reset(experiment_id);
        self.rewards.reset(experiment_id);
        if let Some(definition) = self.experiments.get(experiment_id) {
            let variant_ids: Vec<Uuid> = definition.variants.iter().map(|v| v.id).collect();
            self.rewards.register(*experiment_id, &variant_ids);
        }
        info!(experiment_id = %experiment_id, "experiment reset");
    }

    /// Decide which variant this visitor sees.
    ///
    /// A committed assignment is authoritative and returned as-is. On
    /// a first-time visitor the policy engine picks over a reward
    /// snapshot and the result is committed atomically; any internal
    /// inconsistency falls open to the control variant rather than
    /// surfacing an error to the visitor path.
    pub fn assign(&self, experiment_id: &Uuid, visitor_id: &str) -> SplitResult<Uuid> {
        let definition = self
            .experiments
            .get(experiment_id)
            .ok_or(SplitError::ExperimentNotFound(*experiment_id))?;
        let control_id = definition
            .control()
            .map(|v| v.id)
            .ok_or_else(|| {
                SplitError::InvalidConfiguration(format!(
                    "experiment {experiment_id} has no control variant"
                ))
            })?;

        let chosen = self.sticky.get_or_assign(*experiment_id, visitor_id, || {
            let snapshot = self.rewards.snapshot(experiment_id);
            match select_variant(
                &definition.variants,
                definition.algorithm,
                &snapshot,
                &mut rand::thread_rng(),
            ) {
                Some(id) if definition.variant(&id).is_some() => id,
                _ => {
                    warn!(
                        experiment_id = %experiment_id,
                        "selection failed, serving control"
                    );
                    control_id
                }
            }
        });
        debug!(
            experiment_id = %experiment_id,
            visitor_id = %visitor_id,
            variant_id = %chosen,
            "visitor assigned"
        );
        Ok(chosen)
    }

    /// Feed a visit/conversion event from the ingestion pipeline into
    /// the reward model.
    pub fn record_event(&self, event: &RewardEvent) -> SplitResult<()> {
        let recorded = match event.event_type {
            EventType::Visit => self
                .rewards
                .record_visit(&event.experiment_id, &event.variant_id),
            EventType::Conversion => self.rewards.record_conversion(
                &event.experiment_id,
                &event.variant_id,
                event.value.unwrap_or(0.0),
            ),
        };
        if recorded {
            Ok(())
        } else {
            Err(SplitError::VariantNotFound {
                experiment_id: event.experiment_id,
                variant_id: event.variant_id,
            })
        }
    }

    /// Significance, uplift, and the enough-data gate for one
    /// experiment, computed from a fresh reward snapshot.
    pub fn analyze(&self, experiment_id: &Uuid) -> SplitResult<WinnerVerdict> {
        let definition = self
            .experiments
            .get(experiment_id)
            .ok_or(SplitError::ExperimentNotFound(*experiment_id))?;
        let control = definition.control().ok_or_else(|| {
            SplitError::InvalidConfiguration(format!(
                "experiment {experiment_id} has no control variant"
            ))
        })?;

        let snapshot = self.rewards.snapshot(experiment_id);
        let control_stats = snapshot.get(&control.id).copied().unwrap_or_default();
        let challengers: Vec<(Uuid, VariantStats)> = definition
            .variants
            .iter()
            .filter(|v| !v.is_control)
            .map(|v| (v.id, snapshot.get(&v.id).copied().unwrap_or_default()))
            .collect();

        Ok(evaluate(
            &control_stats,
            &challengers,
            definition.min_sample_size_or(&self.config),
            definition.confidence_level_or(&self.config),
        ))
    }

    /// Current per-variant stats, for dashboard tables and exports.
    pub fn stats(&self, experiment_id: &Uuid) -> SplitResult<HashMap<Uuid, VariantStats>> {
        if !self.experiments.contains_key(experiment_id) {
            return Err(SplitError::ExperimentNotFound(*experiment_id));
        }
        Ok(self.rewards.snapshot(experiment_id))
    }

    pub fn experiment(&self, experiment_id: &Uuid) -> Option<ExperimentDefinition> {
        self.experiments.get(experiment_id).map(|d| d.clone())
    }

    pub fn assignment_count(&self, experiment_id: &Uuid) -> usize {
        self.sticky.assignment_count(experiment_id)
    }
}

impl Default for ExperimentHub {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use splitflow_core::types::{Algorithm, Variant};

    fn variant(weight: u32, is_control: bool) -> Variant {
        Variant {
            id: Uuid::new_v4(),
            name: if is_control { "control" } else { "challenger" }.to_string(),
            weight,
            is_control,
        }
    }

    fn definition(algorithm: Algorithm, variants: Vec<Variant>) -> ExperimentDefinition {
        ExperimentDefinition {
            id: Uuid::new_v4(),
            name: "Checkout button".to_string(),
            variants,
            algorithm,
            min_sample_size: Some(50),
            confidence_level: Some(0.95),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_activate_rejects_invalid_definition() {
        let hub = ExperimentHub::default();
        let def = definition(
            Algorithm::Uniform,
            vec![variant(50, true), variant(40, false)],
        );
        let id = def.id;
        assert!(matches!(
            hub.activate(def),
            Err(SplitError::InvalidConfiguration(_))
        ));
        // Rejected experiments are never assignable.
        assert!(matches!(
            hub.assign(&id, "visitor-1"),
            Err(SplitError::ExperimentNotFound(_))
        ));
    }

    #[test]
    fn test_assign_unknown_experiment() {
        let hub = ExperimentHub::default();
        assert!(matches!(
            hub.assign(&Uuid::new_v4(), "visitor-1"),
            Err(SplitError::ExperimentNotFound(_))
        ));
    }

    #[test]
    fn test_assignment_is_sticky() {
        let hub = ExperimentHub::default();
        let def = definition(
            Algorithm::Uniform,
            vec![variant(50, true), variant(50, false)],
        );
        let id = def.id;
        hub.activate(def).unwrap();

        let first = hub.assign(&id, "visitor-1").unwrap();
        for _ in 0..50 {
            assert_eq!(hub.assign(&id, "visitor-1").unwrap(), first);
        }
        assert_eq!(hub.assignment_count(&id), 1);
    }

    #[test]
    fn test_fail_open_serves_control() {
        let hub = ExperimentHub::default();
        // Inject a degenerate definition past activation validation:
        // zero total weight makes the uniform policy return nothing.
        let control = variant(0, true);
        let control_id = control.id;
        let def = definition(Algorithm::Uniform, vec![control, variant(0, false)]);
        let id = def.id;
        hub.experiments.insert(id, def);

        assert_eq!(hub.assign(&id, "visitor-1").unwrap(), control_id);
    }

    #[test]
    fn test_event_flow_to_winner_verdict() {
        let hub = ExperimentHub::default();
        let control = variant(50, true);
        let challenger = variant(50, false);
        let (control_id, challenger_id) = (control.id, challenger.id);
        let def = definition(Algorithm::Uniform, vec![control, challenger]);
        let id = def.id;
        hub.activate(def).unwrap();

        let visit = |variant_id: Uuid| RewardEvent {
            experiment_id: id,
            variant_id,
            visitor_id: "v".to_string(),
            event_type: EventType::Visit,
            value: None,
        };
        let conversion = |variant_id: Uuid| RewardEvent {
            experiment_id: id,
            variant_id,
            visitor_id: "v".to_string(),
            event_type: EventType::Conversion,
            value: Some(12.50),
        };

        for _ in 0..1000 {
            hub.record_event(&visit(control_id)).unwrap();
            hub.record_event(&visit(challenger_id)).unwrap();
        }
        for _ in 0..100 {
            hub.record_event(&conversion(control_id)).unwrap();
        }
        for _ in 0..150 {
            hub.record_event(&conversion(challenger_id)).unwrap();
        }

        let verdict = hub.analyze(&id).unwrap();
        assert_eq!(verdict.challenger_id, Some(challenger_id));
        assert!(verdict.is_winner);
        assert!(verdict.has_enough_data);
        assert!((verdict.significance.uplift_pct - 50.0).abs() < 1e-9);

        let stats = hub.stats(&id).unwrap();
        assert!((stats[&challenger_id].revenue - 150.0 * 12.50).abs() < 1e-6);
    }

    #[test]
    fn test_record_event_unknown_variant() {
        let hub = ExperimentHub::default();
        let def = definition(
            Algorithm::Uniform,
            vec![variant(50, true), variant(50, false)],
        );
        let id = def.id;
        hub.activate(def).unwrap();

        let event = RewardEvent {
            experiment_id: id,
            variant_id: Uuid::new_v4(),
            visitor_id: "v".to_string(),
            event_type: EventType::Visit,
            value: None,
        };
        assert!(matches!(
            hub.record_event(&event),
            Err(SplitError::VariantNotFound { .. })
        ));
    }

    #[test]
    fn test_analyze_sparse_data_is_neutral() {
        let hub = ExperimentHub::default();
        let def = definition(
            Algorithm::ThompsonSampling,
            vec![variant(50, true), variant(50, false)],
        );
        let id = def.id;
        hub.activate(def).unwrap();

        let verdict = hub.analyze(&id).unwrap();
        assert_eq!(verdict.significance.p_value, 1.0);
        assert!(!verdict.is_winner);
        assert!(!verdict.has_enough_data);
    }

    #[test]
    fn test_reset_clears_assignments_and_counters() {
        let hub = ExperimentHub::default();
        let control = variant(100, true);
        let control_id = control.id;
        let def = definition(Algorithm::Uniform, vec![control, variant(0, false)]);
        let id = def.id;
        hub.activate(def).unwrap();

        hub.assign(&id, "visitor-1").unwrap();
        hub.record_event(&RewardEvent {
            experiment_id: id,
            variant_id: control_id,
            visitor_id: "visitor-1".to_string(),
            event_type: EventType::Visit,
            value: None,
        })
        .unwrap();

        hub.reset(&id);
        assert_eq!(hub.assignment_count(&id), 0);
        assert_eq!(hub.stats(&id).unwrap()[&control_id].visitors, 0);
    }

    #[test]
    fn test_deactivate_stops_assignment() {
        let hub = ExperimentHub::default();
        let def = definition(
            Algorithm::Uniform,
            vec![variant(50, true), variant(50, false)],
        );
        let id = def.id;
        hub.activate(def).unwrap();
        hub.deactivate(&id).unwrap();
        assert!(matches!(
            hub.assign(&id, "visitor-1"),
            Err(SplitError::ExperimentNotFound(_))
        ));
    }
}
