//! Uplift computation and winner determination.

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use splitflow_core::types::VariantStats;

use crate::significance::{analyze, SignificanceResult};

/// Relative percentage improvement of the challenger rate over the
/// control rate. By convention 0 when the control rate is 0 — the
/// dashboard needs a stable number, not "undefined".
pub fn uplift_pct(control_rate: f64, test_rate: f64) -> f64 {
    if control_rate == 0.0 {
        0.0
    } else {
        (test_rate - control_rate) / control_rate * 100.0
    }
}

/// Sample-size gate for the verdict.
///
/// Note the OR: a significant result bypasses the visitor floor, so a
/// lucky early read can be declared trustworthy before either side
/// reaches `min_sample_size` (the classic peeking problem in
/// sequential testing). This reproduces the platform's observable
/// behavior; a stricter gate would need a fixed horizon or an
/// alpha-spending correction.
pub fn has_enough_data(
    control_visitors: u64,
    test_visitors: u64,
    min_sample_size: u64,
    is_significant: bool,
) -> bool {
    (control_visitors >= min_sample_size && test_visitors >= min_sample_size) || is_significant
}

/// The "reliable winner" verdict shown to users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WinnerVerdict {
    /// Challenger the test was run against; `None` when the
    /// experiment has no non-control variant.
    pub challenger_id: Option<Uuid>,
    pub significance: SignificanceResult,
    pub has_enough_data: bool,
    pub is_winner: bool,
}

/// Run the significance test for an experiment snapshot and gate it
/// with the minimum-sample-size policy.
///
/// With more than one challenger, the one with the highest observed
/// conversion rate is selected before testing (first-listed wins
/// ties). No correction is applied for testing multiple challengers,
/// which inflates false-positive risk — kept as-is to match the
/// platform's documented behavior.
pub fn evaluate(
    control: &VariantStats,
    challengers: &[(Uuid, VariantStats)],
    min_sample_size: u64,
    confidence_level: f64,
) -> WinnerVerdict {
    let best = challengers.iter().fold(
        None::<&(Uuid, VariantStats)>,
        |best, candidate| match best {
            Some(b) if candidate.1.conversion_rate() <= b.1.conversion_rate() => Some(b),
            _ => Some(candidate),
        },
    );

    let Some((challenger_id, challenger)) = best else {
        let significance =
            SignificanceResult::neutral(confidence_level, control.conversion_rate(), 0.0);
        return WinnerVerdict {
            challenger_id: None,
            significance,
            has_enough_data: false,
            is_winner: false,
        };
    };

    let significance = analyze(
        control.visitors,
        control.conversions,
        challenger.visitors,
        challenger.conversions,
        confidence_level,
    );
    let enough = has_enough_data(
        control.visitors,
        challenger.visitors,
        min_sample_size,
        significance.is_significant,
    );

    debug!(
        challenger = %challenger_id,
        p_value = significance.p_value,
        uplift_pct = significance.uplift_pct,
        has_enough_data = enough,
        "experiment evaluated"
    );

    WinnerVerdict {
        challenger_id: Some(*challenger_id),
        significance,
        has_enough_data: enough,
        is_winner: significance.is_significant,
    }
}
