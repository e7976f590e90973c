//! Two-proportion z-test between a control and a challenger variant.

use serde::{Deserialize, Serialize};

use crate::uplift::uplift_pct;

/// Outcome of the significance test. Derived on demand from a reward
/// snapshot, never persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SignificanceResult {
    /// Two-tailed p-value, in [0, 1].
    pub p_value: f64,
    pub is_significant: bool,
    pub confidence_level: f64,
    pub control_rate: f64,
    pub test_rate: f64,
    pub uplift_pct: f64,
}

impl SignificanceResult {
    /// Neutral, non-significant result used for degenerate inputs
    /// (zero visitors on either side). Sparse data must never crash
    /// the dashboard or fabricate significance.
    pub fn neutral(confidence_level: f64, control_rate: f64, test_rate: f64) -> Self {
        Self {
            p_value: 1.0,
            is_significant: false,
            confidence_level,
            control_rate,
            test_rate,
            uplift_pct: uplift_pct(control_rate, test_rate),
        }
    }
}

/// Pooled two-proportion z-test of challenger conversion rate against
/// control, two-tailed.
///
/// Degenerate inputs (zero visitors on either side, zero standard
/// error) yield a neutral result rather than an error.
pub fn analyze(
    control_visitors: u64,
    control_conversions: u64,
    test_visitors: u64,
    test_conversions: u64,
    confidence_level: f64,
) -> SignificanceResult {
    if control_visitors == 0 || test_visitors == 0 {
        let control_rate = rate(control_conversions, control_visitors);
        let test_rate = rate(test_conversions, test_visitors);
        return SignificanceResult::neutral(confidence_level, control_rate, test_rate);
    }

    let n1 = control_visitors as f64;
    let n2 = test_visitors as f64;
    let p1 = control_conversions as f64 / n1;
    let p2 = test_conversions as f64 / n2;

    let pooled = (control_conversions + test_conversions) as f64 / (n1 + n2);
    let se = (pooled * (1.0 - pooled) * (1.0 / n1 + 1.0 / n2)).sqrt();

    let z = if se == 0.0 { 0.0 } else { (p2 - p1) / se };
    let p_value = (2.0 * (1.0 - normal_cdf(z.abs()))).clamp(0.0, 1.0);

    SignificanceResult {
        p_value,
        is_significant: p_value < (1.0 - confidence_level),
        confidence_level,
        control_rate: p1,
        test_rate: p2,
        uplift_pct: uplift_pct(p1, p2),
    }
}

fn rate(conversions: u64, visitors: u64) -> f64 {
    if visitors == 0 {
        0.0
    } else {
        conversions as f64 / visitors as f64
    }
}

/// Standard normal cumulative distribution function.
fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Abramowitz–Stegun 7.1.26 error function approximation, accurate to
/// about 1.5e-7 — comfortably within the 3-decimal p-value contract.
fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}
