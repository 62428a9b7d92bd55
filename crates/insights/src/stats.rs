//! Per-session statistics over a set of result rows.
//!
//! Stats are always recomputed from the current row set; nothing here is
//! cached, so labels derived from them can never go stale when rows change.

use serde::Serialize;

use crate::schema::ResultRow;

/// Noise fraction above which a capture counts as noisy.
pub const NOISY_THRESHOLD: f64 = 0.6;

/// Standard deviations from the session mean at which a capture becomes an
/// outlier.
pub const OUTLIER_Z: f64 = 2.5;

/// Ratio-to-mean bounds for the outlier check, inclusive on both ends.
pub const OUTLIER_RATIO_LOW: f64 = 0.3;
pub const OUTLIER_RATIO_HIGH: f64 = 3.0;

/// Below this the std deviation is treated as zero when computing z-scores.
pub const STD_EPSILON: f64 = 1e-6;

/// Collapse-time extraction: `ct_pred` wins over `kitab_ct` wins over
/// `ct_proxy`; the first finite value is returned.
pub fn pick_ct(row: &ResultRow) -> Option<f64> {
    [row.ct_pred, row.kitab_ct, row.ct_proxy]
        .into_iter()
        .flatten()
        .find(|v| v.is_finite())
}

/// Summary statistics over the rows of one session, optionally scoped to a
/// single domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStats {
    pub count: usize,
    pub mean_ct: Option<f64>,
    pub min_ct: Option<f64>,
    pub max_ct: Option<f64>,
    pub std_ct: Option<f64>,
    pub noisy_count: usize,
    pub outlier_names: Vec<String>,
}

/// Compute session stats over `rows`.
///
/// Scoping: error rows and rows without a finite collapse time are excluded.
/// When `domain` is given, rows carrying a different domain are excluded too;
/// rows without a domain always stay in scope.
pub fn session_stats(rows: &[ResultRow], domain: Option<&str>) -> SessionStats {
    let scoped: Vec<&ResultRow> = rows
        .iter()
        .filter(|row| {
            if row.error {
                return false;
            }
            if let (Some(want), Some(have)) = (domain, row.domain.as_deref()) {
                if want != have {
                    return false;
                }
            }
            pick_ct(row).is_some()
        })
        .collect();

    let values: Vec<f64> = scoped.iter().filter_map(|row| pick_ct(row)).collect();
    if values.is_empty() {
        return SessionStats::default();
    }

    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let std = if count > 1 {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        var.sqrt()
    } else {
        0.0
    };

    let noisy_count = scoped
        .iter()
        .filter(|row| row.noise.unwrap_or(0.0) > NOISY_THRESHOLD)
        .count();

    let mut outlier_names = Vec::new();
    for row in &scoped {
        let Some(ct) = pick_ct(row) else { continue };
        if is_outlier_ct(ct, mean, std) {
            outlier_names.push(row.name.clone());
        }
    }

    SessionStats {
        count,
        mean_ct: Some(mean),
        min_ct: Some(min),
        max_ct: Some(max),
        std_ct: Some(std),
        noisy_count,
        outlier_names,
    }
}

/// The shared outlier predicate: far from the mean in z-score terms, or a
/// ratio to the mean at or beyond the inclusive bounds.
pub(crate) fn is_outlier_ct(ct: f64, mean: f64, std: f64) -> bool {
    let z = if std > STD_EPSILON { (ct - mean) / std } else { 0.0 };
    let ratio = if mean != 0.0 { ct / mean } else { 1.0 };
    z.abs() >= OUTLIER_Z || ratio <= OUTLIER_RATIO_LOW || ratio >= OUTLIER_RATIO_HIGH
}
