//! Per-row labeling relative to the session the row belongs to.
//!
//! Charts, the results table and the inspector all call `classify_row`, so a
//! row can never carry different labels in different views.

use serde::Serialize;

use crate::schema::ResultRow;
use crate::stats::{is_outlier_ct, pick_ct, session_stats, SessionStats, NOISY_THRESHOLD};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Stable,
    Noisy,
    Outlier,
    Error,
    Pending,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Good,
    Warn,
    Error,
    Neutral,
}

#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    pub label: Label,
    pub tone: Tone,
    pub reason: String,
    pub ct: Option<f64>,
    pub noise: f64,
    pub stats: SessionStats,
}

impl Classification {
    fn bare(label: Label, tone: Tone, reason: impl Into<String>) -> Self {
        Self {
            label,
            tone,
            reason: reason.into(),
            ct: None,
            noise: 0.0,
            stats: SessionStats::default(),
        }
    }

    pub(crate) fn unknown() -> Self {
        Self::bare(Label::Unknown, Tone::Neutral, "No data selected.")
    }
}

/// Classify one row against its sibling rows.
///
/// Order matters: an error row short-circuits everything, a row without a
/// finite collapse time is pending, the noisy check runs before the outlier
/// check, and the outlier check overwrites a noisy label when both fire.
/// That last tie-break is inherited behavior, kept as-is.
pub fn classify_row(row: &ResultRow, all_rows: &[ResultRow]) -> Classification {
    if row.error {
        let reason = row
            .error_message
            .clone()
            .unwrap_or_else(|| "Backend could not analyze this file.".to_string());
        return Classification::bare(Label::Error, Tone::Error, reason);
    }

    let Some(ct) = pick_ct(row) else {
        return Classification::bare(
            Label::Pending,
            Tone::Neutral,
            "No collapse-time prediction available for this file.",
        );
    };

    let stats = session_stats(all_rows, row.domain.as_deref());
    let noise = row.noise.unwrap_or(0.0);

    let mut label = Label::Stable;
    let mut tone = Tone::Good;
    let mut reason = "Collapse time is within the typical range for this session.".to_string();

    if noise > NOISY_THRESHOLD {
        label = Label::Noisy;
        tone = Tone::Warn;
        reason = "Noise level is higher than the recommended threshold for this session."
            .to_string();
    }

    if let (Some(mean), Some(std)) = (stats.mean_ct, stats.std_ct) {
        if mean.is_finite() && mean > 0.0 && std.is_finite() && is_outlier_ct(ct, mean, std) {
            label = Label::Outlier;
            tone = Tone::Error;
            reason = "Collapse time is far from the session mean; treat this capture as a \
                      potential outlier or special case."
                .to_string();
        }
    }

    Classification {
        label,
        tone,
        reason,
        ct: Some(ct),
        noise,
        stats,
    }
}
