//! Human-readable capture notes for the inspector drawer.

use serde::Serialize;

use crate::classify::{classify_row, Classification, Label, Tone};
use crate::schema::ResultRow;

#[derive(Debug, Clone, Serialize)]
pub struct InspectorSummary {
    pub title: String,
    pub label: Label,
    pub tone: Tone,
    pub lines: Vec<String>,
    pub domain: String,
}

fn title_for(label: Label) -> &'static str {
    match label {
        Label::Stable => "SignalForge note · Stable capture",
        Label::Noisy => "SignalForge note · Noisy capture",
        Label::Outlier => "SignalForge note · Possible outlier",
        Label::Error => "SignalForge note · Error",
        Label::Pending | Label::Unknown => "SignalForge note",
    }
}

/// Build the inspector note for `row` against its session siblings.
///
/// `row` may be absent (nothing selected yet); the note then degrades to a
/// neutral placeholder.
pub fn inspector_summary(row: Option<&ResultRow>, all_rows: &[ResultRow]) -> InspectorSummary {
    let domain = row
        .and_then(|r| r.domain.clone())
        .unwrap_or_else(|| "signal".to_string());

    let c = match row {
        Some(r) => classify_row(r, all_rows),
        None => Classification::unknown(),
    };
    let (label, tone, ct, noise) = (c.label, c.tone, c.ct, c.noise);

    let mut lines = Vec::new();

    match ct {
        Some(ct) => match c.stats.mean_ct {
            Some(mean) if mean.is_finite() => {
                let delta = ct - mean;
                let direction = if delta.abs() < 1e-3 {
                    "matches the session average".to_string()
                } else if delta > 0.0 {
                    format!("above the session mean of {mean:.3} s")
                } else {
                    format!("below the session mean of {mean:.3} s")
                };
                lines.push(format!("Collapse time: {ct:.3} s ({direction})."));
            }
            _ => lines.push(format!("Collapse time: {ct:.3} s.")),
        },
        None => {
            lines.push("No reliable collapse-time estimate is available for this capture.".into())
        }
    }

    if ct.is_some() {
        if noise <= 0.3 {
            lines.push("Noise level: low, signal looks clean.".into());
        } else if noise <= 0.6 {
            lines.push("Noise level: moderate, acceptable for most analyses.".into());
        } else {
            lines.push(
                "Noise level: high, consider re-recording or applying stronger denoising.".into(),
            );
        }
    }

    lines.push(c.reason);

    InspectorSummary {
        title: title_for(label).to_string(),
        label,
        tone,
        lines,
        domain,
    }
}
