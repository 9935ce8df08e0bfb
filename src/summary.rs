//! Detection summary — pure transform from a raw detection list to the
//! per-class statistics shown under the result image.
//!
//! No infrastructure dependencies; detections in, stats out.

use serde::{Deserialize, Serialize};

/// One predicted object instance as returned by the backend.
///
/// Only `cls` and `conf` are interpreted here. Geometry fields (boxes,
/// masks, keypoints) vary per backend and are carried through untouched
/// for the frontend to draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub cls: i64,
    #[serde(default)]
    pub conf: f64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Aggregated statistics for one resolved class label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassStat {
    pub label: String,
    pub count: usize,
    /// Share of total detections, rounded to 2 decimal places.
    pub percentage: f64,
}

/// Full summary for one prediction run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionSummary {
    /// Per-class stats, ordered by count descending; ties keep the order
    /// the classes were first seen in the input.
    pub classes: Vec<ClassStat>,
    pub total: usize,
    /// mean(conf) * 100 over the whole detection list, rounded to 1
    /// decimal place. Absent when there are no detections.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_confidence_pct: Option<f64>,
}

/// Resolve a class index to its display label.
///
/// Out-of-range (or negative) indices fall back to the literal
/// `Class {index}` so unknown taxonomies still render.
fn class_label(cls: i64, class_names: &[String]) -> String {
    usize::try_from(cls)
        .ok()
        .and_then(|i| class_names.get(i))
        .cloned()
        .unwrap_or_else(|| format!("Class {}", cls))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Build the per-class summary for a detection list.
///
/// Empty input yields an empty summary with no percentage or confidence
/// figures (never divides by zero).
pub fn summarize(detections: &[Detection], class_names: &[String]) -> DetectionSummary {
    if detections.is_empty() {
        return DetectionSummary::default();
    }

    let total = detections.len();

    // Count per resolved label, remembering first-seen order so the sort
    // below stays stable on ties.
    let mut counts: Vec<(String, usize)> = Vec::new();
    for det in detections {
        let label = class_label(det.cls, class_names);
        match counts.iter_mut().find(|(l, _)| *l == label) {
            Some((_, n)) => *n += 1,
            None => counts.push((label, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let classes = counts
        .into_iter()
        .map(|(label, count)| ClassStat {
            label,
            count,
            percentage: round2(count as f64 / total as f64 * 100.0),
        })
        .collect();

    let mean_conf = detections.iter().map(|d| d.conf).sum::<f64>() / total as f64;

    DetectionSummary {
        classes,
        total,
        mean_confidence_pct: Some(round1(mean_conf * 100.0)),
    }
}
