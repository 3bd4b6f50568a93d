//! Stair-step recall/precision sampling and 11-point interpolation.

use retrieval_pipeline::RetrievalResult;
use serde::Serialize;
use tracing::debug;

use crate::corpus::Relevance;

pub const LEVEL_COUNT: usize = 11;

pub const RECALL_LEVELS: [f64; LEVEL_COUNT] =
    [0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0];

/// Sample taken at a rank holding a relevant document. `rank` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RecallPrecisionPoint {
    pub rank: usize,
    pub recall: f64,
    pub precision: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerQueryCurve {
    pub points: Vec<RecallPrecisionPoint>,
    pub interpolated: [f64; LEVEL_COUNT],
}

impl PerQueryCurve {
    pub fn evaluate(result: &RetrievalResult, relevance: &Relevance) -> Self {
        let points = recall_precision_points(result, relevance);
        let interpolated = interpolate_precision(&points);
        Self {
            points,
            interpolated,
        }
    }
}

pub fn recall_precision_points(
    result: &RetrievalResult,
    relevance: &Relevance,
) -> Vec<RecallPrecisionPoint> {
    let relevant_total = relevance.relevant_count();
    if relevant_total == 0 {
        return Vec::new();
    }

    let mut hits = 0usize;
    let mut points = Vec::new();
    for (offset, document) in result.iter().enumerate() {
        if !relevance.is_relevant(&document.document_id) {
            continue;
        }
        hits = hits.saturating_add(1);
        let rank = offset.saturating_add(1);
        let point = RecallPrecisionPoint {
            rank,
            recall: hits as f64 / relevant_total as f64,
            precision: hits as f64 / rank as f64,
        };
        debug!(
            rank,
            document = document.document_id.as_str(),
            recall = point.recall,
            precision = point.precision,
            "Relevant document retrieved"
        );
        points.push(point);
    }
    points
}

/// Interpolated precision per canonical recall level. Level `i` takes the best
/// sample with recall in `[level_i, level_{i+1})` (the top level is `[1.0, 1.0]`)
/// and never drops below level `i + 1`.
pub fn interpolate_precision(points: &[RecallPrecisionPoint]) -> [f64; LEVEL_COUNT] {
    let mut interpolated = [0.0; LEVEL_COUNT];
    for level in (0..LEVEL_COUNT).rev() {
        let lower = RECALL_LEVELS[level];
        let upper = RECALL_LEVELS.get(level + 1).copied();
        let floor = interpolated.get(level + 1).copied().unwrap_or(0.0);

        interpolated[level] = points
            .iter()
            .filter(|point| {
                point.recall >= lower && upper.map_or(point.recall <= lower, |up| point.recall < up)
            })
            .map(|point| point.precision)
            .fold(floor, f64::max);
    }
    interpolated
}

/// Elementwise mean; an empty input averages to zeros.
pub fn average_curves<'a, I>(curves: I) -> [f64; LEVEL_COUNT]
where
    I: IntoIterator<Item = &'a [f64; LEVEL_COUNT]>,
{
    let mut sums = [0.0; LEVEL_COUNT];
    let mut count = 0usize;
    for curve in curves {
        for (sum, value) in sums.iter_mut().zip(curve) {
            *sum += value;
        }
        count = count.saturating_add(1);
    }
    if count > 0 {
        for sum in &mut sums {
            *sum /= count as f64;
        }
    }
    sums
}
