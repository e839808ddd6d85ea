//! Reconciliation engine for Strata.
//!
//! When new samples are added to an object that already has a support array,
//! the incoming coordinates must be reconciled against the stored ones:
//! coincident samples update existing rows, everything else appends. Depth
//! supports match within a caller-supplied tolerance; interval supports match
//! only on exact equality of both bounds.
//!
//! Both mergers return the combined support plus a placement vector giving,
//! for each input sample, the row it was written to. Appended rows land at
//! the end of the combined support; the store never re-sorts, so row order
//! reflects arrival order after the initial sorted base.

use strata_types::Interval;
use thiserror::Error;

/// Errors from merge operations.
#[derive(Debug, Error, PartialEq)]
pub enum MergeError {
    /// Depth matching needs a strictly positive collocation tolerance.
    #[error("collocation tolerance must be > 0, got {0}")]
    InvalidTolerance(f64),
}

/// Result alias for merge operations.
pub type MergeResult<T> = Result<T, MergeError>;

/// Outcome of a depth merge.
#[derive(Clone, Debug, PartialEq)]
pub struct DepthMerge {
    /// Existing support followed by appended unmatched samples.
    pub combined: Vec<f64>,
    /// For each input sample, the row it was written to.
    pub placement: Vec<usize>,
    /// Number of rows appended beyond the existing support.
    pub appended: usize,
}

/// Outcome of an interval merge.
#[derive(Clone, Debug, PartialEq)]
pub struct IntervalMerge {
    /// Existing pairs followed by appended unmatched pairs.
    pub combined: Vec<Interval>,
    /// For each input pair, the row it was written to.
    pub placement: Vec<usize>,
    /// Number of rows appended beyond the existing support.
    pub appended: usize,
}

/// Reconcile new depth samples against an existing support.
///
/// A sample matches an existing row when their distance is at most
/// `tolerance` (the boundary is inclusive). Claims resolve globally
/// closest-pair-first with each sample and each row consumed at most once:
/// exact matches always bind before looser ones, so re-adding coordinates
/// that already merged never appends. Distance ties go to the earlier
/// sample, then the earlier row. The existing support may be in any order;
/// appended rows land at the end, so a stored support is only sorted until
/// its first growth. Unmatched samples are appended at the end of the
/// combined support in arrival order.
///
/// An empty existing support is a pure append: the combined support is the
/// input itself.
pub fn merge_depths(
    existing: &[f64],
    incoming: &[f64],
    tolerance: f64,
) -> MergeResult<DepthMerge> {
    if !(tolerance > 0.0) {
        return Err(MergeError::InvalidTolerance(tolerance));
    }

    let mut candidates = Vec::new();
    for (sample_idx, &sample) in incoming.iter().enumerate() {
        for (row, &depth) in existing.iter().enumerate() {
            let distance = (depth - sample).abs();
            if distance <= tolerance {
                candidates.push((distance, sample_idx, row));
            }
        }
    }
    candidates.sort_by(|a, b| {
        a.0.total_cmp(&b.0)
            .then(a.1.cmp(&b.1))
            .then(a.2.cmp(&b.2))
    });

    let mut matched: Vec<Option<usize>> = vec![None; incoming.len()];
    let mut consumed = vec![false; existing.len()];
    for (_, sample_idx, row) in candidates {
        if matched[sample_idx].is_none() && !consumed[row] {
            matched[sample_idx] = Some(row);
            consumed[row] = true;
        }
    }

    let mut combined = existing.to_vec();
    let mut placement = Vec::with_capacity(incoming.len());
    for (sample_idx, &sample) in incoming.iter().enumerate() {
        match matched[sample_idx] {
            Some(row) => placement.push(row),
            None => {
                combined.push(sample);
                placement.push(combined.len() - 1);
            }
        }
    }

    let appended = combined.len() - existing.len();
    Ok(DepthMerge {
        combined,
        placement,
        appended,
    })
}

/// Reconcile new interval pairs against an existing support.
///
/// A pair is identical to an existing one only on exact equality of both
/// bounds; there is no tolerance. The existing support is not required to be
/// sorted. Non-identical pairs are appended as new rows. A pair repeated
/// within `incoming` matches the row its first occurrence created, so
/// repeated bounds update rather than duplicate.
pub fn merge_intervals(existing: &[Interval], incoming: &[Interval]) -> IntervalMerge {
    let mut combined = existing.to_vec();
    let mut placement = Vec::with_capacity(incoming.len());

    for pair in incoming {
        match combined.iter().position(|known| known.bounds_eq(pair)) {
            Some(row) => placement.push(row),
            None => {
                combined.push(*pair);
                placement.push(combined.len() - 1);
            }
        }
    }

    let appended = combined.len() - existing.len();
    IntervalMerge {
        combined,
        placement,
        appended,
    }
}
