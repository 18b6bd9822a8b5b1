//! Ordinal placement inside a day bucket.
//!
//! Ordinals are real numbers so a task can be dropped between two others
//! without touching them. Repeated drops into the same gap halve it each
//! time; once no value strictly between the neighbours is representable,
//! the bucket is renumbered `0, 1, 2, ...`.

/// Where a moved task lands.
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    /// The task takes this ordinal; neighbours keep theirs.
    At(f64),
    /// The whole bucket, moved task included, takes these ordinals in
    /// display order.
    Renumbered(Vec<f64>),
}

/// Ordinal for a task appended to a bucket: one past the maximum, or 0.
#[must_use]
pub fn after_last(ordinals: &[f64]) -> f64 {
    ordinals
        .iter()
        .copied()
        .reduce(f64::max)
        .map_or(0.0, |max| max + 1.0)
}

/// Ordinal for a task inserted at `index` among `ordinals` (sorted
/// ascending, moved task excluded). `index` is clamped to the bucket length.
#[must_use]
pub fn place(ordinals: &[f64], index: usize) -> Placement {
    let index = index.min(ordinals.len());
    let before = index.checked_sub(1).and_then(|i| ordinals.get(i)).copied();
    let after = ordinals.get(index).copied();

    let candidate = match (before, after) {
        (None, None) => 0.0,
        (None, Some(first)) => first - 1.0,
        (Some(last), None) => last + 1.0,
        (Some(lo), Some(hi)) => lo + (hi - lo) / 2.0,
    };

    let fits = before.is_none_or(|lo| candidate > lo) && after.is_none_or(|hi| candidate < hi);
    if candidate.is_finite() && fits {
        Placement::At(candidate)
    } else {
        Placement::Renumbered(sequential(ordinals.len() + 1))
    }
}

/// `0, 1, ..., len - 1` as ordinals.
#[must_use]
pub fn sequential(len: usize) -> Vec<f64> {
    (0..len).map(|i| f64::from(u32::try_from(i).unwrap_or(u32::MAX))).collect()
}
