//! Aggregation: fold per-page detections into document-wide [`Counts`].

use crate::detection::Detection;
use crate::output::Counts;

/// Count every detection of every page by label.
///
/// `result.total()` always equals the number of detections passed in.
pub fn aggregate<'a, I>(pages: I) -> Counts
where
    I: IntoIterator<Item = &'a [Detection]>,
{
    pages
        .into_iter()
        .flatten()
        .fold(Counts::default(), |mut counts, det| {
            counts.increment(det.label);
            counts
        })
}
