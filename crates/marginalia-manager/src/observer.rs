//! Observation hooks.
//!
//! The engine does not own a metrics backend. It reports what it sees to a
//! [`RangesObserver`]; the default one turns the reports into `tracing`
//! events on the `marginalia::metrics` target, where a subscriber can pick
//! them up.

use marginalia_core::ChangeId;
use tracing::{info, warn};

/// Receives observations made while applying updates.
pub trait RangesObserver {
    /// A tracked change that existed before and after the batch changed size.
    fn tracked_change_resized(&self, change_id: &ChangeId, before: usize, after: usize);

    /// The total number of ranges went down.
    fn range_count_decreased(&self, before: usize, after: usize);

    /// The batch collapsed ranges.
    fn ranges_collapsed(&self, project_id: &str, doc_id: &str);
}

/// Observer that logs every observation.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl RangesObserver for TracingObserver {
    fn tracked_change_resized(&self, change_id: &ChangeId, before: usize, after: usize) {
        let delta = after as i64 - before as i64;
        info!(target: "marginalia::metrics", %change_id, delta, "tracked change resized");
    }

    fn range_count_decreased(&self, before: usize, after: usize) {
        info!(target: "marginalia::metrics", before, after, removed = before - after, "range count decreased");
    }

    fn ranges_collapsed(&self, project_id: &str, doc_id: &str) {
        warn!(target: "marginalia::metrics", project_id, doc_id, "ranges collapsed");
    }
}

impl<O: RangesObserver + ?Sized> RangesObserver for &O {
    fn tracked_change_resized(&self, change_id: &ChangeId, before: usize, after: usize) {
        (**self).tracked_change_resized(change_id, before, after)
    }

    fn range_count_decreased(&self, before: usize, after: usize) {
        (**self).range_count_decreased(before, after)
    }

    fn ranges_collapsed(&self, project_id: &str, doc_id: &str) {
        (**self).ranges_collapsed(project_id, doc_id)
    }
}
