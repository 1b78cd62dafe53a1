//! The ranges manager.
//!
//! Ties the range transformer and the history projector together for one
//! batch of updates on one document. Inputs are never modified: every call
//! works on a copy and returns fresh ranges, so a failed call leaves the
//! caller free to discard the batch.

use crate::config::{ApplyOptions, RangesConfig};
use crate::observer::{RangesObserver, TracingObserver};
use marginalia_core::{
    ChangeId, ChangeMetadata, ClassifiedOp, IdSeed, IndexedText, Op, RangeCounts, Ranges,
    RangesError, Result, Update,
};
use marginalia_history::{
    cropped_comment_ops, history_op, history_op_for_comment, plain_history_op, HistoryOp,
    HistoryUpdate,
};
use marginalia_tracker::RangesTracker;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, error, trace, warn};

/// Outcome of [`RangesManager::apply_update`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApplyUpdateResult {
    pub new_ranges: Ranges,
    pub history_updates: Vec<HistoryUpdate>,
    /// Ranges lost their text or disappeared. The caller should warn and
    /// have clients reload their ranges.
    pub ranges_were_collapsed: bool,
}

/// Entry point of the engine.
#[derive(Clone, Debug, Default)]
pub struct RangesManager<O: RangesObserver = TracingObserver> {
    config: RangesConfig,
    observer: O,
}

impl RangesManager<TracingObserver> {
    pub fn new(config: RangesConfig) -> Self {
        Self::with_observer(config, TracingObserver)
    }
}

impl<O: RangesObserver> RangesManager<O> {
    pub fn with_observer(config: RangesConfig, observer: O) -> Self {
        Self { config, observer }
    }

    pub fn config(&self) -> &RangesConfig {
        &self.config
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Apply a batch of updates to `ranges`.
    ///
    /// The updates, applied in order to the previous text, must produce
    /// `new_doc_lines`; the resulting ranges are checked against them.
    pub fn apply_update(
        &self,
        project_id: &str,
        doc_id: &str,
        ranges: &Ranges,
        updates: &[Update],
        new_doc_lines: &[String],
        options: ApplyOptions,
    ) -> Result<ApplyUpdateResult> {
        let counts_before = ranges.counts();
        let seed = derive_seed(doc_id, ranges, updates)
            .map_err(|err| log_failure(project_id, doc_id, err))?;
        let mut tracker = RangesTracker::with_id_seed(ranges.clone(), seed);

        let applied = self.apply_batch(project_id, doc_id, &mut tracker, updates, options);
        // Observed on every exit path, including a failed batch.
        let counts_after = self.observe_changes(ranges, &tracker);
        let history_updates = applied?;

        tracker
            .validate(&IndexedText::from_lines(new_doc_lines))
            .map_err(|err| log_failure(project_id, doc_id, err))?;
        let new_ranges = tracker.into_ranges();

        let ranges_were_collapsed = counts_after.empty > counts_before.empty
            || counts_after.total + 1 < counts_before.total;
        if ranges_were_collapsed {
            self.observer.ranges_collapsed(project_id, doc_id);
        }

        debug!(
            project_id,
            doc_id,
            changes = new_ranges.changes.len(),
            comments = new_ranges.comments.len(),
            history_updates = history_updates.len(),
            ranges_were_collapsed,
            "applied updates to ranges"
        );

        Ok(ApplyUpdateResult {
            new_ranges,
            history_updates,
            ranges_were_collapsed,
        })
    }

    /// Drop the accepted changes from tracking. Everything else is kept
    /// exactly as it was.
    pub fn accept_changes(
        &self,
        project_id: &str,
        doc_id: &str,
        change_ids: &[ChangeId],
        ranges: &Ranges,
        lines: &[String],
    ) -> Ranges {
        debug!(
            project_id,
            doc_id,
            accepted = change_ids.len(),
            doc_length = marginalia_core::text::doc_length(lines),
            "accepting changes in ranges"
        );
        ranges.without_changes(change_ids)
    }

    /// Remove a comment thread's range.
    pub fn delete_comment(&self, comment_id: &str, ranges: &Ranges) -> Ranges {
        debug!(comment_id, "deleting comment from ranges");
        ranges.without_comment(comment_id)
    }

    fn apply_batch(
        &self,
        project_id: &str,
        doc_id: &str,
        tracker: &mut RangesTracker,
        updates: &[Update],
        options: ApplyOptions,
    ) -> Result<Vec<HistoryUpdate>> {
        let mut history_updates = Vec::new();

        for update in updates {
            tracker.set_track_changes(update.is_tracked());
            if let Some(tc) = &update.meta.tc {
                tracker.set_id_seed(IdSeed::from(tc.as_str()));
            }
            let metadata = ChangeMetadata::new(update.meta.user_id.clone(), update.meta.ts);

            let mut history_ops: Vec<HistoryOp> = Vec::new();
            for ClassifiedOp { op, kind, flags } in update.classify() {
                trace!(
                    doc_id,
                    ?kind,
                    position = op.position(),
                    tracked = flags.tracked,
                    undo = flags.undo,
                    "applying op"
                );
                let mut cropped = Vec::new();
                if options.history_ranges_support {
                    history_ops.push(history_op(op, tracker.comments(), tracker.changes()));
                    match op {
                        Op::Delete(delete) if flags.tracked => {
                            cropped = cropped_comment_ops(delete, tracker.comments());
                        }
                        _ => {}
                    }
                } else if let Some(history_op) = plain_history_op(op) {
                    history_ops.push(history_op);
                }

                tracker
                    .apply_op(op, &metadata)
                    .map_err(|err| log_failure(project_id, doc_id, err))?;

                for comment in &cropped {
                    history_ops.push(HistoryOp::Comment(history_op_for_comment(
                        comment,
                        tracker.changes(),
                    )));
                }
            }

            if !history_ops.is_empty() {
                history_updates.push(update.with_ops(history_ops));
            }
            self.check_limits(project_id, doc_id, tracker)?;
        }

        Ok(history_updates)
    }

    /// Report tracked changes whose size changed and a drop in the number
    /// of ranges. Returns the counts of the tracker's ranges.
    fn observe_changes(&self, before: &Ranges, tracker: &RangesTracker) -> RangeCounts {
        let sizes_before: HashMap<&ChangeId, usize> =
            before.changes.iter().map(|c| (&c.id, c.len())).collect();
        for change in tracker.changes() {
            if let Some(&size) = sizes_before.get(&change.id) {
                if size != change.len() {
                    self.observer
                        .tracked_change_resized(&change.id, size, change.len());
                }
            }
        }

        let counts_before = before.counts();
        let counts_after = RangeCounts::of(tracker.changes(), tracker.comments());
        if counts_after.total < counts_before.total {
            self.observer
                .range_count_decreased(counts_before.total, counts_after.total);
        }
        counts_after
    }

    fn check_limits(&self, project_id: &str, doc_id: &str, tracker: &RangesTracker) -> Result<()> {
        let comments = tracker.comments().len();
        let changes = tracker.changes().len();
        if comments > self.config.max_comments || changes > self.config.max_changes {
            warn!(project_id, doc_id, comments, changes, "too many comments or tracked changes");
            return Err(RangesError::TooManyRanges {
                comments,
                changes,
                max_comments: self.config.max_comments,
                max_changes: self.config.max_changes,
            });
        }
        Ok(())
    }
}

fn log_failure(project_id: &str, doc_id: &str, err: RangesError) -> RangesError {
    error!(project_id, doc_id, error = %err, kind = ?err.kind(), "failed to apply updates to ranges");
    err
}

/// Seed for changes created by updates without a track-changes id.
///
/// Derived from the call inputs so that applying the same batch twice gives
/// the same ids.
fn derive_seed(doc_id: &str, ranges: &Ranges, updates: &[Update]) -> Result<IdSeed> {
    let mut input = doc_id.as_bytes().to_vec();
    input.extend(serde_json::to_vec(&(ranges, updates))?);
    Ok(IdSeed::derive(&input))
}
