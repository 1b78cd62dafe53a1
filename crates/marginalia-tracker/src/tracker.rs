//! Range transformer.
//!
//! Keeps a document's tracked changes and comments in step with the edits
//! applied to its text. Tracked changes follow the usual word processor
//! rules:
//!
//! - Text inserted at a tracked delete goes to the left of the delete.
//! - Deleting text that is itself a tracked insert does not create a delete
//!   marker; the two cancel out where they overlap.
//! - Deletes overlapping other tracked deletes are merged into one.
//! - Inserts by one user never merge with inserts by another. Inserting in
//!   the middle of someone else's tracked insert splits it in two.
//!
//! Each pass works on the tracker's own copy of the ranges. Changes are
//! addressed by index while the pass runs; removals and additions are
//! collected and applied once the walk is over, and the collection is then
//! re-sorted so the next pass starts from an ordered sequence again.

use marginalia_core::text::{insert_at, slice, slice_from, slice_to, utf16_len};
use marginalia_core::{
    ChangeId, ChangeMetadata, Comment, CommentOp, DeleteOp, IdGenerator, IdSeed, IndexedText,
    InsertOp, Op, Ranges, RangesError, Result, TrackedChange, TrackedOp,
};
use std::collections::HashSet;
use tracing::trace;

/// Pending edit to the text of an incoming delete.
///
/// Offsets are relative to the start of the delete.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Modification {
    /// Text of an absorbed tracked delete.
    Insert { p: usize, i: String },
    /// Text that cancelled out against a tracked insert.
    Delete { p: usize, d: String },
}

impl Modification {
    fn p(&self) -> usize {
        match self {
            Modification::Insert { p, .. } | Modification::Delete { p, .. } => *p,
        }
    }
}

/// Tracks the comments and tracked changes of one document.
#[derive(Clone, Debug)]
pub struct RangesTracker {
    changes: Vec<TrackedChange>,
    comments: Vec<Comment>,
    track_changes: bool,
    ids: IdGenerator,
}

impl RangesTracker {
    /// Create a tracker over existing ranges, with a freshly generated id seed.
    pub fn new(ranges: Ranges) -> Self {
        Self::with_id_seed(ranges, IdSeed::generate())
    }

    /// Create a tracker whose new change ids start from `seed`.
    pub fn with_id_seed(ranges: Ranges, seed: IdSeed) -> Self {
        let Ranges { changes, comments } = ranges;
        Self {
            changes,
            comments,
            track_changes: false,
            ids: IdGenerator::new(seed),
        }
    }

    pub fn track_changes(&self) -> bool {
        self.track_changes
    }

    pub fn set_track_changes(&mut self, enabled: bool) {
        self.track_changes = enabled;
    }

    pub fn id_seed(&self) -> &IdSeed {
        self.ids.seed()
    }

    /// Use `seed` for the ids of changes created from now on.
    pub fn set_id_seed(&mut self, seed: IdSeed) {
        self.ids.reseed(seed);
    }

    pub fn changes(&self) -> &[TrackedChange] {
        &self.changes
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn into_ranges(self) -> Ranges {
        Ranges::new(self.changes, self.comments)
    }

    // === Lookups ===

    pub fn get_comment(&self, comment_id: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == comment_id)
    }

    pub fn get_change(&self, change_id: &ChangeId) -> Option<&TrackedChange> {
        self.changes.iter().find(|c| &c.id == change_id)
    }

    pub fn get_changes(&self, ids: &[ChangeId]) -> Vec<&TrackedChange> {
        let ids: HashSet<&ChangeId> = ids.iter().collect();
        self.changes.iter().filter(|c| ids.contains(&c.id)).collect()
    }

    /// Total length of text hidden by tracked deletes.
    pub fn tracked_deletes_length(&self) -> usize {
        self.changes
            .iter()
            .filter_map(|c| c.op.deleted())
            .map(utf16_len)
            .sum()
    }

    // === Direct edits ===

    /// Remove a comment. Returns it if it existed.
    pub fn remove_comment_id(&mut self, comment_id: &str) -> Option<Comment> {
        let idx = self.comments.iter().position(|c| c.id == comment_id)?;
        Some(self.comments.remove(idx))
    }

    /// Move every comment with this id to a new position and text.
    pub fn move_comment_id(&mut self, comment_id: &str, position: usize, text: &str) {
        for comment in self.comments.iter_mut().filter(|c| c.id == comment_id) {
            comment.op.p = position;
            comment.op.c = text.to_string();
        }
        self.sort_comments();
    }

    pub fn remove_change_id(&mut self, change_id: &ChangeId) {
        self.remove_change_ids(std::slice::from_ref(change_id));
    }

    pub fn remove_change_ids(&mut self, ids: &[ChangeId]) {
        if ids.is_empty() {
            return;
        }
        let ids: HashSet<&ChangeId> = ids.iter().collect();
        self.changes.retain(|c| !ids.contains(&c.id));
    }

    /// Check that every tracked insert and comment still matches `text`.
    pub fn validate(&self, text: &IndexedText) -> Result<()> {
        for change in &self.changes {
            if let Some(inserted) = change.op.inserted() {
                let start = change.start();
                if text.slice(start, start + utf16_len(inserted)) != inserted {
                    return Err(RangesError::InsertionMismatch {
                        change_id: change.id.to_string(),
                        position: start,
                    });
                }
            }
        }
        for comment in &self.comments {
            if text.slice(comment.start(), comment.end()) != comment.op.c {
                return Err(RangesError::CommentMismatch {
                    comment_id: comment.id.clone(),
                    position: comment.start(),
                });
            }
        }
        Ok(())
    }

    // === Applying ops ===

    /// Apply an op that has already been applied to the document text.
    pub fn apply_op(&mut self, op: &Op, metadata: &ChangeMetadata) -> Result<()> {
        match op {
            Op::Insert(insert) => {
                self.apply_insert_to_changes(insert, metadata);
                self.apply_insert_to_comments(insert);
            }
            Op::Delete(delete) => {
                self.apply_delete_to_changes(delete, metadata)?;
                // Comments see the delete as it was sent, not as it merged.
                self.apply_delete_to_comments(delete)?;
            }
            Op::Comment(comment) => self.add_comment(comment, metadata),
        }
        self.sort_comments();
        Ok(())
    }

    pub fn apply_ops(&mut self, ops: &[Op], metadata: &ChangeMetadata) -> Result<()> {
        for op in ops {
            self.apply_op(op, metadata)?;
        }
        Ok(())
    }

    fn add_comment(&mut self, op: &CommentOp, metadata: &ChangeMetadata) {
        if self.get_comment(&op.t).is_some() {
            self.move_comment_id(&op.t, op.p, &op.c);
        } else {
            self.comments
                .push(Comment::new(op.clone(), Some(metadata.clone())));
        }
    }

    fn apply_insert_to_comments(&mut self, op: &InsertOp) {
        let op_len = op.len();
        for comment in &mut self.comments {
            let start = comment.start();
            if op.p <= start {
                comment.op.p += op_len;
            } else if op.p < comment.end() {
                comment.op.c = insert_at(&comment.op.c, op.p - start, &op.i);
            }
        }
    }

    fn apply_delete_to_comments(&mut self, op: &DeleteOp) -> Result<()> {
        let op_start = op.p;
        let op_len = op.len();
        let op_end = op_start + op_len;
        for comment in &mut self.comments {
            let comment_start = comment.start();
            let comment_len = comment.len();
            let comment_end = comment_start + comment_len;
            if op_end <= comment_start {
                comment.op.p -= op_len;
            } else if op_start >= comment_end {
                continue;
            } else {
                let before = if op_start <= comment_start {
                    ""
                } else {
                    slice_to(&comment.op.c, op_start - comment_start)
                };
                let after = if op_end >= comment_end {
                    ""
                } else {
                    slice_from(&comment.op.c, op_end - comment_start)
                };

                let before_len = utf16_len(before);
                let deleted_comment =
                    slice(&comment.op.c, before_len, comment_len - utf16_len(after));
                let offset = comment_start.saturating_sub(op_start);
                let deleted_op_content =
                    slice_to(slice_from(&op.d, offset), utf16_len(deleted_comment));
                if deleted_comment != deleted_op_content {
                    return Err(RangesError::DeletedCommentMismatch {
                        comment_id: comment.id.clone(),
                    });
                }

                let remaining = format!("{}{}", before, after);
                comment.op.p = comment_start.min(op_start);
                comment.op.c = remaining;
            }
        }
        Ok(())
    }

    fn apply_insert_to_changes(&mut self, op: &InsertOp, metadata: &ChangeMetadata) {
        let op_start = op.p;
        let op_len = op.len();
        let op_end = op_start + op_len;
        let undoing = op.u;
        let track = self.track_changes;

        let mut already_merged = false;
        let mut previous: Option<usize> = None;
        let mut removed: Vec<usize> = Vec::new();
        let mut split_off: Vec<(TrackedOp, ChangeMetadata)> = Vec::new();
        let mut deletes_at_op_position: Vec<usize> = Vec::new();

        for idx in 0..self.changes.len() {
            let change_start = self.changes[idx].start();

            if self.changes[idx].op.is_delete() {
                if op_start < change_start {
                    *self.changes[idx].op.p_mut() += op_len;
                } else if op_start == change_start {
                    let rejects = !already_merged
                        && undoing
                        && self.changes[idx].op.text().starts_with(op.i.as_str());
                    if rejects {
                        // Undoing a tracked delete: the insert restores the
                        // start of the deleted text, so trim it off the delete.
                        let change = &mut self.changes[idx];
                        let rest = slice_from(change.op.text(), op_len).to_string();
                        *change.op.text_mut() = rest;
                        *change.op.p_mut() += op_len;
                        if change.op.is_empty() {
                            removed.push(idx);
                        }
                        already_merged = true;
                        trace!(change_id = %change.id, "insert rejects tracked delete");

                        // Deletes seen at this position were pushed past the
                        // insert; they belong before the rejected text.
                        for &j in &deletes_at_op_position {
                            *self.changes[j].op.p_mut() -= op_len;
                        }
                    } else {
                        *self.changes[idx].op.p_mut() += op_len;
                        if !already_merged {
                            deletes_at_op_position.push(idx);
                        }
                    }
                }
            } else {
                let change_end = change_start + self.changes[idx].len();
                let overlapping = op_start >= change_start && op_start <= change_end;
                let same_user = metadata.user_id == self.changes[idx].metadata.user_id;

                // An undo that cancels the delete right after this insert must
                // not also grow the insert.
                let cancels_next_delete = undoing
                    && self.changes.get(idx + 1).is_some_and(|next| {
                        next.op.is_delete()
                            && op_start == change_end
                            && next.start() == op_start
                            && next.op.text().starts_with(op.i.as_str())
                    });

                // A delete sitting at the end of the incoming insert partitions
                // it from this insert. That delete was already shifted above.
                let blocked_by_delete = previous.is_some_and(|j| {
                    self.changes[j].op.is_delete() && self.changes[j].start() == op_end
                });

                let change = &mut self.changes[idx];
                if track
                    && overlapping
                    && !blocked_by_delete
                    && !already_merged
                    && !cancels_next_delete
                    && same_user
                {
                    let merged = insert_at(change.op.text(), op_start - change_start, &op.i);
                    *change.op.text_mut() = merged;
                    change.metadata.ts = metadata.ts;
                    already_merged = true;
                } else if op_start <= change_start {
                    *change.op.p_mut() += op_len;
                } else if (!same_user || !track)
                    && change_start < op_start
                    && op_start < change_end
                {
                    let offset = op_start - change_start;
                    let after = slice_from(change.op.text(), offset).to_string();
                    let before = slice_to(change.op.text(), offset).to_string();
                    *change.op.text_mut() = before;
                    trace!(change_id = %change.id, offset, "insert splits tracked insert");
                    split_off.push((
                        TrackedOp::insert(change_start + offset + op_len, after),
                        change.metadata.clone(),
                    ));
                }
            }

            previous = Some(idx);
        }

        self.remove_indices(&removed);
        if track && !already_merged {
            self.push_change(TrackedOp::insert(op.p, op.i.clone()), metadata.clone());
        }
        for (op, metadata) in split_off {
            self.push_change(op, metadata);
        }
        self.sort_changes();
    }

    fn apply_delete_to_changes(&mut self, op: &DeleteOp, metadata: &ChangeMetadata) -> Result<()> {
        let op_start = op.p;
        let op_len = op.len();
        let op_end = op_start + op_len;
        let track = self.track_changes;

        // The incoming delete may absorb tracked deletes or cancel out with
        // tracked inserts. Those edits are collected here and applied to the
        // delete text once the walk is done, so offsets stay valid.
        let mut modifications: Vec<Modification> = Vec::new();
        let mut removed: Vec<usize> = Vec::new();

        for (idx, change) in self.changes.iter_mut().enumerate() {
            let change_start = change.start();
            match &mut change.op {
                TrackedOp::Insert { p, i } => {
                    let change_end = change_start + utf16_len(i);
                    if op_end <= change_start {
                        *p -= op_len;
                    } else if op_start >= change_end {
                        continue;
                    } else {
                        let (delete_before, insert_before) = if op_start >= change_start {
                            (0, slice_to(i, op_start - change_start))
                        } else {
                            (change_start - op_start, "")
                        };
                        let (delete_after, insert_after) = if op_end <= change_end {
                            (0, slice_from(i, op_end - change_start))
                        } else {
                            (op_end - change_end, "")
                        };

                        let remaining = format!("{}{}", insert_before, insert_after);
                        if remaining.is_empty() {
                            removed.push(idx);
                        } else {
                            *i = remaining;
                            *p = change_start.min(op_start);
                        }

                        let cancelled_len = op_len - delete_before - delete_after;
                        let cancelled = slice(&op.d, delete_before, delete_before + cancelled_len);
                        if !cancelled.is_empty() {
                            modifications.push(Modification::Delete {
                                p: delete_before,
                                d: cancelled.to_string(),
                            });
                        }
                    }
                }
                TrackedOp::Delete { p, d } => {
                    // While tracking, a delete touching this one merges with
                    // it below, so only strictly earlier deletes shift it.
                    if op_end < change_start || (!track && op_end == change_start) {
                        *p -= op_len;
                    } else if op_start <= change_start && change_start <= op_end {
                        if track {
                            modifications.push(Modification::Insert {
                                p: change_start - op_start,
                                i: d.clone(),
                            });
                            removed.push(idx);
                        } else {
                            *p = op_start;
                        }
                    }
                }
            }
        }

        let mut merged = DeleteOp {
            p: op.p,
            d: apply_modifications(&op.d, modifications)?,
            u: op.u,
        };

        // Reuse an absorbed tracked delete for the merged delete instead of
        // removing one and adding another, so its id stays stable.
        let mut gone = Vec::with_capacity(removed.len());
        for idx in removed {
            let change = &mut self.changes[idx];
            let merged_end = merged.p + merged.len();
            if !merged.d.is_empty()
                && change.op.is_delete()
                && merged.p <= change.start()
                && change.start() <= merged_end
            {
                change.op = TrackedOp::delete(merged.p, std::mem::take(&mut merged.d));
                change.metadata = metadata.clone();
            } else {
                gone.push(idx);
            }
        }
        self.remove_indices(&gone);

        if track && !merged.d.is_empty() {
            self.push_change(TrackedOp::delete(merged.p, merged.d), metadata.clone());
        } else {
            // Deleting an insert that sat between two inserts of the same
            // user leaves those two adjacent; join them again.
            self.merge_adjacent_changes();
        }
        self.sort_changes();
        Ok(())
    }

    fn merge_adjacent_changes(&mut self) {
        let mut previous: Option<usize> = None;
        let mut removed = Vec::new();
        for idx in 0..self.changes.len() {
            let Some(prev) = previous else {
                previous = Some(idx);
                continue;
            };
            let (head, tail) = self.changes.split_at_mut(idx);
            let prev_change = &mut head[prev];
            let change = &tail[0];

            let merge = match (&prev_change.op, &change.op) {
                (TrackedOp::Insert { .. }, TrackedOp::Insert { .. }) => {
                    prev_change.start() + prev_change.len() == change.start()
                        && prev_change.metadata.user_id == change.metadata.user_id
                }
                (TrackedOp::Delete { .. }, TrackedOp::Delete { .. }) => {
                    prev_change.start() == change.start()
                }
                _ => false,
            };

            if merge {
                prev_change.op.text_mut().push_str(change.op.text());
                removed.push(idx);
            } else {
                previous = Some(idx);
            }
        }
        self.remove_indices(&removed);
    }

    fn push_change(&mut self, op: TrackedOp, metadata: ChangeMetadata) {
        let id = self.ids.next_id();
        trace!(change_id = %id, kind = ?op.kind(), position = op.p(), "tracked change added");
        self.changes.push(TrackedChange::new(id, op, metadata));
    }

    fn remove_indices(&mut self, indices: &[usize]) {
        if indices.is_empty() {
            return;
        }
        let indices: HashSet<usize> = indices.iter().copied().collect();
        let mut idx = 0;
        self.changes.retain(|_| {
            let keep = !indices.contains(&idx);
            idx += 1;
            keep
        });
    }

    fn sort_changes(&mut self) {
        self.changes.sort_by(|a, b| a.position_order(b));
    }

    fn sort_comments(&mut self) {
        self.comments.sort_by_key(|c| c.start());
    }
}

/// Apply the collected modifications to the text of a delete.
///
/// They run from the end of the text backwards, deletes first at equal
/// offsets, so that earlier offsets are not disturbed.
fn apply_modifications(content: &str, mut modifications: Vec<Modification>) -> Result<String> {
    modifications.sort_by(|a, b| {
        b.p().cmp(&a.p()).then_with(|| match (a, b) {
            (Modification::Delete { .. }, Modification::Insert { .. }) => std::cmp::Ordering::Less,
            (Modification::Insert { .. }, Modification::Delete { .. }) => {
                std::cmp::Ordering::Greater
            }
            _ => std::cmp::Ordering::Equal,
        })
    });

    let mut content = content.to_string();
    for modification in modifications {
        match modification {
            Modification::Insert { p, i } => content = insert_at(&content, p, &i),
            Modification::Delete { p, d } => {
                let len = utf16_len(&d);
                if slice(&content, p, p + len) != d {
                    return Err(RangesError::DeletionMismatch { position: p });
                }
                content = marginalia_core::text::remove_at(&content, p, len);
            }
        }
    }
    Ok(content)
}
