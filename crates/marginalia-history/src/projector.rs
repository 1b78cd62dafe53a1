//! History projection of live ops.
//!
//! Every function here looks at the ranges as they are *before* the op is
//! applied, except [`history_op_for_comment`] which may also be called with
//! the ranges after a tracked delete to describe a cropped comment.

use crate::update::{
    HistoryCommentOp, HistoryDeleteOp, HistoryInsertOp, HistoryOp, TrackedChangeSpan,
};
use marginalia_core::text::{slice_from, slice_to};
use marginalia_core::{ChangeKind, Comment, CommentOp, DeleteOp, InsertOp, Op, TrackedChange, TrackedOp};

fn differs(hpos: usize, p: usize) -> Option<usize> {
    (hpos != p).then_some(hpos)
}

/// History counterpart of any live op.
pub fn history_op(op: &Op, comments: &[Comment], changes: &[TrackedChange]) -> HistoryOp {
    match op {
        Op::Insert(insert) => history_op_for_insert(insert, comments, changes).into(),
        Op::Delete(delete) => history_op_for_delete(delete, changes).into(),
        Op::Comment(comment) => history_op_for_comment(comment, changes).into(),
    }
}

/// History counterpart of a live op when history ranges are not supported:
/// edits pass through as they are and comment marks are dropped.
pub fn plain_history_op(op: &Op) -> Option<HistoryOp> {
    match op {
        Op::Insert(insert) => Some(HistoryInsertOp::from(insert).into()),
        Op::Delete(delete) => Some(HistoryDeleteOp::from(delete).into()),
        Op::Comment(_) => None,
    }
}

/// Annotate an insert with its history position, the comments it lands in
/// and whether it rejects a tracked delete.
pub fn history_op_for_insert(
    op: &InsertOp,
    comments: &[Comment],
    changes: &[TrackedChange],
) -> HistoryInsertOp {
    let mut comment_ids: Vec<String> = Vec::new();
    for comment in comments {
        let thread_id = comment.thread_id();
        if comment.start() < op.p
            && op.p < comment.end()
            && !comment_ids.iter().any(|t| t == thread_id)
        {
            comment_ids.push(thread_id.to_string());
        }
    }

    let mut hpos = op.p;
    let mut rejection = false;
    // Tracked deletes at the insert position that sort before the rejected one.
    let mut rejection_offset = 0;
    for change in changes {
        let TrackedOp::Delete { p, d } = &change.op else {
            continue;
        };
        if *p < op.p {
            hpos += change.len();
        } else if *p == op.p {
            if op.u && d.starts_with(op.i.as_str()) {
                hpos += rejection_offset;
                rejection = true;
                break;
            }
            rejection_offset += change.len();
        } else {
            break;
        }
    }

    HistoryInsertOp {
        hpos: differs(hpos, op.p),
        comment_ids,
        tracked_delete_rejection: rejection,
        ..HistoryInsertOp::from(op)
    }
}

/// Annotate a delete with its history position and the tracked changes it
/// overlaps.
pub fn history_op_for_delete(op: &DeleteOp, changes: &[TrackedChange]) -> HistoryDeleteOp {
    let op_end = op.p + op.len();
    let mut hpos = op.p;
    let mut spans = Vec::new();

    for change in changes {
        let change_start = change.start();
        if change_start <= op.p {
            match change.op.kind() {
                ChangeKind::Delete => hpos += change.len(),
                ChangeKind::Insert => {
                    let end = (change_start + change.len()).min(op_end);
                    if end > op.p {
                        spans.push(TrackedChangeSpan {
                            kind: ChangeKind::Insert,
                            offset: 0,
                            length: end - op.p,
                        });
                    }
                }
            }
        } else if change_start < op_end {
            let offset = change_start - op.p;
            let length = match change.op.kind() {
                ChangeKind::Delete => change.len(),
                ChangeKind::Insert => change.len().min(op_end - change_start),
            };
            spans.push(TrackedChangeSpan {
                kind: change.op.kind(),
                offset,
                length,
            });
        } else {
            break;
        }
    }

    HistoryDeleteOp {
        hpos: differs(hpos, op.p),
        tracked_changes: spans,
        ..HistoryDeleteOp::from(op)
    }
}

/// Annotate a comment op with its history position and length.
pub fn history_op_for_comment(op: &CommentOp, changes: &[TrackedChange]) -> HistoryCommentOp {
    let op_len = op.len();
    let mut hpos = op.p;
    let mut hlen = op_len;
    for change in changes.iter().filter(|c| c.op.is_delete()) {
        if change.start() <= op.p {
            hpos += change.len();
        } else if change.start() < op.p + op_len {
            hlen += change.len();
        } else {
            break;
        }
    }

    HistoryCommentOp {
        hpos: differs(hpos, op.p),
        hlen: (hlen != op_len).then_some(hlen),
        ..HistoryCommentOp::from(op)
    }
}

/// Comments a tracked delete crops at one edge, as they will read once the
/// delete is applied.
///
/// History still holds the deleted text, so without these the history
/// comment would keep covering it. Deletes strictly inside a comment or
/// covering it entirely need no extra op.
pub fn cropped_comment_ops(op: &DeleteOp, comments: &[Comment]) -> Vec<CommentOp> {
    let delete_start = op.p;
    let delete_end = op.p + op.len();
    let mut ops = Vec::new();
    for comment in comments {
        let comment_start = comment.start();
        let comment_end = comment.end();
        let cropped = if delete_start <= comment_start
            && delete_end > comment_start
            && delete_end < comment_end
        {
            Some((delete_start, slice_from(&comment.op.c, delete_end - comment_start)))
        } else if delete_start > comment_start
            && delete_start < comment_end
            && delete_end >= comment_end
        {
            Some((comment_start, slice_to(&comment.op.c, delete_start - comment_start)))
        } else {
            None
        };
        if let Some((p, c)) = cropped {
            ops.push(CommentOp {
                p,
                c: c.to_string(),
                t: comment.thread_id().to_string(),
                resolved: comment.op.resolved,
            });
        }
    }
    ops
}
