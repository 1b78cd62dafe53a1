//! History ops.
//!
//! History keeps tracked-deleted text around, so its coordinates run ahead
//! of the live text wherever a tracked delete sits before a position. The
//! ops here are the live ops plus the annotations needed to replay them in
//! history coordinates.

use marginalia_core::{ChangeKind, CommentOp, DeleteOp, InsertOp, Update};
use serde::{Deserialize, Serialize};

fn is_false(b: &bool) -> bool {
    !*b
}

/// An insert, in both coordinate systems.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryInsertOp {
    pub p: usize,
    pub i: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub u: bool,
    /// History position, when it differs from `p`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hpos: Option<usize>,
    /// Threads of the comments the insert lands inside.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comment_ids: Vec<String>,
    /// The insert restores text of a tracked delete instead of adding text.
    #[serde(default, skip_serializing_if = "is_false")]
    pub tracked_delete_rejection: bool,
}

/// Part of a delete that removes text already under tracking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedChangeSpan {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    /// Offset from the start of the deleted live text.
    pub offset: usize,
    pub length: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryDeleteOp {
    pub p: usize,
    pub d: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub u: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hpos: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tracked_changes: Vec<TrackedChangeSpan>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryCommentOp {
    pub p: usize,
    pub c: String,
    pub t: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hpos: Option<usize>,
    /// History length, when tracked deletes inside the comment make it
    /// longer than `c`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hlen: Option<usize>,
}

/// Tracking state set by a retain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Tracking {
    /// The retained text is no longer tracked.
    None,
}

/// Keep `r` at `p` while changing how it is tracked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRetainOp {
    pub r: String,
    pub p: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hpos: Option<usize>,
    pub tracking: Tracking,
}

/// A single history op.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HistoryOp {
    Insert(HistoryInsertOp),
    Delete(HistoryDeleteOp),
    Comment(HistoryCommentOp),
    Retain(HistoryRetainOp),
}

impl HistoryOp {
    pub fn position(&self) -> usize {
        match self {
            HistoryOp::Insert(op) => op.p,
            HistoryOp::Delete(op) => op.p,
            HistoryOp::Comment(op) => op.p,
            HistoryOp::Retain(op) => op.p,
        }
    }

    /// History position: `hpos` when set, the live position otherwise.
    pub fn history_position(&self) -> usize {
        let hpos = match self {
            HistoryOp::Insert(op) => op.hpos,
            HistoryOp::Delete(op) => op.hpos,
            HistoryOp::Comment(op) => op.hpos,
            HistoryOp::Retain(op) => op.hpos,
        };
        hpos.unwrap_or_else(|| self.position())
    }
}

impl From<&InsertOp> for HistoryInsertOp {
    fn from(op: &InsertOp) -> Self {
        Self {
            p: op.p,
            i: op.i.clone(),
            u: op.u,
            ..Default::default()
        }
    }
}

impl From<&DeleteOp> for HistoryDeleteOp {
    fn from(op: &DeleteOp) -> Self {
        Self {
            p: op.p,
            d: op.d.clone(),
            u: op.u,
            ..Default::default()
        }
    }
}

impl From<&CommentOp> for HistoryCommentOp {
    fn from(op: &CommentOp) -> Self {
        Self {
            p: op.p,
            c: op.c.clone(),
            t: op.t.clone(),
            resolved: op.resolved,
            ..Default::default()
        }
    }
}

impl From<HistoryInsertOp> for HistoryOp {
    fn from(op: HistoryInsertOp) -> Self {
        HistoryOp::Insert(op)
    }
}

impl From<HistoryDeleteOp> for HistoryOp {
    fn from(op: HistoryDeleteOp) -> Self {
        HistoryOp::Delete(op)
    }
}

impl From<HistoryCommentOp> for HistoryOp {
    fn from(op: HistoryCommentOp) -> Self {
        HistoryOp::Comment(op)
    }
}

impl From<HistoryRetainOp> for HistoryOp {
    fn from(op: HistoryRetainOp) -> Self {
        HistoryOp::Retain(op)
    }
}

/// An update in history coordinates.
pub type HistoryUpdate = Update<HistoryOp>;
