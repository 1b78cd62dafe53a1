//! The range store: comment ranges and tracked-change ranges of a document.
//!
//! Both collections are expressed in live-text coordinates. Tracked inserts
//! cover text that is present in the document; tracked deletes cover text
//! that is no longer there, so their length never shifts later positions.

use crate::error::RangesError;
use crate::id::ChangeId;
use crate::ops::{CommentOp, DeleteOp, InsertOp, Op};
use crate::text::utf16_len;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Who made a change, and when.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<DateTime<Utc>>,
}

impl ChangeMetadata {
    pub fn new(user_id: Option<String>, ts: Option<DateTime<Utc>>) -> Self {
        Self { user_id, ts }
    }

    pub fn by(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ts: None,
        }
    }
}

/// Kind of a tracked change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Delete,
}

/// The text a tracked change covers and where.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Op", into = "Op")]
pub enum TrackedOp {
    Insert { p: usize, i: String },
    Delete { p: usize, d: String },
}

impl TrackedOp {
    pub fn insert(p: usize, i: impl Into<String>) -> Self {
        TrackedOp::Insert { p, i: i.into() }
    }

    pub fn delete(p: usize, d: impl Into<String>) -> Self {
        TrackedOp::Delete { p, d: d.into() }
    }

    pub fn kind(&self) -> ChangeKind {
        match self {
            TrackedOp::Insert { .. } => ChangeKind::Insert,
            TrackedOp::Delete { .. } => ChangeKind::Delete,
        }
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, TrackedOp::Insert { .. })
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, TrackedOp::Delete { .. })
    }

    pub fn p(&self) -> usize {
        match self {
            TrackedOp::Insert { p, .. } | TrackedOp::Delete { p, .. } => *p,
        }
    }

    pub fn p_mut(&mut self) -> &mut usize {
        match self {
            TrackedOp::Insert { p, .. } | TrackedOp::Delete { p, .. } => p,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            TrackedOp::Insert { i, .. } => i,
            TrackedOp::Delete { d, .. } => d,
        }
    }

    pub fn text_mut(&mut self) -> &mut String {
        match self {
            TrackedOp::Insert { i, .. } => i,
            TrackedOp::Delete { d, .. } => d,
        }
    }

    /// Length in UTF-16 units of the covered text.
    pub fn len(&self) -> usize {
        utf16_len(self.text())
    }

    pub fn is_empty(&self) -> bool {
        self.text().is_empty()
    }

    /// The inserted text, for tracked inserts.
    pub fn inserted(&self) -> Option<&str> {
        match self {
            TrackedOp::Insert { i, .. } => Some(i),
            TrackedOp::Delete { .. } => None,
        }
    }

    /// The deleted text, for tracked deletes.
    pub fn deleted(&self) -> Option<&str> {
        match self {
            TrackedOp::Delete { d, .. } => Some(d),
            TrackedOp::Insert { .. } => None,
        }
    }
}

impl TryFrom<Op> for TrackedOp {
    type Error = RangesError;

    fn try_from(op: Op) -> Result<Self, Self::Error> {
        match op {
            Op::Insert(InsertOp { p, i, .. }) => Ok(TrackedOp::Insert { p, i }),
            Op::Delete(DeleteOp { p, d, .. }) => Ok(TrackedOp::Delete { p, d }),
            Op::Comment(_) => Err(RangesError::UnknownOpType),
        }
    }
}

impl From<TrackedOp> for Op {
    fn from(op: TrackedOp) -> Self {
        match op {
            TrackedOp::Insert { p, i } => Op::Insert(InsertOp { p, i, u: false }),
            TrackedOp::Delete { p, d } => Op::Delete(DeleteOp { p, d, u: false }),
        }
    }
}

/// A tracked insert or delete.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedChange {
    pub id: ChangeId,
    pub op: TrackedOp,
    #[serde(default)]
    pub metadata: ChangeMetadata,
}

impl TrackedChange {
    pub fn new(id: impl Into<ChangeId>, op: TrackedOp, metadata: ChangeMetadata) -> Self {
        Self {
            id: id.into(),
            op,
            metadata,
        }
    }

    pub fn start(&self) -> usize {
        self.op.p()
    }

    pub fn len(&self) -> usize {
        self.op.len()
    }

    pub fn is_empty(&self) -> bool {
        self.op.is_empty()
    }

    /// Order by position, with deletes before inserts at the same offset.
    pub fn position_order(&self, other: &TrackedChange) -> Ordering {
        self.start().cmp(&other.start()).then_with(|| {
            match (self.op.is_delete(), other.op.is_delete()) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => Ordering::Equal,
            }
        })
    }
}

/// A span of text attached to a comment thread.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub op: CommentOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ChangeMetadata>,
}

impl Comment {
    pub fn new(op: CommentOp, metadata: Option<ChangeMetadata>) -> Self {
        Self {
            id: op.t.clone(),
            op,
            metadata,
        }
    }

    pub fn thread_id(&self) -> &str {
        &self.op.t
    }

    pub fn start(&self) -> usize {
        self.op.p
    }

    pub fn len(&self) -> usize {
        self.op.len()
    }

    pub fn is_empty(&self) -> bool {
        self.op.is_empty()
    }

    pub fn end(&self) -> usize {
        self.start() + self.len()
    }
}

/// All ranges of one document, as persisted.
///
/// Empty collections are left out of the serialized form entirely, since
/// most documents have neither comments nor tracked changes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranges {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<TrackedChange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Comment>,
}

/// Counts used to detect collapsed ranges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RangeCounts {
    /// Comments with no text left plus tracked inserts with no text left.
    pub empty: usize,
    pub total: usize,
}

impl RangeCounts {
    pub fn of(changes: &[TrackedChange], comments: &[Comment]) -> Self {
        let empty_comments = comments.iter().filter(|c| c.is_empty()).count();
        let empty_inserts = changes
            .iter()
            .filter(|c| c.op.is_insert() && c.is_empty())
            .count();
        RangeCounts {
            empty: empty_comments + empty_inserts,
            total: comments.len() + changes.len(),
        }
    }
}

impl Ranges {
    pub fn new(changes: Vec<TrackedChange>, comments: Vec<Comment>) -> Self {
        Self { changes, comments }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.comments.is_empty()
    }

    pub fn get_change(&self, id: &ChangeId) -> Option<&TrackedChange> {
        self.changes.iter().find(|c| &c.id == id)
    }

    pub fn get_comment(&self, id: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == id)
    }

    /// Copy of these ranges without the given changes.
    pub fn without_changes(&self, ids: &[ChangeId]) -> Ranges {
        let ids: HashSet<&ChangeId> = ids.iter().collect();
        Ranges {
            changes: self
                .changes
                .iter()
                .filter(|c| !ids.contains(&c.id))
                .cloned()
                .collect(),
            comments: self.comments.clone(),
        }
    }

    /// Copy of these ranges without the given comment.
    pub fn without_comment(&self, id: &str) -> Ranges {
        Ranges {
            changes: self.changes.clone(),
            comments: self.comments.iter().filter(|c| c.id != id).cloned().collect(),
        }
    }

    pub fn counts(&self) -> RangeCounts {
        RangeCounts::of(&self.changes, &self.comments)
    }

    /// Whether both collections are ordered by start position.
    pub fn is_sorted(&self) -> bool {
        self.changes
            .windows(2)
            .all(|w| w[0].position_order(&w[1]) != Ordering::Greater)
            && self.comments.windows(2).all(|w| w[0].start() <= w[1].start())
    }

    /// Total length of text hidden by tracked deletes.
    pub fn tracked_deletes_length(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| c.op.is_delete())
            .map(|c| c.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Ranges {
        serde_json::from_value(json!({
            "changes": [
                { "id": "c1", "op": { "d": "old ", "p": 2 }, "metadata": { "user_id": "u1" } },
                { "id": "c2", "op": { "i": "new", "p": 2 }, "metadata": { "user_id": "u2" } },
            ],
            "comments": [
                { "id": "t1", "op": { "c": "abc", "p": 0, "t": "t1" } },
            ],
        }))
        .unwrap()
    }

    #[test]
    fn test_parses_persisted_ranges() {
        let ranges = sample();
        assert_eq!(ranges.changes[0].op, TrackedOp::delete(2, "old "));
        assert_eq!(ranges.changes[1].op.kind(), ChangeKind::Insert);
        assert_eq!(ranges.comments[0].thread_id(), "t1");
        assert!(ranges.is_sorted());
        assert_eq!(ranges.tracked_deletes_length(), 4);
    }

    #[test]
    fn test_empty_collections_are_omitted() {
        let ranges = sample().without_changes(&["c1".into(), "c2".into()]);
        let value = serde_json::to_value(&ranges).unwrap();
        assert!(value.get("changes").is_none());
        assert!(value.get("comments").is_some());

        let value = serde_json::to_value(Ranges::default()).unwrap();
        assert_eq!(value, json!({}));
    }

    #[test]
    fn test_comment_ops_are_not_changes() {
        let result = serde_json::from_value::<TrackedOp>(json!({ "c": "x", "p": 0, "t": "t" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_counts() {
        let mut ranges = sample();
        ranges.comments[0].op.c.clear();
        assert_eq!(ranges.counts(), RangeCounts { empty: 1, total: 3 });
    }

    #[test]
    fn test_deletes_sort_before_inserts() {
        let ranges = sample();
        assert_eq!(
            ranges.changes[0].position_order(&ranges.changes[1]),
            Ordering::Less
        );
    }
}
