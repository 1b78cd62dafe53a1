//! Whole-document scenarios for the range transformer.
//!
//! Each test keeps the document text next to the tracker and checks after
//! every op that the ranges still describe that text.

use marginalia_core::text::{insert_at, remove_at, slice};
use marginalia_core::{
    ChangeMetadata, CommentOp, DeleteOp, IdSeed, IndexedText, InsertOp, Op, Ranges, TrackedOp,
};
use marginalia_tracker::RangesTracker;
use proptest::prelude::*;
use serde_json::json;

struct Doc {
    text: String,
    tracker: RangesTracker,
}

impl Doc {
    fn new(text: &str, ranges: Ranges) -> Self {
        Self {
            text: text.to_string(),
            tracker: RangesTracker::with_id_seed(ranges, IdSeed::from("123456789012345678")),
        }
    }

    fn apply(&mut self, op: Op, user: &str) {
        match &op {
            Op::Insert(insert) => self.text = insert_at(&self.text, insert.p, &insert.i),
            Op::Delete(delete) => self.text = remove_at(&self.text, delete.p, delete.len()),
            Op::Comment(_) => {}
        }
        self.tracker.apply_op(&op, &ChangeMetadata::by(user)).unwrap();
        self.tracker.validate(&IndexedText::new(self.text.clone())).unwrap();
    }
}

#[test]
fn test_typing_and_backspacing_inside_a_comment() {
    let ranges: Ranges = serde_json::from_value(json!({
        "comments": [{ "id": "t1", "op": { "c": "quick", "p": 4, "t": "t1" } }]
    }))
    .unwrap();
    let mut doc = Doc::new("the quick fox", ranges);

    doc.apply(InsertOp::new(6, "i").into(), "u1");
    assert_eq!(doc.tracker.comments()[0].op.c, "quiick");
    doc.apply(DeleteOp::new(6, "i").into(), "u1");
    assert_eq!(doc.tracker.comments()[0].op.c, "quick");
    doc.apply(DeleteOp::new(0, "the ").into(), "u1");
    assert_eq!(doc.tracker.comments()[0].op.p, 0);
}

#[test]
fn test_deleting_whole_comment_leaves_empty_range() {
    let ranges: Ranges = serde_json::from_value(json!({
        "comments": [{ "id": "t1", "op": { "c": "quick", "p": 4, "t": "t1" } }]
    }))
    .unwrap();
    let mut doc = Doc::new("the quick fox", ranges);
    doc.apply(DeleteOp::new(3, " quick ").into(), "u1");

    let comment = &doc.tracker.comments()[0];
    assert_eq!(comment.op.p, 3);
    assert!(comment.is_empty());
}

#[test]
fn test_tracked_typing_builds_one_insert() {
    let mut doc = Doc::new("hello world", Ranges::default());
    doc.tracker.set_track_changes(true);
    for (n, ch) in "big ".chars().enumerate() {
        doc.apply(InsertOp::new(6 + n, ch.to_string()).into(), "u1");
    }
    assert_eq!(doc.text, "hello big world");
    assert_eq!(doc.tracker.changes().len(), 1);
    assert_eq!(doc.tracker.changes()[0].op, TrackedOp::insert(6, "big "));
}

#[test]
fn test_tracked_backspacing_builds_one_delete() {
    let mut doc = Doc::new("hello big world", Ranges::default());
    doc.tracker.set_track_changes(true);
    for p in (6..10).rev() {
        let d = slice(&doc.text, p, p + 1).to_string();
        doc.apply(DeleteOp::new(p, d).into(), "u1");
    }
    assert_eq!(doc.text, "hello world");
    assert_eq!(doc.tracker.changes().len(), 1);
    assert_eq!(doc.tracker.changes()[0].op, TrackedOp::delete(6, "big "));
}

#[test]
fn test_tracked_insert_then_delete_cancels_out() {
    let mut doc = Doc::new("hello world", Ranges::default());
    doc.tracker.set_track_changes(true);
    doc.apply(InsertOp::new(5, ", big").into(), "u1");
    doc.apply(DeleteOp::new(5, ", big").into(), "u1");
    assert_eq!(doc.text, "hello world");
    assert!(doc.tracker.changes().is_empty());
}

#[test]
fn test_comment_op_anchors_new_thread() {
    let mut doc = Doc::new("hello world", Ranges::default());
    doc.apply(CommentOp::new(6, "world", "t9").into(), "u1");
    let comment = doc.tracker.get_comment("t9").unwrap();
    assert_eq!(comment.metadata.as_ref().unwrap().user_id.as_deref(), Some("u1"));
    doc.apply(InsertOp::new(0, ">> ").into(), "u2");
    assert_eq!(doc.tracker.get_comment("t9").unwrap().op.p, 9);
}

fn edit_strategy() -> impl Strategy<Value = Vec<(bool, usize, String)>> {
    prop::collection::vec((any::<bool>(), 0usize..40, "[a-z ]{1,4}"), 1..25)
}

proptest! {
    /// Untracked edits never leave ranges out of step with the text.
    #[test]
    fn prop_untracked_edits_keep_comments_valid(edits in edit_strategy()) {
        let ranges: Ranges = serde_json::from_value(json!({
            "comments": [
                { "id": "a", "op": { "c": "brown", "p": 10, "t": "a" } },
                { "id": "b", "op": { "c": "lazy", "p": 35, "t": "b" } },
            ]
        })).unwrap();
        let mut doc = Doc::new("the quick brown fox jumps over the lazy dog", ranges);

        for (is_insert, pos, text) in edits {
            let len = doc.text.chars().count();
            let pos = pos.min(len);
            if is_insert {
                doc.apply(InsertOp::new(pos, text).into(), "u1");
            } else if pos < len {
                let end = (pos + text.chars().count()).min(len);
                let d = slice(&doc.text, pos, end).to_string();
                doc.apply(DeleteOp::new(pos, d).into(), "u1");
            }
        }
        let ranges = doc.tracker.into_ranges();
        prop_assert!(ranges.is_sorted());
    }

    /// Tracked edits keep inserts matching the text and changes sorted.
    #[test]
    fn prop_tracked_edits_keep_changes_valid(edits in edit_strategy(), users in prop::collection::vec(0u8..2, 25)) {
        let mut doc = Doc::new("the quick brown fox jumps over the lazy dog", Ranges::default());
        doc.tracker.set_track_changes(true);

        for (n, (is_insert, pos, text)) in edits.into_iter().enumerate() {
            let user = format!("u{}", users[n]);
            let len = doc.text.chars().count();
            let pos = pos.min(len);
            if is_insert {
                doc.apply(InsertOp::new(pos, text).into(), &user);
            } else if pos < len {
                let end = (pos + text.chars().count()).min(len);
                let d = slice(&doc.text, pos, end).to_string();
                doc.apply(DeleteOp::new(pos, d).into(), &user);
            }
        }
        let ranges = doc.tracker.into_ranges();
        prop_assert!(ranges.is_sorted());
        prop_assert!(ranges.changes.iter().all(|c| !c.is_empty()));
    }
}
