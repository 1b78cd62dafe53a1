//! End-to-end scenarios through the manager.

use marginalia_core::{ChangeId, ErrorKind, Ranges, Update};
use marginalia_manager::{ApplyOptions, RangesConfig, RangesManager};
use serde_json::{json, Value};

fn manager() -> RangesManager {
    RangesManager::new(RangesConfig::default())
}

fn ranges(value: Value) -> Ranges {
    serde_json::from_value(value).unwrap()
}

fn updates(value: Value) -> Vec<Update> {
    serde_json::from_value(value).unwrap()
}

fn lines(text: &str) -> Vec<String> {
    text.split('\n').map(String::from).collect()
}

#[test]
fn test_insert_shifts_comment_and_change() {
    let ranges = ranges(json!({
        "comments": [{ "id": "t1", "op": { "c": "three ", "p": 4, "t": "t1" } }],
        "changes": [{ "id": "c1", "op": { "i": "five", "p": 15 }, "metadata": { "user_id": "u1" } }],
    }));
    let updates = updates(json!([{ "op": [{ "i": "two ", "p": 4 }], "meta": { "user_id": "u1" } }]));

    let result = manager()
        .apply_update("p", "d", &ranges, &updates, &lines("one two three four five"), ApplyOptions::default())
        .unwrap();

    assert_eq!(result.new_ranges.comments[0].op.p, 8);
    assert_eq!(result.new_ranges.changes[0].op.p(), 19);
    assert!(!result.ranges_were_collapsed);
    assert_eq!(
        serde_json::to_value(&result.history_updates[0].op).unwrap(),
        json!([{ "i": "two ", "p": 4 }])
    );
}

#[test]
fn test_undo_insert_rejects_tracked_delete() {
    let ranges = ranges(json!({
        "changes": [{ "id": "c1", "op": { "d": "two ", "p": 4 }, "metadata": { "user_id": "u1" } }],
    }));
    let updates = updates(json!([{
        "op": [{ "i": "tw", "p": 4, "u": true }],
        "meta": { "user_id": "u1", "tc": "aaaaaaaaaaaaaaaaaa" },
    }]));

    let result = manager()
        .apply_update("p", "d", &ranges, &updates, &lines("one twthree"), ApplyOptions::with_history())
        .unwrap();

    assert_eq!(
        serde_json::to_value(&result.history_updates[0].op).unwrap(),
        json!([{ "i": "tw", "p": 4, "u": true, "trackedDeleteRejection": true }])
    );
    assert_eq!(
        serde_json::to_value(&result.new_ranges.changes[0].op).unwrap(),
        json!({ "d": "o ", "p": 6 })
    );
    assert_eq!(result.new_ranges.changes[0].id.as_str(), "c1");
}

#[test]
fn test_deleting_comment_text_collapses() {
    let ranges = ranges(json!({
        "comments": [{ "id": "t1", "op": { "c": "three ", "p": 4, "t": "t1" } }],
    }));
    let updates = updates(json!([{ "op": [{ "d": "three ", "p": 4 }], "meta": { "user_id": "u1" } }]));

    let result = manager()
        .apply_update("p", "d", &ranges, &updates, &lines("one four"), ApplyOptions::default())
        .unwrap();

    let comment = &result.new_ranges.comments[0];
    assert_eq!(comment.op.p, 4);
    assert!(comment.is_empty());
    assert!(result.ranges_were_collapsed);
}

#[test]
fn test_accept_changes_removes_only_named_change() {
    let ranges = ranges(json!({
        "changes": [
            { "id": "c1", "op": { "i": "a", "p": 0 }, "metadata": { "user_id": "u1" } },
            { "id": "c2", "op": { "d": "b", "p": 3 }, "metadata": { "user_id": "u1" } },
        ],
        "comments": [{ "id": "t1", "op": { "c": "x", "p": 1, "t": "t1" } }],
    }));
    let accepted = manager().accept_changes("p", "d", &[ChangeId::from("c1")], &ranges, &lines("axyz"));

    assert_eq!(accepted.changes.len(), 1);
    assert_eq!(accepted.changes[0], ranges.changes[1]);
    assert_eq!(accepted.comments, ranges.comments);
}

#[test]
fn test_limit_is_enforced_and_input_untouched() {
    let manager = RangesManager::new(RangesConfig::builder().max_comments(1).build());
    let ranges = ranges(json!({
        "comments": [{ "id": "t1", "op": { "c": "one", "p": 0, "t": "t1" } }],
    }));
    let before = ranges.clone();
    let updates = updates(json!([{ "op": [{ "c": "two", "p": 4, "t": "t2" }], "meta": {} }]));

    let err = manager
        .apply_update("p", "d", &ranges, &updates, &lines("one two"), ApplyOptions::default())
        .unwrap_err();

    assert_eq!(err.to_string(), "too many comments or tracked changes");
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(ranges, before);
}

#[test]
fn test_limit_boundary_is_allowed() {
    let manager = RangesManager::new(RangesConfig::builder().max_comments(2).build());
    let ranges = ranges(json!({
        "comments": [{ "id": "t1", "op": { "c": "one", "p": 0, "t": "t1" } }],
    }));
    let updates = updates(json!([{ "op": [{ "c": "two", "p": 4, "t": "t2" }], "meta": {} }]));

    let result = manager
        .apply_update("p", "d", &ranges, &updates, &lines("one two"), ApplyOptions::default())
        .unwrap();
    assert_eq!(result.new_ranges.comments.len(), 2);
}

#[test]
fn test_history_disabled_drops_comment_ops() {
    let updates = updates(json!([
        { "op": [{ "c": "one", "p": 0, "t": "t1" }], "meta": {} },
        { "op": [{ "i": "!", "p": 3 }, { "c": "two", "p": 5, "t": "t2" }], "meta": {} },
    ]));

    let result = manager()
        .apply_update("p", "d", &Ranges::default(), &updates, &lines("one! two"), ApplyOptions::default())
        .unwrap();

    assert_eq!(result.history_updates.len(), 1);
    assert_eq!(
        serde_json::to_value(&result.history_updates[0].op).unwrap(),
        json!([{ "i": "!", "p": 3 }])
    );
}

#[test]
fn test_history_enabled_annotates_ops() {
    // "one [two ]three four" with "two " tracked as deleted
    let ranges = ranges(json!({
        "changes": [{ "id": "c1", "op": { "d": "two ", "p": 4 }, "metadata": { "user_id": "u1" } }],
        "comments": [{ "id": "t1", "op": { "c": "three", "p": 4, "t": "t1" } }],
    }));
    let updates = updates(json!([{
        "op": [
            { "i": "X", "p": 6 },
            { "c": "four", "p": 11, "t": "t2" },
        ],
        "meta": { "user_id": "u1", "source": "abc", "custom": 1 },
    }]));

    let result = manager()
        .apply_update("p", "d", &ranges, &updates, &lines("one thXree four"), ApplyOptions::with_history())
        .unwrap();

    let update = serde_json::to_value(&result.history_updates[0]).unwrap();
    assert_eq!(
        update["op"],
        json!([
            { "i": "X", "p": 6, "hpos": 10, "commentIds": ["t1"] },
            { "c": "four", "p": 11, "t": "t2", "hpos": 15 },
        ])
    );
    assert_eq!(update["meta"]["source"], json!("abc"));
    assert_eq!(update["meta"]["custom"], json!(1));
}

#[test]
fn test_tracked_delete_over_comment_edge_emits_cropped_comment() {
    // "one three four", comment on "three", tracked delete of "one thr"
    let ranges = ranges(json!({
        "comments": [{ "id": "t1", "op": { "c": "three", "p": 4, "t": "t1" } }],
    }));
    let updates = updates(json!([{
        "op": [{ "d": "one thr", "p": 0 }],
        "meta": { "user_id": "u1", "tc": "bbbbbbbbbbbbbbbbbb" },
    }]));

    let result = manager()
        .apply_update("p", "d", &ranges, &updates, &lines("ee four"), ApplyOptions::with_history())
        .unwrap();

    assert_eq!(
        serde_json::to_value(&result.history_updates[0].op).unwrap(),
        json!([
            { "d": "one thr", "p": 0 },
            { "c": "ee", "p": 0, "t": "t1", "hpos": 7 },
        ])
    );
    assert_eq!(result.new_ranges.changes[0].id.as_str(), "bbbbbbbbbbbbbbbbbb000001");
}

#[test]
fn test_consistency_failure_kind() {
    let ranges = ranges(json!({
        "comments": [{ "id": "t1", "op": { "c": "one", "p": 0, "t": "t1" } }],
    }));
    let err = manager()
        .apply_update("p", "d", &ranges, &[], &lines("two"), ApplyOptions::default())
        .unwrap_err();
    assert_eq!(err.to_string(), "comment does not match text in document");
    assert_eq!(err.kind(), ErrorKind::Consistency);
}

#[test]
fn test_history_comment_ids_use_thread_id() {
    let ranges = ranges(json!({
        "comments": [{ "id": "range-1", "op": { "c": "three", "p": 4, "t": "thread-9" } }],
    }));
    let updates = updates(json!([{ "op": [{ "i": "X", "p": 6 }], "meta": { "user_id": "u1" } }]));

    let result = manager()
        .apply_update("p", "d", &ranges, &updates, &lines("one thXree"), ApplyOptions::with_history())
        .unwrap();

    assert_eq!(
        serde_json::to_value(&result.history_updates[0].op).unwrap(),
        json!([{ "i": "X", "p": 6, "commentIds": ["thread-9"] }])
    );
}

#[test]
fn test_positions_count_utf16_units() {
    let updates = updates(json!([{
        "op": [{ "i": "X", "p": 3 }],
        "meta": { "user_id": "u1", "tc": "aaaaaaaaaaaaaaaaaa" },
    }]));

    let result = manager()
        .apply_update("p", "d", &Ranges::default(), &updates, &lines("😀aXb"), ApplyOptions::default())
        .unwrap();

    assert_eq!(result.new_ranges.changes[0].op.p(), 3);
    assert_eq!(result.new_ranges.changes[0].op.inserted(), Some("X"));
}
