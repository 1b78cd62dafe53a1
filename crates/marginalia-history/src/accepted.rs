//! History updates for accepted tracked changes.
//!
//! Accepting a change does not touch the live text: an accepted insert was
//! already there and an accepted delete was already gone. History still has
//! to hear about it, since it keeps tracked deletes around and marks tracked
//! inserts.

use crate::update::{HistoryDeleteOp, HistoryOp, HistoryRetainOp, HistoryUpdate, Tracking};
use chrono::{DateTime, Utc};
use marginalia_core::text::doc_length;
use marginalia_core::{ChangeId, TrackedChange, TrackedOp, UpdateMeta};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

/// Everything needed to describe a batch of accepted changes to history.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AcceptedChangesRequest {
    pub doc_id: String,
    pub accepted_change_ids: Vec<ChangeId>,
    /// All tracked changes of the document, accepted or not, in order.
    pub changes: Vec<TrackedChange>,
    /// Live document lines.
    pub lines: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pathname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_history_id: Option<String>,
}

/// One history update per accepted change, timestamped now.
pub fn history_updates_for_accepted_changes(request: &AcceptedChangesRequest) -> Vec<HistoryUpdate> {
    history_updates_for_accepted_changes_at(request, Utc::now())
}

/// Same as [`history_updates_for_accepted_changes`] with a fixed timestamp.
pub fn history_updates_for_accepted_changes_at(
    request: &AcceptedChangesRequest,
    now: DateTime<Utc>,
) -> Vec<HistoryUpdate> {
    let accepted: HashSet<&ChangeId> = request.accepted_change_ids.iter().collect();
    let live_length = doc_length(&request.lines);
    let mut history_length = live_length
        + request
            .changes
            .iter()
            .filter_map(|c| c.op.deleted())
            .map(marginalia_core::text::utf16_len)
            .sum::<usize>();

    // Deletes that stay tracked keep their text in history.
    let mut unaccepted_deletes = 0;
    let mut updates = Vec::new();

    for change in &request.changes {
        if !accepted.contains(&change.id) {
            if change.op.is_delete() {
                unaccepted_deletes += change.len();
            }
            continue;
        }

        let p = change.start();
        let hpos = (unaccepted_deletes > 0).then_some(p + unaccepted_deletes);
        let op: HistoryOp = match &change.op {
            TrackedOp::Insert { i, .. } => HistoryRetainOp {
                r: i.clone(),
                p,
                hpos,
                tracking: Tracking::None,
            }
            .into(),
            TrackedOp::Delete { d, .. } => HistoryDeleteOp {
                p,
                d: d.clone(),
                hpos,
                ..Default::default()
            }
            .into(),
        };

        let meta = UpdateMeta {
            user_id: change.metadata.user_id.clone(),
            ts: Some(now),
            pathname: request.pathname.clone(),
            doc_length: Some(live_length),
            history_doc_length: (history_length != live_length).then_some(history_length),
            ..Default::default()
        };
        let mut update = HistoryUpdate::new(vec![op], meta);
        update.doc = Some(request.doc_id.clone());
        if let Some(id) = &request.project_history_id {
            update
                .extra
                .insert("projectHistoryId".to_string(), Value::String(id.clone()));
        }
        updates.push(update);

        if change.op.is_delete() {
            history_length -= change.len();
        }
    }

    debug!(
        doc_id = %request.doc_id,
        accepted = updates.len(),
        "built history updates for accepted changes"
    );
    updates
}
