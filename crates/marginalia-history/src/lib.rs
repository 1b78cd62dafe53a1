//! # marginalia-history
//!
//! History keeps the text of tracked deletes until they are accepted, so a
//! position in history can be ahead of the same position in the live
//! document. This crate translates between the two:
//!
//! - [`projector`]: annotates live ops with `hpos`, `hlen`, `commentIds`,
//!   `trackedChanges` and `trackedDeleteRejection`
//! - [`accepted`]: builds the history updates that finalize accepted changes
//! - [`update`]: the history op types and their wire format
//!
//! ## Example
//!
//! ```rust
//! use marginalia_core::{ChangeMetadata, InsertOp, TrackedChange, TrackedOp};
//! use marginalia_history::projector::history_op_for_insert;
//!
//! let changes = [TrackedChange::new("c1", TrackedOp::delete(0, "gone "), ChangeMetadata::default())];
//! let op = history_op_for_insert(&InsertOp::new(3, "x"), &[], &changes);
//! assert_eq!(op.hpos, Some(8));
//! ```

pub mod accepted;
pub mod projector;
pub mod update;

pub use accepted::{
    history_updates_for_accepted_changes, history_updates_for_accepted_changes_at,
    AcceptedChangesRequest,
};
pub use projector::{cropped_comment_ops, history_op, history_op_for_comment, plain_history_op};
pub use update::{
    HistoryCommentOp, HistoryDeleteOp, HistoryInsertOp, HistoryOp, HistoryRetainOp, HistoryUpdate,
    TrackedChangeSpan, Tracking,
};
