//! # marginalia-tracker
//!
//! The range transformer. A [`RangesTracker`] owns a copy of a document's
//! comments and tracked changes and moves, grows, shrinks, splits, merges
//! and removes them as inserts, deletes and comment ops are applied.
//!
//! ## Example
//!
//! ```rust
//! use marginalia_core::{ChangeMetadata, IdSeed, InsertOp, Ranges, TrackedOp};
//! use marginalia_tracker::RangesTracker;
//!
//! let mut tracker = RangesTracker::with_id_seed(Ranges::default(), IdSeed::from("000000000000000000"));
//! tracker.set_track_changes(true);
//! tracker
//!     .apply_op(&InsertOp::new(3, "foo").into(), &ChangeMetadata::by("user-1"))
//!     .unwrap();
//!
//! let ranges = tracker.into_ranges();
//! assert_eq!(ranges.changes[0].op, TrackedOp::insert(3, "foo"));
//! assert_eq!(ranges.changes[0].id.as_str(), "000000000000000000000001");
//! ```

pub mod tracker;

pub use tracker::RangesTracker;
