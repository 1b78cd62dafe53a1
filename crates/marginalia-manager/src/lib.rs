//! # marginalia-manager
//!
//! Entry point of the Marginalia ranges engine.
//!
//! A [`RangesManager`] takes a document's current ranges, a batch of updates
//! and the document text they produce, and returns:
//! - the new ranges, validated against the text
//! - the history updates for the batch
//! - whether ranges collapsed along the way
//!
//! It also accepts tracked changes and deletes comment threads.
//!
//! ## Example
//!
//! ```rust
//! use marginalia_core::{Ranges, Update};
//! use marginalia_manager::{ApplyOptions, RangesConfig, RangesManager};
//! use serde_json::json;
//!
//! let manager = RangesManager::new(RangesConfig::default());
//! let ranges: Ranges = serde_json::from_value(json!({
//!     "comments": [{ "id": "t1", "op": { "c": "three ", "p": 4, "t": "t1" } }]
//! })).unwrap();
//! let updates: Vec<Update> = serde_json::from_value(json!([
//!     { "op": [{ "i": "two ", "p": 4 }], "meta": { "user_id": "user-1" } }
//! ])).unwrap();
//!
//! let result = manager
//!     .apply_update(
//!         "project",
//!         "doc",
//!         &ranges,
//!         &updates,
//!         &["one two three four".to_string()],
//!         ApplyOptions::default(),
//!     )
//!     .unwrap();
//! assert_eq!(result.new_ranges.comments[0].op.p, 8);
//! assert!(!result.ranges_were_collapsed);
//! ```

pub mod config;
pub mod manager;
pub mod observer;

pub use config::{ApplyOptions, RangesConfig, RangesConfigBuilder};
pub use manager::{ApplyUpdateResult, RangesManager};
pub use observer::{RangesObserver, TracingObserver};
