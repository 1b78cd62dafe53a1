//! # marginalia-core
//!
//! Shared types for the Marginalia ranges engine.
//!
//! This crate provides:
//! - The op classifier: ShareJS-style wire ops become [`Op`] variants
//! - The range store: [`Ranges`] of [`Comment`]s and [`TrackedChange`]s
//! - Change id generation
//! - UTF-16 indexed text helpers
//! - The [`RangesError`] type shared by every crate of the workspace
//!
//! ## Example
//!
//! ```rust
//! use marginalia_core::{Op, Ranges};
//!
//! let op: Op = serde_json::from_str(r#"{"i": "two ", "p": 4}"#).unwrap();
//! assert_eq!(op.position(), 4);
//!
//! let ranges: Ranges = serde_json::from_str(
//!     r#"{"comments": [{"id": "t1", "op": {"c": "three ", "p": 4, "t": "t1"}}]}"#,
//! ).unwrap();
//! assert_eq!(ranges.comments[0].len(), 6);
//! ```

pub mod error;
pub mod id;
pub mod ops;
pub mod ranges;
pub mod text;

pub use error::{ErrorKind, RangesError, Result};
pub use id::{ChangeId, IdGenerator, IdSeed};
pub use ops::{ClassifiedOp, CommentOp, DeleteOp, EditFlags, InsertOp, Op, OpKind, Update, UpdateMeta};
pub use ranges::{ChangeKind, ChangeMetadata, Comment, RangeCounts, Ranges, TrackedChange, TrackedOp};
pub use text::IndexedText;
