//! Edit operations and the updates that carry them.
//!
//! Ops arrive in the ShareJS text format: `{i, p}` inserts, `{d, p}` deletes
//! and `{c, p, t}` comment marks. They are classified into [`Op`] once, at the
//! serde boundary, so nothing downstream ever inspects which keys are present.

use crate::error::RangesError;
use crate::text::utf16_len;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub(crate) fn is_false(b: &bool) -> bool {
    !*b
}

/// Insert `i` at position `p`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertOp {
    pub p: usize,
    pub i: String,
    /// Undo/reject intent. An insert carrying this flag retracts a pending
    /// tracked delete whose text it reproduces.
    #[serde(default, skip_serializing_if = "is_false")]
    pub u: bool,
}

/// Delete `d` at position `p`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOp {
    pub p: usize,
    pub d: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub u: bool,
}

/// Mark `c` at position `p` as belonging to comment thread `t`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentOp {
    pub p: usize,
    pub c: String,
    pub t: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub resolved: bool,
}

impl InsertOp {
    pub fn new(p: usize, i: impl Into<String>) -> Self {
        Self {
            p,
            i: i.into(),
            u: false,
        }
    }

    pub fn undoing(mut self) -> Self {
        self.u = true;
        self
    }

    pub fn len(&self) -> usize {
        utf16_len(&self.i)
    }

    pub fn is_empty(&self) -> bool {
        self.i.is_empty()
    }
}

impl DeleteOp {
    pub fn new(p: usize, d: impl Into<String>) -> Self {
        Self {
            p,
            d: d.into(),
            u: false,
        }
    }

    pub fn len(&self) -> usize {
        utf16_len(&self.d)
    }

    pub fn is_empty(&self) -> bool {
        self.d.is_empty()
    }
}

impl CommentOp {
    pub fn new(p: usize, c: impl Into<String>, t: impl Into<String>) -> Self {
        Self {
            p,
            c: c.into(),
            t: t.into(),
            resolved: false,
        }
    }

    pub fn len(&self) -> usize {
        utf16_len(&self.c)
    }

    pub fn is_empty(&self) -> bool {
        self.c.is_empty()
    }
}

/// The kind of an [`Op`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
    Insert,
    Delete,
    Comment,
}

/// A single edit component.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawOp", into = "RawOp")]
pub enum Op {
    Insert(InsertOp),
    Delete(DeleteOp),
    Comment(CommentOp),
}

impl Op {
    pub fn kind(&self) -> OpKind {
        match self {
            Op::Insert(_) => OpKind::Insert,
            Op::Delete(_) => OpKind::Delete,
            Op::Comment(_) => OpKind::Comment,
        }
    }

    pub fn position(&self) -> usize {
        match self {
            Op::Insert(op) => op.p,
            Op::Delete(op) => op.p,
            Op::Comment(op) => op.p,
        }
    }

    pub fn undo(&self) -> bool {
        match self {
            Op::Insert(op) => op.u,
            Op::Delete(op) => op.u,
            Op::Comment(_) => false,
        }
    }
}

impl From<InsertOp> for Op {
    fn from(op: InsertOp) -> Self {
        Op::Insert(op)
    }
}

impl From<DeleteOp> for Op {
    fn from(op: DeleteOp) -> Self {
        Op::Delete(op)
    }
}

impl From<CommentOp> for Op {
    fn from(op: CommentOp) -> Self {
        Op::Comment(op)
    }
}

/// Wire shape of an op before classification.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct RawOp {
    p: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    i: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    d: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    c: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    t: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    u: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    resolved: bool,
}

impl TryFrom<RawOp> for Op {
    type Error = RangesError;

    fn try_from(raw: RawOp) -> Result<Self, Self::Error> {
        let RawOp {
            p,
            i,
            d,
            c,
            t,
            u,
            resolved,
        } = raw;
        if let Some(i) = i {
            Ok(Op::Insert(InsertOp { p, i, u }))
        } else if let Some(d) = d {
            Ok(Op::Delete(DeleteOp { p, d, u }))
        } else if let Some(c) = c {
            let t = t.ok_or(RangesError::MissingThreadId)?;
            Ok(Op::Comment(CommentOp { p, c, t, resolved }))
        } else {
            Err(RangesError::UnknownOpType)
        }
    }
}

impl From<Op> for RawOp {
    fn from(op: Op) -> Self {
        match op {
            Op::Insert(InsertOp { p, i, u }) => RawOp {
                p,
                i: Some(i),
                u,
                ..Default::default()
            },
            Op::Delete(DeleteOp { p, d, u }) => RawOp {
                p,
                d: Some(d),
                u,
                ..Default::default()
            },
            Op::Comment(CommentOp { p, c, t, resolved }) => RawOp {
                p,
                c: Some(c),
                t: Some(t),
                resolved,
                ..Default::default()
            },
        }
    }
}

/// Metadata attached to an update.
///
/// Keys the engine does not interpret are kept in `extra` and written back
/// out unchanged on the history updates derived from this one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Edit time, in epoch milliseconds on the wire.
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub ts: Option<DateTime<Utc>>,
    /// Track-changes id seed. Its presence turns track-changes mode on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pathname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_doc_length: Option<usize>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Flags an op is applied with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EditFlags {
    /// The enclosing update was made in track-changes mode.
    pub tracked: bool,
    /// The op carries undo/reject intent.
    pub undo: bool,
}

/// An op together with the flags of the update it belongs to.
#[derive(Clone, Copy, Debug)]
pub struct ClassifiedOp<'a> {
    pub op: &'a Op,
    pub kind: OpKind,
    pub flags: EditFlags,
}

/// An ordered batch of ops for one document version.
///
/// History updates reuse the same envelope with history ops in `op`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Update<O = Op> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v: Option<u64>,
    pub op: Vec<O>,
    #[serde(default)]
    pub meta: UpdateMeta,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl<O> Update<O> {
    pub fn new(op: Vec<O>, meta: UpdateMeta) -> Self {
        Self {
            doc: None,
            v: None,
            op,
            meta,
            extra: Map::new(),
        }
    }

    /// Whether the update was made in track-changes mode.
    pub fn is_tracked(&self) -> bool {
        self.meta.tc.is_some()
    }

    /// Copy the envelope around a different list of ops.
    pub fn with_ops<T>(&self, op: Vec<T>) -> Update<T> {
        Update {
            doc: self.doc.clone(),
            v: self.v,
            op,
            meta: self.meta.clone(),
            extra: self.extra.clone(),
        }
    }
}

impl Update<Op> {
    /// Iterate over the ops with their classification and flags.
    pub fn classify(&self) -> impl Iterator<Item = ClassifiedOp<'_>> + '_ {
        let tracked = self.is_tracked();
        self.op.iter().map(move |op| ClassifiedOp {
            op,
            kind: op.kind(),
            flags: EditFlags {
                tracked,
                undo: op.undo(),
            },
        })
    }
}
