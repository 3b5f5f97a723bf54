//! Changes observed on the surface but not yet applied to the model.
//!
//! While the user composes text, the surface runs ahead of the model. The
//! difference is kept as per-leaf string diffs plus a pending selection and
//! a pending action, all expressed in "surface coordinates": as if the diffs
//! had already been applied. Every model operation that lands in the meantime
//! shifts them, so they still point at the right place when flushed.

use log::debug;
use serde::Serialize;
use tessera_model::{Affinity, Operation, Path, Point, Range};

/// Replace `start..end` (chars) of a leaf's text with `text`
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StringDiff {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl StringDiff {
    pub fn new(start: usize, end: usize, text: impl Into<String>) -> Self {
        StringDiff {
            start,
            end,
            text: text.into(),
        }
    }

    /// Replaces nothing with nothing
    pub fn is_noop(&self) -> bool {
        self.start == self.end && self.text.is_empty()
    }

    fn text_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TextDiff {
    pub id: u64,
    pub path: Path,
    pub diff: StringDiff,
}

/// Deferred edit run once the pending diffs are flushed
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PendingAction {
    InsertText { at: Point, text: String },
    /// Only ranges inside a single leaf are supported
    ReplaceText { at: Range, text: String },
}

#[derive(Clone, Debug, Default)]
pub struct PendingState {
    diffs: Vec<TextDiff>,
    selection: Option<Range>,
    action: Option<PendingAction>,
    flush_requested: bool,
    next_id: u64,
}

impl PendingState {
    pub fn diffs(&self) -> &[TextDiff] {
        &self.diffs
    }

    pub fn diff_at(&self, path: &Path) -> Option<&TextDiff> {
        self.diffs.iter().find(|d| d.path == *path)
    }

    pub fn selection(&self) -> Option<&Range> {
        self.selection.as_ref()
    }

    pub fn action(&self) -> Option<&PendingAction> {
        self.action.as_ref()
    }

    pub fn is_flush_requested(&self) -> bool {
        self.flush_requested
    }

    pub fn is_empty(&self) -> bool {
        self.diffs.is_empty() && self.selection.is_none() && self.action.is_none()
    }

    /// Records the diff for the leaf at `path`. A leaf has at most one diff:
    /// a newer one replaces it and keeps its id.
    pub(crate) fn push_diff(&mut self, path: Path, diff: StringDiff) -> u64 {
        if let Some(existing) = self.diffs.iter_mut().find(|d| d.path == path) {
            existing.diff = diff;
            return existing.id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.diffs.push(TextDiff { id, path, diff });
        id
    }

    pub(crate) fn set_selection(&mut self, selection: Option<Range>) {
        self.selection = selection;
    }

    pub(crate) fn set_action(&mut self, action: Option<PendingAction>) {
        self.action = action;
    }

    pub(crate) fn request_flush(&mut self) {
        self.flush_requested = true;
    }

    /// Empties the state, handing back what was pending
    pub(crate) fn take(&mut self) -> PendingState {
        let next_id = self.next_id;
        let taken = std::mem::take(self);
        self.next_id = next_id;
        taken
    }

    /// The state as it must look once `op` has been applied. Selection and
    /// action are shifted against the diffs as they were before `op`.
    pub(crate) fn transformed(&self, op: &Operation) -> PendingState {
        let diffs: Vec<TextDiff> = self
            .diffs
            .iter()
            .filter_map(|d| transform_text_diff(d, op))
            .filter(|d| !d.diff.is_noop())
            .collect();
        if diffs.len() != self.diffs.len() {
            debug!(
                "{} dropped {} pending diff(s)",
                op.kind(),
                self.diffs.len() - diffs.len()
            );
        }

        let selection = self
            .selection
            .as_ref()
            .and_then(|range| transform_pending_range(&self.diffs, range, op));

        let action = self.action.as_ref().and_then(|action| match action {
            PendingAction::InsertText { at, text } => transform_pending_point(&self.diffs, at, op)
                .map(|at| PendingAction::InsertText {
                    at,
                    text: text.clone(),
                }),
            PendingAction::ReplaceText { at, text } => transform_pending_range(&self.diffs, at, op)
                .map(|at| PendingAction::ReplaceText {
                    at,
                    text: text.clone(),
                }),
        });

        PendingState {
            diffs,
            selection,
            action,
            flush_requested: self.flush_requested,
            next_id: self.next_id,
        }
    }
}

/// Shifts a pending diff through `op`. `None` when its leaf is gone.
pub fn transform_text_diff(text_diff: &TextDiff, op: &Operation) -> Option<TextDiff> {
    let TextDiff { id, path, diff } = text_diff;
    let shifted = |start: usize, end: usize, path: Path| {
        Some(TextDiff {
            id: *id,
            path,
            diff: StringDiff {
                start,
                end: end.max(start),
                text: diff.text.clone(),
            },
        })
    };

    match op {
        Operation::InsertText {
            path: at,
            offset,
            text,
        } => {
            if at != path || *offset >= diff.end {
                return Some(text_diff.clone());
            }
            let len = text.chars().count();
            if *offset <= diff.start {
                shifted(diff.start + len, diff.end + len, path.clone())
            } else {
                shifted(diff.start, diff.end + len, path.clone())
            }
        }
        Operation::RemoveText {
            path: at,
            offset,
            text,
        } => {
            if at != path || *offset >= diff.end {
                return Some(text_diff.clone());
            }
            let len = text.chars().count();
            if offset + len <= diff.start {
                shifted(diff.start - len, diff.end - len, path.clone())
            } else {
                shifted(diff.start, diff.end.saturating_sub(len), path.clone())
            }
        }
        Operation::SplitNode {
            path: at, position, ..
        } => {
            if at != path || *position >= diff.end {
                let path = path.transform(op, Some(Affinity::Backward))?;
                return shifted(diff.start, diff.end, path);
            }
            if *position > diff.start {
                return shifted(diff.start, diff.end.min(*position), path.clone());
            }
            let path = path.transform(op, Some(Affinity::Forward))?;
            shifted(diff.start - position, diff.end - position, path)
        }
        Operation::MergeNode {
            path: at, position, ..
        } => {
            let moved = path.transform(op, None)?;
            if at != path {
                return shifted(diff.start, diff.end, moved);
            }
            shifted(diff.start + position, diff.end + position, moved)
        }
        _ => {
            let path = path.transform(op, Some(Affinity::Forward))?;
            shifted(diff.start, diff.end, path)
        }
    }
}

/// Shifts a point expressed against the pending diffs through `op`
pub fn transform_pending_point(diffs: &[TextDiff], point: &Point, op: &Operation) -> Option<Point> {
    let backward = Some(Affinity::Backward);
    let Some(TextDiff { diff, .. }) = diffs
        .iter()
        .find(|d| d.path == point.path)
        .filter(|d| point.offset > d.diff.start)
    else {
        return point.transform(op, backward);
    };
    let inserted = diff.text_len();

    // Inside the inserted text: shift the diff's start, keep the distance
    if point.offset <= diff.start + inserted {
        let anchor = Point::new(point.path.clone(), diff.start);
        let transformed = anchor.transform(op, backward)?;
        return Some(Point::new(
            transformed.path,
            transformed.offset + point.offset - diff.start,
        ));
    }

    // After it: shift the position the point has in the unmodified text
    let anchor = Point::new(
        point.path.clone(),
        point.offset + diff.end - diff.start - inserted,
    );
    let transformed = anchor.transform(op, backward)?;
    if let Operation::SplitNode {
        path: at, position, ..
    } = op
        && *at == point.path
        && anchor.offset < *position
        && diff.start < *position
    {
        return Some(transformed);
    }
    let offset = (transformed.offset + inserted + diff.start).saturating_sub(diff.end);
    Some(Point::new(transformed.path, offset))
}

pub fn transform_pending_range(diffs: &[TextDiff], range: &Range, op: &Operation) -> Option<Range> {
    let anchor = transform_pending_point(diffs, &range.anchor, op)?;
    if range.is_collapsed() {
        return Some(Range::collapsed(anchor));
    }
    let focus = transform_pending_point(diffs, &range.focus, op)?;
    Some(Range::new(anchor, focus))
}
