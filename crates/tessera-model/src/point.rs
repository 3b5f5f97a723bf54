use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::node::char_len;
use crate::{Operation, Path};

/// Which side a position sticks to when content is inserted or split exactly
/// at it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Affinity {
    Forward,
    Backward,
}

/// Affinity for both ends of a range. `Inward` keeps an expanded range from
/// growing at its edges, `Outward` lets it grow.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RangeAffinity {
    Forward,
    Backward,
    Inward,
    Outward,
}

/// A position inside a text leaf
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: impl Into<Path>, offset: usize) -> Self {
        Point {
            path: path.into(),
            offset,
        }
    }

    pub fn compare(&self, other: &Point) -> Ordering {
        match self.path.compare(&other.path) {
            Ordering::Equal => self.offset.cmp(&other.offset),
            ordering => ordering,
        }
    }

    pub fn is_before(&self, other: &Point) -> bool {
        self.compare(other) == Ordering::Less
    }

    pub fn is_after(&self, other: &Point) -> bool {
        self.compare(other) == Ordering::Greater
    }

    /// Where this point ends up once `op` has been applied, or `None` when the
    /// leaf it lived in was removed (or split exactly here with no affinity).
    pub fn transform(&self, op: &Operation, affinity: Option<Affinity>) -> Option<Point> {
        let mut path = self.path.clone();
        let mut offset = self.offset;

        match op {
            Operation::InsertText {
                path: at,
                offset: at_offset,
                text,
            } => {
                if *at == path
                    && (*at_offset < offset
                        || (*at_offset == offset && affinity == Some(Affinity::Forward)))
                {
                    offset += char_len(text);
                }
            }
            Operation::RemoveText {
                path: at,
                offset: at_offset,
                text,
            } => {
                if *at == path && *at_offset <= offset {
                    offset -= (offset - at_offset).min(char_len(text));
                }
            }
            Operation::MergeNode { path: at, position, .. } => {
                if *at == path {
                    offset += position;
                }
                path = path.transform(op, affinity)?;
            }
            Operation::RemoveNode { path: at, .. } => {
                if *at == path || at.is_ancestor(&path) {
                    return None;
                }
                path = path.transform(op, affinity)?;
            }
            Operation::SplitNode { path: at, position, .. } => {
                if *at == path {
                    if *position == offset && affinity.is_none() {
                        return None;
                    }
                    if *position < offset
                        || (*position == offset && affinity == Some(Affinity::Forward))
                    {
                        offset -= position;
                        path = path.next()?;
                    }
                } else {
                    path = path.transform(op, affinity)?;
                }
            }
            _ => {
                path = path.transform(op, affinity)?;
            }
        }

        Some(Point { path, offset })
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.offset)
    }
}

/// Anchor is where the selection started, focus where it ends. Either may
/// come first in document order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub anchor: Point,
    pub focus: Point,
}

impl Range {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Range { anchor, focus }
    }

    pub fn collapsed(point: Point) -> Self {
        Range {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_backward(&self) -> bool {
        self.anchor.is_after(&self.focus)
    }

    pub fn is_forward(&self) -> bool {
        !self.is_backward()
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn is_expanded(&self) -> bool {
        !self.is_collapsed()
    }

    /// `(start, end)` in document order
    pub fn edges(&self) -> (Point, Point) {
        if self.is_backward() {
            (self.focus.clone(), self.anchor.clone())
        } else {
            (self.anchor.clone(), self.focus.clone())
        }
    }

    pub fn start(&self) -> &Point {
        if self.is_backward() {
            &self.focus
        } else {
            &self.anchor
        }
    }

    pub fn end(&self) -> &Point {
        if self.is_backward() {
            &self.anchor
        } else {
            &self.focus
        }
    }

    pub fn transform(&self, op: &Operation, affinity: RangeAffinity) -> Option<Range> {
        let forward = Some(Affinity::Forward);
        let backward = Some(Affinity::Backward);

        let (anchor_affinity, focus_affinity) = match affinity {
            RangeAffinity::Forward => (forward, forward),
            RangeAffinity::Backward => (backward, backward),
            RangeAffinity::Inward => {
                let collapsed = self.is_collapsed();
                if self.is_forward() {
                    (forward, if collapsed { forward } else { backward })
                } else {
                    (backward, if collapsed { backward } else { forward })
                }
            }
            RangeAffinity::Outward => {
                if self.is_forward() {
                    (backward, forward)
                } else {
                    (forward, backward)
                }
            }
        };

        let anchor = self.anchor.transform(op, anchor_affinity)?;
        let focus = self.focus.transform(op, focus_affinity)?;
        Some(Range { anchor, focus })
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.anchor, self.focus)
    }
}

/// Either a caret position or a selection
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Location {
    Point(Point),
    Range(Range),
}

impl From<Point> for Location {
    fn from(point: Point) -> Self {
        Location::Point(point)
    }
}

impl From<Range> for Location {
    fn from(range: Range) -> Self {
        Location::Range(range)
    }
}
