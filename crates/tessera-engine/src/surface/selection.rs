use std::fmt;

use super::SurfaceNodeId;

/// A native position: a surface node and an offset into it. For text nodes the
/// offset counts chars, for elements it is a child index.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SurfacePoint {
    pub node: SurfaceNodeId,
    pub offset: usize,
}

impl SurfacePoint {
    pub fn new(node: SurfaceNodeId, offset: usize) -> Self {
        SurfacePoint { node, offset }
    }
}

impl fmt::Display for SurfacePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node, self.offset)
    }
}

/// Native ranges have no direction, so `backward` travels alongside
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SurfaceRange {
    pub start: SurfacePoint,
    pub end: SurfacePoint,
    pub backward: bool,
}

impl SurfaceRange {
    pub fn new(start: SurfacePoint, end: SurfacePoint) -> Self {
        SurfaceRange {
            start,
            end,
            backward: false,
        }
    }

    pub fn collapsed(point: SurfacePoint) -> Self {
        Self::new(point, point)
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// `(anchor, focus)` as the user made the selection
    pub fn anchor_and_focus(&self) -> (SurfacePoint, SurfacePoint) {
        if self.backward {
            (self.end, self.start)
        } else {
            (self.start, self.end)
        }
    }
}

/// The host's selection: a directed anchor/focus pair plus the native ranges
/// it is made of. Most hosts report exactly one range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SurfaceSelection {
    pub anchor: SurfacePoint,
    pub focus: SurfacePoint,
    pub ranges: Vec<SurfaceRange>,
}

impl SurfaceSelection {
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

impl From<SurfaceRange> for SurfaceSelection {
    fn from(range: SurfaceRange) -> Self {
        let (anchor, focus) = range.anchor_and_focus();
        SurfaceSelection {
            anchor,
            focus,
            ranges: vec![range],
        }
    }
}

/// Either shape of native selection the range mapper accepts
#[derive(Copy, Clone, Debug)]
pub enum SelectionSource<'a> {
    Selection(&'a SurfaceSelection),
    Range(&'a SurfaceRange),
}

impl<'a> From<&'a SurfaceSelection> for SelectionSource<'a> {
    fn from(selection: &'a SurfaceSelection) -> Self {
        SelectionSource::Selection(selection)
    }
}

impl<'a> From<&'a SurfaceRange> for SelectionSource<'a> {
    fn from(range: &'a SurfaceRange) -> Self {
        SelectionSource::Range(range)
    }
}
