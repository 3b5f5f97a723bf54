//! Translation between model positions and surface positions.
//!
//! Model → surface always succeeds for rendered leaves. Surface → model has
//! to cope with whatever the host reports: points on elements instead of
//! text, inside placeholders, inside void or non-editable regions, or in a
//! nested editor. Those are normalized to the nearest leaf of this editor.

mod point;
mod range;

pub use point::{editable_child_and_index, normalize_point};

/// Which way to look for a leaf when a surface point sits in a region that
/// has none
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SearchDirection {
    Forward,
    #[default]
    Backward,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PointOptions {
    /// Take the surface point as is instead of normalizing it first
    pub exact_match: bool,
    /// Report unresolvable points as `None` instead of an error
    pub suppress_throw: bool,
    pub search_direction: SearchDirection,
}

impl PointOptions {
    pub fn exact() -> Self {
        PointOptions {
            exact_match: true,
            ..Default::default()
        }
    }

    pub fn lenient() -> Self {
        PointOptions {
            suppress_throw: true,
            ..Default::default()
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RangeOptions {
    pub exact_match: bool,
    pub suppress_throw: bool,
}
