//! Self-adjusting references to paths and ranges.
//!
//! A reference is registered against a document, follows every operation
//! applied afterwards and is released explicitly with `unref_*`. A reference
//! whose target disappears keeps its slot with a `None` value until released.

use std::collections::BTreeMap;

use crate::{Affinity, Operation, Path, Range, RangeAffinity};

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct PathRefId(u64);

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct RangeRefId(u64);

#[derive(Debug, Clone)]
struct PathRef {
    current: Option<Path>,
    affinity: Option<Affinity>,
}

#[derive(Debug, Clone)]
struct RangeRef {
    current: Option<Range>,
    affinity: RangeAffinity,
}

/// Observer list of live references, owned by a document
#[derive(Debug, Clone, Default)]
pub struct Refs {
    next_id: u64,
    paths: BTreeMap<PathRefId, PathRef>,
    ranges: BTreeMap<RangeRefId, RangeRef>,
}

impl Refs {
    fn mint(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn path_ref(&mut self, path: Path, affinity: Option<Affinity>) -> PathRefId {
        let id = PathRefId(self.mint());
        self.paths.insert(
            id,
            PathRef {
                current: Some(path),
                affinity,
            },
        );
        id
    }

    pub fn path(&self, id: PathRefId) -> Option<&Path> {
        self.paths.get(&id)?.current.as_ref()
    }

    /// Releases the reference and returns its last value
    pub fn unref_path(&mut self, id: PathRefId) -> Option<Path> {
        self.paths.remove(&id)?.current
    }

    pub fn range_ref(&mut self, range: Range, affinity: RangeAffinity) -> RangeRefId {
        let id = RangeRefId(self.mint());
        self.ranges.insert(
            id,
            RangeRef {
                current: Some(range),
                affinity,
            },
        );
        id
    }

    pub fn range(&self, id: RangeRefId) -> Option<&Range> {
        self.ranges.get(&id)?.current.as_ref()
    }

    pub fn unref_range(&mut self, id: RangeRefId) -> Option<Range> {
        self.ranges.remove(&id)?.current
    }

    /// Number of references not yet released, including those whose target is gone
    pub fn len(&self) -> usize {
        self.paths.len() + self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn transform(&mut self, op: &Operation) {
        for entry in self.paths.values_mut() {
            if let Some(path) = &entry.current {
                entry.current = path.transform(op, entry.affinity);
            }
        }
        for entry in self.ranges.values_mut() {
            if let Some(range) = &entry.current {
                entry.current = range.transform(op, entry.affinity);
            }
        }
    }
}
