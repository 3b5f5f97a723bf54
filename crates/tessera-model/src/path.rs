use std::cmp::Ordering;
use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::{Affinity, Operation};

/// Child indices from the root down to a node. The empty path is the root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<usize>);

impl Path {
    pub fn root() -> Self {
        Path(Vec::new())
    }

    pub fn new(indices: Vec<usize>) -> Self {
        Path(indices)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    pub fn parent(&self) -> Option<Path> {
        let (_, parent) = self.0.split_last()?;
        Some(Path(parent.to_vec()))
    }

    pub fn child(&self, index: usize) -> Path {
        let mut indices = self.0.clone();
        indices.push(index);
        Path(indices)
    }

    /// The path of the next sibling
    pub fn next(&self) -> Option<Path> {
        let last = self.last()?;
        let mut indices = self.0.clone();
        *indices.last_mut()? = last + 1;
        Some(Path(indices))
    }

    /// The path of the previous sibling, if there is one
    pub fn previous(&self) -> Option<Path> {
        let last = self.last()?.checked_sub(1)?;
        let mut indices = self.0.clone();
        *indices.last_mut()? = last;
        Some(Path(indices))
    }

    pub fn has_previous(&self) -> bool {
        self.last().is_some_and(|last| last > 0)
    }

    /// Every path from the root down to and including this one
    pub fn levels(&self) -> impl Iterator<Item = Path> + '_ {
        (0..=self.0.len()).map(|depth| Path(self.0[..depth].to_vec()))
    }

    /// Longest shared prefix
    pub fn common(&self, other: &Path) -> Path {
        Path(
            self.0
                .iter()
                .zip(other.0.iter())
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| *a)
                .collect(),
        )
    }

    /// Document order over the shared depth. Ancestors compare equal to their
    /// descendants.
    pub fn compare(&self, other: &Path) -> Ordering {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| a.cmp(b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    pub fn is_before(&self, other: &Path) -> bool {
        self.compare(other) == Ordering::Less
    }

    pub fn is_after(&self, other: &Path) -> bool {
        self.compare(other) == Ordering::Greater
    }

    pub fn is_ancestor(&self, other: &Path) -> bool {
        self.0.len() < other.0.len() && self.compare(other) == Ordering::Equal
    }

    /// True when `other` starts with this path's parent and this path's last
    /// index is smaller than `other`'s index at that depth.
    pub fn ends_before(&self, other: &Path) -> bool {
        let Some((&last, parent)) = self.0.split_last() else {
            return false;
        };
        let depth = parent.len();
        other.0.len() > depth && other.0[..depth] == *parent && last < other.0[depth]
    }

    pub fn is_sibling(&self, other: &Path) -> bool {
        if self.0.len() != other.0.len() || self == other {
            return false;
        }
        self.parent() == other.parent()
    }

    /// Where this path points after `op` has been applied, or `None` when the
    /// node it addressed no longer exists.
    ///
    /// `affinity` only matters when this exact node is split: forward follows
    /// the new right half, backward stays on the left half, and `None` reports
    /// the path as gone.
    pub fn transform(&self, op: &Operation, affinity: Option<Affinity>) -> Option<Path> {
        if self.is_root() {
            return Some(self.clone());
        }
        let mut p = self.0.clone();

        match op {
            Operation::InsertNode { path: at, .. } if !at.is_root() => {
                if at == self || at.ends_before(self) || at.is_ancestor(self) {
                    p[at.0.len() - 1] += 1;
                }
            }
            Operation::RemoveNode { path: at, .. } if !at.is_root() => {
                if at == self || at.is_ancestor(self) {
                    return None;
                }
                if at.ends_before(self) {
                    p[at.0.len() - 1] -= 1;
                }
            }
            Operation::MergeNode {
                path: at, position, ..
            } if !at.is_root() => {
                let depth = at.0.len();
                if at == self || at.ends_before(self) {
                    p[depth - 1] -= 1;
                } else if at.is_ancestor(self) {
                    p[depth - 1] -= 1;
                    p[depth] += position;
                }
            }
            Operation::SplitNode {
                path: at, position, ..
            } if !at.is_root() => {
                let depth = at.0.len();
                if at == self {
                    match affinity {
                        Some(Affinity::Forward) => p[depth - 1] += 1,
                        Some(Affinity::Backward) => {}
                        None => return None,
                    }
                } else if at.ends_before(self) {
                    p[depth - 1] += 1;
                } else if at.is_ancestor(self) && self.0[depth] >= *position {
                    p[depth - 1] += 1;
                    p[depth] -= position;
                }
            }
            Operation::MoveNode { path: at, new_path } if !at.is_root() && !new_path.is_root() => {
                if at == new_path {
                    return Some(self.clone());
                }
                let depth = at.0.len();
                if at.is_ancestor(self) || at == self {
                    let mut moved = new_path.0.clone();
                    if at.ends_before(new_path) && depth < new_path.0.len() {
                        moved[depth - 1] -= 1;
                    }
                    moved.extend_from_slice(&self.0[depth..]);
                    return Some(Path(moved));
                } else if at.is_sibling(new_path)
                    && (new_path.is_ancestor(self) || new_path == self)
                {
                    if at.ends_before(self) {
                        p[depth - 1] -= 1;
                    } else {
                        p[depth - 1] += 1;
                    }
                } else if new_path.ends_before(self)
                    || new_path == self
                    || new_path.is_ancestor(self)
                {
                    if at.ends_before(self) {
                        p[depth - 1] -= 1;
                    }
                    p[new_path.0.len() - 1] += 1;
                } else if at.ends_before(self) {
                    p[depth - 1] -= 1;
                }
            }
            _ => {}
        }

        Some(Path(p))
    }
}

impl Deref for Path {
    type Target = [usize];

    fn deref(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for Path {
    fn from(indices: Vec<usize>) -> Self {
        Path(indices)
    }
}

impl<const N: usize> From<[usize; N]> for Path {
    fn from(indices: [usize; N]) -> Self {
        Path(indices.to_vec())
    }
}

impl From<&[usize]> for Path {
    fn from(indices: &[usize]) -> Self {
        Path(indices.to_vec())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Node, Props};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn p<const N: usize>(indices: [usize; N]) -> Path {
        Path::from(indices)
    }

    #[test]
    fn test_levels_walk_from_root() {
        let levels: Vec<Path> = p([1, 0, 2]).levels().collect();
        assert_eq!(levels, vec![p([]), p([1]), p([1, 0]), p([1, 0, 2])]);
    }

    #[rstest]
    #[case(p([0, 1]), p([0, 2]), true)]
    #[case(p([0, 1]), p([0, 1, 5]), false)]
    #[case(p([0]), p([1, 0]), true)]
    #[case(p([1]), p([0, 3]), false)]
    #[case(p([]), p([0]), false)]
    fn test_ends_before(#[case] path: Path, #[case] other: Path, #[case] expected: bool) {
        assert_eq!(path.ends_before(&other), expected);
    }

    #[test]
    fn test_compare_treats_ancestors_as_equal() {
        assert_eq!(p([0]).compare(&p([0, 3])), Ordering::Equal);
        assert!(p([0, 3]).is_before(&p([1])));
        assert!(p([0]).is_ancestor(&p([0, 3])));
        assert!(!p([0, 3]).is_ancestor(&p([0, 3])));
    }

    #[test]
    fn test_common_prefix() {
        assert_eq!(p([0, 1, 2]).common(&p([0, 1, 5, 6])), p([0, 1]));
        assert_eq!(p([1]).common(&p([2])), p([]));
    }

    #[test]
    fn test_previous_and_next() {
        assert_eq!(p([0, 0]).previous(), None);
        assert_eq!(p([0, 2]).previous(), Some(p([0, 1])));
        assert_eq!(p([0, 2]).next(), Some(p([0, 3])));
        assert_eq!(p([]).next(), None);
    }

    #[test]
    fn test_transform_insert_shifts_later_siblings_and_descendants() {
        let op = Operation::InsertNode {
            path: p([1]),
            node: Node::text("x"),
        };
        assert_eq!(p([0, 4]).transform(&op, Some(Affinity::Forward)), Some(p([0, 4])));
        assert_eq!(p([1, 4]).transform(&op, Some(Affinity::Forward)), Some(p([2, 4])));
        assert_eq!(p([3]).transform(&op, Some(Affinity::Forward)), Some(p([4])));
    }

    #[test]
    fn test_transform_remove_drops_descendants() {
        let op = Operation::RemoveNode {
            path: p([1]),
            node: Node::text("x"),
        };
        assert_eq!(p([1, 0]).transform(&op, Some(Affinity::Forward)), None);
        assert_eq!(p([2, 0]).transform(&op, Some(Affinity::Forward)), Some(p([1, 0])));
    }

    #[rstest]
    #[case(Some(Affinity::Forward), Some(p([0, 2])))]
    #[case(Some(Affinity::Backward), Some(p([0, 1])))]
    #[case(None, None)]
    fn test_transform_split_of_same_path(
        #[case] affinity: Option<Affinity>,
        #[case] expected: Option<Path>,
    ) {
        let op = Operation::SplitNode {
            path: p([0, 1]),
            position: 3,
            properties: Props::new(),
        };
        assert_eq!(p([0, 1]).transform(&op, affinity), expected);
    }

    #[test]
    fn test_transform_split_moves_children_past_position() {
        let op = Operation::SplitNode {
            path: p([0]),
            position: 2,
            properties: Props::new(),
        };
        assert_eq!(p([0, 1]).transform(&op, Some(Affinity::Forward)), Some(p([0, 1])));
        assert_eq!(p([0, 3]).transform(&op, Some(Affinity::Forward)), Some(p([1, 1])));
    }

    #[test]
    fn test_transform_merge_appends_to_previous() {
        let op = Operation::MergeNode {
            path: p([1]),
            position: 2,
            properties: Props::new(),
        };
        assert_eq!(p([1, 0]).transform(&op, Some(Affinity::Forward)), Some(p([0, 2])));
        assert_eq!(p([2]).transform(&op, Some(Affinity::Forward)), Some(p([1])));
    }

    #[rstest]
    #[case(p([0]), p([2]), p([0]), p([2]))]
    #[case(p([0]), p([2]), p([1]), p([0]))]
    #[case(p([2]), p([0]), p([0]), p([1]))]
    #[case(p([0, 1]), p([1, 0]), p([1, 0]), p([1, 1]))]
    #[case(p([0, 1]), p([1, 0]), p([0, 2]), p([0, 1]))]
    #[case(p([0, 1]), p([1, 0]), p([0, 1, 3]), p([1, 0, 3]))]
    fn test_transform_move(
        #[case] from: Path,
        #[case] to: Path,
        #[case] path: Path,
        #[case] expected: Path,
    ) {
        let op = Operation::MoveNode {
            path: from,
            new_path: to,
        };
        assert_eq!(path.transform(&op, Some(Affinity::Forward)), Some(expected));
    }
}
