//! Read-only lookups over a [`Document`]

use std::rc::Rc;

use crate::node::Text;
use crate::{Document, ModelError, Node, Path, Point, Range};

impl Document {
    pub fn get(&self, path: &Path) -> Option<&Rc<Node>> {
        path.iter()
            .try_fold(self.root(), |node, &index| node.child(index))
    }

    pub fn node(&self, path: &Path) -> Result<&Rc<Node>, ModelError> {
        self.get(path)
            .ok_or_else(|| ModelError::NodeNotFound { path: path.clone() })
    }

    pub fn has(&self, path: &Path) -> bool {
        self.get(path).is_some()
    }

    pub fn leaf(&self, path: &Path) -> Result<&Text, ModelError> {
        self.node(path)?
            .as_text()
            .ok_or_else(|| ModelError::NotText { path: path.clone() })
    }

    /// Every node from the root down to `path`, root first
    pub fn levels(&self, path: &Path) -> Result<Vec<(Path, Rc<Node>)>, ModelError> {
        path.levels()
            .map(|level| {
                let node = self.node(&level)?.clone();
                Ok((level, node))
            })
            .collect()
    }

    /// All text leaves in document order
    pub fn texts(&self) -> Vec<(Path, Rc<Node>)> {
        let mut texts = Vec::new();
        collect_texts(self.root(), Path::root(), true, &mut texts);
        texts
    }

    /// Text leaves between the edges of `range`. Leaves inside void elements
    /// are skipped unless `voids` is set.
    pub fn texts_in(&self, range: &Range, voids: bool) -> Vec<(Path, Rc<Node>)> {
        let (start, end) = range.edges();
        let mut texts = Vec::new();
        collect_texts(self.root(), Path::root(), voids, &mut texts);
        texts.retain(|(path, _)| !path.is_before(&start.path) && !path.is_after(&end.path));
        texts
    }

    /// First point inside the node at `path`
    pub fn start(&self, path: &Path) -> Result<Point, ModelError> {
        let mut path = path.clone();
        let mut node = self.node(&path)?;
        while let Some(first) = node.child(0) {
            path = path.child(0);
            node = first;
        }
        if !node.is_text() {
            return Err(ModelError::NotText { path });
        }
        Ok(Point::new(path, 0))
    }

    /// Last point inside the node at `path`
    pub fn end(&self, path: &Path) -> Result<Point, ModelError> {
        let mut path = path.clone();
        let mut node = self.node(&path)?;
        while let Some(last) = node.children().last() {
            path = path.child(node.children().len() - 1);
            node = last;
        }
        let leaf = node
            .as_text()
            .ok_or_else(|| ModelError::NotText { path: path.clone() })?;
        Ok(Point::new(path, leaf.len()))
    }

    /// Closest block element strictly above `path`, the root excluded
    pub fn above_block(&self, path: &Path) -> Option<(Path, Rc<Node>)> {
        let levels = self.levels(path).ok()?;
        levels
            .into_iter()
            .rev()
            .find(|(level, node)| level != path && !level.is_root() && node.is_block())
    }

    /// Outermost void element containing (or at) `path`
    pub fn highest_void(&self, path: &Path) -> Option<(Path, Rc<Node>)> {
        self.levels(path)
            .ok()?
            .into_iter()
            .find(|(_, node)| node.is_void())
    }

    /// Innermost void element containing (or at) `path`
    pub fn lowest_void(&self, path: &Path) -> Option<(Path, Rc<Node>)> {
        self.levels(path)
            .ok()?
            .into_iter()
            .rev()
            .find(|(_, node)| node.is_void())
    }

    /// Pulls the end of an expanded range back out of a block it only touches
    /// at offset zero, so that it ends on the last non-empty leaf before it.
    pub fn unhang_range(&self, range: &Range, voids: bool) -> Range {
        let (start, end) = range.edges();
        if start.offset != 0 || end.offset != 0 || range.is_collapsed() || end.path.has_previous()
        {
            return range.clone();
        }

        let block_path = self
            .above_block(&end.path)
            .map(|(path, _)| path)
            .unwrap_or_default();
        let before = Range::new(start.clone(), end.clone());

        let unhung = self
            .texts_in(&before, voids)
            .into_iter()
            .rev()
            .skip(1)
            .find(|(path, node)| {
                let empty = node.as_text().is_none_or(Text::is_empty);
                !empty || path.is_before(&block_path)
            })
            .map(|(path, node)| {
                let offset = node.as_text().map_or(0, Text::len);
                Point::new(path, offset)
            });

        Range::new(start, unhung.unwrap_or(end))
    }
}

fn collect_texts(node: &Rc<Node>, path: Path, voids: bool, out: &mut Vec<(Path, Rc<Node>)>) {
    if node.is_text() {
        out.push((path, node.clone()));
        return;
    }
    if node.is_void() && !voids {
        return;
    }
    for (index, child) in node.children().iter().enumerate() {
        collect_texts(child, path.child(index), voids, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn doc() -> Document {
        Document::new(vec![
            Node::element("paragraph", vec![Node::text("first")]),
            Node::element("paragraph", vec![Node::text("hello")]),
            Node::void_element("image"),
        ])
    }

    #[test]
    fn test_levels_include_root_and_target() {
        let doc = doc();
        let levels: Vec<Path> = doc
            .levels(&Path::from([1, 0]))
            .unwrap()
            .into_iter()
            .map(|(path, _)| path)
            .collect();
        assert_eq!(levels, vec![Path::root(), Path::from([1]), Path::from([1, 0])]);
    }

    #[test]
    fn test_levels_of_stale_path_fail() {
        let err = doc().levels(&Path::from([5, 0])).unwrap_err();
        assert_eq!(
            err,
            ModelError::NodeNotFound {
                path: Path::from([5])
            }
        );
    }

    #[test]
    fn test_texts_skip_voids_only_when_asked() {
        let doc = doc();
        assert_eq!(doc.texts().len(), 3);

        let all = Range::new(Point::new([0, 0], 0), Point::new([2, 0], 0));
        assert_eq!(doc.texts_in(&all, true).len(), 3);
        assert_eq!(doc.texts_in(&all, false).len(), 2);
    }

    #[test]
    fn test_start_and_end_of_block() {
        let doc = doc();
        assert_eq!(doc.start(&Path::from([1])).unwrap(), Point::new([1, 0], 0));
        assert_eq!(doc.end(&Path::from([1])).unwrap(), Point::new([1, 0], 5));
        assert_eq!(doc.end(&Path::root()).unwrap(), Point::new([2, 0], 0));
    }

    #[test]
    fn test_void_lookup() {
        let doc = doc();
        let (path, _) = doc.highest_void(&Path::from([2, 0])).unwrap();
        assert_eq!(path, Path::from([2]));
        assert!(doc.lowest_void(&Path::from([1, 0])).is_none());
    }

    #[test]
    fn test_unhang_pulls_focus_out_of_trailing_void() {
        let doc = doc();
        let range = Range::new(Point::new([0, 0], 0), Point::new([2, 0], 0));
        assert_eq!(
            doc.unhang_range(&range, true),
            Range::new(Point::new([0, 0], 0), Point::new([1, 0], 5))
        );
    }

    #[rstest]
    #[case(Range::new(Point::new([0, 0], 1), Point::new([2, 0], 0)))]
    #[case(Range::collapsed(Point::new([1, 0], 0)))]
    #[case(Range::new(Point::new([0, 0], 0), Point::new([1, 0], 2)))]
    fn test_unhang_leaves_non_hanging_ranges_alone(#[case] range: Range) {
        assert_eq!(doc().unhang_range(&range, true), range);
    }
}
