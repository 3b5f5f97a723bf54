use std::rc::Rc;

use crate::node::{byte_index, char_len};
use crate::refs::Refs;
use crate::{
    Affinity, ModelError, Node, Operation, Path, PathRefId, Point, Props, Range, RangeAffinity,
    RangeRefId,
};

/// Element kind of the document root
pub const ROOT_KIND: &str = "editor";

/// The model tree plus its selection and live references.
///
/// The tree is persistent: [`Document::apply`] rebuilds the lineage of the
/// nodes an operation touches and shares every other subtree with the previous
/// root. Rebuilt nodes carry fresh [`crate::NodeId`]s, which is what makes an
/// external identity registry necessary.
///
/// ```rust
/// # use tessera_model::{Document, Node, Operation, Path};
/// let mut doc = Document::new(vec![Node::element("paragraph", vec![Node::text("one")])]);
/// let before = doc.node(&Path::from([0])).unwrap().id();
///
/// doc.apply(&Operation::InsertText {
///     path: Path::from([0, 0]),
///     offset: 3,
///     text: "!".to_string(),
/// })
/// .unwrap();
///
/// assert_eq!(doc.root().string(), "one!");
/// assert_ne!(doc.node(&Path::from([0])).unwrap().id(), before);
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    root: Rc<Node>,
    selection: Option<Range>,
    refs: Refs,
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Document {
            root: Rc::new(Node::element(ROOT_KIND, children)),
            selection: None,
            refs: Refs::default(),
        }
    }

    pub fn root(&self) -> &Rc<Node> {
        &self.root
    }

    pub fn children(&self) -> &[Rc<Node>] {
        self.root.children()
    }

    pub fn selection(&self) -> Option<&Range> {
        self.selection.as_ref()
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    pub fn path_ref(&mut self, path: Path, affinity: Option<Affinity>) -> PathRefId {
        self.refs.path_ref(path, affinity)
    }

    pub fn path_ref_current(&self, id: PathRefId) -> Option<&Path> {
        self.refs.path(id)
    }

    pub fn unref_path(&mut self, id: PathRefId) -> Option<Path> {
        self.refs.unref_path(id)
    }

    pub fn range_ref(&mut self, range: Range, affinity: RangeAffinity) -> RangeRefId {
        self.refs.range_ref(range, affinity)
    }

    pub fn range_ref_current(&self, id: RangeRefId) -> Option<&Range> {
        self.refs.range(id)
    }

    pub fn unref_range(&mut self, id: RangeRefId) -> Option<Range> {
        self.refs.unref_range(id)
    }

    /// Applies one operation. On error the document is left untouched.
    pub fn apply(&mut self, op: &Operation) -> Result<(), ModelError> {
        if let Operation::SetSelection { new_properties, .. } = op {
            self.selection = new_properties.clone();
            return Ok(());
        }

        self.root = self.rebuild(op)?;
        self.refs.transform(op);
        self.selection = match self.selection.take() {
            Some(selection) => self.transform_selection(selection, op),
            None => None,
        };
        Ok(())
    }

    fn rebuild(&self, op: &Operation) -> Result<Rc<Node>, ModelError> {
        match op {
            Operation::InsertText { path, offset, text } => {
                update(&self.root, path, path, |node| {
                    let leaf = node.as_text().ok_or_else(|| not_text(path))?;
                    let at = byte_index(leaf.text(), *offset)
                        .ok_or_else(|| out_of_bounds(path, *offset))?;
                    let mut updated = leaf.text().to_string();
                    updated.insert_str(at, text);
                    Ok(node.with_text(updated))
                })
            }
            Operation::RemoveText { path, offset, text } => {
                update(&self.root, path, path, |node| {
                    let leaf = node.as_text().ok_or_else(|| not_text(path))?;
                    let end_offset = offset + char_len(text);
                    let start = byte_index(leaf.text(), *offset)
                        .ok_or_else(|| out_of_bounds(path, *offset))?;
                    let end = byte_index(leaf.text(), end_offset)
                        .ok_or_else(|| out_of_bounds(path, end_offset))?;
                    let mut updated = leaf.text().to_string();
                    updated.replace_range(start..end, "");
                    Ok(node.with_text(updated))
                })
            }
            Operation::InsertNode { path, node } => {
                let (parent, index) = split_path(path, op)?;
                update_children(&self.root, &parent, path, |children| {
                    if index > children.len() {
                        return Err(ModelError::NodeNotFound { path: path.clone() });
                    }
                    children.insert(index, Rc::new(node.reidentified()));
                    Ok(())
                })
            }
            Operation::RemoveNode { path, .. } => {
                let (parent, index) = split_path(path, op)?;
                update_children(&self.root, &parent, path, |children| {
                    if index >= children.len() {
                        return Err(ModelError::NodeNotFound { path: path.clone() });
                    }
                    children.remove(index);
                    Ok(())
                })
            }
            Operation::SetNode {
                path,
                properties,
                new_properties,
            } => {
                if path.is_root() {
                    return Err(ModelError::RootOperation { kind: op.kind() });
                }
                update(&self.root, path, path, |node| {
                    Ok(node.with_props(merge_props(node.props(), properties, new_properties)))
                })
            }
            Operation::SplitNode {
                path,
                position,
                properties,
            } => {
                let (parent, index) = split_path(path, op)?;
                let node = self.node(path)?;
                let (left, right) = split(node, path, *position, properties)?;
                update_children(&self.root, &parent, path, |children| {
                    children[index] = Rc::new(left);
                    children.insert(index + 1, Rc::new(right));
                    Ok(())
                })
            }
            Operation::MergeNode { path, .. } => {
                let (parent, index) = split_path(path, op)?;
                if index == 0 {
                    return Err(ModelError::InvalidMerge { path: path.clone() });
                }
                update_children(&self.root, &parent, path, |children| {
                    let node = children
                        .get(index)
                        .cloned()
                        .ok_or_else(|| ModelError::NodeNotFound { path: path.clone() })?;
                    let merged = merge(&children[index - 1], &node, path)?;
                    children[index - 1] = Rc::new(merged);
                    children.remove(index);
                    Ok(())
                })
            }
            Operation::MoveNode { path, new_path } => {
                let (parent, index) = split_path(path, op)?;
                if new_path.is_root() {
                    return Err(ModelError::RootOperation { kind: op.kind() });
                }
                if path.is_ancestor(new_path) {
                    return Err(ModelError::InvalidMove {
                        path: path.clone(),
                        new_path: new_path.clone(),
                    });
                }
                if path == new_path {
                    return Ok(self.root.clone());
                }

                let node = self.node(path)?.clone();
                let removed = update_children(&self.root, &parent, path, |children| {
                    children.remove(index);
                    Ok(())
                })?;

                let true_path = path.transform(op, None).ok_or_else(|| ModelError::InvalidMove {
                    path: path.clone(),
                    new_path: new_path.clone(),
                })?;
                let (new_parent, new_index) = split_path(&true_path, op)?;
                update_children(&removed, &new_parent, new_path, |children| {
                    let at = new_index.min(children.len());
                    children.insert(at, node);
                    Ok(())
                })
            }
            Operation::SetSelection { .. } => Ok(self.root.clone()),
        }
    }

    fn transform_selection(&self, selection: Range, op: &Operation) -> Option<Range> {
        let forward = Some(Affinity::Forward);
        let Operation::RemoveNode { path: removed, .. } = op else {
            let anchor = selection.anchor.transform(op, forward)?;
            let focus = selection.focus.transform(op, forward)?;
            return Some(Range { anchor, focus });
        };

        let anchor = match selection.anchor.transform(op, forward) {
            Some(point) => point,
            None => self.nearest_text_point(removed)?,
        };
        let focus = match selection.focus.transform(op, forward) {
            Some(point) => point,
            None => self.nearest_text_point(removed)?,
        };
        Some(Range { anchor, focus })
    }

    /// Where a point that lived in a removed subtree lands: the end of the
    /// previous leaf, or the start of the next one when that is closer.
    fn nearest_text_point(&self, removed: &Path) -> Option<Point> {
        let mut prev = None;
        let mut next = None;
        for (path, node) in self.texts() {
            if path.is_before(removed) {
                prev = Some((path, node));
            } else {
                next = Some((path, node));
                break;
            }
        }

        let prefer_next = match (&prev, &next) {
            (Some((prev_path, _)), Some((next_path, _))) => {
                if next_path == removed {
                    !next_path.has_previous()
                } else {
                    prev_path.common(removed).len() < next_path.common(removed).len()
                }
            }
            _ => false,
        };

        match (prev, next) {
            (Some((path, node)), _) if !prefer_next => {
                let offset = node.as_text().map_or(0, |leaf| leaf.len());
                Some(Point::new(path, offset))
            }
            (_, Some((path, _))) => Some(Point::new(path, 0)),
            _ => None,
        }
    }
}

fn not_text(path: &Path) -> ModelError {
    ModelError::NotText { path: path.clone() }
}

fn out_of_bounds(path: &Path, offset: usize) -> ModelError {
    ModelError::OffsetOutOfBounds {
        path: path.clone(),
        offset,
    }
}

fn split_path(path: &Path, op: &Operation) -> Result<(Path, usize), ModelError> {
    match (path.parent(), path.last()) {
        (Some(parent), Some(index)) => Ok((parent, index)),
        _ => Err(ModelError::RootOperation { kind: op.kind() }),
    }
}

/// Rebuilds the lineage from `node` down to `path`, replacing the target with
/// whatever `f` returns. Siblings along the way are shared.
fn update<F>(node: &Rc<Node>, path: &[usize], full: &Path, f: F) -> Result<Rc<Node>, ModelError>
where
    F: FnOnce(&Rc<Node>) -> Result<Node, ModelError>,
{
    let Some((&index, rest)) = path.split_first() else {
        return Ok(Rc::new(f(node)?));
    };
    let child = node
        .child(index)
        .ok_or_else(|| ModelError::NodeNotFound { path: full.clone() })?;
    let updated = update(child, rest, full, f)?;
    let mut children = node.children().to_vec();
    children[index] = updated;
    Ok(Rc::new(node.with_children(children)))
}

fn update_children<F>(
    root: &Rc<Node>,
    parent: &Path,
    full: &Path,
    f: F,
) -> Result<Rc<Node>, ModelError>
where
    F: FnOnce(&mut Vec<Rc<Node>>) -> Result<(), ModelError>,
{
    update(root, parent, full, |node| {
        if !node.is_element() {
            return Err(ModelError::NotElement {
                path: parent.clone(),
            });
        }
        let mut children = node.children().to_vec();
        f(&mut children)?;
        Ok(node.with_children(children))
    })
}

/// `null` values and keys dropped from `new_properties` are removed
fn merge_props(current: &Props, properties: &Props, new_properties: &Props) -> Props {
    let mut props = current.clone();
    for (key, value) in new_properties {
        if value.is_null() {
            props.remove(key);
        } else {
            props.insert(key.clone(), value.clone());
        }
    }
    for key in properties.keys() {
        if !new_properties.contains_key(key) {
            props.remove(key);
        }
    }
    props
}

fn split(
    node: &Node,
    path: &Path,
    position: usize,
    properties: &Props,
) -> Result<(Node, Node), ModelError> {
    let mut right_props = node.props().clone();
    right_props.extend(properties.iter().map(|(k, v)| (k.clone(), v.clone())));

    match node {
        Node::Text(leaf) => {
            let at =
                byte_index(leaf.text(), position).ok_or_else(|| out_of_bounds(path, position))?;
            let (before, after) = leaf.text().split_at(at);
            let left = node.with_text(before.to_string());
            let right = Node::text_with_marks(after, right_props);
            Ok((left, right))
        }
        Node::Element(element) => {
            if position > element.children().len() {
                return Err(out_of_bounds(path, position));
            }
            let (before, after) = element.children().split_at(position);
            let left = node.with_children(before.to_vec());
            let right = node.with_children(after.to_vec()).with_props(right_props);
            Ok((left, right))
        }
    }
}

fn merge(prev: &Rc<Node>, node: &Rc<Node>, path: &Path) -> Result<Node, ModelError> {
    match (prev.as_ref(), node.as_ref()) {
        (Node::Text(a), Node::Text(b)) => Ok(prev.with_text(format!("{}{}", a.text(), b.text()))),
        (Node::Element(a), Node::Element(b)) => {
            let children = a.children().iter().chain(b.children()).cloned().collect();
            Ok(prev.with_children(children))
        }
        _ => Err(ModelError::InvalidMerge { path: path.clone() }),
    }
}
