use tessera_model::Point;

use super::{PointOptions, SearchDirection};
use crate::editor::Editor;
use crate::error::EditorError;
use crate::identity::PathResolutionError;
use crate::surface::{
    ElementData, PLACEHOLDER_MARKER, Role, Surface, SurfaceNodeId, SurfacePoint,
};

/// Element children carrying nothing a caret can sit in
fn is_skippable(surface: &Surface, id: SurfaceNodeId) -> bool {
    surface
        .element(id)
        .is_some_and(|e| surface.children(id).is_empty() || e.is_non_editable())
}

/// The child of `parent` at `index`, or the nearest sibling in `direction`
/// that is neither empty nor non-editable, trying the other direction once
/// the first is exhausted. Returns the child and its index.
pub fn editable_child_and_index(
    surface: &Surface,
    parent: SurfaceNodeId,
    index: usize,
    direction: SearchDirection,
) -> (Option<SurfaceNodeId>, usize) {
    let children = surface.children(parent);
    let len = children.len() as isize;
    let child_at = |i: isize| usize::try_from(i).ok().and_then(|i| children.get(i).copied());

    let mut index = index as isize;
    let mut direction = direction;
    let mut child = child_at(index);
    let mut i = index;
    let mut tried_forward = false;
    let mut tried_backward = false;

    while child.is_some_and(|c| is_skippable(surface, c)) {
        if tried_forward && tried_backward {
            break;
        }
        if i >= len {
            tried_forward = true;
            i = index - 1;
            direction = SearchDirection::Backward;
            continue;
        }
        if i < 0 {
            tried_backward = true;
            i = index + 1;
            direction = SearchDirection::Forward;
            continue;
        }
        child = child_at(i);
        index = i;
        i += match direction {
            SearchDirection::Forward => 1,
            SearchDirection::Backward => -1,
        };
    }

    (child, index.max(0) as usize)
}

/// Moves a point that addresses an element child down to a text position:
/// the start of the following editable content, or the end of the preceding
/// one when the point is past the last child.
pub fn normalize_point(surface: &Surface, point: SurfacePoint) -> SurfacePoint {
    let SurfacePoint { node, offset } = point;
    let count = surface.children(node).len();
    if !surface.is_element(node) || count == 0 {
        return point;
    }

    let mut is_last = offset >= count;
    let start = if is_last { count - 1 } else { offset };
    let direction = if is_last {
        SearchDirection::Backward
    } else {
        SearchDirection::Forward
    };
    let (child, index) = editable_child_and_index(surface, node, start, direction);
    let Some(mut current) = child else {
        return point;
    };
    is_last = index < offset;

    while surface.is_element(current) {
        let children = surface.children(current);
        if children.is_empty() {
            break;
        }
        let (i, direction) = if is_last {
            (children.len() - 1, SearchDirection::Backward)
        } else {
            (0, SearchDirection::Forward)
        };
        match editable_child_and_index(surface, current, i, direction) {
            (Some(next), _) => current = next,
            (None, _) => break,
        }
    }

    let offset = if is_last { surface.text_len(current) } else { 0 };
    SurfacePoint::new(current, offset)
}

impl Editor {
    /// Surface position of a model point inside a rendered leaf
    pub fn to_surface_point(
        &self,
        surface: &Surface,
        point: &Point,
    ) -> Result<SurfacePoint, EditorError> {
        let unresolved = || EditorError::SurfacePointResolution {
            point: point.clone(),
        };
        let leaf = self
            .document
            .get(&point.path)
            .filter(|node| node.is_text())
            .ok_or_else(unresolved)?;
        let key = self.registry.key(leaf).ok_or_else(unresolved)?;
        let text_element = surface.node_for_key(key).ok_or_else(unresolved)?;

        let offset = if self.document.lowest_void(&point.path).is_some() {
            0
        } else {
            point.offset
        };

        let spans: Vec<SurfaceNodeId> = surface
            .descendants(text_element)
            .into_iter()
            .filter(|d| {
                surface
                    .role(*d)
                    .is_some_and(|r| matches!(r, Role::String { .. } | Role::ZeroWidth { .. }))
            })
            .collect();

        let mut start = 0;
        for (i, span) in spans.iter().enumerate() {
            let Some(text_node) = surface.children(*span).first().copied() else {
                continue;
            };
            let Some(text) = surface.text(text_node) else {
                continue;
            };
            let length = text.chars().count();
            let declared = match surface.role(*span) {
                Some(Role::String { length: Some(declared) }) => *declared,
                Some(Role::ZeroWidth { length, .. }) => *length,
                _ => length,
            };
            let end = start + declared;

            let next = spans
                .get(i + 1)
                .copied()
                .filter(|n| surface.element(*n).is_some_and(|e| e.mark_placeholder));
            if offset == end
                && let Some(next) = next
            {
                let marker = surface.children(next).first().copied();
                let node = marker.filter(|m| surface.is_text(*m)).unwrap_or(next);
                let starts_with_marker = surface.text_content(next).starts_with(PLACEHOLDER_MARKER);
                return Ok(SurfacePoint::new(node, usize::from(starts_with_marker)));
            }
            if offset <= end {
                return Ok(SurfacePoint::new(
                    text_node,
                    length.min(offset.saturating_sub(start)),
                ));
            }
            start = end;
        }

        Err(unresolved())
    }

    /// Model point for a surface point, `Ok(None)` when it cannot be resolved
    /// and `suppress_throw` is set
    pub fn to_model_point(
        &self,
        surface: &Surface,
        point: SurfacePoint,
        options: PointOptions,
    ) -> Result<Option<Point>, EditorError> {
        let fail = |err: EditorError| {
            if options.suppress_throw {
                Ok(None)
            } else {
                Err(err)
            }
        };
        let unresolved = EditorError::ModelPointResolution { point };

        let nearest = if options.exact_match {
            point
        } else {
            normalize_point(surface, point)
        };
        let (Some(parent), Some(editor_root)) =
            (surface.parent(nearest.node), surface.editor_root(self.id()))
        else {
            return fail(unresolved);
        };
        let in_editor = |id: &SurfaceNodeId| surface.contains(editor_root, *id);

        let void_node = surface.closest(parent, ElementData::is_void).filter(in_editor);
        let non_editable = surface
            .closest(parent, ElementData::is_non_editable)
            .filter(in_editor);

        let leaf = surface.closest(parent, ElementData::is_leaf);
        let (text_element, offset) = if let Some(leaf) = leaf {
            let Some(text_element) = surface.closest(leaf, ElementData::is_text) else {
                return fail(unresolved);
            };
            let keep_composition =
                self.options().quirks.composition_in_placeholder && !options.exact_match;
            let mut offset = surface.measure_until(text_element, nearest, |e| {
                e.is_non_editable() || (e.is_zero_width() && !keep_composition)
            });

            if keep_composition {
                offset = offset.saturating_sub(composed_markers(surface, text_element, nearest));
            }
            (text_element, offset)
        } else if let Some(void_node) = void_node {
            match self.first_leaf(surface, void_node) {
                Some(leaf) => {
                    let Some(text_element) = surface.closest(leaf, ElementData::is_text) else {
                        return fail(unresolved);
                    };
                    (text_element, self.leaf_content_len(surface, leaf))
                }
                None => return self.void_start(surface, void_node, options, unresolved),
            }
        } else if let Some(non_editable) = non_editable {
            let Some(leaf) = self.adjacent_leaf(surface, non_editable, options.search_direction)
            else {
                return fail(unresolved);
            };
            let Some(text_element) = surface.closest(leaf, ElementData::is_text) else {
                return fail(unresolved);
            };
            let offset = match options.search_direction {
                SearchDirection::Forward => 0,
                SearchDirection::Backward => self.leaf_content_len(surface, leaf),
            };
            (text_element, offset)
        } else {
            return fail(unresolved);
        };

        match self.resolve_surface_node(surface, text_element) {
            Ok(path) => Ok(Some(Point::new(path, offset))),
            Err(err) => fail(err),
        }
    }

    /// Text length of a leaf without its placeholder markers
    fn leaf_content_len(&self, surface: &Surface, leaf: SurfaceNodeId) -> usize {
        let placeholders: usize = surface
            .descendants(leaf)
            .into_iter()
            .filter(|d| surface.element(*d).is_some_and(ElementData::is_zero_width))
            .map(|d| surface.text_len(d))
            .sum();
        surface.text_len(leaf).saturating_sub(placeholders)
    }

    /// Leaves below `scope` that belong to this editor, not a nested one
    fn own_leaves(&self, surface: &Surface, scope: SurfaceNodeId) -> Vec<SurfaceNodeId> {
        let root = surface.editor_root(self.id());
        surface
            .descendants(scope)
            .into_iter()
            .filter(|d| surface.element(*d).is_some_and(ElementData::is_leaf))
            .filter(|d| root.is_some() && surface.closest(*d, ElementData::is_editor_root) == root)
            .collect()
    }

    fn first_leaf(&self, surface: &Surface, scope: SurfaceNodeId) -> Option<SurfaceNodeId> {
        self.own_leaves(surface, scope).into_iter().next()
    }

    /// Nearest leaf of this editor next to a non-editable region, looking in
    /// its element and the sibling element on the searched side
    fn adjacent_leaf(
        &self,
        surface: &Surface,
        non_editable: SurfaceNodeId,
        direction: SearchDirection,
    ) -> Option<SurfaceNodeId> {
        let element = surface.closest(non_editable, ElementData::is_element);
        let leaves_of = |id: Option<SurfaceNodeId>| {
            id.map(|id| self.own_leaves(surface, id))
                .unwrap_or_default()
        };
        let outside = |leaf: &SurfaceNodeId| !surface.contains(non_editable, *leaf);

        match direction {
            SearchDirection::Forward => {
                let sibling = element.and_then(|e| surface.next_element_sibling(e));
                leaves_of(element)
                    .into_iter()
                    .chain(leaves_of(sibling))
                    .filter(outside)
                    .find(|leaf| surface.compare(*leaf, non_editable).is_gt())
            }
            SearchDirection::Backward => {
                let sibling = element.and_then(|e| surface.previous_element_sibling(e));
                leaves_of(sibling)
                    .into_iter()
                    .chain(leaves_of(element))
                    .filter(outside)
                    .filter(|leaf| surface.compare(*leaf, non_editable).is_lt())
                    .last()
            }
        }
    }

    /// A void with no rendered leaf maps to its own start
    fn void_start(
        &self,
        surface: &Surface,
        void_node: SurfaceNodeId,
        options: PointOptions,
        unresolved: EditorError,
    ) -> Result<Option<Point>, EditorError> {
        let start = self
            .resolve_surface_node(surface, void_node)
            .and_then(|path| self.document.start(&path).map_err(EditorError::from));
        match start {
            Ok(point) => Ok(Some(point)),
            Err(_) if options.suppress_throw => Ok(None),
            Err(_) => Err(unresolved),
        }
    }

    /// Model path of the node a keyed surface element renders
    fn resolve_surface_node(
        &self,
        surface: &Surface,
        id: SurfaceNodeId,
    ) -> Result<tessera_model::Path, EditorError> {
        let key = surface
            .role(id)
            .and_then(Role::key)
            .ok_or(EditorError::ModelPointResolution {
                point: SurfacePoint::new(id, 0),
            })?;
        let node = self
            .registry
            .node_for_key(key)
            .ok_or(PathResolutionError::UnknownKey { key })?;
        let path = self.registry.resolve_id(node)?;
        if self.document.get(&path).map(|n| n.id()) != Some(node) {
            return Err(PathResolutionError::Stale { key, path }.into());
        }
        Ok(path)
    }
}

/// Placeholder markers counted while measuring up to `point` with composed
/// placeholder text kept. The host composes after the marker, so every
/// placeholder the point reaches into contributes one marker.
fn composed_markers(
    surface: &Surface,
    text_element: SurfaceNodeId,
    point: SurfacePoint,
) -> usize {
    surface
        .descendants(text_element)
        .into_iter()
        .filter(|d| surface.element(*d).is_some_and(ElementData::is_zero_width))
        .filter(|d| surface.text_content(*d).starts_with(PLACEHOLDER_MARKER))
        .filter(|d| surface.measure_until(*d, point, |_| false) > 0)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::render_document;
    use pretty_assertions::assert_eq;
    use tessera_model::{Document, Node, Path};

    fn rendered(children: Vec<Node>) -> (Editor, Surface, SurfaceNodeId) {
        let mut editor = Editor::new(Document::new(children));
        let mut surface = Surface::new();
        let root = render_document(&mut editor, &mut surface);
        (editor, surface, root)
    }

    /// The first text node below the surface node of the leaf at `path`
    fn text_node(editor: &Editor, surface: &Surface, path: &[usize]) -> SurfaceNodeId {
        let leaf = editor.document().node(&Path::from(path)).unwrap();
        let element = surface
            .node_for_key(editor.registry().key(leaf).unwrap())
            .unwrap();
        surface
            .descendants(element)
            .into_iter()
            .find(|d| surface.is_text(*d))
            .unwrap()
    }

    #[test]
    fn test_editable_child_skips_empty_and_non_editable_children() {
        let mut surface = Surface::new();
        let parent = surface.create_element("div", Role::Plain);
        let empty = surface.create_element("br", Role::Plain);
        let locked = surface.create_element("span", Role::Plain);
        surface.set_text(locked, "x");
        surface.set_editable(locked, Some(false));
        let text = surface.create_text("abc");
        for child in [empty, locked, text] {
            surface.append(parent, child);
        }

        assert_eq!(
            editable_child_and_index(&surface, parent, 0, SearchDirection::Forward),
            (Some(text), 2)
        );
        // backward runs out, then turns around
        assert_eq!(
            editable_child_and_index(&surface, parent, 1, SearchDirection::Backward),
            (Some(text), 2)
        );
    }

    #[test]
    fn test_normalize_point_descends_to_text() {
        let (editor, surface, root) = rendered(vec![
            Node::element("paragraph", vec![Node::text("one")]),
            Node::element("paragraph", vec![Node::text("two")]),
        ]);
        let first = text_node(&editor, &surface, &[0, 0]);
        let second = text_node(&editor, &surface, &[1, 0]);

        assert_eq!(
            normalize_point(&surface, SurfacePoint::new(root, 1)),
            SurfacePoint::new(second, 0)
        );
        assert_eq!(
            normalize_point(&surface, SurfacePoint::new(root, 2)),
            SurfacePoint::new(second, 3)
        );
        assert_eq!(
            normalize_point(&surface, SurfacePoint::new(root, 0)),
            SurfacePoint::new(first, 0)
        );
    }

    #[test]
    fn test_to_surface_point_lands_in_string_span() {
        let (editor, surface, _) =
            rendered(vec![Node::element("paragraph", vec![Node::text("hello")])]);
        let text = text_node(&editor, &surface, &[0, 0]);

        let point = editor
            .to_surface_point(&surface, &Point::new([0, 0], 3))
            .unwrap();
        assert_eq!(point, SurfacePoint::new(text, 3));
    }

    #[test]
    fn test_to_surface_point_past_the_end_fails() {
        let (editor, surface, _) =
            rendered(vec![Node::element("paragraph", vec![Node::text("hi")])]);
        let point = Point::new([0, 0], 7);

        assert_eq!(
            editor.to_surface_point(&surface, &point),
            Err(EditorError::SurfacePointResolution { point })
        );
    }

    #[test]
    fn test_to_model_point_in_non_editable_region_searches_neighbours() {
        let (editor, mut surface, _) = rendered(vec![
            Node::element("paragraph", vec![Node::text("left")]),
            Node::element("paragraph", vec![Node::text("right")]),
        ]);
        let first = editor.document().node(&Path::from([0])).unwrap();
        let paragraph = surface
            .node_for_key(editor.registry().key(first).unwrap())
            .unwrap();
        let badge = surface.create_element("span", Role::Plain);
        surface.set_editable(badge, Some(false));
        surface.set_text(badge, "badge");
        surface.append(paragraph, badge);
        let inside = SurfacePoint::new(surface.children(badge)[0], 2);

        let backward = editor
            .to_model_point(&surface, inside, PointOptions::exact())
            .unwrap();
        assert_eq!(backward, Some(Point::new([0, 0], 4)));

        let forward = PointOptions {
            exact_match: true,
            search_direction: SearchDirection::Forward,
            ..Default::default()
        };
        assert_eq!(
            editor.to_model_point(&surface, inside, forward).unwrap(),
            Some(Point::new([1, 0], 0))
        );
    }

    #[test]
    fn test_to_model_point_outside_editor_respects_suppress_throw() {
        let (editor, mut surface, _) =
            rendered(vec![Node::element("paragraph", vec![Node::text("a")])]);
        let stray = surface.create_text("stray");
        let holder = surface.create_element("p", Role::Plain);
        surface.append(holder, stray);
        surface.append(surface.body(), holder);
        let point = SurfacePoint::new(stray, 1);

        assert_eq!(
            editor.to_model_point(&surface, point, PointOptions::lenient()),
            Ok(None)
        );
        assert_eq!(
            editor.to_model_point(&surface, point, PointOptions::default()),
            Err(EditorError::ModelPointResolution { point })
        );
    }

    #[test]
    fn test_to_model_point_with_stale_key_is_a_path_error() {
        let (mut editor, surface, _) =
            rendered(vec![Node::element("paragraph", vec![Node::text("abc")])]);
        let text = text_node(&editor, &surface, &[0, 0]);
        editor
            .apply(tessera_model::Operation::RemoveNode {
                path: Path::from([0]),
                node: Node::element("paragraph", vec![]),
            })
            .unwrap();

        let result = editor.to_model_point(&surface, SurfacePoint::new(text, 1), PointOptions::exact());
        assert!(matches!(result, Err(EditorError::PathResolution(_))));
    }
}
