//! In-memory editable surface.
//!
//! The surface stands in for the host's native content tree: an arena of
//! element and text nodes with parent links, a native selection and a focus
//! marker. Elements carry a [`Role`] telling the mappers what part of the
//! rendered document they are, which is all the mappers ever look at.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::{self, Write as _};

use uuid::Uuid;

use crate::identity::Key;

mod render;
mod selection;

pub use render::{render_document, render_document_into};
pub use selection::{SelectionSource, SurfacePoint, SurfaceRange, SurfaceSelection};

/// Character rendered inside zero-width placeholders
pub const PLACEHOLDER_MARKER: char = '\u{FEFF}';

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceNodeId(usize);

impl fmt::Display for SurfaceNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifies one editor instance on a surface, so nested editors can be
/// told apart.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EditorId(Uuid);

impl EditorId {
    pub fn new() -> Self {
        EditorId(Uuid::new_v4())
    }
}

impl Default for EditorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EditorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Role {
    /// Root container of one editor instance
    EditorRoot(EditorId),
    /// Rendered model element
    Element { key: Key, void: bool, inline: bool },
    /// Rendered model text leaf
    Text { key: Key },
    /// One styled run inside a text leaf
    Leaf,
    /// Span holding real text. `length` overrides the painted length when set.
    String { length: Option<usize> },
    /// Placeholder keeping an empty region focusable
    ZeroWidth { length: usize, line_break: bool },
    /// Wrapper holding the hidden leaf of a void element
    Spacer,
    Plain,
}

impl Role {
    pub fn key(&self) -> Option<Key> {
        match self {
            Role::Element { key, .. } | Role::Text { key } => Some(*key),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ElementData {
    pub tag: String,
    pub role: Role,
    pub editable: Option<bool>,
    pub mark_placeholder: bool,
}

impl ElementData {
    pub fn is_leaf(&self) -> bool {
        self.role == Role::Leaf
    }

    pub fn is_text(&self) -> bool {
        matches!(self.role, Role::Text { .. })
    }

    pub fn is_element(&self) -> bool {
        matches!(self.role, Role::Element { .. })
    }

    pub fn is_void(&self) -> bool {
        matches!(self.role, Role::Element { void: true, .. })
    }

    pub fn is_zero_width(&self) -> bool {
        matches!(self.role, Role::ZeroWidth { .. })
    }

    pub fn is_editor_root(&self) -> bool {
        matches!(self.role, Role::EditorRoot(_))
    }

    pub fn is_non_editable(&self) -> bool {
        self.editable == Some(false)
    }
}

#[derive(Clone, Debug)]
pub enum Content {
    Element(ElementData),
    Text(String),
}

#[derive(Clone, Debug)]
struct SurfaceNode {
    parent: Option<SurfaceNodeId>,
    children: Vec<SurfaceNodeId>,
    content: Content,
}

#[derive(Debug)]
pub struct Surface {
    nodes: Vec<SurfaceNode>,
    body: SurfaceNodeId,
    keys: HashMap<Key, SurfaceNodeId>,
    editors: HashMap<EditorId, SurfaceNodeId>,
    pub selection: Option<SurfaceSelection>,
    pub active: Option<SurfaceNodeId>,
}

impl Default for Surface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface {
    pub fn new() -> Self {
        let body = SurfaceNode {
            parent: None,
            children: Vec::new(),
            content: Content::Element(ElementData {
                tag: "body".to_string(),
                role: Role::Plain,
                editable: None,
                mark_placeholder: false,
            }),
        };
        Surface {
            nodes: vec![body],
            body: SurfaceNodeId(0),
            keys: HashMap::new(),
            editors: HashMap::new(),
            selection: None,
            active: None,
        }
    }

    pub fn body(&self) -> SurfaceNodeId {
        self.body
    }

    fn push(&mut self, content: Content) -> SurfaceNodeId {
        let id = SurfaceNodeId(self.nodes.len());
        self.nodes.push(SurfaceNode {
            parent: None,
            children: Vec::new(),
            content,
        });
        id
    }

    /// Creates a detached element. Keyed roles become the surface node of
    /// their key, editor roots the root of their editor.
    pub fn create_element(&mut self, tag: &str, role: Role) -> SurfaceNodeId {
        let key = role.key();
        let editor = match role {
            Role::EditorRoot(editor) => Some(editor),
            _ => None,
        };
        let id = self.push(Content::Element(ElementData {
            tag: tag.to_string(),
            role,
            editable: None,
            mark_placeholder: false,
        }));
        if let Some(key) = key {
            self.keys.insert(key, id);
        }
        if let Some(editor) = editor {
            self.editors.insert(editor, id);
        }
        id
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> SurfaceNodeId {
        self.push(Content::Text(text.into()))
    }

    pub fn append(&mut self, parent: SurfaceNodeId, child: SurfaceNodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn detach(&mut self, id: SurfaceNodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    /// Replaces the text of a text node, or every child of an element with a
    /// single text node.
    pub fn set_text(&mut self, id: SurfaceNodeId, text: impl Into<String>) {
        let text = text.into();
        if let Content::Text(current) = &mut self.nodes[id.0].content {
            *current = text;
            return;
        }
        for child in std::mem::take(&mut self.nodes[id.0].children) {
            self.nodes[child.0].parent = None;
        }
        let child = self.create_text(text);
        self.append(id, child);
    }

    pub fn set_editable(&mut self, id: SurfaceNodeId, editable: Option<bool>) {
        if let Some(element) = self.element_mut(id) {
            element.editable = editable;
        }
    }

    pub fn set_mark_placeholder(&mut self, id: SurfaceNodeId, mark_placeholder: bool) {
        if let Some(element) = self.element_mut(id) {
            element.mark_placeholder = mark_placeholder;
        }
    }

    pub fn role_mut(&mut self, id: SurfaceNodeId) -> Option<&mut Role> {
        self.element_mut(id).map(|element| &mut element.role)
    }

    fn element_mut(&mut self, id: SurfaceNodeId) -> Option<&mut ElementData> {
        match &mut self.nodes.get_mut(id.0)?.content {
            Content::Element(element) => Some(element),
            Content::Text(_) => None,
        }
    }

    pub fn content(&self, id: SurfaceNodeId) -> &Content {
        &self.nodes[id.0].content
    }

    pub fn element(&self, id: SurfaceNodeId) -> Option<&ElementData> {
        match &self.nodes.get(id.0)?.content {
            Content::Element(element) => Some(element),
            Content::Text(_) => None,
        }
    }

    pub fn role(&self, id: SurfaceNodeId) -> Option<&Role> {
        self.element(id).map(|element| &element.role)
    }

    pub fn text(&self, id: SurfaceNodeId) -> Option<&str> {
        match &self.nodes.get(id.0)?.content {
            Content::Text(text) => Some(text),
            Content::Element(_) => None,
        }
    }

    pub fn is_text(&self, id: SurfaceNodeId) -> bool {
        self.text(id).is_some()
    }

    pub fn is_element(&self, id: SurfaceNodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn parent(&self, id: SurfaceNodeId) -> Option<SurfaceNodeId> {
        self.nodes.get(id.0)?.parent
    }

    pub fn children(&self, id: SurfaceNodeId) -> &[SurfaceNodeId] {
        &self.nodes[id.0].children
    }

    pub fn element_children(&self, id: SurfaceNodeId) -> Vec<SurfaceNodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.is_element(*c))
            .collect()
    }

    pub fn node_for_key(&self, key: Key) -> Option<SurfaceNodeId> {
        self.keys.get(&key).copied()
    }

    pub fn editor_root(&self, editor: EditorId) -> Option<SurfaceNodeId> {
        self.editors.get(&editor).copied()
    }

    /// Concatenated text of every text node at or below `id`
    pub fn text_content(&self, id: SurfaceNodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|d| self.text(d))
            .collect()
    }

    pub fn text_len(&self, id: SurfaceNodeId) -> usize {
        self.text_content(id).chars().count()
    }

    /// `id` and its ancestors, innermost first
    pub fn ancestors(&self, id: SurfaceNodeId) -> impl Iterator<Item = SurfaceNodeId> + '_ {
        std::iter::successors(Some(id), |n| self.parent(*n))
    }

    /// Closest element at or above `id` matching `predicate`
    pub fn closest(
        &self,
        id: SurfaceNodeId,
        predicate: impl Fn(&ElementData) -> bool,
    ) -> Option<SurfaceNodeId> {
        self.ancestors(id)
            .find(|n| self.element(*n).is_some_and(&predicate))
    }

    /// Every node below `id` in document order
    pub fn descendants(&self, id: SurfaceNodeId) -> Vec<SurfaceNodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<SurfaceNodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// True when `other` is `id` or one of its descendants
    pub fn contains(&self, id: SurfaceNodeId, other: SurfaceNodeId) -> bool {
        self.ancestors(other).any(|n| n == id)
    }

    pub fn index_in_parent(&self, id: SurfaceNodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    fn tree_position(&self, id: SurfaceNodeId) -> Vec<usize> {
        let mut position = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            position.push(self.index_in_parent(current).unwrap_or(0));
            current = parent;
        }
        position.push(current.0);
        position.reverse();
        position
    }

    /// Document order. Ancestors come before their descendants.
    pub fn compare(&self, a: SurfaceNodeId, b: SurfaceNodeId) -> Ordering {
        self.tree_position(a).cmp(&self.tree_position(b))
    }

    pub fn previous_element_sibling(&self, id: SurfaceNodeId) -> Option<SurfaceNodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent)[..index]
            .iter()
            .rev()
            .copied()
            .find(|c| self.is_element(*c))
    }

    pub fn next_element_sibling(&self, id: SurfaceNodeId) -> Option<SurfaceNodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent)[index + 1..]
            .iter()
            .copied()
            .find(|c| self.is_element(*c))
    }

    /// Length of the text between the start of `root` and `point`, leaving out
    /// text below any element (strictly inside `root`) matching `exclude`.
    pub fn measure_until(
        &self,
        root: SurfaceNodeId,
        point: SurfacePoint,
        exclude: impl Fn(&ElementData) -> bool,
    ) -> usize {
        let mut total = 0;
        for node in self.descendants(root) {
            let Some(text) = self.text(node) else {
                continue;
            };
            let covered = match self.covered_chars(node, text, point) {
                Some(covered) => covered,
                None => break,
            };
            let excluded = self
                .ancestors(node)
                .skip(1)
                .take_while(|a| *a != root)
                .any(|a| self.element(a).is_some_and(&exclude));
            if !excluded {
                total += covered;
            }
        }
        total
    }

    /// How much of text node `node` lies before `point`, `None` once past it
    fn covered_chars(&self, node: SurfaceNodeId, text: &str, point: SurfacePoint) -> Option<usize> {
        let len = text.chars().count();
        if self.is_text(point.node) {
            return match self.compare(node, point.node) {
                Ordering::Less => Some(len),
                Ordering::Equal => Some(point.offset.min(len)),
                Ordering::Greater => None,
            };
        }
        let before = match self.children(point.node).get(point.offset) {
            Some(boundary) => self.compare(node, *boundary) == Ordering::Less,
            None => {
                self.contains(point.node, node) || self.compare(node, point.node) == Ordering::Less
            }
        };
        before.then_some(len)
    }

    /// Indented dump of the tree below `id`, one node per line
    pub fn outline(&self, id: SurfaceNodeId) -> String {
        let mut out = String::new();
        self.write_outline(id, 0, &mut out);
        out
    }

    fn write_outline(&self, id: SurfaceNodeId, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        match self.content(id) {
            Content::Text(text) => {
                let _ = writeln!(out, "{indent}{text:?}");
            }
            Content::Element(element) => {
                let _ = writeln!(out, "{indent}{}", describe(element));
                for child in self.children(id) {
                    self.write_outline(*child, depth + 1, out);
                }
            }
        }
    }
}

fn describe(element: &ElementData) -> String {
    let mut line = element.tag.clone();
    match &element.role {
        Role::EditorRoot(_) => line.push_str(" editor"),
        Role::Element { void, inline, .. } => {
            line.push_str(" element");
            if *void {
                line.push_str(" void");
            }
            if *inline {
                line.push_str(" inline");
            }
        }
        Role::Text { .. } => line.push_str(" text"),
        Role::Leaf => line.push_str(" leaf"),
        Role::String { length } => {
            line.push_str(" string");
            if let Some(length) = length {
                let _ = write!(line, " length={length}");
            }
        }
        Role::ZeroWidth { length, line_break } => {
            let _ = write!(line, " zero-width length={length}");
            if *line_break {
                line.push_str(" line-break");
            }
        }
        Role::Spacer => line.push_str(" spacer"),
        Role::Plain => {}
    }
    match element.editable {
        Some(true) => line.push_str(" contenteditable"),
        Some(false) => line.push_str(" contenteditable=false"),
        None => {}
    }
    if element.mark_placeholder {
        line.push_str(" mark-placeholder");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// body > div > [span "ab", span(zw) "\u{feff}", span "cd"]
    fn sample() -> (Surface, Vec<SurfaceNodeId>) {
        let mut surface = Surface::new();
        let div = surface.create_element("div", Role::Plain);
        surface.append(surface.body(), div);

        let mut texts = Vec::new();
        for (text, role) in [
            ("ab", Role::String { length: None }),
            ("\u{feff}", Role::ZeroWidth { length: 0, line_break: false }),
            ("cd", Role::String { length: None }),
        ] {
            let span = surface.create_element("span", role);
            let node = surface.create_text(text);
            surface.append(span, node);
            surface.append(div, span);
            texts.push(node);
        }
        texts.insert(0, div);
        (surface, texts)
    }

    #[test]
    fn test_compare_is_document_order() {
        let (surface, nodes) = sample();
        assert_eq!(surface.compare(nodes[1], nodes[3]), Ordering::Less);
        assert_eq!(surface.compare(nodes[0], nodes[1]), Ordering::Less);
        assert_eq!(surface.compare(nodes[2], nodes[2]), Ordering::Equal);
    }

    #[test]
    fn test_measure_until_skips_excluded_regions() {
        let (surface, nodes) = sample();
        let point = SurfacePoint::new(nodes[3], 1);

        let all = surface.measure_until(nodes[0], point, |_| false);
        let visible = surface.measure_until(nodes[0], point, ElementData::is_zero_width);

        assert_eq!(all, 4);
        assert_eq!(visible, 3);
    }

    #[test]
    fn test_measure_until_element_boundary() {
        let (surface, nodes) = sample();
        let point = SurfacePoint::new(nodes[0], 1);
        assert_eq!(surface.measure_until(nodes[0], point, |_| false), 2);

        let end = SurfacePoint::new(nodes[0], 3);
        assert_eq!(surface.measure_until(nodes[0], end, |_| false), 5);
    }

    #[test]
    fn test_set_text_on_element_replaces_children() {
        let (mut surface, nodes) = sample();
        let first_span = surface.parent(nodes[1]).unwrap();
        surface.set_text(nodes[0], "fresh");

        assert_eq!(surface.text_content(nodes[0]), "fresh");
        assert_eq!(surface.children(nodes[0]).len(), 1);
        assert_eq!(surface.parent(first_span), None);
    }

    #[test]
    fn test_element_siblings_skip_text_nodes() {
        let mut surface = Surface::new();
        let a = surface.create_element("div", Role::Plain);
        let text = surface.create_text("loose");
        let b = surface.create_element("div", Role::Plain);
        for node in [a, text, b] {
            surface.append(surface.body(), node);
        }

        assert_eq!(surface.next_element_sibling(a), Some(b));
        assert_eq!(surface.previous_element_sibling(b), Some(a));
        assert_eq!(surface.previous_element_sibling(a), None);
    }
}
