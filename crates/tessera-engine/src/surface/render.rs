//! Reference renderer.
//!
//! Builds the conventional surface layout for an editor's document:
//!
//! ```text
//! div editor
//!   div element            one per model element
//!     span text            one per model text leaf
//!       span leaf          one per styled run
//!         span string      "text"
//!         span zero-width  "\u{feff}" for empty runs
//! ```
//!
//! Void elements wrap their hidden leaf in a spacer and add a non-editable
//! content region. Rendering records keys and positions in the editor's
//! identity registry, the way a host renderer discovers nodes.

use std::rc::Rc;

use tessera_model::{Node, Path, Point, Text};

use super::{PLACEHOLDER_MARKER, Role, Surface, SurfaceNodeId};
use crate::editor::Editor;
use crate::identity::IdentityRegistry;

/// Renders `editor` into the surface body, replacing any previous rendering of
/// the same editor. Returns the editor root.
pub fn render_document(editor: &mut Editor, surface: &mut Surface) -> SurfaceNodeId {
    let body = surface.body();
    render_document_into(editor, surface, body)
}

/// Renders `editor` as the last child of `container`, which may sit inside
/// another editor's rendering.
pub fn render_document_into(
    editor: &mut Editor,
    surface: &mut Surface,
    container: SurfaceNodeId,
) -> SurfaceNodeId {
    if let Some(previous) = surface.editor_root(editor.id()) {
        surface.detach(previous);
    }

    let root = surface.create_element("div", Role::EditorRoot(editor.id()));
    surface.set_editable(root, Some(true));
    surface.append(container, root);

    let placeholder = mark_placeholder_at(editor);
    let document_root = editor.document.root().clone();
    let mut renderer = Renderer {
        surface,
        registry: &mut editor.registry,
        placeholder,
    };
    renderer.registry.set_root(&document_root);
    renderer.registry.assign_or_get_key(&document_root);
    renderer.children(&document_root, root, &Path::root());
    root
}

/// Where an empty run styled with the pending marks goes: at a collapsed
/// selection whose leaf does not already carry exactly those marks.
fn mark_placeholder_at(editor: &Editor) -> Option<Point> {
    let marks = editor.marks()?;
    let selection = editor.document.selection()?;
    if !selection.is_collapsed() {
        return None;
    }
    let leaf = editor.document.leaf(&selection.anchor.path).ok()?;
    (leaf.marks() != marks).then(|| selection.anchor.clone())
}

struct Renderer<'a> {
    surface: &'a mut Surface,
    registry: &'a mut IdentityRegistry,
    placeholder: Option<Point>,
}

impl Renderer<'_> {
    fn children(&mut self, parent: &Rc<Node>, container: SurfaceNodeId, path: &Path) {
        for (index, child) in parent.children().iter().enumerate() {
            self.registry.record_position(child, parent, index);
            let rendered = self.node(child, parent, &path.child(index));
            self.surface.append(container, rendered);
        }
    }

    fn node(&mut self, node: &Rc<Node>, parent: &Rc<Node>, path: &Path) -> SurfaceNodeId {
        let key = self.registry.assign_or_get_key(node);
        match node.as_ref() {
            Node::Element(element) => {
                let tag = if element.is_inline() { "span" } else { "div" };
                let role = Role::Element {
                    key,
                    void: element.is_void(),
                    inline: element.is_inline(),
                };
                let rendered = self.surface.create_element(tag, role);
                if !element.is_void() {
                    self.children(node, rendered, path);
                    return rendered;
                }

                if element.is_inline() {
                    self.surface.set_editable(rendered, Some(false));
                }
                let spacer = self.surface.create_element(tag, Role::Spacer);
                self.children(node, spacer, path);
                self.surface.append(rendered, spacer);

                let content = self.surface.create_element(tag, Role::Plain);
                self.surface.set_editable(content, Some(false));
                self.surface.set_text(content, element.kind());
                self.surface.append(rendered, content);
                rendered
            }
            Node::Text(text) => {
                let rendered = self.surface.create_element("span", Role::Text { key });
                let is_last = parent.children().last().map(|last| last.id()) == Some(node.id());
                let runs = self.runs(text, path);
                let count = runs.len();

                for (index, (run, mark_placeholder)) in runs.into_iter().enumerate() {
                    let leaf = self.surface.create_element("span", Role::Leaf);
                    let content =
                        self.run(&run, mark_placeholder, parent, is_last && index + 1 == count);
                    self.surface.append(leaf, content);
                    self.surface.append(rendered, leaf);
                }
                rendered
            }
        }
    }

    /// The styled runs of a leaf: the whole text, or the text split around a
    /// mark placeholder.
    fn runs(&self, text: &Text, path: &Path) -> Vec<(String, bool)> {
        let Some(at) = self.placeholder.as_ref().filter(|at| at.path == *path) else {
            return vec![(text.text().to_string(), false)];
        };
        let before: String = text.text().chars().take(at.offset).collect();
        let after: String = text.text().chars().skip(at.offset).collect();

        let mut runs = Vec::new();
        if !before.is_empty() {
            runs.push((before, false));
        }
        runs.push((String::new(), true));
        if !after.is_empty() {
            runs.push((after, false));
        }
        runs
    }

    fn run(
        &mut self,
        text: &str,
        mark_placeholder: bool,
        parent: &Node,
        is_last: bool,
    ) -> SurfaceNodeId {
        if text.is_empty() {
            let line_break = is_last && parent.is_block() && parent.string().is_empty();
            let zero_width = self.surface.create_element(
                "span",
                Role::ZeroWidth {
                    length: 0,
                    line_break,
                },
            );
            self.surface.set_mark_placeholder(zero_width, mark_placeholder);
            let marker = self.surface.create_text(PLACEHOLDER_MARKER.to_string());
            self.surface.append(zero_width, marker);
            if line_break {
                let br = self.surface.create_element("br", Role::Plain);
                self.surface.append(zero_width, br);
            }
            return zero_width;
        }

        let string = self
            .surface
            .create_element("span", Role::String { length: None });
        // A trailing newline is only painted when followed by something
        let painted = if is_last && text.ends_with('\n') {
            format!("{text}\n")
        } else {
            text.to_string()
        };
        let node = self.surface.create_text(painted);
        self.surface.append(string, node);
        string
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::Editor;
    use insta::assert_snapshot;
    use serde_json::json;
    use tessera_model::{Document, Operation, Props, Range};

    #[test]
    fn test_render_blocks_voids_and_empty_leaves() {
        let mut editor = Editor::new(Document::new(vec![
            Node::element("paragraph", vec![Node::text("one")]),
            Node::element("paragraph", vec![Node::text("")]),
            Node::void_element("image"),
        ]));
        let mut surface = Surface::new();
        let root = render_document(&mut editor, &mut surface);

        assert_snapshot!(surface.outline(root), @r#"
        div editor contenteditable
          div element
            span text
              span leaf
                span string
                  "one"
          div element
            span text
              span leaf
                span zero-width length=0 line-break
                  "\u{feff}"
                  br
          div element void
            div spacer
              span text
                span leaf
                  span zero-width length=0 line-break
                    "\u{feff}"
                    br
            div contenteditable=false
              "image"
        "#);
    }

    #[test]
    fn test_render_inline_void_is_not_editable() {
        let mention = Node::void_element("mention").inline();
        let mut editor = Editor::new(Document::new(vec![Node::element(
            "paragraph",
            vec![Node::text("hi "), mention, Node::text("")],
        )]));
        let mut surface = Surface::new();
        let root = render_document(&mut editor, &mut surface);

        assert_snapshot!(surface.outline(root), @r#"
        div editor contenteditable
          div element
            span text
              span leaf
                span string
                  "hi "
            span element void inline contenteditable=false
              span spacer
                span text
                  span leaf
                    span zero-width length=0
                      "\u{feff}"
              span contenteditable=false
                "mention"
            span text
              span leaf
                span zero-width length=0
                  "\u{feff}"
        "#);
    }

    #[test]
    fn test_render_splits_leaf_around_mark_placeholder() {
        let mut editor = Editor::new(Document::new(vec![Node::element(
            "paragraph",
            vec![Node::text("hello")],
        )]));
        editor
            .apply(Operation::SetSelection {
                properties: None,
                new_properties: Some(Range::collapsed(Point::new([0, 0], 2))),
            })
            .unwrap();
        editor.set_marks(Some(Props::from([("bold".to_string(), json!(true))])));

        let mut surface = Surface::new();
        let root = render_document(&mut editor, &mut surface);

        assert_snapshot!(surface.outline(root), @r#"
        div editor contenteditable
          div element
            span text
              span leaf
                span string
                  "he"
              span leaf
                span zero-width length=0 mark-placeholder
                  "\u{feff}"
              span leaf
                span string
                  "llo"
        "#);
    }

    #[test]
    fn test_render_records_positions_and_keys() {
        let mut editor = Editor::new(Document::new(vec![Node::element(
            "paragraph",
            vec![Node::text("a"), Node::text("b")],
        )]));
        let mut surface = Surface::new();
        render_document(&mut editor, &mut surface);

        let leaf = editor.document().node(&Path::from([0, 1])).unwrap().clone();
        let key = editor.registry().key(&leaf).unwrap();

        assert_eq!(editor.registry().resolve_path(&leaf).unwrap(), Path::from([0, 1]));
        assert!(surface.node_for_key(key).is_some());
    }

    #[test]
    fn test_rerender_replaces_previous_root() {
        let mut editor = Editor::new(Document::new(vec![Node::element(
            "paragraph",
            vec![Node::text("a")],
        )]));
        let mut surface = Surface::new();
        let first = render_document(&mut editor, &mut surface);
        let second = render_document(&mut editor, &mut surface);

        assert_ne!(first, second);
        assert_eq!(surface.children(surface.body()), &[second]);
        assert_eq!(surface.editor_root(editor.id()), Some(second));
    }
}
