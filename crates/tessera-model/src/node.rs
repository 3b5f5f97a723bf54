use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Arbitrary typed properties on an element, or marks on a text leaf.
pub type Props = BTreeMap<String, Value>;

/// Object identity of a node.
///
/// Every node object gets a fresh id when it is built. Rebuilding a node (for
/// example because one of its descendants changed) produces a new object with a
/// new id, while untouched subtrees are shared through `Rc` and keep theirs.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct NodeId(u64);

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

impl NodeId {
    fn mint() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// A node of the document tree: an element with children or a text leaf.
///
/// `Clone` copies the handle, not the identity: a cloned node reports the same
/// [`NodeId`]. Equality compares content and ignores identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "NodeSpec", into = "NodeSpec")]
pub enum Node {
    Element(Element),
    Text(Text),
}

#[derive(Debug, Clone)]
pub struct Element {
    id: NodeId,
    kind: String,
    void: bool,
    inline: bool,
    properties: Props,
    children: Vec<Rc<Node>>,
}

#[derive(Debug, Clone)]
pub struct Text {
    id: NodeId,
    text: String,
    marks: Props,
}

impl Element {
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn is_void(&self) -> bool {
        self.void
    }

    pub fn is_inline(&self) -> bool {
        self.inline
    }

    /// Block elements are the non-inline ones
    pub fn is_block(&self) -> bool {
        !self.inline
    }

    pub fn properties(&self) -> &Props {
        &self.properties
    }

    pub fn children(&self) -> &[Rc<Node>] {
        &self.children
    }
}

impl Text {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn marks(&self) -> &Props {
        &self.marks
    }

    /// Length in chars, the unit every model offset is expressed in
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::text_with_marks(text, Props::new())
    }

    pub fn text_with_marks(text: impl Into<String>, marks: Props) -> Self {
        Node::Text(Text {
            id: NodeId::mint(),
            text: text.into(),
            marks,
        })
    }

    pub fn element(kind: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Element(Element {
            id: NodeId::mint(),
            kind: kind.into(),
            void: false,
            inline: false,
            properties: Props::new(),
            children: children.into_iter().map(Rc::new).collect(),
        })
    }

    /// A void element with the single empty leaf it needs to stay focusable.
    pub fn void_element(kind: impl Into<String>) -> Self {
        match Node::element(kind, vec![Node::text("")]) {
            Node::Element(element) => Node::Element(Element {
                void: true,
                ..element
            }),
            text => text,
        }
    }

    /// Returns a new inline copy of this element. Text leaves are returned as is.
    pub fn inline(self) -> Self {
        match self {
            Node::Element(element) => Node::Element(Element {
                id: NodeId::mint(),
                inline: true,
                ..element
            }),
            text => text,
        }
    }

    /// Returns a new node with one more property (a mark, for text leaves).
    pub fn with_property(&self, key: impl Into<String>, value: Value) -> Self {
        let mut props = self.props().clone();
        props.insert(key.into(), value);
        self.with_props(props)
    }

    pub fn id(&self) -> NodeId {
        match self {
            Node::Element(element) => element.id,
            Node::Text(text) => text.id,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Node::Text(text) => Some(text),
            Node::Element(_) => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    pub fn is_element(&self) -> bool {
        matches!(self, Node::Element(_))
    }

    pub fn is_void(&self) -> bool {
        self.as_element().is_some_and(Element::is_void)
    }

    pub fn is_block(&self) -> bool {
        self.as_element().is_some_and(Element::is_block)
    }

    /// Children of an element; text leaves have none
    pub fn children(&self) -> &[Rc<Node>] {
        match self {
            Node::Element(element) => &element.children,
            Node::Text(_) => &[],
        }
    }

    pub fn child(&self, index: usize) -> Option<&Rc<Node>> {
        self.children().get(index)
    }

    /// Element properties, or the marks of a text leaf
    pub fn props(&self) -> &Props {
        match self {
            Node::Element(element) => &element.properties,
            Node::Text(text) => &text.marks,
        }
    }

    /// Concatenated text of every leaf below this node
    pub fn string(&self) -> String {
        match self {
            Node::Text(text) => text.text.clone(),
            Node::Element(element) => element.children.iter().map(|c| c.string()).collect(),
        }
    }

    pub(crate) fn with_children(&self, children: Vec<Rc<Node>>) -> Node {
        match self {
            Node::Element(element) => Node::Element(Element {
                id: NodeId::mint(),
                kind: element.kind.clone(),
                void: element.void,
                inline: element.inline,
                properties: element.properties.clone(),
                children,
            }),
            Node::Text(_) => self.rebuilt(),
        }
    }

    pub(crate) fn with_text(&self, text: String) -> Node {
        match self {
            Node::Text(leaf) => Node::Text(Text {
                id: NodeId::mint(),
                text,
                marks: leaf.marks.clone(),
            }),
            Node::Element(_) => self.rebuilt(),
        }
    }

    pub(crate) fn with_props(&self, props: Props) -> Node {
        match self {
            Node::Element(element) => Node::Element(Element {
                id: NodeId::mint(),
                kind: element.kind.clone(),
                void: element.void,
                inline: element.inline,
                properties: props,
                children: element.children.clone(),
            }),
            Node::Text(leaf) => Node::Text(Text {
                id: NodeId::mint(),
                text: leaf.text.clone(),
                marks: props,
            }),
        }
    }

    /// A copy of the whole subtree where every node has a fresh id
    pub fn reidentified(&self) -> Node {
        match self {
            Node::Element(element) => Node::Element(Element {
                id: NodeId::mint(),
                kind: element.kind.clone(),
                void: element.void,
                inline: element.inline,
                properties: element.properties.clone(),
                children: element
                    .children
                    .iter()
                    .map(|child| Rc::new(child.reidentified()))
                    .collect(),
            }),
            Node::Text(_) => self.rebuilt(),
        }
    }

    fn rebuilt(&self) -> Node {
        self.with_props(self.props().clone())
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Node::Text(a), Node::Text(b)) => a.text == b.text && a.marks == b.marks,
            (Node::Element(a), Node::Element(b)) => {
                a.kind == b.kind
                    && a.void == b.void
                    && a.inline == b.inline
                    && a.properties == b.properties
                    && a.children == b.children
            }
            _ => false,
        }
    }
}

/// Byte index of the `offset`-th char, or the string length when `offset` is
/// exactly one past the last char.
pub(crate) fn byte_index(text: &str, offset: usize) -> Option<usize> {
    match text.char_indices().nth(offset) {
        Some((index, _)) => Some(index),
        None if offset == text.chars().count() => Some(text.len()),
        None => None,
    }
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Wire shape: `{"text": ..}` for leaves, `{"type": .., "children": [..]}` for
/// elements, with properties and marks flattened alongside.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum NodeSpec {
    Text {
        text: String,
        #[serde(flatten)]
        marks: Props,
    },
    Element {
        #[serde(rename = "type")]
        kind: String,
        children: Vec<NodeSpec>,
        #[serde(default, skip_serializing_if = "is_false")]
        void: bool,
        #[serde(default, skip_serializing_if = "is_false")]
        inline: bool,
        #[serde(flatten)]
        properties: Props,
    },
}

impl From<NodeSpec> for Node {
    fn from(spec: NodeSpec) -> Self {
        match spec {
            NodeSpec::Text { text, marks } => Node::text_with_marks(text, marks),
            NodeSpec::Element {
                kind,
                children,
                void,
                inline,
                properties,
            } => Node::Element(Element {
                id: NodeId::mint(),
                kind,
                void,
                inline,
                properties,
                children: children.into_iter().map(|c| Rc::new(c.into())).collect(),
            }),
        }
    }
}

impl From<Node> for NodeSpec {
    fn from(node: Node) -> Self {
        match node {
            Node::Text(leaf) => NodeSpec::Text {
                text: leaf.text,
                marks: leaf.marks,
            },
            Node::Element(element) => NodeSpec::Element {
                kind: element.kind,
                children: element
                    .children
                    .iter()
                    .map(|c| NodeSpec::from(Node::clone(c)))
                    .collect(),
                void: element.void,
                inline: element.inline,
                properties: element.properties,
            },
        }
    }
}
