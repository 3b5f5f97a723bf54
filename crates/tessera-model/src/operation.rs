use serde::{Deserialize, Serialize};

use crate::{Affinity, Node, Path, Props, Range};

/// Low-level mutations of a [`crate::Document`].
///
/// Every edit is expressed as a sequence of these. They carry enough
/// information to be inverted and to transform positions held elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    InsertText {
        path: Path,
        offset: usize,
        text: String,
    },
    RemoveText {
        path: Path,
        offset: usize,
        text: String,
    },
    InsertNode {
        path: Path,
        node: Node,
    },
    RemoveNode {
        path: Path,
        node: Node,
    },
    /// Keys present in `properties` but missing from `new_properties` are
    /// removed, and so are keys whose new value is `null`.
    SetNode {
        path: Path,
        #[serde(default)]
        properties: Props,
        #[serde(default)]
        new_properties: Props,
    },
    /// Splits the node at `path` at `position` (a char offset for leaves, a
    /// child index for elements). The right half is inserted as the next
    /// sibling and gets `properties` on top of the original ones.
    SplitNode {
        path: Path,
        position: usize,
        #[serde(default)]
        properties: Props,
    },
    /// Merges the node at `path` into its previous sibling. `position` is the
    /// previous sibling's length before the merge.
    MergeNode {
        path: Path,
        position: usize,
        #[serde(default)]
        properties: Props,
    },
    MoveNode {
        path: Path,
        new_path: Path,
    },
    SetSelection {
        #[serde(default)]
        properties: Option<Range>,
        #[serde(default)]
        new_properties: Option<Range>,
    },
}

impl Operation {
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::InsertText { .. } => "insert_text",
            Operation::RemoveText { .. } => "remove_text",
            Operation::InsertNode { .. } => "insert_node",
            Operation::RemoveNode { .. } => "remove_node",
            Operation::SetNode { .. } => "set_node",
            Operation::SplitNode { .. } => "split_node",
            Operation::MergeNode { .. } => "merge_node",
            Operation::MoveNode { .. } => "move_node",
            Operation::SetSelection { .. } => "set_selection",
        }
    }

    /// The path the operation targets, `None` for selection changes
    pub fn path(&self) -> Option<&Path> {
        match self {
            Operation::InsertText { path, .. }
            | Operation::RemoveText { path, .. }
            | Operation::InsertNode { path, .. }
            | Operation::RemoveNode { path, .. }
            | Operation::SetNode { path, .. }
            | Operation::SplitNode { path, .. }
            | Operation::MergeNode { path, .. }
            | Operation::MoveNode { path, .. } => Some(path),
            Operation::SetSelection { .. } => None,
        }
    }

    pub fn is_text_operation(&self) -> bool {
        matches!(
            self,
            Operation::InsertText { .. } | Operation::RemoveText { .. }
        )
    }

    pub fn is_selection_operation(&self) -> bool {
        matches!(self, Operation::SetSelection { .. })
    }

    /// The operation that undoes this one
    pub fn inverse(&self) -> Operation {
        match self {
            Operation::InsertText { path, offset, text } => Operation::RemoveText {
                path: path.clone(),
                offset: *offset,
                text: text.clone(),
            },
            Operation::RemoveText { path, offset, text } => Operation::InsertText {
                path: path.clone(),
                offset: *offset,
                text: text.clone(),
            },
            Operation::InsertNode { path, node } => Operation::RemoveNode {
                path: path.clone(),
                node: node.clone(),
            },
            Operation::RemoveNode { path, node } => Operation::InsertNode {
                path: path.clone(),
                node: node.clone(),
            },
            Operation::SetNode {
                path,
                properties,
                new_properties,
            } => Operation::SetNode {
                path: path.clone(),
                properties: new_properties.clone(),
                new_properties: properties.clone(),
            },
            Operation::SplitNode {
                path,
                position,
                properties,
            } => Operation::MergeNode {
                path: path.next().unwrap_or_else(|| path.clone()),
                position: *position,
                properties: properties.clone(),
            },
            Operation::MergeNode {
                path,
                position,
                properties,
            } => Operation::SplitNode {
                path: path.previous().unwrap_or_else(|| path.clone()),
                position: *position,
                properties: properties.clone(),
            },
            Operation::MoveNode { path, new_path } => {
                if path == new_path || path.is_sibling(new_path) {
                    return Operation::MoveNode {
                        path: new_path.clone(),
                        new_path: path.clone(),
                    };
                }
                // The node now lives where `path` was transformed to, and has
                // to go back in front of whatever took its old next sibling slot.
                let forward = Some(Affinity::Forward);
                let inverse_path = path
                    .transform(self, forward)
                    .unwrap_or_else(|| new_path.clone());
                let inverse_new_path = path
                    .next()
                    .and_then(|next| next.transform(self, forward))
                    .unwrap_or_else(|| path.clone());
                Operation::MoveNode {
                    path: inverse_path,
                    new_path: inverse_new_path,
                }
            }
            Operation::SetSelection {
                properties,
                new_properties,
            } => Operation::SetSelection {
                properties: new_properties.clone(),
                new_properties: properties.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_operations_use_snake_case_tags() {
        let op: Operation = serde_json::from_value(json!({
            "type": "insert_text",
            "path": [0, 0],
            "offset": 2,
            "text": "hi"
        }))
        .unwrap();

        assert_eq!(
            op,
            Operation::InsertText {
                path: Path::from([0, 0]),
                offset: 2,
                text: "hi".to_string(),
            }
        );
        assert_eq!(op.kind(), "insert_text");
    }

    #[test]
    fn test_move_node_deserializes_new_path() {
        let op: Operation = serde_json::from_value(json!({
            "type": "move_node",
            "path": [0],
            "new_path": [2]
        }))
        .unwrap();
        assert_eq!(op.path(), Some(&Path::from([0])));
    }

    #[test]
    fn test_split_and_merge_are_inverses() {
        let split = Operation::SplitNode {
            path: Path::from([0, 1]),
            position: 3,
            properties: Props::new(),
        };
        let merge = split.inverse();

        assert_eq!(
            merge,
            Operation::MergeNode {
                path: Path::from([0, 2]),
                position: 3,
                properties: Props::new(),
            }
        );
        assert_eq!(merge.inverse(), split);
    }

    #[test]
    fn test_move_between_parents_inverts_to_original_slot() {
        let op = Operation::MoveNode {
            path: Path::from([0, 1]),
            new_path: Path::from([1, 0]),
        };
        assert_eq!(
            op.inverse(),
            Operation::MoveNode {
                path: Path::from([1, 0]),
                new_path: Path::from([0, 1]),
            }
        );
    }

    #[test]
    fn test_selection_inverse_swaps_ranges() {
        let range = Range::collapsed(Point::new([0, 0], 1));
        let op = Operation::SetSelection {
            properties: None,
            new_properties: Some(range.clone()),
        };
        assert_eq!(
            op.inverse(),
            Operation::SetSelection {
                properties: Some(range),
                new_properties: None,
            }
        );
    }
}
