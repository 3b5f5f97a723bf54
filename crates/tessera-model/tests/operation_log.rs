use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tessera_model::{Document, Node, Operation};

fn to_json(document: &Document) -> Value {
    let children: Vec<&Node> = document.children().iter().map(|c| c.as_ref()).collect();
    serde_json::to_value(children).unwrap()
}

fn original() -> Value {
    json!([
        { "type": "paragraph", "children": [{ "text": "hello" }] },
        { "type": "image", "void": true, "children": [{ "text": "" }] },
        { "type": "paragraph", "children": [{ "text": "world", "bold": true }] },
    ])
}

fn operations() -> Vec<Operation> {
    serde_json::from_value(json!([
        { "type": "insert_text", "path": [0, 0], "offset": 5, "text": "!" },
        { "type": "split_node", "path": [0, 0], "position": 2 },
        { "type": "split_node", "path": [0], "position": 1 },
        { "type": "move_node", "path": [3], "new_path": [0] },
        { "type": "set_node", "path": [2], "new_properties": { "align": "center" } },
        { "type": "merge_node", "path": [2], "position": 1 },
    ]))
    .unwrap()
}

#[test]
fn test_operation_log_from_json_applies_in_order() {
    let nodes: Vec<Node> = serde_json::from_value(original()).unwrap();
    let mut document = Document::new(nodes);

    for op in operations() {
        document.apply(&op).unwrap();
    }

    assert_eq!(
        to_json(&document),
        json!([
            { "type": "paragraph", "children": [{ "text": "world", "bold": true }] },
            { "type": "paragraph", "children": [{ "text": "he" }, { "text": "llo!" }] },
            { "type": "image", "void": true, "children": [{ "text": "" }] },
        ])
    );
}

#[test]
fn test_inverse_log_restores_the_document() {
    let nodes: Vec<Node> = serde_json::from_value(original()).unwrap();
    let mut document = Document::new(nodes);
    let operations = operations();

    for op in &operations {
        document.apply(op).unwrap();
    }
    for op in operations.iter().rev() {
        document.apply(&op.inverse()).unwrap();
    }

    assert_eq!(to_json(&document), original());
}
