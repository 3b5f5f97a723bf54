// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
use tessera_model::{Document, Node};

#[allow(dead_code)]
pub fn generate_paragraphs(count: usize) -> Document {
    Document::new(
        (0..count)
            .map(|i| {
                Node::element(
                    "paragraph",
                    vec![Node::text(format!(
                        "Paragraph {i} with some content for benchmarking."
                    ))],
                )
            })
            .collect(),
    )
}

/// Lists nested `depth` levels deep, `width` items per level, each item a
/// paragraph followed by the nested list
#[allow(dead_code)]
pub fn generate_nested_lists(width: usize, depth: usize) -> Document {
    Document::new(vec![nested_list(width, depth)])
}

#[allow(dead_code)]
fn nested_list(width: usize, remaining_depth: usize) -> Node {
    let items = (0..width)
        .map(|i| {
            let mut children = vec![Node::element(
                "paragraph",
                vec![Node::text(format!("Item {i} at depth {remaining_depth}"))],
            )];
            if remaining_depth > 1 {
                children.push(nested_list(width, remaining_depth - 1));
            }
            Node::element("list-item", children)
        })
        .collect();
    Node::element("list", items)
}
