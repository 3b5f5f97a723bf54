use anyhow::{Context, Result};
use log::info;
use std::{env, fs, path::PathBuf, process, rc::Rc, time::Duration};
use tessera_config::Config;
use tessera_engine::{
    Editor, EditorOptions, FocusPolicy, ManualScheduler, QuirkOptions, Surface, render_document,
};
use tessera_model::{Document, Node, Operation, Path};

fn editor_options(config: &Config) -> EditorOptions {
    EditorOptions {
        quirks: QuirkOptions {
            multi_range_selection: config.quirks.multi_range_selection,
            trailing_line_break: config.quirks.trailing_line_break,
            composition_in_placeholder: config.quirks.composition_in_placeholder,
        },
        focus: FocusPolicy {
            retries: config.focus.retries,
            delay: Duration::from_millis(config.focus.delay_ms),
        },
        sweep_age: config.registry.sweep_age,
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Prints every model node with its path and the key its surface node carries
fn print_keys(editor: &Editor) {
    fn walk(editor: &Editor, node: &Rc<Node>, path: Path, depth: usize) {
        let key = editor
            .registry()
            .key(node)
            .map(|key| key.to_string())
            .unwrap_or_else(|| "-".to_string());
        let label = match node.as_element() {
            Some(element) => element.kind().to_string(),
            None => format!("{:?}", node.string()),
        };
        println!("{}{path} key={key} {label}", "  ".repeat(depth));
        for (index, child) in node.children().iter().enumerate() {
            walk(editor, child, path.child(index), depth + 1);
        }
    }

    for (index, child) in editor.document().children().iter().enumerate() {
        walk(editor, child, Path::root().child(index), 0);
    }
}

fn print_surface(editor: &mut Editor, surface: &mut Surface) -> Result<()> {
    let root = render_document(editor, surface);
    print_keys(editor);
    println!();
    print!("{}", surface.outline(root));

    // Focusing mirrors the model selection onto the surface
    let mut scheduler = ManualScheduler::new();
    editor.focus(surface, &mut scheduler)?;
    if let Some(selection) = editor.document().selection().cloned() {
        let range = editor.to_surface_range(surface, &selection)?;
        println!("selection {selection} -> {range:?}");
    }
    editor.blur();
    Ok(())
}

fn run(document_path: PathBuf, operations_path: Option<PathBuf>) -> Result<()> {
    let config_path = Config::config_path();
    let config = Config::load_or_default(&config_path)?;
    info!("using config from {}", config_path.display());

    let nodes: Vec<Node> = read_json(&document_path)?;
    let mut editor = Editor::with_options(Document::new(nodes), editor_options(&config));
    let mut surface = Surface::new();

    print_surface(&mut editor, &mut surface)?;

    if let Some(operations_path) = operations_path {
        let operations: Vec<Operation> = read_json(&operations_path)?;
        let count = operations.len();
        for op in operations {
            editor
                .apply(op.clone())
                .with_context(|| format!("applying {op:?}"))?;
        }
        editor.flush_changes();
        println!("\napplied {count} operation(s)\n");
        print_surface(&mut editor, &mut surface)?;
    }

    Ok(())
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let (document_path, operations_path) = match args.len() {
        2 => (PathBuf::from(&args[1]), None),
        3 => (PathBuf::from(&args[1]), Some(PathBuf::from(&args[2]))),
        _ => {
            eprintln!("Usage: {} <document.json> [operations.json]", args[0]);
            process::exit(1);
        }
    };

    if let Err(e) = run(document_path, operations_path) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
