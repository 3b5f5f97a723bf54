use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use tessera_engine::{Editor, StringDiff};
use tessera_model::{Operation, Path};
mod common;

fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");
    group.sample_size(10);

    group.bench_function("insert_text_deep", |b| {
        b.iter_batched(
            || {
                let editor = Editor::new(common::generate_nested_lists(4, 4));
                let path = editor
                    .document()
                    .texts()
                    .last()
                    .map(|(path, _)| path.clone())
                    .unwrap_or_default();
                (editor, path)
            },
            |(mut editor, path)| {
                for _ in 0..50 {
                    editor
                        .apply(Operation::InsertText {
                            path: path.clone(),
                            offset: 0,
                            text: "x".into(),
                        })
                        .ok();
                }
                std::hint::black_box(editor.flush_changes());
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("move_blocks_with_pending_diffs", |b| {
        b.iter_batched(
            || {
                let mut editor = Editor::new(common::generate_paragraphs(200));
                for i in 0..20 {
                    editor.push_pending_diff(Path::from([i * 10, 0]), StringDiff::new(0, 1, "P"));
                }
                editor
            },
            |mut editor| {
                for i in 0..50 {
                    editor
                        .apply(Operation::MoveNode {
                            path: Path::from([i]),
                            new_path: Path::from([199 - i]),
                        })
                        .ok();
                }
                std::hint::black_box(editor.pending().diffs().len());
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_apply);
criterion_main!(benches);
