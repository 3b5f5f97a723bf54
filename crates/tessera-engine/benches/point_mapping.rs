use criterion::{Criterion, criterion_group, criterion_main};
use tessera_engine::{Editor, PointOptions, Surface, render_document};
mod common;

fn bench_point_mapping(c: &mut Criterion) {
    let mut group = c.benchmark_group("point_mapping");
    group.sample_size(10);

    let mut editor = Editor::new(common::generate_paragraphs(500));
    let mut surface = Surface::new();
    render_document(&mut editor, &mut surface);
    let points: Vec<_> = editor
        .document()
        .texts()
        .into_iter()
        .map(|(path, _)| tessera_model::Point::new(path, 10))
        .collect();

    group.bench_function("to_surface_point", |b| {
        b.iter(|| {
            for point in &points {
                std::hint::black_box(editor.to_surface_point(&surface, point).ok());
            }
        });
    });

    let surface_points: Vec<_> = points
        .iter()
        .filter_map(|point| editor.to_surface_point(&surface, point).ok())
        .collect();

    group.bench_function("to_model_point", |b| {
        b.iter(|| {
            for point in &surface_points {
                std::hint::black_box(
                    editor
                        .to_model_point(&surface, *point, PointOptions::default())
                        .ok(),
                );
            }
        });
    });

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    group.sample_size(10);

    let mut editor = Editor::new(common::generate_nested_lists(4, 4));
    let mut surface = Surface::new();

    group.bench_function("render_nested_lists", |b| {
        b.iter(|| {
            std::hint::black_box(render_document(&mut editor, &mut surface));
        });
    });

    group.finish();
}

criterion_group!(benches, bench_point_mapping, bench_render);
criterion_main!(benches);
