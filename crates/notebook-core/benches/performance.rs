use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use notebook_calc::CalcBackend;
use notebook_core::Notebook;

fn large_notebook(statement_count: usize) -> String {
    let mut out = String::with_capacity(statement_count * 32);
    for i in 0..statement_count {
        match i % 4 {
            0 => out.push_str(&format!("# section {i}\n")),
            1 => out.push_str(&format!("v{i} = {i} * 3 + 1\n")),
            2 => out.push_str(&format!("v{} + {i}\n", i - 1)),
            _ => out.push('\n'),
        }
    }
    out
}

fn bench_large_notebook_load(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("large.nb");
    std::fs::write(&path, large_notebook(20_000)).unwrap();

    c.bench_function("load/20k_lines", |b| {
        b.iter(|| {
            let mut notebook = Notebook::new();
            notebook.load(black_box(&path)).unwrap();
            black_box(notebook.line_count());
        })
    });
}

fn bench_typing_in_middle(c: &mut Criterion) {
    let text = large_notebook(20_000);
    c.bench_function("typing_middle/100_inserts", |b| {
        b.iter_batched(
            || {
                let mut notebook = Notebook::new();
                notebook.insert(0, 0, &text).unwrap();
                notebook
            },
            |mut notebook| {
                // Line 10_001 is an assignment; append to its right-hand side.
                let line = 10_001;
                let mut offset = notebook.line_text(line).map_or(0, |t| t.chars().count());
                for _ in 0..100 {
                    notebook.insert(line, offset, "1").unwrap();
                    offset += 1;
                }
                black_box(notebook.version());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_calculate(c: &mut Criterion) {
    let text = large_notebook(2_000);
    c.bench_function("calculate/2k_lines_full", |b| {
        b.iter_batched(
            || {
                let mut notebook = Notebook::new();
                notebook.insert(0, 0, &text).unwrap();
                notebook
            },
            |mut notebook| {
                let report = notebook.calculate(&mut CalcBackend::new()).unwrap();
                black_box(report);
            },
            BatchSize::LargeInput,
        )
    });

    // After one edit near the end only the tail is re-executed.
    let mut notebook = Notebook::new();
    notebook.insert(0, 0, &text).unwrap();
    notebook.calculate(&mut CalcBackend::new()).unwrap();
    c.bench_function("calculate/2k_lines_tail_edit", |b| {
        b.iter(|| {
            let line = notebook
                .chunks()
                .filter(|chunk| chunk.as_statement().is_some())
                .last()
                .map_or(0, |chunk| chunk.start());
            notebook.insert(line, 0, "1\n").unwrap();
            notebook.calculate(&mut CalcBackend::new()).unwrap();
            notebook.undo().unwrap();
            black_box(notebook.version());
        })
    });
}

criterion_group!(
    benches,
    bench_large_notebook_load,
    bench_typing_in_middle,
    bench_calculate
);
criterion_main!(benches);
