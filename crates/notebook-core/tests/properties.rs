//! Randomized edit sequences checked against the document invariants.

use notebook_calc::CalcBackend;
use notebook_core::{ChunkType, Notebook, NotebookError, Position};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const PIECES: &[&str] = &["x", "1", " ", "\n", "# c", "  y", "a = 1\n", "\n\n", "b"];

fn random_position(notebook: &Notebook, rng: &mut StdRng) -> Position {
    let line = rng.gen_range(0..notebook.line_count());
    let len = notebook
        .line_text(line)
        .map(|text| text.chars().count())
        .unwrap_or(0);
    Position::new(line, rng.gen_range(0..=len))
}

fn check_partition(notebook: &Notebook) {
    let mut next_line = 0;
    let mut source_lines = 0;
    for chunk in notebook.chunks() {
        assert_eq!(chunk.start(), next_line, "chunks must tile the buffer");
        assert!(chunk.end() >= chunk.start());
        assert_eq!(chunk.nr_start(), source_lines);
        if !chunk.is_result() {
            source_lines += chunk.line_count();
        }
        next_line = chunk.end() + 1;
    }
    assert_eq!(next_line, notebook.line_count());
}

fn check_statement_text(notebook: &Notebook) {
    for chunk in notebook.chunks() {
        let Some(statement) = chunk.as_statement() else {
            continue;
        };
        let lines: Vec<String> = chunk
            .lines()
            .map(|line| notebook.line_text(line).unwrap_or_default())
            .collect();
        assert_eq!(statement.text(), lines.join("\n"));
    }
}

/// Chunks over source-logical lines, results left out.
fn source_layout(notebook: &Notebook) -> Vec<(ChunkType, usize, usize)> {
    notebook
        .chunks()
        .filter(|chunk| !chunk.is_result())
        .map(|chunk| {
            let start = chunk.nr_start();
            (chunk.chunk_type(), start, start + chunk.line_count() - 1)
        })
        .collect()
}

fn check_matches_fresh_load(notebook: &Notebook) {
    let mut fresh = Notebook::new();
    fresh.insert(0, 0, &notebook.text()).unwrap();
    assert_eq!(source_layout(notebook), source_layout(&fresh));
}

fn check_document(notebook: &Notebook) {
    notebook.validate().unwrap();
    check_partition(notebook);
    check_statement_text(notebook);
    check_matches_fresh_load(notebook);
}

fn random_edit(notebook: &mut Notebook, rng: &mut StdRng) -> Result<(), NotebookError> {
    if rng.gen_bool(0.6) {
        let at = random_position(notebook, rng);
        let piece = PIECES[rng.gen_range(0..PIECES.len())];
        notebook.insert(at.line, at.offset, piece).map(|_| ())
    } else {
        let a = random_position(notebook, rng);
        let b = random_position(notebook, rng);
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        notebook
            .delete(start.line, start.offset, end.line, end.offset)
            .map(|_| ())
    }
}

fn run_sequence(seed: u64, steps: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut notebook = Notebook::new();
    let mut backend = CalcBackend::new();
    // Source text at every undo depth, redo states included.
    let mut history = vec![notebook.text()];

    for step in 0..steps {
        let depth = notebook.undo_depth();
        match rng.gen_range(0..20) {
            0..=2 => {
                notebook.calculate(&mut backend).unwrap();
            }
            3..=5 if notebook.can_undo() => {
                notebook.undo().unwrap();
                assert_eq!(notebook.text(), history[depth - 1], "seed {seed} step {step}: undo");
            }
            6 if notebook.can_redo() => {
                notebook.redo().unwrap();
                assert_eq!(notebook.text(), history[depth + 1], "seed {seed} step {step}: redo");
            }
            _ => {
                let before = notebook.text();
                notebook.begin_user_action();
                let outcome = random_edit(&mut notebook, &mut rng);
                notebook.end_user_action();
                match outcome {
                    Ok(()) | Err(NotebookError::ReadOnlyResult { .. }) => {}
                    Err(err) => panic!("seed {seed} step {step}: unexpected error {err}"),
                }
                if notebook.undo_depth() > depth {
                    history.truncate(depth + 1);
                    history.push(notebook.text());
                } else {
                    assert_eq!(notebook.text(), before, "seed {seed} step {step}: unrecorded edit");
                }
            }
        }
        check_document(&notebook);
        assert_eq!(
            history.len(),
            notebook.undo_depth() + notebook.redo_depth() + 1,
            "seed {seed} step {step}: history length"
        );
    }

    // Walk the whole history back and forth, recalculating on the way.
    while notebook.can_undo() {
        let depth = notebook.undo_depth();
        notebook.undo().unwrap();
        assert_eq!(notebook.text(), history[depth - 1], "seed {seed}: undo chain");
        if depth % 3 == 0 {
            notebook.calculate(&mut backend).unwrap();
        }
        check_document(&notebook);
    }
    while notebook.can_redo() {
        let depth = notebook.undo_depth();
        notebook.redo().unwrap();
        assert_eq!(notebook.text(), history[depth + 1], "seed {seed}: redo chain");
        if depth % 4 == 0 {
            notebook.calculate(&mut backend).unwrap();
        }
        check_document(&notebook);
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("random.nb");
    notebook.save(Some(&path)).unwrap();
    let mut reloaded = Notebook::new();
    reloaded.load(&path).unwrap();
    assert_eq!(reloaded.text(), notebook.text());
    assert_eq!(source_layout(&reloaded), source_layout(&notebook));
    check_partition(&reloaded);
}

#[test]
fn test_random_edits_keep_invariants() {
    for seed in 0..64 {
        run_sequence(seed, 80);
    }
}

#[test]
fn test_undo_everything_restores_empty_document() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut notebook = Notebook::new();
    for _ in 0..40 {
        notebook.begin_user_action();
        let _ = random_edit(&mut notebook, &mut rng);
        notebook.end_user_action();
    }
    notebook.calculate(&mut CalcBackend::new()).unwrap();

    while notebook.can_undo() {
        notebook.undo().unwrap();
    }
    assert_eq!(notebook.text(), "");
    check_document(&notebook);
}
