use notebook_calc::CalcBackend;
use notebook_core::{ChunkType, Notebook, NotebookConfig, NotebookError};
use pretty_assertions::assert_eq;

fn types(notebook: &Notebook) -> Vec<ChunkType> {
    notebook.chunks().map(|chunk| chunk.chunk_type()).collect()
}

#[test]
fn test_undo_redo_insert() {
    let mut notebook = Notebook::new();
    notebook.insert(0, 0, "1").unwrap();
    assert!(notebook.can_undo());

    notebook.undo().unwrap();
    assert_eq!(notebook.text(), "");
    assert!(notebook.can_redo());

    notebook.redo().unwrap();
    assert_eq!(notebook.text(), "1");
    assert!(!notebook.can_redo());
}

#[test]
fn test_undo_with_empty_history_is_error() {
    let mut notebook = Notebook::new();
    assert!(matches!(notebook.undo(), Err(NotebookError::NothingToUndo)));
    assert!(matches!(notebook.redo(), Err(NotebookError::NothingToRedo)));
}

#[test]
fn test_undo_across_computed_result() {
    let mut notebook = Notebook::new();
    notebook.insert(0, 0, "1 ").unwrap();
    notebook.insert(0, 1, "\n").unwrap();
    notebook.calculate(&mut CalcBackend::new()).unwrap();
    assert_eq!(notebook.buffer_text(), "1\n1\n ");

    notebook.undo().unwrap();
    assert_eq!(notebook.text(), "1 ");
}

#[test]
fn test_new_edit_prunes_redo() {
    let mut notebook = Notebook::new();
    notebook.insert(0, 0, "1").unwrap();
    notebook.undo().unwrap();
    notebook.insert(0, 0, "2").unwrap();

    assert!(matches!(notebook.redo(), Err(NotebookError::NothingToRedo)));
    assert_eq!(notebook.text(), "2");
}

#[test]
fn test_typing_coalesces_into_one_unit() {
    let mut notebook = Notebook::new();
    notebook.insert(0, 0, "1").unwrap();
    notebook.insert(0, 1, "2").unwrap();
    assert_eq!(notebook.undo_depth(), 1);

    notebook.undo().unwrap();
    assert_eq!(notebook.text(), "");
}

#[test]
fn test_coalescing_respects_bound() {
    let mut notebook = Notebook::with_config(NotebookConfig::default().with_max_coalesce(2));
    for (offset, ch) in ["a", "b", "c"].into_iter().enumerate() {
        notebook.insert(0, offset, ch).unwrap();
    }
    assert_eq!(notebook.undo_depth(), 2);

    notebook.undo().unwrap();
    assert_eq!(notebook.text(), "ab");
}

#[test]
fn test_backspacing_coalesces() {
    let mut notebook = Notebook::new();
    notebook.insert(0, 0, "abc\n").unwrap();
    notebook.delete(0, 2, 0, 3).unwrap();
    notebook.delete(0, 1, 0, 2).unwrap();
    assert_eq!(notebook.text(), "a\n");

    notebook.undo().unwrap();
    assert_eq!(notebook.text(), "abc\n");
    notebook.undo().unwrap();
    assert_eq!(notebook.text(), "");
}

#[test]
fn test_user_action_undoes_as_one_unit() {
    let mut notebook = Notebook::new();
    notebook.insert(0, 0, "1").unwrap();

    notebook.begin_user_action();
    notebook.delete(0, 0, 0, 1).unwrap();
    notebook.insert(0, 0, "2").unwrap();
    notebook.end_user_action();
    assert_eq!(notebook.text(), "2");

    notebook.undo().unwrap();
    assert_eq!(notebook.text(), "1");
    notebook.redo().unwrap();
    assert_eq!(notebook.text(), "2");
}

#[test]
fn test_user_action_boundary_blocks_coalescing() {
    let mut notebook = Notebook::new();
    notebook.insert(0, 0, "1").unwrap();
    notebook.begin_user_action();
    notebook.insert(0, 1, "2").unwrap();
    notebook.end_user_action();
    notebook.insert(0, 2, "3").unwrap();

    notebook.undo().unwrap();
    assert_eq!(notebook.text(), "12");
    notebook.undo().unwrap();
    assert_eq!(notebook.text(), "1");
    notebook.undo().unwrap();
    assert_eq!(notebook.text(), "");
}

#[test]
fn test_undo_insert_above_computed_statement() {
    let mut notebook = Notebook::new();
    notebook.insert(0, 0, "2\n").unwrap();
    notebook.calculate(&mut CalcBackend::new()).unwrap();

    notebook.insert(0, 0, "1\n").unwrap();
    notebook.calculate(&mut CalcBackend::new()).unwrap();
    assert_eq!(notebook.buffer_text(), "1\n1\n2\n2\n");

    notebook.undo().unwrap();
    assert_eq!(
        types(&notebook),
        vec![ChunkType::Statement, ChunkType::Result, ChunkType::Blank]
    );
    assert_eq!(notebook.text(), "2\n");
    assert_eq!(notebook.buffer_text(), "2\n2\n");
}

#[test]
fn test_undo_tracks_modified_flag() {
    let mut notebook = Notebook::new();
    assert!(!notebook.is_code_modified());
    notebook.insert(0, 0, "x").unwrap();
    assert!(notebook.is_code_modified());
    notebook.undo().unwrap();
    assert!(!notebook.is_code_modified());
    notebook.redo().unwrap();
    assert!(notebook.is_code_modified());
}

#[test]
fn test_results_are_not_recorded() {
    let mut notebook = Notebook::new();
    notebook.insert(0, 0, "1 + 1").unwrap();
    let depth = notebook.undo_depth();
    notebook.calculate(&mut CalcBackend::new()).unwrap();
    assert_eq!(notebook.undo_depth(), depth);
    assert_eq!(notebook.buffer_text(), "1 + 1\n2");
}
