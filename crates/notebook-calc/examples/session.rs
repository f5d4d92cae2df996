use notebook_calc::{CalcBackend, Shown};
use notebook_core::{ChunkKind, Notebook, NotebookEvent, ResultValue};
use std::cell::RefCell;
use std::rc::Rc;

fn main() {
    let mut notebook = Notebook::new();
    let rich_lines = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&rich_lines);
    notebook.subscribe(move |event| {
        if let NotebookEvent::RichResultAdded { line } = event {
            sink.borrow_mut().push(*line);
        }
    });

    let mut backend = CalcBackend::new();
    notebook
        .insert(0, 0, "# prices\nunit = 7\ncount = 6\nunit * count\nshow(unit - count)\n")
        .unwrap();
    notebook.calculate(&mut backend).unwrap();
    assert_eq!(
        notebook.buffer_text(),
        "# prices\nunit = 7\ncount = 6\nunit * count\n42\nshow(unit - count)\n\n"
    );
    assert_eq!(*rich_lines.borrow(), vec![6]);

    // The rich placeholder line carries the backend payload.
    let owner = match notebook.chunk_at(6).map(|chunk| chunk.kind()) {
        Some(ChunkKind::Result(block)) => block.owner(),
        _ => unreachable!("line 6 holds the rich result"),
    };
    let statement = notebook.chunk(owner).and_then(|chunk| chunk.as_statement()).unwrap();
    if let Some([ResultValue::Rich(rich)]) = statement.results() {
        assert_eq!(rich.downcast_ref::<Shown>(), Some(&Shown { value: 1 }));
    }

    // Editing an upstream assignment only re-executes from that point down.
    notebook.insert(1, 8, "0").unwrap();
    let report = notebook.calculate(&mut backend).unwrap();
    assert_eq!(report.compiled, 1);
    assert_eq!(notebook.line_text(4).as_deref(), Some("420"));

    notebook.undo().unwrap();
    notebook.calculate(&mut backend).unwrap();
    assert_eq!(notebook.line_text(4).as_deref(), Some("42"));
    println!("{}", notebook.buffer_text());
}
