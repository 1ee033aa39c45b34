use std::fs;
use std::path::{Path, PathBuf};
use uno_core::{
    AppError, Artifact, Document, DocumentPage, Mode, PromptFormat, RunControl, RunOptions, Services,
    run_pipeline,
};

fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, body).unwrap();
    path
}

fn run(files: &[PathBuf], options: &RunOptions) -> Result<Artifact, AppError> {
    run_pipeline(files, options, &Services::default(), &RunControl::new(), &mut |_, _| {})
        .map(|outcome| outcome.artifact)
}

fn prompt(files: &[PathBuf], options: &RunOptions) -> String {
    match run(files, options).unwrap() {
        Artifact::Prompt(text) => text,
        Artifact::Document(_) => panic!("expected a prompt"),
    }
}

fn document(files: &[PathBuf], options: &RunOptions) -> Document {
    let options = RunOptions {
        mode: Mode::Paginated,
        ..options.clone()
    };
    match run(files, &options).unwrap() {
        Artifact::Document(doc) => doc,
        Artifact::Prompt(_) => panic!("expected a document"),
    }
}

#[test]
fn standard_prompt_matches_literal_layout() {
    let dir = tempfile::tempdir().unwrap();
    let lines: String = (1..=50).map(|i| format!("print({})\n", i)).collect();
    let body = lines.trim_end_matches('\n').to_string();
    let a = write(dir.path(), "a.py", &body);
    let b = write(dir.path(), "b.txt", "");
    let text = prompt(&[a, b], &RunOptions::default());
    assert_eq!(text, format!("<a.py>\n{}\n</a.py>\n\n<b.txt>\n\n</b.txt>\n\n", body));
}

#[test]
fn one_oversized_file_fails_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let files = vec![
        write(dir.path(), "one.txt", "1"),
        write(dir.path(), "huge.log", &"z".repeat(4096)),
        write(dir.path(), "three.txt", "3"),
    ];
    let options = RunOptions {
        max_file_size: 1024,
        ..RunOptions::default()
    };
    let control = RunControl::new();
    let mut progressed = false;
    let err = run_pipeline(&files, &options, &Services::default(), &control, &mut |_, _| {
        progressed = true
    })
    .unwrap_err();
    match err {
        AppError::FileTooLarge { path, .. } => assert!(path.ends_with("huge.log")),
        other => panic!("expected FileTooLarge, got {:?}", other),
    }
    assert!(!progressed);
    assert_eq!(control.completed(), 0);
}

#[test]
fn reordering_inputs_only_reorders_blocks() {
    let dir = tempfile::tempdir().unwrap();
    let x = write(dir.path(), "x.rs", "fn x() {}\n");
    let y = write(dir.path(), "y.md", "# y\n");
    let options = RunOptions {
        prompt: uno_core::PromptOptions {
            format: PromptFormat::Markdown,
            ..Default::default()
        },
        ..RunOptions::default()
    };
    let forward = prompt(&[x.clone(), y.clone()], &options);
    let backward = prompt(&[y, x], &options);
    let block_x = "## x.rs\n\n```rs\nfn x() {}\n\n```\n\n";
    let block_y = "## y.md\n\n```md\n# y\n\n```\n\n";
    assert_eq!(forward, format!("{}{}", block_x, block_y));
    assert_eq!(backward, format!("{}{}", block_y, block_x));
}

#[test]
fn toc_entries_point_at_first_pages() {
    let dir = tempfile::tempdir().unwrap();
    let files = vec![
        write(dir.path(), "src/long.rs", &"let value = 1;\n".repeat(400)),
        write(dir.path(), "src/empty.txt", ""),
        write(dir.path(), "docs/notes.md", "# Notes\n\nSome text.\n"),
    ];
    let mut options = RunOptions::default();
    options.document.include_file_tree = true;
    let doc = document(&files, &options);

    assert!(matches!(doc.pages()[0], DocumentPage::Tree(_)));
    let names: Vec<&str> = doc.toc().iter().map(|e| e.file_name.as_str()).collect();
    assert_eq!(names, vec!["long.rs", "empty.txt", "notes.md"]);
    for (entry, range) in doc.toc().iter().zip(doc.file_ranges()) {
        assert_eq!(entry.first_page, range.start + 1);
        assert!(matches!(doc.pages()[range.start], DocumentPage::Title(_)));
    }
    let empty = &doc.file_ranges()[1];
    assert_eq!(empty.len(), 2);
    match &doc.pages()[empty.start + 1] {
        DocumentPage::Text(page) => assert!(page.text().is_empty()),
        other => panic!("expected a text page, got {:?}", other),
    }
}

#[test]
fn exported_pdf_has_every_page() {
    let dir = tempfile::tempdir().unwrap();
    let files = vec![
        write(dir.path(), "a.py", &"x = 1\n".repeat(300)),
        write(dir.path(), "b.toml", "[package]\nname = \"b\"\n"),
    ];
    let doc = document(&files, &RunOptions::default());
    let out = dir.path().join("out.pdf");
    doc.save(&out).unwrap();
    let loaded = lopdf::Document::load(&out).unwrap();
    assert_eq!(loaded.get_pages().len(), doc.page_count());
}

#[test]
fn pdf_inputs_are_spliced_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let inner_files = vec![write(dir.path(), "inner.txt", &"row\n".repeat(250))];
    let inner = document(&inner_files, &RunOptions::default());
    let inner_path = dir.path().join("inner.pdf");
    inner.save(&inner_path).unwrap();

    let outer = document(&[inner_path], &RunOptions::default());
    let imported = outer
        .pages()
        .iter()
        .filter(|p| matches!(p, DocumentPage::Imported(_)))
        .count();
    assert_eq!(imported, inner.page_count());
    let bytes = outer.to_pdf_bytes().unwrap();
    let loaded = lopdf::Document::load_mem(&bytes).unwrap();
    assert_eq!(loaded.get_pages().len(), outer.page_count());
}
