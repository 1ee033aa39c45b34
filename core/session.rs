//! Run coordination: validation, parallel extraction, ordered assembly, and
//! the long-lived `ProcessingSession` that owns at most one run at a time.

use crate::config::Config;
use crate::document::{Document, DocumentAssembler, DocumentOptions};
use crate::error::{AppError, Result};
use crate::extract::{ExtractOptions, ExtractedContent, Extractor, Services};
use crate::paginate::MonospaceMetrics;
use crate::prompt::{self, PromptOptions};
use crate::source::{SourceFile, validate_all};
use crate::tree::FileTree;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Prompt,
    Paginated,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: Mode,
    pub prompt: PromptOptions,
    pub document: DocumentOptions,
    /// Highlighting for paginated runs; prompt runs use `prompt.syntax_highlighting`.
    pub document_highlighting: bool,
    pub max_file_size: u64,
    pub workers: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        let config = Config::default();
        Self {
            mode: Mode::Prompt,
            prompt: prompt_options(&config),
            document: DocumentOptions::from_config(&config.document),
            document_highlighting: config.document.syntax_highlighting,
            max_file_size: config.max_file_size_bytes().unwrap_or(u64::MAX),
            workers: config.general.workers,
        }
    }
}

fn prompt_options(config: &Config) -> PromptOptions {
    PromptOptions {
        format: config.prompt.format,
        include_file_tree: config.prompt.include_file_tree,
        syntax_highlighting: config.prompt.syntax_highlighting,
    }
}

impl RunOptions {
    pub fn from_config(config: &Config, mode: Mode) -> Result<Self> {
        Ok(Self {
            mode,
            prompt: prompt_options(config),
            document: DocumentOptions::from_config(&config.document),
            document_highlighting: config.document.syntax_highlighting,
            max_file_size: config.max_file_size_bytes()?,
            workers: config.general.workers.max(1),
        })
    }

    fn highlighting(&self) -> bool {
        match self.mode {
            Mode::Prompt => self.prompt.syntax_highlighting,
            Mode::Paginated => self.document_highlighting,
        }
    }

    fn wants_tree(&self) -> bool {
        match self.mode {
            Mode::Prompt => {
                self.prompt.include_file_tree || self.prompt.format == prompt::PromptFormat::WithTree
            }
            Mode::Paginated => self.document.include_file_tree,
        }
    }
}

/// Cancellation flag and progress counter shared between a run and its owner.
#[derive(Debug, Default)]
pub struct RunControl {
    cancelled: AtomicBool,
    completed: AtomicUsize,
    total: AtomicUsize,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    /// `completed / total`, or 0 before any file is known.
    pub fn progress(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.completed() as f64 / total as f64,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Artifact {
    Prompt(String),
    Document(Document),
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub artifact: Artifact,
    /// First contained problem, by input position.
    pub warning: Option<String>,
    /// Every contained problem, by input position.
    pub warnings: Vec<String>,
}

/// Runs one batch to completion on the calling thread. `on_progress` is called
/// with `(completed, total)` after each file finishes.
pub fn run_pipeline(
    files: &[PathBuf],
    options: &RunOptions,
    services: &Services,
    control: &RunControl,
    on_progress: &mut dyn FnMut(usize, usize),
) -> Result<RunOutcome> {
    control.total.store(files.len(), Ordering::SeqCst);
    control.completed.store(0, Ordering::SeqCst);

    let sources = validate_all(files, options.max_file_size)?;
    if control.is_cancelled() {
        return Err(AppError::Cancelled);
    }
    log::info!(
        "Processing {} file(s) with {} worker(s) in {:?} mode.",
        sources.len(),
        options.workers,
        options.mode
    );

    let extracted = services
        .monitor
        .time("extraction", || extract_all(&sources, options, services, control, on_progress))?;
    services.monitor.log_memory("extraction");
    if control.is_cancelled() {
        return Err(AppError::Cancelled);
    }

    let mut issues: Vec<(usize, String)> = Vec::new();
    let mut contents = Vec::with_capacity(extracted.len());
    for (index, (source, result)) in sources.iter().zip(extracted).enumerate() {
        match result {
            Ok(content) => {
                if let Some(warning) = &content.warning {
                    issues.push((index, warning.clone()));
                }
                contents.push(content);
            }
            Err(e) => {
                log::warn!("{}", e);
                issues.push((index, e.to_string()));
                contents.push(ExtractedContent::placeholder(source.clone(), &e));
            }
        }
    }

    let tree = options
        .wants_tree()
        .then(|| FileTree::build(&sources.iter().map(|s| s.path.clone()).collect::<Vec<_>>()));

    let artifact = match options.mode {
        Mode::Prompt => Artifact::Prompt(prompt::assemble(&contents, tree.as_ref(), &options.prompt)),
        Mode::Paginated => {
            let metrics = MonospaceMetrics::new(options.document.layout.font_size);
            let document_options = DocumentOptions {
                generated_at: Utc::now(),
                ..options.document.clone()
            };
            let assembly = services.monitor.time("assembly", || {
                DocumentAssembler::new(&metrics, document_options).assemble(&contents, tree.as_ref())
            })?;
            for (index, e) in assembly.failures {
                if !contents[index].is_placeholder {
                    issues.push((index, e.to_string()));
                }
            }
            Artifact::Document(assembly.document)
        }
    };
    services.monitor.log_memory("assembly");

    issues.sort_by_key(|(index, _)| *index);
    let warnings: Vec<String> = issues.into_iter().map(|(_, message)| message).collect();
    Ok(RunOutcome {
        artifact,
        warning: warnings.first().cloned(),
        warnings,
    })
}

/// Extracts every source on a bounded pool. Results come back in input order.
fn extract_all(
    sources: &[SourceFile],
    options: &RunOptions,
    services: &Services,
    control: &RunControl,
    on_progress: &mut dyn FnMut(usize, usize),
) -> Result<Vec<Result<ExtractedContent>>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.workers.max(1))
        .thread_name(|i| format!("uno-extract-{}", i))
        .build()
        .map_err(|e| AppError::InvalidArgument(format!("worker pool: {}", e)))?;
    let extract_options = ExtractOptions {
        syntax_highlighting: options.highlighting(),
    };
    let total = sources.len();
    let mut slots: Vec<Option<Result<ExtractedContent>>> = (0..total).map(|_| None).collect();

    let (tx, rx) = mpsc::channel::<(usize, Option<Result<ExtractedContent>>)>();
    pool.in_place_scope(|scope| {
        for (index, source) in sources.iter().enumerate() {
            let tx = tx.clone();
            scope.spawn(move |_| {
                if control.is_cancelled() {
                    let _ = tx.send((index, None));
                    return;
                }
                let result = Extractor::new(services, extract_options).extract(source);
                let _ = tx.send((index, Some(result)));
            });
        }
        drop(tx);

        for (index, result) in rx.iter() {
            if let Some(result) = result {
                slots[index] = Some(result);
                let done = control.completed.fetch_add(1, Ordering::SeqCst) + 1;
                log::debug!("Finished {} ({}/{})", sources[index].path.display(), done, total);
                on_progress(done, total);
            }
        }
    });

    if control.is_cancelled() {
        return Err(AppError::Cancelled);
    }
    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.ok_or_else(|| AppError::extraction(&sources[index].path, "worker produced no result"))
        })
        .collect()
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    Started { run_id: u64, total: usize },
    Progress { run_id: u64, completed: usize, total: usize },
    Completed { run_id: u64, outcome: RunOutcome },
    Failed { run_id: u64, error: String },
    Cancelled { run_id: u64 },
}

impl SessionEvent {
    pub fn run_id(&self) -> u64 {
        match self {
            SessionEvent::Started { run_id, .. }
            | SessionEvent::Progress { run_id, .. }
            | SessionEvent::Completed { run_id, .. }
            | SessionEvent::Failed { run_id, .. }
            | SessionEvent::Cancelled { run_id } => *run_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionEvent::Completed { .. } | SessionEvent::Failed { .. } | SessionEvent::Cancelled { .. }
        )
    }
}

#[derive(Debug, Default)]
struct SessionState {
    current_run: Option<u64>,
    last_error: Option<String>,
}

struct ActiveRun {
    id: u64,
    control: Arc<RunControl>,
    handle: JoinHandle<()>,
}

/// An ordered file list plus at most one background run. Events for every run
/// go to the receiver handed out by `new`; only the latest run updates the
/// session's own state.
pub struct ProcessingSession {
    files: Vec<PathBuf>,
    options: RunOptions,
    services: Services,
    events: Sender<SessionEvent>,
    state: Arc<Mutex<SessionState>>,
    next_run_id: u64,
    active: Option<ActiveRun>,
}

impl ProcessingSession {
    pub fn new(options: RunOptions, services: Services) -> (Self, Receiver<SessionEvent>) {
        let (events, rx) = mpsc::channel();
        let session = Self {
            files: Vec::new(),
            options,
            services,
            events,
            state: Arc::new(Mutex::new(SessionState::default())),
            next_run_id: 1,
            active: None,
        };
        (session, rx)
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn mode(&self) -> Mode {
        self.options.mode
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Appends paths not already in the list. Returns how many were added.
    pub fn add_files<I: IntoIterator<Item = PathBuf>>(&mut self, paths: I) -> usize {
        let before = self.files.len();
        for path in paths {
            if !self.files.contains(&path) {
                self.files.push(path);
            }
        }
        let added = self.files.len() - before;
        if added > 0 {
            self.files_changed();
        }
        added
    }

    pub fn remove_file(&mut self, index: usize) -> Result<PathBuf> {
        if index >= self.files.len() {
            return Err(out_of_range(index, self.files.len()));
        }
        let removed = self.files.remove(index);
        self.files_changed();
        Ok(removed)
    }

    pub fn move_file(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.files.len();
        if from >= len {
            return Err(out_of_range(from, len));
        }
        if to >= len {
            return Err(out_of_range(to, len));
        }
        if from != to {
            let path = self.files.remove(from);
            self.files.insert(to, path);
            self.files_changed();
        }
        Ok(())
    }

    /// Orders files by name, case-insensitively, then by full path.
    pub fn sort_by_name(&mut self) {
        self.files.sort_by_cached_key(|p| {
            let name = p
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            (name, p.clone())
        });
        self.files_changed();
    }

    /// Cancels any run, empties the list, and forgets the last run's result.
    pub fn clear(&mut self) {
        if let Some(active) = self.active.take() {
            active.control.cancel();
        }
        self.files.clear();
        let mut state = self.lock_state();
        state.current_run = None;
        state.last_error = None;
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.options.mode = mode;
    }

    /// Starts a run over the current file list, superseding any run in flight.
    pub fn start(&mut self) -> Result<u64> {
        if let Some(previous) = self.active.take() {
            log::debug!("Run {} superseded.", previous.id);
            previous.control.cancel();
        }
        let id = self.next_run_id;
        self.next_run_id += 1;

        let control = Arc::new(RunControl::new());
        let files = self.files.clone();
        let options = self.options.clone();
        let services = self.services.clone();
        let events = self.events.clone();
        let state = Arc::clone(&self.state);
        let run_control = Arc::clone(&control);

        // Held across the spawn: the run cannot finish before it is current.
        let mut guard = self.lock_state();
        let handle = thread::Builder::new()
            .name(format!("uno-run-{}", id))
            .spawn(move || {
                let _ = events.send(SessionEvent::Started {
                    run_id: id,
                    total: files.len(),
                });
                let mut progress = |completed, total| {
                    let _ = events.send(SessionEvent::Progress {
                        run_id: id,
                        completed,
                        total,
                    });
                };
                let result = run_pipeline(&files, &options, &services, &run_control, &mut progress);

                let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
                let current = state.current_run == Some(id) && !run_control.is_cancelled();
                let event = match result {
                    Ok(outcome) if current => {
                        state.last_error = outcome.warning.clone();
                        SessionEvent::Completed { run_id: id, outcome }
                    }
                    Err(e) if current && !matches!(e, AppError::Cancelled) => {
                        log::error!("Run {} failed: {}", id, e);
                        state.last_error = Some(e.to_string());
                        SessionEvent::Failed {
                            run_id: id,
                            error: e.to_string(),
                        }
                    }
                    _ => {
                        log::debug!("Run {} cancelled.", id);
                        SessionEvent::Cancelled { run_id: id }
                    }
                };
                drop(state);
                let _ = events.send(event);
            })?;
        guard.current_run = Some(id);
        guard.last_error = None;
        drop(guard);

        self.active = Some(ActiveRun { id, control, handle });
        Ok(id)
    }

    pub fn cancel(&mut self) {
        if let Some(active) = &self.active {
            active.control.cancel();
        }
    }

    /// Progress of the latest run in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        self.active.as_ref().map_or(0.0, |a| a.control.progress())
    }

    pub fn current_run(&self) -> Option<u64> {
        self.lock_state().current_run
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock_state().last_error.clone()
    }

    pub fn is_running(&self) -> bool {
        self.active.as_ref().is_some_and(|a| !a.handle.is_finished())
    }

    fn files_changed(&mut self) {
        if self.is_running() {
            log::debug!("File list changed during a run; restarting.");
            if let Err(e) = self.start() {
                log::error!("Could not restart run: {}", e);
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for ProcessingSession {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn out_of_range(index: usize, len: usize) -> AppError {
    AppError::InvalidArgument(format!("index {} out of range for {} file(s)", index, len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentPage;
    use std::fs;
    use std::path::Path;
    use std::time::Duration;

    fn write(dir: &Path, name: &str, body: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    fn prompt_of(outcome: RunOutcome) -> String {
        match outcome.artifact {
            Artifact::Prompt(text) => text,
            Artifact::Document(_) => panic!("expected a prompt"),
        }
    }

    fn wait_for_terminal(rx: &Receiver<SessionEvent>, run_id: u64) -> SessionEvent {
        loop {
            let event = rx.recv_timeout(Duration::from_secs(30)).unwrap();
            if event.run_id() == run_id && event.is_terminal() {
                return event;
            }
        }
    }

    #[test]
    fn output_order_matches_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<PathBuf> = (0..12)
            .map(|i| write(dir.path(), &format!("f{:02}.txt", i), format!("body {}", i).as_bytes()))
            .collect();
        let options = RunOptions {
            workers: 4,
            ..RunOptions::default()
        };
        let control = RunControl::new();
        let mut calls = 0;
        let outcome = run_pipeline(&files, &options, &Services::default(), &control, &mut |_, _| {
            calls += 1
        })
        .unwrap();
        let text = prompt_of(outcome);
        let positions: Vec<usize> = (0..12)
            .map(|i| text.find(&format!("<f{:02}.txt>", i)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(calls, 12);
        assert_eq!(control.progress(), 1.0);
    }

    #[test]
    fn oversized_file_aborts_before_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let small = write(dir.path(), "small.txt", b"ok");
        let big = write(dir.path(), "big.txt", &[b'x'; 100]);
        let options = RunOptions {
            max_file_size: 10,
            ..RunOptions::default()
        };
        let control = RunControl::new();
        let mut calls = 0;
        let err = run_pipeline(&[small, big], &options, &Services::default(), &control, &mut |_, _| {
            calls += 1
        })
        .unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("big.txt"));
        assert_eq!(calls, 0);
        assert_eq!(control.progress(), 0.0);
    }

    #[test]
    fn extraction_failure_is_contained() {
        let dir = tempfile::tempdir().unwrap();
        let good = write(dir.path(), "good.txt", b"fine");
        let bad = write(dir.path(), "bad.txt", &[0xff, 0xfe, 0x00]);
        let outcome = run_pipeline(
            &[bad, good],
            &RunOptions::default(),
            &Services::default(),
            &RunControl::new(),
            &mut |_, _| {},
        )
        .unwrap();
        let warning = outcome.warning.clone().unwrap();
        assert!(warning.contains("bad.txt"));
        let text = prompt_of(outcome);
        assert!(text.starts_with("<bad.txt>\n[unable to extract bad.txt:"));
        assert!(text.contains("<good.txt>\nfine\n</good.txt>"));
    }

    #[test]
    fn paginated_mode_builds_a_document() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.rs", b"fn main() {}\n");
        let b = write(dir.path(), "b.md", b"# Title\n");
        let options = RunOptions {
            mode: Mode::Paginated,
            ..RunOptions::default()
        };
        let outcome = run_pipeline(&[a, b], &options, &Services::default(), &RunControl::new(), &mut |_, _| {})
            .unwrap();
        match outcome.artifact {
            Artifact::Document(doc) => {
                assert_eq!(doc.toc().len(), 2);
                assert_eq!(doc.file_ranges().len(), 2);
            }
            Artifact::Prompt(_) => panic!("expected a document"),
        }
        assert!(outcome.warning.is_none());
    }

    #[test]
    fn cancelled_control_stops_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.txt", b"a");
        let control = RunControl::new();
        control.cancel();
        let err = run_pipeline(&[a], &RunOptions::default(), &Services::default(), &control, &mut |_, _| {})
            .unwrap_err();
        assert!(matches!(err, AppError::Cancelled));
    }

    #[test]
    fn session_reports_completion() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, rx) = ProcessingSession::new(RunOptions::default(), Services::default());
        session.add_files([write(dir.path(), "x.txt", b"x"), write(dir.path(), "y.txt", b"y")]);
        let id = session.start().unwrap();
        match wait_for_terminal(&rx, id) {
            SessionEvent::Completed { outcome, .. } => {
                assert_eq!(prompt_of(outcome), "<x.txt>\nx\n</x.txt>\n\n<y.txt>\ny\n</y.txt>\n\n");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(session.progress(), 1.0);
        assert_eq!(session.last_error(), None);
    }

    #[test]
    fn session_reports_validation_failure() {
        let (mut session, rx) = ProcessingSession::new(RunOptions::default(), Services::default());
        session.add_files([PathBuf::from("/no/such/file.txt")]);
        let id = session.start().unwrap();
        assert!(matches!(wait_for_terminal(&rx, id), SessionEvent::Failed { .. }));
        assert!(session.last_error().unwrap().contains("file.txt"));
        assert_eq!(session.progress(), 0.0);
    }

    #[test]
    fn clear_resets_run_state() {
        let (mut session, rx) = ProcessingSession::new(RunOptions::default(), Services::default());
        assert_eq!(session.current_run(), None);
        session.add_files([PathBuf::from("/no/such/file.txt")]);
        let id = session.start().unwrap();
        assert_eq!(session.current_run(), Some(id));
        assert!(matches!(wait_for_terminal(&rx, id), SessionEvent::Failed { .. }));
        assert!(session.last_error().is_some());

        session.clear();
        assert!(session.files().is_empty());
        assert_eq!(session.last_error(), None);
        assert_eq!(session.current_run(), None);
        assert!(!session.is_running());
    }

    #[test]
    fn each_run_stamps_its_own_generation_time() {
        let dir = tempfile::tempdir().unwrap();
        let options = RunOptions {
            mode: Mode::Paginated,
            ..RunOptions::default()
        };
        let (mut session, rx) = ProcessingSession::new(options, Services::default());
        session.add_files([write(dir.path(), "a.txt", b"a")]);

        let mut stamps = Vec::new();
        for _ in 0..2 {
            let id = session.start().unwrap();
            match wait_for_terminal(&rx, id) {
                SessionEvent::Completed { outcome, .. } => match outcome.artifact {
                    Artifact::Document(doc) => match &doc.pages()[0] {
                        DocumentPage::Title(title) => stamps.push(title.generated_at),
                        other => panic!("expected a title page, got {:?}", other),
                    },
                    Artifact::Prompt(_) => panic!("expected a document"),
                },
                other => panic!("unexpected {:?}", other),
            }
            thread::sleep(Duration::from_millis(20));
        }
        assert!(stamps[1] > stamps[0]);
    }

    #[test]
    fn newer_run_supersedes_older_one() {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<PathBuf> = (0..20)
            .map(|i| write(dir.path(), &format!("n{}.txt", i), b"data"))
            .collect();
        let (mut session, rx) = ProcessingSession::new(RunOptions::default(), Services::default());
        session.add_files(files);
        let first = session.start().unwrap();
        let second = session.start().unwrap();
        assert_ne!(first, second);
        assert_eq!(session.current_run(), Some(second));
        assert!(matches!(
            wait_for_terminal(&rx, second),
            SessionEvent::Completed { .. }
        ));
        assert_eq!(session.current_run(), Some(second));
    }

    #[test]
    fn list_operations_keep_order() {
        let (mut session, _rx) = ProcessingSession::new(RunOptions::default(), Services::default());
        let added = session.add_files(["b/Zed.txt", "a/alpha.txt", "c/Mid.txt", "a/alpha.txt"].map(PathBuf::from));
        assert_eq!(added, 3);
        session.move_file(2, 0).unwrap();
        assert_eq!(session.files()[0], PathBuf::from("c/Mid.txt"));
        session.sort_by_name();
        let names: Vec<_> = session.files().iter().map(|p| p.to_string_lossy().into_owned()).collect();
        assert_eq!(names, vec!["a/alpha.txt", "c/Mid.txt", "b/Zed.txt"]);
        assert_eq!(session.remove_file(1).unwrap(), PathBuf::from("c/Mid.txt"));
        assert!(session.remove_file(5).is_err());
        assert!(session.move_file(0, 9).is_err());
        session.set_mode(Mode::Paginated);
        assert_eq!(session.mode(), Mode::Paginated);
        session.clear();
        assert!(session.files().is_empty());
    }
}
