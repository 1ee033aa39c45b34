use crate::cli_args::WatchArgs;
use crate::commands::{resolve_inputs, run_options_for, services_for};
use crate::output;
use crate::{apply_document_overrides, apply_prompt_overrides, load_config_for_command};
use anyhow::{Context, Result};
use colored::*;
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{Debouncer, new_debouncer};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;
use uno_core::{Artifact, Config, Mode, ProcessingSession, SessionEvent};

const EVENT_POLL: Duration = Duration::from_millis(100);

fn watch_path(
    watcher: &mut Debouncer<RecommendedWatcher>,
    path: &Path,
    watched_paths: &mut HashSet<PathBuf>,
    quiet: bool,
) {
    let path_to_watch = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if watched_paths.contains(&path_to_watch) {
        log::trace!("Already watching: {}", path_to_watch.display());
        return;
    }
    if !path_to_watch.exists() {
        log::trace!("Skipping watch for non-existent path: {}", path.display());
        return;
    }
    let mode = if path_to_watch.is_dir() {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };
    match watcher.watcher().watch(&path_to_watch, mode) {
        Ok(_) => {
            log::debug!("Watching: {}", path_to_watch.display());
            watched_paths.insert(path_to_watch);
        }
        Err(e) => {
            if !quiet {
                eprintln!("{} Failed to watch {}: {}", "⚠️".yellow(), path.display(), e);
            }
            log::warn!("Failed to watch {}: {}", path.display(), e);
        }
    }
}

fn load_watch_config(args: &WatchArgs) -> Result<Config> {
    let mut config = load_config_for_command(&args.config, &args.inputs)?;
    apply_prompt_overrides(&mut config, &args.prompt_style)?;
    apply_document_overrides(&mut config, &args.document_style)?;
    if let Some(delay) = &args.delay {
        config.watch.delay = delay.clone();
    }
    config.validate()?;
    Ok(config)
}

fn new_session(config: &Config, mode: Mode) -> Result<(ProcessingSession, Receiver<SessionEvent>)> {
    let options = run_options_for(config, mode)?;
    Ok(ProcessingSession::new(options, services_for(config)))
}

fn config_path(args: &WatchArgs) -> Option<PathBuf> {
    let base_dir = std::env::current_dir().ok()?;
    Config::resolve_config_path(&base_dir, args.config.config.as_ref(), args.config.no_config)
        .ok()
        .flatten()
}

fn handle_session_event(
    event: SessionEvent,
    session: &ProcessingSession,
    args: &WatchArgs,
    quiet: bool,
    verbose: u8,
) {
    if session.current_run() != Some(event.run_id()) {
        log::trace!("Ignoring event from superseded run {}", event.run_id());
        return;
    }
    match event {
        SessionEvent::Started { total, .. } => {
            if !quiet && verbose > 0 {
                eprintln!("{} Regenerating from {} file(s)...", "🔄".blue(), total);
            }
        }
        SessionEvent::Progress { completed, total, .. } => {
            if !quiet && verbose > 0 {
                output::print_progress(completed, total);
            }
        }
        SessionEvent::Completed { outcome, .. } => {
            if !quiet {
                output::report_warnings(&outcome.warnings);
            }
            if let Err(e) = write_artifact(outcome.artifact, args, quiet) {
                if !quiet {
                    eprintln!("{} {:#}\n", "⚠️ Error writing output:".yellow(), e);
                }
            }
        }
        SessionEvent::Failed { error, .. } => {
            if !quiet {
                eprintln!("{} {}\n", "⚠️ Error during regeneration:".yellow(), error);
            }
        }
        SessionEvent::Cancelled { run_id } => {
            log::debug!("Run {} cancelled.", run_id);
        }
    }
}

fn write_artifact(artifact: Artifact, args: &WatchArgs, quiet: bool) -> Result<()> {
    match (artifact, &args.pdf) {
        (Artifact::Document(document), Some(path)) => {
            output::ensure_parent_dir(path)?;
            document.save(path)?;
            if !quiet {
                println!(
                    "{} {} page(s) saved to: {}",
                    "✅".green(),
                    document.page_count(),
                    path.display().to_string().blue()
                );
            }
        }
        (Artifact::Prompt(text), _) => match &args.save {
            Some(path) => {
                output::write_to_file(path, text.as_bytes())?;
                if !quiet {
                    println!("{} Prompt saved to: {}", "✅".green(), path.display().to_string().blue());
                }
            }
            None => output::write_to_stdout(&text)?,
        },
        (Artifact::Document(_), None) => anyhow::bail!("Document produced without a --pdf target"),
    }
    Ok(())
}

pub fn run_watch_mode(args: WatchArgs, quiet: bool, verbose: u8) -> Result<()> {
    let mode = if args.pdf.is_some() {
        Mode::Paginated
    } else {
        Mode::Prompt
    };
    let mut config = load_watch_config(&args).context("Failed to load initial configuration for watch mode")?;
    let delay = config
        .get_watch_delay()
        .context("Invalid watch delay duration")?;

    let mut files = resolve_inputs(&args.inputs, &config)?;
    let (mut session, mut events) = new_session(&config, mode)?;
    session.add_files(files.clone());

    if !quiet {
        println!(
            "👀 Watching {} input(s) ({} file(s)). Press Ctrl+C to exit.",
            args.inputs.paths.len(),
            files.len()
        );
    }

    let (tx, rx) = mpsc::channel();
    let mut debouncer =
        new_debouncer(delay, tx).map_err(|e| anyhow::anyhow!("Failed to create debouncer: {}", e))?;
    let mut watched_paths = HashSet::new();
    for path in &args.inputs.paths {
        watch_path(&mut debouncer, path, &mut watched_paths, quiet);
    }
    let watched_config = config_path(&args);
    if let Some(path) = &watched_config {
        watch_path(&mut debouncer, path, &mut watched_paths, quiet);
    }
    if watched_paths.is_empty() && !quiet {
        println!("{}", "⚠️ Nothing to watch.".yellow());
    }

    session.start()?;

    loop {
        match rx.recv_timeout(EVENT_POLL) {
            Ok(Ok(debounced_events)) if !debounced_events.is_empty() => {
                for event in &debounced_events {
                    log::trace!("Debounced event: {:?}", event);
                }

                let config_changed = watched_config.as_ref().is_some_and(|config_path| {
                    let canonical = config_path.canonicalize().ok();
                    debounced_events
                        .iter()
                        .any(|event| event.path.canonicalize().ok() == canonical || event.path == *config_path)
                });
                if config_changed {
                    if !quiet && verbose > 0 {
                        eprintln!("{}", "🔄 Config file changed. Reloading configuration...".blue());
                    }
                    match load_watch_config(&args) {
                        Ok(reloaded) => {
                            config = reloaded;
                            let (fresh, fresh_events) = new_session(&config, mode)?;
                            session = fresh;
                            events = fresh_events;
                            files.clear();
                        }
                        Err(e) => {
                            if !quiet {
                                eprintln!("{} {:#}\n", "⚠️ Error reloading config:".yellow(), e);
                            }
                        }
                    }
                }

                match resolve_inputs(&args.inputs, &config) {
                    Ok(current) => {
                        if current != files {
                            log::debug!("Input list changed: {} file(s)", current.len());
                            session.clear();
                            session.add_files(current.clone());
                            files = current;
                        }
                        session.start()?;
                    }
                    Err(e) => {
                        if !quiet {
                            eprintln!("{} {:#}\n", "⚠️ Error resolving inputs:".yellow(), e);
                        }
                    }
                }
            }
            Ok(Ok(_)) => log::trace!("Received empty debounced event list."),
            Ok(Err(error)) => {
                if !quiet {
                    eprintln!("{} {:#}\n", "⚠️ Watch error:".yellow(), error);
                }
                log::error!("Notify error received: {:?}", error);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                eprintln!("{}", "⛔ Watcher channel closed.".red());
                break Ok(());
            }
        }

        while let Ok(event) = events.try_recv() {
            handle_session_event(event, &session, &args, quiet, verbose);
        }
    }
}
