//! Watch mode

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, warn};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task;

use crate::error::Result;
use crate::list_files::{
    absolute_pattern, glob_base, list_files_and_perform_sanity_checks, relative_to_cwd, PatternMatcher,
};
use crate::pipeline::Pipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    Added,
    Changed,
    Removed,
}

impl fmt::Display for WatchEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WatchEventKind::Added => "ADDED",
            WatchEventKind::Changed => "CHANGED",
            WatchEventKind::Removed => "REMOVED",
        })
    }
}

/// A file system change to one path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub path: PathBuf,
}

impl WatchEvent {
    fn new(kind: WatchEventKind, path: PathBuf) -> Self {
        Self { kind, path }
    }
}

/// Map a raw notification to per-path events
pub fn watch_events(event: Event) -> Vec<WatchEvent> {
    use WatchEventKind::*;

    let kind = match event.kind {
        EventKind::Create(_) => Added,
        EventKind::Remove(_) => Removed,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Removed,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Added,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
            let mut paths = event.paths.into_iter();
            return paths
                .next()
                .map(|from| WatchEvent::new(Removed, from))
                .into_iter()
                .chain(paths.next().map(|to| WatchEvent::new(Added, to)))
                .collect();
        }
        EventKind::Modify(ModifyKind::Name(_)) => {
            return event
                .paths
                .into_iter()
                .map(|path| {
                    let kind = if path.exists() { Added } else { Removed };
                    WatchEvent::new(kind, path)
                })
                .collect();
        }
        EventKind::Modify(ModifyKind::Metadata(_)) => return Vec::new(),
        EventKind::Modify(_) => Changed,
        _ => return Vec::new(),
    };

    event.paths.into_iter().map(|path| WatchEvent::new(kind, path)).collect()
}

/// Handle a single watch event on a blocking task
pub fn dispatch(pipeline: &Arc<Pipeline>, event: WatchEvent) -> task::JoinHandle<()> {
    pipeline
        .alerts()
        .info(&format!("[{}] {}", event.kind, event.path.display()));
    let pipeline = Arc::clone(pipeline);
    task::spawn_blocking(move || match event.kind {
        WatchEventKind::Added | WatchEventKind::Changed => pipeline.write_file(&event.path),
        WatchEventKind::Removed => pipeline.remove_type_definition_file(&event.path),
    })
}

/// Generate type definitions as files matching `pattern` change, until
/// the watcher stops.
pub async fn watch(pipeline: Arc<Pipeline>, pattern: &str) -> Result<()> {
    let options = pipeline.options();
    let files = list_files_and_perform_sanity_checks(pattern, options, pipeline.cwd(), pipeline.alerts())?;
    let matcher = PatternMatcher::new(pattern, &options.ignore, pipeline.cwd())?;

    pipeline.alerts().success("Watching files...");

    let (tx, mut rx) = mpsc::unbounded_channel();

    if !options.ignore_initial {
        for file in files {
            let _ = tx.send(WatchEvent::new(WatchEventKind::Added, file));
        }
    }

    let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| match result {
        Ok(event) => {
            for event in watch_events(event) {
                let _ = tx.send(event);
            }
        }
        Err(err) => warn!("watch error: {}", err),
    })?;

    let root = glob_base(&absolute_pattern(pattern, pipeline.cwd()));
    debug!("watching {}", root.display());
    watcher.watch(&root, RecursiveMode::Recursive)?;

    while let Some(mut event) = rx.recv().await {
        if !matcher.matches(&event.path) {
            continue;
        }
        event.path = relative_to_cwd(&event.path, pipeline.cwd());
        let _ = dispatch(&pipeline, event);
    }

    Ok(())
}
