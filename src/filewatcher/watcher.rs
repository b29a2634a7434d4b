use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use notify::{
    event::{ModifyKind, RenameMode},
    Config, Event, EventKind, PollWatcher, RecursiveMode, Watcher,
};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, error, info, warn};

use crate::http::router::RouteTable;
use crate::mock::definition::{file_key, is_definition_file, load_definition};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to watch folder {path:?}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    #[error("failed to list folder {path:?}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChange {
    Created,
    Modified,
    Deleted,
}

/// Translates a notify event into per-file changes. Events that do not
/// touch a definition file produce nothing.
pub fn file_changes(event: &Event) -> Vec<(FileChange, PathBuf)> {
    let changes: Vec<(FileChange, PathBuf)> = match event.kind {
        EventKind::Create(_) => with_change(FileChange::Created, &event.paths),
        EventKind::Remove(_) => with_change(FileChange::Deleted, &event.paths),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            with_change(FileChange::Deleted, &event.paths)
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            with_change(FileChange::Created, &event.paths)
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match event.paths.as_slice() {
            [from, to] => vec![
                (FileChange::Deleted, from.clone()),
                (FileChange::Created, to.clone()),
            ],
            _ => Vec::new(),
        },
        EventKind::Modify(_) => with_change(FileChange::Modified, &event.paths),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    };
    changes
        .into_iter()
        .filter(|(_, path)| is_definition_file(path))
        .collect()
}

fn with_change(change: FileChange, paths: &[PathBuf]) -> Vec<(FileChange, PathBuf)> {
    paths.iter().map(|path| (change, path.clone())).collect()
}

/// Applies one file change to the table. Failures are logged, never returned,
/// so one bad file cannot stop the watch loop.
pub fn apply_change(table: &RouteTable, change: FileChange, path: &Path) {
    let Some(file_name) = file_key(path) else {
        return;
    };
    match change {
        FileChange::Created => {
            if path.is_dir() {
                return;
            }
            match load_definition(path) {
                Ok(definition) => {
                    table.add(definition);
                }
                Err(err) => warn!(file = %file_name, error = %err, "Ignoring definition file"),
            }
        }
        FileChange::Modified => {
            if path.is_dir() {
                return;
            }
            info!(file = %file_name, "Reloading mock from file");
            let definition = load_definition(path)
                .map_err(|err| warn!(file = %file_name, error = %err, "Ignoring definition file"))
                .ok();
            table.reload(&file_name, definition);
        }
        FileChange::Deleted => {
            table.remove(&file_name);
        }
    }
}

/// Registers every definition file currently in the table's folder, in file
/// name order. Returns how many routes were registered.
pub fn scan_directory(table: &RouteTable) -> Result<usize, WatchError> {
    let root = table.root();
    let entries = fs::read_dir(root).map_err(|source| WatchError::Scan {
        path: root.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_definition_file(path))
        .collect();
    paths.sort();

    let mut registered = 0;
    for path in paths {
        match load_definition(&path) {
            Ok(definition) => {
                if table.add(definition) {
                    registered += 1;
                }
            }
            Err(err) => warn!(error = %err, "Ignoring definition file"),
        }
    }
    Ok(registered)
}

/// Owns the running watcher. Dropping or closing it stops event delivery.
pub struct WatchHandle {
    watcher: PollWatcher,
    task: JoinHandle<()>,
}

impl WatchHandle {
    pub fn close(self) {
        self.task.abort();
        drop(self.watcher);
        info!("File watcher closed");
    }
}

/// Starts polling the table's folder (non-recursive), performs the initial
/// scan and spawns the task that turns file events into table updates.
///
/// The watch is registered before the scan so that files written during the
/// scan are not missed.
pub fn spawn_watcher(table: Arc<RouteTable>, poll_interval: Duration) -> Result<WatchHandle, WatchError> {
    let (tx, mut rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let config = Config::default()
        .with_poll_interval(poll_interval)
        .with_compare_contents(true);

    let mut watcher = PollWatcher::new(
        move |res: notify::Result<Event>| {
            // Called from the poller thread and, for watch errors, from `watch` itself.
            if tx.send(res).is_err() {
                debug!("File watcher event channel closed");
            }
        },
        config,
    )
    .map_err(|source| WatchError::Watch {
        path: table.root().to_path_buf(),
        source,
    })?;

    watcher
        .watch(table.root(), RecursiveMode::NonRecursive)
        .map_err(|source| WatchError::Watch {
            path: table.root().to_path_buf(),
            source,
        })?;

    let registered = scan_directory(&table)?;
    info!(registered, folder = %table.root().display(), "Watching .json files for changes...");

    let task = tokio::spawn(async move {
        while let Some(res) = rx.recv().await {
            match res {
                Ok(event) => {
                    let changes = file_changes(&event);
                    if changes.is_empty() {
                        continue;
                    }
                    // Definition files are read with std::fs; awaiting keeps events in order.
                    let table = Arc::clone(&table);
                    let applied = tokio::task::spawn_blocking(move || {
                        for (change, path) in changes {
                            debug!(?change, path = %path.display(), "File change detected");
                            apply_change(&table, change, &path);
                        }
                    })
                    .await;
                    if let Err(err) = applied {
                        error!(error = %err, "Failed to apply file change");
                    }
                }
                Err(err) => error!(error = ?err, "Watch error"),
            }
        }
    });

    Ok(WatchHandle { watcher, task })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::method::HttpMethod;
    use notify::event::{CreateKind, DataChange, RemoveKind};

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |event, path| event.add_path(PathBuf::from(path)))
    }

    #[test]
    fn test_file_changes_filters_extension() {
        let changes = file_changes(&event(
            EventKind::Create(CreateKind::File),
            &["/m/a.json", "/m/b.txt"],
        ));
        assert_eq!(changes, vec![(FileChange::Created, PathBuf::from("/m/a.json"))]);
    }

    #[test]
    fn test_file_changes_kinds() {
        let modified = file_changes(&event(
            EventKind::Modify(ModifyKind::Data(DataChange::Any)),
            &["/m/a.json"],
        ));
        assert_eq!(modified[0].0, FileChange::Modified);

        let removed = file_changes(&event(EventKind::Remove(RemoveKind::Any), &["/m/a.json"]));
        assert_eq!(removed[0].0, FileChange::Deleted);

        let renamed = file_changes(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/m/a.json", "/m/b.json"],
        ));
        assert_eq!(
            renamed,
            vec![
                (FileChange::Deleted, PathBuf::from("/m/a.json")),
                (FileChange::Created, PathBuf::from("/m/b.json")),
            ]
        );

        assert!(file_changes(&event(EventKind::Any, &["/m/a.json"])).is_empty());
    }

    #[test]
    fn test_scan_skips_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.json"), r#"{"url":"/a","response":{}}"#).unwrap();
        fs::write(dir.path().join("b.json"), r#"{"response":{}}"#).unwrap();
        fs::write(dir.path().join("c.json"), "garbage").unwrap();
        fs::write(dir.path().join("d.json"), r#"{"url":"/d","response":[],"http_method":"BREW"}"#).unwrap();
        fs::write(dir.path().join("e.txt"), r#"{"url":"/e","response":{}}"#).unwrap();
        fs::create_dir(dir.path().join("nested.json")).unwrap();

        let table = RouteTable::new(dir.path(), "");
        assert_eq!(scan_directory(&table).unwrap(), 1);
        let routes = table.snapshot();
        assert!(routes.by_file("a.json").is_some());
        assert!(routes.find(HttpMethod::Get, "/e").is_none());
    }

    #[test]
    fn test_scan_missing_folder_fails() {
        let dir = tempfile::tempdir().unwrap();
        let table = RouteTable::new(dir.path().join("missing"), "");
        assert!(matches!(scan_directory(&table), Err(WatchError::Scan { .. })));
    }

    #[test]
    fn test_apply_change_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.json");
        let table = RouteTable::new(dir.path(), "");

        fs::write(&path, r#"{"url":"/a","response":{}}"#).unwrap();
        apply_change(&table, FileChange::Created, &path);
        assert_eq!(table.snapshot().find(HttpMethod::Get, "/a").unwrap().mock.http_code, 200);

        fs::write(&path, r#"{"url":"/a","response":{},"http_code":500}"#).unwrap();
        apply_change(&table, FileChange::Modified, &path);
        let routes = table.snapshot();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes.find(HttpMethod::Get, "/a").unwrap().mock.http_code, 500);

        fs::write(&path, "broken").unwrap();
        apply_change(&table, FileChange::Modified, &path);
        assert!(table.snapshot().is_empty());

        fs::write(&path, r#"{"url":"/a","response":[]}"#).unwrap();
        apply_change(&table, FileChange::Modified, &path);
        assert_eq!(table.snapshot().len(), 1);

        fs::remove_file(&path).unwrap();
        apply_change(&table, FileChange::Deleted, &path);
        assert!(table.snapshot().is_empty());
        apply_change(&table, FileChange::Deleted, &path);
    }
}
