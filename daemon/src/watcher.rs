//! Debounced watch on a single file.
//!
//! Events are only delivered once the file has been quiet for the stability
//! threshold, so a partially written status file is never read.

use notify::{EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebouncedEvent, Debouncer, RecommendedCache};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::WatchError;
use crate::event::{DaemonEvent, FileEvent};

/// Something that can deliver add/change/remove events for one path.
pub trait WatchSource {
    fn subscribe(
        &self,
        path: &Path,
        tx: mpsc::Sender<DaemonEvent>,
    ) -> Result<Box<dyn Subscription>, WatchError>;
}

/// A live watch. Closing it stops event delivery and releases the watcher.
pub trait Subscription: Send {
    fn close(self: Box<Self>);
}

/// Production watch backed by `notify-debouncer-full`.
pub struct DebouncedWatch {
    /// Quiet period after the last write before an event is delivered.
    pub stability_threshold: Duration,
    /// How often the debouncer checks whether the quiet period has elapsed.
    pub poll_interval: Duration,
}

struct DebouncedSubscription {
    debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
}

impl Subscription for DebouncedSubscription {
    fn close(self: Box<Self>) {
        self.debouncer.stop();
    }
}

impl WatchSource for DebouncedWatch {
    fn subscribe(
        &self,
        path: &Path,
        tx: mpsc::Sender<DaemonEvent>,
    ) -> Result<Box<dyn Subscription>, WatchError> {
        // Watch the parent directory so the file can be created after startup
        // and so atomic saves (write-new + rename) are seen.
        let watch_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| WatchError::NoParent(path.display().to_string()))?
            .to_path_buf();
        let target = path.to_path_buf();

        let mut debouncer = new_debouncer(
            self.stability_threshold,
            Some(self.poll_interval),
            move |result: Result<Vec<DebouncedEvent>, Vec<notify::Error>>| match result {
                Ok(events) => {
                    for event in events {
                        let Some(file_event) = classify(&event, &target) else {
                            continue;
                        };
                        if tx.blocking_send(DaemonEvent::StatusFile(file_event)).is_err() {
                            return;
                        }
                    }
                }
                Err(errors) => {
                    for e in errors {
                        tracing::warn!(error = %e, "Status file watcher error");
                    }
                }
            },
        )?;

        debouncer.watch(&watch_dir, RecursiveMode::NonRecursive)?;
        tracing::debug!(dir = %watch_dir.display(), file = %path.display(), "Watching status file");

        Ok(Box::new(DebouncedSubscription { debouncer }))
    }
}

/// Maps a raw debounced event to a [`FileEvent`] for `target`, if it concerns it.
///
/// Renames report a `Modify(Name)` kind for both sides; whether the file now
/// exists decides between a change and a removal.
fn classify(event: &notify::Event, target: &Path) -> Option<FileEvent> {
    if !event.paths.iter().any(|p| p == target) {
        return None;
    }
    let path: PathBuf = target.to_path_buf();
    match event.kind {
        EventKind::Create(_) => Some(FileEvent::Added(path)),
        EventKind::Modify(notify::event::ModifyKind::Name(_)) => {
            if target.exists() {
                Some(FileEvent::Added(path))
            } else {
                Some(FileEvent::Removed(path))
            }
        }
        EventKind::Modify(_) => Some(FileEvent::Changed(path)),
        EventKind::Remove(_) => Some(FileEvent::Removed(path)),
        _ => None,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, ModifyKind, RemoveKind, RenameMode};

    fn make_event(kind: EventKind, paths: Vec<PathBuf>) -> notify::Event {
        notify::Event {
            kind,
            paths,
            attrs: Default::default(),
        }
    }

    #[test]
    fn classify_create_is_added() {
        let target = PathBuf::from("/tmp/status.json");
        let event = make_event(EventKind::Create(CreateKind::File), vec![target.clone()]);
        assert_eq!(classify(&event, &target), Some(FileEvent::Added(target)));
    }

    #[test]
    fn classify_data_modify_is_changed() {
        let target = PathBuf::from("/tmp/status.json");
        let event = make_event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            vec![target.clone()],
        );
        assert_eq!(classify(&event, &target), Some(FileEvent::Changed(target)));
    }

    #[test]
    fn classify_remove_is_removed() {
        let target = PathBuf::from("/tmp/status.json");
        let event = make_event(EventKind::Remove(RemoveKind::File), vec![target.clone()]);
        assert_eq!(classify(&event, &target), Some(FileEvent::Removed(target)));
    }

    #[test]
    fn classify_rename_away_from_missing_file_is_removed() {
        let target = PathBuf::from("/nonexistent/dir/status.json");
        let event = make_event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            vec![target.clone()],
        );
        assert_eq!(classify(&event, &target), Some(FileEvent::Removed(target)));
    }

    #[test]
    fn classify_rename_onto_existing_file_is_added() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("status.json");
        std::fs::write(&target, "{}").unwrap();
        let event = make_event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            vec![target.clone()],
        );
        assert_eq!(classify(&event, &target), Some(FileEvent::Added(target)));
    }

    #[test]
    fn classify_ignores_sibling_files() {
        let target = PathBuf::from("/tmp/status.json");
        let event = make_event(
            EventKind::Create(CreateKind::File),
            vec![PathBuf::from("/tmp/other.json")],
        );
        assert_eq!(classify(&event, &target), None);
    }

    #[test]
    fn classify_ignores_access_events() {
        let target = PathBuf::from("/tmp/status.json");
        let event = make_event(
            EventKind::Access(notify::event::AccessKind::Read),
            vec![target.clone()],
        );
        assert_eq!(classify(&event, &target), None);
    }

    #[test]
    fn subscribe_rejects_bare_file_name() {
        let watch = DebouncedWatch {
            stability_threshold: Duration::from_millis(50),
            poll_interval: Duration::from_millis(10),
        };
        let (tx, _rx) = mpsc::channel(1);
        let result = watch.subscribe(Path::new("status.json"), tx);
        assert!(matches!(result, Err(WatchError::NoParent(_))));
    }

    #[test]
    fn subscribe_missing_directory_fails() {
        let watch = DebouncedWatch {
            stability_threshold: Duration::from_millis(50),
            poll_interval: Duration::from_millis(10),
        };
        let (tx, _rx) = mpsc::channel(1);
        let result = watch.subscribe(Path::new("/nonexistent/dir/status.json"), tx);
        assert!(matches!(result, Err(WatchError::Notify(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn subscribe_delivers_debounced_add() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("status.json");
        let watch = DebouncedWatch {
            stability_threshold: Duration::from_millis(100),
            poll_interval: Duration::from_millis(20),
        };
        let (tx, mut rx) = mpsc::channel(16);
        let sub = watch.subscribe(&target, tx).unwrap();

        std::fs::write(&target, r#"{"status":"in-progress"}"#).unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no event within timeout")
            .expect("channel closed");
        match event {
            DaemonEvent::StatusFile(FileEvent::Added(p) | FileEvent::Changed(p)) => {
                assert_eq!(p, target)
            }
            _ => panic!("unexpected event"),
        }
        sub.close();
    }
}
