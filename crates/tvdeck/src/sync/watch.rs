use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use notify_debouncer_mini::notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use tokio::sync::mpsc;

use super::refresh::RefreshTrigger;

const WATCH_DEBOUNCE: Duration = Duration::from_millis(250);

/// Ask for a refresh whenever `path` changes on disk. The watcher stops
/// when the returned debouncer is dropped.
///
/// The parent directory is watched so editors that save by renaming over
/// the file are still noticed.
pub fn watch_deck_file(
    path: &Path,
    triggers: mpsc::UnboundedSender<RefreshTrigger>,
) -> Result<Debouncer<RecommendedWatcher>> {
    let target = absolute(path)?;
    let dir = target
        .parent()
        .map(Path::to_path_buf)
        .context("deck file has no parent directory")?;

    let watched = target.clone();
    let mut debouncer = new_debouncer(WATCH_DEBOUNCE, move |result: DebounceEventResult| {
        let Ok(events) = result else {
            return;
        };
        if events.iter().any(|e| same_file(&e.path, &watched)) {
            tracing::debug!("{} changed on disk", watched.display());
            let _ = triggers.send(RefreshTrigger::SourceChanged);
        }
    })
    .context("Failed to start file watcher")?;

    debouncer
        .watcher()
        .watch(&dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch {}", dir.display()))?;
    tracing::info!("watching {} for changes", target.display());
    Ok(debouncer)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to resolve working directory")?;
    Ok(cwd.join(path))
}

fn same_file(event_path: &Path, target: &Path) -> bool {
    if event_path == target {
        return true;
    }
    // Watchers may report canonical paths (e.g. through /private on macOS).
    match (event_path.canonicalize(), target.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => event_path.file_name() == target.file_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_file_matches_identical_paths() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("deck.json");
        std::fs::write(&a, "{}").unwrap();
        assert!(same_file(&a, &a));
        let other = dir.path().join("other.json");
        std::fs::write(&other, "{}").unwrap();
        assert!(!same_file(&other, &a));
    }

    #[tokio::test]
    async fn test_change_triggers_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.json");
        std::fs::write(&path, r#"{"slides": []}"#).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _watcher = watch_deck_file(&path, tx).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        std::fs::write(&path, r#"{"slides": [{"typeTag": "opening"}]}"#).unwrap();

        let trigger = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        assert_eq!(trigger, Some(RefreshTrigger::SourceChanged));
    }
}
