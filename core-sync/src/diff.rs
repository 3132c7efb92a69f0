//! Change detection between the persisted baseline and a fresh scan.

use core_library::{Snapshot, Track};
use std::path::{Path, PathBuf};

/// Tracks to upsert and paths to remove
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSet {
    pub added: Vec<Track>,
    pub modified: Vec<Track>,
    pub removed: Vec<PathBuf>,
}

impl UpdateSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }

    /// Added then modified tracks, in path order within each group.
    pub fn upserts(&self) -> Vec<Track> {
        self.added
            .iter()
            .chain(self.modified.iter())
            .cloned()
            .collect()
    }

    pub fn upsert_count(&self) -> usize {
        self.added.len() + self.modified.len()
    }
}

/// Compare two snapshots. An empty `previous` reports everything as added.
pub fn diff(previous: &Snapshot, current: &Snapshot) -> UpdateSet {
    diff_excluding(previous, current, |_| false)
}

/// Like [`diff`], but previous paths for which `unreadable` holds are never
/// reported as removed.
pub fn diff_excluding<F>(previous: &Snapshot, current: &Snapshot, unreadable: F) -> UpdateSet
where
    F: Fn(&Path) -> bool,
{
    let mut updates = UpdateSet::default();

    for track in current.tracks() {
        match previous.get(&track.path) {
            None => updates.added.push(track.clone()),
            Some(old) if !old.fingerprint.matches(&track.fingerprint) => {
                updates.modified.push(track.clone())
            }
            Some(_) => {}
        }
    }

    updates.removed = previous
        .paths()
        .filter(|path| !current.contains(path) && !unreadable(path))
        .cloned()
        .collect();

    updates
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_library::{Fingerprint, TrackFormat};

    fn track(path: &str, modified: i64, size: u64, hash: &str) -> Track {
        Track::new(
            path,
            TrackFormat::Mp3,
            Fingerprint::new(size, modified).with_hash(hash),
        )
    }

    fn snapshot(tracks: Vec<Track>) -> Snapshot {
        tracks.into_iter().collect()
    }

    #[test]
    fn test_identical_snapshots_produce_no_updates() {
        let s = snapshot(vec![track("/m/a.mp3", 1, 1, "h1"), track("/m/b.mp3", 2, 2, "h2")]);
        assert!(diff(&s, &s).is_empty());
    }

    #[test]
    fn test_empty_previous_adds_everything() {
        let s = snapshot(vec![track("/m/a.mp3", 1, 1, ""), track("/m/b.mp3", 2, 2, "")]);
        let updates = diff(&Snapshot::new(), &s);

        assert_eq!(updates.added.len(), 2);
        assert!(updates.modified.is_empty());
        assert!(updates.removed.is_empty());
        assert_eq!(updates.upsert_count(), 2);
    }

    #[test]
    fn test_added_modified_removed() {
        let previous = snapshot(vec![track("/m/a.mp3", 1, 1, "h1"), track("/m/b.mp3", 2, 2, "h2")]);
        let current = snapshot(vec![track("/m/a.mp3", 5, 1, "h1-new"), track("/m/c.mp3", 3, 3, "h3")]);

        let updates = diff(&previous, &current);
        let paths = |tracks: &[Track]| tracks.iter().map(|t| t.path.clone()).collect::<Vec<_>>();

        assert_eq!(paths(&updates.added), vec![PathBuf::from("/m/c.mp3")]);
        assert_eq!(paths(&updates.modified), vec![PathBuf::from("/m/a.mp3")]);
        assert_eq!(updates.removed, vec![PathBuf::from("/m/b.mp3")]);
        assert_eq!(
            paths(&updates.upserts()),
            vec![PathBuf::from("/m/c.mp3"), PathBuf::from("/m/a.mp3")]
        );
    }

    #[test]
    fn test_touch_only_is_not_a_change_when_hashed() {
        let previous = snapshot(vec![track("/m/a.mp3", 1, 10, "same")]);
        let touched = snapshot(vec![track("/m/a.mp3", 99, 10, "same")]);
        assert!(diff(&previous, &touched).is_empty());
    }

    #[test]
    fn test_touch_is_a_change_without_hashes() {
        let previous = snapshot(vec![track("/m/a.mp3", 1, 10, "")]);
        let touched = snapshot(vec![track("/m/a.mp3", 99, 10, "")]);
        assert_eq!(diff(&previous, &touched).modified.len(), 1);

        // Hash on one side only falls back to (mtime, size)
        let hashed = snapshot(vec![track("/m/a.mp3", 1, 10, "h")]);
        assert!(diff(&previous, &hashed).is_empty());
    }

    #[test]
    fn test_unreadable_paths_are_not_removed() {
        let previous = snapshot(vec![
            track("/m/locked/a.mp3", 1, 1, ""),
            track("/m/bad.mp3", 1, 1, ""),
            track("/m/gone.mp3", 1, 1, ""),
        ]);
        let current = Snapshot::new();

        let updates = diff_excluding(&previous, &current, |path| {
            path.starts_with("/m/locked") || path == Path::new("/m/bad.mp3")
        });
        assert_eq!(updates.removed, vec![PathBuf::from("/m/gone.mp3")]);
    }
}
