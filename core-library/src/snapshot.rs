//! Library snapshot: the path-keyed view of one scan pass.

use crate::models::Track;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Mapping path → Track, ordered by path.
///
/// Holds exactly one track per path; inserting a track for an existing path
/// replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    tracks: BTreeMap<PathBuf, Track>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a track, returning the one it replaced.
    pub fn insert(&mut self, track: Track) -> Option<Track> {
        self.tracks.insert(track.path.clone(), track)
    }

    pub fn remove(&mut self, path: &Path) -> Option<Track> {
        self.tracks.remove(path)
    }

    pub fn get(&self, path: &Path) -> Option<&Track> {
        self.tracks.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.tracks.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Tracks in path order.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.tracks.keys()
    }
}

impl FromIterator<Track> for Snapshot {
    fn from_iter<I: IntoIterator<Item = Track>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        for track in iter {
            snapshot.insert(track);
        }
        snapshot
    }
}
