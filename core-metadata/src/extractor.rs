//! Audio Tag Extraction
//!
//! Reads one audio file into a normalized `Track` using the `lofty` crate.
//!
//! ## Overview
//!
//! - Dispatches on extension to a [`TagFormat`] variant
//! - Prefers the format's native tag type, falling back to the primary and then
//!   the first tag present
//! - Normalizes text (control characters removed, whitespace collapsed),
//!   track numbers (`3/12` → 3), years (first four digits) and durations
//!   (whole seconds, truncated)
//! - Reads the file fingerprint (size, mtime, optional SHA-256 content hash)
//!
//! Extraction is synchronous; the scanner runs it on a blocking thread.
//!
//! ## Usage
//!
//! ```ignore
//! use core_metadata::{TagExtractor, TrackExtractor};
//! use std::path::Path;
//!
//! let extractor = TagExtractor::new();
//! let track = extractor.extract(Path::new("/music/song.flac"))?;
//! println!("{} - {}", track.artist, track.title);
//! ```

use core_library::{Fingerprint, Track};
use lofty::config::ParseOptions;
use lofty::file::{AudioFile, TaggedFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::UNIX_EPOCH;
use tracing::{debug, warn};

use crate::error::{ExtractionError, Result};
use crate::format::TagFormat;
use crate::normalize::{comment_tags, normalize_text, parse_track_number, parse_year};

/// Reads a single file into a `Track`.
///
/// The scanner depends on this trait rather than on [`TagExtractor`] so that
/// traversal can be exercised without real audio files.
pub trait TrackExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<Track>;
}

/// `lofty`-backed extractor for MP3, FLAC, M4A and Ogg files.
#[derive(Debug, Clone)]
pub struct TagExtractor {
    parse_options: ParseOptions,
    hash_contents: bool,
}

impl TagExtractor {
    /// Create a new extractor that hashes file contents
    pub fn new() -> Self {
        Self {
            parse_options: ParseOptions::new(),
            hash_contents: true,
        }
    }

    /// Enable or disable SHA-256 content hashing
    pub fn with_hashing(mut self, enabled: bool) -> Self {
        self.hash_contents = enabled;
        self
    }

    fn read_tagged_file(&self, path: &Path, format: TagFormat) -> Result<TaggedFile> {
        let file = File::open(path).map_err(|e| ExtractionError::from_io(path, e))?;
        let probe = Probe::new(BufReader::new(file)).options(self.parse_options);

        let probe = match format.file_type_hint() {
            Some(file_type) => probe.set_file_type(file_type),
            None => probe
                .guess_file_type()
                .map_err(|e| ExtractionError::from_io(path, e))?,
        };

        match probe.file_type() {
            Some(file_type) if format.accepts(file_type) => {}
            Some(file_type) => {
                return Err(ExtractionError::CorruptMetadata {
                    path: path.to_path_buf(),
                    reason: format!("content is {:?}, not {:?}", file_type, format),
                })
            }
            None => {
                return Err(ExtractionError::CorruptMetadata {
                    path: path.to_path_buf(),
                    reason: "unrecognized container".to_string(),
                })
            }
        }

        probe.read().map_err(|e| ExtractionError::CorruptMetadata {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn select_tag<'a>(tagged_file: &'a TaggedFile, format: TagFormat) -> Option<&'a Tag> {
        tagged_file
            .tag(format.native_tag_type())
            .or_else(|| tagged_file.primary_tag())
            .or_else(|| tagged_file.first_tag())
    }

    fn apply_tag(track: &mut Track, tag: &Tag) {
        track.title = tag
            .title()
            .map(|s| normalize_text(s.as_ref()))
            .unwrap_or_default();
        track.artist = tag
            .artist()
            .map(|s| normalize_text(s.as_ref()))
            .unwrap_or_default();
        track.album = tag
            .album()
            .map(|s| normalize_text(s.as_ref()))
            .unwrap_or_default();
        track.album_artist = tag
            .get_string(&ItemKey::AlbumArtist)
            .map(normalize_text)
            .unwrap_or_default();
        track.genre = tag
            .genre()
            .map(|s| normalize_text(s.as_ref()))
            .unwrap_or_default();

        track.track_number = tag
            .get_string(&ItemKey::TrackNumber)
            .map(parse_track_number)
            .filter(|n| *n > 0)
            .or_else(|| tag.track())
            .unwrap_or(0);

        track.year = [ItemKey::RecordingDate, ItemKey::Year]
            .iter()
            .filter_map(|key| tag.get_string(key))
            .map(parse_year)
            .find(|year| *year > 0)
            .or_else(|| tag.year())
            .unwrap_or(0);

        track.tags = tag
            .get_items(&ItemKey::Comment)
            .filter_map(|item| item.value().text().map(|text| (item.description(), text)))
            .find_map(|(description, text)| comment_tags(description, text))
            .unwrap_or_default();
    }
}

impl Default for TagExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackExtractor for TagExtractor {
    fn extract(&self, path: &Path) -> Result<Track> {
        let format = TagFormat::from_path(path)?;
        debug!(path = %path.display(), ?format, "Extracting metadata");

        let fingerprint = read_fingerprint(path, self.hash_contents)?;
        let tagged_file = self.read_tagged_file(path, format)?;

        let mut track = Track::new(path, format.track_format(), fingerprint);
        track.duration_seconds = tagged_file.properties().duration().as_secs();

        match Self::select_tag(&tagged_file, format) {
            Some(tag) => Self::apply_tag(&mut track, tag),
            None => warn!(path = %path.display(), "No tags found, using file name as title"),
        }

        if track.title.is_empty() {
            track.title = path
                .file_stem()
                .map(|stem| normalize_text(&stem.to_string_lossy()))
                .unwrap_or_default();
        }

        Ok(track)
    }
}

/// Read size, mtime and (optionally) the SHA-256 of a file's contents.
pub fn read_fingerprint(path: &Path, hash_contents: bool) -> Result<Fingerprint> {
    let metadata = std::fs::metadata(path).map_err(|e| ExtractionError::from_io(path, e))?;

    let modified = metadata
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|duration| duration.as_secs() as i64)
        .unwrap_or(0);

    let fingerprint = Fingerprint::new(metadata.len(), modified);
    if !hash_contents {
        return Ok(fingerprint);
    }

    let mut file = File::open(path).map_err(|e| ExtractionError::from_io(path, e))?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher).map_err(|e| ExtractionError::from_io(path, e))?;

    Ok(fingerprint.with_hash(format!("{:x}", hasher.finalize())))
}
