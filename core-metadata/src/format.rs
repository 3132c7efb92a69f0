//! Tag format dispatch
//!
//! Each supported container family is one `TagFormat` variant, selected by
//! file extension. A variant knows which `lofty` file type to force (or
//! whether to guess, for Ogg), which tag type is native to it, and which
//! `TrackFormat` it reports.

use crate::error::{ExtractionError, Result};
use core_library::TrackFormat;
use lofty::file::FileType;
use lofty::tag::TagType;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagFormat {
    /// MPEG layer III with ID3v2 tags
    Mp3,
    /// FLAC with Vorbis comments
    Flac,
    /// MPEG-4 audio with ilst atoms
    M4a,
    /// Ogg container (Vorbis, Opus, Speex) with Vorbis comments
    Ogg,
}

impl TagFormat {
    pub const ALL: [TagFormat; 4] = [
        TagFormat::Mp3,
        TagFormat::Flac,
        TagFormat::M4a,
        TagFormat::Ogg,
    ];

    /// Match an extension, case-insensitive, with or without a leading dot.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "mp3" => Some(TagFormat::Mp3),
            "flac" => Some(TagFormat::Flac),
            "m4a" | "mp4" | "m4b" => Some(TagFormat::M4a),
            "ogg" | "oga" | "opus" => Some(TagFormat::Ogg),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self::from_extension(&extension).ok_or_else(|| ExtractionError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension,
        })
    }

    /// File type forced on the probe; `None` lets lofty sniff the content.
    pub fn file_type_hint(&self) -> Option<FileType> {
        match self {
            TagFormat::Mp3 => Some(FileType::Mpeg),
            TagFormat::Flac => Some(FileType::Flac),
            TagFormat::M4a => Some(FileType::Mp4),
            TagFormat::Ogg => None,
        }
    }

    /// Whether a probed file type belongs to this family.
    pub fn accepts(&self, file_type: FileType) -> bool {
        match self {
            TagFormat::Mp3 => file_type == FileType::Mpeg,
            TagFormat::Flac => file_type == FileType::Flac,
            TagFormat::M4a => file_type == FileType::Mp4,
            TagFormat::Ogg => matches!(
                file_type,
                FileType::Vorbis | FileType::Opus | FileType::Speex
            ),
        }
    }

    pub fn native_tag_type(&self) -> TagType {
        match self {
            TagFormat::Mp3 => TagType::Id3v2,
            TagFormat::Flac | TagFormat::Ogg => TagType::VorbisComments,
            TagFormat::M4a => TagType::Mp4Ilst,
        }
    }

    pub fn track_format(&self) -> TrackFormat {
        match self {
            TagFormat::Mp3 => TrackFormat::Mp3,
            TagFormat::Flac => TrackFormat::Flac,
            TagFormat::M4a => TrackFormat::M4a,
            TagFormat::Ogg => TrackFormat::Ogg,
        }
    }
}
