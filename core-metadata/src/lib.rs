//! # Metadata Module
//!
//! Reads one audio file into a normalized [`Track`](core_library::Track).
//!
//! ## Overview
//!
//! This module handles:
//! - Format dispatch by extension (`TagFormat`: MP3, FLAC, M4A, Ogg)
//! - Tag reading through `lofty`, preferring each container's native tag type
//! - Normalization of text, track numbers, years and durations
//! - File fingerprints (size, mtime, optional SHA-256) for change detection

pub mod error;
pub mod extractor;
pub mod format;
pub mod normalize;

pub use error::{ExtractionError, Result};
pub use extractor::{read_fingerprint, TagExtractor, TrackExtractor};
pub use format::TagFormat;
