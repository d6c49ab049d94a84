//! Resource-type detection for crawled entries.
//!
//! The walker only sees the [`MimeDetector`] trait; [`detector_for`] picks the implementation
//! from the configured [`MimeStrategy`].

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::MimeStrategy;

/// Resource type recorded for directories, whatever the strategy.
pub const FOLDER_TYPE: &str = "folder";
/// Resource type recorded when detection is disabled.
pub const UNDETECTED_TYPE: &str = "n/a";

/// Bytes read from the start of a file for signature matching.
const SNIFF_LEN: usize = 64;

pub trait MimeDetector: Send + Sync {
    /// Classify a regular file (or symlink). None when the detector has no answer.
    fn detect(&self, path: &Path) -> Option<String>;
}

pub struct NoDetection;

impl MimeDetector for NoDetection {
    fn detect(&self, _path: &Path) -> Option<String> {
        Some(UNDETECTED_TYPE.to_string())
    }
}

pub struct ExtensionGuess;

impl MimeDetector for ExtensionGuess {
    fn detect(&self, path: &Path) -> Option<String> {
        mime_guess::from_path(path).first_raw().map(str::to_string)
    }
}

/// Magic-byte sniffing with the extension as fallback.
pub struct ContentInspect;

impl MimeDetector for ContentInspect {
    fn detect(&self, path: &Path) -> Option<String> {
        let mut head = Vec::with_capacity(SNIFF_LEN);
        if let Ok(f) = File::open(path) {
            let _ = f.take(SNIFF_LEN as u64).read_to_end(&mut head);
        }
        sniff(&head)
            .map(str::to_string)
            .or_else(|| ExtensionGuess.detect(path))
    }
}

pub fn detector_for(strategy: MimeStrategy) -> Box<dyn MimeDetector> {
    match strategy {
        MimeStrategy::None => Box::new(NoDetection),
        MimeStrategy::Extension => Box::new(ExtensionGuess),
        MimeStrategy::Content => Box::new(ContentInspect),
    }
}

const SIGNATURES: &[(&[u8], &str)] = &[
    (b"%PDF", "application/pdf"),
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"II*\x00", "image/tiff"),
    (b"MM\x00*", "image/tiff"),
    (b"BM", "image/bmp"),
    (b"8BPS", "image/vnd.adobe.photoshop"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1f\x8b", "application/gzip"),
    (b"BZh", "application/x-bzip2"),
    (b"7z\xbc\xaf\x27\x1c", "application/x-7z-compressed"),
    (b"Rar!\x1a\x07", "application/vnd.rar"),
    (b"ID3", "audio/mpeg"),
    (b"OggS", "audio/ogg"),
    (b"fLaC", "audio/flac"),
    (b"\x7fELF", "application/x-executable"),
    (b"<?xml", "application/xml"),
    (b"{\\rtf", "application/rtf"),
    (b"\xd0\xcf\x11\xe0\xa1\xb1\x1a\xe1", "application/x-ole-storage"),
];

/// Match leading bytes against known signatures. Container formats (RIFF, ISO BMFF) are
/// told apart by their sub-type tag.
pub fn sniff(head: &[u8]) -> Option<&'static str> {
    if head.len() >= 12 && head.starts_with(b"RIFF") {
        return match &head[8..12] {
            b"WAVE" => Some("audio/wav"),
            b"AVI " => Some("video/x-msvideo"),
            b"WEBP" => Some("image/webp"),
            _ => None,
        };
    }
    if head.len() >= 12 && &head[4..8] == b"ftyp" {
        return match &head[8..12] {
            b"qt  " => Some("video/quicktime"),
            b"M4A " => Some("audio/mp4"),
            _ => Some("video/mp4"),
        };
    }
    SIGNATURES
        .iter()
        .find(|(magic, _)| head.starts_with(magic))
        .map(|(_, mime)| *mime)
}
