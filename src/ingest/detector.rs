//! Content format detector — identifies artifact format from magic bytes,
//! extension, or a text sniff, and resolves it to an analysis modality.
//!
//! Detection order matters: magic bytes are authoritative, the extension is a
//! fallback for formats without a usable signature, and a UTF-8 sniff catches
//! bare text. A declared filename never overrides conflicting magic bytes.

use crate::{PramanaError, PramanaResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw content format from magic bytes or extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFormat {
    Pdf,
    Jpeg,
    Png,
    Gif,
    Bmp,
    Tiff,
    Webp,
    PlainText,
    Mp4,
    Avi,
    Mkv,
    Wav,
    Mp3,
    Flac,
    Ogg,
    Unknown,
}

impl ContentFormat {
    /// Detect format from magic bytes
    pub fn from_magic_bytes(bytes: &[u8]) -> Self {
        if bytes.len() < 4 {
            return Self::Unknown;
        }

        match &bytes[..4] {
            // Documents
            [0x25, 0x50, 0x44, 0x46] => Self::Pdf, // %PDF

            // Images
            [0xFF, 0xD8, 0xFF, _] => Self::Jpeg,
            [0x89, 0x50, 0x4E, 0x47] => Self::Png,
            [0x47, 0x49, 0x46, 0x38] => Self::Gif, // GIF8
            [0x42, 0x4D, _, _] => Self::Bmp,       // BM
            [0x49, 0x49, 0x2A, 0x00] => Self::Tiff, // II*\0 (little-endian)
            [0x4D, 0x4D, 0x00, 0x2A] => Self::Tiff, // MM\0* (big-endian)

            // RIFF container — WebP, WAVE, or AVI depending on subtype
            [0x52, 0x49, 0x46, 0x46] => match bytes.get(8..12) {
                Some(b"WEBP") => Self::Webp,
                Some(b"WAVE") => Self::Wav,
                Some(b"AVI ") => Self::Avi,
                _ => Self::Unknown,
            },

            // Audio/video
            [0x49, 0x44, 0x33, _] => Self::Mp3,    // ID3
            [0x66, 0x4C, 0x61, 0x43] => Self::Flac, // fLaC
            [0x4F, 0x67, 0x67, 0x53] => Self::Ogg,  // OggS
            [0x1A, 0x45, 0xDF, 0xA3] => Self::Mkv,  // EBML

            _ => {
                // ISO base media (MP4/MOV): "ftyp" at offset 4
                if bytes.len() >= 8 && &bytes[4..8] == b"ftyp" {
                    Self::Mp4
                } else {
                    Self::Unknown
                }
            }
        }
    }

    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "jpg" | "jpeg" => Self::Jpeg,
            "png" => Self::Png,
            "gif" => Self::Gif,
            "bmp" => Self::Bmp,
            "tif" | "tiff" => Self::Tiff,
            "webp" => Self::Webp,
            "txt" | "text" | "md" => Self::PlainText,
            "mp4" | "m4v" | "mov" => Self::Mp4,
            "avi" => Self::Avi,
            "mkv" | "webm" => Self::Mkv,
            "wav" => Self::Wav,
            "mp3" => Self::Mp3,
            "flac" => Self::Flac,
            "ogg" | "oga" => Self::Ogg,
            _ => Self::Unknown,
        }
    }

    /// Can the engine decode this format?
    pub fn is_supported(&self) -> bool {
        matches!(
            self,
            Self::Pdf | Self::Jpeg | Self::Png | Self::Gif | Self::Bmp | Self::Tiff | Self::PlainText
        )
    }
}

/// Analysis modality — fixed for a job's whole lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Document,
    Image,
    Text,
    Video,
    Audio,
}

impl Modality {
    /// Map a content format onto the modality taxonomy
    pub fn from_format(format: ContentFormat) -> Option<Self> {
        match format {
            ContentFormat::Pdf => Some(Self::Document),
            ContentFormat::Jpeg
            | ContentFormat::Png
            | ContentFormat::Gif
            | ContentFormat::Bmp
            | ContentFormat::Tiff => Some(Self::Image),
            ContentFormat::PlainText => Some(Self::Text),
            ContentFormat::Mp4 | ContentFormat::Avi | ContentFormat::Mkv => Some(Self::Video),
            ContentFormat::Wav | ContentFormat::Mp3 | ContentFormat::Flac | ContentFormat::Ogg => {
                Some(Self::Audio)
            }
            ContentFormat::Webp | ContentFormat::Unknown => None,
        }
    }

    /// Modalities with a signal extractor behind them
    pub fn is_analyzable(&self) -> bool {
        matches!(self, Self::Document | Self::Image | Self::Text)
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Document => "document",
            Self::Image => "image",
            Self::Text => "text",
            Self::Video => "video",
            Self::Audio => "audio",
        };
        write!(f, "{}", s)
    }
}

/// Resolve the modality for raw content, rejecting anything the engine
/// cannot analyze. Magic bytes win over the filename; a UTF-8 sniff is the
/// last resort for bare text.
pub fn resolve_modality(bytes: &[u8], filename: Option<&str>) -> PramanaResult<Modality> {
    let mut format = ContentFormat::from_magic_bytes(bytes);

    if format == ContentFormat::Unknown {
        if let Some(ext) = filename.and_then(|f| f.rsplit('.').next()) {
            format = ContentFormat::from_extension(ext);
        }
    }

    if format == ContentFormat::Unknown && looks_like_text(bytes) {
        format = ContentFormat::PlainText;
    }

    match Modality::from_format(format) {
        Some(m) if m.is_analyzable() => Ok(m),
        Some(m) => Err(PramanaError::UnsupportedModality(m.to_string())),
        None => Err(PramanaError::UnsupportedModality(format!("{:?}", format).to_lowercase())),
    }
}

/// Valid, NUL-free UTF-8 counts as text
fn looks_like_text(bytes: &[u8]) -> bool {
    !bytes.is_empty() && !bytes.contains(&0) && std::str::from_utf8(bytes).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_bytes_pdf() {
        assert_eq!(
            ContentFormat::from_magic_bytes(b"%PDF-1.7\n"),
            ContentFormat::Pdf
        );
    }

    #[test]
    fn test_magic_bytes_images() {
        assert_eq!(
            ContentFormat::from_magic_bytes(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]),
            ContentFormat::Jpeg
        );
        assert_eq!(
            ContentFormat::from_magic_bytes(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A]),
            ContentFormat::Png
        );
        assert_eq!(
            ContentFormat::from_magic_bytes(b"GIF89a"),
            ContentFormat::Gif
        );
        assert_eq!(
            ContentFormat::from_magic_bytes(&[0x42, 0x4D, 0x36, 0x00]),
            ContentFormat::Bmp
        );
        assert_eq!(
            ContentFormat::from_magic_bytes(&[0x49, 0x49, 0x2A, 0x00]),
            ContentFormat::Tiff
        );
    }

    #[test]
    fn test_riff_disambiguation() {
        let mut wav = b"RIFF".to_vec();
        wav.extend_from_slice(&[0x24, 0x00, 0x00, 0x00]);
        wav.extend_from_slice(b"WAVE");
        assert_eq!(ContentFormat::from_magic_bytes(&wav), ContentFormat::Wav);

        let mut webp = b"RIFF".to_vec();
        webp.extend_from_slice(&[0x24, 0x00, 0x00, 0x00]);
        webp.extend_from_slice(b"WEBP");
        assert_eq!(ContentFormat::from_magic_bytes(&webp), ContentFormat::Webp);
    }

    #[test]
    fn test_modality_resolution_prefers_magic_over_name() {
        // JPEG bytes with a .pdf name still resolve as an image
        let modality = resolve_modality(&[0xFF, 0xD8, 0xFF, 0xE0, 0x10], Some("invoice.pdf"));
        assert_eq!(modality.unwrap(), Modality::Image);
    }

    #[test]
    fn test_text_sniff() {
        let modality = resolve_modality(b"Quarterly revenue of 120 crore.", None).unwrap();
        assert_eq!(modality, Modality::Text);
    }

    #[test]
    fn test_video_rejected() {
        let mut mp4 = vec![0x00, 0x00, 0x00, 0x18];
        mp4.extend_from_slice(b"ftypisom");
        let err = resolve_modality(&mp4, Some("clip.mp4")).unwrap_err();
        assert!(matches!(err, PramanaError::UnsupportedModality(ref m) if m == "video"));
    }

    #[test]
    fn test_unknown_binary_rejected() {
        let err = resolve_modality(&[0x00, 0x01, 0x02, 0x03, 0x00], None).unwrap_err();
        assert!(matches!(err, PramanaError::UnsupportedModality(_)));
    }

    #[test]
    fn test_extension_fallback() {
        assert_eq!(ContentFormat::from_extension("TIFF"), ContentFormat::Tiff);
        assert_eq!(ContentFormat::from_extension("jpeg"), ContentFormat::Jpeg);
        assert_eq!(ContentFormat::from_extension("docx"), ContentFormat::Unknown);
    }
}
