//! Image format tokens
//!
//! A closed set of comparable tokens. `Unknown` is load-bearing: it marks a
//! payload whose leading bytes have not arrived yet, which the decision gate
//! must distinguish from a recognized-but-unsupported format.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Detected format of an encoded image payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageFormat {
    /// JPEG, the canonical post-transform format
    Jpeg,
    /// PNG
    Png,
    /// GIF
    Gif,
    /// Format not yet determinable or not recognized
    Unknown,
}

impl ImageFormat {
    /// Detects the format from a buffer's magic bytes.
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Self::Jpeg
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
            Self::Png
        } else if bytes.starts_with(b"GIF8") {
            Self::Gif
        } else {
            Self::Unknown
        }
    }

    /// Token name used in diagnostics and logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::Gif => "GIF",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_recognizes_jpeg() {
        assert_eq!(
            ImageFormat::sniff(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]),
            ImageFormat::Jpeg
        );
    }

    #[test]
    fn test_sniff_recognizes_png_and_gif() {
        assert_eq!(
            ImageFormat::sniff(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A]),
            ImageFormat::Png
        );
        assert_eq!(ImageFormat::sniff(b"GIF89a"), ImageFormat::Gif);
    }

    #[test]
    fn test_sniff_short_or_foreign_buffers_are_unknown() {
        assert_eq!(ImageFormat::sniff(&[]), ImageFormat::Unknown);
        assert_eq!(ImageFormat::sniff(&[0xFF, 0xD8]), ImageFormat::Unknown);
        assert_eq!(ImageFormat::sniff(b"RIFF....WEBP"), ImageFormat::Unknown);
    }

    #[test]
    fn test_display_matches_token_name() {
        assert_eq!(ImageFormat::Jpeg.to_string(), "JPEG");
        assert_eq!(ImageFormat::Unknown.to_string(), "UNKNOWN");
    }
}
