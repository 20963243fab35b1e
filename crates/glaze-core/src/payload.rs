//! Encoded image payloads flowing through the pipeline
//!
//! A payload is an immutable encoded byte buffer plus the metadata the
//! pipeline has learned about it so far. Buffers are shared by reference
//! count so that re-delivering the latest payload to a queued job never
//! copies image data.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::format::ImageFormat;
use crate::jpeg;

/// Whether a delivered payload is a preview or the last word
///
/// Progressive sources deliver a series of intermediate payloads followed
/// by exactly one final payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Completeness {
    /// A partial render; a later payload will supersede it
    Intermediate,
    /// The last payload of the request
    Final,
}

impl Completeness {
    /// True for the last payload of the request
    pub fn is_final(self) -> bool {
        matches!(self, Completeness::Final)
    }
}

/// An encoded image and the metadata parsed from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    data: Arc<Vec<u8>>,
    format: ImageFormat,
    dimensions: Option<(u32, u32)>,
}

impl EncodedPayload {
    /// Wraps raw encoded bytes with no metadata attached yet.
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(data),
            format: ImageFormat::Unknown,
            dimensions: None,
        }
    }

    /// Wraps raw encoded bytes and parses format and dimensions from them.
    pub fn with_metadata(data: Vec<u8>) -> Self {
        let mut payload = Self::new(data);
        payload.parse_metadata();
        payload
    }

    /// The encoded bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Length of the encoded bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the buffer holds no bytes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The image format, `Unknown` until parsed or set
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Overrides the sniffed format.
    pub fn set_format(&mut self, format: ImageFormat) {
        self.format = format;
    }

    /// Frame dimensions as `(width, height)`, when known
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    /// Sniffs the format from magic bytes and, for JPEG, reads the frame
    /// dimensions from the header.
    pub fn parse_metadata(&mut self) {
        self.format = ImageFormat::sniff(&self.data);
        if self.format == ImageFormat::Unknown {
            trace!(len = self.data.len(), "payload format not recognized");
        }
        self.parse_dimensions();
    }

    /// Reads the frame dimensions without touching the format field.
    pub fn parse_dimensions(&mut self) {
        if self.format == ImageFormat::Jpeg {
            self.dimensions = jpeg::dimensions(&self.data);
        }
    }
}
