//! Chaos scrambling of JPEG entropy-coded data
//!
//! The frame header and trailer are copied through untouched so the output
//! still sniffs as a JPEG and reports its dimensions. Only the
//! entropy-coded region between the SOS header and the closing EOI is
//! rewritten: full 64-byte blocks are shuffled by a key-derived
//! permutation and the whole region is masked with a key-derived
//! keystream. The few bytes of a trailing partial block keep their
//! position and are masked only.

use tracing::{debug, warn};

use glaze_core::errors::{GlazeError, Result};
use glaze_core::format::ImageFormat;
use glaze_core::jpeg;
use glaze_core::key::ChaosKey;
use glaze_core::payload::EncodedPayload;
use glaze_core::transform::{Transform, TransformStatus};

use crate::logistic::LogisticMap;

/// Shuffle granularity within the entropy-coded region
pub const BLOCK_LEN: usize = 64;

/// Scrambles JPEG payloads under a chaos key
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegChaosEncryptor;

/// Restores JPEG payloads scrambled by [`JpegChaosEncryptor`]
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegChaosDecryptor;

impl Transform for JpegChaosEncryptor {
    fn can_handle(&self, format: ImageFormat) -> bool {
        format == ImageFormat::Jpeg
    }

    fn identifier(&self) -> &'static str {
        "JpegChaosEncryptor"
    }

    fn transform(
        &self,
        input: &EncodedPayload,
        output: &mut Vec<u8>,
        key: Option<&ChaosKey>,
    ) -> Result<TransformStatus> {
        let Some(key) = key else {
            warn!("encrypt requested without a key");
            return Err(GlazeError::invalid_key(
                "no encryption key attached to the request",
            ));
        };
        let Some((header, region, trailer)) = split_frame(input) else {
            debug!(len = input.len(), "no entropy-coded region to scramble");
            return Ok(TransformStatus::Failure);
        };
        let (permutation, stream) = derive(key, region.len())?;

        output.clear();
        output.reserve(input.len());
        output.extend_from_slice(header);
        let region_at = output.len();
        for &source in &permutation {
            output.extend_from_slice(&region[source * BLOCK_LEN..(source + 1) * BLOCK_LEN]);
        }
        output.extend_from_slice(&region[permutation.len() * BLOCK_LEN..]);
        for (byte, mask) in output[region_at..].iter_mut().zip(&stream) {
            *byte ^= mask;
        }
        output.extend_from_slice(trailer);
        Ok(TransformStatus::Success)
    }
}

impl Transform for JpegChaosDecryptor {
    fn can_handle(&self, format: ImageFormat) -> bool {
        format == ImageFormat::Jpeg
    }

    fn identifier(&self) -> &'static str {
        "JpegChaosDecryptor"
    }

    fn transform(
        &self,
        input: &EncodedPayload,
        output: &mut Vec<u8>,
        key: Option<&ChaosKey>,
    ) -> Result<TransformStatus> {
        let Some(key) = key else {
            warn!("decrypt requested without a key");
            return Err(GlazeError::invalid_key(
                "no decryption key attached to the request",
            ));
        };
        let Some((header, region, trailer)) = split_frame(input) else {
            debug!(len = input.len(), "no entropy-coded region to restore");
            return Ok(TransformStatus::Failure);
        };
        let (permutation, stream) = derive(key, region.len())?;

        // unmask first, then send each shuffled block back home
        let unmasked: Vec<u8> = region
            .iter()
            .zip(&stream)
            .map(|(byte, mask)| byte ^ mask)
            .collect();
        let mut plain = vec![0u8; region.len()];
        for (slot, &home) in permutation.iter().enumerate() {
            plain[home * BLOCK_LEN..(home + 1) * BLOCK_LEN]
                .copy_from_slice(&unmasked[slot * BLOCK_LEN..(slot + 1) * BLOCK_LEN]);
        }
        let tail = permutation.len() * BLOCK_LEN;
        plain[tail..].copy_from_slice(&unmasked[tail..]);

        output.clear();
        output.reserve(input.len());
        output.extend_from_slice(header);
        output.extend_from_slice(&plain);
        output.extend_from_slice(trailer);
        Ok(TransformStatus::Success)
    }
}

/// Derives the block permutation and byte keystream for a region.
///
/// Both sides must draw from the map in the same order, permutation before
/// keystream, or the streams will not line up.
fn derive(key: &ChaosKey, region_len: usize) -> Result<(Vec<usize>, Vec<u8>)> {
    let mut map = LogisticMap::from_key(key)?;
    let permutation = map.permutation(region_len / BLOCK_LEN);
    let stream = map.keystream(region_len);
    Ok((permutation, stream))
}

/// Splits a JPEG into header, entropy-coded region, and trailer.
fn split_frame(input: &EncodedPayload) -> Option<(&[u8], &[u8], &[u8])> {
    let bounds = jpeg::scan_bounds(input.data())?;
    let bytes = input.data();
    Some((
        &bytes[..bounds.scan_start],
        &bytes[bounds.scan_start..bounds.scan_end],
        &bytes[bounds.scan_end..],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_jpeg(scan_len: usize) -> Vec<u8> {
        // scan bytes stay below 0xFF so the only EOI pair is the real one
        let scan: Vec<u8> = (0..scan_len).map(|i| ((i * 7 + 13) % 251) as u8).collect();
        let mut bytes = vec![0xFF, 0xD8];
        // SOF0, 64x48, single component
        bytes.extend([
            0xFF, 0xC0, 0x00, 0x0B, 0x08, 0x00, 0x30, 0x00, 0x40, 0x01, 0x01, 0x11, 0x00,
        ]);
        // SOS, single component
        bytes.extend([0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00]);
        bytes.extend(&scan);
        bytes.extend([0xFF, 0xD9]);
        bytes
    }

    fn key() -> ChaosKey {
        ChaosKey::test_key()
    }

    #[test]
    fn test_encrypt_then_decrypt_round_trips() {
        let original = sample_jpeg(1000);
        let payload = EncodedPayload::with_metadata(original.clone());

        let mut scrambled = Vec::new();
        let status = JpegChaosEncryptor
            .transform(&payload, &mut scrambled, Some(&key()))
            .unwrap();
        assert!(status.is_success());
        assert_ne!(scrambled, original);
        assert_eq!(scrambled.len(), original.len());

        let mut restored = Vec::new();
        let status = JpegChaosDecryptor
            .transform(
                &EncodedPayload::with_metadata(scrambled),
                &mut restored,
                Some(&key()),
            )
            .unwrap();
        assert!(status.is_success());
        assert_eq!(restored, original);
    }

    #[test]
    fn test_scrambled_output_still_reads_as_jpeg() {
        let payload = EncodedPayload::with_metadata(sample_jpeg(520));
        let mut scrambled = Vec::new();
        JpegChaosEncryptor
            .transform(&payload, &mut scrambled, Some(&key()))
            .unwrap();

        assert_eq!(ImageFormat::sniff(&scrambled), ImageFormat::Jpeg);
        assert_eq!(jpeg::dimensions(&scrambled), Some((64, 48)));
        let bounds = jpeg::scan_bounds(payload.data()).unwrap();
        assert_eq!(&scrambled[..bounds.scan_start], &payload.data()[..bounds.scan_start]);
    }

    #[test]
    fn test_short_region_is_masked_without_shuffling() {
        // fewer bytes than one block leaves nothing to permute
        let original = sample_jpeg(17);
        let payload = EncodedPayload::with_metadata(original.clone());
        let mut scrambled = Vec::new();
        JpegChaosEncryptor
            .transform(&payload, &mut scrambled, Some(&key()))
            .unwrap();
        assert_ne!(scrambled, original);

        let mut restored = Vec::new();
        JpegChaosDecryptor
            .transform(
                &EncodedPayload::with_metadata(scrambled),
                &mut restored,
                Some(&key()),
            )
            .unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_missing_key_is_an_error() {
        let payload = EncodedPayload::with_metadata(sample_jpeg(128));
        let mut output = Vec::new();
        let err = JpegChaosEncryptor
            .transform(&payload, &mut output, None)
            .unwrap_err();
        assert!(matches!(err, GlazeError::InvalidKey { .. }));

        let err = JpegChaosDecryptor
            .transform(&payload, &mut output, None)
            .unwrap_err();
        assert!(matches!(err, GlazeError::InvalidKey { .. }));
    }

    #[test]
    fn test_unparseable_key_is_an_error() {
        let bad = ChaosKey::build("half", "almost four").unwrap();
        let payload = EncodedPayload::with_metadata(sample_jpeg(128));
        let mut output = Vec::new();
        let err = JpegChaosEncryptor
            .transform(&payload, &mut output, Some(&bad))
            .unwrap_err();
        assert!(matches!(err, GlazeError::InvalidKey { .. }));
    }

    #[test]
    fn test_payload_without_scan_fails_without_error() {
        let payload = EncodedPayload::with_metadata(b"not a jpeg at all".to_vec());
        let mut output = Vec::new();
        let status = JpegChaosEncryptor
            .transform(&payload, &mut output, Some(&key()))
            .unwrap();
        assert_eq!(status, TransformStatus::Failure);
    }

    #[test]
    fn test_wrong_key_does_not_restore() {
        let original = sample_jpeg(640);
        let mut scrambled = Vec::new();
        JpegChaosEncryptor
            .transform(
                &EncodedPayload::with_metadata(original.clone()),
                &mut scrambled,
                Some(&key()),
            )
            .unwrap();

        let other = ChaosKey::build("0.71e0", "3.93e0").unwrap();
        let mut restored = Vec::new();
        JpegChaosDecryptor
            .transform(
                &EncodedPayload::with_metadata(scrambled),
                &mut restored,
                Some(&other),
            )
            .unwrap();
        assert_ne!(restored, original);
    }
}
