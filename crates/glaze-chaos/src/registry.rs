//! Ready-made registries wiring the chaos transforms to their formats

use std::sync::Arc;

use glaze_core::format::ImageFormat;
use glaze_core::transform::TransformRegistry;

use crate::jpeg::{JpegChaosDecryptor, JpegChaosEncryptor};

/// Registry holding the chaos encryptor for JPEG payloads
pub fn encrypt_registry() -> TransformRegistry {
    let mut registry = TransformRegistry::new();
    registry.register(ImageFormat::Jpeg, Arc::new(JpegChaosEncryptor));
    registry
}

/// Registry holding the chaos decryptor for JPEG payloads
pub fn decrypt_registry() -> TransformRegistry {
    let mut registry = TransformRegistry::new();
    registry.register(ImageFormat::Jpeg, Arc::new(JpegChaosDecryptor));
    registry
}
