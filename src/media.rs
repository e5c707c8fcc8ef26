// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 The HieroScribe contributors

//! Media payloads supplied to analysis operations

use base64::{engine::general_purpose, Engine as _};
use image::GenericImageView;
use std::path::Path;
use tracing::debug;

use crate::{HieroError, Result};

/// Binary image payload plus its MIME type
#[derive(Debug, Clone)]
pub struct MediaPayload {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl MediaPayload {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Load a payload from disk, inferring the MIME type from the extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let mime_type = mime_for_extension(ext).ok_or_else(|| {
            HieroError::Validation(format!("Unsupported media type: {:?}", path))
        })?;

        let data = std::fs::read(path)?;
        Ok(Self::new(mime_type, data))
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Base64 encoding of the payload bytes
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.data)
    }

    /// Data URL locator for the payload
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    /// Downscale oversized images (max 1024px on the longest side) and
    /// re-encode as JPEG for transport. Falls back to the raw payload when
    /// the bytes cannot be decoded as an image.
    pub fn prepared_for_transport(&self) -> MediaPayload {
        match self.downscale() {
            Ok(prepared) => prepared,
            Err(e) => {
                debug!("Image preparation failed ({}), sending raw payload", e);
                self.clone()
            }
        }
    }

    fn downscale(&self) -> Result<MediaPayload> {
        let img = image::load_from_memory(&self.data)?;

        let img = if img.width() > 1024 || img.height() > 1024 {
            img.resize(1024, 1024, image::imageops::FilterType::Triangle)
        } else {
            img
        };

        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        img.write_to(&mut cursor, image::ImageFormat::Jpeg)?;

        Ok(MediaPayload::new("image/jpeg", buffer))
    }
}

/// MIME type for a supported image extension
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "tiff" | "tif" => Some("image/tiff"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}
