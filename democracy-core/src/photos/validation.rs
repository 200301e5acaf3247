//! Magic byte checks for uploaded photos.

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// Too short to hold any recognised header
    TooSmall,
    UnrecognizedFormat,
}

/// Image formats accepted as profile photos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    WebP,
    Gif,
    Bmp,
}

impl ImageFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Bmp => "image/bmp",
        }
    }

    /// Extension the stored file is given, whatever the client sent.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::WebP => "webp",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
        }
    }
}

/// DIB header sizes of the BMP variants in use (CORE through V5).
const BMP_DIB_HEADER_SIZES: [u32; 7] = [12, 40, 52, 56, 64, 108, 124];

/// Detect the image format of `data` from its leading bytes.
pub fn detect_image_type(data: &[u8]) -> Result<ImageFormat, InvalidReason> {
    if data.len() < 4 {
        return Err(InvalidReason::TooSmall);
    }

    // JPEG: FF D8 FF
    if data[0..3] == [0xFF, 0xD8, 0xFF] {
        return Ok(ImageFormat::Jpeg);
    }

    // PNG: 89 50 4E 47 0D 0A 1A 0A
    if data.len() >= 8
        && data[0..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]
    {
        return Ok(ImageFormat::Png);
    }

    // WebP: RIFF....WEBP
    if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        return Ok(ImageFormat::WebP);
    }

    // GIF87a / GIF89a
    if data.len() >= 6 && (&data[0..6] == b"GIF87a" || &data[0..6] == b"GIF89a")
    {
        return Ok(ImageFormat::Gif);
    }

    // BMP: "BM", then a known DIB header size at offset 14
    if &data[0..2] == b"BM" && data.len() >= 18 {
        let dib_size = u32::from_le_bytes([data[14], data[15], data[16], data[17]]);
        if BMP_DIB_HEADER_SIZES.contains(&dib_size) {
            return Ok(ImageFormat::Bmp);
        }
    }

    warn!(
        "Rejected upload with unrecognized header {:02X?}",
        &data[..8.min(data.len())]
    );
    Err(InvalidReason::UnrecognizedFormat)
}
