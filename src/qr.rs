use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use image::{DynamicImage, ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};

use crate::contract::TransactionRequest;
use crate::error::{Error, Result};

pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Turns a transaction request into a base64 image a wallet can scan.
pub trait QrRenderer {
    fn render_base64(&self, request: &TransactionRequest) -> Result<String>;
}

/// Renders PNG data URLs with medium error correction.
#[derive(Debug, Clone, Copy)]
pub struct PngQrRenderer {
    pub min_size: u32,
}

impl Default for PngQrRenderer {
    fn default() -> Self {
        PngQrRenderer { min_size: 256 }
    }
}

impl QrRenderer for PngQrRenderer {
    fn render_base64(&self, request: &TransactionRequest) -> Result<String> {
        let json = request.to_json()?;
        let code = QrCode::with_error_correction_level(json.as_bytes(), EcLevel::M)
            .map_err(|e| Error::Encoding(format!("qr code: {e}")))?;
        let pixels = code
            .render::<Luma<u8>>()
            .min_dimensions(self.min_size, self.min_size)
            .build();

        let mut png = Vec::new();
        DynamicImage::ImageLuma8(pixels)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| Error::Encoding(format!("png: {e}")))?;
        Ok(format!("{PNG_DATA_URL_PREFIX}{}", B64.encode(png)))
    }
}
