use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Luma};
use log::{debug, warn};
use nexus_core::{CodecError, ImageCodec};
use qrcode::QrCode;

/// Codec QR sobre PNG en escala de grises.
#[derive(Debug, Clone, Copy)]
pub struct QrImageCodec {
    /// Lado mínimo del PNG generado, en píxeles.
    pub min_size: u32,
}

impl Default for QrImageCodec {
    fn default() -> Self {
        Self { min_size: 256 }
    }
}

impl QrImageCodec {
    pub fn new(min_size: u32) -> Self {
        Self { min_size }
    }
}

impl ImageCodec for QrImageCodec {
    fn encode_code(&self, payload: &str) -> Result<Vec<u8>, CodecError> {
        let code = QrCode::new(payload.as_bytes()).map_err(|e| CodecError::Render(format!("qr encode: {e}")))?;
        let img = code.render::<Luma<u8>>()
                      .min_dimensions(self.min_size, self.min_size)
                      .build();
        let mut png = Vec::new();
        DynamicImage::ImageLuma8(img).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
                                     .map_err(|e| CodecError::Render(format!("png encode: {e}")))?;
        debug!("encode_code bytes={}", png.len());
        Ok(png)
    }

    fn decode_codes(&self, image: &[u8]) -> Result<Vec<String>, CodecError> {
        let gray = image::load_from_memory(image).map_err(|e| CodecError::Decode(format!("image load: {e}")))?
                                                 .to_luma8();
        let (width, height) = gray.dimensions();
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
            gray.get_pixel(x as u32, y as u32).0[0]
        });
        let mut payloads = Vec::new();
        for grid in prepared.detect_grids() {
            // Una grilla ilegible (código cortado, desenfocado) no es un payload.
            match grid.decode() {
                Ok((_, content)) => payloads.push(content),
                Err(e) => warn!("decode_codes:skip_grid err={e:?}"),
            }
        }
        debug!("decode_codes found={}", payloads.len());
        Ok(payloads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImage, GrayImage};

    #[test]
    fn encode_then_decode_returns_exact_payload() {
        let codec = QrImageCodec::default();
        let png = codec.encode_code("A1 Jane Doe").unwrap();
        assert_eq!(codec.decode_codes(&png).unwrap(), vec!["A1 Jane Doe".to_string()]);
    }

    #[test]
    fn encoded_image_is_png_of_requested_size() {
        let png = QrImageCodec::new(300).encode_code("B2 John").unwrap();
        let img = image::load_from_memory_with_format(&png, ImageFormat::Png).unwrap();
        assert!(img.width() >= 300 && img.height() >= 300);
    }

    #[test]
    fn blank_frame_has_no_codes() {
        let blank = GrayImage::from_pixel(200, 200, Luma([255u8]));
        let mut png = Vec::new();
        DynamicImage::ImageLuma8(blank).write_to(&mut Cursor::new(&mut png), ImageFormat::Png).unwrap();
        assert!(QrImageCodec::default().decode_codes(&png).unwrap().is_empty());
    }

    #[test]
    fn frame_with_two_codes_yields_both() {
        let codec = QrImageCodec::default();
        let a = image::load_from_memory(&codec.encode_code("A1 Jane Doe").unwrap()).unwrap().to_luma8();
        let b = image::load_from_memory(&codec.encode_code("B2 John Roe").unwrap()).unwrap().to_luma8();
        let mut canvas = GrayImage::from_pixel(a.width() + b.width() + 40, a.height().max(b.height()) + 40, Luma([255u8]));
        canvas.copy_from(&a, 10, 20).unwrap();
        canvas.copy_from(&b, a.width() + 30, 20).unwrap();
        let mut png = Vec::new();
        DynamicImage::ImageLuma8(canvas).write_to(&mut Cursor::new(&mut png), ImageFormat::Png).unwrap();

        let mut found = codec.decode_codes(&png).unwrap();
        found.sort();
        assert_eq!(found, vec!["A1 Jane Doe".to_string(), "B2 John Roe".to_string()]);
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let err = QrImageCodec::default().decode_codes(b"not an image").unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }
}
