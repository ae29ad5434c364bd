//! Costuras de imagen: codec QR y destino de las imágenes generadas.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::errors::CodecError;

/// Capacidad externa de codificación/decodificación de códigos QR.
pub trait ImageCodec: Send + Sync {
    /// Renderiza el payload a bytes de imagen (PNG).
    fn encode_code(&self, payload: &str) -> Result<Vec<u8>, CodecError>;
    /// Payloads detectados en la imagen, en orden de detección (cero o más).
    fn decode_codes(&self, image: &[u8]) -> Result<Vec<String>, CodecError>;
}

/// Destino de las imágenes de código; devuelve la referencia persistida junto
/// al payload.
pub trait ImageSink: Send + Sync {
    fn store_image(&self, attendee_id: &str, image: &[u8]) -> Result<String, CodecError>;
    /// Elimina una imagen previamente guardada; una referencia inexistente no es error.
    fn discard_image(&self, image_ref: &str) -> Result<(), CodecError>;
}

/// Sink en memoria; la referencia es `mem://<attendee_id>`.
#[derive(Default)]
pub struct InMemoryImageSink {
    images: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryImageSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image_for(&self, attendee_id: &str) -> Option<Vec<u8>> {
        self.images.lock().ok()?.get(attendee_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.images.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ImageSink for InMemoryImageSink {
    fn store_image(&self, attendee_id: &str, image: &[u8]) -> Result<String, CodecError> {
        let mut images = self.images
                             .lock()
                             .map_err(|_| CodecError::Sink("in-memory sink lock poisoned".into()))?;
        images.insert(attendee_id.to_string(), image.to_vec());
        Ok(format!("mem://{attendee_id}"))
    }

    fn discard_image(&self, image_ref: &str) -> Result<(), CodecError> {
        let mut images = self.images
                             .lock()
                             .map_err(|_| CodecError::Sink("in-memory sink lock poisoned".into()))?;
        if let Some(id) = image_ref.strip_prefix("mem://") {
            images.remove(id);
        }
        Ok(())
    }
}
