//! nexus-codec: adaptadores de imagen para el core.
//!
//! - `QrImageCodec`: implementa `ImageCodec` delegando el render en `qrcode`
//!   y la detección/decodificación en `rqrr`, con PNG vía `image`.
//! - `DirectoryImageSink`: implementa `ImageSink` escribiendo un PNG por
//!   asistente en un directorio.

pub mod qr;
pub mod sink;

pub use qr::QrImageCodec;
pub use sink::DirectoryImageSink;
