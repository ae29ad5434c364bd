//! nexus-core: protocolo de asistencia.
//!
//! Define las costuras con el exterior (store de asistentes, codec de
//! imágenes, sink de imágenes) y los cuatro componentes del protocolo:
//! generador de códigos, validador de escaneos, marcador de asistencia y
//! agregador de estadísticas. `Checkpoint` compone decode → validate → mark
//! para un frame de cámara.
pub mod checkpoint;
pub mod codec;
pub mod errors;
pub mod generator;
pub mod marker;
pub mod stats;
pub mod store;
pub mod validator;

pub use checkpoint::{Checkpoint, FrameReport, ScanReport};
pub use codec::{ImageCodec, ImageSink, InMemoryImageSink};
pub use errors::{CodecError, CoreError, StoreError};
pub use generator::{CodeGenerator, GenerationError, GenerationReport};
pub use marker::AttendanceMarker;
pub use stats::StatisticsAggregator;
pub use store::{AttendeeStore, InMemoryAttendeeStore};
pub use validator::ScanValidator;
