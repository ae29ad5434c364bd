//! NexusPass
//!
//! Librería de fachada del control de asistencia:
//! - `domain`: asistentes, payloads, resultados de escaneo y estadísticas.
//! - `protocol`: protocolo (generar, validar, marcar, agregar) y store en memoria.
//! - `codec`: codec QR y sink de imágenes en disco.
//! - `persistence`: store Postgres y configuración de conexión.
//!
//! El binario `nexuspass` vive en `crates/nexus-cli`.

pub use nexus_codec as codec;
pub use nexus_core as protocol;
pub use nexus_domain as domain;
pub use nexus_persistence as persistence;

pub use nexus_core::{AttendanceMarker, AttendeeStore, Checkpoint, CodeGenerator, ScanValidator, StatisticsAggregator};
pub use nexus_domain::{AttendanceStats, Attendee, MarkResult, ScanOutcome};
