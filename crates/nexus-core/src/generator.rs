//! Generador de códigos.
//!
//! Para cada asistente sin payload construye `"<attendee_id> <name>"`, lo
//! renderiza a imagen y persiste payload + referencia de imagen. Es
//! idempotente: los asistentes con código se saltan y una segunda pasada
//! reporta 0.
//!
//! Política de fallos:
//! - Render o sink fallidos para un asistente: se registra, se cuenta como
//!   fallo y el lote continúa.
//! - Payload ya tomado (unique) o fila completada concurrentemente: fallo
//!   del asistente, el lote continúa.
//! - Store inalcanzable: aborta el lote con `GenerationError`. Cada
//!   asistente se confirma por separado, así que los códigos guardados antes
//!   del fallo permanecen; el error lleva el reporte parcial con su conteo.
//!
//! La imagen se escribe en el sink antes de fijar el payload. Si el payload
//! ya pertenece a otra fila la imagen se descarta. Si la fila se completó
//! concurrentemente o la store cae, la imagen se conserva (puede ser la del
//! ganador o un commit no confirmado) y su referencia queda en el log
//! (`orphan_image=`).

use std::fmt;

use log::{debug, error, info, warn};
use nexus_domain::{Attendee, CodePayload};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::codec::{ImageCodec, ImageSink};
use crate::errors::StoreError;
use crate::store::AttendeeStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    /// Códigos creados en esta pasada.
    pub generated: usize,
    pub failed: usize,
    /// Asistentes que ya tenían código.
    pub skipped: usize,
}

impl fmt::Display for GenerationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generated > 0 {
            write!(f, "{} new QR codes generated and stored successfully!", self.generated)?;
            if self.failed > 0 {
                write!(f, " ({} could not be generated)", self.failed)?;
            }
            Ok(())
        } else if self.failed > 0 {
            write!(f, "QR codes could not be generated.")
        } else {
            write!(f, "No new QR codes generated. QR codes already exist for all attendees.")
        }
    }
}

/// Lote abortado por la store. `report` cuenta lo ya confirmado.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{source} ({} codes stored before failure)", .report.generated)]
pub struct GenerationError {
    pub report: GenerationReport,
    #[source]
    pub source: StoreError,
}

pub struct CodeGenerator<'a, S: ?Sized, C: ?Sized, K: ?Sized> {
    store: &'a S,
    codec: &'a C,
    sink: &'a K,
}

impl<'a, S, C, K> CodeGenerator<'a, S, C, K>
    where S: AttendeeStore + ?Sized,
          C: ImageCodec + ?Sized,
          K: ImageSink + ?Sized
{
    pub fn new(store: &'a S, codec: &'a C, sink: &'a K) -> Self {
        Self { store, codec, sink }
    }

    /// Genera los códigos faltantes. `report.generated` es el conteo de
    /// códigos nuevos.
    pub fn generate_missing_codes(&self) -> Result<GenerationReport, GenerationError> {
        debug!("generate_missing_codes:start");
        let attendees = self.store
                            .list_all_attendees()
                            .map_err(|source| GenerationError { report: GenerationReport::default(),
                                                                source })?;
        let (pending, existing): (Vec<Attendee>, Vec<Attendee>) = attendees.into_iter().partition(|a| !a.has_code());
        let mut report = GenerationReport { skipped: existing.len(),
                                            ..Default::default() };

        // El render es CPU puro; se paraleliza y se conserva el orden para
        // persistir secuencialmente.
        let codec = self.codec;
        let rendered: Vec<_> = pending.par_iter()
                                      .map(|a| {
                                          let payload = CodePayload::for_attendee(a).to_string();
                                          let image = codec.encode_code(&payload);
                                          (a, payload, image)
                                      })
                                      .collect();

        for (attendee, payload, image) in rendered {
            let id = attendee.attendee_id.as_str();
            let image = match image {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("generate:render_failed attendee_id={id} err={e}");
                    report.failed += 1;
                    continue;
                }
            };
            let image_ref = match self.sink.store_image(id, &image) {
                Ok(r) => r,
                Err(e) => {
                    warn!("generate:sink_failed attendee_id={id} err={e}");
                    report.failed += 1;
                    continue;
                }
            };
            match self.store.set_code_payload(id, &payload, Some(&image_ref)) {
                Ok(true) => {
                    debug!("generate:stored attendee_id={id} image_ref={image_ref}");
                    report.generated += 1;
                }
                Ok(false) => {
                    warn!("generate:not_applied attendee_id={id} orphan_image={image_ref} (code set concurrently or row missing)");
                    report.failed += 1;
                }
                Err(StoreError::UniqueViolation(msg)) => {
                    warn!("generate:payload_taken attendee_id={id} err={msg}");
                    report.failed += 1;
                    if let Err(e) = self.sink.discard_image(&image_ref) {
                        warn!("generate:discard_failed attendee_id={id} orphan_image={image_ref} err={e}");
                    }
                }
                Err(source) => {
                    error!("generate_missing_codes:aborted attendee_id={id} orphan_image={image_ref} stored={} err={source}",
                           report.generated);
                    return Err(GenerationError { report, source });
                }
            }
        }
        info!("generate_missing_codes:done generated={} failed={} skipped={}",
              report.generated,
              report.failed,
              report.skipped);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::InMemoryImageSink;
    use crate::errors::CodecError;
    use crate::store::InMemoryAttendeeStore;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Codec trivial: la "imagen" es el texto en bytes; falla con payloads
    /// que contienen `!`.
    struct TextCodec;
    impl ImageCodec for TextCodec {
        fn encode_code(&self, payload: &str) -> Result<Vec<u8>, CodecError> {
            if payload.contains('!') {
                return Err(CodecError::Render(format!("cannot render {payload:?}")));
            }
            Ok(payload.as_bytes().to_vec())
        }
        fn decode_codes(&self, image: &[u8]) -> Result<Vec<String>, CodecError> {
            Ok(vec![String::from_utf8_lossy(image).into_owned()])
        }
    }

    fn attendee(id: &str, name: &str) -> Attendee {
        Attendee::new(id, name).unwrap()
    }

    #[test]
    fn fills_missing_payloads_and_is_idempotent() {
        let mut coded = attendee("C3", "Pre Coded");
        coded.code_payload = Some("C3 Pre Coded".into());
        let store = InMemoryAttendeeStore::with_attendees([attendee("A1", "Jane Doe"), attendee("B2", "John Roe"), coded]);
        let sink = InMemoryImageSink::new();
        let gen = CodeGenerator::new(&store, &TextCodec, &sink);

        let first = gen.generate_missing_codes().unwrap();
        assert_eq!(first, GenerationReport { generated: 2, failed: 0, skipped: 1 });
        assert_eq!(store.get("A1").unwrap().code_payload.as_deref(), Some("A1 Jane Doe"));
        assert_eq!(store.get("B2").unwrap().code_image_ref.as_deref(), Some("mem://B2"));
        assert_eq!(sink.image_for("A1").unwrap(), b"A1 Jane Doe".to_vec());

        let before = store.list_all_attendees().unwrap();
        let second = gen.generate_missing_codes().unwrap();
        assert_eq!(second.generated, 0);
        assert_eq!(second.skipped, 3);
        assert_eq!(store.list_all_attendees().unwrap(), before);
        assert_eq!(second.to_string(), "No new QR codes generated. QR codes already exist for all attendees.");
    }

    #[test]
    fn render_failure_skips_only_that_attendee() {
        let store = InMemoryAttendeeStore::with_attendees([attendee("A1", "Bad!Name"), attendee("B2", "Good Name")]);
        let sink = InMemoryImageSink::new();
        let report = CodeGenerator::new(&store, &TextCodec, &sink).generate_missing_codes().unwrap();
        assert_eq!(report, GenerationReport { generated: 1, failed: 1, skipped: 0 });
        assert!(store.get("A1").unwrap().code_payload.is_none());
        assert!(store.get("B2").unwrap().has_code());
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn colliding_payload_is_counted_as_failure_and_image_discarded() {
        // B2 ya tiene el texto que A1 generaría.
        let mut squatter = attendee("B2", "X");
        squatter.code_payload = Some("A1 Jane".into());
        let store = InMemoryAttendeeStore::with_attendees([attendee("A1", "Jane"), squatter]);
        let sink = InMemoryImageSink::new();
        let report = CodeGenerator::new(&store, &TextCodec, &sink).generate_missing_codes().unwrap();
        assert_eq!(report, GenerationReport { generated: 0, failed: 1, skipped: 1 });
        assert_eq!(report.to_string(), "QR codes could not be generated.");
        assert!(sink.is_empty());
    }

    #[test]
    fn unreachable_store_aborts_batch() {
        let store = InMemoryAttendeeStore::with_attendees([attendee("A1", "Jane")]);
        store.set_offline(true);
        let sink = InMemoryImageSink::new();
        let err = CodeGenerator::new(&store, &TextCodec, &sink).generate_missing_codes().unwrap_err();
        assert!(err.source.is_transient());
        assert_eq!(err.report, GenerationReport::default());
        assert!(sink.is_empty());
    }

    /// Store que corta la conexión a partir de la escritura número `fail_at`.
    struct DroppingStore {
        inner: InMemoryAttendeeStore,
        writes: AtomicUsize,
        fail_at: usize,
    }

    impl AttendeeStore for DroppingStore {
        fn find_attendee(&self, attendee_id: &str, name: &str) -> Result<Option<Attendee>, StoreError> {
            self.inner.find_attendee(attendee_id, name)
        }
        fn attendee_exists(&self, attendee_id: &str) -> Result<bool, StoreError> {
            self.inner.attendee_exists(attendee_id)
        }
        fn conditional_mark_attended(&self, attendee_id: &str, at: DateTime<Utc>) -> Result<usize, StoreError> {
            self.inner.conditional_mark_attended(attendee_id, at)
        }
        fn list_all_attendees(&self) -> Result<Vec<Attendee>, StoreError> {
            self.inner.list_all_attendees()
        }
        fn set_code_payload(&self, attendee_id: &str, payload: &str, image_ref: Option<&str>) -> Result<bool, StoreError> {
            if self.writes.fetch_add(1, Ordering::SeqCst) + 1 >= self.fail_at {
                return Err(StoreError::Connection("dropped".into()));
            }
            self.inner.set_code_payload(attendee_id, payload, image_ref)
        }
        fn register_attendee(&self, attendee: &Attendee) -> Result<(), StoreError> {
            self.inner.register_attendee(attendee)
        }
    }

    #[test]
    fn aborted_batch_reports_codes_already_stored() {
        let store = DroppingStore { inner: InMemoryAttendeeStore::with_attendees([attendee("A1", "Ana"),
                                                                                  attendee("B2", "Bea"),
                                                                                  attendee("C3", "Cid"),
                                                                                  attendee("D4", "Dan")]),
                                    writes: AtomicUsize::new(0),
                                    fail_at: 3 };
        let sink = InMemoryImageSink::new();
        let err = CodeGenerator::new(&store, &TextCodec, &sink).generate_missing_codes().unwrap_err();

        assert_eq!(err.source, StoreError::Connection("dropped".into()));
        assert_eq!(err.report, GenerationReport { generated: 2, failed: 0, skipped: 0 });
        assert!(err.to_string().contains("2 codes stored before failure"));
        let committed = store.inner.list_all_attendees().unwrap().iter().filter(|a| a.has_code()).count();
        assert_eq!(committed, 2);
        assert!(store.inner.get("D4").unwrap().code_payload.is_none());
    }

    #[test]
    fn report_message_mentions_count() {
        let r = GenerationReport { generated: 3, failed: 0, skipped: 0 };
        assert_eq!(r.to_string(), "3 new QR codes generated and stored successfully!");
    }
}
