//! Punto de control de entrada: frame de cámara → decode → validate → mark.
//!
//! Cada payload detectado se procesa de forma independiente y en orden de
//! detección. Un mismo código repetido en el frame se procesa dos veces; el
//! marcador condicional garantiza que sólo uno de ellos marque.

use std::fmt;

use log::{debug, error};
use nexus_domain::{MarkResult, ScanOutcome};
use serde::Serialize;

use crate::codec::ImageCodec;
use crate::errors::{CoreError, StoreError};
use crate::marker::AttendanceMarker;
use crate::store::AttendeeStore;
use crate::validator::ScanValidator;

/// Resultado de procesar un payload: clasificación y, si fue elegible, el
/// resultado del marcado.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub payload: String,
    pub outcome: ScanOutcome,
    pub mark: Option<MarkResult>,
}

impl ScanReport {
    /// `true` si este escaneo registró la asistencia.
    pub fn admitted(&self) -> bool {
        self.mark == Some(MarkResult::Success)
    }

    /// Mensaje para el operador de la entrada.
    pub fn message(&self) -> String {
        match (&self.outcome, self.mark) {
            (ScanOutcome::Eligible { attendee_id }, Some(MarkResult::Success)) => {
                format!("QR code scanned successfully. Attendee marked as attended. Attendee ID: {attendee_id}")
            }
            // Otro escaneo ganó la carrera entre validar y marcar.
            (ScanOutcome::Eligible { attendee_id }, Some(MarkResult::AlreadyMarked)) => {
                ScanOutcome::AlreadyAttended { attendee_id: attendee_id.clone() }.to_string()
            }
            (ScanOutcome::Eligible { attendee_id }, Some(MarkResult::NotFound)) => {
                ScanOutcome::NotFound { attendee_id: attendee_id.clone(),
                                        name: String::new() }.to_string()
            }
            (outcome, _) => outcome.to_string(),
        }
    }
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // El texto crudo sólo se muestra cuando tiene formato válido.
        if !matches!(self.outcome, ScanOutcome::Malformed { .. }) {
            writeln!(f, "QR Code Data: {}", self.payload)?;
        }
        write!(f, "{}", self.message())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FrameReport {
    pub scans: Vec<ScanReport>,
}

impl FrameReport {
    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }

    pub fn admitted(&self) -> usize {
        self.scans.iter().filter(|s| s.admitted()).count()
    }
}

impl fmt::Display for FrameReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scans.is_empty() {
            return write!(f, "No QR code detected in the image. Please try again.");
        }
        for (i, scan) in self.scans.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{scan}")?;
        }
        Ok(())
    }
}

pub struct Checkpoint<'a, S: ?Sized, C: ?Sized> {
    store: &'a S,
    codec: &'a C,
}

impl<'a, S, C> Checkpoint<'a, S, C>
    where S: AttendeeStore + ?Sized,
          C: ImageCodec + ?Sized
{
    pub fn new(store: &'a S, codec: &'a C) -> Self {
        Self { store, codec }
    }

    /// Valida un payload y, si es elegible, marca la asistencia.
    pub fn process_payload(&self, raw_payload: &str) -> Result<ScanReport, StoreError> {
        let outcome = ScanValidator::new(self.store).validate(raw_payload)?;
        self.settle(raw_payload.to_string(), outcome)
    }

    /// Procesa todos los códigos detectados en un frame, en orden de
    /// detección. Un fallo de la store aborta el frame; los marcados ya
    /// confirmados permanecen.
    pub fn process_frame(&self, image: &[u8]) -> Result<FrameReport, CoreError> {
        let payloads = self.codec.decode_codes(image)?;
        debug!("process_frame:decoded count={}", payloads.len());
        let mut report = FrameReport::default();
        for payload in payloads {
            let scan = self.process_payload(&payload).map_err(|e| {
                                                         error!("process_frame:store_error err={e}");
                                                         e
                                                     })?;
            report.scans.push(scan);
        }
        Ok(report)
    }

    /// Marca sólo los escaneos elegibles; el marcador condicional decide si
    /// este escaneo fue el que registró la entrada.
    fn settle(&self, payload: String, outcome: ScanOutcome) -> Result<ScanReport, StoreError> {
        let mark = match outcome.attendee_id() {
            Some(attendee_id) if outcome.is_eligible() => Some(AttendanceMarker::new(self.store).mark_attended(attendee_id)?),
            _ => None,
        };
        Ok(ScanReport { payload,
                        outcome,
                        mark })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CodecError;
    use crate::store::InMemoryAttendeeStore;
    use nexus_domain::Attendee;

    /// Frame simulado: payloads separados por salto de línea.
    struct LinesCodec;
    impl ImageCodec for LinesCodec {
        fn encode_code(&self, payload: &str) -> Result<Vec<u8>, CodecError> {
            Ok(payload.as_bytes().to_vec())
        }
        fn decode_codes(&self, image: &[u8]) -> Result<Vec<String>, CodecError> {
            let text = std::str::from_utf8(image).map_err(|e| CodecError::Decode(e.to_string()))?;
            Ok(text.lines().map(str::to_string).collect())
        }
    }

    fn store() -> InMemoryAttendeeStore {
        let mut a = Attendee::new("A1", "Jane Doe").unwrap();
        a.code_payload = Some("A1 Jane Doe".into());
        InMemoryAttendeeStore::with_attendees([a])
    }

    #[test]
    fn duplicate_code_in_frame_admits_once() {
        let s = store();
        let report = Checkpoint::new(&s, &LinesCodec).process_frame(b"A1 Jane Doe\nA1 Jane Doe").unwrap();
        assert_eq!(report.scans.len(), 2);
        assert_eq!(report.admitted(), 1);
        assert_eq!(report.scans[0].mark, Some(MarkResult::Success));
        assert_eq!(report.scans[1].outcome, ScanOutcome::AlreadyAttended { attendee_id: "A1".into() });
        assert_eq!(report.scans[1].mark, None);
    }

    #[test]
    fn ineligible_scans_leave_rows_untouched() {
        let uncoded = Attendee::new("B2", "Bob Roe").unwrap();
        let coded = store().get("A1").unwrap();
        let s = InMemoryAttendeeStore::with_attendees([coded, uncoded]);
        let report = Checkpoint::new(&s, &LinesCodec).process_frame(b"B2 Bob Roe
Z9 Nobody").unwrap();
        assert_eq!(report.scans[0].outcome, ScanOutcome::InvalidCode { attendee_id: "B2".into() });
        assert_eq!(report.scans[1].outcome.attendee_id(), Some("Z9"));
        assert!(report.scans.iter().all(|scan| scan.mark.is_none()));
        assert!(!s.get("B2").unwrap().attended);
        assert_eq!(report.admitted(), 0);
    }

    #[test]
    fn empty_frame_renders_hint() {
        let s = store();
        let report = Checkpoint::new(&s, &LinesCodec).process_frame(b"").unwrap();
        assert!(report.is_empty());
        assert_eq!(report.to_string(), "No QR code detected in the image. Please try again.");
    }

    #[test]
    fn report_text_follows_detection_order() {
        let s = store();
        let report = Checkpoint::new(&s, &LinesCodec).process_frame(b"garbage\nA1 Jane Doe").unwrap();
        let text = report.to_string();
        assert_eq!(text,
                   "Invalid QR code\nQR Code Data: A1 Jane Doe\nQR code scanned successfully. Attendee marked as attended. Attendee ID: A1");
    }

    #[test]
    fn lost_race_reads_as_already_marked() {
        let r = ScanReport { payload: "A1 Jane Doe".into(),
                             outcome: ScanOutcome::Eligible { attendee_id: "A1".into() },
                             mark: Some(MarkResult::AlreadyMarked) };
        assert!(!r.admitted());
        assert_eq!(r.message(), "Attendance already marked for Attendee ID: A1");
    }

    #[test]
    fn decode_and_store_failures_propagate() {
        let s = store();
        let cp = Checkpoint::new(&s, &LinesCodec);
        assert!(matches!(cp.process_frame(&[0xff, 0xfe]), Err(CoreError::Codec(CodecError::Decode(_)))));
        s.set_offline(true);
        assert!(matches!(cp.process_frame(b"A1 Jane Doe"), Err(CoreError::Store(StoreError::Connection(_)))));
    }
}
