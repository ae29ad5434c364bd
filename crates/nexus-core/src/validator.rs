//! Validador de escaneos.
//!
//! Paso 1: separar el payload en el primer espacio (sin separador →
//! `Malformed`, sin consulta). Paso 2: buscar la fila por identidad y nombre
//! exactos y clasificar. No modifica la store; el marcado es responsabilidad
//! de `AttendanceMarker`.

use log::debug;
use nexus_domain::{CodePayload, ScanOutcome};

use crate::errors::StoreError;
use crate::store::AttendeeStore;

pub struct ScanValidator<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: AttendeeStore + ?Sized> ScanValidator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn validate(&self, raw_payload: &str) -> Result<ScanOutcome, StoreError> {
        let Some(CodePayload { attendee_id, name }) = CodePayload::parse(raw_payload) else {
            debug!("validate:malformed raw={raw_payload:?}");
            return Ok(ScanOutcome::Malformed { raw: raw_payload.to_string() });
        };
        debug!("validate:start attendee_id={attendee_id}");
        let outcome = match self.store.find_attendee(&attendee_id, &name)? {
            None => ScanOutcome::NotFound { attendee_id, name },
            Some(row) if !row.has_code() => ScanOutcome::InvalidCode { attendee_id },
            Some(row) if row.attended => ScanOutcome::AlreadyAttended { attendee_id },
            Some(_) => ScanOutcome::Eligible { attendee_id },
        };
        debug!("validate:done outcome={outcome:?}");
        Ok(outcome)
    }
}
