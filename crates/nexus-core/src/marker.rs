//! Marcador de asistencia: transición `false → true` exactamente una vez.
//!
//! La transición es una única actualización condicional en la store
//! (`attended = false` como precondición). Si no afectó filas, una consulta
//! de existencia sólo distingue `AlreadyMarked` de `NotFound`.

use chrono::Utc;
use log::{debug, info, warn};
use nexus_domain::MarkResult;

use crate::errors::StoreError;
use crate::store::AttendeeStore;

pub struct AttendanceMarker<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: AttendeeStore + ?Sized> AttendanceMarker<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn mark_attended(&self, attendee_id: &str) -> Result<MarkResult, StoreError> {
        debug!("mark_attended:start attendee_id={attendee_id}");
        let affected = self.store.conditional_mark_attended(attendee_id, Utc::now())?;
        if affected > 0 {
            info!("mark_attended:success attendee_id={attendee_id}");
            return Ok(MarkResult::Success);
        }
        if self.store.attendee_exists(attendee_id)? {
            warn!("mark_attended:already_marked attendee_id={attendee_id}");
            Ok(MarkResult::AlreadyMarked)
        } else {
            warn!("mark_attended:not_found attendee_id={attendee_id}");
            Ok(MarkResult::NotFound)
        }
    }
}
