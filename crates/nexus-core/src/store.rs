use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use nexus_domain::{AttendanceStats, Attendee};

use crate::errors::StoreError;

/// Tabla persistente de asistentes (colaborador externo).
///
/// Contrato:
/// - Las búsquedas reciben identidad y nombre como parámetros; nunca se
///   interpolan en texto de consulta.
/// - `conditional_mark_attended` y `set_code_payload` son actualizaciones
///   condicionales atómicas: el chequeo del estado actual y la escritura
///   ocurren en la misma operación de la store.
/// - Cada llamada adquiere y libera su propia conexión/sesión.
pub trait AttendeeStore: Send + Sync {
    /// Fila con `attendee_id` Y `name` exactos (sensible a mayúsculas).
    fn find_attendee(&self, attendee_id: &str, name: &str) -> Result<Option<Attendee>, StoreError>;

    fn attendee_exists(&self, attendee_id: &str) -> Result<bool, StoreError>;

    /// `attended = true` sólo si actualmente es `false`. Devuelve filas afectadas (0 o 1).
    fn conditional_mark_attended(&self, attendee_id: &str, at: DateTime<Utc>) -> Result<usize, StoreError>;

    /// Todas las filas, ordenadas por `attendee_id`.
    fn list_all_attendees(&self) -> Result<Vec<Attendee>, StoreError>;

    /// Fija payload (y referencia de imagen) sólo si la fila aún no tiene
    /// payload. `Ok(false)` si la fila no existe o ya tenía código; un payload
    /// repetido en otra fila es `StoreError::UniqueViolation`.
    fn set_code_payload(&self, attendee_id: &str, payload: &str, image_ref: Option<&str>) -> Result<bool, StoreError>;

    /// Inserta un asistente nuevo; un id repetido es `StoreError::UniqueViolation`.
    fn register_attendee(&self, attendee: &Attendee) -> Result<(), StoreError>;

    /// Conteos de asistencia. Las implementaciones con lecturas snapshot deben
    /// sobrescribirlo para tomar ambos conteos en una sola lectura.
    fn attendance_counts(&self) -> Result<AttendanceStats, StoreError> {
        let rows = self.list_all_attendees()?;
        Ok(AttendanceStats::from_flags(rows.iter().map(|a| a.attended)))
    }
}

/// Store en memoria: un único mutex protege todas las filas, así cada
/// operación (incluido el conteo) ve un estado consistente.
#[derive(Default)]
pub struct InMemoryAttendeeStore {
    inner: Mutex<BTreeMap<String, Attendee>>,
    offline: AtomicBool,
}

impl InMemoryAttendeeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Carga filas tal cual (incluye payload/attended), sin validaciones.
    pub fn with_attendees<I>(attendees: I) -> Self
        where I: IntoIterator<Item = Attendee>
    {
        let map = attendees.into_iter().map(|a| (a.attendee_id.clone(), a)).collect();
        Self { inner: Mutex::new(map),
               offline: AtomicBool::new(false) }
    }

    /// Copia de la fila por id.
    pub fn get(&self, attendee_id: &str) -> Option<Attendee> {
        self.inner.lock().ok()?.get(attendee_id).cloned()
    }

    /// Simula una store inalcanzable: toda llamada devuelve `StoreError::Connection`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn rows(&self) -> Result<MutexGuard<'_, BTreeMap<String, Attendee>>, StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("in-memory store offline".into()));
        }
        self.inner.lock().map_err(|_| StoreError::Query("in-memory store lock poisoned".into()))
    }
}

impl AttendeeStore for InMemoryAttendeeStore {
    fn find_attendee(&self, attendee_id: &str, name: &str) -> Result<Option<Attendee>, StoreError> {
        let rows = self.rows()?;
        Ok(rows.get(attendee_id).filter(|a| a.name == name).cloned())
    }

    fn attendee_exists(&self, attendee_id: &str) -> Result<bool, StoreError> {
        Ok(self.rows()?.contains_key(attendee_id))
    }

    fn conditional_mark_attended(&self, attendee_id: &str, at: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut rows = self.rows()?;
        match rows.get_mut(attendee_id) {
            Some(a) if !a.attended => {
                a.attended = true;
                a.attended_at = Some(at);
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    fn list_all_attendees(&self) -> Result<Vec<Attendee>, StoreError> {
        Ok(self.rows()?.values().cloned().collect())
    }

    fn set_code_payload(&self, attendee_id: &str, payload: &str, image_ref: Option<&str>) -> Result<bool, StoreError> {
        let mut rows = self.rows()?;
        let taken = rows.values()
                        .any(|a| a.attendee_id != attendee_id && a.code_payload.as_deref() == Some(payload));
        if taken {
            return Err(StoreError::UniqueViolation(format!("code_payload {payload:?} already assigned")));
        }
        match rows.get_mut(attendee_id) {
            Some(a) if !a.has_code() => {
                a.code_payload = Some(payload.to_string());
                a.code_image_ref = image_ref.map(str::to_string);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn register_attendee(&self, attendee: &Attendee) -> Result<(), StoreError> {
        let mut rows = self.rows()?;
        if rows.contains_key(&attendee.attendee_id) {
            return Err(StoreError::UniqueViolation(format!("attendee_id {} already registered", attendee.attendee_id)));
        }
        rows.insert(attendee.attendee_id.clone(), attendee.clone());
        Ok(())
    }

    fn attendance_counts(&self) -> Result<AttendanceStats, StoreError> {
        let rows = self.rows()?;
        Ok(AttendanceStats::from_flags(rows.values().map(|a| a.attended)))
    }
}
