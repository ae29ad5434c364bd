//! Registro de asistente.
//!
//! Una fila por persona registrada. `attendee_id` y `name` son inmutables;
//! `code_payload` se fija una única vez (generador de códigos) y `attended`
//! sólo transiciona `false → true`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::DomainError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub attendee_id: String,
    pub name: String,
    pub code_payload: Option<String>,
    pub code_image_ref: Option<String>,
    pub attended: bool,
    pub attended_at: Option<DateTime<Utc>>,
}

impl Attendee {
    /// Crea un asistente recién registrado (sin código, no asistido).
    ///
    /// El id no puede contener espacios: el payload se separa en el primer
    /// espacio, por lo que un id con espacios nunca podría validarse.
    pub fn new(attendee_id: &str, name: &str) -> Result<Self, DomainError> {
        if attendee_id.is_empty() {
            return Err(DomainError::EmptyAttendeeId);
        }
        if attendee_id.contains(' ') {
            return Err(DomainError::AttendeeIdWithSpace(attendee_id.to_string()));
        }
        if name.is_empty() {
            return Err(DomainError::EmptyName(attendee_id.to_string()));
        }
        Ok(Self { attendee_id: attendee_id.to_string(),
                  name: name.to_string(),
                  code_payload: None,
                  code_image_ref: None,
                  attended: false,
                  attended_at: None })
    }

    /// `true` si el asistente ya tiene un payload utilizable (no nulo ni vacío).
    pub fn has_code(&self) -> bool {
        self.code_payload.as_deref().is_some_and(|p| !p.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_attendee_starts_without_code_and_not_attended() {
        let a = Attendee::new("A1", "Jane Doe").unwrap();
        assert_eq!(a.attendee_id, "A1");
        assert_eq!(a.name, "Jane Doe");
        assert!(!a.has_code());
        assert!(!a.attended);
        assert!(a.attended_at.is_none());
    }

    #[test]
    fn rejects_ids_that_would_break_payload_parsing() {
        assert_eq!(Attendee::new("", "x"), Err(DomainError::EmptyAttendeeId));
        assert_eq!(Attendee::new("A 1", "x"), Err(DomainError::AttendeeIdWithSpace("A 1".into())));
        assert_eq!(Attendee::new("A1", ""), Err(DomainError::EmptyName("A1".into())));
    }

    #[test]
    fn empty_payload_does_not_count_as_code() {
        let mut a = Attendee::new("A1", "Jane").unwrap();
        a.code_payload = Some(String::new());
        assert!(!a.has_code());
        a.code_payload = Some("A1 Jane".into());
        assert!(a.has_code());
    }
}
