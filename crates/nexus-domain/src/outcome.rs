//! Resultados del protocolo de asistencia.
//!
//! Los casos "no elegible" son valores de retorno ordinarios, no errores: se
//! esperan con frecuencia durante un evento y la UI los muestra como avisos.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Clasificación de un payload decodificado contra el registro de asistentes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// Texto sin separador; no se consultó la store.
    Malformed { raw: String },
    NotFound { attendee_id: String, name: String },
    /// La fila existe pero no tiene payload: anomalía de integridad.
    InvalidCode { attendee_id: String },
    AlreadyAttended { attendee_id: String },
    Eligible { attendee_id: String },
}

impl ScanOutcome {
    pub fn attendee_id(&self) -> Option<&str> {
        match self {
            ScanOutcome::Malformed { .. } => None,
            ScanOutcome::NotFound { attendee_id, .. }
            | ScanOutcome::InvalidCode { attendee_id }
            | ScanOutcome::AlreadyAttended { attendee_id }
            | ScanOutcome::Eligible { attendee_id } => Some(attendee_id),
        }
    }

    pub fn is_eligible(&self) -> bool {
        matches!(self, ScanOutcome::Eligible { .. })
    }
}

impl fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanOutcome::Malformed { .. } => write!(f, "Invalid QR code"),
            ScanOutcome::NotFound { .. } => write!(f, "QR code not found in the database."),
            ScanOutcome::InvalidCode { .. } => write!(f, "Invalid QR code."),
            ScanOutcome::AlreadyAttended { attendee_id } => {
                write!(f, "Attendance already marked for Attendee ID: {attendee_id}")
            }
            ScanOutcome::Eligible { attendee_id } => write!(f, "Attendee ID: {attendee_id} is eligible for entry."),
        }
    }
}

/// Resultado de la transición condicional `attended: false → true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkResult {
    Success,
    /// Otro escaneo ganó la carrera (la fila ya estaba en `true`).
    AlreadyMarked,
    /// La fila desapareció entre la validación y el marcado.
    NotFound,
}

impl fmt::Display for MarkResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MarkResult::Success => "success",
            MarkResult::AlreadyMarked => "already_marked",
            MarkResult::NotFound => "not_found",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn messages_match_scanner_page_text() {
        let o = ScanOutcome::AlreadyAttended { attendee_id: "A1".into() };
        assert_eq!(o.to_string(), "Attendance already marked for Attendee ID: A1");
        let o = ScanOutcome::NotFound { attendee_id: "Z9".into(), name: "Nobody".into() };
        assert_eq!(o.to_string(), "QR code not found in the database.");
        assert_eq!(ScanOutcome::Malformed { raw: "x".into() }.to_string(), "Invalid QR code");
    }

    #[test]
    fn serializes_with_outcome_tag() {
        let o = ScanOutcome::Eligible { attendee_id: "A1".into() };
        assert_eq!(serde_json::to_value(&o).unwrap(), json!({"outcome": "eligible", "attendee_id": "A1"}));
        assert_eq!(serde_json::to_value(MarkResult::AlreadyMarked).unwrap(), json!("already_marked"));
    }

    #[test]
    fn malformed_has_no_attendee_id() {
        assert_eq!(ScanOutcome::Malformed { raw: "x".into() }.attendee_id(), None);
        assert_eq!(ScanOutcome::InvalidCode { attendee_id: "B2".into() }.attendee_id(), Some("B2"));
    }
}
