//! Payload textual codificado en el QR: `"<attendee_id> <name>"`.
//!
//! El nombre puede contener espacios, así que el parseo corta únicamente en
//! el primer separador desde la izquierda.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Attendee;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodePayload {
    pub attendee_id: String,
    pub name: String,
}

impl CodePayload {
    pub const SEPARATOR: char = ' ';

    /// Payload canónico de un asistente.
    pub fn for_attendee(attendee: &Attendee) -> Self {
        Self { attendee_id: attendee.attendee_id.clone(),
               name: attendee.name.clone() }
    }

    /// Separa el texto escaneado en identidad y nombre. `None` si no hay
    /// separador (menos de dos campos).
    pub fn parse(raw: &str) -> Option<Self> {
        let (attendee_id, name) = raw.split_once(Self::SEPARATOR)?;
        Some(Self { attendee_id: attendee_id.to_string(),
                    name: name.to_string() })
    }
}

impl fmt::Display for CodePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.attendee_id, Self::SEPARATOR, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_first_space_only() {
        let p = CodePayload::parse("A1 Jane van der Berg").unwrap();
        assert_eq!(p.attendee_id, "A1");
        assert_eq!(p.name, "Jane van der Berg");
    }

    #[test]
    fn no_space_is_not_a_payload() {
        assert!(CodePayload::parse("garbage").is_none());
        assert!(CodePayload::parse("").is_none());
    }

    #[test]
    fn empty_halves_still_produce_two_fields() {
        let p = CodePayload::parse("A1 ").unwrap();
        assert_eq!((p.attendee_id.as_str(), p.name.as_str()), ("A1", ""));
        let p = CodePayload::parse(" Jane").unwrap();
        assert_eq!((p.attendee_id.as_str(), p.name.as_str()), ("", "Jane"));
    }

    #[test]
    fn formats_identity_and_name_with_single_space() {
        let a = Attendee::new("A1", "Jane Doe").unwrap();
        assert_eq!(CodePayload::for_attendee(&a).to_string(), "A1 Jane Doe");
    }
}
