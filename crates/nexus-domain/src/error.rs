use thiserror::Error;

/// Errores de validación de entidades del dominio.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DomainError {
    #[error("attendee_id vacío")]
    EmptyAttendeeId,
    #[error("attendee_id no puede contener espacios: {0:?}")]
    AttendeeIdWithSpace(String),
    #[error("nombre vacío para attendee_id {0}")]
    EmptyName(String),
}
