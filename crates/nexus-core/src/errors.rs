//! Errores de infraestructura del core.
//!
//! Los resultados de escaneo no elegibles NO son errores (ver `ScanOutcome`);
//! aquí sólo vive lo que aborta la operación en curso.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Connection(String),
    #[error("unique violation: {0}")]
    UniqueViolation(String),
    #[error("query failed: {0}")]
    Query(String),
}

impl StoreError {
    /// `true` si un reintento manual (desde la UI) tiene sentido.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Connection(_))
    }
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CodecError {
    #[error("render error: {0}")]
    Render(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("image sink error: {0}")]
    Sink(String),
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CoreError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_connection_errors_are_transient() {
        assert!(StoreError::Connection("refused".into()).is_transient());
        assert!(!StoreError::UniqueViolation("dup".into()).is_transient());
        assert!(!StoreError::Query("syntax".into()).is_transient());
    }

    #[test]
    fn core_error_is_transparent() {
        let e: CoreError = StoreError::Connection("refused".into()).into();
        assert_eq!(e.to_string(), "store unreachable: refused");
        let e: CoreError = CodecError::Decode("not an image".into()).into();
        assert_eq!(e.to_string(), "decode error: not an image");
    }
}
