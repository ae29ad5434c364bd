use std::fmt;

use serde::{Deserialize, Serialize};

/// Conteos de asistencia tomados de un único snapshot de la store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceStats {
    pub total_attended: u64,
    pub total_not_attended: u64,
}

impl AttendanceStats {
    pub fn new(total_attended: u64, total_not_attended: u64) -> Self {
        Self { total_attended, total_not_attended }
    }

    /// Agrega conteos a partir de la bandera `attended` de cada fila.
    pub fn from_flags<I>(flags: I) -> Self
        where I: IntoIterator<Item = bool>
    {
        flags.into_iter().fold(Self::default(), |mut acc, attended| {
                             if attended {
                                 acc.total_attended += 1;
                             } else {
                                 acc.total_not_attended += 1;
                             }
                             acc
                         })
    }

    pub fn total(&self) -> u64 {
        self.total_attended + self.total_not_attended
    }

    /// Porcentaje asistido (0.0 con store vacía).
    pub fn attended_percent(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.total_attended as f64 * 100.0 / total as f64,
        }
    }

    pub fn not_attended_percent(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            _ => 100.0 - self.attended_percent(),
        }
    }
}

impl fmt::Display for AttendanceStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,
               "Attended: {:.1}% ({}) | Not Attended: {:.1}% ({})",
               self.attended_percent(),
               self.total_attended,
               self.not_attended_percent(),
               self.total_not_attended)
    }
}
