use log::debug;
use nexus_domain::AttendanceStats;

use crate::errors::StoreError;
use crate::store::AttendeeStore;

/// Agregador de estadísticas (sólo lectura).
pub struct StatisticsAggregator<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: AttendeeStore + ?Sized> StatisticsAggregator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn compute_statistics(&self) -> Result<AttendanceStats, StoreError> {
        let stats = self.store.attendance_counts()?;
        debug!("compute_statistics attended={} not_attended={}",
               stats.total_attended,
               stats.total_not_attended);
        Ok(stats)
    }
}
