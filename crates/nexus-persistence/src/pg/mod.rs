//! Implementación Postgres (Diesel) de `AttendeeStore`.
//!
//! Garantías:
//! - Cada operación toma una conexión del pool y la devuelve al salir del
//!   scope (`PooledConnection` se libera en todos los caminos, incluido el
//!   de error).
//! - Identidad y nombre escaneados viajan como parámetros bind del query
//!   builder; nunca se concatenan en SQL.
//! - El marcado es un único `UPDATE … WHERE attendee_id = $1 AND attended =
//!   false`; el conteo de filas afectadas decide el resultado.
//! - Las estadísticas se calculan en una sola sentencia (un snapshot).
//! - Sin reintentos automáticos: los errores suben al llamador.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use log::{debug, error, warn};
use nexus_core::{AttendeeStore, StoreError};
use nexus_domain::{AttendanceStats, Attendee};

use crate::config::StoreConfig;
use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;
use crate::schema::attendees;

/// Alias de tipo para el pool r2d2 de conexiones Postgres.
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;
pub type PgPooledConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones.
///
/// Permite inyectar un pool real (producción/tests de integración) o
/// factorear en tests sin acoplar a r2d2.
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError>;
}

/// Implementación concreta de `ConnectionProvider` respaldada por un `PgPool`.
pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError> {
        Ok(self.pool.get()?)
    }
}

/// Fila mapeada de la tabla `attendees` para lecturas.
#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = attendees)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AttendeeRow {
    pub attendee_id: String,
    pub name: String,
    pub code_payload: Option<String>,
    pub code_image_ref: Option<String>,
    pub attended: bool,
    pub attended_at: Option<DateTime<Utc>>,
}

impl From<AttendeeRow> for Attendee {
    fn from(row: AttendeeRow) -> Self {
        Attendee { attendee_id: row.attendee_id,
                   name: row.name,
                   code_payload: row.code_payload,
                   code_image_ref: row.code_image_ref,
                   attended: row.attended,
                   attended_at: row.attended_at }
    }
}

/// Fila para insertar en `attendees` (registro).
#[derive(Insertable, Debug)]
#[diesel(table_name = attendees)]
pub struct NewAttendeeRow<'a> {
    pub attendee_id: &'a str,
    pub name: &'a str,
    pub code_payload: Option<&'a str>,
    pub code_image_ref: Option<&'a str>,
    pub attended: bool,
    pub attended_at: Option<DateTime<Utc>>,
}

impl<'a> From<&'a Attendee> for NewAttendeeRow<'a> {
    fn from(a: &'a Attendee) -> Self {
        Self { attendee_id: &a.attendee_id,
               name: &a.name,
               code_payload: a.code_payload.as_deref(),
               code_image_ref: a.code_image_ref.as_deref(),
               attended: a.attended,
               attended_at: a.attended_at }
    }
}

#[derive(QueryableByName, Debug)]
struct CountsRow {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    attended: i64,
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    not_attended: i64,
}

#[derive(QueryableByName, Debug)]
struct VersionRow {
    #[diesel(sql_type = diesel::sql_types::Text)]
    version: String,
}

/// Registra el error en el log y lo convierte a `StoreError`.
fn store_err(op: &str, e: PersistenceError) -> StoreError {
    error!("{op}:error err={e}");
    e.into()
}

/// Implementación Postgres de `AttendeeStore`.
pub struct PgAttendeeStore<P: ConnectionProvider> {
    pub provider: P,
}

impl<P: ConnectionProvider> PgAttendeeStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    fn conn(&self, op: &str) -> Result<PgPooledConnection, StoreError> {
        self.provider.connection().map_err(|e| store_err(op, e))
    }

    /// Versión del servidor (sonda de conectividad para la UI).
    pub fn server_version(&self) -> Result<String, StoreError> {
        let mut conn = self.conn("server_version")?;
        let row: VersionRow = diesel::sql_query("SELECT version() AS version").get_result(&mut conn)
                                                                              .map_err(|e| store_err("server_version", e.into()))?;
        Ok(row.version)
    }
}

impl PgAttendeeStore<PoolProvider> {
    pub fn from_pool(pool: PgPool) -> Self {
        Self::new(PoolProvider { pool })
    }
}

impl<P: ConnectionProvider> AttendeeStore for PgAttendeeStore<P> {
    fn find_attendee(&self, attendee_id: &str, name: &str) -> Result<Option<Attendee>, StoreError> {
        debug!("find_attendee:start attendee_id={attendee_id}");
        let mut conn = self.conn("find_attendee")?;
        let row = attendees::table.filter(attendees::attendee_id.eq(attendee_id))
                                  .filter(attendees::name.eq(name))
                                  .select(AttendeeRow::as_select())
                                  .first(&mut conn)
                                  .optional()
                                  .map_err(|e| store_err("find_attendee", e.into()))?;
        debug!("find_attendee:done attendee_id={attendee_id} found={}", row.is_some());
        Ok(row.map(Attendee::from))
    }

    fn attendee_exists(&self, attendee_id: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn("attendee_exists")?;
        diesel::select(diesel::dsl::exists(attendees::table.filter(attendees::attendee_id.eq(attendee_id))))
            .get_result(&mut conn)
            .map_err(|e| store_err("attendee_exists", e.into()))
    }

    fn conditional_mark_attended(&self, attendee_id: &str, at: DateTime<Utc>) -> Result<usize, StoreError> {
        debug!("conditional_mark_attended:start attendee_id={attendee_id}");
        let mut conn = self.conn("conditional_mark_attended")?;
        let target = attendees::table.filter(attendees::attendee_id.eq(attendee_id))
                                     .filter(attendees::attended.eq(false));
        let affected = diesel::update(target).set((attendees::attended.eq(true), attendees::attended_at.eq(Some(at))))
                                             .execute(&mut conn)
                                             .map_err(|e| store_err("conditional_mark_attended", e.into()))?;
        debug!("conditional_mark_attended:done attendee_id={attendee_id} affected={affected}");
        Ok(affected)
    }

    fn list_all_attendees(&self) -> Result<Vec<Attendee>, StoreError> {
        let mut conn = self.conn("list_all_attendees")?;
        let rows: Vec<AttendeeRow> = attendees::table.order(attendees::attendee_id.asc())
                                                     .select(AttendeeRow::as_select())
                                                     .load(&mut conn)
                                                     .map_err(|e| store_err("list_all_attendees", e.into()))?;
        debug!("list_all_attendees:done count={}", rows.len());
        Ok(rows.into_iter().map(Attendee::from).collect())
    }

    fn set_code_payload(&self, attendee_id: &str, payload: &str, image_ref: Option<&str>) -> Result<bool, StoreError> {
        let mut conn = self.conn("set_code_payload")?;
        // El CHECK de la tabla impide payloads vacíos: NULL es el único "sin código".
        let target = attendees::table.filter(attendees::attendee_id.eq(attendee_id))
                                     .filter(attendees::code_payload.is_null());
        let result = diesel::update(target).set((attendees::code_payload.eq(payload), attendees::code_image_ref.eq(image_ref)))
                                           .execute(&mut conn)
                                           .map_err(PersistenceError::from);
        match result {
            Ok(affected) => Ok(affected > 0),
            Err(e @ PersistenceError::UniqueViolation(_)) => {
                warn!("set_code_payload:payload_taken attendee_id={attendee_id}");
                Err(e.into())
            }
            Err(e) => Err(store_err("set_code_payload", e)),
        }
    }

    fn register_attendee(&self, attendee: &Attendee) -> Result<(), StoreError> {
        let mut conn = self.conn("register_attendee")?;
        diesel::insert_into(attendees::table).values(NewAttendeeRow::from(attendee))
                                             .execute(&mut conn)
                                             .map_err(|e| store_err("register_attendee", e.into()))?;
        debug!("register_attendee:done attendee_id={}", attendee.attendee_id);
        Ok(())
    }

    fn attendance_counts(&self) -> Result<AttendanceStats, StoreError> {
        let mut conn = self.conn("attendance_counts")?;
        let row: CountsRow = diesel::sql_query("SELECT count(*) FILTER (WHERE attended) AS attended, \
                                                count(*) FILTER (WHERE NOT attended) AS not_attended \
                                                FROM attendees")
            .get_result(&mut conn)
            .map_err(|e| store_err("attendance_counts", e.into()))?;
        Ok(AttendanceStats::new(row.attended.max(0) as u64, row.not_attended.max(0) as u64))
    }
}

/// Construye un pool Postgres r2d2 y aplica migraciones.
///
/// - Ajusta tamaños (0 → 1; si `min_size > max_size`, usa `min = max`).
/// - Ejecuta migraciones con la primera conexión obtenida.
/// - Devuelve `PersistenceError::TransientIo` ante errores del pool/manager.
pub fn build_pool(conninfo: &str, min_size: u32, max_size: u32, schema: Option<&str>) -> Result<PgPool, PersistenceError> {
    let validated_min = min_size.max(1);
    let validated_max = max_size.max(1);
    if validated_min > validated_max {
        warn!("min_size > max_size ({validated_min} > {validated_max}), ajustando min=max");
    }
    let manager = ConnectionManager::<PgConnection>::new(conninfo);
    let pool = r2d2::Pool::builder().min_idle(Some(validated_min.min(validated_max)))
                                    .max_size(validated_max)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()?;
        run_pending_migrations(&mut conn, schema)?;
    }
    Ok(pool)
}

/// Pool a partir de la configuración de arranque.
pub fn build_pool_from_config(cfg: &StoreConfig) -> Result<PgPool, PersistenceError> {
    build_pool(&cfg.connection_string(), cfg.min_connections, cfg.max_connections, Some(&cfg.schema))
}
