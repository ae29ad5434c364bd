//! Wrapper para correr migraciones embebidas (`migrations/` de este crate).
//! Se ejecutan una vez al construir el pool.

use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::error::PersistenceError;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Crea el esquema configurado (si se indica) y aplica migraciones pendientes.
///
/// `schema` debe venir validado como identificador (ver `StoreConfig`); el
/// `search_path` de la sesión ya apunta a él.
pub fn run_pending_migrations(conn: &mut PgConnection, schema: Option<&str>) -> Result<(), PersistenceError> {
    if let Some(schema) = schema {
        conn.batch_execute(&format!("CREATE SCHEMA IF NOT EXISTS \"{schema}\";"))?;
    }
    conn.run_pending_migrations(MIGRATIONS)
        .map(|_| ())
        .map_err(|e| PersistenceError::Unknown(format!("migration error: {e}")))
}
