//! nexus-persistence
//!
//! Implementación Postgres (Diesel) de `AttendeeStore` más utilidades de
//! conexión, configuración y migraciones.
//!
//! Módulos:
//! - `pg`: `PgAttendeeStore` y construcción del pool r2d2.
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: parámetros de conexión desde entorno / .env.
//! - `schema`: tabla Diesel `attendees`.

pub mod config;
pub mod error;
pub mod migrations;
pub mod pg;
pub mod schema;

pub use config::{init_dotenv, ConfigError, StoreConfig};
pub use error::PersistenceError;
pub use pg::{build_pool, build_pool_from_config, ConnectionProvider, PgAttendeeStore, PgPool, PoolProvider};
