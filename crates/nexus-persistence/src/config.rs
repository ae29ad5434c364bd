//! Parámetros de conexión desde variables de entorno (.env incluido).
//!
//! La configuración se construye una sola vez al arranque y se pasa por
//! referencia; no hay estado global salvo la carga perezosa del `.env`.
//! Si falta cualquier parámetro requerido el arranque se detiene con la
//! lista exacta de faltantes.

use std::env;
use std::fmt;

use dotenvy::dotenv;
use once_cell::sync::Lazy;
use thiserror::Error;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}

pub const ENV_HOST: &str = "NEXUSPASS_HOST";
pub const ENV_USER: &str = "NEXUSPASS_USER";
pub const ENV_PASSWORD: &str = "NEXUSPASS_PASSWORD";
pub const ENV_DATABASE: &str = "NEXUSPASS_DATABASE";
pub const ENV_SCHEMA: &str = "NEXUSPASS_SCHEMA";
pub const ENV_PORT: &str = "NEXUSPASS_PORT";
pub const ENV_MIN_CONNECTIONS: &str = "NEXUSPASS_MIN_CONNECTIONS";
pub const ENV_MAX_CONNECTIONS: &str = "NEXUSPASS_MAX_CONNECTIONS";
pub const ENV_CODE_DIR: &str = "NEXUSPASS_CODE_DIR";

/// Parámetros obligatorios, en el orden en que se reportan.
pub const REQUIRED: [&str; 5] = [ENV_HOST, ENV_USER, ENV_PASSWORD, ENV_DATABASE, ENV_SCHEMA];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<String>),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

#[derive(Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub schema: String,
    pub min_connections: u32,
    pub max_connections: u32,
    /// Directorio donde se escriben las imágenes de código.
    pub code_dir: String,
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
         .field("host", &self.host)
         .field("port", &self.port)
         .field("user", &self.user)
         .field("password", &"***")
         .field("database", &self.database)
         .field("schema", &self.schema)
         .field("min_connections", &self.min_connections)
         .field("max_connections", &self.max_connections)
         .field("code_dir", &self.code_dir)
         .finish()
    }
}

impl StoreConfig {
    /// Lee el entorno del proceso (tras cargar `.env`).
    pub fn from_env() -> Result<Self, ConfigError> {
        init_dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Construye la configuración a partir de una función de búsqueda de
    /// claves. Los valores se recortan; vacíos cuentan como faltantes.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
        where F: Fn(&str) -> Option<String>
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let missing: Vec<String> = REQUIRED.into_iter()
                                           .filter(|&key| get(key).is_none())
                                           .map(|key| key.to_string())
                                           .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }
        let required = |key: &str| get(key).ok_or_else(|| ConfigError::Missing(vec![key.to_string()]));

        let schema = required(ENV_SCHEMA)?;
        validate_schema(&schema)?;
        let port = parse_or(get(ENV_PORT), ENV_PORT, 5432u16)?;
        let min_connections = parse_or(get(ENV_MIN_CONNECTIONS), ENV_MIN_CONNECTIONS, 1u32)?;
        let max_connections = parse_or(get(ENV_MAX_CONNECTIONS), ENV_MAX_CONNECTIONS, 8u32)?;

        Ok(Self { host: required(ENV_HOST)?,
                  port,
                  user: required(ENV_USER)?,
                  password: required(ENV_PASSWORD)?,
                  database: required(ENV_DATABASE)?,
                  schema,
                  min_connections,
                  max_connections,
                  code_dir: get(ENV_CODE_DIR).unwrap_or_else(|| "codes".to_string()) })
    }

    /// Cadena de conexión libpq `clave=valor`; el esquema se fija vía
    /// `search_path` para que las consultas no lo interpolen.
    pub fn connection_string(&self) -> String {
        format!("host={} port={} user={} password={} dbname={} options={}",
                quote_conninfo(&self.host),
                self.port,
                quote_conninfo(&self.user),
                quote_conninfo(&self.password),
                quote_conninfo(&self.database),
                quote_conninfo(&format!("-c search_path={}", self.schema)))
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T, ConfigError>
    where T::Err: fmt::Display
{
    match raw {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|e: T::Err| ConfigError::Invalid { key: key.to_string(),
                                                                             reason: e.to_string() }),
    }
}

/// Identificador simple en minúsculas: evita comillas y case-folding en
/// `search_path` y en `CREATE SCHEMA`.
fn validate_schema(schema: &str) -> Result<(), ConfigError> {
    let mut chars = schema.chars();
    let valid_start = chars.next().is_some_and(|c| c.is_ascii_lowercase() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid_start && valid_rest && schema.len() <= 63 {
        Ok(())
    } else {
        Err(ConfigError::Invalid { key: ENV_SCHEMA.to_string(),
                                   reason: format!("{schema:?} is not a lowercase identifier") })
    }
}

fn quote_conninfo(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}
