//! nexuspass: shell de línea de comandos del control de asistencia.
//!
//! Subcomandos:
//! - `status`: sonda de conexión (versión del servidor) y conteos.
//! - `register --id <ID> --name <NOMBRE>`
//! - `generate [--out <DIR>]`: códigos QR faltantes.
//! - `scan <IMAGEN>...`: procesa frames de cámara (PNG/JPEG) en orden.
//! - `check <PAYLOAD>`: procesa un payload tecleado (sin cámara).
//! - `stats [--json]`
//!
//! Códigos de salida: 0 ok, 2 uso, 3 configuración, 4 rechazado/no
//! encontrado, 5 store/infraestructura.

mod render;

use std::process::exit;

use log::error;
use nexus_codec::{DirectoryImageSink, QrImageCodec};
use nexus_core::{AttendeeStore, Checkpoint, CodeGenerator, CoreError, StatisticsAggregator, StoreError};
use nexus_domain::Attendee;
use nexus_persistence::{build_pool_from_config, ConfigError, PgAttendeeStore, PoolProvider, StoreConfig};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Uso: nexuspass <status | register --id <ID> --name <NOMBRE> | generate [--out <DIR>] | scan <IMAGEN>... | check <PAYLOAD> | stats [--json]>";

type Store = PgAttendeeStore<PoolProvider>;

fn main() {
    // Cargar .env si existe para obtener NEXUSPASS_*
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
                             .with_writer(std::io::stderr)
                             .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        eprintln!("{USAGE}");
        exit(2);
    };
    let rest = &args[1..];
    if !matches!(command, "status" | "register" | "generate" | "scan" | "check" | "stats") {
        eprintln!("[nexuspass] subcomando desconocido: {command}\n{USAGE}");
        exit(2);
    }

    let cfg = load_config();
    let store = connect(&cfg);
    let code = match command {
        "status" => cmd_status(&store),
        "register" => cmd_register(&store, rest),
        "generate" => cmd_generate(&store, &cfg, rest),
        "scan" => cmd_scan(&store, rest),
        "check" => cmd_check(&store, rest),
        _ => cmd_stats(&store, rest),
    };
    exit(code);
}

/// Detiene el arranque si falta cualquier parámetro, listando cuáles.
fn load_config() -> StoreConfig {
    match StoreConfig::from_env() {
        Ok(cfg) => cfg,
        Err(ConfigError::Missing(keys)) => {
            eprintln!("Missing required configuration!");
            eprintln!("The following parameters are missing:");
            for key in keys {
                eprintln!("- {key}");
            }
            eprintln!("Define them in the environment or in a .env file.");
            exit(3);
        }
        Err(e) => {
            eprintln!("[nexuspass] {e}");
            exit(3);
        }
    }
}

fn connect(cfg: &StoreConfig) -> Store {
    match build_pool_from_config(cfg) {
        Ok(pool) => PgAttendeeStore::from_pool(pool),
        Err(e) => {
            error!("connect:failed host={} database={} err={e}", cfg.host, cfg.database);
            eprintln!("[nexuspass] Connection Failed: {e}");
            exit(5);
        }
    }
}

/// Reporta un error de store y devuelve el código de salida.
fn store_failure(ctx: &str, e: &StoreError) -> i32 {
    eprintln!("[nexuspass {ctx}] {e}");
    if e.is_transient() {
        eprintln!("[nexuspass {ctx}] la store no responde; reintente la operación");
    }
    5
}

/// Valor de `--flag <valor>` si está presente.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter().position(|a| a == flag).and_then(|i| args.get(i + 1)).map(String::as_str)
}

fn cmd_status(store: &Store) -> i32 {
    match store.server_version() {
        Ok(version) => {
            println!("Connected. Version: {version}");
        }
        Err(e) => return store_failure("status", &e),
    }
    match StatisticsAggregator::new(store).compute_statistics() {
        Ok(stats) => {
            println!("{stats}");
            0
        }
        Err(e) => store_failure("status", &e),
    }
}

fn cmd_register(store: &Store, args: &[String]) -> i32 {
    let (Some(id), Some(name)) = (flag_value(args, "--id"), flag_value(args, "--name")) else {
        eprintln!("Uso: nexuspass register --id <ID> --name <NOMBRE>");
        return 2;
    };
    let attendee = match Attendee::new(id, name) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("[nexuspass register] {e}");
            return 2;
        }
    };
    match store.register_attendee(&attendee) {
        Ok(()) => {
            println!("registrado: {id}");
            0
        }
        Err(StoreError::UniqueViolation(_)) => {
            eprintln!("[nexuspass register] attendee_id ya registrado: {id}");
            4
        }
        Err(e) => store_failure("register", &e),
    }
}

fn cmd_generate(store: &Store, cfg: &StoreConfig, args: &[String]) -> i32 {
    let dir = flag_value(args, "--out").unwrap_or(&cfg.code_dir);
    let codec = QrImageCodec::default();
    let sink = DirectoryImageSink::new(dir);
    match CodeGenerator::new(store, &codec, &sink).generate_missing_codes() {
        Ok(report) => {
            println!("{report}");
            if report.generated == 0 && report.failed > 0 {
                4
            } else {
                0
            }
        }
        Err(e) => {
            if e.report.generated > 0 {
                eprintln!("[nexuspass generate] {} codes stored before failure", e.report.generated);
            }
            store_failure("generate", &e.source)
        }
    }
}

fn cmd_scan(store: &Store, args: &[String]) -> i32 {
    if args.is_empty() {
        eprintln!("Uso: nexuspass scan <IMAGEN>...");
        return 2;
    }
    let codec = QrImageCodec::default();
    let checkpoint = Checkpoint::new(store, &codec);
    let mut admitted = 0;
    for path in args {
        let frame = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("[nexuspass scan] {path}: {e}");
                return 2;
            }
        };
        match checkpoint.process_frame(&frame) {
            Ok(report) => {
                println!("{report}");
                admitted += report.admitted();
            }
            Err(CoreError::Codec(e)) => eprintln!("[nexuspass scan] {path}: {e}"),
            Err(CoreError::Store(e)) => return store_failure("scan", &e),
        }
    }
    if admitted > 0 {
        0
    } else {
        4
    }
}

fn cmd_check(store: &Store, args: &[String]) -> i32 {
    if args.is_empty() {
        eprintln!("Uso: nexuspass check <PAYLOAD>");
        return 2;
    }
    // Permite payloads sin comillas: `check A1 Jane Doe`.
    let payload = args.join(" ");
    let codec = QrImageCodec::default();
    match Checkpoint::new(store, &codec).process_payload(&payload) {
        Ok(report) => {
            println!("{report}");
            if report.admitted() {
                0
            } else {
                4
            }
        }
        Err(e) => store_failure("check", &e),
    }
}

fn cmd_stats(store: &Store, args: &[String]) -> i32 {
    let stats = match StatisticsAggregator::new(store).compute_statistics() {
        Ok(s) => s,
        Err(e) => return store_failure("stats", &e),
    };
    if args.iter().any(|a| a == "--json") {
        match serde_json::to_string_pretty(&stats) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("[nexuspass stats] {e}");
                return 5;
            }
        }
    } else {
        println!("{}", render::attendance_breakdown(&stats));
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn flag_value_reads_following_argument() {
        let a = args(&["--id", "A1", "--name", "Jane Doe"]);
        assert_eq!(flag_value(&a, "--id"), Some("A1"));
        assert_eq!(flag_value(&a, "--name"), Some("Jane Doe"));
        assert_eq!(flag_value(&a, "--out"), None);
        assert_eq!(flag_value(&args(&["--id"]), "--id"), None);
    }
}
