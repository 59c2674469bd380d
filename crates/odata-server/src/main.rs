//! Binary entry point, mirroring the teacher's `main.rs`: load `.env`, load
//! configuration (file + env, with hot-reload), init tracing, build the
//! provider and entity registry, then serve until shutdown.

use odata_config::ReloadableConfig;
use odata_db_postgres::PostgresConfig;
use odata_engine::EntityRegistry;
use odata_server::server::ServerBuilder;
use odata_storage::DynProvider;

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const DEFAULT_CONFIG_PATH: &str = "odata.toml";
const DEFAULT_SCHEMA_PATH: &str = "schema.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config_path = std::env::var("ODATA_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let reloadable = ReloadableConfig::load(Some(&config_path))?;
    let config = reloadable.current();

    odata_server::observability::init_tracing(&config.logging.level);

    let schema_path = std::env::var("ODATA_SCHEMA_PATH").unwrap_or_else(|_| DEFAULT_SCHEMA_PATH.to_string());
    let registry = EntityRegistry::load_schema_file(&schema_path)?;
    tracing::info!(entities = registry.names().count(), path = %schema_path, "entity registry loaded");

    let pg_config = PostgresConfig {
        url: config.database.url.clone(),
        pool_size: config.database.pool_size,
        min_connections: config.database.min_connections,
        connect_timeout_ms: config.database.connect_timeout_ms,
        idle_timeout_ms: config.database.idle_timeout_ms,
        max_lifetime_secs: config.database.max_lifetime_secs,
    };
    let postgres = odata_db_postgres::create_provider(pg_config).await?;
    let provider: DynProvider = postgres as DynProvider;

    reloadable.on_reload(|config| odata_server::observability::apply_logging_level(&config.logging.level));

    if let Some(watch_handle) = reloadable.watch(config_path.clone()) {
        // Intentionally detached: the watcher thread lives for the process
        // lifetime and only ever updates the shared `ArcSwap` snapshot.
        drop(watch_handle);
    }

    let server = ServerBuilder::new(registry, provider, reloadable).build();
    server.run().await?;

    Ok(())
}
