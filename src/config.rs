// src/config.rs

use std::{env, net::SocketAddr, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use chrono::{FixedOffset, Local};
use sqlx::{postgres::PgPoolOptions, Executor, PgPool};

use crate::{
    db::{LeadRepository, LeadStore, LocationRepository},
    services::{
        lead_service::{LeadLimits, LeadService},
        location_service::LocationService,
    },
};

/// Configuração lida do ambiente (e do `.env`, se existir).
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub limits: LeadLimits,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Monta a configuração a partir de qualquer fonte de chaves.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL deve ser definida")?;

        Ok(Self {
            database_url,
            bind_addr: parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 5)?,
            db_acquire_timeout: Duration::from_secs(parse_or(&lookup, "DB_ACQUIRE_TIMEOUT_SECS", 3)?),
            limits: LeadLimits {
                default_page_size: parse_or(&lookup, "DEFAULT_PAGE_SIZE", 10)?,
                max_page_size: parse_or(&lookup, "MAX_PAGE_SIZE", 100)?,
                max_import_rows: parse_or(&lookup, "MAX_IMPORT_ROWS", 5000)?,
            },
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("Valor inválido para {}: '{}'", key, raw)),
        _ => Ok(default),
    }
}

/// `SET TIME ZONE` com o deslocamento fixo do servidor.
///
/// A forma `INTERVAL` segue o sinal ISO (`+05:30` = leste de UTC), ao contrário
/// de um nome de fuso POSIX como `'+05:30'`.
pub fn session_time_zone_sql(offset: FixedOffset) -> String {
    format!("SET TIME ZONE INTERVAL '{}' HOUR TO MINUTE", offset)
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<AppConfig>,
    pub lead_service: LeadService,
    pub location_service: LocationService,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(config.db_acquire_timeout)
            // `to_char` das datas usa o fuso da sessão; fica igual ao do servidor,
            // que é o fuso do "hoje" dos filtros.
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    conn.execute(session_time_zone_sql(*Local::now().offset()).as_str())
                        .await?;
                    Ok(())
                })
            })
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let lead_store: Arc<dyn LeadStore> = Arc::new(LeadRepository::new(db_pool.clone()));
        Ok(Self::with_store(db_pool, config, lead_store))
    }

    // --- Monta o gráfico de dependências ---
    pub fn with_store(db_pool: PgPool, config: AppConfig, lead_store: Arc<dyn LeadStore>) -> Self {
        let lead_service = LeadService::new(lead_store, config.limits);
        let location_service = LocationService::new(LocationRepository::new(db_pool.clone()));

        Self {
            db_pool,
            config: Arc::new(config),
            lead_service,
            location_service,
        }
    }
}
