// src/main.rs

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod models;
mod services;

#[cfg(test)]
mod tests;

use crate::{
    config::{AppConfig, AppState},
    docs::ApiDoc,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG sobrescreve o nível padrão.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("leads_backend=info")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = AppConfig::from_env()?;
    let bind_addr = config.bind_addr;
    let app_state = AppState::new(config).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados")?;

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {}", bind_addr))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app(app_state))
        .await
        .context("Erro no servidor Axum")?;

    Ok(())
}

/// Monta o router completo. Separado do `main` para os testes de rota.
pub fn app(app_state: AppState) -> Router {
    let upload_limit = app_state.config.max_upload_bytes;

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        // Leads
        .route(
            "/api/leads",
            get(handlers::leads::list_leads)
                .post(handlers::leads::create_lead)
                .delete(handlers::leads::bulk_delete),
        )
        .route("/api/leads/filter-options", get(handlers::leads::filter_options))
        .route("/api/leads/statuses", get(handlers::leads::list_statuses))
        .route("/api/leads/bulk-update", post(handlers::leads::bulk_update))
        .route(
            "/api/leads/import",
            post(handlers::leads::import_leads).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/leads/export", get(handlers::leads::export_leads))
        .route(
            "/api/leads/{id}",
            get(handlers::leads::get_lead)
                .put(handlers::leads::update_lead)
                .delete(handlers::leads::delete_lead),
        )
        // Localidades
        .route("/api/locations/{level}", get(handlers::locations::list_locations))
        .with_state(app_state)
}
