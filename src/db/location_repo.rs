// src/db/location_repo.rs

use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::location::{LocationLevel, LocationNode},
};

#[derive(Clone)]
pub struct LocationRepository {
    pool: PgPool,
}

impl LocationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Raízes (`parent_id = None`) ou filhos de um nó.
    /// Tabela e coluna vêm do enum, nunca do usuário.
    pub async fn list_nodes(
        &self,
        level: LocationLevel,
        parent_id: Option<i64>,
    ) -> Result<Vec<LocationNode>, AppError> {
        let table = level.table();

        let nodes = match (level.parent_column(), parent_id) {
            (Some(column), Some(parent_id)) => {
                let sql = format!(
                    "SELECT id, name, {column} AS parent_id FROM {table} WHERE {column} = $1 ORDER BY name"
                );
                sqlx::query_as::<_, LocationNode>(&sql)
                    .bind(parent_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            _ => {
                let sql = format!("SELECT id, name, NULL::BIGINT AS parent_id FROM {table} ORDER BY name");
                sqlx::query_as::<_, LocationNode>(&sql)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(nodes)
    }
}
