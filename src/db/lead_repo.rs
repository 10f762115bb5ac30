// src/db/lead_repo.rs

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{types::Json, FromRow, PgPool};

use crate::{
    common::error::AppError,
    models::lead::{LeadAddress, LeadDraft, LeadPatch, LeadRecord, LeadStatus},
};

/// A coleção de leads vista pelo serviço.
///
/// Implementada pelo Postgres em produção e por um store em memória nos testes.
/// A ordem de `list_leads` é estável (mais recentes primeiro).
#[async_trait]
pub trait LeadStore: Send + Sync {
    async fn list_leads(&self) -> Result<Vec<LeadRecord>, AppError>;

    async fn find_lead(&self, id: i64) -> Result<Option<LeadRecord>, AppError>;

    async fn insert_lead(&self, draft: &LeadDraft) -> Result<LeadRecord, AppError>;

    /// `None` quando o id não existe.
    async fn update_lead(&self, id: i64, draft: &LeadDraft) -> Result<Option<LeadRecord>, AppError>;

    async fn patch_lead(&self, id: i64, patch: &LeadPatch) -> Result<Option<LeadRecord>, AppError>;

    /// `false` quando o id não existe.
    async fn delete_lead(&self, id: i64) -> Result<bool, AppError>;

    async fn list_statuses(&self) -> Result<Vec<LeadStatus>, AppError>;
}

// Linha crua do banco. As datas já saem formatadas como texto,
// que é o formato que o motor de filtros consome.
#[derive(Debug, FromRow)]
struct LeadRow {
    id: i64,
    customer_name: Option<String>,
    email: Option<String>,
    contact: Option<String>,
    whatsapp_number: Option<String>,
    requirements: Option<String>,
    source_column: Option<String>,
    address: Option<Json<Value>>,
    status_id: Option<i64>,
    status_name: Option<String>,
    assigned_to: Option<String>,
    follow_up_date: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

impl From<LeadRow> for LeadRecord {
    fn from(row: LeadRow) -> Self {
        // Linhas antigas podem ter o endereço como string JSON: normaliza aqui.
        let address = row
            .address
            .map(|Json(value)| LeadAddress::from_value(&value))
            .unwrap_or_default();

        LeadRecord {
            id: row.id,
            customer_name: row.customer_name,
            email: row.email,
            contact: row.contact,
            whatsapp_number: row.whatsapp_number,
            requirements: row.requirements,
            source_column: row.source_column,
            address,
            status_id: row.status_id,
            status_name: row.status_name,
            assigned_to: row.assigned_to,
            follow_up_date: row.follow_up_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const LEAD_COLUMNS: &str = r#"
    l.id, l.customer_name, l.email, l.contact, l.whatsapp_number,
    l.requirements, l.source_column, l.address,
    l.status_id, s.name AS status_name, l.assigned_to,
    to_char(l.follow_up_date, 'YYYY-MM-DD') AS follow_up_date,
    to_char(l.created_at, 'YYYY-MM-DD') AS created_at,
    to_char(l.updated_at, 'YYYY-MM-DD HH24:MI:SS') AS updated_at
"#;

#[derive(Clone)]
pub struct LeadRepository {
    pool: PgPool,
}

impl LeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Endereço vazio vira NULL no banco.
    fn address_param(address: &LeadAddress) -> Option<Json<&LeadAddress>> {
        (!address.is_empty()).then_some(Json(address))
    }
}

#[async_trait]
impl LeadStore for LeadRepository {
    async fn list_leads(&self) -> Result<Vec<LeadRecord>, AppError> {
        let sql = format!(
            "SELECT {LEAD_COLUMNS} FROM leads l \
             LEFT JOIN lead_statuses s ON s.id = l.status_id \
             ORDER BY l.id DESC"
        );

        let rows = sqlx::query_as::<_, LeadRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(LeadRecord::from).collect())
    }

    async fn find_lead(&self, id: i64) -> Result<Option<LeadRecord>, AppError> {
        let sql = format!(
            "SELECT {LEAD_COLUMNS} FROM leads l \
             LEFT JOIN lead_statuses s ON s.id = l.status_id \
             WHERE l.id = $1"
        );

        let row = sqlx::query_as::<_, LeadRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(LeadRecord::from))
    }

    async fn insert_lead(&self, draft: &LeadDraft) -> Result<LeadRecord, AppError> {
        // CTE para devolver o registro já com o nome do status.
        let sql = format!(
            r#"
            WITH l AS (
                INSERT INTO leads (
                    customer_name, email, contact, whatsapp_number, requirements,
                    source_column, address, status_id, assigned_to, follow_up_date
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING *
            )
            SELECT {LEAD_COLUMNS} FROM l
            LEFT JOIN lead_statuses s ON s.id = l.status_id
            "#
        );

        let row = sqlx::query_as::<_, LeadRow>(&sql)
            .bind(&draft.customer_name)
            .bind(&draft.email)
            .bind(&draft.contact)
            .bind(&draft.whatsapp_number)
            .bind(&draft.requirements)
            .bind(&draft.source_column)
            .bind(Self::address_param(&draft.address))
            .bind(draft.status_id)
            .bind(&draft.assigned_to)
            .bind(draft.follow_up_date)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    async fn update_lead(&self, id: i64, draft: &LeadDraft) -> Result<Option<LeadRecord>, AppError> {
        let sql = format!(
            r#"
            WITH l AS (
                UPDATE leads SET
                    customer_name = $2,
                    email = $3,
                    contact = $4,
                    whatsapp_number = $5,
                    requirements = $6,
                    source_column = $7,
                    address = $8,
                    status_id = $9,
                    assigned_to = $10,
                    follow_up_date = $11,
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT {LEAD_COLUMNS} FROM l
            LEFT JOIN lead_statuses s ON s.id = l.status_id
            "#
        );

        let row = sqlx::query_as::<_, LeadRow>(&sql)
            .bind(id)
            .bind(&draft.customer_name)
            .bind(&draft.email)
            .bind(&draft.contact)
            .bind(&draft.whatsapp_number)
            .bind(&draft.requirements)
            .bind(&draft.source_column)
            .bind(Self::address_param(&draft.address))
            .bind(draft.status_id)
            .bind(&draft.assigned_to)
            .bind(draft.follow_up_date)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(LeadRecord::from))
    }

    async fn patch_lead(&self, id: i64, patch: &LeadPatch) -> Result<Option<LeadRecord>, AppError> {
        let sql = format!(
            r#"
            WITH l AS (
                UPDATE leads SET
                    status_id = COALESCE($2, status_id),
                    assigned_to = COALESCE($3, assigned_to),
                    follow_up_date = COALESCE($4, follow_up_date),
                    source_column = COALESCE($5, source_column),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT {LEAD_COLUMNS} FROM l
            LEFT JOIN lead_statuses s ON s.id = l.status_id
            "#
        );

        let row = sqlx::query_as::<_, LeadRow>(&sql)
            .bind(id)
            .bind(patch.status_id)
            .bind(&patch.assigned_to)
            .bind(patch.follow_up_date)
            .bind(&patch.source_column)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(LeadRecord::from))
    }

    async fn delete_lead(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM leads WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_statuses(&self) -> Result<Vec<LeadStatus>, AppError> {
        let statuses = sqlx::query_as::<_, LeadStatus>("SELECT id, name FROM lead_statuses ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(statuses)
    }
}
