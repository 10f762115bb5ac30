// src/handlers/leads.rs

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    common::{error::AppError, pagination::Page},
    config::AppState,
    handlers::{empty_as_none, ApiResponse},
    models::{
        filter::{DateRange, DateRangeKind, FieldFilter, FieldFilters, FilterCriteria},
        lead::{BulkOutcome, FilterOptions, ImportSummary, LeadInput, LeadPatch, LeadRecord, LeadStatus},
    },
    services::spreadsheet::{ExportFormat, ImportFormat},
};

// =============================================================================
//  ÁREA 1: LISTAGEM E FILTROS
// =============================================================================

/// Critérios de filtro achatados na query string.
/// Filtros de campo aceitam `all` (ou vazio) para "sem filtro".
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LeadListQuery {
    /// Busca textual em todos os campos.
    pub search: Option<String>,
    pub customer_name: Option<String>,
    pub city: Option<String>,
    /// Nome da loja.
    pub requirements: Option<String>,
    pub status_id: Option<String>,
    pub assigned_to: Option<String>,
    pub follow_up: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub follow_up_range: Option<DateRangeKind>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub follow_up_from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub follow_up_to: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub created_range: Option<DateRangeKind>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub created_from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub created_to: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub updated_range: Option<DateRangeKind>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub updated_from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub updated_to: Option<NaiveDate>,

    #[serde(default, deserialize_with = "empty_as_none")]
    #[param(minimum = 1)]
    pub page: Option<usize>,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[param(minimum = 1)]
    pub per_page: Option<usize>,
}

impl LeadListQuery {
    pub fn to_criteria(&self) -> FilterCriteria {
        let range = |kind: Option<DateRangeKind>, from, to| {
            DateRange::from_parts(kind.unwrap_or_default(), from, to)
        };

        FilterCriteria {
            search_term: self.search.clone().unwrap_or_default(),
            field_filters: FieldFilters {
                customer_name: FieldFilter::from(self.customer_name.clone()),
                city: FieldFilter::from(self.city.clone()),
                requirements: FieldFilter::from(self.requirements.clone()),
                status_id: FieldFilter::from(self.status_id.clone()),
                assigned_to: FieldFilter::from(self.assigned_to.clone()),
                follow_up: FieldFilter::from(self.follow_up.clone()),
            },
            follow_up_range: range(self.follow_up_range, self.follow_up_from, self.follow_up_to),
            created_range: range(self.created_range, self.created_from, self.created_to),
            updated_range: range(self.updated_range, self.updated_from, self.updated_to),
        }
    }
}

// GET /api/leads
#[utoipa::path(
    get,
    path = "/api/leads",
    tag = "Leads",
    params(LeadListQuery),
    responses(
        (status = 200, description = "Página de leads filtrados", body = ApiResponse<Page<LeadRecord>>)
    )
)]
pub async fn list_leads(
    State(app_state): State<AppState>,
    Query(query): Query<LeadListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state
        .lead_service
        .list_leads(&query.to_criteria(), query.page, query.per_page)
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::ok(page))))
}

// GET /api/leads/filter-options
#[utoipa::path(
    get,
    path = "/api/leads/filter-options",
    tag = "Leads",
    responses(
        (status = 200, description = "Valores distintos para os dropdowns", body = ApiResponse<FilterOptions>)
    )
)]
pub async fn filter_options(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let options = app_state.lead_service.filter_options().await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(options))))
}

// GET /api/leads/statuses
#[utoipa::path(
    get,
    path = "/api/leads/statuses",
    tag = "Leads",
    responses(
        (status = 200, description = "Categorias de lead", body = ApiResponse<Vec<LeadStatus>>)
    )
)]
pub async fn list_statuses(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let statuses = app_state.lead_service.list_statuses().await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(statuses))))
}

// =============================================================================
//  ÁREA 2: CRUD
// =============================================================================

// POST /api/leads
#[utoipa::path(
    post,
    path = "/api/leads",
    tag = "Leads",
    request_body = LeadInput,
    responses(
        (status = 201, description = "Lead criado", body = ApiResponse<LeadRecord>),
        (status = 400, description = "Dados inválidos")
    )
)]
pub async fn create_lead(
    State(app_state): State<AppState>,
    Json(payload): Json<LeadInput>,
) -> Result<impl IntoResponse, AppError> {
    let lead = app_state.lead_service.create_lead(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(lead))))
}

// GET /api/leads/{id}
#[utoipa::path(
    get,
    path = "/api/leads/{id}",
    tag = "Leads",
    params(("id" = i64, Path, description = "ID do lead")),
    responses(
        (status = 200, description = "Lead encontrado", body = ApiResponse<LeadRecord>),
        (status = 404, description = "Lead não encontrado")
    )
)]
pub async fn get_lead(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let lead = app_state.lead_service.get_lead(id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(lead))))
}

// PUT /api/leads/{id}
#[utoipa::path(
    put,
    path = "/api/leads/{id}",
    tag = "Leads",
    params(("id" = i64, Path, description = "ID do lead")),
    request_body = LeadInput,
    responses(
        (status = 200, description = "Lead atualizado", body = ApiResponse<LeadRecord>),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Lead não encontrado")
    )
)]
pub async fn update_lead(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<LeadInput>,
) -> Result<impl IntoResponse, AppError> {
    let lead = app_state.lead_service.update_lead(id, payload).await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(lead))))
}

// DELETE /api/leads/{id}
#[utoipa::path(
    delete,
    path = "/api/leads/{id}",
    tag = "Leads",
    params(("id" = i64, Path, description = "ID do lead")),
    responses(
        (status = 204, description = "Lead removido"),
        (status = 404, description = "Lead não encontrado")
    )
)]
pub async fn delete_lead(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    app_state.lead_service.delete_lead(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  ÁREA 3: EM LOTE
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdatePayload {
    #[schema(example = json!([1, 2, 3]))]
    pub ids: Vec<i64>,
    pub patch: LeadPatch,
}

// POST /api/leads/bulk-update
#[utoipa::path(
    post,
    path = "/api/leads/bulk-update",
    tag = "Leads",
    request_body = BulkUpdatePayload,
    responses(
        (status = 200, description = "Resultado por item", body = ApiResponse<BulkOutcome>),
        (status = 400, description = "Nenhum lead selecionado ou alteração vazia")
    )
)]
pub async fn bulk_update(
    State(app_state): State<AppState>,
    Json(payload): Json<BulkUpdatePayload>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = app_state
        .lead_service
        .bulk_update(&payload.ids, payload.patch)
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(outcome))))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BulkDeleteQuery {
    /// Repetido: `?ids=1&ids=2`.
    #[serde(default)]
    pub ids: Vec<i64>,
}

// DELETE /api/leads?ids=1&ids=2
#[utoipa::path(
    delete,
    path = "/api/leads",
    tag = "Leads",
    params(BulkDeleteQuery),
    responses(
        (status = 200, description = "Resultado por item", body = ApiResponse<BulkOutcome>),
        (status = 400, description = "Nenhum lead selecionado")
    )
)]
pub async fn bulk_delete(
    State(app_state): State<AppState>,
    axum_extra::extract::Query(query): axum_extra::extract::Query<BulkDeleteQuery>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = app_state.lead_service.bulk_delete(&query.ids).await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(outcome))))
}

// =============================================================================
//  ÁREA 4: IMPORTAÇÃO / EXPORTAÇÃO
// =============================================================================

/// Só para a documentação do corpo multipart (CSV, XLSX, XLS ou ODS).
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct ImportUpload {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

// POST /api/leads/import
#[utoipa::path(
    post,
    path = "/api/leads/import",
    tag = "Leads",
    request_body(content = ImportUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Resumo da importação", body = ApiResponse<ImportSummary>),
        (status = 400, description = "Arquivo ausente ou inválido")
    )
)]
pub async fn import_leads(
    State(app_state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;

        let format = ImportFormat::detect(file_name.as_deref(), content_type.as_deref(), &bytes);
        let summary = app_state.lead_service.import_leads(&bytes, format).await?;
        return Ok((StatusCode::OK, Json(ApiResponse::ok(summary))));
    }

    Err(AppError::InvalidImport("Envie a planilha no campo 'file'.".to_string()))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExportQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub format: Option<ExportFormat>,
}

// GET /api/leads/export?format=csv|xlsx
#[utoipa::path(
    get,
    path = "/api/leads/export",
    tag = "Leads",
    params(ExportQuery, LeadListQuery),
    responses(
        (status = 200, description = "Arquivo CSV ou XLSX com os leads filtrados")
    )
)]
pub async fn export_leads(
    State(app_state): State<AppState>,
    Query(export): Query<ExportQuery>,
    Query(query): Query<LeadListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let file = app_state
        .lead_service
        .export(&query.to_criteria(), export.format.unwrap_or_default())
        .await?;

    let headers = [
        (header::CONTENT_TYPE, file.content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file.file_name),
        ),
    ];
    Ok((StatusCode::OK, headers, file.bytes))
}
