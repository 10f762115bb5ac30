// src/services/lead_service.rs

use std::{collections::HashSet, sync::Arc};

use chrono::Local;
use validator::Validate;

use crate::{
    common::{error::AppError, pagination::Page},
    db::LeadStore,
    models::{
        filter::FilterCriteria,
        lead::{
            BulkFailure, BulkOutcome, FilterOptions, ImportFailure, ImportSummary, LeadInput,
            LeadPatch, LeadRecord, LeadStatus,
        },
    },
    services::{
        date_range::parse_loose,
        lead_filter::RecordFilterEngine,
        spreadsheet::{self, ExportFile, ExportFormat, ImportFormat, ImportedRow},
    },
};

/// Limites de listagem e importação (vêm do AppConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadLimits {
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub max_import_rows: usize,
}

impl Default for LeadLimits {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
            max_import_rows: 5000,
        }
    }
}

#[derive(Clone)]
pub struct LeadService {
    store: Arc<dyn LeadStore>,
    limits: LeadLimits,
}

impl LeadService {
    pub fn new(store: Arc<dyn LeadStore>, limits: LeadLimits) -> Self {
        Self { store, limits }
    }

    // =========================================================================
    //  1. LISTAGEM
    // =========================================================================

    /// Busca a coleção inteira, filtra em memória e pagina.
    pub async fn list_leads(
        &self,
        criteria: &FilterCriteria,
        page: Option<usize>,
        per_page: Option<usize>,
    ) -> Result<Page<LeadRecord>, AppError> {
        let records = self.store.list_leads().await?;
        let total = records.len();
        let filtered = if criteria.is_permissive() {
            records
        } else {
            RecordFilterEngine::new().filter_vec(records, criteria)
        };

        tracing::debug!("Filtro de leads: {} de {} registros", filtered.len(), total);

        Ok(Page::paginate(
            filtered,
            page.unwrap_or(1),
            per_page.unwrap_or(self.limits.default_page_size),
            self.limits.max_page_size,
        ))
    }

    pub async fn filter_options(&self) -> Result<FilterOptions, AppError> {
        let records = self.store.list_leads().await?;
        let statuses = self.store.list_statuses().await?;
        Ok(FilterOptions::collect(&records, statuses))
    }

    pub async fn list_statuses(&self) -> Result<Vec<LeadStatus>, AppError> {
        self.store.list_statuses().await
    }

    // =========================================================================
    //  2. CRUD
    // =========================================================================

    pub async fn get_lead(&self, id: i64) -> Result<LeadRecord, AppError> {
        self.store
            .find_lead(id)
            .await?
            .ok_or(AppError::LeadNotFound(id))
    }

    pub async fn create_lead(&self, input: LeadInput) -> Result<LeadRecord, AppError> {
        let input = input.normalized();
        input.validate()?;
        self.ensure_status_exists(input.status_id).await?;

        let lead = self.store.insert_lead(&input.into_draft()).await?;
        tracing::info!("Lead {} criado", lead.id);
        Ok(lead)
    }

    pub async fn update_lead(&self, id: i64, input: LeadInput) -> Result<LeadRecord, AppError> {
        let input = input.normalized();
        input.validate()?;
        self.ensure_status_exists(input.status_id).await?;

        self.store
            .update_lead(id, &input.into_draft())
            .await?
            .ok_or(AppError::LeadNotFound(id))
    }

    pub async fn delete_lead(&self, id: i64) -> Result<(), AppError> {
        if !self.store.delete_lead(id).await? {
            return Err(AppError::LeadNotFound(id));
        }
        tracing::info!("Lead {} removido", id);
        Ok(())
    }

    // =========================================================================
    //  3. OPERAÇÕES EM LOTE
    // =========================================================================
    // Uma mutação por vez. Falha de um item entra no resumo e o lote segue.

    pub async fn bulk_update(&self, ids: &[i64], patch: LeadPatch) -> Result<BulkOutcome, AppError> {
        let ids = distinct_ids(ids)?;
        let patch = patch.normalized();
        if patch.is_empty() {
            return Err(field_error("patch", "empty_patch", "Informe ao menos um campo para alterar."));
        }
        self.ensure_status_exists(patch.status_id).await?;

        let mut outcome = BulkOutcome {
            requested: ids.len(),
            ..BulkOutcome::default()
        };

        for id in ids {
            match self.store.patch_lead(id, &patch).await {
                Ok(Some(_)) => outcome.succeeded.push(id),
                Ok(None) => outcome.failed.push(not_found(id)),
                Err(e) => {
                    tracing::warn!("Falha ao atualizar lead {}: {}", id, e);
                    outcome.failed.push(BulkFailure { id, reason: e.to_string() });
                }
            }
        }

        tracing::info!(
            "Edição em massa: {} atualizados, {} falhas",
            outcome.succeeded.len(),
            outcome.failed.len()
        );
        Ok(outcome)
    }

    pub async fn bulk_delete(&self, ids: &[i64]) -> Result<BulkOutcome, AppError> {
        let ids = distinct_ids(ids)?;
        let mut outcome = BulkOutcome {
            requested: ids.len(),
            ..BulkOutcome::default()
        };

        for id in ids {
            match self.store.delete_lead(id).await {
                Ok(true) => outcome.succeeded.push(id),
                Ok(false) => outcome.failed.push(not_found(id)),
                Err(e) => {
                    tracing::warn!("Falha ao remover lead {}: {}", id, e);
                    outcome.failed.push(BulkFailure { id, reason: e.to_string() });
                }
            }
        }

        tracing::info!(
            "Remoção em massa: {} removidos, {} falhas",
            outcome.succeeded.len(),
            outcome.failed.len()
        );
        Ok(outcome)
    }

    // =========================================================================
    //  4. IMPORTAÇÃO / EXPORTAÇÃO
    // =========================================================================

    pub async fn import_leads(&self, bytes: &[u8], format: ImportFormat) -> Result<ImportSummary, AppError> {
        let import = spreadsheet::parse_leads(bytes, format, self.limits.max_import_rows)?;
        let statuses = self.store.list_statuses().await?;

        let mut summary = ImportSummary {
            total_rows: import.total_rows(),
            imported: Vec::new(),
            failed: import.broken,
        };

        for row in import.rows {
            let line = row.line;
            let input = match row_to_input(row, &statuses) {
                Ok(input) => input,
                Err(reason) => {
                    summary.failed.push(ImportFailure { line, reason });
                    continue;
                }
            };

            match self.store.insert_lead(&input.into_draft()).await {
                Ok(lead) => summary.imported.push(lead.id),
                Err(e) => {
                    tracing::warn!("Falha ao importar linha {}: {}", line, e);
                    summary.failed.push(ImportFailure { line, reason: e.to_string() });
                }
            }
        }

        summary.failed.sort_by_key(|failure| failure.line);
        tracing::info!(
            "Importação: {} de {} linhas importadas",
            summary.imported.len(),
            summary.total_rows
        );
        Ok(summary)
    }

    /// Exporta o conjunto filtrado inteiro (sem paginação).
    pub async fn export(&self, criteria: &FilterCriteria, format: ExportFormat) -> Result<ExportFile, AppError> {
        let records = self.store.list_leads().await?;
        let filtered = RecordFilterEngine::new().filter_vec(records, criteria);

        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let file = spreadsheet::export_leads(&filtered, format, &stamp)?;

        tracing::info!("Exportação {:?}: {} leads", format, filtered.len());
        Ok(file)
    }

    async fn ensure_status_exists(&self, status_id: Option<i64>) -> Result<(), AppError> {
        let Some(status_id) = status_id else {
            return Ok(());
        };

        let statuses = self.store.list_statuses().await?;
        if statuses.iter().any(|s| s.id == status_id) {
            Ok(())
        } else {
            Err(field_error("statusId", "unknown_status", "Status inexistente."))
        }
    }
}

/// Remove repetidos mantendo a ordem da primeira ocorrência.
fn distinct_ids(ids: &[i64]) -> Result<Vec<i64>, AppError> {
    if ids.is_empty() {
        return Err(AppError::EmptySelection);
    }
    let mut seen = HashSet::new();
    Ok(ids.iter().copied().filter(|id| seen.insert(*id)).collect())
}

fn not_found(id: i64) -> BulkFailure {
    BulkFailure {
        id,
        reason: AppError::LeadNotFound(id).to_string(),
    }
}

fn field_error(field: &'static str, code: &'static str, message: &'static str) -> AppError {
    let mut errors = validator::ValidationErrors::new();
    let mut error = validator::ValidationError::new(code);
    error.message = Some(message.into());
    errors.add(field, error);
    AppError::ValidationError(errors)
}

fn row_to_input(row: ImportedRow, statuses: &[LeadStatus]) -> Result<LeadInput, String> {
    let status_id = match row.status.as_deref() {
        None => None,
        Some(name) => Some(
            statuses
                .iter()
                .find(|s| s.name.eq_ignore_ascii_case(name))
                .map(|s| s.id)
                .ok_or_else(|| format!("Status desconhecido: '{}'", name))?,
        ),
    };

    let follow_up_date = match row.follow_up_date.as_deref() {
        None => None,
        Some(raw) => Some(
            parse_loose(raw)
                .map(|at| at.date())
                .ok_or_else(|| format!("Data de follow-up inválida: '{}'", raw))?,
        ),
    };

    let address = (!row.address.is_empty())
        .then(|| serde_json::to_value(&row.address))
        .transpose()
        .map_err(|e| e.to_string())?;

    let input = LeadInput {
        customer_name: row.customer_name.unwrap_or_default(),
        email: row.email,
        contact: row.contact,
        whatsapp_number: row.whatsapp_number,
        requirements: row.requirements,
        source_column: row.source_column,
        address,
        status_id,
        assigned_to: row.assigned_to,
        follow_up_date,
    }
    .normalized();

    input.validate().map_err(|errors| {
        errors
            .field_errors()
            .into_iter()
            .map(|(field, _)| format!("Campo inválido: {}", field))
            .collect::<Vec<_>>()
            .join("; ")
    })?;

    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::filter::{DateRange, FieldFilter},
        tests::utils::InMemoryLeadStore,
    };

    fn service(store: Arc<InMemoryLeadStore>) -> LeadService {
        LeadService::new(store, LeadLimits::default())
    }

    fn input(name: &str) -> LeadInput {
        LeadInput {
            customer_name: name.to_string(),
            ..LeadInput::default()
        }
    }

    async fn seeded(names: &[&str]) -> (Arc<InMemoryLeadStore>, LeadService, Vec<i64>) {
        let store = Arc::new(InMemoryLeadStore::default());
        let service = service(store.clone());
        let mut ids = Vec::new();
        for name in names {
            ids.push(service.create_lead(input(name)).await.unwrap().id);
        }
        (store, service, ids)
    }

    #[tokio::test]
    async fn create_normalizes_address_at_ingestion() {
        let (_, service, _) = seeded(&[]).await;
        let lead = service
            .create_lead(LeadInput {
                address: Some(serde_json::json!(r#"{"city":"Springfield","state":"IL"}"#)),
                ..input("Ravi")
            })
            .await
            .unwrap();

        assert_eq!(lead.address.city.as_deref(), Some("Springfield"));
        assert_eq!(lead.address.state.as_deref(), Some("IL"));
    }

    #[tokio::test]
    async fn create_rejects_blank_name_and_unknown_status() {
        let (_, service, _) = seeded(&[]).await;

        let blank = service.create_lead(input("   ")).await;
        assert!(matches!(blank, Err(AppError::ValidationError(_))));

        let unknown = service
            .create_lead(LeadInput { status_id: Some(999), ..input("Ravi") })
            .await;
        assert!(matches!(unknown, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn missing_leads_are_not_found() {
        let (_, service, _) = seeded(&[]).await;
        assert!(matches!(service.get_lead(41).await, Err(AppError::LeadNotFound(41))));
        assert!(matches!(service.update_lead(41, input("x")).await, Err(AppError::LeadNotFound(41))));
        assert!(matches!(service.delete_lead(41).await, Err(AppError::LeadNotFound(41))));
    }

    #[tokio::test]
    async fn list_filters_then_paginates() {
        let (_, service, _) = seeded(&["Ravi", "Meera", "Ravindra", "Arjun"]).await;
        let criteria = FilterCriteria::default().with_search("rav");

        let page = service.list_leads(&criteria, Some(1), Some(1)).await.unwrap();
        assert_eq!(page.total_items, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 1);
    }

    #[tokio::test]
    async fn bulk_update_keeps_going_after_failures() {
        let (store, service, ids) = seeded(&["A", "B", "C"]).await;
        store.fail_on(ids[1]);

        let patch = LeadPatch {
            assigned_to: Some("Asha".to_string()),
            ..LeadPatch::default()
        };
        let outcome = service
            .bulk_update(&[ids[0], ids[1], 404, ids[2], ids[0]], patch)
            .await
            .unwrap();

        assert_eq!(outcome.requested, 4);
        assert_eq!(outcome.succeeded, vec![ids[0], ids[2]]);
        let failed: Vec<i64> = outcome.failed.iter().map(|f| f.id).collect();
        assert_eq!(failed, vec![ids[1], 404]);

        let updated = service.get_lead(ids[2]).await.unwrap();
        assert_eq!(updated.assigned_to.as_deref(), Some("Asha"));
    }

    #[tokio::test]
    async fn bulk_update_validates_request() {
        let (_, service, ids) = seeded(&["A"]).await;

        let empty_ids = service.bulk_update(&[], LeadPatch::default()).await;
        assert!(matches!(empty_ids, Err(AppError::EmptySelection)));

        let empty_patch = service.bulk_update(&ids, LeadPatch::default()).await;
        assert!(matches!(empty_patch, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn bulk_delete_reports_each_item() {
        let (store, service, ids) = seeded(&["A", "B", "C"]).await;
        store.fail_on(ids[2]);

        let outcome = service.bulk_delete(&[ids[0], 999, ids[2]]).await.unwrap();
        assert_eq!(outcome.succeeded, vec![ids[0]]);
        assert_eq!(outcome.failed.len(), 2);
        assert!(outcome.failed[0].reason.contains("999"));

        let remaining = service.list_leads(&FilterCriteria::default(), None, None).await.unwrap();
        assert_eq!(remaining.total_items, 2);
    }

    #[tokio::test]
    async fn import_creates_good_rows_and_reports_bad_ones() {
        let (_, service, _) = seeded(&[]).await;
        let csv = "Customer Name,Email,City,Status,Follow Up Date\n\
                   Ravi,ravi@example.com,Pune,new,2025-01-20\n\
                   ,nobody@example.com,Pune,,\n\
                   Meera,meera@example.com,Mumbai,Mystery,\n\
                   Arjun,arjun@example.com,Delhi,,someday\n\
                   Kiran,not-an-email,Goa,,\n\
                   Asha,,Pune,Contacted,2025/02/01\n";

        let summary = service.import_leads(csv.as_bytes(), ImportFormat::Csv).await.unwrap();
        assert_eq!(summary.total_rows, 6);
        assert_eq!(summary.imported.len(), 2);

        let lines: Vec<u64> = summary.failed.iter().map(|f| f.line).collect();
        assert_eq!(lines, vec![3, 4, 5, 6]);

        let mut criteria = FilterCriteria::default();
        criteria.field_filters.city = FieldFilter::from("pune");
        let page = service.list_leads(&criteria, None, None).await.unwrap();
        assert_eq!(page.total_items, 2);
        let follow_ups: Vec<Option<String>> = page.items.iter().map(|l| l.follow_up_date.clone()).collect();
        assert!(follow_ups.contains(&Some("2025-01-20".to_string())));
        assert!(follow_ups.contains(&Some("2025-02-01".to_string())));
    }

    #[tokio::test]
    async fn export_contains_only_filtered_leads() {
        let (_, service, _) = seeded(&["Ravi", "Meera"]).await;
        let criteria = FilterCriteria::default().with_search("meera");

        let file = service.export(&criteria, ExportFormat::Csv).await.unwrap();
        let text = String::from_utf8(file.bytes).unwrap();
        assert!(file.file_name.ends_with(".csv"));
        assert!(text.contains("Meera"));
        assert!(!text.contains("Ravi"));
    }

    #[tokio::test]
    async fn created_range_uses_store_dates() {
        let (_, service, _) = seeded(&["Ravi"]).await;
        let mut criteria = FilterCriteria::default();
        criteria.created_range = DateRange::Custom {
            from: chrono::NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            to: chrono::NaiveDate::from_ymd_opt(2000, 1, 2).unwrap(),
        };
        let page = service.list_leads(&criteria, None, None).await.unwrap();
        assert_eq!(page.total_items, 0);
    }

    #[tokio::test]
    async fn filter_options_include_statuses() {
        let (_, service, _) = seeded(&["Ravi"]).await;
        let options = service.filter_options().await.unwrap();
        assert_eq!(options.customer_names, vec!["Ravi"]);
        assert!(!options.statuses.is_empty());
    }
}
