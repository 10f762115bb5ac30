// src/docs.rs

use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Leads ---
        handlers::leads::list_leads,
        handlers::leads::filter_options,
        handlers::leads::list_statuses,
        handlers::leads::create_lead,
        handlers::leads::get_lead,
        handlers::leads::update_lead,
        handlers::leads::delete_lead,
        handlers::leads::bulk_update,
        handlers::leads::bulk_delete,
        handlers::leads::import_leads,
        handlers::leads::export_leads,

        // --- Locations ---
        handlers::locations::list_locations,
    ),
    components(
        schemas(
            // --- Leads ---
            models::lead::LeadAddress,
            models::lead::LeadRecord,
            models::lead::LeadStatus,
            models::lead::LeadInput,
            models::lead::LeadPatch,
            models::lead::BulkFailure,
            models::lead::BulkOutcome,
            models::lead::ImportFailure,
            models::lead::ImportSummary,
            models::lead::FilterOptions,
            models::filter::DateRangeKind,

            // --- Payloads ---
            handlers::leads::BulkUpdatePayload,
            handlers::leads::ImportUpload,

            // --- Locations ---
            models::location::LocationLevel,
            models::location::LocationNode,
        )
    ),
    tags(
        (name = "Leads", description = "Listagem, filtros e gestão de leads"),
        (name = "Locations", description = "Seletores de localidade em cascata")
    )
)]
pub struct ApiDoc;
