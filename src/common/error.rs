// src/common/error.rs

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Lead {0} não encontrado")]
    LeadNotFound(i64),

    #[error("Nenhum lead selecionado")]
    EmptySelection,

    #[error("Arquivo de importação inválido: {0}")]
    InvalidImport(String),

    #[error("Consulta de localidade inválida: {0}")]
    InvalidLocationQuery(String),

    #[error("Upload inválido: {0}")]
    InvalidMultipart(#[from] MultipartError),

    #[error("Erro de CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Erro de XLSX: {0}")]
    XlsxError(#[from] rust_xlsxwriter::XlsxError),

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // `anyhow::Error` carrega o contexto do erro inesperado.
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::LeadNotFound(id) => (StatusCode::NOT_FOUND, format!("Lead {} não encontrado.", id)),
            AppError::EmptySelection => (StatusCode::BAD_REQUEST, "Selecione ao menos um lead.".to_string()),
            AppError::InvalidImport(reason) => (StatusCode::BAD_REQUEST, reason),
            AppError::InvalidLocationQuery(reason) => (StatusCode::BAD_REQUEST, reason),
            AppError::InvalidMultipart(e) => (StatusCode::BAD_REQUEST, e.body_text()),

            // Todos os outros erros (CSV, XLSX, banco, interno) viram 500.
            // O `tracing` loga a mensagem detalhada que o `thiserror` montou.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Ocorreu um erro inesperado.".to_string())
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
