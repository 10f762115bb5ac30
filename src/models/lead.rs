// src/models/lead.rs

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

// ---
// Endereço normalizado
// ---
// O endereço chega de três jeitos: objeto JSON, string com JSON dentro,
// ou só o nome da cidade. Normalizamos UMA vez, na entrada do dado.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadAddress {
    #[schema(example = "MG Road, 12")]
    pub street: Option<String>,
    #[schema(example = "Springfield")]
    pub city: Option<String>,
    #[schema(example = "IL")]
    pub state: Option<String>,
    pub country: Option<String>,
    #[schema(example = "560001")]
    pub pincode: Option<String>,
}

impl LeadAddress {
    /// Endereço vindo como texto livre.
    ///
    /// Se parece JSON (`{` ou `[`), tentamos o parse; se falhar, o texto
    /// inteiro vira o nome da cidade.
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            return match serde_json::from_str::<Value>(trimmed) {
                Ok(Value::Object(obj)) => Self::from_object(&obj),
                // Array ou outro JSON válido: nenhum campo reconhecível.
                Ok(_) => Self::default(),
                Err(_) => Self::plain_city(raw),
            };
        }
        Self::plain_city(raw)
    }

    /// Endereço vindo de um valor JSON qualquer (payload ou coluna JSONB).
    pub fn from_value(raw: &Value) -> Self {
        match raw {
            Value::String(text) => Self::from_text(text),
            Value::Object(obj) => Self::from_object(obj),
            _ => Self::default(),
        }
    }

    pub fn from_object(obj: &Map<String, Value>) -> Self {
        let street = ["street", "address", "line1"]
            .iter()
            .find_map(|key| text_field(obj, key));

        Self {
            street,
            city: text_field(obj, "city"),
            state: text_field(obj, "state"),
            country: text_field(obj, "country"),
            pincode: text_field(obj, "pincode"),
        }
    }

    // Texto original, sem aparar: é o que a busca compara.
    fn plain_city(raw: &str) -> Self {
        Self {
            city: (!raw.trim().is_empty()).then(|| raw.to_string()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.street.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.country.is_none()
            && self.pincode.is_none()
    }

    /// Campos na ordem em que a busca textual os consulta.
    pub fn searchable_fields(&self) -> [Option<&str>; 5] {
        [
            self.street.as_deref(),
            self.city.as_deref(),
            self.state.as_deref(),
            self.country.as_deref(),
            self.pincode.as_deref(),
        ]
    }
}

fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => non_empty(s),
        // Pincode às vezes vem como número: 560001
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn clean(value: Option<String>) -> Option<String> {
    value.as_deref().and_then(non_empty)
}

// ---
// LeadRecord (O Dado)
// ---
// Modelo de leitura. O motor de filtros só lê, nunca altera.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadRecord {
    #[schema(example = 42)]
    pub id: i64,
    #[schema(example = "Ravi Kumar")]
    pub customer_name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub whatsapp_number: Option<String>,
    /// Nome da loja.
    #[schema(example = "Kumar General Store")]
    pub requirements: Option<String>,
    pub source_column: Option<String>,
    pub address: LeadAddress,
    pub status_id: Option<i64>,
    pub status_name: Option<String>,
    pub assigned_to: Option<String>,
    #[schema(example = "2025-01-20")]
    pub follow_up_date: Option<String>,
    #[schema(example = "2025-01-10")]
    pub created_at: Option<String>,
    #[schema(example = "2025-01-12 09:30:00")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadStatus {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "New")]
    pub name: String,
}

// ---
// Payloads de escrita
// ---

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadInput {
    #[validate(length(min = 1, message = "O nome do cliente é obrigatório."))]
    #[schema(example = "Ravi Kumar")]
    pub customer_name: String,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    #[schema(example = "ravi@example.com")]
    pub email: Option<String>,

    pub contact: Option<String>,
    pub whatsapp_number: Option<String>,

    #[schema(example = "Kumar General Store")]
    pub requirements: Option<String>,
    pub source_column: Option<String>,

    /// Objeto `{street, city, state, country, pincode}`, string JSON ou nome da cidade.
    #[schema(value_type = Option<Object>, example = json!({"city": "Springfield", "state": "IL"}))]
    pub address: Option<Value>,

    pub status_id: Option<i64>,
    pub assigned_to: Option<String>,

    #[schema(value_type = Option<String>, format = Date, example = "2025-01-20")]
    pub follow_up_date: Option<NaiveDate>,
}

impl LeadInput {
    /// Apara espaços e troca strings vazias por `None` antes da validação.
    pub fn normalized(self) -> Self {
        Self {
            customer_name: self.customer_name.trim().to_string(),
            email: clean(self.email),
            contact: clean(self.contact),
            whatsapp_number: clean(self.whatsapp_number),
            requirements: clean(self.requirements),
            source_column: clean(self.source_column),
            address: self.address,
            status_id: self.status_id,
            assigned_to: clean(self.assigned_to),
            follow_up_date: self.follow_up_date,
        }
    }

    /// Fronteira de ingestão: o endereço sai daqui já normalizado.
    pub fn into_draft(self) -> LeadDraft {
        let address = self
            .address
            .as_ref()
            .map(LeadAddress::from_value)
            .unwrap_or_default();

        LeadDraft {
            customer_name: self.customer_name,
            email: self.email,
            contact: self.contact,
            whatsapp_number: self.whatsapp_number,
            requirements: self.requirements,
            source_column: self.source_column,
            address,
            status_id: self.status_id,
            assigned_to: self.assigned_to,
            follow_up_date: self.follow_up_date,
        }
    }
}

/// O que efetivamente vai para o banco em create/update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadDraft {
    pub customer_name: String,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub whatsapp_number: Option<String>,
    pub requirements: Option<String>,
    pub source_column: Option<String>,
    pub address: LeadAddress,
    pub status_id: Option<i64>,
    pub assigned_to: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
}

/// Edição em massa: só os campos presentes são alterados.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadPatch {
    pub status_id: Option<i64>,
    pub assigned_to: Option<String>,
    #[schema(value_type = Option<String>, format = Date)]
    pub follow_up_date: Option<NaiveDate>,
    pub source_column: Option<String>,
}

impl LeadPatch {
    pub fn normalized(self) -> Self {
        Self {
            status_id: self.status_id,
            assigned_to: clean(self.assigned_to),
            follow_up_date: self.follow_up_date,
            source_column: clean(self.source_column),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status_id.is_none()
            && self.assigned_to.is_none()
            && self.follow_up_date.is_none()
            && self.source_column.is_none()
    }
}

// ---
// Resultados de operações em lote
// ---

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkFailure {
    pub id: i64,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkOutcome {
    pub requested: usize,
    pub succeeded: Vec<i64>,
    pub failed: Vec<BulkFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportFailure {
    /// Linha do arquivo (o cabeçalho é a linha 1).
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub total_rows: usize,
    pub imported: Vec<i64>,
    pub failed: Vec<ImportFailure>,
}

/// Fontes dos dropdowns de filtro, derivadas dos próprios registros.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub customer_names: Vec<String>,
    pub cities: Vec<String>,
    pub requirements: Vec<String>,
    pub assignees: Vec<String>,
    pub follow_up_dates: Vec<String>,
    pub statuses: Vec<LeadStatus>,
}

impl FilterOptions {
    pub fn collect(records: &[LeadRecord], statuses: Vec<LeadStatus>) -> Self {
        fn distinct<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
            values
                .flatten()
                .filter_map(non_empty)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        }

        Self {
            customer_names: distinct(records.iter().map(|r| r.customer_name.as_deref())),
            cities: distinct(records.iter().map(|r| r.address.city.as_deref())),
            requirements: distinct(records.iter().map(|r| r.requirements.as_deref())),
            assignees: distinct(records.iter().map(|r| r.assigned_to.as_deref())),
            follow_up_dates: distinct(records.iter().map(|r| r.follow_up_date.as_deref())),
            statuses,
        }
    }
}
