// src/services/spreadsheet.rs

use std::{collections::HashMap, io::Cursor, str::FromStr};

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::NaiveTime;
use rust_xlsxwriter::{Format, Workbook};
use serde::{de::IntoDeserializer, Deserialize};
use utoipa::ToSchema;

use crate::{
    common::error::AppError,
    models::lead::{non_empty, ImportFailure, LeadAddress, LeadRecord},
};

// =========================================================================
//  COLUNAS
// =========================================================================

/// Colunas conhecidas da planilha de leads. A exportação escreve todas,
/// a importação lê as que reconhecer pelo cabeçalho.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeadColumn {
    Id,
    CustomerName,
    Email,
    Contact,
    WhatsappNumber,
    Requirements,
    Source,
    Address,
    Street,
    City,
    State,
    Country,
    Pincode,
    Status,
    AssignedTo,
    FollowUpDate,
    CreatedAt,
    UpdatedAt,
}

const EXPORT_COLUMNS: &[LeadColumn] = &[
    LeadColumn::Id,
    LeadColumn::CustomerName,
    LeadColumn::Email,
    LeadColumn::Contact,
    LeadColumn::WhatsappNumber,
    LeadColumn::Requirements,
    LeadColumn::Source,
    LeadColumn::Street,
    LeadColumn::City,
    LeadColumn::State,
    LeadColumn::Country,
    LeadColumn::Pincode,
    LeadColumn::Status,
    LeadColumn::AssignedTo,
    LeadColumn::FollowUpDate,
    LeadColumn::CreatedAt,
    LeadColumn::UpdatedAt,
];

impl LeadColumn {
    pub fn header(self) -> &'static str {
        match self {
            LeadColumn::Id => "ID",
            LeadColumn::CustomerName => "Customer Name",
            LeadColumn::Email => "Email",
            LeadColumn::Contact => "Contact",
            LeadColumn::WhatsappNumber => "WhatsApp Number",
            LeadColumn::Requirements => "Shop Name",
            LeadColumn::Source => "Source",
            LeadColumn::Address => "Address",
            LeadColumn::Street => "Street",
            LeadColumn::City => "City",
            LeadColumn::State => "State",
            LeadColumn::Country => "Country",
            LeadColumn::Pincode => "Pincode",
            LeadColumn::Status => "Status",
            LeadColumn::AssignedTo => "Assigned To",
            LeadColumn::FollowUpDate => "Follow Up Date",
            LeadColumn::CreatedAt => "Created At",
            LeadColumn::UpdatedAt => "Updated At",
        }
    }

    /// Reconhece o cabeçalho ignorando caixa, espaços, `_` e `-`.
    pub fn from_header(raw: &str) -> Option<Self> {
        let key: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        let column = match key.as_str() {
            "id" => LeadColumn::Id,
            "customername" | "name" | "customer" | "ownername" | "shopowner" => LeadColumn::CustomerName,
            "email" | "emailaddress" => LeadColumn::Email,
            "contact" | "contactnumber" | "phone" | "phonenumber" | "mobile" => LeadColumn::Contact,
            "whatsappnumber" | "whatsapp" => LeadColumn::WhatsappNumber,
            "shopname" | "requirements" | "requirement" => LeadColumn::Requirements,
            "source" | "sourcecolumn" => LeadColumn::Source,
            "address" => LeadColumn::Address,
            "street" | "streetaddress" | "addressline" => LeadColumn::Street,
            "city" => LeadColumn::City,
            "state" => LeadColumn::State,
            "country" => LeadColumn::Country,
            "pincode" | "zip" | "zipcode" | "postalcode" => LeadColumn::Pincode,
            "status" | "statusname" | "leadstatus" => LeadColumn::Status,
            "assignedto" | "assignee" | "salesperson" => LeadColumn::AssignedTo,
            "followupdate" | "followup" => LeadColumn::FollowUpDate,
            "createdat" | "created" => LeadColumn::CreatedAt,
            "updatedat" | "updated" => LeadColumn::UpdatedAt,
            _ => return None,
        };
        Some(column)
    }

    fn value(self, record: &LeadRecord) -> String {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        match self {
            LeadColumn::Id => record.id.to_string(),
            LeadColumn::CustomerName => text(&record.customer_name),
            LeadColumn::Email => text(&record.email),
            LeadColumn::Contact => text(&record.contact),
            LeadColumn::WhatsappNumber => text(&record.whatsapp_number),
            LeadColumn::Requirements => text(&record.requirements),
            LeadColumn::Source => text(&record.source_column),
            LeadColumn::Address => String::new(),
            LeadColumn::Street => text(&record.address.street),
            LeadColumn::City => text(&record.address.city),
            LeadColumn::State => text(&record.address.state),
            LeadColumn::Country => text(&record.address.country),
            LeadColumn::Pincode => text(&record.address.pincode),
            LeadColumn::Status => text(&record.status_name),
            LeadColumn::AssignedTo => text(&record.assigned_to),
            LeadColumn::FollowUpDate => text(&record.follow_up_date),
            LeadColumn::CreatedAt => text(&record.created_at),
            LeadColumn::UpdatedAt => text(&record.updated_at),
        }
    }
}

// =========================================================================
//  EXPORTAÇÃO
// =========================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
}

impl FromStr for ExportFormat {
    type Err = serde::de::value::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::deserialize(raw.into_deserializer())
    }
}

#[derive(Debug, Clone)]
pub struct ExportFile {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub file_name: String,
}

pub fn export_leads(records: &[LeadRecord], format: ExportFormat, stamp: &str) -> Result<ExportFile, AppError> {
    match format {
        ExportFormat::Csv => Ok(ExportFile {
            bytes: write_csv(records)?,
            content_type: "text/csv; charset=utf-8",
            file_name: format!("leads_{}.csv", stamp),
        }),
        ExportFormat::Xlsx => Ok(ExportFile {
            bytes: write_xlsx(records)?,
            content_type: "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            file_name: format!("leads_{}.xlsx", stamp),
        }),
    }
}

pub fn write_csv(records: &[LeadRecord]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_COLUMNS.iter().map(|c| c.header()))?;

    for record in records {
        writer.write_record(EXPORT_COLUMNS.iter().map(|c| c.value(record)))?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::InternalServerError(anyhow::anyhow!("Falha ao finalizar CSV: {}", e.error())))
}

pub fn write_xlsx(records: &[LeadRecord]) -> Result<Vec<u8>, AppError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Leads")?;

    let bold = Format::new().set_bold();
    for (col, column) in EXPORT_COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, column.header(), &bold)?;
    }

    for (i, record) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        for (col, column) in EXPORT_COLUMNS.iter().enumerate() {
            match column {
                LeadColumn::Id => {
                    worksheet.write_number(row, col as u16, record.id as f64)?;
                }
                other => {
                    worksheet.write_string(row, col as u16, other.value(record))?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

// =========================================================================
//  IMPORTAÇÃO
// =========================================================================

/// Formato do arquivo enviado para importação.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Csv,
    /// `.xlsx`, `.xls` ou `.ods` (lidos pelo calamine).
    Workbook,
}

impl ImportFormat {
    /// Decide pelo nome do arquivo, depois pelo content type e, por fim,
    /// pela assinatura dos bytes (ZIP ou OLE). Na dúvida, CSV.
    pub fn detect(file_name: Option<&str>, content_type: Option<&str>, bytes: &[u8]) -> Self {
        let extension = file_name
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("xlsx" | "xlsm" | "xls" | "ods") => return ImportFormat::Workbook,
            Some("csv" | "txt") => return ImportFormat::Csv,
            _ => {}
        }

        if let Some(content_type) = content_type {
            if content_type.contains("spreadsheet") || content_type.contains("ms-excel") {
                return ImportFormat::Workbook;
            }
            if content_type.contains("csv") {
                return ImportFormat::Csv;
            }
        }

        if bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0]) {
            ImportFormat::Workbook
        } else {
            ImportFormat::Csv
        }
    }
}

/// Uma linha da planilha, ainda sem resolver status nem data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedRow {
    pub line: u64,
    pub customer_name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub whatsapp_number: Option<String>,
    pub requirements: Option<String>,
    pub source_column: Option<String>,
    pub address: LeadAddress,
    pub status: Option<String>,
    pub assigned_to: Option<String>,
    pub follow_up_date: Option<String>,
}

#[derive(Debug, Default)]
pub struct SheetImport {
    pub rows: Vec<ImportedRow>,
    /// Linhas que o leitor não conseguiu decodificar.
    pub broken: Vec<ImportFailure>,
}

impl SheetImport {
    pub fn total_rows(&self) -> usize {
        self.rows.len() + self.broken.len()
    }

    fn check_cap(&self, max_rows: usize) -> Result<(), AppError> {
        if self.total_rows() >= max_rows {
            return Err(AppError::InvalidImport(format!(
                "A planilha excede o limite de {} linhas.",
                max_rows
            )));
        }
        Ok(())
    }
}

pub fn parse_leads(bytes: &[u8], format: ImportFormat, max_rows: usize) -> Result<SheetImport, AppError> {
    match format {
        ImportFormat::Csv => parse_leads_csv(bytes, max_rows),
        ImportFormat::Workbook => parse_leads_workbook(bytes, max_rows),
    }
}

pub fn parse_leads_csv(bytes: &[u8], max_rows: usize) -> Result<SheetImport, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let columns = map_headers(reader.headers()?.iter())?;

    let mut import = SheetImport::default();
    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                import.broken.push(ImportFailure {
                    line: e.position().map(|p| line_at(bytes, p)).unwrap_or_default(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        import.check_cap(max_rows)?;

        let line = record.position().map(|p| line_at(bytes, p)).unwrap_or_default();
        import.rows.push(build_row(line, |column| {
            columns
                .get(&column)
                .and_then(|&index| record.get(index))
                .and_then(non_empty)
        }));
    }

    Ok(import)
}

// `Position::line()` do csv não conta o `\r\n` do cabeçalho; contamos as quebras até o byte.
fn line_at(bytes: &[u8], position: &csv::Position) -> u64 {
    let offset = (position.byte() as usize).min(bytes.len());
    1 + bytes[..offset].iter().filter(|&&b| b == b'\n').count() as u64
}

/// Primeira planilha da pasta de trabalho. A linha reportada é a do Excel.
pub fn parse_leads_workbook(bytes: &[u8], max_rows: usize) -> Result<SheetImport, AppError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| AppError::InvalidImport(format!("Planilha ilegível: {}", e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::InvalidImport("A planilha não tem abas.".to_string()))?
        .map_err(|e| AppError::InvalidImport(format!("Planilha ilegível: {}", e)))?;

    let first_row = range.start().map(|(row, _)| u64::from(row)).unwrap_or_default();
    let mut rows = range.rows();

    let header: Vec<String> = rows
        .next()
        .map(|cells| cells.iter().map(|c| cell_text(c).unwrap_or_default()).collect())
        .unwrap_or_default();
    let columns = map_headers(header.iter().map(String::as_str))?;

    let mut import = SheetImport::default();
    for (index, cells) in rows.enumerate() {
        let values: Vec<Option<String>> = cells.iter().map(cell_text).collect();
        if values.iter().all(Option::is_none) {
            continue;
        }
        import.check_cap(max_rows)?;

        // +1 do cabeçalho, +1 porque o Excel conta a partir de 1.
        let line = first_row + index as u64 + 2;
        import.rows.push(build_row(line, |column| {
            columns
                .get(&column)
                .and_then(|&index| values.get(index))
                .cloned()
                .flatten()
        }));
    }

    Ok(import)
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::String(text) | Data::DateTimeIso(text) | Data::DurationIso(text) => non_empty(text),
        Data::Int(value) => Some(value.to_string()),
        // Telefones e ids chegam como float: 9876543210.0
        Data::Float(value) if value.fract() == 0.0 && value.abs() < 1e15 => Some(format!("{}", *value as i64)),
        Data::Float(value) => Some(value.to_string()),
        Data::Bool(value) => Some(value.to_string()),
        Data::DateTime(value) => value.as_datetime().map(|at| {
            if at.time() == NaiveTime::MIN {
                at.format("%Y-%m-%d").to_string()
            } else {
                at.format("%Y-%m-%d %H:%M:%S").to_string()
            }
        }),
        Data::Empty | Data::Error(_) => None,
    }
}

fn map_headers<'a>(headers: impl Iterator<Item = &'a str>) -> Result<HashMap<LeadColumn, usize>, AppError> {
    let mut columns = HashMap::new();
    for (index, header) in headers.enumerate() {
        if let Some(column) = LeadColumn::from_header(header) {
            columns.entry(column).or_insert(index);
        }
    }

    if !columns.contains_key(&LeadColumn::CustomerName) {
        return Err(AppError::InvalidImport(
            "A planilha precisa de uma coluna 'Customer Name'.".to_string(),
        ));
    }
    Ok(columns)
}

fn build_row(line: u64, cell: impl Fn(LeadColumn) -> Option<String>) -> ImportedRow {
    let mut address = cell(LeadColumn::Address)
        .map(|raw| LeadAddress::from_text(&raw))
        .unwrap_or_default();
    // Colunas explícitas têm prioridade sobre a coluna "Address".
    if let Some(street) = cell(LeadColumn::Street) {
        address.street = Some(street);
    }
    if let Some(city) = cell(LeadColumn::City) {
        address.city = Some(city);
    }
    if let Some(state) = cell(LeadColumn::State) {
        address.state = Some(state);
    }
    if let Some(country) = cell(LeadColumn::Country) {
        address.country = Some(country);
    }
    if let Some(pincode) = cell(LeadColumn::Pincode) {
        address.pincode = Some(pincode);
    }

    ImportedRow {
        line,
        customer_name: cell(LeadColumn::CustomerName),
        email: cell(LeadColumn::Email),
        contact: cell(LeadColumn::Contact),
        whatsapp_number: cell(LeadColumn::WhatsappNumber),
        requirements: cell(LeadColumn::Requirements),
        source_column: cell(LeadColumn::Source),
        address,
        status: cell(LeadColumn::Status),
        assigned_to: cell(LeadColumn::AssignedTo),
        follow_up_date: cell(LeadColumn::FollowUpDate),
    }
}
