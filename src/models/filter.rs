// src/models/filter.rs

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{de::IntoDeserializer, Deserialize, Serialize};
use utoipa::ToSchema;

// ---
// Filtro por campo
// ---
// No fio, "all" (ou vazio) significa "sem restrição".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldFilter {
    #[default]
    All,
    Only(String),
}

impl FieldFilter {
    pub fn value(&self) -> Option<&str> {
        match self {
            FieldFilter::All => None,
            FieldFilter::Only(value) => Some(value),
        }
    }
}

impl From<&str> for FieldFilter {
    fn from(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            FieldFilter::All
        } else {
            FieldFilter::Only(trimmed.to_string())
        }
    }
}

impl From<Option<String>> for FieldFilter {
    fn from(raw: Option<String>) -> Self {
        raw.as_deref().map(FieldFilter::from).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldFilters {
    pub customer_name: FieldFilter,
    /// Comparado com a cidade do endereço normalizado.
    pub city: FieldFilter,
    pub requirements: FieldFilter,
    pub status_id: FieldFilter,
    pub assigned_to: FieldFilter,
    pub follow_up: FieldFilter,
}

// ---
// Intervalos de data
// ---

/// Seletor como chega na query string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DateRangeKind {
    #[default]
    All,
    Last7days,
    Last30days,
    Last90days,
    Custom,
}

impl FromStr for DateRangeKind {
    type Err = serde::de::value::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::deserialize(raw.into_deserializer())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateRange {
    #[default]
    All,
    Last7Days,
    Last30Days,
    Last90Days,
    Custom { from: NaiveDate, to: NaiveDate },
}

impl DateRange {
    /// Um `custom` sem as duas pontas ainda não foi escolhido: vale como `All`.
    pub fn from_parts(kind: DateRangeKind, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        match kind {
            DateRangeKind::All => DateRange::All,
            DateRangeKind::Last7days => DateRange::Last7Days,
            DateRangeKind::Last30days => DateRange::Last30Days,
            DateRangeKind::Last90days => DateRange::Last90Days,
            DateRangeKind::Custom => match (from, to) {
                (Some(from), Some(to)) => DateRange::Custom { from, to },
                _ => DateRange::All,
            },
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, DateRange::All)
    }

    pub fn lookback_days(&self) -> Option<i64> {
        match self {
            DateRange::Last7Days => Some(7),
            DateRange::Last30Days => Some(30),
            DateRange::Last90Days => Some(90),
            DateRange::All | DateRange::Custom { .. } => None,
        }
    }
}

// ---
// Critérios completos
// ---
// Criado permissivo, alterado pela interação do usuário, lido a cada filtragem.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub search_term: String,
    pub field_filters: FieldFilters,
    pub follow_up_range: DateRange,
    pub created_range: DateRange,
    pub updated_range: DateRange,
}

impl FilterCriteria {
    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search_term = term.into();
        self
    }

    pub fn is_permissive(&self) -> bool {
        self.search_term.is_empty()
            && self.field_filters == FieldFilters::default()
            && self.follow_up_range.is_all()
            && self.created_range.is_all()
            && self.updated_range.is_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_sentinel_and_blank_mean_no_filter() {
        assert_eq!(FieldFilter::from("all"), FieldFilter::All);
        assert_eq!(FieldFilter::from("ALL"), FieldFilter::All);
        assert_eq!(FieldFilter::from("  "), FieldFilter::All);
        assert_eq!(FieldFilter::from(None), FieldFilter::All);
        assert_eq!(
            FieldFilter::from(Some(" Pune ".to_string())),
            FieldFilter::Only("Pune".to_string())
        );
    }

    #[test]
    fn incomplete_custom_range_is_all() {
        let from = NaiveDate::from_ymd_opt(2024, 1, 1);
        assert_eq!(DateRange::from_parts(DateRangeKind::Custom, from, None), DateRange::All);
        assert_eq!(DateRange::from_parts(DateRangeKind::Custom, None, None), DateRange::All);
    }

    #[test]
    fn complete_custom_range_is_kept() {
        let from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(
            DateRange::from_parts(DateRangeKind::Custom, Some(from), Some(to)),
            DateRange::Custom { from, to }
        );
    }

    #[test]
    fn lookback_days_by_kind() {
        assert_eq!(DateRange::from_parts(DateRangeKind::Last7days, None, None).lookback_days(), Some(7));
        assert_eq!(DateRange::Last90Days.lookback_days(), Some(90));
        assert_eq!(DateRange::All.lookback_days(), None);
    }

    #[test]
    fn default_criteria_is_permissive() {
        assert!(FilterCriteria::default().is_permissive());
        assert!(!FilterCriteria::default().with_search("x").is_permissive());
    }

    #[test]
    fn range_kind_wire_names() {
        let kind: DateRangeKind = serde_json::from_str("\"last30days\"").unwrap();
        assert_eq!(kind, DateRangeKind::Last30days);
    }
}
