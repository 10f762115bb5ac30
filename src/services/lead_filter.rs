// src/services/lead_filter.rs

use chrono::{Local, NaiveDate, NaiveDateTime};

use crate::{
    models::{
        filter::{DateRange, FieldFilter, FieldFilters, FilterCriteria},
        lead::LeadRecord,
    },
    services::date_range::{matches_range, DateField},
};

/// Motor de filtragem dos leads.
///
/// Puro e síncrono: recebe a coleção completa e os critérios, devolve a
/// subsequência que passa em TODOS os predicados, na ordem original.
/// Dado malformado em um registro só reprova aquele predicado, nunca a listagem.
#[derive(Debug, Clone, Copy)]
pub struct RecordFilterEngine {
    today: NaiveDate,
}

impl Default for RecordFilterEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordFilterEngine {
    /// Usa o relógio local como referência para os intervalos "últimos N dias".
    pub fn new() -> Self {
        Self::at(Local::now().naive_local())
    }

    pub fn at(now: NaiveDateTime) -> Self {
        Self { today: now.date() }
    }

    pub fn filter<'a>(&self, records: &'a [LeadRecord], criteria: &FilterCriteria) -> Vec<&'a LeadRecord> {
        let term = criteria.search_term.to_lowercase();
        records
            .iter()
            .filter(|record| self.passes(record, criteria, &term))
            .collect()
    }

    /// Versão que consome o vetor (evita clonar na listagem).
    pub fn filter_vec(&self, records: Vec<LeadRecord>, criteria: &FilterCriteria) -> Vec<LeadRecord> {
        let term = criteria.search_term.to_lowercase();
        records
            .into_iter()
            .filter(|record| self.passes(record, criteria, &term))
            .collect()
    }

    // Predicados baratos primeiro; a busca textual por último.
    fn passes(&self, record: &LeadRecord, criteria: &FilterCriteria, lowered_term: &str) -> bool {
        matches_field_filters(record, &criteria.field_filters)
            && self.in_range(&criteria.follow_up_range, record.follow_up_date.as_deref(), DateField::FollowUp)
            && self.in_range(&criteria.created_range, record.created_at.as_deref(), DateField::Created)
            && self.in_range(&criteria.updated_range, record.updated_at.as_deref(), DateField::Updated)
            && matches_search(record, lowered_term)
    }

    fn in_range(&self, range: &DateRange, raw: Option<&str>, field: DateField) -> bool {
        if range.is_all() {
            return true;
        }
        let parsed = raw.and_then(|value| field.parse(value));
        matches_range(range, parsed, self.today)
    }
}

/// Busca textual: OU entre todos os campos pesquisáveis. Termo vazio passa.
pub fn matches_search(record: &LeadRecord, lowered_term: &str) -> bool {
    if lowered_term.is_empty() {
        return true;
    }

    let contains = |field: Option<&str>| {
        field.is_some_and(|value| value.to_lowercase().contains(lowered_term))
    };

    contains(record.customer_name.as_deref())
        || contains(record.email.as_deref())
        || contains(record.contact.as_deref())
        || record.address.searchable_fields().into_iter().any(contains)
        || contains(record.whatsapp_number.as_deref())
        || contains(record.requirements.as_deref())
        || contains(record.status_name.as_deref())
        || contains(record.assigned_to.as_deref())
        || contains(record.follow_up_date.as_deref())
        || contains(record.created_at.as_deref())
        || record.id.to_string().contains(lowered_term)
}

/// Filtros por campo: `All` sempre passa, os demais em E lógico.
pub fn matches_field_filters(record: &LeadRecord, filters: &FieldFilters) -> bool {
    passes(&filters.status_id, |wanted| {
        record.status_id.is_some_and(|id| id.to_string() == wanted)
    }) && passes(&filters.customer_name, |wanted| {
        same_text(record.customer_name.as_deref(), wanted)
    }) && passes(&filters.city, |wanted| {
        same_text(record.address.city.as_deref(), wanted)
    }) && passes(&filters.requirements, |wanted| {
        same_text(record.requirements.as_deref(), wanted)
    }) && passes(&filters.assigned_to, |wanted| {
        same_text(record.assigned_to.as_deref(), wanted)
    }) && passes(&filters.follow_up, |wanted| {
        record.follow_up_date.as_deref().is_some_and(|date| date.contains(wanted))
    })
}

fn passes(filter: &FieldFilter, rule: impl FnOnce(&str) -> bool) -> bool {
    filter.value().is_none_or(rule)
}

fn same_text(field: Option<&str>, wanted: &str) -> bool {
    field.is_some_and(|value| value.trim().to_lowercase() == wanted.trim().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lead::LeadAddress;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(15, 0, 0)
            .unwrap()
    }

    fn engine() -> RecordFilterEngine {
        RecordFilterEngine::at(now())
    }

    fn lead(id: i64, name: &str) -> LeadRecord {
        LeadRecord {
            id,
            customer_name: Some(name.to_string()),
            created_at: Some("2024-03-08".to_string()),
            updated_at: Some("2024-03-08 11:00:00".to_string()),
            follow_up_date: Some("2024-03-09".to_string()),
            ..LeadRecord::default()
        }
    }

    fn sample() -> Vec<LeadRecord> {
        vec![
            LeadRecord {
                email: Some("ravi@foo.in".to_string()),
                address: LeadAddress::from_text("Springfield"),
                status_id: Some(1),
                status_name: Some("New".to_string()),
                assigned_to: Some("Asha Rao".to_string()),
                requirements: Some("Kumar Stores".to_string()),
                ..lead(1, "Ravi Kumar")
            },
            LeadRecord {
                address: LeadAddress::from_text(r#"{"city":"Springfield","state":"IL"}"#),
                status_id: Some(2),
                status_name: Some("Contacted".to_string()),
                assigned_to: Some("asha rao".to_string()),
                created_at: Some("not-a-date".to_string()),
                ..lead(2, "Meera Shah")
            },
            LeadRecord {
                address: LeadAddress::from_text("{not valid json"),
                status_id: Some(12),
                contact: Some("98450 12345".to_string()),
                follow_up_date: None,
                updated_at: Some("2023-11-01 10:00:00".to_string()),
                ..lead(3, "Arjun Nair")
            },
            LeadRecord {
                id: 4,
                ..LeadRecord::default()
            },
        ]
    }

    fn ids(records: &[&LeadRecord]) -> Vec<i64> {
        records.iter().map(|r| r.id).collect()
    }

    fn custom(from: (i32, u32, u32), to: (i32, u32, u32)) -> DateRange {
        DateRange::Custom {
            from: NaiveDate::from_ymd_opt(from.0, from.1, from.2).unwrap(),
            to: NaiveDate::from_ymd_opt(to.0, to.1, to.2).unwrap(),
        }
    }

    #[test]
    fn permissive_criteria_is_identity() {
        let records = sample();
        let result = engine().filter(&records, &FilterCriteria::default());
        assert_eq!(ids(&result), vec![1, 2, 3, 4]);
    }

    #[test]
    fn empty_collection_yields_empty() {
        let criteria = FilterCriteria::default().with_search("anything");
        assert!(engine().filter(&[], &criteria).is_empty());
        assert!(engine().filter(&[], &FilterCriteria::default()).is_empty());
    }

    #[test]
    fn filtering_is_idempotent() {
        let records = sample();
        let mut criteria = FilterCriteria::default().with_search("a");
        criteria.created_range = DateRange::Last7Days;

        let once = engine().filter_vec(records, &criteria);
        let twice = engine().filter_vec(once.clone(), &criteria);
        assert_eq!(once, twice);
    }

    #[test]
    fn output_preserves_input_order() {
        let mut records = sample();
        records.reverse();
        let criteria = FilterCriteria::default().with_search("springfield");
        assert_eq!(ids(&engine().filter(&records, &criteria)), vec![2, 1]);
    }

    #[test]
    fn search_matches_any_single_field() {
        let records = sample();
        // Só o e-mail do lead 1 contém "foo".
        let result = engine().filter(&records, &FilterCriteria::default().with_search("foo"));
        assert_eq!(ids(&result), vec![1]);
    }

    #[test]
    fn search_is_case_insensitive_and_covers_nested_fields() {
        let records = sample();
        let by_state = engine().filter(&records, &FilterCriteria::default().with_search("il"));
        assert!(ids(&by_state).contains(&2));

        let by_status = engine().filter(&records, &FilterCriteria::default().with_search("CONTACTED"));
        assert_eq!(ids(&by_status), vec![2]);

        let by_contact = engine().filter(&records, &FilterCriteria::default().with_search("98450"));
        assert_eq!(ids(&by_contact), vec![3]);
    }

    #[test]
    fn search_matches_id_and_raw_dates() {
        let records = sample();
        let by_id = engine().filter(&records, &FilterCriteria::default().with_search("4"));
        assert!(ids(&by_id).contains(&4));

        let by_follow_up = engine().filter(&records, &FilterCriteria::default().with_search("2024-03-09"));
        assert_eq!(ids(&by_follow_up), vec![1, 2]);
    }

    #[test]
    fn search_skips_missing_fields() {
        let records = vec![LeadRecord { id: 9, ..LeadRecord::default() }];
        let result = engine().filter(&records, &FilterCriteria::default().with_search("kumar"));
        assert!(result.is_empty());
    }

    #[test]
    fn city_filter_uses_normalized_address() {
        let records = sample();
        let mut criteria = FilterCriteria::default();
        criteria.field_filters.city = FieldFilter::from("springfield");
        assert_eq!(ids(&engine().filter(&records, &criteria)), vec![1, 2]);

        criteria.field_filters.city = FieldFilter::from("{not valid json");
        assert_eq!(ids(&engine().filter(&records, &criteria)), vec![3]);
    }

    #[test]
    fn status_filter_is_exact_on_id() {
        let records = sample();
        let mut criteria = FilterCriteria::default();
        criteria.field_filters.status_id = FieldFilter::from("1");
        // "1" não casa com 12.
        assert_eq!(ids(&engine().filter(&records, &criteria)), vec![1]);
    }

    #[test]
    fn assigned_to_is_case_insensitive_but_not_substring() {
        let records = sample();
        let mut criteria = FilterCriteria::default();
        criteria.field_filters.assigned_to = FieldFilter::from("ASHA RAO");
        assert_eq!(ids(&engine().filter(&records, &criteria)), vec![1, 2]);

        criteria.field_filters.assigned_to = FieldFilter::from("asha");
        assert!(engine().filter(&records, &criteria).is_empty());
    }

    #[test]
    fn follow_up_filter_is_substring_of_raw_date() {
        let records = sample();
        let mut criteria = FilterCriteria::default();
        criteria.field_filters.follow_up = FieldFilter::from("2024-03");
        assert_eq!(ids(&engine().filter(&records, &criteria)), vec![1, 2]);
    }

    #[test]
    fn field_filters_combine_with_and() {
        let records = sample();
        let mut criteria = FilterCriteria::default();
        criteria.field_filters.city = FieldFilter::from("Springfield");
        criteria.field_filters.customer_name = FieldFilter::from("meera shah");
        assert_eq!(ids(&engine().filter(&records, &criteria)), vec![2]);

        criteria.field_filters.requirements = FieldFilter::from("Kumar Stores");
        assert!(engine().filter(&records, &criteria).is_empty());
    }

    #[test]
    fn bad_created_date_fails_closed() {
        let records = sample();
        let mut criteria = FilterCriteria::default();
        criteria.created_range = DateRange::Last7Days;
        let result = ids(&engine().filter(&records, &criteria));
        assert!(!result.contains(&2));
        assert!(result.contains(&1));

        criteria.created_range = DateRange::All;
        assert!(ids(&engine().filter(&records, &criteria)).contains(&2));
    }

    #[test]
    fn missing_follow_up_never_matches_a_range() {
        let records = sample();
        let mut criteria = FilterCriteria::default();
        criteria.follow_up_range = DateRange::Last30Days;
        assert_eq!(ids(&engine().filter(&records, &criteria)), vec![1, 2]);
    }

    #[test]
    fn custom_range_is_inclusive_on_both_days() {
        let records = vec![
            LeadRecord { id: 1, updated_at: Some("2024-01-01 00:00:00".to_string()), ..LeadRecord::default() },
            LeadRecord { id: 2, updated_at: Some("2024-01-31 23:59:59.999".to_string()), ..LeadRecord::default() },
            LeadRecord { id: 3, updated_at: Some("2024-02-01 00:00:00".to_string()), ..LeadRecord::default() },
        ];
        let mut criteria = FilterCriteria::default();
        criteria.updated_range = custom((2024, 1, 1), (2024, 1, 31));
        assert_eq!(ids(&engine().filter(&records, &criteria)), vec![1, 2]);
    }

    #[test]
    fn three_ranges_are_conjunctive_and_independent() {
        let records = sample();
        let mut criteria = FilterCriteria::default();
        criteria.follow_up_range = DateRange::Last7Days;
        criteria.created_range = DateRange::Last7Days;
        criteria.updated_range = custom((2023, 11, 1), (2023, 11, 30));

        // O lead 1 passa em follow-up e criação, mas não na atualização.
        assert!(engine().filter(&records, &criteria).is_empty());

        criteria.updated_range = DateRange::All;
        assert_eq!(ids(&engine().filter(&records, &criteria)), vec![1]);
    }

    #[test]
    fn today_after_midnight_is_outside_last_n() {
        let records = vec![LeadRecord {
            id: 1,
            updated_at: Some("2024-03-10 09:00:00".to_string()),
            ..LeadRecord::default()
        }];
        let mut criteria = FilterCriteria::default();
        criteria.updated_range = DateRange::Last7Days;
        assert!(engine().filter(&records, &criteria).is_empty());
    }

    #[test]
    fn filtering_does_not_touch_records() {
        let records = sample();
        let before = records.clone();
        let mut criteria = FilterCriteria::default().with_search("springfield");
        criteria.updated_range = DateRange::Last90Days;
        let _ = engine().filter(&records, &criteria);
        assert_eq!(records, before);
    }
}
