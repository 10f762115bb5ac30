// src/services/date_range.rs

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};

use crate::models::filter::DateRange;

/// Layouts aceitos depois de trocar `-` por `/`.
const SLASH_DATETIME_LAYOUTS: &[&str] = &[
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%Y/%m/%dT%H:%M:%S%.f",
    "%Y/%m/%dT%H:%M",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
];
const SLASH_DATE_LAYOUTS: &[&str] = &["%Y/%m/%d", "%m/%d/%Y"];

/// Layouts tentados na string original, quando a troca não resolve.
const ISO_DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];
const ISO_DATE_LAYOUTS: &[&str] = &["%Y-%m-%d"];

/// Qual campo de data do lead está sendo lido. Cada um tem seu parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    FollowUp,
    Created,
    Updated,
}

impl DateField {
    pub fn parse(self, raw: &str) -> Option<NaiveDateTime> {
        match self {
            DateField::Created => parse_strict_ymd(raw),
            DateField::FollowUp | DateField::Updated => parse_loose(raw),
        }
    }
}

/// `YYYY-MM-DD`, separado em exatamente três partes numéricas.
pub fn parse_strict_ymd(raw: &str) -> Option<NaiveDateTime> {
    let parts: Vec<&str> = raw.split('-').collect();
    let [year, month, day] = parts.as_slice() else {
        return None;
    };

    let numeric = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if !(numeric(year) && numeric(month) && numeric(day)) {
        return None;
    }

    let date = NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)?;
    Some(date.and_time(NaiveTime::MIN))
}

/// Parser permissivo: primeiro com `-` trocado por `/`, depois a string original.
pub fn parse_loose(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let slashed = trimmed.replace('-', "/");
    parse_with(&slashed, SLASH_DATETIME_LAYOUTS, SLASH_DATE_LAYOUTS).or_else(|| {
        DateTime::parse_from_rfc3339(trimmed)
            .map(|dt| dt.with_timezone(&Local).naive_local())
            .ok()
            .or_else(|| parse_with(trimmed, ISO_DATETIME_LAYOUTS, ISO_DATE_LAYOUTS))
    })
}

fn parse_with(input: &str, datetime_layouts: &[&str], date_layouts: &[&str]) -> Option<NaiveDateTime> {
    datetime_layouts
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(input, layout).ok())
        .or_else(|| {
            date_layouts
                .iter()
                .find_map(|layout| NaiveDate::parse_from_str(input, layout).ok())
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

/// Confere um instante já parseado contra o seletor.
///
/// - `All` sempre passa, com ou sem data.
/// - Sem data (ou data ilegível), qualquer outro seletor reprova.
/// - `LastN`: `hoje 00:00 - N dias <= d <= hoje 00:00`, inclusivo nas duas pontas.
/// - `Custom`: `from 00:00:00.000 <= d <= to 23:59:59.999`.
pub fn matches_range(range: &DateRange, at: Option<NaiveDateTime>, today: NaiveDate) -> bool {
    if range.is_all() {
        return true;
    }
    let Some(at) = at else {
        return false;
    };

    match range {
        DateRange::All => true,
        DateRange::Custom { from, to } => {
            let start = from.and_time(NaiveTime::MIN);
            let end = to.and_time(end_of_day());
            start <= at && at <= end
        }
        last_n => {
            let days = last_n.lookback_days().unwrap_or_default();
            let today_start = today.and_time(NaiveTime::MIN);
            let lower = today_start - Duration::days(days);
            lower <= at && at <= today_start
        }
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN)
}
