//! Identifier, code, and date normalization.
//!
//! Registry extracts carry codes that look numeric but are not ("005",
//! "01") and dates split across several columns. Everything here works on
//! raw strings so no code is ever reinterpreted as a number.

use chrono::{NaiveDate, NaiveDateTime};

use herdbook_shared::AnimalRecord;

/// Accepted birth-date layouts, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y%m%d", "%d-%m-%Y"];

/// Strip leading `'0'` characters from a breed-family code.
///
/// `"005"` → `"5"`, `"000"` → `""`. The empty result means "no code".
pub fn strip_leading_zeros(code: &str) -> String {
    code.trim_start_matches('0').to_string()
}

/// Caller- and file-side identifiers compare as trimmed strings.
pub fn normalize_identifier(raw: &str) -> String {
    raw.trim().to_string()
}

/// Parse an integer date part, tolerating a trailing `.0` from
/// spreadsheet exports.
pub fn parse_date_part<T: std::str::FromStr>(raw: &str) -> Option<T> {
    let raw = raw.trim();
    let raw = raw.strip_suffix(".0").unwrap_or(raw);
    raw.parse().ok()
}

/// Compose a calendar date from its parts. Any missing or out-of-range
/// part yields `None`.
pub fn compose_date(year: Option<i32>, month: Option<u32>, day: Option<u32>) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year?, month?, day?)
}

/// Parse a birth date in any of the accepted layouts.
pub fn parse_birth_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

/// Normalize one record in place: compose the analysis date and strip the
/// breed-family codes.
pub fn normalize_record(record: &mut AnimalRecord) {
    record.animal_id = normalize_identifier(&record.animal_id);
    record.analysis_date = compose_date(record.event_year, record.event_month, record.event_day);
    record.breed_code = strip_leading_zeros(&record.breed_code);
    record.sire_breed_code = strip_leading_zeros(&record.sire_breed_code);
    record.dam_breed_code = strip_leading_zeros(&record.dam_breed_code);
}

/// Normalize every record. Row count and order are unchanged.
pub fn normalize_records(records: &mut [AnimalRecord]) {
    for record in records.iter_mut() {
        normalize_record(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_stripping() {
        assert_eq!(strip_leading_zeros("005"), "5");
        assert_eq!(strip_leading_zeros("050"), "50");
        assert_eq!(strip_leading_zeros("000"), "");
        assert_eq!(strip_leading_zeros(""), "");
        assert_eq!(strip_leading_zeros("12"), "12");
    }

    #[test]
    fn zero_stripping_is_idempotent() {
        for code in ["005", "0", "00100", "A01", "", "0 5"] {
            let once = strip_leading_zeros(code);
            assert_eq!(strip_leading_zeros(&once), once, "code {code:?}");
        }
    }

    #[test]
    fn invalid_date_parts_yield_none() {
        assert_eq!(
            compose_date(Some(2024), Some(3), Some(1)),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(compose_date(Some(2024), Some(2), Some(30)), None);
        assert_eq!(compose_date(Some(2024), Some(13), Some(1)), None);
        assert_eq!(compose_date(None, Some(1), Some(1)), None);
    }

    #[test]
    fn date_parts_tolerate_float_suffix() {
        assert_eq!(parse_date_part::<i32>("2024.0"), Some(2024));
        assert_eq!(parse_date_part::<u32>(" 7 "), Some(7));
        assert_eq!(parse_date_part::<u32>("July"), None);
    }

    #[test]
    fn birth_date_layouts() {
        let expected = NaiveDate::from_ymd_opt(2020, 1, 15);
        assert_eq!(parse_birth_date("2020-01-15"), expected);
        assert_eq!(parse_birth_date("15/01/2020"), expected);
        assert_eq!(parse_birth_date("20200115"), expected);
        assert_eq!(parse_birth_date("2020-01-15 00:00:00"), expected);
        assert_eq!(parse_birth_date(""), None);
        assert_eq!(parse_birth_date("someday"), None);
    }

    #[test]
    fn record_normalization_keeps_bad_dates() {
        let mut record = AnimalRecord {
            animal_id: " IT123 ".into(),
            breed_code: "005".into(),
            sire_breed_code: "000".into(),
            dam_breed_code: "31".into(),
            event_year: Some(2024),
            event_month: Some(2),
            event_day: Some(31),
            ..Default::default()
        };
        normalize_record(&mut record);

        assert_eq!(record.animal_id, "IT123");
        assert_eq!(record.breed_code, "5");
        assert_eq!(record.sire_breed_code, "");
        assert_eq!(record.dam_breed_code, "31");
        assert_eq!(record.analysis_date, None);
    }
}
