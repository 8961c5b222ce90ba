use chrono::NaiveDate;

use crate::error::RosterError;

/// Date form shown in reports and editable summaries.
pub const DISPLAY_FORMAT: &str = "%d-%m-%Y";
/// Date form used in persisted artifacts and as dedup keys.
pub const STORAGE_FORMAT: &str = "%Y-%m-%d";

/// Parses a date in the display form (`DD-MM-YYYY`).
pub fn parse_display(value: &str) -> Result<NaiveDate, RosterError> {
    NaiveDate::parse_from_str(value.trim(), DISPLAY_FORMAT)
        .map_err(|_| RosterError::date_parse(value))
}

/// Parses a date that may arrive as `YYYY-MM-DD` (spreadsheet date cells,
/// stored artifacts) or as the `DD-MM-YYYY` display form.
///
/// A dash-separated value whose first segment has four digits is taken as
/// year-first; everything else goes through the strict display parse. A
/// time-of-day suffix on a year-first value is ignored.
pub fn parse_flexible(value: &str) -> Result<NaiveDate, RosterError> {
    let trimmed = value.trim();
    if looks_year_first(trimmed) {
        let date_part = trimmed.split_whitespace().next().unwrap_or(trimmed);
        return NaiveDate::parse_from_str(date_part, STORAGE_FORMAT)
            .map_err(|_| RosterError::date_parse(value));
    }
    parse_display(trimmed)
}

fn looks_year_first(value: &str) -> bool {
    match value.split('-').next() {
        Some(first) => first.len() == 4 && first.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

/// Formats a date as its storage key (`YYYY-MM-DD`).
pub fn storage_key(date: NaiveDate) -> String {
    date.format(STORAGE_FORMAT).to_string()
}

/// Formats a date in display form (`DD-MM-YYYY`).
pub fn display(date: NaiveDate) -> String {
    date.format(DISPLAY_FORMAT).to_string()
}

/// Joins dates in ascending order as a `", "`-separated display list.
/// An empty slice yields an empty string.
pub fn join_display_list(dates: &[NaiveDate]) -> String {
    let mut sorted = dates.to_vec();
    sorted.sort();
    sorted
        .iter()
        .map(|d| display(*d))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Like [`join_display_list`] but an empty slice yields the literal `None`,
/// which the reconciler recognizes and skips on re-import.
pub fn format_unavailable_dates(dates: &[NaiveDate]) -> String {
    if dates.is_empty() {
        return "None".to_string();
    }
    join_display_list(dates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn display_round_trip() {
        let d = date(2025, 1, 10);
        assert_eq!(display(d), "10-01-2025");
        assert_eq!(parse_display(&display(d)).unwrap(), d);
    }

    #[test]
    fn parse_display_rejects_iso_and_garbage() {
        assert!(parse_display("2025-01-10").is_err());
        assert!(parse_display("not a date").is_err());
        // Valid pattern, invalid calendar date.
        assert!(parse_display("31-02-2025").is_err());
    }

    #[test]
    fn flexible_accepts_both_orders() {
        assert_eq!(parse_flexible("2025-01-10").unwrap(), date(2025, 1, 10));
        assert_eq!(parse_flexible("10-01-2025").unwrap(), date(2025, 1, 10));
        // Year-first with a time-of-day suffix, as spreadsheet cells render.
        assert_eq!(parse_flexible("2025-01-10 00:00:00").unwrap(), date(2025, 1, 10));
    }

    #[test]
    fn flexible_heuristic_is_first_segment_width() {
        // Four leading digits means year-first even with short month/day.
        assert_eq!(parse_flexible("2025-1-5").unwrap(), date(2025, 1, 5));
        assert!(parse_flexible("20251-01-05").is_err());
    }

    #[test]
    fn join_is_sorted_and_empty_safe() {
        let list = [date(2025, 1, 12), date(2025, 1, 10)];
        assert_eq!(join_display_list(&list), "10-01-2025, 12-01-2025");
        assert_eq!(join_display_list(&[]), "");
    }

    #[test]
    fn unavailable_formatting_round_trips() {
        assert_eq!(format_unavailable_dates(&[]), "None");
        let d = date(2025, 3, 1);
        let formatted = format_unavailable_dates(&[d]);
        assert_eq!(parse_display(&formatted).unwrap(), d);
    }

    #[test]
    fn storage_key_is_iso() {
        assert_eq!(storage_key(date(2025, 1, 10)), "2025-01-10");
    }
}
