use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::warn;

use crate::dates;
use crate::error::RosterError;
use crate::model::{DutyAssignment, Shift, SlotRequirement, UnavailabilityMap};
use crate::table::{Table, Upload};

/// Columns an edited faculty summary must still carry to be reconciled.
/// Checked by exact name before anything else runs.
const REQUIRED_SUMMARY_COLUMNS: [&str; 5] = [
    "Faculty",
    "First Half Duties",
    "Second Half Duties",
    "First Half Dates",
    "Second Half Dates",
];

/// Everything reconstructed from an edited summary.
///
/// `warnings` lists every row or token that was skipped, so callers can
/// report (and tests can assert) partial failures without parsing logs.
#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    pub assignments: Vec<DutyAssignment>,
    pub schedule: Vec<SlotRequirement>,
    pub unavailability: UnavailabilityMap,
    pub warnings: Vec<String>,
}

/// Rebuilds assignments, schedule and unavailability from an edited summary
/// table plus optional explicit schedule and unavailability tables.
///
/// Per-token failures are collected as warnings and skipped; only a summary
/// missing required columns aborts the whole reconciliation.
pub fn reconcile_from_summary(
    summary: &Table,
    schedule: Option<&Table>,
    unavailability: Option<&Table>,
) -> Result<ReconcileOutcome, RosterError> {
    let cols = summary_columns(summary)?;
    let mut outcome = ReconcileOutcome::default();

    // One duty assignment per parsed date token, tallied per (date, shift).
    let mut tallies: BTreeMap<(NaiveDate, Shift), i64> = BTreeMap::new();
    for row in 0..summary.row_count() {
        let faculty = summary.cell(row, cols.faculty).trim();
        if faculty.is_empty() || faculty == "nan" {
            note(&mut outcome.warnings, format!("summary row {} has no faculty name, skipped", row + 2));
            continue;
        }
        for (shift, col) in [
            (Shift::FirstHalf, cols.first_dates),
            (Shift::SecondHalf, cols.second_dates),
        ] {
            for token in split_duty_dates(summary.cell(row, col)) {
                match dates::parse_display(token) {
                    Ok(date) => {
                        outcome.assignments.push(DutyAssignment {
                            date,
                            shift,
                            faculty: faculty.to_string(),
                        });
                        *tallies.entry((date, shift)).or_insert(0) += 1;
                    }
                    Err(_) => note(
                        &mut outcome.warnings,
                        format!("could not parse duty date '{}' for {}", token, faculty),
                    ),
                }
            }
        }
    }

    // Merge the per-(date, shift) tallies into one entry per date, so a date
    // referenced by both shifts still yields a single schedule record.
    let mut derived: BTreeMap<NaiveDate, SlotRequirement> = BTreeMap::new();
    for ((date, shift), count) in &tallies {
        let entry = derived.entry(*date).or_insert_with(|| SlotRequirement {
            date: *date,
            first_half: 0,
            second_half: 0,
        });
        match shift {
            Shift::FirstHalf => entry.first_half += count,
            Shift::SecondHalf => entry.second_half += count,
        }
    }
    let derived: Vec<SlotRequirement> = derived.into_values().collect();

    // The explicit schedule table wins when it yielded anything; the
    // summary-derived schedule covers every other case.
    let explicit = match schedule {
        Some(table) => schedule_from_table(table, &mut outcome.warnings),
        None => Vec::new(),
    };
    outcome.schedule = if explicit.is_empty() { derived } else { explicit };

    // A dedicated unavailability table, even a useless one, takes the place
    // of the summary's own unavailable columns.
    match unavailability {
        Some(table) => {
            unavailability_from_table(table, &mut outcome.unavailability, &mut outcome.warnings)
        }
        None => unavailability_from_summary(
            summary,
            &cols,
            &mut outcome.unavailability,
            &mut outcome.warnings,
        ),
    }

    Ok(outcome)
}

/// Runs reconciliation over raw uploads, applying the file-type gates.
///
/// The summary must be the binary spreadsheet format; auxiliary uploads of
/// the wrong type are ignored with a warning so the summary-derived data
/// still lands, and an unreadable unavailability spreadsheet still counts
/// as a supplied table (it suppresses the summary-column fallback).
pub fn reconcile_uploads(
    summary: &Upload,
    schedule: Option<&Upload>,
    unavailability: Option<&Upload>,
) -> Result<ReconcileOutcome, RosterError> {
    let summary_table = summary.spreadsheet_table()?;

    let mut pre_warnings = Vec::new();
    let schedule_table = match schedule {
        Some(upload) => match upload.spreadsheet_table() {
            Ok(table) => Some(table),
            Err(err) => {
                note(
                    &mut pre_warnings,
                    format!("schedule upload '{}' ignored: {}", upload.filename, err),
                );
                None
            }
        },
        None => None,
    };
    let unavailability_table = match unavailability {
        Some(upload) if upload.is_spreadsheet() => match Table::from_xlsx(&upload.bytes) {
            Ok(table) => Some(table),
            Err(err) => {
                note(
                    &mut pre_warnings,
                    format!("unavailability upload '{}' unreadable: {}", upload.filename, err),
                );
                Some(Table::default())
            }
        },
        Some(upload) => {
            note(
                &mut pre_warnings,
                format!("unavailability upload '{}' ignored: not a spreadsheet", upload.filename),
            );
            None
        }
        None => None,
    };

    let mut outcome = reconcile_from_summary(
        &summary_table,
        schedule_table.as_ref(),
        unavailability_table.as_ref(),
    )?;
    pre_warnings.append(&mut outcome.warnings);
    outcome.warnings = pre_warnings;
    Ok(outcome)
}

struct SummaryColumns {
    faculty: usize,
    first_dates: usize,
    second_dates: usize,
}

fn summary_columns(summary: &Table) -> Result<SummaryColumns, RosterError> {
    let mut missing = Vec::new();
    let mut require = |name: &str| match summary.column(name) {
        Some(index) => index,
        None => {
            missing.push(name.to_string());
            0
        }
    };
    let columns = SummaryColumns {
        faculty: require("Faculty"),
        first_dates: require("First Half Dates"),
        second_dates: require("Second Half Dates"),
    };
    require("First Half Duties");
    require("Second Half Duties");
    if missing.is_empty() {
        Ok(columns)
    } else {
        missing.sort_by_key(|name| {
            REQUIRED_SUMMARY_COLUMNS
                .iter()
                .position(|c| *c == name.as_str())
                .unwrap_or(REQUIRED_SUMMARY_COLUMNS.len())
        });
        Err(RosterError::SchemaValidation { missing })
    }
}

/// Reads an explicit schedule table (`Date`, `First Half`, `Second Half`).
/// Rows whose date cannot be parsed are skipped with a warning; missing or
/// non-numeric counts read as zero.
fn schedule_from_table(table: &Table, warnings: &mut Vec<String>) -> Vec<SlotRequirement> {
    let Some(date_col) = table.column("Date") else {
        note(warnings, "schedule table has no 'Date' column, ignored".to_string());
        return Vec::new();
    };
    let first_col = table.column("First Half");
    let second_col = table.column("Second Half");

    let mut schedule = Vec::new();
    for row in 0..table.row_count() {
        let raw = table.cell(row, date_col).trim();
        if raw.is_empty() || raw == "nan" {
            continue;
        }
        match dates::parse_flexible(raw) {
            Ok(date) => schedule.push(SlotRequirement {
                date,
                first_half: count_cell(table, row, first_col),
                second_half: count_cell(table, row, second_col),
            }),
            Err(_) => note(
                warnings,
                format!("could not parse date '{}' in schedule table", raw),
            ),
        }
    }
    schedule
}

fn count_cell(table: &Table, row: usize, col: Option<usize>) -> i64 {
    col.and_then(|c| table.cell(row, c).trim().parse::<f64>().ok())
        .map(|value| value as i64)
        .unwrap_or(0)
}

/// Populates unavailability from a dedicated table in either accepted shape:
/// long form (`Faculty`, `Date`, `Shift`) with the flexible date parse, or
/// wide form (`First Half Dates`, `Second Half Dates`) with the strict one.
fn unavailability_from_table(
    table: &Table,
    map: &mut UnavailabilityMap,
    warnings: &mut Vec<String>,
) {
    let Some(faculty_col) = table.column("Faculty") else {
        note(warnings, "unavailability table has no 'Faculty' column, ignored".to_string());
        return;
    };
    let long_form = table.column("Date").zip(table.column("Shift"));
    let wide_form = table
        .column("First Half Dates")
        .zip(table.column("Second Half Dates"));

    for row in 0..table.row_count() {
        let faculty = table.cell(row, faculty_col).trim();
        if faculty.is_empty() || faculty == "nan" {
            continue;
        }
        let entry = map.entry(faculty.to_string()).or_default();

        if let Some((date_col, shift_col)) = long_form {
            let raw_date = table.cell(row, date_col).trim();
            let raw_shift = table.cell(row, shift_col).trim();
            if raw_date.is_empty() || raw_date == "nan" || raw_shift.is_empty() || raw_shift == "nan"
            {
                continue;
            }
            let shift = if raw_shift.contains("First Half") {
                Shift::FirstHalf
            } else if raw_shift.contains("Second Half") {
                Shift::SecondHalf
            } else {
                continue;
            };
            match dates::parse_flexible(raw_date) {
                Ok(date) => entry.insert(shift, date),
                Err(_) => note(
                    warnings,
                    format!("could not parse unavailable date '{}' for {}", raw_date, faculty),
                ),
            }
        } else if let Some((first_col, second_col)) = wide_form {
            for (shift, col) in [(Shift::FirstHalf, first_col), (Shift::SecondHalf, second_col)] {
                for token in split_unavailable_dates(table.cell(row, col)) {
                    match dates::parse_display(token) {
                        Ok(date) => entry.insert(shift, date),
                        Err(_) => note(
                            warnings,
                            format!("could not parse unavailable date '{}' for {}", token, faculty),
                        ),
                    }
                }
            }
        }
    }
}

/// Fallback when no dedicated table was supplied: the summary's own
/// `First Half Unavailable` / `Second Half Unavailable` columns.
fn unavailability_from_summary(
    summary: &Table,
    cols: &SummaryColumns,
    map: &mut UnavailabilityMap,
    warnings: &mut Vec<String>,
) {
    let first_col = summary.column("First Half Unavailable");
    let second_col = summary.column("Second Half Unavailable");

    for row in 0..summary.row_count() {
        let faculty = summary.cell(row, cols.faculty).trim();
        if faculty.is_empty() || faculty == "nan" {
            continue;
        }
        let entry = map.entry(faculty.to_string()).or_default();
        for (shift, col) in [(Shift::FirstHalf, first_col), (Shift::SecondHalf, second_col)] {
            let Some(col) = col else { continue };
            for token in split_unavailable_dates(summary.cell(row, col)) {
                match dates::parse_display(token) {
                    Ok(date) => entry.insert(shift, date),
                    Err(_) => note(
                        warnings,
                        format!("could not parse unavailable date '{}' for {}", token, faculty),
                    ),
                }
            }
        }
    }
}

fn split_duty_dates(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty() && *token != "nan")
}

fn split_unavailable_dates(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty() && *token != "nan" && *token != "None")
}

fn note(warnings: &mut Vec<String>, message: String) {
    warn!("{}", message);
    warnings.push(message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UnavailableDates;

    const SUMMARY_HEADERS: [&str; 7] = [
        "Faculty",
        "First Half Duties",
        "Second Half Duties",
        "First Half Dates",
        "Second Half Dates",
        "First Half Unavailable",
        "Second Half Unavailable",
    ];

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn summary(rows: Vec<Vec<&str>>) -> Table {
        Table::from_rows(SUMMARY_HEADERS.to_vec(), rows)
    }

    #[test]
    fn summary_row_rebuilds_assignments_and_schedule() {
        let table = summary(vec![vec![
            "A", "2", "0", "10-01-2025, 12-01-2025", "", "None", "None",
        ]]);
        let outcome = reconcile_from_summary(&table, None, None).unwrap();

        assert_eq!(outcome.assignments.len(), 2);
        assert!(outcome
            .assignments
            .iter()
            .all(|a| a.shift == Shift::FirstHalf && a.faculty == "A"));
        assert_eq!(
            outcome.schedule,
            vec![
                SlotRequirement { date: date(10), first_half: 1, second_half: 0 },
                SlotRequirement { date: date(12), first_half: 1, second_half: 0 },
            ]
        );
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn missing_columns_abort_before_anything_else() {
        let table = Table::from_rows(
            vec!["Faculty", "First Half Duties", "Second Half Duties", "First Half Dates"],
            vec![vec!["A", "1", "0", "10-01-2025"]],
        );
        match reconcile_from_summary(&table, None, None) {
            Err(RosterError::SchemaValidation { missing }) => {
                assert_eq!(missing, vec!["Second Half Dates".to_string()])
            }
            other => panic!("expected SchemaValidation, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn same_date_merges_into_one_schedule_entry() {
        let table = summary(vec![
            vec!["A", "1", "0", "10-01-2025", "", "None", "None"],
            vec!["B", "0", "1", "", "10-01-2025", "None", "None"],
        ]);
        let outcome = reconcile_from_summary(&table, None, None).unwrap();
        assert_eq!(
            outcome.schedule,
            vec![SlotRequirement { date: date(10), first_half: 1, second_half: 1 }]
        );
    }

    #[test]
    fn duplicate_assignments_are_preserved() {
        // Reconciliation dedupes unavailability, never assignments.
        let table = summary(vec![vec![
            "A", "2", "0", "10-01-2025, 10-01-2025", "", "None", "None",
        ]]);
        let outcome = reconcile_from_summary(&table, None, None).unwrap();
        assert_eq!(outcome.assignments.len(), 2);
        assert_eq!(outcome.schedule[0].first_half, 2);
    }

    #[test]
    fn bad_tokens_warn_and_are_skipped() {
        let table = summary(vec![vec![
            "A", "2", "0", "10-01-2025, 32-13-2025, nan", "", "None", "None",
        ]]);
        let outcome = reconcile_from_summary(&table, None, None).unwrap();
        assert_eq!(outcome.assignments.len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("32-13-2025"));
    }

    #[test]
    fn explicit_schedule_table_wins_when_it_parses() {
        let table = summary(vec![vec!["A", "1", "0", "10-01-2025", "", "None", "None"]]);
        let explicit = Table::from_rows(
            vec!["Date", "First Half", "Second Half"],
            vec![vec!["2025-01-10", "4", "3"], vec!["15-01-2025", "2", ""]],
        );
        let outcome = reconcile_from_summary(&table, Some(&explicit), None).unwrap();
        assert_eq!(
            outcome.schedule,
            vec![
                SlotRequirement { date: date(10), first_half: 4, second_half: 3 },
                SlotRequirement { date: date(15), first_half: 2, second_half: 0 },
            ]
        );
    }

    #[test]
    fn useless_schedule_table_falls_back_to_derived() {
        let table = summary(vec![vec!["A", "1", "0", "10-01-2025", "", "None", "None"]]);
        let explicit = Table::from_rows(vec!["Day", "First Half"], vec![vec!["x", "1"]]);
        let outcome = reconcile_from_summary(&table, Some(&explicit), None).unwrap();
        assert_eq!(outcome.schedule.len(), 1);
        assert_eq!(outcome.schedule[0].first_half, 1);
        assert!(outcome.warnings.iter().any(|w| w.contains("'Date'")));
    }

    #[test]
    fn long_form_unavailability_dedupes() {
        let table = summary(vec![vec!["A", "0", "0", "", "", "None", "None"]]);
        let dedicated = Table::from_rows(
            vec!["Faculty", "Date", "Shift"],
            vec![
                vec!["A", "10-01-2025", "First Half"],
                vec!["A", "2025-01-10", "First Half (morning)"],
                vec!["A", "11-01-2025", "Second Half"],
            ],
        );
        let outcome = reconcile_from_summary(&table, None, Some(&dedicated)).unwrap();
        let expected = UnavailableDates {
            first_half: vec![date(10)],
            second_half: vec![date(11)],
        };
        assert_eq!(outcome.unavailability.get("A"), Some(&expected));
    }

    #[test]
    fn wide_form_unavailability_uses_strict_parse() {
        let table = summary(vec![vec!["A", "0", "0", "", "", "None", "None"]]);
        let dedicated = Table::from_rows(
            vec!["Faculty", "First Half Dates", "Second Half Dates"],
            vec![vec!["A", "10-01-2025, 2025-01-12", "None"]],
        );
        let outcome = reconcile_from_summary(&table, None, Some(&dedicated)).unwrap();
        let entry = outcome.unavailability.get("A").unwrap();
        // The ISO-form token fails the strict parse and is warned about.
        assert_eq!(entry.first_half, vec![date(10)]);
        assert!(outcome.warnings.iter().any(|w| w.contains("2025-01-12")));
    }

    #[test]
    fn summary_unavailable_columns_are_the_fallback() {
        let table = summary(vec![vec![
            "A", "0", "0", "", "", "10-01-2025, 10-01-2025", "None",
        ]]);
        let outcome = reconcile_from_summary(&table, None, None).unwrap();
        let entry = outcome.unavailability.get("A").unwrap();
        assert_eq!(entry.first_half, vec![date(10)]);
        assert!(entry.second_half.is_empty());
    }

    #[test]
    fn dedicated_table_suppresses_summary_fallback() {
        let table = summary(vec![vec![
            "A", "0", "0", "", "", "10-01-2025", "None",
        ]]);
        let dedicated = Table::from_rows(vec!["Faculty", "Date", "Shift"], vec![]);
        let outcome = reconcile_from_summary(&table, None, Some(&dedicated)).unwrap();
        // The dedicated table had no rows, and the summary columns were not
        // consulted because a dedicated table was supplied.
        assert!(outcome.unavailability.is_empty());
    }

    #[test]
    fn upload_gate_rejects_delimited_summary() {
        let upload = Upload::new("summary.csv", b"Faculty\nA\n".to_vec());
        assert!(matches!(
            reconcile_uploads(&upload, None, None),
            Err(RosterError::UnsupportedFormat { .. })
        ));
    }
}
