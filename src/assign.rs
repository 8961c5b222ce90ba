use serde_json::Value;

use crate::dates;
use crate::error::RosterError;
use crate::model::{DutyAssignment, Shift, SlotRequirement};

/// Distributes duties over the schedule by cycling through the faculty list.
///
/// One rotation index runs across the whole schedule; it is not reset per
/// date or per shift, so duties spread in roster order across the run.
/// Schedule entries are processed in input order, First Half before Second
/// Half within each entry. Unavailability and per-faculty load are
/// deliberately not consulted.
pub fn generate_assignments(
    faculty_names: &[String],
    schedule: &[SlotRequirement],
) -> Vec<DutyAssignment> {
    let mut assignments = Vec::new();
    if faculty_names.is_empty() {
        // Nothing to rotate over; every slot stays unstaffed.
        return assignments;
    }
    let mut idx = 0usize;
    for entry in schedule {
        for (shift, required) in [
            (Shift::FirstHalf, entry.first_half),
            (Shift::SecondHalf, entry.second_half),
        ] {
            // Negative counts iterate zero times.
            for _ in 0..required.max(0) {
                assignments.push(DutyAssignment {
                    date: entry.date,
                    shift,
                    faculty: faculty_names[idx % faculty_names.len()].clone(),
                });
                idx += 1;
            }
        }
    }
    assignments
}

/// Decodes the free-form schedule dicts the HTTP layer receives into typed
/// requirements. A missing or unreadable `date` is a configuration error;
/// missing or non-numeric counts default to zero.
pub fn slot_requirements_from_json(entries: &[Value]) -> Result<Vec<SlotRequirement>, RosterError> {
    let mut schedule = Vec::with_capacity(entries.len());
    for entry in entries {
        let raw_date = entry
            .get("date")
            .and_then(Value::as_str)
            .ok_or_else(|| RosterError::schedule_config("schedule entry is missing a 'date' value"))?;
        let date = dates::parse_flexible(raw_date).map_err(|_| {
            RosterError::schedule_config(format!("invalid schedule date '{}'", raw_date))
        })?;
        schedule.push(SlotRequirement {
            date,
            first_half: count_field(entry, "first_half"),
            second_half: count_field(entry, "second_half"),
        });
    }
    Ok(schedule)
}

fn count_field(entry: &Value, key: &str) -> i64 {
    entry.get(key).and_then(Value::as_i64).unwrap_or(0)
}

/// Pulls the rotation-order name list out of free-form faculty dicts,
/// accepting either a `faculty` or `Faculty` key per entry.
pub fn faculty_names_from_json(entries: &[Value]) -> Vec<String> {
    entries
        .iter()
        .filter_map(|entry| {
            entry
                .get("faculty")
                .or_else(|| entry.get("Faculty"))
                .and_then(Value::as_str)
                .map(|name| name.trim().to_string())
        })
        .filter(|name| !name.is_empty())
        .collect()
}
