use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::dates::{format_unavailable_dates, join_display_list};
use crate::error::RosterError;
use crate::model::{DutyAssignment, ExamConfig, FacultyMember, Shift, UnavailabilityMap};

/// Column order of the exported faculty duty summary. The Faculty, Duties
/// and Dates columns must survive editing for the summary to reconcile.
pub const SUMMARY_HEADERS: [&str; 11] = [
    "Faculty",
    "Phone No",
    "Email ID",
    "First Half Duties",
    "Second Half Duties",
    "Total Duties",
    "First Half Dates",
    "Second Half Dates",
    "First Half Unavailable",
    "Second Half Unavailable",
    "Total Unavailable Slots",
];

/// Builds the per-faculty duty summary, one row per roster member in roster
/// order.
pub fn faculty_summary_rows(
    roster: &[FacultyMember],
    assignments: &[DutyAssignment],
    unavailability: &UnavailabilityMap,
) -> Vec<Vec<String>> {
    roster
        .iter()
        .map(|member| {
            let duties = |shift: Shift| -> Vec<NaiveDate> {
                assignments
                    .iter()
                    .filter(|a| a.faculty == member.name && a.shift == shift)
                    .map(|a| a.date)
                    .collect()
            };
            let first = duties(Shift::FirstHalf);
            let second = duties(Shift::SecondHalf);
            let unavailable = unavailability.get(&member.name).cloned().unwrap_or_default();
            vec![
                member.name.clone(),
                member.phone.clone(),
                member.email.clone(),
                first.len().to_string(),
                second.len().to_string(),
                (first.len() + second.len()).to_string(),
                join_display_list(&first),
                join_display_list(&second),
                format_unavailable_dates(&unavailable.first_half),
                format_unavailable_dates(&unavailable.second_half),
                unavailable.total().to_string(),
            ]
        })
        .collect()
}

/// When no roster is on file, the summary falls back to the faculty names
/// observed in the assignments, in first-seen order.
pub fn roster_or_assigned(
    roster: Vec<FacultyMember>,
    assignments: &[DutyAssignment],
) -> Vec<FacultyMember> {
    if !roster.is_empty() {
        return roster;
    }
    let mut seen: Vec<FacultyMember> = Vec::new();
    for assignment in assignments {
        if !seen.iter().any(|m| m.name == assignment.faculty) {
            seen.push(FacultyMember::named(assignment.faculty.clone()));
        }
    }
    seen
}

/// Writes the summary rows as CSV bytes.
pub fn summary_csv(rows: &[Vec<String>]) -> Result<Vec<u8>, RosterError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(SUMMARY_HEADERS)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| RosterError::Io(e.into_error()))
}

/// Renders the assignments as a plain-text duty chart: one block per exam
/// date in ascending order, First Half before Second Half, serial numbers
/// restarting per shift, contact details pulled from the roster.
pub fn duty_chart(
    assignments: &[DutyAssignment],
    roster: &[FacultyMember],
    config: &ExamConfig,
) -> String {
    let contacts: BTreeMap<&str, &FacultyMember> =
        roster.iter().map(|m| (m.name.as_str(), m)).collect();

    let mut by_date: BTreeMap<NaiveDate, [Vec<&DutyAssignment>; 2]> = BTreeMap::new();
    for assignment in assignments {
        let slots = by_date.entry(assignment.date).or_default();
        match assignment.shift {
            Shift::FirstHalf => slots[0].push(assignment),
            Shift::SecondHalf => slots[1].push(assignment),
        }
    }

    let mut out = String::new();
    out.push_str(&format!("Department of {}\n", config.department));
    out.push_str(&format!("{}\n\n", config.institute));
    out.push_str(&format!(
        "Examination Duty Chart - {} {} {}\n",
        config.exam_type, config.semester, config.year
    ));
    if config.exam_type == "MID SEM" {
        out.push_str("Time: 09.40 A.M. to 12.00 NOON (1st Half)\n");
        out.push_str("      01.40 P.M. to 04.00 P.M. (2nd Half)\n");
    } else {
        out.push_str("Time: 09.40 A.M. to 01.00 P.M. (1st Half)\n");
        out.push_str("      01.40 P.M. to 05.00 P.M. (2nd Half)\n");
    }

    for (date, slots) in &by_date {
        out.push_str(&format!("\n{} ({})\n", date.format("%d.%m.%Y"), date.format("%A")));
        for (shift, duty_list) in [(Shift::FirstHalf, &slots[0]), (Shift::SecondHalf, &slots[1])] {
            if duty_list.is_empty() {
                continue;
            }
            out.push_str(&format!("  {}\n", shift));
            for (serial, assignment) in duty_list.iter().enumerate() {
                let mut line = format!("    {}. {}", serial + 1, assignment.faculty);
                if let Some(member) = contacts.get(assignment.faculty.as_str()) {
                    if !member.phone.is_empty() {
                        line.push_str(&format!("  {}", member.phone));
                    }
                    if !member.email.is_empty() {
                        line.push_str(&format!("  {}", member.email));
                    }
                }
                line.push('\n');
                out.push_str(&line);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UnavailableDates;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn assignment(d: u32, shift: Shift, faculty: &str) -> DutyAssignment {
        DutyAssignment {
            date: date(d),
            shift,
            faculty: faculty.to_string(),
        }
    }

    #[test]
    fn summary_rows_follow_roster_order() {
        let roster = vec![FacultyMember::named("A"), FacultyMember::named("B")];
        let assignments = vec![
            assignment(12, Shift::FirstHalf, "A"),
            assignment(10, Shift::FirstHalf, "A"),
            assignment(10, Shift::SecondHalf, "B"),
        ];
        let mut unavailability = UnavailabilityMap::new();
        unavailability.insert(
            "A".to_string(),
            UnavailableDates {
                first_half: vec![date(20)],
                second_half: vec![],
            },
        );

        let rows = faculty_summary_rows(&roster, &assignments, &unavailability);
        assert_eq!(rows.len(), 2);
        let a = &rows[0];
        assert_eq!(a[0], "A");
        assert_eq!(a[3], "2");
        assert_eq!(a[5], "2");
        // Duty dates render sorted ascending.
        assert_eq!(a[6], "10-01-2025, 12-01-2025");
        assert_eq!(a[8], "20-01-2025");
        assert_eq!(a[10], "1");
        let b = &rows[1];
        assert_eq!(b[4], "1");
        assert_eq!(b[8], "None");
        assert_eq!(b[10], "0");
    }

    #[test]
    fn missing_roster_falls_back_to_assigned_names() {
        let assignments = vec![
            assignment(10, Shift::FirstHalf, "B"),
            assignment(10, Shift::SecondHalf, "A"),
            assignment(11, Shift::FirstHalf, "B"),
        ];
        let roster = roster_or_assigned(Vec::new(), &assignments);
        let names: Vec<&str> = roster.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn summary_csv_round_trips_through_table() {
        let roster = vec![FacultyMember::named("A")];
        let assignments = vec![assignment(10, Shift::FirstHalf, "A")];
        let rows = faculty_summary_rows(&roster, &assignments, &UnavailabilityMap::new());
        let bytes = summary_csv(&rows).unwrap();

        let table = crate::table::Table::from_csv(&bytes).unwrap();
        let outcome = crate::reconcile::reconcile_from_summary(&table, None, None).unwrap();
        assert_eq!(outcome.assignments, assignments);
    }

    #[test]
    fn chart_groups_by_date_and_shift() {
        let mut member = FacultyMember::named("A");
        member.phone = "12345".to_string();
        let roster = vec![member, FacultyMember::named("B")];
        let assignments = vec![
            assignment(11, Shift::SecondHalf, "B"),
            assignment(10, Shift::FirstHalf, "A"),
        ];
        let chart = duty_chart(&assignments, &roster, &ExamConfig::default());

        let first_day = chart.find("10.01.2025").unwrap();
        let second_day = chart.find("11.01.2025").unwrap();
        assert!(first_day < second_day);
        assert!(chart.contains("1. A  12345"));
        assert!(chart.contains("Second Half"));
        assert!(chart.contains("Examination Duty Chart - MID SEM MO 2025"));
    }
}
