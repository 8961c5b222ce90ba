use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One faculty member from the uploaded roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacultyMember {
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

impl FacultyMember {
    pub fn named(name: impl Into<String>) -> FacultyMember {
        FacultyMember {
            name: name.into(),
            phone: String::new(),
            email: String::new(),
        }
    }
}

/// The two fixed daily exam periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Shift {
    #[serde(rename = "First Half")]
    FirstHalf,
    #[serde(rename = "Second Half")]
    SecondHalf,
}

impl Shift {
    pub fn label(self) -> &'static str {
        match self {
            Shift::FirstHalf => "First Half",
            Shift::SecondHalf => "Second Half",
        }
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Invigilator demand for one exam date.
///
/// Counts are signed on purpose: negative inputs are not rejected anywhere,
/// the generator simply iterates them zero times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotRequirement {
    pub date: NaiveDate,
    #[serde(default)]
    pub first_half: i64,
    #[serde(default)]
    pub second_half: i64,
}

/// One faculty member assigned to one (date, shift) slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DutyAssignment {
    pub date: NaiveDate,
    pub shift: Shift,
    pub faculty: String,
}

/// Dates one faculty member cannot invigilate, split by shift.
/// Kept as lists at rest; insertion dedupes by date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnavailableDates {
    #[serde(default)]
    pub first_half: Vec<NaiveDate>,
    #[serde(default)]
    pub second_half: Vec<NaiveDate>,
}

impl UnavailableDates {
    /// Appends a date to the given shift's list unless already present.
    pub fn insert(&mut self, shift: Shift, date: NaiveDate) {
        let list = match shift {
            Shift::FirstHalf => &mut self.first_half,
            Shift::SecondHalf => &mut self.second_half,
        };
        if !list.contains(&date) {
            list.push(date);
        }
    }

    pub fn total(&self) -> usize {
        self.first_half.len() + self.second_half.len()
    }
}

/// Per-faculty unavailability, keyed by faculty name.
pub type UnavailabilityMap = HashMap<String, UnavailableDates>;

/// Report header metadata. Opaque to the scheduling logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExamConfig {
    pub exam_type: String,
    pub semester: String,
    pub year: String,
    pub department: String,
    pub institute: String,
}

impl Default for ExamConfig {
    fn default() -> ExamConfig {
        ExamConfig {
            exam_type: "MID SEM".to_string(),
            semester: "MO".to_string(),
            year: "2025".to_string(),
            department: "Computer Science & Engineering".to_string(),
            institute: "BIT MESRA, RANCHI".to_string(),
        }
    }
}
