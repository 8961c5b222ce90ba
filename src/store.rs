use std::fs;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::RosterError;
use crate::model::{DutyAssignment, ExamConfig, FacultyMember, SlotRequirement, UnavailabilityMap};
use crate::table::Table;

pub const FACULTY_FILE: &str = "faculty_upload.csv";
pub const GROUPS_FILE: &str = "faculty_groups.json";
pub const UNAVAILABILITY_FILE: &str = "faculty_unavailability.json";
pub const SCHEDULE_FILE: &str = "exam_schedule.json";
pub const ASSIGNMENTS_FILE: &str = "assignments.json";
pub const CONFIG_FILE: &str = "exam_config.json";

/// On-disk home of the persisted artifacts.
///
/// Every artifact is read and replaced wholesale. A missing file reads as
/// the empty value, never as an error. Writes serialize fully in memory
/// before touching the file, so a failed write cannot leave a half-written
/// artifact behind.
#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn new(dir: impl Into<PathBuf>) -> Store {
        Store { dir: dir.into() }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str, empty: T) -> Result<T, RosterError> {
        let path = self.path(name);
        if !path.exists() {
            return Ok(empty);
        }
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<(), RosterError> {
        let text = serde_json::to_string(value)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(name), text)?;
        Ok(())
    }

    pub fn load_schedule(&self) -> Result<Vec<SlotRequirement>, RosterError> {
        self.read_json(SCHEDULE_FILE, Vec::new())
    }

    pub fn save_schedule(&self, schedule: &[SlotRequirement]) -> Result<(), RosterError> {
        self.write_json(SCHEDULE_FILE, schedule)
    }

    /// Removes schedule entries matching the given storage-form date.
    pub fn delete_schedule_date(&self, date: &str) -> Result<(), RosterError> {
        let schedule = self.load_schedule()?;
        let remaining: Vec<SlotRequirement> = schedule
            .into_iter()
            .filter(|entry| crate::dates::storage_key(entry.date) != date)
            .collect();
        self.save_schedule(&remaining)
    }

    pub fn load_assignments(&self) -> Result<Vec<DutyAssignment>, RosterError> {
        self.read_json(ASSIGNMENTS_FILE, Vec::new())
    }

    pub fn save_assignments(&self, assignments: &[DutyAssignment]) -> Result<(), RosterError> {
        self.write_json(ASSIGNMENTS_FILE, assignments)
    }

    pub fn load_unavailability(&self) -> Result<UnavailabilityMap, RosterError> {
        self.read_json(UNAVAILABILITY_FILE, UnavailabilityMap::new())
    }

    pub fn save_unavailability(&self, map: &UnavailabilityMap) -> Result<(), RosterError> {
        self.write_json(UNAVAILABILITY_FILE, map)
    }

    /// Faculty groups are an opaque JSON blob passed through unchanged.
    pub fn load_groups(&self) -> Result<serde_json::Value, RosterError> {
        self.read_json(GROUPS_FILE, serde_json::Value::Array(Vec::new()))
    }

    pub fn save_groups(&self, groups: &serde_json::Value) -> Result<(), RosterError> {
        self.write_json(GROUPS_FILE, groups)
    }

    pub fn load_config(&self) -> Result<ExamConfig, RosterError> {
        self.read_json(CONFIG_FILE, ExamConfig::default())
    }

    pub fn save_config(&self, config: &ExamConfig) -> Result<(), RosterError> {
        self.write_json(CONFIG_FILE, config)
    }

    /// The roster is kept as the uploaded table, converted to CSV with its
    /// headers preserved.
    pub fn load_roster_table(&self) -> Result<Table, RosterError> {
        let path = self.path(FACULTY_FILE);
        if !path.exists() {
            return Ok(Table::default());
        }
        Table::from_csv(&fs::read(path)?)
    }

    pub fn save_roster_table(&self, table: &Table) -> Result<(), RosterError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(table.headers())?;
        for row in 0..table.row_count() {
            writer.write_record(table.row(row))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| RosterError::Io(e.into_error()))?;
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(FACULTY_FILE), bytes)?;
        Ok(())
    }

    pub fn load_faculty(&self) -> Result<Vec<FacultyMember>, RosterError> {
        Ok(faculty_from_table(&self.load_roster_table()?))
    }
}

/// Maps a roster table to members, tolerating the header variants seen in
/// real uploads (`faculty`/`Faculty`, `Phone No`, `Email Id`/`Email ID`/
/// `email`). Rows without a name are dropped.
pub fn faculty_from_table(table: &Table) -> Vec<FacultyMember> {
    let Some(name_col) = table.column_any(&["faculty"]) else {
        return Vec::new();
    };
    let phone_col = table.column_any(&["Phone No", "phone"]);
    let email_col = table.column_any(&["Email Id", "Email ID", "email"]);

    (0..table.row_count())
        .filter_map(|row| {
            let name = table.cell(row, name_col).trim();
            if name.is_empty() {
                return None;
            }
            Some(FacultyMember {
                name: name.to_string(),
                phone: phone_col
                    .map(|c| table.cell(row, c).trim().to_string())
                    .unwrap_or_default(),
                email: email_col
                    .map(|c| table.cell(row, c).trim().to_string())
                    .unwrap_or_default(),
            })
        })
        .collect()
}
