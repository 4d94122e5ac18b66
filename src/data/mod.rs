//! Core data models for the enrollment query tool
//!
//! This module contains the types scraped from the enrollment board (student
//! rows and their statuses), the cached snapshot of every department, and the
//! per-department results derived from it.

pub mod query;

pub use query::query_snapshot;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Site label for an admitted student
const LABEL_ADMITTED: &str = "正取";
/// Site label for a waitlisted student
const LABEL_WAITLISTED: &str = "備取";
/// Site label for a student who gave up the seat
const LABEL_GIVEN_UP: &str = "放棄";
/// Placeholder shown for a blank status cell (seat offered, awaiting reply)
const LABEL_PHONE_PENDING: &str = "電話通知錄取中";

/// Admission status of a student in one department
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// Admitted outright
    Admitted,
    /// In the ordered backup queue
    Waitlisted,
    /// Declined or forfeited the seat
    GivenUp,
    /// Seat offered, waiting for the student's response (blank on the site)
    PhonePending,
    /// Any label outside the known vocabulary, kept verbatim
    Other(String),
}

impl Status {
    /// Maps a raw status cell to a Status. Blank cells are phone-pending.
    pub fn from_cell(cell: &str) -> Self {
        match cell.trim() {
            "" | LABEL_PHONE_PENDING => Status::PhonePending,
            LABEL_ADMITTED => Status::Admitted,
            LABEL_WAITLISTED => Status::Waitlisted,
            LABEL_GIVEN_UP => Status::GivenUp,
            other => Status::Other(other.to_string()),
        }
    }

    /// The label the enrollment board uses for this status
    pub fn label(&self) -> &str {
        match self {
            Status::Admitted => LABEL_ADMITTED,
            Status::Waitlisted => LABEL_WAITLISTED,
            Status::GivenUp => LABEL_GIVEN_UP,
            Status::PhonePending => LABEL_PHONE_PENDING,
            Status::Other(label) => label,
        }
    }

    /// Whether a student with this status still competes for a seat.
    ///
    /// Only these rows count as people ahead of a queried student.
    pub fn is_in_motion(&self) -> bool {
        matches!(self, Status::Waitlisted | Status::PhonePending)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single row of a department's admission table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    /// Exam number, unique within a department
    pub exam_number: String,
    /// Student name as printed on the board
    pub name: String,
    /// Normalized admission status
    pub status: Status,
}

impl StudentRecord {
    /// Builds a record from raw cell text, trimming and normalizing the status
    pub fn from_cells(exam_number: &str, name: &str, status: &str) -> Self {
        Self {
            exam_number: exam_number.trim().to_string(),
            name: name.trim().to_string(),
            status: Status::from_cell(status),
        }
    }
}

/// Rows of one department in on-page rank order
pub type DepartmentTable = Vec<StudentRecord>;

/// Cached view of every department's table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Department name to its ranked table
    pub departments: BTreeMap<String, DepartmentTable>,
    /// When the last accepted refresh cycle finished; `None` means never
    pub last_update: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// An empty snapshot that has never been refreshed
    pub fn empty() -> Self {
        Self::default()
    }

    /// Total number of student rows across all departments
    pub fn student_count(&self) -> usize {
        self.departments.values().map(Vec::len).sum()
    }
}

/// Where an exam number stands in one department
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    /// Department name
    pub department: String,
    /// The student's status in this department
    pub status: Status,
    /// The student's name
    pub name: String,
    /// 1-based rank in the department's table
    pub position: usize,
    /// Waitlisted or phone-pending rows ranked above the student, in order
    pub people_ahead: Vec<StudentRecord>,
}
