//! Queue position derivation
//!
//! Computes where an exam number stands in every department of a snapshot:
//! its rank and the students still in motion ahead of it.

use super::{DepartmentTable, QueryResult, Snapshot};

/// Looks up `exam_number` in every department of the snapshot.
///
/// Exam numbers are compared by exact string equality, so `"03001540"` does
/// not match `"3001540"`. An empty result means the number was not found.
pub fn query_snapshot(snapshot: &Snapshot, exam_number: &str) -> Vec<QueryResult> {
    snapshot
        .departments
        .iter()
        .filter_map(|(department, table)| locate(department, table, exam_number))
        .collect()
}

/// Scans one department in rank order, stopping at the first match
fn locate(department: &str, table: &DepartmentTable, exam_number: &str) -> Option<QueryResult> {
    let mut people_ahead = Vec::new();

    for (index, student) in table.iter().enumerate() {
        if student.exam_number == exam_number {
            return Some(QueryResult {
                department: department.to_string(),
                status: student.status.clone(),
                name: student.name.clone(),
                position: index + 1,
                people_ahead,
            });
        }
        if student.status.is_in_motion() {
            people_ahead.push(student.clone());
        }
    }

    None
}
