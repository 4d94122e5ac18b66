//! Text rendering of query results

use chrono::{DateTime, Local, Utc};
use std::fmt::Write;

use crate::data::{QueryResult, Snapshot};

/// Renders the results for one exam number as printed by the CLI
pub fn render_results(exam_number: &str, results: &[QueryResult]) -> String {
    if results.is_empty() {
        return format!("No information found for exam number {}\n", exam_number);
    }

    let mut out = format!("Status for exam number {}:\n", exam_number);
    for result in results {
        let _ = writeln!(out, "Department: {}", result.department);
        let _ = writeln!(out, "Name: {}", result.name);
        let _ = writeln!(out, "Status: {}", result.status);
        let _ = writeln!(out, "Position in queue: {}", result.position);
        let _ = writeln!(out, "People ahead: {}", result.people_ahead.len());
        if !result.people_ahead.is_empty() {
            out.push_str("List of people ahead:\n");
            for person in &result.people_ahead {
                let _ = writeln!(
                    out,
                    "  - Exam Number: {}, Name: {}, Status: {}",
                    person.exam_number, person.name, person.status
                );
            }
        }
        out.push_str("---\n");
    }
    out
}

/// One-line summary of what the snapshot holds and how old it is
pub fn render_snapshot_age(snapshot: &Snapshot, now: DateTime<Utc>) -> String {
    let updated = match snapshot.last_update {
        None => "never updated".to_string(),
        Some(at) => {
            let minutes = now.signed_duration_since(at).num_minutes().max(0);
            format!(
                "last update {} ({} min ago)",
                at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
                minutes
            )
        }
    };
    format!(
        "{} departments, {} students, {}",
        snapshot.departments.len(),
        snapshot.student_count(),
        updated
    )
}
