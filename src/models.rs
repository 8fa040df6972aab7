//! Domain models for enrollment reporting.
//!
//! These are the crate's own types, independent of the portal's wire shapes
//! (see `portal::wire` for the adapter boundary).

use crate::portal::errors::PortalError;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Longest subject code the portal accepts.
pub const MAX_SUBJECT_LEN: usize = 10;

/// Mapping from course identifier to its matching section identifiers.
///
/// Insertion-ordered so merged results are deterministic regardless of which
/// (subject, term) search completed first.
pub type CourseSectionMapping = IndexMap<String, Vec<String>>;

/// Trim, upper-case, and deduplicate subject codes, preserving first-seen order.
///
/// Empty entries are dropped; an over-long code or an empty final set is a
/// validation error. Runs before any network call is attempted.
pub fn normalize_subjects(raw: &[String]) -> Result<Vec<String>, PortalError> {
    let mut subjects: Vec<String> = Vec::with_capacity(raw.len());
    for entry in raw {
        let code = entry.trim().to_uppercase();
        if code.is_empty() {
            continue;
        }
        if code.len() > MAX_SUBJECT_LEN {
            return Err(PortalError::Validation(format!(
                "subject code too long: '{code}'"
            )));
        }
        if !subjects.contains(&code) {
            subjects.push(code);
        }
    }
    if subjects.is_empty() {
        return Err(PortalError::Validation(
            "no valid subjects provided".to_string(),
        ));
    }
    Ok(subjects)
}

/// Union `other` into `into`, deduplicating section ids per course while
/// preserving first-seen order. Idempotent and order-independent in the
/// resulting set of ids.
pub fn merge_section_mappings(into: &mut CourseSectionMapping, other: CourseSectionMapping) {
    for (course_id, section_ids) in other {
        let existing = into.entry(course_id).or_default();
        for id in section_ids {
            if !existing.contains(&id) {
                existing.push(id);
            }
        }
    }
}

/// One scheduled meeting block of a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingTime {
    pub days: String,
    pub start_time: String,
    pub end_time: String,
    /// Building and room combined into one display string.
    pub location: String,
    pub is_online: bool,
}

/// Seat-count report for one section of a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRecord {
    pub section_id: String,
    pub course_id: String,
    /// Derived from `section_code`; empty when the code doesn't split.
    pub subject_code: String,
    /// Derived from `section_code`; empty when the code doesn't split.
    pub course_number: String,
    /// Portal display code, e.g. `CCT-110-N886`.
    pub section_code: String,
    pub title: String,
    pub available_seats: u32,
    pub total_capacity: u32,
    pub enrolled_count: u32,
    pub waitlist_count: u32,
    /// Opaque display strings from the portal, not parsed further.
    pub start_date: String,
    pub end_date: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits: Option<f64>,
    /// Term label, set exactly once during detail parsing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    pub instructors: Vec<String>,
    pub meeting_times: Vec<MeetingTime>,
}

/// Split a section code like `CCT-110-N886` into `(subject, course number)`.
///
/// Fewer than two parts yields empty strings rather than an error.
pub fn split_section_code(section_code: &str) -> (String, String) {
    let mut parts = section_code.split('-');
    match (parts.next(), parts.next()) {
        (Some(subject), Some(number)) => (subject.to_string(), number.to_string()),
        _ => (String::new(), String::new()),
    }
}

/// Assembled result of one enrollment fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResult {
    /// Normalized subject codes that were requested.
    pub subjects: Vec<String>,
    /// Resolved term; `None` means every configured term was searched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    pub sections: Vec<SectionRecord>,
    pub total_sections: usize,
    pub retrieved_at: DateTime<Utc>,
    pub processing_time_seconds: f64,
    /// Per-unit failure descriptions. `None` on a fully clean fetch, never an
    /// empty list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalize_trims_uppercases_dedups() {
        let result = normalize_subjects(&strs(&[" csc ", "MAT", "csc", ""])).unwrap();
        assert_eq!(result, vec!["CSC", "MAT"]);
    }

    #[test]
    fn normalize_rejects_all_blank_input() {
        let err = normalize_subjects(&strs(&["", "   "])).unwrap_err();
        assert!(matches!(err, PortalError::Validation(_)));
    }

    #[test]
    fn normalize_rejects_overlong_code() {
        let err = normalize_subjects(&strs(&["ABCDEFGHIJK"])).unwrap_err();
        assert!(matches!(err, PortalError::Validation(_)));
    }

    #[test]
    fn merge_is_order_independent() {
        let mut forward = CourseSectionMapping::new();
        forward.insert("C1".to_string(), strs(&["s1", "s2"]));
        let mut reverse = CourseSectionMapping::new();
        reverse.insert("C1".to_string(), strs(&["s2", "s3"]));

        let mut a = forward.clone();
        merge_section_mappings(&mut a, reverse.clone());
        assert_eq!(a["C1"], strs(&["s1", "s2", "s3"]));

        let mut b = reverse;
        merge_section_mappings(&mut b, forward);
        // First-seen order differs, but the set of ids is identical.
        assert_eq!(b["C1"], strs(&["s2", "s3", "s1"]));
    }

    #[test]
    fn merge_is_idempotent() {
        let mut mapping = CourseSectionMapping::new();
        mapping.insert("C1".to_string(), strs(&["s1"]));
        let again = mapping.clone();
        merge_section_mappings(&mut mapping, again);
        assert_eq!(mapping["C1"], strs(&["s1"]));
    }

    #[test]
    fn section_code_split() {
        assert_eq!(
            split_section_code("CCT-110-N886"),
            ("CCT".to_string(), "110".to_string())
        );
        assert_eq!(
            split_section_code("343584"),
            (String::new(), String::new())
        );
    }

    #[test]
    fn clean_result_serializes_without_errors_field() {
        let result = EnrollmentResult {
            subjects: strs(&["CSC"]),
            term: None,
            sections: vec![],
            total_sections: 0,
            retrieved_at: Utc::now(),
            processing_time_seconds: 0.0,
            errors: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("errors").is_none());
        assert!(json.get("term").is_none());
    }
}
