//! Wire-level shapes of the portal's JSON responses.
//!
//! Field names are portal-specific (PascalCase, Colleague Self-Service style)
//! and deliberately kept out of the rest of the crate: only the search and
//! detail clients construct domain types from these. Everything defaults so a
//! half-populated record deserializes instead of sinking its whole batch;
//! numeric counts use `i64` here and are clamped to `u32` at the domain
//! boundary.

use serde::Deserialize;

/// Response body of the search endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "Courses", default)]
    pub courses: Vec<CourseEntry>,
    #[serde(rename = "TotalItems", default)]
    pub total_items: u64,
    #[serde(rename = "TotalPages", default)]
    pub total_pages: u64,
}

/// One course in a search response.
#[derive(Debug, Default, Deserialize)]
pub struct CourseEntry {
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "SubjectCode", default)]
    pub subject_code: String,
    #[serde(rename = "Number", default)]
    pub number: String,
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "MinimumCredits", default)]
    pub minimum_credits: Option<f64>,
    #[serde(rename = "MatchingSectionIds", default)]
    pub matching_section_ids: Vec<String>,
}

/// Response body of the sections (detail) endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct SectionsResponse {
    #[serde(rename = "SectionsRetrieved", default)]
    pub sections_retrieved: SectionsRetrieved,
}

#[derive(Debug, Default, Deserialize)]
pub struct SectionsRetrieved {
    #[serde(rename = "TermsAndSections", default)]
    pub terms_and_sections: Vec<TermSections>,
}

/// A term block wrapping its sections.
///
/// Individual sections are kept as raw values so one malformed record can be
/// skipped without losing its siblings.
#[derive(Debug, Default, Deserialize)]
pub struct TermSections {
    #[serde(rename = "Term", default)]
    pub term: TermInfo,
    #[serde(rename = "Sections", default)]
    pub sections: Vec<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TermInfo {
    #[serde(rename = "Description", default)]
    pub description: String,
}

/// One section entry inside a term block.
#[derive(Debug, Default, Deserialize)]
pub struct SectionEntry {
    #[serde(rename = "Section", default)]
    pub section: SectionInfo,
    /// Preferred instructor source: a single display string.
    #[serde(rename = "FacultyDisplay", default)]
    pub faculty_display: String,
    /// Fallback instructor source: structured detail rows.
    #[serde(rename = "InstructorDetails", default)]
    pub instructor_details: Vec<InstructorDetail>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SectionInfo {
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "CourseId", default)]
    pub course_id: String,
    #[serde(rename = "SectionNameDisplay", default)]
    pub section_name_display: String,
    #[serde(rename = "SectionTitleDisplay", default)]
    pub section_title_display: String,
    #[serde(rename = "Available", default)]
    pub available: i64,
    #[serde(rename = "Capacity", default)]
    pub capacity: i64,
    #[serde(rename = "Enrolled", default)]
    pub enrolled: i64,
    #[serde(rename = "Waitlisted", default)]
    pub waitlisted: i64,
    #[serde(rename = "StartDateDisplay", default)]
    pub start_date_display: String,
    #[serde(rename = "EndDateDisplay", default)]
    pub end_date_display: String,
    #[serde(rename = "LocationDisplay", default)]
    pub location_display: String,
    #[serde(rename = "MinimumCredits", default)]
    pub minimum_credits: Option<f64>,
    #[serde(rename = "FormattedMeetingTimes", default)]
    pub formatted_meeting_times: Vec<MeetingEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MeetingEntry {
    #[serde(rename = "DaysOfWeekDisplay", default)]
    pub days_of_week_display: String,
    #[serde(rename = "StartTimeDisplay", default)]
    pub start_time_display: String,
    #[serde(rename = "EndTimeDisplay", default)]
    pub end_time_display: String,
    #[serde(rename = "BuildingDisplay", default)]
    pub building_display: String,
    #[serde(rename = "RoomDisplay", default)]
    pub room_display: String,
    #[serde(rename = "IsOnline", default)]
    pub is_online: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct InstructorDetail {
    #[serde(rename = "FacultyName", default)]
    pub faculty_name: String,
}
