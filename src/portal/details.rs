//! Section detail retrieval: seat counts, meeting times, instructors.

use crate::models::{CourseSectionMapping, MeetingTime, SectionRecord, split_section_code};
use crate::portal::errors::PortalError;
use crate::portal::json::parse_portal_json;
use crate::portal::session::SessionManager;
use crate::portal::transport::Transport;
use crate::portal::wire;
use crate::utils::fmt_duration;
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{info, warn};

pub const SECTIONS_PATH: &str = "/Student/Courses/Sections";

/// What a detail batch produced: every section that parsed, plus one error
/// string per course whose request failed outright. Partial results are
/// always preferred over total failure.
#[derive(Debug, Default)]
pub struct DetailOutcome {
    pub sections: Vec<SectionRecord>,
    pub errors: Vec<String>,
}

/// Client for the portal's sections endpoint.
///
/// One request per course, all gated by the request limiter shared with the
/// search client so the two phases cannot starve each other past the
/// configured bound.
pub struct DetailClient {
    transport: Arc<dyn Transport>,
    sessions: Arc<SessionManager>,
    limiter: Arc<Semaphore>,
    base_url: String,
}

impl DetailClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        sessions: Arc<SessionManager>,
        limiter: Arc<Semaphore>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            sessions,
            limiter,
            base_url: base_url.into(),
        }
    }

    /// Fetch section records for every course in the mapping.
    ///
    /// Courses with an empty section-id list are skipped. A failing course
    /// never aborts its siblings; its error is carried in the outcome for the
    /// orchestrator to aggregate.
    pub async fn details(&self, mapping: &CourseSectionMapping) -> DetailOutcome {
        let courses: Vec<(&String, &Vec<String>)> = mapping
            .iter()
            .filter(|(_, section_ids)| !section_ids.is_empty())
            .collect();
        if courses.is_empty() {
            return DetailOutcome::default();
        }

        let started = Instant::now();
        let results = join_all(
            courses
                .iter()
                .map(|(course_id, section_ids)| self.course_sections(course_id, section_ids)),
        )
        .await;

        let mut outcome = DetailOutcome::default();
        for ((course_id, _), result) in courses.iter().zip(results) {
            match result {
                Ok(sections) => outcome.sections.extend(sections),
                Err(e) => {
                    warn!(course_id = %course_id, error = %e, "section detail request failed");
                    outcome
                        .errors
                        .push(format!("failed to get sections for course {course_id}: {e}"));
                }
            }
        }

        info!(
            courses = courses.len(),
            sections = outcome.sections.len(),
            failed_courses = outcome.errors.len(),
            duration = fmt_duration(started.elapsed()),
            "detail phase completed"
        );
        outcome
    }

    async fn course_sections(
        &self,
        course_id: &str,
        section_ids: &[String],
    ) -> Result<Vec<SectionRecord>, PortalError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| PortalError::network(anyhow::anyhow!("request limiter closed")))?;

        let url = format!("{}{}", self.base_url, SECTIONS_PATH);
        let payload = json!({
            "courseId": course_id,
            "sectionIds": section_ids,
        });
        let session = self.sessions.acquire().await?;

        let mut response = self
            .transport
            .post_json(&url, &session.request_headers(&self.base_url), &payload)
            .await?;

        if is_auth_status(response.status) {
            warn!(
                course_id,
                status = response.status,
                "detail request rejected as unauthenticated, refreshing session"
            );
            let session = self.sessions.force_refresh().await?;
            response = self
                .transport
                .post_json(&url, &session.request_headers(&self.base_url), &payload)
                .await?;
            if is_auth_status(response.status) {
                return Err(PortalError::Authentication(format!(
                    "detail request still rejected after session refresh (status {})",
                    response.status
                )));
            }
        }

        if response.status != 200 {
            return Err(PortalError::Request {
                status: response.status,
            });
        }

        let parsed: wire::SectionsResponse =
            parse_portal_json(&response.body).map_err(|source| PortalError::Parse {
                url: url.clone(),
                source,
            })?;

        Ok(parse_sections(course_id, parsed))
    }
}

/// Auth signals for detail calls: besides 401/403, the portal redirects
/// expired sessions to the login page.
fn is_auth_status(status: u16) -> bool {
    matches!(status, 302 | 401 | 403)
}

/// Walk the nested term/section structure into flat records.
///
/// A record that fails to deserialize is logged and skipped; its siblings
/// survive. The term label is attached exactly once here.
fn parse_sections(course_id: &str, response: wire::SectionsResponse) -> Vec<SectionRecord> {
    let mut records = Vec::new();
    for term_block in response.sections_retrieved.terms_and_sections {
        let term_label = term_block.term.description;
        for raw in term_block.sections {
            match serde_json::from_value::<wire::SectionEntry>(raw) {
                Ok(entry) => records.push(record_from_entry(entry, &term_label)),
                Err(e) => {
                    warn!(course_id, error = %e, "skipping malformed section record");
                }
            }
        }
    }
    records
}

fn record_from_entry(entry: wire::SectionEntry, term_label: &str) -> SectionRecord {
    let info = entry.section;
    let (subject_code, course_number) = split_section_code(&info.section_name_display);

    // Prefer the display string; fall back to structured rows, dropping
    // duplicate names.
    let mut instructors: Vec<String> = Vec::new();
    let display = entry.faculty_display.trim();
    if !display.is_empty() {
        instructors.push(display.to_string());
    }
    for detail in &entry.instructor_details {
        let name = detail.faculty_name.trim();
        if !name.is_empty() && !instructors.iter().any(|n| n == name) {
            instructors.push(name.to_string());
        }
    }

    let meeting_times = info
        .formatted_meeting_times
        .into_iter()
        .map(|m| MeetingTime {
            days: m.days_of_week_display,
            start_time: m.start_time_display,
            end_time: m.end_time_display,
            location: format!("{} {}", m.building_display, m.room_display)
                .trim()
                .to_string(),
            is_online: m.is_online,
        })
        .collect();

    SectionRecord {
        section_id: info.id,
        course_id: info.course_id,
        subject_code,
        course_number,
        section_code: info.section_name_display,
        title: info.section_title_display,
        available_seats: info.available.max(0) as u32,
        total_capacity: info.capacity.max(0) as u32,
        enrolled_count: info.enrolled.max(0) as u32,
        waitlist_count: info.waitlisted.max(0) as u32,
        start_date: info.start_date_display,
        end_date: info.end_date_display,
        location: info.location_display,
        credits: info.minimum_credits,
        term: (!term_label.is_empty()).then(|| term_label.to_string()),
        instructors,
        meeting_times,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::json::parse_portal_json;

    fn sections_body() -> String {
        json!({
            "SectionsRetrieved": {
                "TermsAndSections": [{
                    "Term": { "Description": "Spring 2026" },
                    "Sections": [
                        {
                            "Section": {
                                "Id": "343584",
                                "CourseId": "C1",
                                "SectionNameDisplay": "CCT-110-N886",
                                "SectionTitleDisplay": "Intro to Cyber Crime",
                                "Available": 19,
                                "Capacity": 24,
                                "Enrolled": 5,
                                "Waitlisted": 0,
                                "StartDateDisplay": "2026-01-12",
                                "EndDateDisplay": "2026-05-12",
                                "LocationDisplay": "Central Campus",
                                "MinimumCredits": 3.0,
                                "FormattedMeetingTimes": [{
                                    "DaysOfWeekDisplay": "M/W",
                                    "StartTimeDisplay": "10:00 AM",
                                    "EndTimeDisplay": "11:15 AM",
                                    "BuildingDisplay": "Central High",
                                    "RoomDisplay": "204",
                                    "IsOnline": false
                                }]
                            },
                            "FacultyDisplay": "J. Rivera",
                            "InstructorDetails": [
                                { "FacultyName": "J. Rivera" },
                                { "FacultyName": "A. Chen" }
                            ]
                        },
                        { "Section": "not an object" }
                    ]
                }]
            }
        })
        .to_string()
    }

    #[test]
    fn parses_records_and_skips_malformed_siblings() {
        let response: wire::SectionsResponse = parse_portal_json(&sections_body()).unwrap();
        let records = parse_sections("C1", response);
        // The malformed second entry is dropped, not fatal.
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.section_id, "343584");
        assert_eq!(record.subject_code, "CCT");
        assert_eq!(record.course_number, "110");
        assert_eq!(record.available_seats, 19);
        assert_eq!(record.term.as_deref(), Some("Spring 2026"));
        assert_eq!(record.meeting_times[0].location, "Central High 204");
    }

    #[test]
    fn instructors_deduplicate_across_sources() {
        let response: wire::SectionsResponse = parse_portal_json(&sections_body()).unwrap();
        let records = parse_sections("C1", response);
        assert_eq!(records[0].instructors, vec!["J. Rivera", "A. Chen"]);
    }

    #[test]
    fn negative_counts_clamp_to_zero() {
        let entry = wire::SectionEntry {
            section: wire::SectionInfo {
                available: -3,
                ..Default::default()
            },
            ..Default::default()
        };
        let record = record_from_entry(entry, "");
        assert_eq!(record.available_seats, 0);
        assert_eq!(record.term, None);
    }
}
