//! Course search against the portal's catalog search endpoint.

use crate::models::{CourseSectionMapping, MAX_SUBJECT_LEN};
use crate::portal::errors::PortalError;
use crate::portal::json::parse_portal_json;
use crate::portal::session::SessionManager;
use crate::portal::transport::Transport;
use crate::portal::wire;
use crate::utils::fmt_duration;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{info, warn};

pub const SEARCH_PATH: &str = "/Student/Courses/PostSearchCriteria";

/// Page size requested from the portal. Only the first page is fetched;
/// results are capped at one page's worth of courses per call.
const PAGE_SIZE: u32 = 30;

/// Parsed outcome of one search call.
#[derive(Debug, Default)]
pub struct SubjectSearch {
    pub courses: Vec<wire::CourseEntry>,
    /// Course id to matching section ids, for courses that have any.
    pub mapping: CourseSectionMapping,
}

/// Client for the portal's search endpoint.
///
/// Calls are gated by the process-wide request limiter shared with the detail
/// client, and retried exactly once after a forced session refresh when the
/// portal answers with an authentication status.
pub struct SearchClient {
    transport: Arc<dyn Transport>,
    sessions: Arc<SessionManager>,
    limiter: Arc<Semaphore>,
    base_url: String,
    max_subjects: usize,
}

impl SearchClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        sessions: Arc<SessionManager>,
        limiter: Arc<Semaphore>,
        base_url: impl Into<String>,
        max_subjects: usize,
    ) -> Self {
        Self {
            transport,
            sessions,
            limiter,
            base_url: base_url.into(),
            max_subjects,
        }
    }

    /// Search for courses by subject code, optionally constrained to a term.
    pub async fn search(
        &self,
        subjects: &[String],
        term: Option<&str>,
    ) -> Result<SubjectSearch, PortalError> {
        if subjects.is_empty() {
            return Err(PortalError::Validation(
                "at least one subject code is required".to_string(),
            ));
        }
        if subjects.len() > self.max_subjects {
            return Err(PortalError::Validation(format!(
                "too many subjects requested, maximum is {}",
                self.max_subjects
            )));
        }
        for subject in subjects {
            if subject.trim().is_empty() || subject.trim().len() > MAX_SUBJECT_LEN {
                return Err(PortalError::Validation(format!(
                    "invalid subject code: '{subject}'"
                )));
            }
        }

        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| PortalError::network(anyhow::anyhow!("request limiter closed")))?;
        self.perform_search(subjects, term).await
    }

    async fn perform_search(
        &self,
        subjects: &[String],
        term: Option<&str>,
    ) -> Result<SubjectSearch, PortalError> {
        let url = format!("{}{}", self.base_url, SEARCH_PATH);
        let payload = search_payload(subjects, term);
        let session = self.sessions.acquire().await?;

        let started = Instant::now();
        let mut response = self
            .transport
            .post_json(&url, &session.request_headers(&self.base_url), &payload)
            .await?;

        if is_auth_status(response.status) {
            warn!(
                status = response.status,
                "search rejected as unauthenticated, refreshing session"
            );
            let session = self.sessions.force_refresh().await?;
            response = self
                .transport
                .post_json(&url, &session.request_headers(&self.base_url), &payload)
                .await?;
            if is_auth_status(response.status) {
                return Err(PortalError::Authentication(format!(
                    "search still rejected after session refresh (status {})",
                    response.status
                )));
            }
        }

        if response.status != 200 {
            return Err(PortalError::Request {
                status: response.status,
            });
        }

        let parsed: wire::SearchResponse =
            parse_portal_json(&response.body).map_err(|source| PortalError::Parse {
                url: url.clone(),
                source,
            })?;

        let mut mapping = CourseSectionMapping::new();
        for course in &parsed.courses {
            if !course.matching_section_ids.is_empty() {
                mapping.insert(course.id.clone(), course.matching_section_ids.clone());
            }
        }

        let section_count: usize = mapping.values().map(Vec::len).sum();
        info!(
            subjects = ?subjects,
            term = term.unwrap_or("any"),
            courses = parsed.courses.len(),
            sections = section_count,
            total_pages = parsed.total_pages,
            duration = fmt_duration(started.elapsed()),
            "search completed"
        );

        Ok(SubjectSearch {
            courses: parsed.courses,
            mapping,
        })
    }
}

fn is_auth_status(status: u16) -> bool {
    matches!(status, 401 | 403)
}

/// Build the portal's fixed-shape search payload.
///
/// All filters besides subjects/terms are held at the defaults the portal UI
/// submits; only the first page is requested.
pub fn search_payload(subjects: &[String], term: Option<&str>) -> serde_json::Value {
    json!({
        "keyword": null,
        "terms": term.map(|t| vec![t]).unwrap_or_default(),
        "requirement": null,
        "subrequirement": null,
        "courseIds": null,
        "sectionIds": null,
        "requirementText": null,
        "subrequirementText": "",
        "group": null,
        "startTime": null,
        "endTime": null,
        "openSections": null,
        "subjects": subjects,
        "academicLevels": [],
        "courseLevels": [],
        "synonyms": [],
        "courseTypes": [],
        "topicCodes": [],
        "days": [],
        "locations": [],
        "faculty": [],
        "onlineCategories": null,
        "keywordComponents": [],
        "startDate": null,
        "endDate": null,
        "startsAtTime": null,
        "endsByTime": null,
        "pageNumber": 1,
        "sortOn": "None",
        "sortDirection": "Ascending",
        "quantityPerPage": PAGE_SIZE,
        "searchResultsView": "CatalogListing",
    })
}
