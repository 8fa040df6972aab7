//! Fan-out coordination for one enrollment fetch.
//!
//! The orchestrator is the only component that fans out: one search per
//! (subject, term) pair, then one detail phase over the merged mapping. A
//! failing pair is recorded and never cancels its siblings; the whole fetch
//! fails only when nothing at all was retrieved.

use crate::models::{
    CourseSectionMapping, EnrollmentResult, merge_section_mappings, normalize_subjects,
};
use crate::portal::errors::PortalError;
use crate::portal::{DetailClient, SearchClient};
use crate::utils::fmt_duration;
use chrono::Utc;
use futures::future::join_all;
use std::time::Instant;
use tracing::{info, warn};

pub struct FetchOrchestrator {
    search: SearchClient,
    details: DetailClient,
    /// Terms searched when the caller gives none. Maintained by hand in
    /// config; an empty list falls back to one term-unconstrained search.
    default_terms: Vec<String>,
}

impl FetchOrchestrator {
    pub fn new(search: SearchClient, details: DetailClient, default_terms: Vec<String>) -> Self {
        Self {
            search,
            details,
            default_terms,
        }
    }

    /// Fetch enrollment data for the given subjects, optionally constrained
    /// to a term.
    pub async fn fetch(
        &self,
        subjects: &[String],
        term: Option<&str>,
    ) -> Result<EnrollmentResult, PortalError> {
        // Validation happens before any network call.
        let subjects = normalize_subjects(subjects)?;

        let retrieved_at = Utc::now();
        let started = Instant::now();

        let terms: Vec<Option<String>> = match term {
            Some(t) => vec![Some(t.to_string())],
            None if !self.default_terms.is_empty() => {
                self.default_terms.iter().cloned().map(Some).collect()
            }
            None => vec![None],
        };

        let pairs: Vec<(String, Option<String>)> = subjects
            .iter()
            .flat_map(|subject| terms.iter().map(|t| (subject.clone(), t.clone())))
            .collect();

        info!(
            subjects = ?subjects,
            pairs = pairs.len(),
            term = term.unwrap_or("all configured"),
            "starting enrollment fetch"
        );

        let results = join_all(pairs.iter().map(|(subject, pair_term)| {
            self.search
                .search(std::slice::from_ref(subject), pair_term.as_deref())
        }))
        .await;

        // Merge in pair order so the outcome is deterministic regardless of
        // which call completed first.
        let mut mapping = CourseSectionMapping::new();
        let mut errors: Vec<String> = Vec::new();
        let mut succeeded = 0usize;
        for ((subject, pair_term), result) in pairs.iter().zip(results) {
            match result {
                Ok(found) => {
                    succeeded += 1;
                    merge_section_mappings(&mut mapping, found.mapping);
                }
                Err(e) => {
                    let scope = match pair_term {
                        Some(t) => format!("{subject} (term {t})"),
                        None => subject.clone(),
                    };
                    warn!(subject = %subject, term = ?pair_term, error = %e, "subject search failed");
                    errors.push(format!("failed to search {scope}: {e}"));
                }
            }
        }

        if mapping.is_empty() {
            if succeeded == 0 && !errors.is_empty() {
                // Nothing usable at all: escalate to a hard failure.
                return Err(PortalError::Aggregate(errors.join("; ")));
            }
            // Legitimate "no sections match". Errors from failed pairs ride
            // along when some pairs did succeed.
            let clean = errors.is_empty();
            return Ok(EnrollmentResult {
                subjects,
                term: term.map(str::to_string),
                sections: Vec::new(),
                total_sections: 0,
                retrieved_at,
                processing_time_seconds: if clean {
                    0.0
                } else {
                    started.elapsed().as_secs_f64()
                },
                errors: (!clean).then_some(errors),
            });
        }

        let mapped_sections: usize = mapping.values().map(Vec::len).sum();
        info!(
            courses = mapping.len(),
            sections = mapped_sections,
            failed_pairs = errors.len(),
            "search phase complete"
        );

        // One detail phase over the merged mapping. Per-course failures are
        // inside the outcome; zero surviving sections is still a result.
        let outcome = self.details.details(&mapping).await;
        errors.extend(outcome.errors);
        let sections = outcome.sections;

        let elapsed = started.elapsed();
        info!(
            sections = sections.len(),
            errors = errors.len(),
            duration = fmt_duration(elapsed),
            "enrollment fetch complete"
        );

        Ok(EnrollmentResult {
            subjects,
            term: term.map(str::to_string),
            total_sections: sections.len(),
            sections,
            retrieved_at,
            processing_time_seconds: elapsed.as_secs_f64(),
            errors: (!errors.is_empty()).then_some(errors),
        })
    }
}
