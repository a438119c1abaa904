//! Attempt classification
//!
//! Maps a failed create call to either a zone-terminal rejection (the zone
//! is excluded for the rest of the current cycle) or a retryable one.

use capgrab_cloud::CloudError;
use std::ops::RangeInclusive;

/// Outcome class of a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptClass {
    /// The zone rejects this request; stop trying it this cycle
    ZoneTerminal,
    Retryable,
}

/// Status codes and conflict codes that decide the classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierRules {
    pub terminal_statuses: Vec<RangeInclusive<u16>>,
    /// 409 codes that mean "resource is transitioning, try again"
    pub transitioning_conflicts: Vec<String>,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            terminal_statuses: vec![
                400..=405,
                409..=409,
                412..=413,
                422..=422,
                431..=431,
                501..=501,
            ],
            transitioning_conflicts: vec!["IncorrectState".to_string()],
        }
    }
}

impl ClassifierRules {
    pub fn with_transitioning_conflicts(mut self, codes: Vec<String>) -> Self {
        self.transitioning_conflicts = codes;
        self
    }

    pub fn classify(&self, error: &CloudError) -> AttemptClass {
        // No service answer (transport, CLI, timeout): retry
        let Some(service) = error.service() else {
            return AttemptClass::Retryable;
        };

        if service.status == 409 && self.is_transitioning(service.code.as_deref()) {
            return AttemptClass::Retryable;
        }

        if self
            .terminal_statuses
            .iter()
            .any(|range| range.contains(&service.status))
        {
            AttemptClass::ZoneTerminal
        } else {
            AttemptClass::Retryable
        }
    }

    fn is_transitioning(&self, code: Option<&str>) -> bool {
        code.is_some_and(|code| {
            self.transitioning_conflicts
                .iter()
                .any(|c| c.eq_ignore_ascii_case(code))
        })
    }
}
