//! Progress message texts
//!
//! Plain text with the Markdown the notifier sends. Every message carries
//! the shape block so a single notification is self-contained.

use crate::batch::BatchTotals;
use capgrab_cloud::{LaunchRequest, LaunchedInstance};
use std::time::Duration;

/// Human duration: `< 1s`, otherwise `1d 2h 3m 4s` without zero parts
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    if total == 0 {
        return "< 1s".to_string();
    }

    let parts = [
        (total / 86_400, "d"),
        (total % 86_400 / 3_600, "h"),
        (total % 3_600 / 60, "m"),
        (total % 60, "s"),
    ];
    parts
        .iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{}{}", value, unit))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Per-run facts repeated in every message
#[derive(Debug, Clone)]
pub struct RunFacts {
    pub shape: String,
    pub ocpus: Option<f32>,
    pub memory_gb: Option<f32>,
    pub boot_volume_gb: f64,
    pub sum: u32,
}

impl RunFacts {
    pub fn new(request: &LaunchRequest, sum: u32) -> Self {
        Self {
            shape: request.shape.name.clone(),
            ocpus: request.shape.ocpus,
            memory_gb: request.shape.memory_gb,
            boot_volume_gb: request.boot_volume_display_gb,
            sum,
        }
    }

    fn block(&self) -> String {
        format!(
            "Shape: {}\nOCPUs: {}\nMemory (GB): {}\nBoot volume (GB): {}\nTarget count: {}",
            self.shape,
            optional(self.ocpus),
            optional(self.memory_gb),
            self.boot_volume_gb,
            self.sum
        )
    }
}

fn optional(value: Option<f32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Counters of the current target at the time of a message
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    /// 1-based target index
    pub target: u32,
    pub attempts: u32,
    pub elapsed: Duration,
}

impl Progress {
    fn block(&self) -> String {
        format!(
            "Attempts: {}\nElapsed: {}",
            self.attempts,
            format_duration(self.elapsed)
        )
    }
}

pub fn attempting(facts: &RunFacts, target: u32) -> String {
    format!("Trying to create instance {} ⏳\n{}", target, facts.block())
}

pub fn acquired(facts: &RunFacts, progress: &Progress, instance: &LaunchedInstance) -> String {
    format!(
        "Instance {} acquired 🎉, starting ⌛️\nName: {}\nZone: {}\nPublic IP: pending ⏳\n{}\n{}",
        progress.target,
        instance.display_name,
        instance.zone,
        facts.block(),
        progress.block()
    )
}

pub fn ready(
    facts: &RunFacts,
    progress: &Progress,
    instance: &LaunchedInstance,
    addresses: &[String],
) -> String {
    format!(
        "Instance {} is running 🎉\nName: {}\nZone: {}\nPublic IP: {}\n{}\n{}",
        progress.target,
        instance.display_name,
        instance.zone,
        addresses.join(", "),
        facts.block(),
        progress.block()
    )
}

/// Created but never reached readiness
pub fn not_ready(
    facts: &RunFacts,
    progress: &Progress,
    instance: &LaunchedInstance,
    reason: &str,
) -> String {
    format!(
        "Instance {} acquired but not ready ❌\nName: {}\nZone: {}\nReason: {}\n{}\n{}",
        progress.target,
        instance.display_name,
        instance.zone,
        reason,
        facts.block(),
        progress.block()
    )
}

pub fn failed(facts: &RunFacts, progress: &Progress, zone: &str, message: &str) -> String {
    format!(
        "Instance {} attempt failed ❌\nZone: {}\nError: {}\n{}\n{}",
        progress.target,
        zone,
        message,
        facts.block(),
        progress.block()
    )
}

pub fn batch_started() -> String {
    "Starting batch launch".to_string()
}

pub fn batch_finished(totals: &BatchTotals) -> String {
    format!(
        "Batch launch finished\nTotal: {}\nSucceeded: {}\nFailed: {}",
        totals.requested,
        totals.succeeded,
        totals.failed()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(400)), "< 1s");
        assert_eq!(format_duration(Duration::from_secs(59)), "59s");
        assert_eq!(format_duration(Duration::from_secs(3_600)), "1h");
        assert_eq!(format_duration(Duration::from_secs(3_725)), "1h 2m 5s");
        assert_eq!(format_duration(Duration::from_secs(90_061)), "1d 1h 1m 1s");
    }

    #[test]
    fn test_messages_carry_counts() {
        let facts = RunFacts {
            shape: "VM.Standard.A1.Flex".to_string(),
            ocpus: Some(4.0),
            memory_gb: Some(24.0),
            boot_volume_gb: 50.0,
            sum: 2,
        };
        let progress = Progress {
            target: 1,
            attempts: 7,
            elapsed: Duration::from_secs(65),
        };

        let text = failed(&facts, &progress, "AD-1", "Out of host capacity.");
        assert!(text.contains("Zone: AD-1"));
        assert!(text.contains("Out of host capacity."));
        assert!(text.contains("Attempts: 7"));
        assert!(text.contains("Elapsed: 1m 5s"));
        assert!(text.contains("Target count: 2"));

        let totals = BatchTotals {
            requested: 5,
            succeeded: 3,
        };
        assert!(batch_finished(&totals).contains("Failed: 2"));
    }
}
