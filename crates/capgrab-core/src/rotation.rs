//! Zone rotation
//!
//! Decides which availability zone each attempt targets. The rotation
//! state belongs to exactly one engine run.

use crate::classify::AttemptClass;
use crate::error::{EngineError, Result};
use capgrab_cloud::LaunchPlan;
use std::collections::HashSet;

/// How zones are chosen across attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationMode {
    /// Every attempt goes to the configured zone
    Fixed(String),
    /// `each` consecutive targets per zone, zones in pool order
    QuotaPerZone { each: u32 },
    /// Cycle over the zones that have not rejected the request
    RoundRobin,
}

impl RotationMode {
    pub fn for_plan(plan: &LaunchPlan) -> Self {
        match (&plan.zone, plan.each) {
            (Some(zone), _) => RotationMode::Fixed(zone.clone()),
            (None, 0) => RotationMode::RoundRobin,
            (None, each) => RotationMode::QuotaPerZone { each },
        }
    }
}

/// Where a round-robin run stands after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStep {
    /// Untried zones remain in the current cycle
    SameCycle,
    /// Every usable zone was tried once
    CycleExhausted,
}

#[derive(Debug, Clone)]
pub struct ZoneRotation {
    mode: RotationMode,
    pool: Vec<String>,
    usable: Vec<String>,
    skipped: HashSet<String>,
    cursor: usize,
    quota_index: usize,
    current: Option<String>,
}

impl ZoneRotation {
    pub fn new(mode: RotationMode, pool: Vec<String>) -> Result<Self> {
        if pool.is_empty() && !matches!(mode, RotationMode::Fixed(_)) {
            return Err(EngineError::NoZones);
        }

        Ok(Self {
            mode,
            usable: pool.clone(),
            pool,
            skipped: HashSet::new(),
            cursor: 0,
            quota_index: 0,
            current: None,
        })
    }

    pub fn mode(&self) -> &RotationMode {
        &self.mode
    }

    /// Zones eligible in the current round-robin cycle
    pub fn usable(&self) -> &[String] {
        &self.usable
    }

    pub fn is_skipped(&self, zone: &str) -> bool {
        self.skipped.contains(zone)
    }

    /// Zone for the next attempt on target `target` (0-based).
    ///
    /// `first_attempt` is true while the target has not failed yet; quota
    /// mode only moves to a new zone then.
    pub fn select(&mut self, target: u32, first_attempt: bool) -> String {
        let zone = match &self.mode {
            RotationMode::Fixed(zone) => zone.clone(),
            RotationMode::QuotaPerZone { each } => {
                let each = (*each).max(1);
                match &self.current {
                    Some(zone) if !(target % each == 0 && first_attempt) => zone.clone(),
                    _ => {
                        let zone = self.pool[self.quota_index % self.pool.len()].clone();
                        self.quota_index += 1;
                        zone
                    }
                }
            }
            RotationMode::RoundRobin => {
                if self.usable.is_empty() {
                    self.usable = self.pool.clone();
                }
                if self.cursor >= self.usable.len() {
                    self.cursor = 0;
                }
                let zone = self.usable[self.cursor].clone();
                self.cursor += 1;
                zone
            }
        };

        self.current = Some(zone.clone());
        zone
    }

    /// The last selected zone succeeded
    pub fn record_success(&mut self) {
        if let Some(ref zone) = self.current {
            self.skipped.remove(zone);
        }
    }

    /// The last selected zone failed with `class`
    pub fn record_failure(&mut self, class: AttemptClass) -> CycleStep {
        if let Some(zone) = self.current.clone() {
            match class {
                AttemptClass::ZoneTerminal => {
                    self.skipped.insert(zone);
                }
                AttemptClass::Retryable => {
                    self.skipped.remove(&zone);
                }
            }
        }

        if self.cursor < self.usable.len() {
            CycleStep::SameCycle
        } else {
            CycleStep::CycleExhausted
        }
    }

    /// Drop the skipped zones from the usable set and start over at its
    /// head. Returns the number of zones left.
    pub fn start_new_cycle(&mut self) -> usize {
        let skipped = std::mem::take(&mut self.skipped);
        self.usable.retain(|zone| !skipped.contains(zone));
        self.cursor = 0;
        self.usable.len()
    }

    /// A target was reached: every zone is eligible again
    pub fn reset_for_next_target(&mut self) {
        self.usable = self.pool.clone();
        self.skipped.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zones(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_pool_requires_fixed_zone() {
        assert!(matches!(
            ZoneRotation::new(RotationMode::RoundRobin, vec![]),
            Err(EngineError::NoZones)
        ));
        assert!(matches!(
            ZoneRotation::new(RotationMode::QuotaPerZone { each: 1 }, vec![]),
            Err(EngineError::NoZones)
        ));

        let mut fixed = ZoneRotation::new(RotationMode::Fixed("AD-2".into()), vec![]).unwrap();
        assert_eq!(fixed.select(0, true), "AD-2");
        assert_eq!(fixed.select(0, false), "AD-2");
    }

    #[test]
    fn test_quota_rotation_order() {
        let mut rotation =
            ZoneRotation::new(RotationMode::QuotaPerZone { each: 2 }, zones(&["a", "b", "c"]))
                .unwrap();
        let picked: Vec<String> = (0..6).map(|t| rotation.select(t, true)).collect();
        assert_eq!(picked, zones(&["a", "a", "b", "b", "c", "c"]));
    }

    #[test]
    fn test_quota_keeps_zone_while_retrying() {
        let mut rotation =
            ZoneRotation::new(RotationMode::QuotaPerZone { each: 1 }, zones(&["a", "b"]))
                .unwrap();
        assert_eq!(rotation.select(0, true), "a");
        rotation.record_failure(AttemptClass::Retryable);
        assert_eq!(rotation.select(0, false), "a");
        assert_eq!(rotation.select(1, true), "b");
    }

    #[test]
    fn test_round_robin_cycle() {
        let mut rotation =
            ZoneRotation::new(RotationMode::RoundRobin, zones(&["a", "b", "c"])).unwrap();

        assert_eq!(rotation.select(0, true), "a");
        assert_eq!(
            rotation.record_failure(AttemptClass::ZoneTerminal),
            CycleStep::SameCycle
        );
        assert!(rotation.is_skipped("a"));

        assert_eq!(rotation.select(0, false), "b");
        rotation.record_failure(AttemptClass::Retryable);
        assert_eq!(rotation.select(0, false), "c");
        assert_eq!(
            rotation.record_failure(AttemptClass::Retryable),
            CycleStep::CycleExhausted
        );

        assert_eq!(rotation.start_new_cycle(), 2);
        assert_eq!(rotation.usable(), &zones(&["b", "c"])[..]);
        assert!(!rotation.is_skipped("a"));
        assert_eq!(rotation.select(0, false), "b");
    }

    #[test]
    fn test_round_robin_restarts_after_success() {
        let mut rotation =
            ZoneRotation::new(RotationMode::RoundRobin, zones(&["a", "b"])).unwrap();
        assert_eq!(rotation.select(0, true), "a");
        rotation.record_failure(AttemptClass::ZoneTerminal);
        assert_eq!(rotation.select(0, false), "b");
        rotation.record_success();
        rotation.reset_for_next_target();

        assert_eq!(rotation.usable().len(), 2);
        assert_eq!(rotation.select(1, true), "a");
    }

    #[test]
    fn test_round_robin_refills_empty_usable_set() {
        let mut rotation = ZoneRotation::new(RotationMode::RoundRobin, zones(&["a"])).unwrap();
        rotation.select(0, true);
        rotation.record_failure(AttemptClass::ZoneTerminal);
        assert_eq!(rotation.start_new_cycle(), 0);
        assert_eq!(rotation.select(0, false), "a");
    }

    #[test]
    fn test_mode_for_plan() {
        use capgrab_cloud::{ImageSource, RetryBudget, ShapeSpec, SubnetSource};
        use std::time::Duration;

        let mut plan = LaunchPlan {
            sum: 1,
            shape: ShapeSpec::default(),
            boot_volume_gb: None,
            zone: None,
            each: 0,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            retry: RetryBudget::Unlimited,
            display_name: String::new(),
            cloud_init: None,
            ssh_authorized_key: String::new(),
            image: ImageSource::Id("img".into()),
            subnet: SubnetSource::Id("sub".into()),
            terminate_unready: false,
        };
        assert_eq!(RotationMode::for_plan(&plan), RotationMode::RoundRobin);
        plan.each = 3;
        assert_eq!(
            RotationMode::for_plan(&plan),
            RotationMode::QuotaPerZone { each: 3 }
        );
        plan.zone = Some("AD-1".into());
        assert_eq!(RotationMode::for_plan(&plan), RotationMode::Fixed("AD-1".into()));
    }
}
