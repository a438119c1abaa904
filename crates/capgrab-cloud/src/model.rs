//! Launch plans and instance descriptions shared by gateways and the engine

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Burstable baseline for flexible shapes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BurstTier {
    /// No bursting, full baseline
    #[default]
    Full,
    /// 1/8 of an OCPU baseline
    OneEighth,
    /// 1/2 of an OCPU baseline
    Half,
}

impl BurstTier {
    /// Parse the config notation (`"1/8"`, `"1/2"`); anything else is `Full`
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "1/8" => BurstTier::OneEighth,
            "1/2" => BurstTier::Half,
            _ => BurstTier::Full,
        }
    }

    /// Provider value for the shape config, `None` for the full baseline
    pub fn baseline(&self) -> Option<&'static str> {
        match self {
            BurstTier::Full => None,
            BurstTier::OneEighth => Some("BASELINE_1_8"),
            BurstTier::Half => Some("BASELINE_1_2"),
        }
    }
}

/// Requested compute shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapeSpec {
    pub name: String,
    pub ocpus: Option<f32>,
    pub memory_gb: Option<f32>,
    #[serde(default)]
    pub burst: BurstTier,
}

impl ShapeSpec {
    pub fn is_flex(&self) -> bool {
        self.name.to_lowercase().contains("flex")
    }

    /// A flexible shape with explicit CPU and memory needs no lookup
    pub fn is_fully_specified(&self) -> bool {
        self.is_flex()
            && self.ocpus.is_some_and(|c| c > 0.0)
            && self.memory_gb.is_some_and(|m| m > 0.0)
    }
}

/// Where the boot image comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSource {
    Id(String),
    Lookup {
        operating_system: String,
        version: String,
    },
}

/// Where the primary VNIC is placed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubnetSource {
    Id(String),
    /// First subnet with this display name, or the first subnet when empty
    DisplayName(String),
}

/// Maximum number of failures tolerated before a run is abandoned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryBudget {
    Unlimited,
    Limited(u32),
}

impl RetryBudget {
    /// Negative values mean unlimited
    pub fn from_config(value: i64) -> Self {
        if value < 0 {
            RetryBudget::Unlimited
        } else {
            RetryBudget::Limited(value.min(u32::MAX as i64) as u32)
        }
    }

    /// Whether another attempt is allowed after `failures` counted failures
    pub fn allows(&self, failures: u32) -> bool {
        match self {
            RetryBudget::Unlimited => true,
            RetryBudget::Limited(max) => failures <= *max,
        }
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        RetryBudget::Limited(0)
    }
}

/// Immutable per-run configuration, built once from a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchPlan {
    /// Number of instances to acquire
    pub sum: u32,
    pub shape: ShapeSpec,
    pub boot_volume_gb: Option<u64>,
    /// Pin every attempt to this availability domain
    pub zone: Option<String>,
    /// Quota per zone; 0 disables quota rotation
    pub each: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub retry: RetryBudget,
    /// Display name template; empty means a timestamped default
    pub display_name: String,
    pub cloud_init: Option<String>,
    pub ssh_authorized_key: String,
    pub image: ImageSource,
    pub subnet: SubnetSource,
    /// Terminate instances that never became ready
    #[serde(default)]
    pub terminate_unready: bool,
}

impl LaunchPlan {
    /// Number of targets after applying the quota override
    pub fn effective_sum(&self, zone_count: usize) -> u32 {
        if self.zone.is_none() && self.each > 0 {
            self.each.saturating_mul(zone_count as u32)
        } else {
            self.sum
        }
    }

    /// Display name for target `index` (1-based) out of `sum`
    pub fn numbered_name(base: &str, index: u32, sum: u32) -> String {
        if sum > 1 {
            format!("{}-{}", base, index)
        } else {
            base.to_string()
        }
    }
}

/// A plan with its provider-side references resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchRequest {
    pub compartment_id: String,
    pub image_id: String,
    pub image_name: String,
    pub subnet_id: String,
    /// Shape with CPU/memory filled in from the provider when not configured
    pub shape: ShapeSpec,
    pub boot_volume_gb: Option<u64>,
    /// Boot volume size for reports (configured size or image size)
    pub boot_volume_display_gb: f64,
    pub ssh_authorized_key: String,
    pub cloud_init: Option<String>,
}

/// Result of a successful create call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchedInstance {
    pub id: String,
    pub display_name: String,
    pub zone: String,
}

/// Instance lifecycle state as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceState {
    Moving,
    Provisioning,
    Running,
    Starting,
    Stopping,
    Stopped,
    CreatingImage,
    Terminating,
    Terminated,
    Other(String),
}

impl InstanceState {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "MOVING" => InstanceState::Moving,
            "PROVISIONING" => InstanceState::Provisioning,
            "RUNNING" => InstanceState::Running,
            "STARTING" => InstanceState::Starting,
            "STOPPING" => InstanceState::Stopping,
            "STOPPED" => InstanceState::Stopped,
            "CREATING_IMAGE" => InstanceState::CreatingImage,
            "TERMINATING" => InstanceState::Terminating,
            "TERMINATED" => InstanceState::Terminated,
            _ => InstanceState::Other(value.to_string()),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, InstanceState::Running)
    }

    /// Terminating or terminated: the instance will never become ready
    pub fn is_gone(&self) -> bool {
        matches!(self, InstanceState::Terminating | InstanceState::Terminated)
    }
}

impl std::fmt::Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstanceState::Moving => write!(f, "MOVING"),
            InstanceState::Provisioning => write!(f, "PROVISIONING"),
            InstanceState::Running => write!(f, "RUNNING"),
            InstanceState::Starting => write!(f, "STARTING"),
            InstanceState::Stopping => write!(f, "STOPPING"),
            InstanceState::Stopped => write!(f, "STOPPED"),
            InstanceState::CreatingImage => write!(f, "CREATING_IMAGE"),
            InstanceState::Terminating => write!(f, "TERMINATING"),
            InstanceState::Terminated => write!(f, "TERMINATED"),
            InstanceState::Other(s) => write!(f, "{}", s),
        }
    }
}

/// A network interface attached to an instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub id: String,
}

/// One exported `instance-name, address` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceAddress {
    pub instance_name: String,
    pub address: String,
}
