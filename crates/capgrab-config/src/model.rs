//! Configuration model

use crate::error::{ConfigError, Result};
use capgrab_cloud::{
    BurstTier, ImageSource, LaunchPlan, RetryBudget, ShapeSpec, SubnetSource,
};
use capgrab_core::{AccountBatch, ClassifierRules, NamedPlan};
use std::path::PathBuf;
use std::time::Duration;

/// Telegram settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyConfig {
    pub token: String,
    pub chat_id: String,
    /// Per-target progress messages
    pub each: bool,
}

/// One cloud account
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountConfig {
    pub name: String,
    /// Profile inside the oci CLI config file
    pub profile: Option<String>,
    pub config_file: Option<PathBuf>,
    /// Tenancy OCID; also the compartment instances are created in
    pub tenancy: String,
    pub region: Option<String>,
    pub templates: Vec<(String, TemplateConfig)>,
}

/// Instance template as written in the file; every key is optional so
/// templates can be layered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateConfig {
    pub availability_domain: Option<String>,
    pub ssh_authorized_key: Option<String>,
    pub subnet_id: Option<String>,
    pub subnet_display_name: Option<String>,
    pub image_id: Option<String>,
    pub operating_system: Option<String>,
    pub operating_system_version: Option<String>,
    pub shape: Option<String>,
    pub cpus: Option<f32>,
    pub memory_gb: Option<f32>,
    pub burstable: Option<String>,
    pub boot_volume_gb: Option<u64>,
    pub sum: Option<u32>,
    pub each: Option<u32>,
    pub retry: Option<i64>,
    pub cloud_init: Option<String>,
    /// Seconds
    pub min_delay: Option<u64>,
    /// Seconds
    pub max_delay: Option<u64>,
    pub display_name: Option<String>,
    pub terminate_unready: Option<bool>,
}

impl TemplateConfig {
    /// Layer `self` over `base`: keys set here win
    pub fn over(&self, base: &TemplateConfig) -> TemplateConfig {
        macro_rules! pick {
            ($($field:ident),* $(,)?) => {
                TemplateConfig {
                    $($field: self.$field.clone().or_else(|| base.$field.clone()),)*
                }
            };
        }
        pick!(
            availability_domain,
            ssh_authorized_key,
            subnet_id,
            subnet_display_name,
            image_id,
            operating_system,
            operating_system_version,
            shape,
            cpus,
            memory_gb,
            burstable,
            boot_volume_gb,
            sum,
            each,
            retry,
            cloud_init,
            min_delay,
            max_delay,
            display_name,
            terminate_unready,
        )
    }

    /// Validate and build the launch plan of template `name`
    pub fn to_plan(&self, name: &str) -> Result<LaunchPlan> {
        let invalid =
            |message: &str| ConfigError::InvalidConfig(format!("template '{}': {}", name, message));

        let shape_name = non_empty(&self.shape).ok_or_else(|| invalid("shape is required"))?;

        let image = if let Some(id) = non_empty(&self.image_id) {
            ImageSource::Id(id)
        } else if let Some(os) = non_empty(&self.operating_system) {
            let version = non_empty(&self.operating_system_version).ok_or_else(|| {
                invalid("operating-system-version is required with operating-system")
            })?;
            ImageSource::Lookup {
                operating_system: os,
                version,
            }
        } else {
            return Err(invalid("image-id or operating-system is required"));
        };

        // An empty display name selects the first subnet of the compartment
        let subnet = if let Some(id) = non_empty(&self.subnet_id) {
            SubnetSource::Id(id)
        } else if let Some(ref display_name) = self.subnet_display_name {
            SubnetSource::DisplayName(display_name.clone())
        } else {
            return Err(invalid("subnet-id or subnet-display-name is required"));
        };

        let min_delay = self.min_delay.unwrap_or(0);
        let mut max_delay = self.max_delay.unwrap_or(0);
        if max_delay > 0 && max_delay < min_delay {
            tracing::warn!(
                "template '{}': max-delay {} is below min-delay {}, using {}",
                name,
                max_delay,
                min_delay,
                min_delay
            );
            max_delay = min_delay;
        }

        Ok(LaunchPlan {
            sum: self.sum.unwrap_or(1),
            shape: ShapeSpec {
                name: shape_name,
                ocpus: self.cpus.filter(|c| *c > 0.0),
                memory_gb: self.memory_gb.filter(|m| *m > 0.0),
                burst: self
                    .burstable
                    .as_deref()
                    .map(BurstTier::parse)
                    .unwrap_or_default(),
            },
            boot_volume_gb: self.boot_volume_gb.filter(|gb| *gb > 0),
            zone: non_empty(&self.availability_domain),
            each: self.each.unwrap_or(0),
            min_delay: Duration::from_secs(min_delay),
            max_delay: Duration::from_secs(max_delay),
            retry: RetryBudget::from_config(self.retry.unwrap_or(0)),
            display_name: self.display_name.clone().unwrap_or_default(),
            cloud_init: non_empty(&self.cloud_init),
            ssh_authorized_key: self.ssh_authorized_key.clone().unwrap_or_default(),
            image,
            subnet,
            terminate_unready: self.terminate_unready.unwrap_or(false),
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.trim().is_empty())
}

/// Whole configuration file
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// HTTP proxy for the notifier and the oci CLI
    pub proxy: Option<String>,
    pub notify: Option<NotifyConfig>,
    pub post_batch_command: Option<String>,
    pub ip_export_prefix: String,
    /// Overrides the retryable 409 codes
    pub transitioning_conflicts: Option<Vec<String>>,
    pub defaults: TemplateConfig,
    /// Templates applied to every account
    pub templates: Vec<(String, TemplateConfig)>,
    pub accounts: Vec<AccountConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proxy: None,
            notify: None,
            post_batch_command: None,
            ip_export_prefix: "IPs".to_string(),
            transitioning_conflicts: None,
            defaults: TemplateConfig::default(),
            templates: Vec::new(),
            accounts: Vec::new(),
        }
    }
}

impl Config {
    pub fn account(&self, name: &str) -> Option<&AccountConfig> {
        self.accounts.iter().find(|a| a.name == name)
    }

    pub fn notify_each(&self) -> bool {
        self.notify.as_ref().is_none_or(|n| n.each)
    }

    pub fn classifier(&self) -> ClassifierRules {
        match self.transitioning_conflicts {
            Some(ref codes) => ClassifierRules::default().with_transitioning_conflicts(codes.clone()),
            None => ClassifierRules::default(),
        }
    }

    /// Effective templates of an account: account template over shared
    /// template of the same name over `defaults`
    pub fn templates_for(&self, account: &AccountConfig) -> Vec<(String, TemplateConfig)> {
        let mut resolved: Vec<(String, TemplateConfig)> = self
            .templates
            .iter()
            .map(|(name, template)| (name.clone(), template.over(&self.defaults)))
            .collect();

        for (name, template) in &account.templates {
            match resolved.iter_mut().find(|(n, _)| n == name) {
                Some((_, shared)) => *shared = template.over(shared),
                None => resolved.push((name.clone(), template.over(&self.defaults))),
            }
        }
        resolved
    }

    /// Launch plans of every account, in file order
    pub fn batches(&self) -> Result<Vec<AccountBatch>> {
        self.accounts
            .iter()
            .map(|account| {
                let templates = self
                    .templates_for(account)
                    .into_iter()
                    .map(|(name, template)| {
                        Ok(NamedPlan {
                            plan: template.to_plan(&name)?,
                            name,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(AccountBatch {
                    account: account.name.clone(),
                    templates,
                })
            })
            .collect()
    }
}
