//! KDL parser

use crate::error::{ConfigError, Result};
use crate::model::{AccountConfig, Config, NotifyConfig, TemplateConfig};
use kdl::{KdlDocument, KdlNode};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub fn parse_config_file<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path.as_ref())?;
    parse_config_string(&content)
}

pub fn parse_config_string(content: &str) -> Result<Config> {
    let doc: KdlDocument = content.parse()?;
    let mut config = Config::default();

    for node in doc.nodes() {
        match node.name().value() {
            "proxy" => config.proxy = Some(string_value(node)?).filter(|p| !p.is_empty()),
            "notify" => config.notify = Some(parse_notify(node)?),
            "post-batch-command" => {
                config.post_batch_command = Some(string_value(node)?).filter(|c| !c.is_empty())
            }
            "ip-export-prefix" => config.ip_export_prefix = string_value(node)?,
            "classifier" => {
                if let Some(children) = node.children() {
                    let codes = children
                        .nodes()
                        .iter()
                        .filter(|n| n.name().value() == "transitioning-conflict")
                        .flat_map(|n| n.entries().iter())
                        .filter_map(|e| e.value().as_string().map(str::to_string))
                        .collect();
                    config.transitioning_conflicts = Some(codes);
                }
            }
            "defaults" => config.defaults = parse_template_body(node)?,
            "template" => {
                let name = name_arg(node)?;
                let template = parse_template_body(node)?;
                config.templates.push((name, template));
            }
            "account" => {
                let account = parse_account(node)?;
                if config.account(&account.name).is_some() {
                    return Err(ConfigError::InvalidConfig(format!(
                        "account '{}' is defined twice",
                        account.name
                    )));
                }
                config.accounts.push(account);
            }
            other => warn!("Ignoring unknown config node '{}'", other),
        }
    }

    Ok(config)
}

fn parse_notify(node: &KdlNode) -> Result<NotifyConfig> {
    let mut notify = NotifyConfig {
        token: String::new(),
        chat_id: String::new(),
        each: true,
    };

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "token" => notify.token = string_value(child)?,
                // Chat ids are numbers, but channel names are strings
                "chat-id" => {
                    notify.chat_id = match first_value(child).and_then(|v| v.as_integer()) {
                        Some(id) => id.to_string(),
                        None => string_value(child)?,
                    }
                }
                "each" => notify.each = bool_value(child)?,
                other => warn!("Ignoring unknown notify key '{}'", other),
            }
        }
    }

    Ok(notify)
}

fn parse_account(node: &KdlNode) -> Result<AccountConfig> {
    let mut account = AccountConfig {
        name: name_arg(node)?,
        ..Default::default()
    };

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "profile" => account.profile = Some(string_value(child)?),
                "config-file" => account.config_file = Some(PathBuf::from(string_value(child)?)),
                "tenancy" => account.tenancy = string_value(child)?,
                "region" => account.region = Some(string_value(child)?),
                "template" => {
                    let name = name_arg(child)?;
                    account.templates.push((name, parse_template_body(child)?));
                }
                other => warn!("Ignoring unknown key '{}' in account {}", other, account.name),
            }
        }
    }

    if account.tenancy.is_empty() {
        return Err(ConfigError::InvalidConfig(format!(
            "account '{}' requires a tenancy",
            account.name
        )));
    }

    Ok(account)
}

fn parse_template_body(node: &KdlNode) -> Result<TemplateConfig> {
    let mut template = TemplateConfig::default();
    let Some(children) = node.children() else {
        return Ok(template);
    };

    for child in children.nodes() {
        match child.name().value() {
            "availability-domain" => template.availability_domain = Some(string_value(child)?),
            "ssh-authorized-key" => template.ssh_authorized_key = Some(string_value(child)?),
            "subnet-id" => template.subnet_id = Some(string_value(child)?),
            "subnet-display-name" => template.subnet_display_name = Some(string_value(child)?),
            "image-id" => template.image_id = Some(string_value(child)?),
            "operating-system" => template.operating_system = Some(string_value(child)?),
            "operating-system-version" => {
                template.operating_system_version = Some(string_value(child)?)
            }
            "shape" => template.shape = Some(string_value(child)?),
            "cpus" => template.cpus = Some(number_value(child)?),
            "memory-gb" => template.memory_gb = Some(number_value(child)?),
            "burstable" => template.burstable = Some(string_value(child)?),
            "boot-volume-gb" => template.boot_volume_gb = Some(integer_value(child)?),
            "sum" => template.sum = Some(integer_value(child)?),
            "each" => template.each = Some(integer_value(child)?),
            "retry" => template.retry = Some(integer_value(child)?),
            "cloud-init" => template.cloud_init = Some(string_value(child)?),
            "min-delay" => template.min_delay = Some(integer_value(child)?),
            "max-delay" => template.max_delay = Some(integer_value(child)?),
            "display-name" => template.display_name = Some(string_value(child)?),
            "terminate-unready" => template.terminate_unready = Some(bool_value(child)?),
            other => warn!("Ignoring unknown template key '{}'", other),
        }
    }

    Ok(template)
}

fn first_value(node: &KdlNode) -> Option<&kdl::KdlValue> {
    node.entries().first().map(|e| e.value())
}

fn invalid_value(node: &KdlNode, expected: &str) -> ConfigError {
    ConfigError::InvalidConfig(format!("{} requires {}", node.name().value(), expected))
}

fn name_arg(node: &KdlNode) -> Result<String> {
    first_value(node)
        .and_then(|v| v.as_string())
        .map(str::to_string)
        .ok_or_else(|| invalid_value(node, "a name"))
}

fn string_value(node: &KdlNode) -> Result<String> {
    first_value(node)
        .and_then(|v| v.as_string())
        .map(str::to_string)
        .ok_or_else(|| invalid_value(node, "a string value"))
}

fn integer_value<T: TryFrom<i128>>(node: &KdlNode) -> Result<T> {
    first_value(node)
        .and_then(|v| v.as_integer())
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| invalid_value(node, "an integer value in range"))
}

fn number_value(node: &KdlNode) -> Result<f32> {
    first_value(node)
        .and_then(|v| v.as_float().or_else(|| v.as_integer().map(|i| i as f64)))
        .map(|v| v as f32)
        .ok_or_else(|| invalid_value(node, "a number"))
}

fn bool_value(node: &KdlNode) -> Result<bool> {
    first_value(node)
        .and_then(|v| v.as_bool())
        .ok_or_else(|| invalid_value(node, "#true or #false"))
}
