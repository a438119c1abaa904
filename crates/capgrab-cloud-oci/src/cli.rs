//! oci CLI wrapper
//!
//! Wraps the `oci` CLI commands used by the acquisition engine. Every
//! command runs with JSON output; service rejections are parsed out of
//! stderr so the engine can classify them by status and code.

use crate::error::{OciError, Result};
use capgrab_cloud::ServiceError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Account session settings for the CLI
#[derive(Debug, Clone, Default)]
pub struct OciProfile {
    /// Profile name inside the CLI config file
    pub profile: Option<String>,
    pub config_file: Option<PathBuf>,
    pub region: Option<String>,
    /// Exported as HTTPS_PROXY to the CLI process
    pub proxy: Option<String>,
}

/// oci CLI wrapper
pub struct OciCli {
    program: String,
    profile: OciProfile,
}

impl OciCli {
    pub fn new(profile: OciProfile) -> Self {
        Self {
            program: "oci".to_string(),
            profile,
        }
    }

    /// Use a different executable (wrapper scripts, pinned installs)
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn global_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(ref file) = self.profile.config_file {
            args.push("--config-file".to_string());
            args.push(file.display().to_string());
        }
        if let Some(ref profile) = self.profile.profile {
            args.push("--profile".to_string());
            args.push(profile.clone());
        }
        if let Some(ref region) = self.profile.region {
            args.push("--region".to_string());
            args.push(region.clone());
        }
        args
    }

    /// Run an oci command and return stdout
    pub async fn run_command(&self, args: &[String]) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.global_args());
        cmd.args(args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        if let Some(ref proxy) = self.profile.proxy {
            cmd.env("HTTPS_PROXY", proxy);
        }

        tracing::debug!("Running: {} {}", self.program, args.join(" "));

        let output = cmd.output().await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => OciError::CliNotFound,
            _ => OciError::IoError(e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(match parse_service_error(&stderr) {
                Some(service) => OciError::Service(service),
                None => OciError::CommandFailed(stderr.trim().to_string()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Run a command whose output is `{"data": [...]}`
    pub async fn run_list<T: DeserializeOwned>(&self, args: &[String]) -> Result<Vec<T>> {
        let output = self.run_command(args).await?;
        parse_list(&output)
    }

    /// Run a command whose output is `{"data": {...}}`
    pub async fn run_item<T: DeserializeOwned>(&self, args: &[String]) -> Result<T> {
        let output = self.run_command(args).await?;
        let envelope: Envelope<T> = serde_json::from_str(&output)?;
        Ok(envelope.data)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// The CLI prints nothing at all for an empty list
pub fn parse_list<T: DeserializeOwned>(output: &str) -> Result<Vec<T>> {
    if output.trim().is_empty() {
        return Ok(Vec::new());
    }
    let envelope: Envelope<Vec<T>> = serde_json::from_str(output)?;
    Ok(envelope.data)
}

#[derive(Debug, Deserialize)]
struct RawServiceError {
    status: u16,
    code: Option<String>,
    message: Option<String>,
}

/// Extract the `ServiceError:` JSON block the CLI writes to stderr
pub fn parse_service_error(stderr: &str) -> Option<ServiceError> {
    let idx = stderr.find("ServiceError:")?;
    let rest = &stderr[idx + "ServiceError:".len()..];
    let start = rest.find('{')?;
    let end = rest.rfind('}')?;
    if end < start {
        return None;
    }
    let raw: RawServiceError = serde_json::from_str(&rest[start..=end]).ok()?;
    Some(ServiceError {
        status: raw.status,
        code: raw.code,
        message: raw.message.unwrap_or_default(),
    })
}

/// Availability domain from `iam availability-domain list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityDomainInfo {
    pub name: String,
}

/// Image from `compute image list/get`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ImageInfo {
    pub id: String,
    pub display_name: Option<String>,
    pub size_in_mbs: Option<i64>,
}

/// Subnet from `network subnet list`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SubnetInfo {
    pub id: String,
    pub display_name: Option<String>,
}

/// Shape from `compute shape list`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ShapeInfo {
    pub shape: String,
    pub ocpus: Option<f32>,
    pub memory_in_gbs: Option<f32>,
}

/// Instance from `compute instance launch/get`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InstanceInfo {
    pub id: String,
    pub display_name: Option<String>,
    pub availability_domain: Option<String>,
    pub lifecycle_state: String,
}

/// Attachment from `compute vnic-attachment list`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VnicAttachmentInfo {
    pub vnic_id: Option<String>,
    pub lifecycle_state: Option<String>,
}

/// VNIC from `network vnic get`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VnicInfo {
    pub id: String,
    pub display_name: Option<String>,
    pub public_ip: Option<String>,
}

impl VnicInfo {
    /// Public address, ignoring the empty string the API sometimes returns
    pub fn public_address(&self) -> Option<String> {
        self.public_ip.clone().filter(|ip| !ip.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_service_error() {
        let stderr = r#"ServiceError:
{
    "client_version": "Oracle-PythonSDK/2.126.0, Oracle-PythonCLI/3.40.0",
    "code": "InternalError",
    "message": "Out of host capacity.",
    "opc-request-id": "ABC",
    "operation_name": "launch_instance",
    "status": 500,
    "target_service": "compute"
}
"#;
        let err = parse_service_error(stderr).unwrap();
        assert_eq!(err.status, 500);
        assert_eq!(err.code.as_deref(), Some("InternalError"));
        assert_eq!(err.message, "Out of host capacity.");
    }

    #[test]
    fn test_parse_service_error_rejects_other_output() {
        assert!(parse_service_error("RequestException: connection reset").is_none());
        assert!(parse_service_error("ServiceError: not json").is_none());
    }

    #[test]
    fn test_parse_list_empty_output() {
        let items: Vec<SubnetInfo> = parse_list("").unwrap();
        assert!(items.is_empty());

        let items: Vec<AvailabilityDomainInfo> =
            parse_list(r#"{"data": [{"name": "kIdk:AP-TOKYO-1-AD-1"}]}"#).unwrap();
        assert_eq!(items[0].name, "kIdk:AP-TOKYO-1-AD-1");
    }

    #[test]
    fn test_vnic_public_address() {
        let vnic: VnicInfo = serde_json::from_str(
            r#"{"id": "ocid1.vnic", "display-name": "arm-1", "public-ip": "203.0.113.7"}"#,
        )
        .unwrap();
        assert_eq!(vnic.public_address().as_deref(), Some("203.0.113.7"));

        let vnic: VnicInfo =
            serde_json::from_str(r#"{"id": "ocid1.vnic", "public-ip": ""}"#).unwrap();
        assert_eq!(vnic.public_address(), None);
    }

    #[test]
    fn test_global_args() {
        let cli = OciCli::new(OciProfile {
            profile: Some("TOKYO".to_string()),
            config_file: Some(PathBuf::from("/home/me/.oci/config")),
            region: Some("ap-tokyo-1".to_string()),
            proxy: None,
        });
        assert_eq!(
            cli.global_args(),
            vec![
                "--config-file",
                "/home/me/.oci/config",
                "--profile",
                "TOKYO",
                "--region",
                "ap-tokyo-1"
            ]
        );
    }
}
