//! OCI provider implementation

use crate::cli::{
    AvailabilityDomainInfo, ImageInfo, InstanceInfo, OciCli, OciProfile, ShapeInfo, SubnetInfo,
    VnicAttachmentInfo, VnicInfo,
};
use crate::error::{OciError, Result};
use async_trait::async_trait;
use base64::Engine;
use capgrab_cloud::{
    ImageSource, InstanceAddress, InstanceState, LaunchPlan, LaunchRequest, LaunchedInstance,
    NetworkInterface, ProviderGateway, ShapeSpec, SubnetSource,
};

/// Connection settings of one OCI account
#[derive(Debug, Clone, Default)]
pub struct OciAccount {
    /// Compartment used for every call (the tenancy OCID)
    pub tenancy: String,
    pub profile: OciProfile,
}

/// OCI provider
pub struct OciGateway {
    cli: OciCli,
    tenancy: String,
}

impl OciGateway {
    pub fn new(account: OciAccount) -> Self {
        Self {
            cli: OciCli::new(account.profile),
            tenancy: account.tenancy,
        }
    }

    /// Build a gateway around an already configured CLI wrapper
    pub fn with_cli(cli: OciCli, tenancy: impl Into<String>) -> Self {
        Self {
            cli,
            tenancy: tenancy.into(),
        }
    }

    /// Check that the CLI is installed and the profile can reach the tenancy
    pub async fn check_auth(&self) -> Result<()> {
        self.availability_domains().await?;
        Ok(())
    }

    async fn availability_domains(&self) -> Result<Vec<AvailabilityDomainInfo>> {
        self.cli
            .run_list(&args(&[
                "iam",
                "availability-domain",
                "list",
                "--compartment-id",
                &self.tenancy,
            ]))
            .await
    }

    async fn resolve_image(&self, source: &ImageSource, shape: &str) -> Result<ImageInfo> {
        match source {
            ImageSource::Id(id) => {
                self.cli
                    .run_item(&args(&["compute", "image", "get", "--image-id", id]))
                    .await
            }
            ImageSource::Lookup {
                operating_system,
                version,
            } => {
                if operating_system.trim().is_empty() {
                    return Err(OciError::InvalidConfig(
                        "operating-system must not be empty".to_string(),
                    ));
                }
                let images: Vec<ImageInfo> = self
                    .cli
                    .run_list(&args(&[
                        "compute",
                        "image",
                        "list",
                        "--compartment-id",
                        &self.tenancy,
                        "--operating-system",
                        operating_system,
                        "--operating-system-version",
                        version,
                        "--shape",
                        shape,
                        "--sort-by",
                        "TIMECREATED",
                        "--sort-order",
                        "DESC",
                    ]))
                    .await?;
                images.into_iter().next().ok_or_else(|| {
                    OciError::ImageNotFound(format!("{} {} ({})", operating_system, version, shape))
                })
            }
        }
    }

    async fn resolve_subnet(&self, source: &SubnetSource) -> Result<String> {
        match source {
            SubnetSource::Id(id) => Ok(id.clone()),
            SubnetSource::DisplayName(name) => {
                let subnets: Vec<SubnetInfo> = self
                    .cli
                    .run_list(&args(&[
                        "network",
                        "subnet",
                        "list",
                        "--compartment-id",
                        &self.tenancy,
                        "--all",
                    ]))
                    .await?;
                select_subnet(&subnets, name)
                    .map(|s| s.id.clone())
                    .ok_or_else(|| OciError::SubnetNotFound(name.clone()))
            }
        }
    }

    async fn resolve_shape(&self, shape: &ShapeSpec, image_id: &str) -> Result<ShapeSpec> {
        if shape.is_fully_specified() {
            return Ok(shape.clone());
        }
        let shapes: Vec<ShapeInfo> = self
            .cli
            .run_list(&args(&[
                "compute",
                "shape",
                "list",
                "--compartment-id",
                &self.tenancy,
                "--image-id",
                image_id,
                "--all",
            ]))
            .await?;
        let found = select_shape(&shapes, &shape.name)
            .ok_or_else(|| OciError::ShapeNotFound(shape.name.clone()))?;
        Ok(ShapeSpec {
            name: found.shape.clone(),
            ocpus: found.ocpus,
            memory_gb: found.memory_in_gbs,
            burst: shape.burst,
        })
    }

    async fn vnic(&self, vnic_id: &str) -> Result<VnicInfo> {
        self.cli
            .run_item(&args(&["network", "vnic", "get", "--vnic-id", vnic_id]))
            .await
    }
}

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// First subnet matching `name`; any subnet when `name` is empty
fn select_subnet<'a>(subnets: &'a [SubnetInfo], name: &str) -> Option<&'a SubnetInfo> {
    if name.is_empty() {
        return subnets.first();
    }
    subnets
        .iter()
        .find(|s| s.display_name.as_deref() == Some(name))
}

/// Shape names are matched case-insensitively
fn select_shape<'a>(shapes: &'a [ShapeInfo], name: &str) -> Option<&'a ShapeInfo> {
    shapes.iter().find(|s| s.shape.eq_ignore_ascii_case(name))
}

/// Arguments of `compute instance launch`
pub fn launch_args(
    compartment_id: &str,
    request: &LaunchRequest,
    zone: &str,
    display_name: &str,
) -> Vec<String> {
    let mut launch = args(&[
        "compute",
        "instance",
        "launch",
        "--compartment-id",
        compartment_id,
        "--availability-domain",
        zone,
        "--display-name",
        display_name,
        "--shape",
        &request.shape.name,
        "--image-id",
        &request.image_id,
        "--subnet-id",
        &request.subnet_id,
        "--is-pv-encryption-in-transit-enabled",
        "true",
        "--metadata",
    ]);
    launch.push(metadata_json(request).to_string());

    if let Some(config) = shape_config_json(&request.shape) {
        launch.push("--shape-config".to_string());
        launch.push(config.to_string());
    }

    if let Some(size) = request.boot_volume_gb.filter(|s| *s > 0) {
        launch.push("--boot-volume-size-in-gbs".to_string());
        launch.push(size.to_string());
    }

    launch
}

fn metadata_json(request: &LaunchRequest) -> serde_json::Value {
    let mut metadata = serde_json::Map::new();
    metadata.insert(
        "ssh_authorized_keys".to_string(),
        serde_json::json!(request.ssh_authorized_key),
    );
    if let Some(ref script) = request.cloud_init {
        if !script.is_empty() {
            let encoded = base64::engine::general_purpose::STANDARD.encode(script);
            metadata.insert("user_data".to_string(), serde_json::json!(encoded));
        }
    }
    serde_json::Value::Object(metadata)
}

/// Shape config is only accepted for flexible shapes
fn shape_config_json(shape: &ShapeSpec) -> Option<serde_json::Value> {
    if !shape.is_flex() {
        return None;
    }
    let mut config = serde_json::Map::new();
    if let Some(ocpus) = shape.ocpus {
        config.insert("ocpus".to_string(), serde_json::json!(ocpus));
    }
    if let Some(memory) = shape.memory_gb {
        config.insert("memoryInGBs".to_string(), serde_json::json!(memory));
    }
    if let Some(baseline) = shape.burst.baseline() {
        config.insert(
            "baselineOcpuUtilization".to_string(),
            serde_json::json!(baseline),
        );
    }
    Some(serde_json::Value::Object(config))
}

#[async_trait]
impl ProviderGateway for OciGateway {
    fn name(&self) -> &str {
        "oci"
    }

    async fn prepare_launch(&self, plan: &LaunchPlan) -> capgrab_cloud::Result<LaunchRequest> {
        if plan.shape.name.trim().is_empty() {
            return Err(OciError::InvalidConfig("shape must not be empty".to_string()).into());
        }
        let image = self.resolve_image(&plan.image, &plan.shape.name).await?;
        tracing::info!(
            "Image: {}",
            image.display_name.as_deref().unwrap_or(&image.id)
        );
        let shape = self.resolve_shape(&plan.shape, &image.id).await?;
        let subnet_id = self.resolve_subnet(&plan.subnet).await?;

        let boot_volume_display_gb = match plan.boot_volume_gb {
            Some(size) if size > 0 => size as f64,
            _ => image
                .size_in_mbs
                .map(|mb| (mb as f64 / 1024.0).round())
                .unwrap_or_default(),
        };

        Ok(LaunchRequest {
            compartment_id: self.tenancy.clone(),
            image_name: image.display_name.unwrap_or_else(|| image.id.clone()),
            image_id: image.id,
            subnet_id,
            shape,
            boot_volume_gb: plan.boot_volume_gb,
            boot_volume_display_gb,
            ssh_authorized_key: plan.ssh_authorized_key.clone(),
            cloud_init: plan.cloud_init.clone(),
        })
    }

    async fn create_instance(
        &self,
        request: &LaunchRequest,
        zone: &str,
        display_name: &str,
    ) -> capgrab_cloud::Result<LaunchedInstance> {
        let launch = launch_args(&request.compartment_id, request, zone, display_name);
        let instance: InstanceInfo = self.cli.run_item(&launch).await?;
        Ok(LaunchedInstance {
            display_name: instance
                .display_name
                .unwrap_or_else(|| display_name.to_string()),
            zone: instance
                .availability_domain
                .unwrap_or_else(|| zone.to_string()),
            id: instance.id,
        })
    }

    async fn list_availability_zones(&self) -> capgrab_cloud::Result<Vec<String>> {
        let domains = self.availability_domains().await?;
        Ok(domains.into_iter().map(|d| d.name).collect())
    }

    async fn get_instance_state(&self, instance_id: &str) -> capgrab_cloud::Result<InstanceState> {
        let instance: InstanceInfo = self
            .cli
            .run_item(&args(&[
                "compute",
                "instance",
                "get",
                "--instance-id",
                instance_id,
            ]))
            .await?;
        Ok(InstanceState::parse(&instance.lifecycle_state))
    }

    async fn list_network_interfaces(
        &self,
        instance_id: &str,
    ) -> capgrab_cloud::Result<Vec<NetworkInterface>> {
        let attachments: Vec<VnicAttachmentInfo> = self
            .cli
            .run_list(&args(&[
                "compute",
                "vnic-attachment",
                "list",
                "--compartment-id",
                &self.tenancy,
                "--instance-id",
                instance_id,
            ]))
            .await?;
        Ok(attachments
            .into_iter()
            .filter_map(|a| a.vnic_id)
            .map(|id| NetworkInterface { id })
            .collect())
    }

    async fn get_interface_public_address(
        &self,
        interface_id: &str,
    ) -> capgrab_cloud::Result<Option<String>> {
        let vnic = self.vnic(interface_id).await?;
        Ok(vnic.public_address())
    }

    async fn terminate_instance(&self, instance_id: &str) -> capgrab_cloud::Result<()> {
        self.cli
            .run_command(&args(&[
                "compute",
                "instance",
                "terminate",
                "--instance-id",
                instance_id,
                "--force",
            ]))
            .await?;
        Ok(())
    }

    async fn list_public_addresses(&self) -> capgrab_cloud::Result<Vec<InstanceAddress>> {
        let attachments: Vec<VnicAttachmentInfo> = self
            .cli
            .run_list(&args(&[
                "compute",
                "vnic-attachment",
                "list",
                "--compartment-id",
                &self.tenancy,
                "--all",
            ]))
            .await?;

        let lookups = attachments
            .iter()
            .filter_map(|a| a.vnic_id.as_deref())
            .map(|id| self.vnic(id));
        let vnics = futures_util::future::join_all(lookups).await;

        let mut addresses = Vec::new();
        for vnic in vnics {
            match vnic {
                Ok(vnic) => {
                    if let Some(address) = vnic.public_address() {
                        addresses.push(InstanceAddress {
                            instance_name: vnic.display_name.unwrap_or(vnic.id),
                            address,
                        });
                    }
                }
                Err(e) => tracing::warn!("Failed to read VNIC: {}", e),
            }
        }
        Ok(addresses)
    }
}
