//! Provider gateway trait definition

use crate::error::Result;
use crate::model::{
    InstanceAddress, InstanceState, LaunchPlan, LaunchRequest, LaunchedInstance, NetworkInterface,
};
use async_trait::async_trait;

/// Cloud provider abstraction trait
///
/// One gateway is bound to one account session (credentials, region,
/// compartment). It is shared read-only by every concurrent run of that
/// account, so implementations must not keep per-run state.
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    /// Returns the provider name (e.g., "oci")
    fn name(&self) -> &str;

    /// Resolve the provider-side references of a plan (image, subnet,
    /// shape defaults). Invalid plans fail with `CloudError::InvalidConfig`.
    async fn prepare_launch(&self, plan: &LaunchPlan) -> Result<LaunchRequest>;

    /// Issue a single create-instance call in `zone`
    async fn create_instance(
        &self,
        request: &LaunchRequest,
        zone: &str,
        display_name: &str,
    ) -> Result<LaunchedInstance>;

    /// Availability zones of the account's region, in provider order
    async fn list_availability_zones(&self) -> Result<Vec<String>>;

    async fn get_instance_state(&self, instance_id: &str) -> Result<InstanceState>;

    async fn list_network_interfaces(&self, instance_id: &str) -> Result<Vec<NetworkInterface>>;

    /// Public address of an interface, `None` while unassigned
    async fn get_interface_public_address(&self, interface_id: &str) -> Result<Option<String>>;

    async fn terminate_instance(&self, instance_id: &str) -> Result<()>;

    /// Every public address in the account, for the IP export pass
    async fn list_public_addresses(&self) -> Result<Vec<InstanceAddress>>;
}
