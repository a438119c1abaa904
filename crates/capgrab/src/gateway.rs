//! Gateway factory for configured OCI accounts

use async_trait::async_trait;
use capgrab_cloud::{CloudError, ProviderGateway};
use capgrab_cloud_oci::{OciAccount, OciGateway, OciProfile};
use capgrab_config::Config;
use capgrab_core::GatewayFactory;
use std::collections::HashMap;
use std::sync::Arc;

pub struct OciGatewayFactory {
    accounts: HashMap<String, OciAccount>,
}

impl OciGatewayFactory {
    pub fn from_config(config: &Config) -> Self {
        let accounts = config
            .accounts
            .iter()
            .map(|account| {
                let oci = OciAccount {
                    tenancy: account.tenancy.clone(),
                    profile: OciProfile {
                        profile: account.profile.clone(),
                        config_file: account.config_file.clone(),
                        region: account.region.clone(),
                        proxy: config.proxy.clone(),
                    },
                };
                (account.name.clone(), oci)
            })
            .collect();
        Self { accounts }
    }
}

#[async_trait]
impl GatewayFactory for OciGatewayFactory {
    async fn connect(&self, account: &str) -> capgrab_cloud::Result<Arc<dyn ProviderGateway>> {
        let oci = self
            .accounts
            .get(account)
            .cloned()
            .ok_or_else(|| CloudError::InvalidConfig(format!("unknown account {}", account)))?;

        let gateway = OciGateway::new(oci);
        gateway.check_auth().await?;
        Ok(Arc::new(gateway))
    }
}
