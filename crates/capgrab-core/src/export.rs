//! Public address export
//!
//! Appends one block per account to a text file:
//!
//! ```text
//! [tokyo]
//! arm-1, 203.0.113.7
//! arm-2, 203.0.113.8
//!
//! ```

use crate::error::Result;
use capgrab_cloud::{InstanceAddress, ProviderGateway};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone)]
pub struct IpExporter {
    path: PathBuf,
}

impl IpExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<prefix>-YYYY-MM-DD-HHMMSS.txt` in the current directory
    pub fn timestamped(prefix: &str) -> Self {
        let stamp = chrono::Local::now().format("%Y-%m-%d-%H%M%S");
        Self::new(format!("{}-{}.txt", prefix, stamp))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// List the account's addresses and append them; returns the count
    pub async fn append_account(
        &self,
        account: &str,
        gateway: &dyn ProviderGateway,
    ) -> Result<usize> {
        let addresses = gateway.list_public_addresses().await?;
        self.append(account, &addresses).await?;
        Ok(addresses.len())
    }

    pub async fn append(&self, account: &str, addresses: &[InstanceAddress]) -> Result<()> {
        let mut block = format!("[{}]\n", account);
        for entry in addresses {
            block.push_str(&format!("{}, {}\n", entry.instance_name, entry.address));
        }
        block.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(block.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
