//! Readiness waiter
//!
//! After a successful create call the instance still has to boot and get
//! a public address. Readiness means a RUNNING lifecycle state and at
//! least one public address on its network interfaces.

use crate::retry::{Cancelled, PollPolicy, poll};
use capgrab_cloud::ProviderGateway;
use std::ops::ControlFlow;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadinessError {
    #[error("instance was terminated before it became ready")]
    Terminated,

    #[error("instance not ready after {attempts} checks")]
    Timeout { attempts: u32 },

    #[error("readiness wait cancelled")]
    Cancelled,
}

impl From<Cancelled> for ReadinessError {
    fn from(_: Cancelled) -> Self {
        ReadinessError::Cancelled
    }
}

enum Check {
    Ready(Vec<String>),
    Pending,
    Gone,
}

pub struct ReadinessWaiter {
    policy: PollPolicy,
}

impl ReadinessWaiter {
    pub fn new(policy: PollPolicy) -> Self {
        Self { policy }
    }

    /// Wait until `instance_id` is ready and return its public addresses
    pub async fn wait(
        &self,
        gateway: &dyn ProviderGateway,
        instance_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ReadinessError> {
        let outcome = poll(self.policy, cancel, move |attempt| async move {
            match check_instance(gateway, instance_id).await {
                Ok(Check::Ready(addresses)) => ControlFlow::Break(Ok(addresses)),
                Ok(Check::Gone) => ControlFlow::Break(Err(ReadinessError::Terminated)),
                Ok(Check::Pending) => {
                    tracing::debug!("Instance {} not ready (check {})", instance_id, attempt + 1);
                    ControlFlow::Continue(())
                }
                Err(e) => {
                    tracing::debug!("Readiness check for {} failed: {}", instance_id, e);
                    ControlFlow::Continue(())
                }
            }
        })
        .await?;

        outcome.unwrap_or(Err(ReadinessError::Timeout {
            attempts: self.policy.max_attempts,
        }))
    }
}

impl Default for ReadinessWaiter {
    fn default() -> Self {
        Self::new(PollPolicy::default())
    }
}

async fn check_instance(
    gateway: &dyn ProviderGateway,
    instance_id: &str,
) -> capgrab_cloud::Result<Check> {
    let state = gateway.get_instance_state(instance_id).await?;
    if state.is_gone() {
        return Ok(Check::Gone);
    }
    if !state.is_running() {
        return Ok(Check::Pending);
    }

    let mut addresses = Vec::new();
    for interface in gateway.list_network_interfaces(instance_id).await? {
        match gateway.get_interface_public_address(&interface.id).await {
            Ok(Some(address)) => addresses.push(address),
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to read address of {}: {}", interface.id, e),
        }
    }

    if addresses.is_empty() {
        Ok(Check::Pending)
    } else {
        Ok(Check::Ready(addresses))
    }
}
