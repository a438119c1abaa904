//! Batch orchestration
//!
//! Accounts run one after another. Within an account every template gets
//! its own engine run on a tokio task; the account's gateway is shared by
//! all of them.

use crate::engine::{AcquisitionEngine, EngineSettings};
use crate::export::IpExporter;
use crate::hook;
use crate::report;
use crate::retry::cancellable_sleep;
use async_trait::async_trait;
use capgrab_cloud::{LaunchPlan, ProviderGateway};
use capgrab_notify::Notifier;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Opens a gateway for a named account
#[async_trait]
pub trait GatewayFactory: Send + Sync {
    async fn connect(&self, account: &str) -> capgrab_cloud::Result<Arc<dyn ProviderGateway>>;
}

/// One template of an account
#[derive(Debug, Clone, PartialEq)]
pub struct NamedPlan {
    pub name: String,
    pub plan: LaunchPlan,
}

/// Everything launched for one account
#[derive(Debug, Clone, PartialEq)]
pub struct AccountBatch {
    pub account: String,
    pub templates: Vec<NamedPlan>,
}

/// Requested/succeeded counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchTotals {
    pub requested: u64,
    pub succeeded: u64,
}

impl BatchTotals {
    pub fn failed(&self) -> u64 {
        self.requested.saturating_sub(self.succeeded)
    }
}

impl std::ops::AddAssign for BatchTotals {
    fn add_assign(&mut self, other: Self) {
        self.requested += other.requested;
        self.succeeded += other.succeeded;
    }
}

/// Counters that concurrently finishing runs add into
#[derive(Debug, Default)]
pub struct BatchTally {
    requested: AtomicU64,
    succeeded: AtomicU64,
}

impl BatchTally {
    pub fn record(&self, requested: u32, succeeded: u32) {
        self.requested.fetch_add(requested as u64, Ordering::Relaxed);
        self.succeeded.fetch_add(succeeded as u64, Ordering::Relaxed);
    }

    pub fn totals(&self) -> BatchTotals {
        BatchTotals {
            requested: self.requested.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Per-account totals, in run order; unreachable accounts are absent
    pub accounts: Vec<(String, BatchTotals)>,
    pub totals: BatchTotals,
}

pub struct BatchOrchestrator {
    factory: Arc<dyn GatewayFactory>,
    notifier: Arc<dyn Notifier>,
    settings: EngineSettings,
    cancel: CancellationToken,
    exporter: Option<IpExporter>,
    post_batch_command: Option<String>,
    account_pause: Duration,
}

impl BatchOrchestrator {
    pub fn new(
        factory: Arc<dyn GatewayFactory>,
        notifier: Arc<dyn Notifier>,
        settings: EngineSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            factory,
            notifier,
            settings,
            cancel,
            exporter: None,
            post_batch_command: None,
            account_pause: Duration::from_secs(5),
        }
    }

    pub fn with_exporter(mut self, exporter: Option<IpExporter>) -> Self {
        self.exporter = exporter;
        self
    }

    pub fn with_post_batch_command(mut self, command: Option<String>) -> Self {
        self.post_batch_command = command;
        self
    }

    pub fn with_account_pause(mut self, pause: Duration) -> Self {
        self.account_pause = pause;
        self
    }

    pub async fn run(&self, batches: &[AccountBatch]) -> BatchSummary {
        let mut summary = BatchSummary::default();

        for (i, batch) in batches.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!("Batch cancelled before account {}", batch.account);
                break;
            }

            let gateway = match self.factory.connect(&batch.account).await {
                Ok(gateway) => gateway,
                Err(e) => {
                    error!("[{}] Failed to connect: {}", batch.account, e);
                    continue;
                }
            };

            let totals = self.run_account(batch, gateway.clone()).await;
            summary.totals += totals;
            summary.accounts.push((batch.account.clone(), totals));

            if let Some(ref exporter) = self.exporter {
                match exporter.append_account(&batch.account, gateway.as_ref()).await {
                    Ok(count) => info!(
                        "[{}] Exported {} addresses to {}",
                        batch.account,
                        count,
                        exporter.path().display()
                    ),
                    Err(e) => error!("[{}] IP export failed: {}", batch.account, e),
                }
            }

            if let Some(ref command) = self.post_batch_command {
                match hook::run_post_batch_command(command).await {
                    Ok(Some(output)) => info!("[{}] {}", batch.account, output.trim_end()),
                    Ok(None) => {}
                    Err(e) => error!("[{}] {}", batch.account, e),
                }
            }

            if i + 1 < batches.len()
                && cancellable_sleep(&self.cancel, self.account_pause)
                    .await
                    .is_err()
            {
                warn!("Batch cancelled after account {}", batch.account);
                break;
            }
        }

        summary
    }

    /// Run every template of one account concurrently
    async fn run_account(
        &self,
        batch: &AccountBatch,
        gateway: Arc<dyn ProviderGateway>,
    ) -> BatchTotals {
        let context = format!("[{}]", batch.account);
        info!("{} Starting batch launch of {} templates", context, batch.templates.len());
        if let Err(e) = self.notifier.send(&context, &report::batch_started()).await {
            warn!("{} Failed to send notification: {}", context, e);
        }

        let tally = Arc::new(BatchTally::default());
        let mut tasks = JoinSet::new();

        for template in &batch.templates {
            let context = format!("[{}/{}]", batch.account, template.name);
            let engine = AcquisitionEngine::new(
                gateway.clone(),
                self.notifier.clone(),
                self.settings.clone(),
                self.cancel.clone(),
            )
            .with_context(context.clone());
            let gateway = gateway.clone();
            let plan = template.plan.clone();
            let tally = tally.clone();

            tasks.spawn(async move {
                let zones = match gateway.list_availability_zones().await {
                    Ok(zones) => zones,
                    Err(e) => {
                        error!("{} Failed to list availability zones: {}", context, e);
                        return;
                    }
                };

                let requested = plan.effective_sum(zones.len());
                match engine.run(&plan, zones).await {
                    Ok(report) => tally.record(report.requested, report.succeeded),
                    Err(e) => {
                        error!("{} {}", context, e);
                        tally.record(requested, 0);
                    }
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("{} Launch task failed: {}", context, e);
            }
        }

        let totals = tally.totals();
        info!(
            "{} Batch finished: total {}, succeeded {}, failed {}",
            context,
            totals.requested,
            totals.succeeded,
            totals.failed()
        );
        if let Err(e) = self
            .notifier
            .send(&context, &report::batch_finished(&totals))
            .await
        {
            warn!("{} Failed to send notification: {}", context, e);
        }
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tally_is_order_independent() {
        let tally = Arc::new(BatchTally::default());
        let mut tasks = JoinSet::new();
        for (requested, succeeded) in [(3, 1), (2, 2), (5, 0), (1, 1)] {
            let tally = tally.clone();
            tasks.spawn(async move {
                tokio::task::yield_now().await;
                tally.record(requested, succeeded);
            });
        }
        while tasks.join_next().await.is_some() {}

        assert_eq!(
            tally.totals(),
            BatchTotals {
                requested: 11,
                succeeded: 4
            }
        );
        assert_eq!(tally.totals().failed(), 7);
    }

    #[test]
    fn test_totals_add() {
        let mut totals = BatchTotals::default();
        totals += BatchTotals {
            requested: 2,
            succeeded: 1,
        };
        totals += BatchTotals {
            requested: 3,
            succeeded: 3,
        };
        assert_eq!(totals.requested, 5);
        assert_eq!(totals.succeeded, 4);
    }
}
