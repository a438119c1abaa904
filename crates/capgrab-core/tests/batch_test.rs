mod common;

use async_trait::async_trait;
use capgrab_cloud::{CloudError, ImageSource, ProviderGateway};
use capgrab_core::{
    AccountBatch, BatchOrchestrator, BatchTotals, GatewayFactory, IpExporter, NamedPlan,
};
use capgrab_notify::NoopNotifier;
use common::{RecordingNotifier, Reply, ScriptedGateway, plan, settings};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct StubFactory {
    gateways: HashMap<String, Arc<ScriptedGateway>>,
}

impl StubFactory {
    fn new(gateways: Vec<(&str, ScriptedGateway)>) -> Self {
        Self {
            gateways: gateways
                .into_iter()
                .map(|(name, g)| (name.to_string(), Arc::new(g)))
                .collect(),
        }
    }
}

#[async_trait]
impl GatewayFactory for StubFactory {
    async fn connect(&self, account: &str) -> capgrab_cloud::Result<Arc<dyn ProviderGateway>> {
        match self.gateways.get(account) {
            Some(gateway) => Ok(gateway.clone()),
            None => Err(CloudError::InvalidConfig(format!(
                "unknown account {}",
                account
            ))),
        }
    }
}

fn template(name: &str, image: &str, sum: u32) -> NamedPlan {
    let mut p = plan(sum);
    p.image = ImageSource::Id(image.to_string());
    p.display_name = name.to_string();
    NamedPlan {
        name: name.to_string(),
        plan: p,
    }
}

fn batch(account: &str, templates: Vec<NamedPlan>) -> AccountBatch {
    AccountBatch {
        account: account.to_string(),
        templates,
    }
}

fn orchestrator(factory: StubFactory) -> BatchOrchestrator {
    BatchOrchestrator::new(
        Arc::new(factory),
        Arc::new(NoopNotifier),
        settings(),
        CancellationToken::new(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_totals_independent_of_completion_order() {
    let mut totals = Vec::new();

    for (slow, fast) in [("img-a", "img-b"), ("img-b", "img-a")] {
        let gateway = ScriptedGateway::new(&["a", "b"])
            .with_create_delay(slow, Duration::from_secs(30))
            .with_create_delay(fast, Duration::from_secs(1));
        let factory = StubFactory::new(vec![("tokyo", gateway)]);

        let summary = orchestrator(factory)
            .run(&[batch(
                "tokyo",
                vec![template("arm", "img-a", 2), template("amd", "img-b", 1)],
            )])
            .await;
        totals.push(summary.totals);
    }

    let expected = BatchTotals {
        requested: 3,
        succeeded: 3,
    };
    assert_eq!(totals, vec![expected, expected]);
}

#[tokio::test(start_paused = true)]
async fn test_failures_and_broken_accounts() {
    let tokyo = ScriptedGateway::new(&["AD-1"]).with_default(Reply::Reject(400, None));
    let osaka = ScriptedGateway::new(&["AD-1"]).with_failing_zone_listing();
    let factory = StubFactory::new(vec![("tokyo", tokyo), ("osaka", osaka)]);

    let mut invalid = template("invalid", "img-c", 2);
    invalid.plan.shape.name.clear();

    let summary = orchestrator(factory)
        .run(&[
            batch("tokyo", vec![template("arm", "img-a", 1), invalid]),
            batch("missing", vec![template("arm", "img-a", 1)]),
            batch("osaka", vec![template("arm", "img-a", 4)]),
        ])
        .await;

    // Exhausted run and invalid plan count as requested; osaka lists no zones
    assert_eq!(
        summary.accounts,
        vec![
            (
                "tokyo".to_string(),
                BatchTotals {
                    requested: 3,
                    succeeded: 0
                }
            ),
            ("osaka".to_string(), BatchTotals::default()),
        ]
    );
    assert_eq!(summary.totals.failed(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_export_after_each_account() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("IPs.txt");
    let factory = StubFactory::new(vec![
        ("tokyo", ScriptedGateway::new(&["a"])),
        ("osaka", ScriptedGateway::new(&["a"])),
    ]);

    let summary = orchestrator(factory)
        .with_exporter(Some(IpExporter::new(&path)))
        .run(&[
            batch("tokyo", vec![template("arm", "img-a", 2)]),
            batch("osaka", vec![template("amd", "img-b", 1)]),
        ])
        .await;

    assert_eq!(summary.totals.succeeded, 3);
    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        content,
        "[tokyo]\narm-1, 203.0.113.7\narm-2, 203.0.113.7\n\n[osaka]\namd, 203.0.113.7\n\n"
    );
}

#[tokio::test(start_paused = true)]
async fn test_batch_notifications() {
    let notifier = Arc::new(RecordingNotifier::default());
    let factory = StubFactory::new(vec![(
        "tokyo",
        ScriptedGateway::new(&["a"]).with_default(Reply::Transient),
    )]);
    let mut limited = template("arm", "img-a", 2);
    limited.plan.retry = capgrab_cloud::RetryBudget::Limited(0);

    BatchOrchestrator::new(
        Arc::new(factory),
        notifier.clone(),
        settings().with_notify_each(false),
        CancellationToken::new(),
    )
    .run(&[batch("tokyo", vec![limited])])
    .await;

    let sent = notifier.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].0, "[tokyo]");
    assert!(sent[0].1.contains("Starting batch launch"));
    assert!(sent[1].1.contains("Total: 2"));
    assert!(sent[1].1.contains("Succeeded: 0"));
    assert!(sent[1].1.contains("Failed: 2"));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_batch_stops_before_next_account() {
    let cancel = CancellationToken::new();
    let factory = StubFactory::new(vec![
        ("tokyo", ScriptedGateway::new(&["a"])),
        ("osaka", ScriptedGateway::new(&["a"])),
    ]);
    let orchestrator = BatchOrchestrator::new(
        Arc::new(factory),
        Arc::new(NoopNotifier),
        settings(),
        cancel.clone(),
    )
    .with_account_pause(Duration::from_secs(60));

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        trigger.cancel();
    });

    let summary = orchestrator
        .run(&[
            batch("tokyo", vec![template("arm", "img-a", 1)]),
            batch("osaka", vec![template("arm", "img-a", 1)]),
        ])
        .await;

    assert_eq!(summary.accounts.len(), 1);
    assert_eq!(summary.accounts[0].0, "tokyo");
}
