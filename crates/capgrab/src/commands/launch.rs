use super::{build_notifier, check_accounts, is_selected};
use crate::gateway::OciGatewayFactory;
use capgrab_config::Config;
use capgrab_core::{BatchOrchestrator, EngineSettings, IpExporter};
use colored::Colorize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub async fn handle(
    config: &Config,
    accounts: &[String],
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    check_accounts(config, accounts)?;

    let batches: Vec<_> = config
        .batches()?
        .into_iter()
        .filter(|b| is_selected(accounts, &b.account))
        .collect();

    println!("{}", "Starting batch launch".blue());
    for batch in &batches {
        let templates: Vec<&str> = batch.templates.iter().map(|t| t.name.as_str()).collect();
        println!("  {} {}", batch.account.cyan(), templates.join(", "));
    }

    let settings = EngineSettings::default()
        .with_classifier(config.classifier())
        .with_notify_each(config.notify_each());
    let exporter = IpExporter::timestamped(&config.ip_export_prefix);
    let orchestrator = BatchOrchestrator::new(
        Arc::new(OciGatewayFactory::from_config(config)),
        build_notifier(config)?,
        settings,
        cancel.clone(),
    )
    .with_exporter(Some(exporter.clone()))
    .with_post_batch_command(config.post_batch_command.clone());

    let summary = orchestrator.run(&batches).await;

    println!();
    for (account, totals) in &summary.accounts {
        let line = format!(
            "{}: total {}, succeeded {}, failed {}",
            account, totals.requested, totals.succeeded, totals.failed()
        );
        if totals.failed() == 0 {
            println!("{} {}", "✓".green(), line);
        } else {
            println!("{} {}", "✗".red(), line);
        }
    }
    println!(
        "{}",
        format!(
            "Total {}, succeeded {}, failed {}",
            summary.totals.requested,
            summary.totals.succeeded,
            summary.totals.failed()
        )
        .bold()
    );
    if exporter.path().exists() {
        println!("Addresses: {}", exporter.path().display().to_string().cyan());
    }
    if cancel.is_cancelled() {
        println!("{}", "Cancelled".yellow());
    }

    Ok(())
}
