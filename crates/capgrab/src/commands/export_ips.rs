use super::{check_accounts, is_selected};
use crate::gateway::OciGatewayFactory;
use capgrab_config::Config;
use capgrab_core::{GatewayFactory, IpExporter};
use colored::Colorize;
use std::path::PathBuf;

pub async fn handle(
    config: &Config,
    accounts: &[String],
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    check_accounts(config, accounts)?;

    let exporter = match output {
        Some(path) => IpExporter::new(path),
        None => IpExporter::timestamped(&config.ip_export_prefix),
    };
    let factory = OciGatewayFactory::from_config(config);

    let mut failed = 0;
    for account in config
        .accounts
        .iter()
        .filter(|a| is_selected(accounts, &a.name))
    {
        let gateway = match factory.connect(&account.name).await {
            Ok(gateway) => gateway,
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), account.name, e);
                failed += 1;
                continue;
            }
        };

        match exporter.append_account(&account.name, gateway.as_ref()).await {
            Ok(count) => println!("{} {}: {} addresses", "✓".green(), account.name.cyan(), count),
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), account.name, e);
                failed += 1;
            }
        }
    }

    println!("Addresses: {}", exporter.path().display().to_string().cyan());
    if failed > 0 {
        anyhow::bail!("{} accounts could not be exported", failed);
    }
    Ok(())
}
