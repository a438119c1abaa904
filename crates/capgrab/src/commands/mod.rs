pub mod export_ips;
pub mod launch;

use anyhow::Context;
use capgrab_config::Config;
use capgrab_notify::{NoopNotifier, Notifier, TelegramConfig, TelegramNotifier};
use std::sync::Arc;

/// Telegram when a token is configured, nothing otherwise
pub fn build_notifier(config: &Config) -> anyhow::Result<Arc<dyn Notifier>> {
    match config.notify {
        Some(ref notify) if !notify.token.is_empty() => {
            let telegram = TelegramNotifier::new(
                TelegramConfig::new(&notify.token, &notify.chat_id)
                    .with_proxy(config.proxy.clone()),
            )
            .context("Invalid notify settings")?;
            Ok(Arc::new(telegram))
        }
        _ => Ok(Arc::new(NoopNotifier)),
    }
}

/// Check `selected` account names against the config; empty means all
pub fn check_accounts(config: &Config, selected: &[String]) -> anyhow::Result<()> {
    if config.accounts.is_empty() {
        anyhow::bail!("No accounts configured");
    }
    for name in selected {
        if config.account(name).is_none() {
            anyhow::bail!("Unknown account: {}", name);
        }
    }
    Ok(())
}

pub fn is_selected(selected: &[String], account: &str) -> bool {
    selected.is_empty() || selected.iter().any(|s| s == account)
}
