//! Progress notifications for capgrab
//!
//! The acquisition engine reports every attempt outcome through the
//! [`Notifier`] trait. [`TelegramNotifier`] talks to the Telegram Bot API;
//! [`NoopNotifier`] is used when no transport is configured.

pub mod error;
pub mod notifier;
pub mod telegram;

pub use error::{NotifyError, Result};
pub use notifier::{MessageHandle, NoopNotifier, Notifier};
pub use telegram::{TelegramConfig, TelegramNotifier};
