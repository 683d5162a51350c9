use crate::domain::{Change, ChangeSet};
use crate::notifier::format::{format_change, format_summary};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
}

// The bot token is part of every request URL; keep it out of error text.
impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        DeliveryError::RequestFailed(err.without_url().to_string())
    }
}

/// Where formatted messages go. One `send` per recipient.
pub trait Channel {
    fn recipients(&self) -> &[String];
    fn send(&self, recipient: &str, text: &str) -> Result<(), DeliveryError>;
}

/// Bounded exponential backoff for message sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 500,
            max_delay_ms: 8000,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based), without jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        let ms = self
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }

    fn sleep_before_retry(&self, attempt: u32) {
        let delay = self.backoff(attempt);
        if delay.is_zero() {
            return;
        }
        let jitter_ms = rand::thread_rng().gen_range(0..=delay.as_millis() as u64 / 4);
        std::thread::sleep(delay + Duration::from_millis(jitter_ms));
    }
}

/// Result of pushing one message to every recipient.
#[derive(Debug, Default)]
pub struct DeliveryOutcome {
    pub delivered: usize,
    pub failed: Vec<(String, DeliveryError)>,
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DeliveryReport {
    pub messages: usize,
    pub delivered: usize,
    pub failed: usize,
}

impl DeliveryReport {
    fn record(&mut self, outcome: &DeliveryOutcome) {
        self.messages += 1;
        self.delivered += outcome.delivered;
        self.failed += outcome.failed.len();
    }
}

/// Formats changes and hands them to a channel, one at a time.
/// Failures are retried per recipient, then logged and skipped.
pub struct Dispatcher<'a, C: Channel + ?Sized> {
    channel: &'a C,
    policy: RetryPolicy,
}

impl<'a, C: Channel + ?Sized> Dispatcher<'a, C> {
    pub fn new(channel: &'a C, policy: RetryPolicy) -> Self {
        Self { channel, policy }
    }

    pub fn deliver(&self, change: &Change) -> DeliveryOutcome {
        self.deliver_text(&format_change(change))
    }

    pub fn deliver_text(&self, text: &str) -> DeliveryOutcome {
        let mut outcome = DeliveryOutcome::default();

        for recipient in self.channel.recipients() {
            match self.send_with_retry(recipient, text) {
                Ok(()) => {
                    log::info!("✅ Message sent to chat {recipient}");
                    outcome.delivered += 1;
                }
                Err(e) => {
                    log::error!("❌ Giving up on chat {recipient}: {e}");
                    outcome.failed.push((recipient.clone(), e));
                }
            }
        }

        outcome
    }

    fn send_with_retry(&self, recipient: &str, text: &str) -> Result<(), DeliveryError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.channel.send(recipient, text) {
                Ok(()) => return Ok(()),
                Err(e) if attempt < attempts => {
                    log::warn!("⚠️ Send to {recipient} failed (attempt {attempt}/{attempts}): {e}");
                    self.policy.sleep_before_retry(attempt);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Sends every change in delivery order, plus an optional summary at the end.
    pub fn dispatch(&self, changes: &ChangeSet, with_summary: bool) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for change in changes.iter() {
            let outcome = self.deliver(change);
            if !outcome.is_success() {
                log::warn!(
                    "⚠️ {} message for offer {} missed {} chat(s)",
                    change.kind(),
                    change.record().id,
                    outcome.failed.len()
                );
            }
            report.record(&outcome);
        }

        if with_summary && !changes.is_empty() {
            let outcome = self.deliver_text(&format_summary(changes));
            report.record(&outcome);
        }

        report
    }
}
