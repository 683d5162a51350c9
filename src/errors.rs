// errors.rs
use crate::config::ConfigError;
use crate::db::StoreError;
use crate::notifier::DeliveryError;
use crate::scraper::ScraperError;
use thiserror::Error;

/// Anything that ends a run early. Every variant leaves the saved snapshot as it was,
/// except `Trigger`, which can only happen after the new snapshot is saved.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] ScraperError),
    #[error("Persistence failed: {0}")]
    Persistence(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Notifier setup failed: {0}")]
    Notifier(#[from] DeliveryError),
    #[error("Failed to write trigger file: {0}")]
    Trigger(#[source] std::io::Error),
}
