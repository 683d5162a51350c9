pub mod models;
mod paginator;
mod scraper;
mod scraper_error;

pub use paginator::{crawl, PageFetcher};
pub use scraper::CianScraper;
pub use scraper_error::ScraperError;
