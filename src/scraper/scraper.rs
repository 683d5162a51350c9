// scraper.rs
use crate::config::{page_url, FetchSettings};
use crate::domain::Record;
use crate::scraper::models::{parse_offer_cards, OfferCard};
use crate::scraper::{PageFetcher, ScraperError};
use rand::Rng;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, REFERER};
use std::time::Duration;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const MAX_BACKOFF_SECS: u64 = 10;
const JITTER_MAX_MS: u64 = 2000;

/// Downloads cian search pages and turns the result cards into records.
pub struct CianScraper {
    client: Client,
    settings: FetchSettings,
}

impl CianScraper {
    pub fn new(settings: FetchSettings) -> Result<Self, ScraperError> {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static("https://www.cian.ru/"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("ru-RU,ru;q=0.9"));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;

        Ok(Self { client, settings })
    }

    pub fn fetch_html(&self, url: &str) -> Result<String, ScraperError> {
        let attempts = self.settings.attempts.max(1);
        let mut last_err = None;

        for attempt in 1..=attempts {
            let start = std::time::Instant::now();

            match self.try_fetch_html(url) {
                Ok(html) => {
                    log::debug!("✅ Fetched {url} on attempt {attempt} in {:?}", start.elapsed());
                    return Ok(html);
                }
                // Retrying a captcha wall only digs deeper.
                Err(e @ ScraperError::Blocked(_)) => return Err(e),
                Err(e) => {
                    log::warn!(
                        "⚠️ Attempt {attempt}/{attempts} for {url} failed in {:?}: {e}",
                        start.elapsed()
                    );
                    last_err = Some(e);

                    if attempt < attempts {
                        let base = std::cmp::min(2 * attempt as u64, MAX_BACKOFF_SECS);
                        let jitter = rand::thread_rng().gen_range(0..=JITTER_MAX_MS);
                        std::thread::sleep(
                            Duration::from_secs(base) + Duration::from_millis(jitter),
                        );
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| ScraperError::Network("retry loop failed".into())))
    }

    fn try_fetch_html(&self, url: &str) -> Result<String, ScraperError> {
        let resp = self.client.get(url).send()?;
        let status = resp.status();
        let text = resp.text()?;

        if !status.is_success() {
            return Err(ScraperError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        if looks_blocked(&text) {
            return Err(ScraperError::Blocked(format!("captcha page at {url}")));
        }

        Ok(text)
    }
}

fn looks_blocked(html: &str) -> bool {
    !html.contains("CardComponent") && html.to_lowercase().contains("captcha")
}

impl PageFetcher for CianScraper {
    fn fetch_page(&self, query: &str, page: usize) -> Result<Vec<Record>, ScraperError> {
        if page > 1 && self.settings.page_delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.settings.page_delay_ms));
        }

        let url = page_url(query, page)?;
        let html = self.fetch_html(url.as_str())?;
        let cards = parse_offer_cards(&html)?;

        log::info!("Found {} offers on page {page}", cards.len());
        Ok(cards.into_iter().map(OfferCard::into_record).collect())
    }
}
