use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("Blocked by site: {0}")]
    Blocked(String),
    #[error("HTML parse error: {0}")]
    HtmlParse(String),
    #[error("Invalid search URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Page {page} failed: {source}")]
    PageFailed {
        page: usize,
        #[source]
        source: Box<ScraperError>,
    },
}

impl From<reqwest::Error> for ScraperError {
    fn from(err: reqwest::Error) -> Self {
        ScraperError::Network(err.without_url().to_string())
    }
}
