use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum ScrapeError {
    Network(String),
    HttpStatus { status: u16, url: String },
    MalformedUrl(String),
}

impl fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrapeError::Network(msg) => write!(f, "Network error: {msg}"),
            ScrapeError::HttpStatus { status, url } => write!(f, "HTTP {status} for {url}"),
            ScrapeError::MalformedUrl(url) => write!(f, "No listing id derivable from {url}"),
        }
    }
}

impl Error for ScrapeError {}
