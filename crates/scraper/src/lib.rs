#![allow(clippy::collapsible_if)]
pub mod parser;
pub mod source;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("network error: {0}")]
    Network(String),
    #[error("scrape source returned {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Parse(String),
}
