use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Retry budget spent on 429/5xx/transport failures.
    #[error("giving up on {url} after {attempts} attempts: {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        last: String,
    },
    /// A status that is never retried (404, 403, ...).
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("could not build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
