use thiserror::Error;

/// Failure to download a page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status code: {0}")]
    Status(u16),
}

/// Failure to pull the image list out of an embedded JSON document.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("malformed image json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing key `{0}` in image json")]
    MissingKey(&'static str),
    #[error("image entry {0} has no `large` url")]
    MissingLarge(usize),
}
