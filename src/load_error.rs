/// Why a snapshot document could not be turned into a forecast.
///
/// Any of these aborts the render cycle; nothing partial is shown.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Snapshot request to {url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("Failed to read snapshot file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Snapshot is not a valid forecast document: {0}")]
    Parse(#[from] serde_json::Error),
}
