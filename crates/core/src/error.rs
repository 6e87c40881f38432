#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Displayed as the bare message so it can be shown to the user as-is.
    #[error("{0}")]
    Validation(String),

    #[error("Malformed {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
