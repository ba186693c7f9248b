use thiserror::Error;

/// Engine-level error type.
///
/// Only `InvalidContent` and `InvalidRequest` are precondition failures. An
/// over-budget run is not an error: it comes back as a `GenerationOutcome`
/// with `budget_met == false`.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Invalid content: {0}")]
    InvalidContent(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The layout step could not produce a well-formed document. Never retried
    /// with different content; the caller owns the fallback representation.
    #[error("Render failure: {0}")]
    Render(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl LayoutError {
    /// True when the caller should switch to its plain-text fallback.
    pub fn is_render_failure(&self) -> bool {
        matches!(self, LayoutError::Render(_))
    }

    /// Stable machine-readable code, used in the driver's JSON report.
    pub fn code(&self) -> &'static str {
        match self {
            LayoutError::InvalidContent(_) => "INVALID_CONTENT",
            LayoutError::InvalidRequest(_) => "INVALID_REQUEST",
            LayoutError::Render(_) => "RENDER_FAILURE",
            LayoutError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "INTERNAL_ERROR"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_failure_is_flagged() {
        let err = LayoutError::Render("unsupported character".to_string());
        assert!(err.is_render_failure());
        assert_eq!(err.code(), "RENDER_FAILURE");
    }

    #[test]
    fn test_invalid_content_is_not_render_failure() {
        let err = LayoutError::InvalidContent("name is required".to_string());
        assert!(!err.is_render_failure());
        assert_eq!(err.to_string(), "Invalid content: name is required");
    }

    #[test]
    fn test_internal_wraps_anyhow() {
        let err: LayoutError = anyhow::anyhow!("join failed").into();
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }
}
