use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

/// Failures while driving Chromium through an audit.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// DevTools protocol or launch failure
    #[error("chromium: {0}")]
    Cdp(String),

    /// The target page could not be opened
    #[error("could not open page: {0}")]
    Navigation(String),

    /// An expected element never appeared
    #[error("element never appeared: {0}")]
    MissingElement(String),

    /// The audit outlived its deadline
    #[error("audit timed out: {0}")]
    Timeout(String),

    /// Rendered report had no readable scores
    #[error("lighthouse report unreadable: {0}")]
    ReportParse(String),
}

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Self::Cdp(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            BrowserError::Navigation("dns failure".to_string()).to_string(),
            "could not open page: dns failure"
        );
        assert_eq!(
            BrowserError::MissingElement(".lh-gauge".to_string()).to_string(),
            "element never appeared: .lh-gauge"
        );
    }
}
