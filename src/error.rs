// src/error.rs
use thirtyfour::error::WebDriverError;
use thiserror::Error;

/// Failures raised while driving the reimbursement page or the desktop dialogs.
#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("element not found: {0}")]
    NotFound(String),

    #[error("browser session lost: {0}")]
    SessionLost(String),

    #[error("webdriver error: {0}")]
    WebDriver(#[from] WebDriverError),

    #[error("desktop automation failed: {0}")]
    Desktop(String),

    #[error("operator input failed: {0}")]
    Operator(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AutomationError>;

const SESSION_GONE_MARKERS: [&str; 4] = [
    "invalid session id",
    "no such window",
    "chrome not reachable",
    "session deleted",
];

impl AutomationError {
    /// A fatal error means the browser session can no longer be used and the
    /// run has to stop. Everything else is logged and the walk moves on.
    pub fn is_fatal(&self) -> bool {
        match self {
            AutomationError::SessionLost(_) => true,
            AutomationError::WebDriver(e) => {
                let msg = e.to_string().to_lowercase();
                SESSION_GONE_MARKERS.iter().any(|m| msg.contains(m))
            }
            _ => false,
        }
    }
}
