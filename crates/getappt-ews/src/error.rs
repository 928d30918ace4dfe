//! EWS client error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EwsError {
    #[error("Authentication failed (HTTP 401)")]
    Unauthorized,

    #[error("Access denied (HTTP 403)")]
    Forbidden,

    #[error("SOAP fault {code}: {message}")]
    SoapFault { code: String, message: String },

    #[error("EWS error {code}: {message}")]
    Response { code: String, message: String },

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Unsupported Exchange version: {0}")]
    UnsupportedVersion(String),

    #[error("Unsupported availability view: {0}")]
    UnsupportedView(String),

    #[error("Time window out of range: {0}")]
    InvalidWindow(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl EwsError {
    /// User-friendly error message for console display.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized => "Exchange rejected the credentials. Check exchange.username and exchange.password.".to_string(),
            Self::Forbidden => "The account lacks access to one of the mailboxes.".to_string(),
            Self::SoapFault { message, .. } => format!("Exchange reported a fault: {}", message),
            Self::Response { code, .. } if code == "ErrorNonExistentMailbox" => {
                "One of the configured mailboxes does not exist.".to_string()
            }
            Self::Response { code, .. } if code == "ErrorAccessDenied" => {
                "The account lacks access to one of the mailboxes.".to_string()
            }
            Self::Response { message, .. } => format!("Exchange error: {}", message),
            Self::Http { status, .. } => format!("Exchange answered with HTTP {}.", status),
            Self::UnsupportedVersion(v) => format!("Unknown Exchange version '{}'.", v),
            Self::UnsupportedView(v) => format!("Unknown availability view '{}'.", v),
            Self::InvalidWindow(_) => {
                "The configured day counts are too large. Check appointments.days and availability.days_ahead.".to_string()
            }
            Self::InvalidEndpoint(_) => "The Exchange server URL is invalid.".to_string(),
            Self::InvalidResponse(_) | Self::Xml(_) => {
                "Exchange sent a response that could not be read.".to_string()
            }
            Self::Network(_) => "Network error. Check the server URL and your connection.".to_string(),
        }
    }
}
