//! Structured API errors
//!
//! Every failure of a backend call ends up as an [`ApiError`]. The variant
//! decides whether the request pipeline retries it.

use library_config::Locale;
use serde_json::{json, Value};
use thiserror::Error;

/// Errors returned by the library API client
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The backend answered with a non-2xx status
    #[error("{}", http_message(.status_text, .details))]
    Http {
        status: u16,
        status_text: String,
        /// Parsed JSON error body, or `{"message": status_text}`
        details: Value,
    },

    /// The request never produced a response (connection, DNS, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// A newer identical request or an explicit cancel aborted this one
    #[error("Request cancelled")]
    Cancelled,

    /// The response body was not the JSON we expected
    #[error("Invalid response body: {0}")]
    Decode(String),
}

fn http_message<'a>(status_text: &'a str, details: &'a Value) -> &'a str {
    details
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or(status_text)
}

impl ApiError {
    /// Build an HTTP error from a status line and raw body
    pub fn from_response(status: u16, status_text: &str, body: &str) -> Self {
        let details = serde_json::from_str::<Value>(body)
            .ok()
            .filter(Value::is_object)
            .unwrap_or_else(|| json!({ "message": status_text }));

        ApiError::Http {
            status,
            status_text: status_text.to_string(),
            details,
        }
    }

    /// HTTP status, `0` when no response was received
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Http { status, .. } => *status,
            _ => 0,
        }
    }

    /// Connection failures and server-side (5xx) errors
    pub fn is_network_error(&self) -> bool {
        match self {
            ApiError::Http { status, .. } => *status >= 500 || *status == 0,
            ApiError::Network(_) => true,
            ApiError::Cancelled | ApiError::Decode(_) => false,
        }
    }

    /// 4xx errors
    pub fn is_client_error(&self) -> bool {
        matches!(self, ApiError::Http { status, .. } if (400..500).contains(status))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }

    /// Only transient failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        self.is_network_error()
    }

    /// The `message` field of the error body, if the backend sent one
    pub fn detail_message(&self) -> Option<&str> {
        match self {
            ApiError::Http { details, .. } => details.get("message").and_then(Value::as_str),
            _ => None,
        }
    }

    /// Message suitable for showing to the user
    pub fn user_message(&self, locale: Locale) -> String {
        let canned = match (locale, self.status()) {
            _ if self.is_network_error() => Some(match locale {
                Locale::It => "Errore di connessione. Riprova più tardi.",
                Locale::En => "Connection error. Please try again later.",
            }),
            (Locale::It, 404) => Some("Risorsa non trovata."),
            (Locale::En, 404) => Some("Resource not found."),
            (Locale::It, 403) => Some("Accesso negato."),
            (Locale::En, 403) => Some("Access denied."),
            (Locale::It, 401) => Some("Autenticazione richiesta."),
            (Locale::En, 401) => Some("Authentication required."),
            _ => None,
        };

        if let Some(message) = canned {
            return message.to_string();
        }

        if let Some(message) = self.detail_message() {
            return message.to_string();
        }

        let text = self.to_string();
        if text.is_empty() {
            match locale {
                Locale::It => "Errore sconosciuto.".to_string(),
                Locale::En => "Unknown error.".to_string(),
            }
        } else {
            text
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_response_parses_json_body() {
        let err = ApiError::from_response(422, "Unprocessable Entity", r#"{"message":"ISBN non valido"}"#);
        assert_eq!(err.status(), 422);
        assert_eq!(err.to_string(), "ISBN non valido");
        assert!(err.is_client_error());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_from_response_falls_back_to_status_text() {
        let err = ApiError::from_response(502, "Bad Gateway", "<html>oops</html>");
        assert_eq!(err.to_string(), "Bad Gateway");
        assert_eq!(err.detail_message(), Some("Bad Gateway"));
        assert!(err.is_network_error());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_classification() {
        assert!(ApiError::Network("refused".into()).is_network_error());
        assert!(!ApiError::Cancelled.is_retryable());
        assert!(ApiError::Cancelled.is_cancelled());
        assert!(!ApiError::Decode("eof".into()).is_retryable());
        assert!(!ApiError::from_response(404, "Not Found", "").is_network_error());
    }

    #[test]
    fn test_user_messages() {
        let not_found = ApiError::from_response(404, "Not Found", "{}");
        assert_eq!(not_found.user_message(Locale::It), "Risorsa non trovata.");
        assert_eq!(not_found.user_message(Locale::En), "Resource not found.");

        let forbidden = ApiError::from_response(403, "Forbidden", "{}");
        assert_eq!(forbidden.user_message(Locale::It), "Accesso negato.");

        let unauthorized = ApiError::from_response(401, "Unauthorized", "{}");
        assert_eq!(unauthorized.user_message(Locale::It), "Autenticazione richiesta.");

        let server = ApiError::from_response(500, "Internal Server Error", "{}");
        assert_eq!(
            server.user_message(Locale::It),
            "Errore di connessione. Riprova più tardi."
        );

        let conflict =
            ApiError::from_response(409, "Conflict", r#"{"message":"Libro già in prestito"}"#);
        assert_eq!(conflict.user_message(Locale::En), "Libro già in prestito");

        let bare = ApiError::from_response(400, "Bad Request", "{}");
        assert_eq!(bare.user_message(Locale::En), "Bad Request");
    }
}
