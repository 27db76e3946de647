//! Authentication error types and WWW-Authenticate header construction.
//!
//! Implements the challenge responses of RFC 6750 Section 3, including the
//! `resource_metadata` parameter from RFC 9728 so rejected clients can
//! discover the authorization server protecting this resource.

use std::fmt;

/// An authentication failure at the bearer gate.
///
/// Every variant maps to HTTP 401 with a structured JSON body and a
/// `WWW-Authenticate` challenge header.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// No `Authorization` header was present on the request.
    /// Reported as `error="unauthorized"`; per RFC 6750 Section 3 the
    /// challenge header carries no error fields for this case.
    MissingCredentials,

    /// The `Authorization` header was present but not well-formed bearer
    /// framing (wrong scheme, or no token after the scheme).
    /// Reported as `error="invalid_request"`.
    MalformedHeader,

    /// The credential was well-formed but the identity service rejected it
    /// (expired, revoked, unknown) or introspection itself failed.
    /// Reported as `error="invalid_token"`.
    InvalidToken {
        /// The identity service's reported reason, or a default message.
        description: String,
    },
}

impl AuthError {
    /// The OAuth error code for the JSON body and challenge header.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "unauthorized",
            AuthError::MalformedHeader => "invalid_request",
            AuthError::InvalidToken { .. } => "invalid_token",
        }
    }

    /// Human-readable description for the JSON body.
    pub fn error_description(&self) -> &str {
        match self {
            AuthError::MissingCredentials => "Missing authorization header",
            AuthError::MalformedHeader => "Invalid authorization header format",
            AuthError::InvalidToken { description } => description,
        }
    }

    /// The structured error body returned alongside the challenge.
    pub fn body(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.error_code(),
            "error_description": self.error_description(),
        })
    }

    /// Builds the `WWW-Authenticate` header value.
    ///
    /// The `resource_metadata` parameter always points at the challenge
    /// metadata document (RFC 9728 Section 5.1). A request lacking any
    /// credential gets no error fields beyond it (RFC 6750 Section 3).
    pub fn www_authenticate(&self, resource_metadata_url: &str) -> String {
        let mut parts = vec![format!("resource_metadata=\"{}\"", resource_metadata_url)];

        match self {
            AuthError::MissingCredentials => {}
            AuthError::MalformedHeader | AuthError::InvalidToken { .. } => {
                parts.push(format!("error=\"{}\"", self.error_code()));
                parts.push(format!(
                    "error_description=\"{}\"",
                    self.error_description().replace('"', "'")
                ));
            }
        }

        format!("Bearer {}", parts.join(", "))
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.error_description())
    }
}

impl std::error::Error for AuthError {}

#[cfg(test)]
mod tests {
    use super::*;

    const METADATA_URL: &str =
        "https://mcp.example.com/.well-known/oauth-protected-resource";

    #[test]
    fn missing_credentials_has_no_error_fields() {
        let err = AuthError::MissingCredentials;
        let header = err.www_authenticate(METADATA_URL);
        assert_eq!(
            header,
            format!("Bearer resource_metadata=\"{}\"", METADATA_URL)
        );
        assert!(!header.contains("error="));
    }

    #[test]
    fn malformed_header_reports_invalid_request() {
        let err = AuthError::MalformedHeader;
        assert_eq!(err.error_code(), "invalid_request");
        let header = err.www_authenticate(METADATA_URL);
        assert!(header.starts_with("Bearer "));
        assert!(header.contains("resource_metadata="));
        assert!(header.contains("error=\"invalid_request\""));
        assert!(header.contains("error_description=\"Invalid authorization header format\""));
    }

    #[test]
    fn invalid_token_echoes_description() {
        let err = AuthError::InvalidToken {
            description: "token has expired".to_string(),
        };
        assert_eq!(err.error_code(), "invalid_token");
        let header = err.www_authenticate(METADATA_URL);
        assert!(header.contains("error=\"invalid_token\""));
        assert!(header.contains("error_description=\"token has expired\""));
    }

    #[test]
    fn quotes_in_descriptions_are_neutralized() {
        let err = AuthError::InvalidToken {
            description: "bad \"token\"".to_string(),
        };
        let header = err.www_authenticate(METADATA_URL);
        assert!(header.contains("error_description=\"bad 'token'\""));
    }

    #[test]
    fn body_matches_taxonomy() {
        let body = AuthError::MissingCredentials.body();
        assert_eq!(body["error"], "unauthorized");
        assert_eq!(body["error_description"], "Missing authorization header");

        let body = AuthError::MalformedHeader.body();
        assert_eq!(body["error"], "invalid_request");

        let body = AuthError::InvalidToken {
            description: "revoked".into(),
        }
        .body();
        assert_eq!(body["error"], "invalid_token");
        assert_eq!(body["error_description"], "revoked");
    }
}
