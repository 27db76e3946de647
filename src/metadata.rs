//! Protected Resource Metadata (RFC 9728 Section 3).
//!
//! The metadata document served at `/.well-known/oauth-protected-resource`
//! tells OAuth clients which authorization server protects this resource.

use serde::{Deserialize, Serialize};

/// Identity-claim scopes this resource accepts by default.
pub const DEFAULT_SCOPES: [&str; 3] = ["openid", "profile", "email"];

/// Protected Resource Metadata per RFC 9728 Section 3.
///
/// Serving is side-effect free and never fails at request time: the
/// document is fully determined by startup configuration.
///
/// # Example
///
/// ```rust
/// use mcp_gatekeeper::metadata::ResourceMetadata;
///
/// let metadata = ResourceMetadata::new("https://proj.example.co/functions/v1/calculator")
///     .authorization_server("https://proj.example.co/auth/v1");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceMetadata {
    /// The resource server's identifier URL -- the URL a client uses to
    /// reach this resource.
    pub resource: String,

    /// Authorization server issuer URLs that can issue tokens for this
    /// resource. This server always advertises exactly one.
    #[serde(default)]
    pub authorization_servers: Vec<String>,

    /// OAuth scopes supported by this resource server.
    #[serde(default)]
    pub scopes_supported: Vec<String>,
}

impl ResourceMetadata {
    /// Create metadata for the given resource identifier with the default
    /// identity-claim scopes.
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            authorization_servers: Vec::new(),
            scopes_supported: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Add an authorization server issuer URL.
    pub fn authorization_server(mut self, issuer_url: impl Into<String>) -> Self {
        self.authorization_servers.push(issuer_url.into());
        self
    }

    /// Replace the supported scopes.
    pub fn scopes(mut self, scopes: impl IntoIterator<Item = String>) -> Self {
        self.scopes_supported = scopes.into_iter().collect();
        self
    }

    /// The well-known path for this metadata document.
    ///
    /// Per RFC 9728, served at `/.well-known/oauth-protected-resource`
    /// relative to the resource URL.
    pub fn well_known_path() -> &'static str {
        "/.well-known/oauth-protected-resource"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let metadata = ResourceMetadata::new("https://proj.example.co/functions/v1/calculator")
            .authorization_server("https://proj.example.co/auth/v1");

        assert_eq!(
            metadata.resource,
            "https://proj.example.co/functions/v1/calculator"
        );
        assert_eq!(
            metadata.authorization_servers,
            vec!["https://proj.example.co/auth/v1"]
        );
        assert_eq!(metadata.scopes_supported, vec!["openid", "profile", "email"]);
    }

    #[test]
    fn serialization_carries_all_three_fields() {
        let metadata = ResourceMetadata::new("https://mcp.example.com")
            .authorization_server("https://auth.example.com");

        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["resource"], "https://mcp.example.com");
        assert_eq!(json["authorization_servers"][0], "https://auth.example.com");
        assert_eq!(json["scopes_supported"][0], "openid");
    }

    #[test]
    fn deserialization() {
        let json = serde_json::json!({
            "resource": "https://mcp.example.com",
            "authorization_servers": ["https://auth.example.com"],
            "scopes_supported": ["openid"]
        });

        let metadata: ResourceMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(metadata.authorization_servers.len(), 1);
        assert_eq!(metadata.scopes_supported, vec!["openid"]);
    }

    #[test]
    fn scopes_can_be_replaced() {
        let metadata = ResourceMetadata::new("https://mcp.example.com")
            .scopes(["mcp:read".to_string(), "mcp:write".to_string()]);
        assert_eq!(metadata.scopes_supported, vec!["mcp:read", "mcp:write"]);
    }

    #[test]
    fn well_known_path() {
        assert_eq!(
            ResourceMetadata::well_known_path(),
            "/.well-known/oauth-protected-resource"
        );
    }
}
