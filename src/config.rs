//! Environment configuration and startup URL resolution.
//!
//! The resource identity and authorization-server URLs are pure functions of
//! the environment, computed exactly once by [`resolve`] before the server
//! starts. Request handlers only ever see the immutable [`ResolvedConfig`].

use std::env;

/// Base substituted when the configured platform URL points at a
/// local-development deployment.
pub const LOCAL_BASE_URL: &str = "http://localhost:54321";

/// Path prefix under which the platform exposes deployed functions.
pub const FUNCTIONS_PATH: &str = "functions/v1";

/// Path suffix of the platform's identity service.
pub const AUTH_PATH: &str = "auth/v1";

/// Raw environment-sourced settings, prior to resolution.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Platform base URL (e.g. `https://proj.example.co`).
    pub platform_url: Option<String>,
    /// Anonymous/public API key for the identity service.
    pub anon_key: Option<String>,
    /// Explicit public URL override for the resource identity.
    pub public_url: Option<String>,
    /// Explicit override for the advertised authorization server.
    pub auth_server: Option<String>,
    /// Explicit override for the challenge authorization server.
    pub challenge_auth_server: Option<String>,
    /// Service slug appended to the functions path.
    pub service_name: String,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self {
            platform_url: env_opt("PLATFORM_URL"),
            anon_key: env_opt("PLATFORM_ANON_KEY"),
            public_url: env_opt("MCP_PUBLIC_URL"),
            auth_server: env_opt("MCP_AUTH_SERVER"),
            challenge_auth_server: env_opt("MCP_CHALLENGE_AUTH_SERVER"),
            service_name: env_opt("MCP_SERVICE_NAME").unwrap_or_else(|| "mcp-server".to_string()),
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

/// Startup configuration errors. These are fatal: the process must not
/// begin serving with an unresolved configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no base URL configured: set PLATFORM_URL or MCP_PUBLIC_URL")]
    MissingBaseUrl,

    #[error("no identity service API key configured: set PLATFORM_ANON_KEY")]
    MissingApiKey,
}

/// Immutable per-process configuration, shared read-only across requests.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Canonical URL identifying this protected resource.
    pub resource: String,
    /// Authorization server advertised by the well-known discovery document.
    pub authorization_server: String,
    /// Authorization server returned by the metadata document that 401
    /// challenges point at. Configurable independently of the advertised
    /// value so an operator can observe which discovery path a client
    /// actually follows; deployments are free to set both equal.
    pub challenge_authorization_server: String,
    /// Anonymous API key passed to the identity service on introspection.
    pub anon_key: String,
    /// Service slug, also reported by the health endpoint.
    pub service_name: String,
}

/// Resolve settings into the immutable per-process configuration.
///
/// Resolution policy, in priority order:
/// 1. an explicit public URL override is used verbatim as the resource
///    identity;
/// 2. a platform URL whose host is a local-development marker (loopback or
///    the internal service-mesh hostname) is replaced by [`LOCAL_BASE_URL`];
/// 3. otherwise the platform URL is used unmodified.
///
/// The authorization servers default to `<resolved base>/auth/v1` unless
/// explicitly overridden (advertised and challenge variants independently).
///
/// # Errors
///
/// Fails when neither a platform URL nor a public URL override is
/// configured, or when the identity service API key is absent.
pub fn resolve(settings: &Settings) -> Result<ResolvedConfig, ConfigError> {
    let base = match settings.platform_url.as_deref() {
        Some(url) if is_local_base(url) => LOCAL_BASE_URL.to_string(),
        Some(url) => url.trim_end_matches('/').to_string(),
        None => match settings.public_url.as_deref() {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => return Err(ConfigError::MissingBaseUrl),
        },
    };

    let resource = match settings.public_url.as_deref() {
        Some(url) => url.to_string(),
        None => format!("{}/{}/{}", base, FUNCTIONS_PATH, settings.service_name),
    };

    let default_auth_server = format!("{}/{}", base, AUTH_PATH);
    let authorization_server = settings
        .auth_server
        .clone()
        .unwrap_or_else(|| default_auth_server.clone());
    let challenge_authorization_server = settings
        .challenge_auth_server
        .clone()
        .unwrap_or(default_auth_server);

    let anon_key = settings
        .anon_key
        .clone()
        .ok_or(ConfigError::MissingApiKey)?;

    let config = ResolvedConfig {
        resource,
        authorization_server,
        challenge_authorization_server,
        anon_key,
        service_name: settings.service_name.clone(),
    };
    tracing::info!(
        resource = %config.resource,
        authorization_server = %config.authorization_server,
        "resolved resource configuration"
    );
    Ok(config)
}

/// Whether the URL's host marks a local-development deployment: loopback,
/// or the internal service-mesh hostname seen from inside the local stack.
fn is_local_base(url: &str) -> bool {
    let host = host_of(url);
    matches!(host, "localhost" | "127.0.0.1" | "kong")
}

/// Host portion of a URL string, without scheme, port, or path.
fn host_of(url: &str) -> &str {
    let rest = match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => url,
    };
    let end = rest.find(['/', ':', '?']).unwrap_or(rest.len());
    &rest[..end]
}
