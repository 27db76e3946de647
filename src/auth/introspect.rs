//! Token introspection against an external identity service.
//!
//! The gate never inspects credentials itself: the [`Introspect`] trait
//! models verification as an external capability, and any backend (remote
//! account lookup, session store, local key verification) can satisfy it.
//! [`IdentityClient`] is the remote adapter; [`StaticIntrospector`] is an
//! in-memory adapter for demos and tests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The identity service's account record for a verified credential.
///
/// Deserialized verbatim from the identity service and attached to request
/// extensions unmodified; fields beyond the common ones land in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedPrincipal {
    /// Account identifier.
    pub id: String,

    /// Primary email address, when the identity service reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// All remaining fields of the account record.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Why introspection did not produce a principal.
#[derive(Debug, thiserror::Error)]
pub enum IntrospectError {
    /// The identity service answered and rejected the credential.
    #[error("token rejected: {reason}")]
    Rejected {
        /// The service's reported reason.
        reason: String,
    },

    /// The round trip to the identity service failed. Treated the same as a
    /// rejection by the gate (fail closed).
    #[error("identity service request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl IntrospectError {
    /// Description suitable for the `invalid_token` challenge: the identity
    /// service's reason when it gave one, else a default message.
    pub fn description(&self) -> String {
        match self {
            IntrospectError::Rejected { reason } => reason.clone(),
            IntrospectError::Transport(_) => "Token validation failed".to_string(),
        }
    }
}

/// Trait for delegating bearer credential verification.
///
/// # Example
///
/// ```rust
/// use mcp_gatekeeper::auth::{Introspect, IntrospectError, VerifiedPrincipal};
///
/// #[derive(Clone)]
/// struct AllowAll;
///
/// impl Introspect for AllowAll {
///     async fn introspect(&self, token: &str) -> Result<VerifiedPrincipal, IntrospectError> {
///         Ok(VerifiedPrincipal {
///             id: token.to_string(),
///             email: None,
///             extra: Default::default(),
///         })
///     }
/// }
/// ```
pub trait Introspect: Clone + Send + Sync + 'static {
    /// Verify an opaque bearer credential.
    ///
    /// Returns the identity service's account record on success, or the
    /// failure reason. Called exactly once per gated request; results are
    /// never cached.
    fn introspect(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<VerifiedPrincipal, IntrospectError>> + Send;
}

/// Error payload shapes identity services commonly return on rejection.
#[derive(Debug, Deserialize)]
struct RejectionBody {
    #[serde(default, alias = "msg", alias = "message", alias = "error_description")]
    reason: Option<String>,
}

/// Remote introspection adapter: asks the identity service who a bearer
/// token belongs to by fetching its account endpoint.
///
/// The request carries the token in the `Authorization` header and the
/// service's anonymous API key in the `apikey` header. Any non-success
/// status or transport failure folds into [`IntrospectError`].
#[derive(Clone)]
pub struct IdentityClient {
    http: reqwest::Client,
    user_endpoint: String,
    api_key: String,
}

impl IdentityClient {
    /// Create a client for the given authorization server base URL
    /// (the account endpoint is `<base>/user`).
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(
        authorization_server: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        let base = authorization_server.into();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            user_endpoint: format!("{}/user", base.trim_end_matches('/')),
            api_key: api_key.into(),
        })
    }

    /// The account endpoint this client queries.
    pub fn user_endpoint(&self) -> &str {
        &self.user_endpoint
    }
}

impl Introspect for IdentityClient {
    async fn introspect(&self, token: &str) -> Result<VerifiedPrincipal, IntrospectError> {
        let response = self
            .http
            .get(&self.user_endpoint)
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {}", token))
            .header("apikey", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let principal = response.json::<VerifiedPrincipal>().await?;
            return Ok(principal);
        }

        let reason = response
            .json::<RejectionBody>()
            .await
            .ok()
            .and_then(|body| body.reason)
            .unwrap_or_else(|| format!("identity service returned {}", status));

        tracing::debug!(%status, %reason, "identity service rejected token");
        Err(IntrospectError::Rejected { reason })
    }
}

/// In-memory introspection backend mapping tokens to principals.
///
/// For production, use [`IdentityClient`] or implement [`Introspect`]
/// against your identity backend.
#[derive(Debug, Clone, Default)]
pub struct StaticIntrospector {
    principals: Arc<HashMap<String, VerifiedPrincipal>>,
}

impl StaticIntrospector {
    /// Create an introspector from `(token, principal)` pairs.
    pub fn new(pairs: impl IntoIterator<Item = (String, VerifiedPrincipal)>) -> Self {
        Self {
            principals: Arc::new(pairs.into_iter().collect()),
        }
    }
}

impl Introspect for StaticIntrospector {
    async fn introspect(&self, token: &str) -> Result<VerifiedPrincipal, IntrospectError> {
        self.principals
            .get(token)
            .cloned()
            .ok_or_else(|| IntrospectError::Rejected {
                reason: "The provided bearer token is not valid".to_string(),
            })
    }
}
