//! Bearer auth gate for the protected MCP endpoint.
//!
//! This crate's server acts as an OAuth 2.1 **resource server**: it never
//! issues or inspects credentials itself. Every request to a protected route
//! passes through the [`BearerAuthLayer`] middleware, which extracts the
//! bearer credential, submits it to an [`Introspect`] backend (normally the
//! [`IdentityClient`] adapter for the external identity service), and either
//! admits the request with a [`VerifiedPrincipal`] attached or rejects it
//! with a structured challenge.
//!
//! # Rejection taxonomy
//!
//! - `unauthorized` — the `Authorization` header is entirely absent
//! - `invalid_request` — the header is present but not `Bearer <token>`
//! - `invalid_token` — the identity service rejected the credential, or the
//!   introspection round trip failed (fail closed)
//!
//! All three are HTTP 401 with a JSON `{error, error_description}` body and
//! a `WWW-Authenticate: Bearer resource_metadata="..."` challenge pointing
//! back at the resource metadata document.

pub mod error;
pub mod introspect;
pub mod middleware;

// Re-exports
pub use error::AuthError;
pub use introspect::{IdentityClient, Introspect, IntrospectError, StaticIntrospector, VerifiedPrincipal};
pub use middleware::{BearerAuthLayer, BearerAuthService};
