//! Per-request policy evaluation.
//!
//! [`PolicyEvaluator::evaluate`] runs an ordered list of checks against a
//! client record and stops at the first failure. Every outcome is a
//! [`Decision`] value; denials carry a specific [`DenialReason`] for internal
//! use, while [`Decision::error_response`] reduces it to a generic OAuth error
//! for the caller.

use crate::registry::clients::{ClientRecord, ClientRegistry};
use crate::registry::scopes::ScopeCatalog;
use crate::registry::secrets;
use crate::registry::types::{GrantType, OAuthErrorResponse, OFFLINE_ACCESS, ScopeKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Everything the evaluator needs to know about one token or authorization request
#[derive(Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub client_id: String,
    pub presented_secret: Option<String>,
    pub grant_type: GrantType,
    /// Empty means the client's default scopes
    pub requested_scopes: BTreeSet<String>,
    pub redirect_uri: Option<String>,
    pub origin: Option<String>,
    /// The request carried a PKCE code challenge
    pub pkce_asserted: bool,
    /// Instant used to decide whether a stored secret has expired
    pub requested_at: DateTime<Utc>,
}

impl RequestDescriptor {
    pub fn new(client_id: &str, grant_type: GrantType) -> Self {
        Self {
            client_id: client_id.to_string(),
            presented_secret: None,
            grant_type,
            requested_scopes: BTreeSet::new(),
            redirect_uri: None,
            origin: None,
            pkce_asserted: false,
            requested_at: Utc::now(),
        }
    }

    pub fn with_secret(mut self, secret: &str) -> Self {
        self.presented_secret = Some(secret.to_string());
        self
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requested_scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_redirect_uri(mut self, redirect_uri: &str) -> Self {
        self.redirect_uri = Some(redirect_uri.to_string());
        self
    }

    pub fn with_origin(mut self, origin: &str) -> Self {
        self.origin = Some(origin.to_string());
        self
    }

    pub fn with_pkce(mut self, asserted: bool) -> Self {
        self.pkce_asserted = asserted;
        self
    }

    pub fn at(mut self, requested_at: DateTime<Utc>) -> Self {
        self.requested_at = requested_at;
        self
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("client_id", &self.client_id)
            .field(
                "presented_secret",
                &self.presented_secret.as_ref().map(|_| "[redacted]"),
            )
            .field("grant_type", &self.grant_type)
            .field("requested_scopes", &self.requested_scopes)
            .field("redirect_uri", &self.redirect_uri)
            .field("origin", &self.origin)
            .field("pkce_asserted", &self.pkce_asserted)
            .field("requested_at", &self.requested_at)
            .finish()
    }
}

/// Why a request was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    UnknownClient,
    InvalidSecret,
    GrantTypeNotAllowed,
    PkceRequired,
    RedirectUriNotAllowed,
    OriginNotAllowed,
    ScopeNotAllowed,
    PostLogoutRedirectUriNotAllowed,
}

impl DenialReason {
    /// OAuth error code shown to the caller; unknown clients and bad secrets
    /// share `invalid_client`.
    pub fn error_code(&self) -> &'static str {
        match self {
            DenialReason::UnknownClient | DenialReason::InvalidSecret => "invalid_client",
            DenialReason::GrantTypeNotAllowed => "unauthorized_client",
            DenialReason::PkceRequired
            | DenialReason::RedirectUriNotAllowed
            | DenialReason::OriginNotAllowed
            | DenialReason::PostLogoutRedirectUriNotAllowed => "invalid_request",
            DenialReason::ScopeNotAllowed => "invalid_scope",
        }
    }

    fn generic_description(&self) -> &'static str {
        match self.error_code() {
            "invalid_client" => "Client authentication failed",
            "unauthorized_client" => "Client is not authorized to use this grant type",
            "invalid_scope" => "Requested scope is not allowed",
            _ => "Request is not allowed for this client",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DenialReason::UnknownClient => "unknown_client",
            DenialReason::InvalidSecret => "invalid_secret",
            DenialReason::GrantTypeNotAllowed => "grant_type_not_allowed",
            DenialReason::PkceRequired => "pkce_required",
            DenialReason::RedirectUriNotAllowed => "redirect_uri_not_allowed",
            DenialReason::OriginNotAllowed => "origin_not_allowed",
            DenialReason::ScopeNotAllowed => "scope_not_allowed",
            DenialReason::PostLogoutRedirectUriNotAllowed => {
                "post_logout_redirect_uri_not_allowed"
            }
        };
        f.write_str(name)
    }
}

/// Outcome of evaluating a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Allowed {
        effective_scopes: BTreeSet<String>,
        requires_consent: bool,
    },
    Denied {
        reason: DenialReason,
    },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }

    pub fn denial_reason(&self) -> Option<DenialReason> {
        match self {
            Decision::Denied { reason } => Some(*reason),
            Decision::Allowed { .. } => None,
        }
    }

    /// Generic error body for denials, never naming the specific failed check
    pub fn error_response(&self) -> Option<OAuthErrorResponse> {
        self.denial_reason().map(|reason| OAuthErrorResponse {
            error: reason.error_code().to_string(),
            error_description: Some(reason.generic_description().to_string()),
        })
    }
}

/// Decides requests against an immutable client registry and scope catalog
#[derive(Clone, Copy)]
pub struct PolicyEvaluator<'a> {
    clients: &'a ClientRegistry,
    scopes: &'a ScopeCatalog,
}

impl<'a> PolicyEvaluator<'a> {
    pub(crate) fn new(clients: &'a ClientRegistry, scopes: &'a ScopeCatalog) -> Self {
        Self { clients, scopes }
    }

    pub fn evaluate(&self, request: &RequestDescriptor) -> Decision {
        let decision = match self.clients.lookup(&request.client_id) {
            Ok(client) => match self.check(client, request) {
                Ok(effective_scopes) => Decision::Allowed {
                    effective_scopes,
                    requires_consent: client.require_consent && request.grant_type.has_end_user(),
                },
                Err(reason) => Decision::Denied { reason },
            },
            Err(_) => Decision::Denied {
                reason: DenialReason::UnknownClient,
            },
        };

        if let Decision::Denied { reason } = &decision {
            tracing::debug!(
                client_id = %request.client_id,
                grant_type = %request.grant_type,
                %reason,
                "request denied"
            );
        }

        decision
    }

    fn check(
        &self,
        client: &ClientRecord,
        request: &RequestDescriptor,
    ) -> Result<BTreeSet<String>, DenialReason> {
        // Public PKCE clients have require_client_secret unset, so they skip this.
        if client.require_client_secret {
            let presented = request.presented_secret.as_deref().unwrap_or_default();
            if !secrets::verify_at(presented, &client.secret_digests, request.requested_at) {
                return Err(DenialReason::InvalidSecret);
            }
        }

        if !client.allows_grant(request.grant_type) {
            return Err(DenialReason::GrantTypeNotAllowed);
        }

        if client.require_pkce && !request.pkce_asserted {
            return Err(DenialReason::PkceRequired);
        }

        if request.grant_type.is_interactive() {
            let registered = request
                .redirect_uri
                .as_ref()
                .is_some_and(|uri| client.redirect_uris.contains(uri));
            if !registered {
                return Err(DenialReason::RedirectUriNotAllowed);
            }
        }

        if let Some(origin) = &request.origin {
            if !client.allowed_cors_origins.contains(origin) {
                return Err(DenialReason::OriginNotAllowed);
            }
        }

        self.effective_scopes(client, request)
    }

    fn effective_scopes(
        &self,
        client: &ClientRecord,
        request: &RequestDescriptor,
    ) -> Result<BTreeSet<String>, DenialReason> {
        let has_end_user = request.grant_type.has_end_user();

        if request.requested_scopes.is_empty() {
            let defaults: BTreeSet<String> = client
                .allowed_scopes
                .iter()
                .filter(|scope| {
                    if scope.as_str() == OFFLINE_ACCESS {
                        client.allow_offline_access && has_end_user
                    } else {
                        has_end_user || self.scopes.kind_of(scope) == Some(ScopeKind::Api)
                    }
                })
                .cloned()
                .collect();
            // A grant with no scopes is not a grant.
            if defaults.is_empty() {
                tracing::debug!(client_id = %client.id, "no default scopes for grant");
                return Err(DenialReason::ScopeNotAllowed);
            }
            return Ok(defaults);
        }

        for scope in &request.requested_scopes {
            let permitted = if scope == OFFLINE_ACCESS {
                client.allow_offline_access && has_end_user
            } else {
                client.allowed_scopes.contains(scope)
                    && match self.scopes.kind_of(scope) {
                        Some(ScopeKind::Api) => true,
                        Some(ScopeKind::Identity) => has_end_user,
                        None => false,
                    }
            };
            if !permitted {
                tracing::debug!(client_id = %client.id, %scope, "scope not permitted");
                return Err(DenialReason::ScopeNotAllowed);
            }
        }

        Ok(request.requested_scopes.clone())
    }

    /// Validate an end-session redirect against the client's post-logout URIs
    pub fn check_post_logout_redirect(
        &self,
        client_id: &str,
        post_logout_redirect_uri: &str,
    ) -> Result<(), DenialReason> {
        let client = self
            .clients
            .lookup(client_id)
            .map_err(|_| DenialReason::UnknownClient)?;
        if client
            .post_logout_redirect_uris
            .contains(post_logout_redirect_uri)
        {
            Ok(())
        } else {
            Err(DenialReason::PostLogoutRedirectUriNotAllowed)
        }
    }
}
