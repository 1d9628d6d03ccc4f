//! Request context types.
//!
//! The [`RequestContext`] carries metadata extracted from inbound headers
//! (trace id, identity fields, roles, organization and tenant) for the
//! lifetime of a single request.
//!
//! A context is an immutable value: binding a key produces a new context
//! and leaves the original untouched. Every [`ContextKey`] has exactly one
//! typed slot, and every accessor returns the key's documented default when
//! the slot was never bound, so reading a value whose enrichment stage did
//! not run is never an error.

use serde::Serialize;
use std::fmt;

/// The closed set of metadata keys a request context can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKey {
    /// Correlation id taken from `X-Request-Id` / `X-Trace-Id`.
    TraceId,
    /// Subject of the authenticated user.
    Sub,
    /// Full name of the user.
    Name,
    /// Nickname of the user.
    Nickname,
    /// Email address of the user.
    Email,
    /// Whether the email address was verified, as sent by the identity proxy.
    EmailVerified,
    /// Picture URL of the user.
    Picture,
    /// Ordered list of role names.
    Roles,
    /// Organization id.
    OrgId,
    /// Tenant id.
    TenantId,
    /// Human readable tenant name.
    TenantDisplayName,
}

impl ContextKey {
    /// Returns all keys in declaration order.
    #[must_use]
    pub const fn all() -> [ContextKey; 11] {
        [
            Self::TraceId,
            Self::Sub,
            Self::Name,
            Self::Nickname,
            Self::Email,
            Self::EmailVerified,
            Self::Picture,
            Self::Roles,
            Self::OrgId,
            Self::TenantId,
            Self::TenantDisplayName,
        ]
    }

    /// Returns the key name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TraceId => "trace_id",
            Self::Sub => "sub",
            Self::Name => "name",
            Self::Nickname => "nickname",
            Self::Email => "email",
            Self::EmailVerified => "email_verified",
            Self::Picture => "picture",
            Self::Roles => "roles",
            Self::OrgId => "org_id",
            Self::TenantId => "tenant_id",
            Self::TenantDisplayName => "tenant_display_name",
        }
    }

    /// Returns the primary inbound header this key is extracted from.
    ///
    /// Header names are lowercase; lookups through [`http::HeaderMap`] are
    /// case-insensitive.
    #[must_use]
    pub const fn header(self) -> &'static str {
        match self {
            Self::TraceId => "x-request-id",
            Self::Sub => "x-sub",
            Self::Name => "x-name",
            Self::Nickname => "x-nickname",
            Self::Email => "x-email",
            Self::EmailVerified => "x-email-verified",
            Self::Picture => "x-picture",
            Self::Roles => "x-roles",
            Self::OrgId => "x-org-id",
            Self::TenantId => "x-tenant-id",
            Self::TenantDisplayName => "x-tenant-display-name",
        }
    }

    /// Returns the documented default used when the key is absent.
    ///
    /// [`ContextKey::Roles`] defaults to the empty list, represented here as
    /// the empty string.
    #[must_use]
    pub const fn default_value(self) -> &'static str {
        match self {
            Self::TraceId => "unknown",
            Self::Sub => "no-x-sub-provided",
            Self::Name => "no-x-name-provided",
            Self::Nickname => "no-x-nickname-provided",
            Self::Email => "no-x-email-provided",
            Self::EmailVerified => "no-x-email-verified-provided",
            Self::Picture => "no-x-picture-provided",
            Self::Roles => "",
            Self::OrgId => "no-x-org-id",
            Self::TenantId => "no-x-tenant-id",
            Self::TenantDisplayName => "no-x-tenant-display-name",
        }
    }

    /// Returns true if the key holds a list of strings rather than a string.
    #[must_use]
    pub const fn is_list(self) -> bool {
        matches!(self, Self::Roles)
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Splits a comma-separated roles header into trimmed role names.
///
/// Empty segments are dropped, so an empty header yields an empty list.
///
/// # Example
///
/// ```
/// use toolbox_core::parse_roles;
///
/// assert_eq!(parse_roles(" admin, editor "), vec!["admin", "editor"]);
/// assert!(parse_roles("").is_empty());
/// ```
#[must_use]
pub fn parse_roles(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|role| !role.is_empty())
        .map(String::from)
        .collect()
}

/// Immutable per-request metadata overlay.
///
/// # Example
///
/// ```
/// use toolbox_core::{ContextKey, RequestContext};
///
/// let base = RequestContext::new();
/// let ctx = base.clone().with(ContextKey::Sub, "user-123");
///
/// assert_eq!(ctx.sub(), "user-123");
/// // The original overlay is unchanged.
/// assert_eq!(base.sub(), "no-x-sub-provided");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    trace_id: Option<String>,
    sub: Option<String>,
    name: Option<String>,
    nickname: Option<String>,
    email: Option<String>,
    email_verified: Option<String>,
    picture: Option<String>,
    roles: Option<Vec<String>>,
    org_id: Option<String>,
    tenant_id: Option<String>,
    tenant_display_name: Option<String>,
}

impl RequestContext {
    /// Creates an empty context where every key reads as its default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new context with `key` bound to `value`.
    ///
    /// Binding [`ContextKey::Roles`] parses `value` as a comma-separated list.
    #[must_use]
    pub fn with(mut self, key: ContextKey, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.text_slot_mut(key) {
            Some(slot) => *slot = Some(value),
            None => self.roles = Some(parse_roles(&value)),
        }
        self
    }

    /// Returns a new context with the roles list bound.
    #[must_use]
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = Some(roles.into_iter().map(Into::into).collect());
        self
    }

    /// Returns the bound value of a string key, or `None` when unbound.
    ///
    /// Always `None` for [`ContextKey::Roles`]; use [`RequestContext::roles`].
    #[must_use]
    pub fn get(&self, key: ContextKey) -> Option<&str> {
        self.text_slot(key).and_then(Option::as_deref)
    }

    /// Returns the value of a string key, falling back to its default.
    #[must_use]
    pub fn value(&self, key: ContextKey) -> &str {
        self.get(key).unwrap_or_else(|| key.default_value())
    }

    /// Returns true if `key` has been bound on this context.
    #[must_use]
    pub fn is_bound(&self, key: ContextKey) -> bool {
        match self.text_slot(key) {
            Some(slot) => slot.is_some(),
            None => self.roles.is_some(),
        }
    }

    /// Trace id, or `"unknown"`.
    #[must_use]
    pub fn trace_id(&self) -> &str {
        self.value(ContextKey::TraceId)
    }

    /// User subject, or `"no-x-sub-provided"`.
    #[must_use]
    pub fn sub(&self) -> &str {
        self.value(ContextKey::Sub)
    }

    /// User name, or `"no-x-name-provided"`.
    #[must_use]
    pub fn name(&self) -> &str {
        self.value(ContextKey::Name)
    }

    /// User nickname, or `"no-x-nickname-provided"`.
    #[must_use]
    pub fn nickname(&self) -> &str {
        self.value(ContextKey::Nickname)
    }

    /// User email, or `"no-x-email-provided"`.
    #[must_use]
    pub fn email(&self) -> &str {
        self.value(ContextKey::Email)
    }

    /// Email verification flag as sent upstream, or `"no-x-email-verified-provided"`.
    #[must_use]
    pub fn email_verified(&self) -> &str {
        self.value(ContextKey::EmailVerified)
    }

    /// Picture URL, or `"no-x-picture-provided"`.
    #[must_use]
    pub fn picture(&self) -> &str {
        self.value(ContextKey::Picture)
    }

    /// Roles in header order, or an empty slice.
    #[must_use]
    pub fn roles(&self) -> &[String] {
        self.roles.as_deref().unwrap_or(&[])
    }

    /// Organization id, or `"no-x-org-id"`.
    #[must_use]
    pub fn org_id(&self) -> &str {
        self.value(ContextKey::OrgId)
    }

    /// Tenant id, or `"no-x-tenant-id"`.
    #[must_use]
    pub fn tenant_id(&self) -> &str {
        self.value(ContextKey::TenantId)
    }

    /// Tenant display name, or `"no-x-tenant-display-name"`.
    #[must_use]
    pub fn tenant_display_name(&self) -> &str {
        self.value(ContextKey::TenantDisplayName)
    }

    fn text_slot(&self, key: ContextKey) -> Option<&Option<String>> {
        match key {
            ContextKey::TraceId => Some(&self.trace_id),
            ContextKey::Sub => Some(&self.sub),
            ContextKey::Name => Some(&self.name),
            ContextKey::Nickname => Some(&self.nickname),
            ContextKey::Email => Some(&self.email),
            ContextKey::EmailVerified => Some(&self.email_verified),
            ContextKey::Picture => Some(&self.picture),
            ContextKey::Roles => None,
            ContextKey::OrgId => Some(&self.org_id),
            ContextKey::TenantId => Some(&self.tenant_id),
            ContextKey::TenantDisplayName => Some(&self.tenant_display_name),
        }
    }

    fn text_slot_mut(&mut self, key: ContextKey) -> Option<&mut Option<String>> {
        match key {
            ContextKey::TraceId => Some(&mut self.trace_id),
            ContextKey::Sub => Some(&mut self.sub),
            ContextKey::Name => Some(&mut self.name),
            ContextKey::Nickname => Some(&mut self.nickname),
            ContextKey::Email => Some(&mut self.email),
            ContextKey::EmailVerified => Some(&mut self.email_verified),
            ContextKey::Picture => Some(&mut self.picture),
            ContextKey::Roles => None,
            ContextKey::OrgId => Some(&mut self.org_id),
            ContextKey::TenantId => Some(&mut self.tenant_id),
            ContextKey::TenantDisplayName => Some(&mut self.tenant_display_name),
        }
    }
}
