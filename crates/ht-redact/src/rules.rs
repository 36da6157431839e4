//! Classification rules.
//!
//! Three families, evaluated in precedence order (the order picks which
//! diagnostic is reported; the redact/keep outcome is their OR):
//!
//! 1. A closed set of header names that are sensitive regardless of value.
//! 2. Value-shape heuristics for values of at least [`MIN_SHAPE_LEN`]
//!    characters (JWT, bearer token, UUID, hex token, long base64,
//!    oversized value).
//! 3. A keyword fallback matching secret-suggesting substrings in the name.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Which rule decided that a header must be redacted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Name is in the unconditionally sensitive set.
    SensitiveName,
    /// Value length at or beyond the unconditional redaction bound.
    OversizedValue,
    /// Three URL-safe base64 segments joined by dots.
    JwtShape,
    /// `Bearer` prefix followed by a long token.
    BearerToken,
    /// 8-4-4-4-12 hex groups.
    UuidShape,
    /// Pure hex string of 32-64 characters.
    HexToken,
    /// Long string restricted to the base64 alphabet.
    Base64Shape,
    /// Name contains a secret-suggesting keyword.
    SecretNameKeyword,
}

impl RuleKind {
    /// Short identifier for diagnostics and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::SensitiveName => "sensitive_name",
            RuleKind::OversizedValue => "oversized_value",
            RuleKind::JwtShape => "jwt_shape",
            RuleKind::BearerToken => "bearer_token",
            RuleKind::UuidShape => "uuid_shape",
            RuleKind::HexToken => "hex_token",
            RuleKind::Base64Shape => "base64_shape",
            RuleKind::SecretNameKeyword => "secret_name_keyword",
        }
    }
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values shorter than this never trigger value-shape rules.
pub const MIN_SHAPE_LEN: usize = 20;

/// Default bound at which a value is redacted regardless of shape.
pub const DEFAULT_OVERSIZE_LIMIT: usize = 2000;

/// Base64-alphabet values longer than this are treated as encoded blobs.
pub const LONG_BASE64_LEN: usize = 40;

/// Header names that are sensitive no matter what the value is:
/// authentication and cookie carriers, client identity and IP surface,
/// anti-CSRF tokens, and site-specific token headers seen in the field.
///
/// Extending protection to another header is an entry here, never a change
/// to the matching logic. Names must be lowercase.
pub static SENSITIVE_NAMES: &[&str] = &[
    "authorization",
    "proxy-authorization",
    "www-authenticate",
    "proxy-authenticate",
    "cookie",
    "set-cookie",
    "x-csrf-token",
    "csrf-token",
    "x-api-key",
    "api-key",
    "host",
    "referer",
    "origin",
    ":authority",
    ":path",
    "x-forwarded-for",
    "x-real-ip",
    "x-client-ip",
    "cf-connecting-ip",
    "true-client-ip",
    "x-forwarded-host",
    "forwarded",
    "user-agent",
    "cart-token",
    "x-conduit-token",
    "x-conduit-tokens",
    "x-conduit-worker",
    "x-netflix.request.growth.session.id",
];

/// Keyword fallback for custom headers not covered by [`SENSITIVE_NAMES`].
pub static SECRET_NAME_KEYWORDS: &[&str] = &[
    "token",
    "secret",
    "key",
    "auth",
    "session",
    "password",
    "credential",
    "private",
];

static RE_JWT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9\-_]+\.[A-Za-z0-9\-_]+\.[A-Za-z0-9\-_]*$").unwrap()
});

static RE_BEARER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^Bearer\s+[A-Za-z0-9\-_]{20,}").unwrap());

static RE_UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap()
});

static RE_HEX_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^[0-9a-f]{32,64}$").unwrap());

static RE_BASE64: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9+/=_\-]+$").unwrap());

static RE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^https?://\S+$").unwrap());

/// Case-insensitive membership in the unconditionally sensitive set.
pub fn name_is_sensitive(name: &str) -> bool {
    let lower = name.to_lowercase();
    SENSITIVE_NAMES.contains(&lower.as_str())
}

/// Case-insensitive keyword scan over the header name.
pub fn name_suggests_secret(name: &str) -> bool {
    let lower = name.to_lowercase();
    SECRET_NAME_KEYWORDS
        .iter()
        .any(|keyword| lower.contains(keyword))
}

/// Apply the value-shape rules.
///
/// `oversize_limit` is the unconditional redaction bound; `exempt_urls`
/// excludes well-formed URLs from the base64-blob rule only.
pub fn value_shape(value: &str, oversize_limit: usize, exempt_urls: bool) -> Option<RuleKind> {
    if value.len() < MIN_SHAPE_LEN {
        return None;
    }
    // No ordinary header value is legitimately this long.
    if value.len() >= oversize_limit {
        return Some(RuleKind::OversizedValue);
    }
    if RE_JWT.is_match(value) {
        return Some(RuleKind::JwtShape);
    }
    if RE_BEARER.is_match(value) {
        return Some(RuleKind::BearerToken);
    }
    if RE_UUID.is_match(value) {
        return Some(RuleKind::UuidShape);
    }
    if RE_HEX_TOKEN.is_match(value) {
        return Some(RuleKind::HexToken);
    }
    if value.len() > LONG_BASE64_LEN
        && RE_BASE64.is_match(value)
        && !(exempt_urls && RE_URL.is_match(value))
    {
        return Some(RuleKind::Base64Shape);
    }
    None
}
