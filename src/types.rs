//! NewType wrappers for strong typing throughout the gateway.
//!
//! These types keep semantically different strings apart (a tenant subdomain
//! is never accepted where a bearer credential is expected, and vice versa).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Macro to generate a NewType wrapper with standard trait implementations.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

newtype_string!(
    /// Zendesk subdomain identifying the backend instance a credential is
    /// valid against (e.g. "acme" for `acme.zendesk.com`).
    ///
    /// Always sourced from process configuration, never from a request.
    Tenant
);

newtype_string!(
    /// Help Center section name, the key of the knowledge-base document.
    SectionName
);

impl Tenant {
    /// Whether this tenant can be interpolated into a host name.
    ///
    /// Only ASCII alphanumerics and `-` are accepted, and the value may not
    /// start or end with `-`.
    pub fn is_valid_subdomain(&self) -> bool {
        let s = self.as_str();
        !s.is_empty()
            && s.len() <= 63
            && !s.starts_with('-')
            && !s.ends_with('-')
            && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    }
}

/// Opaque OAuth access token presented by a caller.
///
/// Has neither `Display` nor `Serialize`: the raw value only leaves
/// this type through [`BearerToken::expose`], when the upstream request is
/// built. `Debug` prints a fingerprint instead of the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wrap a raw token.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw token, for building an `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Short SHA-256 fingerprint, safe to log.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        let hex = format!("{:x}", digest);
        hex[..12].to_string()
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BearerToken(sha256:{})", self.fingerprint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_subdomain_validation() {
        assert!(Tenant::new("acme").is_valid_subdomain());
        assert!(Tenant::new("acme-support-2").is_valid_subdomain());
        assert!(!Tenant::new("").is_valid_subdomain());
        assert!(!Tenant::new("-acme").is_valid_subdomain());
        assert!(!Tenant::new("acme.evil.com").is_valid_subdomain());
        assert!(!Tenant::new("acme/../x").is_valid_subdomain());
        assert!(!Tenant::new("a".repeat(64)).is_valid_subdomain());
    }

    #[test]
    fn test_bearer_token_debug_is_redacted() {
        let token = BearerToken::new("super-secret-token");
        let debug = format!("{:?}", token);
        assert!(!debug.contains("super-secret-token"));
        assert!(debug.starts_with("BearerToken(sha256:"));
    }

    #[test]
    fn test_bearer_token_fingerprint_is_stable() {
        let a = BearerToken::new("token-a");
        let b = BearerToken::new("token-a");
        let c = BearerToken::new("token-c");
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 12);
        assert!(a.fingerprint().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_tenant_display() {
        assert_eq!(Tenant::from("acme").to_string(), "acme");
        assert_eq!(SectionName::new("FAQ").as_str(), "FAQ");
    }
}
