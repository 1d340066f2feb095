// web-server/src/auth/policy.rs
//! Access predicates kept free of HTTP plumbing.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use subtle::ConstantTimeEq;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// Basic mailbox syntax: something@something.tld, no whitespace
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Optional closed set of permitted addresses. Empty permits everyone.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    emails: HashSet<String>,
}

impl AllowList {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            emails: emails
                .into_iter()
                .map(Into::into)
                .filter(|email: &String| !email.is_empty())
                .collect(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.emails.is_empty()
    }

    pub fn permits(&self, email: &str) -> bool {
        self.is_open() || self.emails.contains(email)
    }
}

/// Whether the presented token equals the configured static bypass secret.
pub fn bypass_matches(configured: Option<&str>, presented: Option<&str>) -> bool {
    match (configured, presented) {
        (Some(expected), Some(given)) if !expected.is_empty() => {
            expected.as_bytes().ct_eq(given.as_bytes()).into()
        }
        _ => false,
    }
}
