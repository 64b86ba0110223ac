//! Login identifier normalization and the student-domain predicate.

use regex::Regex;

pub const DEFAULT_STUDENT_DOMAIN: &str = "students.example.edu";

/// Trim and lowercase an identifier before it touches the store.
#[must_use]
pub fn normalize(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
#[must_use]
pub fn valid_email(identifier: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(identifier))
}

#[derive(Clone, Debug)]
pub struct IdentifierPolicy {
    domain: String,
}

impl IdentifierPolicy {
    #[must_use]
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.trim().trim_start_matches('@').to_lowercase(),
        }
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Whether a normalized identifier is an address on the student domain.
    #[must_use]
    pub fn accepts(&self, identifier: &str) -> bool {
        valid_email(identifier)
            && identifier
                .rsplit_once('@')
                .is_some_and(|(_, domain)| domain == self.domain)
    }
}

impl Default for IdentifierPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_STUDENT_DOMAIN)
    }
}
