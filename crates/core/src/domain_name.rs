//! Validated DNS domain name value object.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DnsError, DnsResult};

const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// A syntactically valid, lowercased DNS domain name.
///
/// Construction validates the usual hostname rules: total length, dot-separated
/// labels of alphanumerics and hyphens, no leading/trailing hyphen per label,
/// and at least two labels (a bare TLD is not a registrable domain here).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainName(String);

impl DomainName {
    pub fn new(input: impl Into<String>) -> DnsResult<Self> {
        let name = input.into().to_ascii_lowercase();

        if name.is_empty() {
            return Err(DnsError::validation("domain name is empty"));
        }
        if name.len() > MAX_DOMAIN_LEN {
            return Err(DnsError::validation(format!(
                "domain name exceeds {MAX_DOMAIN_LEN} characters"
            )));
        }
        let labels: Vec<&str> = name.split('.').collect();
        if labels.len() < 2 {
            return Err(DnsError::validation(format!(
                "domain name '{name}' must contain at least two labels"
            )));
        }
        for label in &labels {
            if label.is_empty() || label.len() > MAX_LABEL_LEN {
                return Err(DnsError::validation(format!(
                    "domain name '{name}' has an empty or over-long label"
                )));
            }
            if !label
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
            {
                return Err(DnsError::validation(format!(
                    "domain name '{name}' contains invalid characters"
                )));
            }
            if label.starts_with('-') || label.ends_with('-') {
                return Err(DnsError::validation(format!(
                    "domain name '{name}' has a label starting or ending with '-'"
                )));
            }
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for DomainName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DomainName {
    type Err = DnsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for DomainName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn accepts_ordinary_domains() {
        for d in ["test.domain", "a.io", "foo-bar.example.com", "0x2.dev"] {
            assert!(DomainName::new(d).is_ok(), "{d} should be valid");
        }
    }

    #[test]
    fn normalizes_to_lowercase() {
        let d = DomainName::new("Test.Domain").unwrap();
        assert_eq!(d.as_str(), "test.domain");
    }

    #[test]
    fn rejects_malformed_domains() {
        for d in [
            "",
            "nodots",
            ".leading.dot",
            "trailing.dot.",
            "double..dot",
            "-leading.hyphen",
            "trailing-.hyphen",
            "under_score.io",
            "spa ce.io",
        ] {
            assert!(DomainName::new(d).is_err(), "{d:?} should be rejected");
        }
    }

    #[test]
    fn rejects_over_long_names() {
        let long = format!("{}.com", "a".repeat(300));
        assert!(DomainName::new(long).is_err());

        let long_label = format!("{}.com", "a".repeat(64));
        assert!(DomainName::new(long_label).is_err());
    }

    proptest! {
        #[test]
        fn accepts_generated_valid_names(
            labels in prop::collection::vec("[a-z0-9]([a-z0-9-]{0,10}[a-z0-9])?", 2..5)
        ) {
            let name = labels.join(".");
            prop_assume!(name.len() <= MAX_DOMAIN_LEN);
            prop_assert!(DomainName::new(&name).is_ok());
        }

        #[test]
        fn parse_round_trips(
            labels in prop::collection::vec("[a-z0-9]([a-z0-9-]{0,10}[a-z0-9])?", 2..5)
        ) {
            let name = labels.join(".");
            prop_assume!(name.len() <= MAX_DOMAIN_LEN);
            let parsed: DomainName = name.parse().unwrap();
            prop_assert_eq!(parsed.as_str(), name.as_str());
        }
    }
}
