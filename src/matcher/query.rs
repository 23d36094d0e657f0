//! Prefix/suffix vanity constraints and the address predicate.

use std::fmt;

use crate::crypto::{strip_hex_prefix, Address, ADDRESS_HEX_LEN};
use crate::error::KeygenError;

/// A validated prefix/suffix constraint on an address's textual form.
///
/// Constraints are hex digits compared against the 40-digit body of the
/// checksummed address. A leading `0x` on the prefix is accepted and ignored,
/// since every address starts with it; `0X` is accepted only when matching
/// ignores case. With `case_sensitive` the comparison is against the EIP-55
/// mixed-case form; otherwise both sides are lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchQuery {
    /// Prefix digits as the caller wrote them (lowercased unless case sensitive)
    prefix: String,
    /// Suffix digits as the caller wrote them (lowercased unless case sensitive)
    suffix: String,
    /// Lowercase copies used for the cheap pre-check
    prefix_lower: String,
    suffix_lower: String,
    /// Whether matching is case sensitive
    case_sensitive: bool,
}

impl SearchQuery {
    /// Builds a query, rejecting characters that can never appear in an address.
    ///
    /// Absent and empty constraints are equivalent and match everything.
    pub fn new(
        prefix: Option<&str>,
        suffix: Option<&str>,
        case_sensitive: bool,
    ) -> Result<Self, KeygenError> {
        // Addresses render as lowercase `0x`; `0X` only passes when case is ignored.
        let prefix = prefix
            .map(|p| {
                if case_sensitive {
                    p.strip_prefix("0x").unwrap_or(p)
                } else {
                    strip_hex_prefix(p)
                }
            })
            .unwrap_or("");
        let suffix = suffix.unwrap_or("");

        validate_hex("prefix", prefix)?;
        validate_hex("suffix", suffix)?;

        if prefix.len() + suffix.len() > ADDRESS_HEX_LEN {
            return Err(KeygenError::InvalidQuery(format!(
                "combined prefix + suffix cannot be longer than {} characters",
                ADDRESS_HEX_LEN
            )));
        }

        let normalize = |s: &str| {
            if case_sensitive {
                s.to_owned()
            } else {
                s.to_ascii_lowercase()
            }
        };

        Ok(Self {
            prefix: normalize(prefix),
            suffix: normalize(suffix),
            prefix_lower: prefix.to_ascii_lowercase(),
            suffix_lower: suffix.to_ascii_lowercase(),
            case_sensitive,
        })
    }

    /// A query with no constraint; every address matches.
    pub fn any() -> Self {
        Self::default()
    }

    /// Returns the prefix constraint, if any (without `0x`).
    pub fn prefix(&self) -> Option<&str> {
        Some(self.prefix.as_str()).filter(|s| !s.is_empty())
    }

    /// Returns the suffix constraint, if any.
    pub fn suffix(&self) -> Option<&str> {
        Some(self.suffix.as_str()).filter(|s| !s.is_empty())
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Returns true when neither a prefix nor a suffix is set.
    pub fn is_unconstrained(&self) -> bool {
        self.prefix.is_empty() && self.suffix.is_empty()
    }

    /// Number of fixed leading + trailing characters.
    pub fn constrained_len(&self) -> usize {
        self.prefix.len() + self.suffix.len()
    }

    /// Tests an address against this query.
    #[inline]
    pub fn matches(&self, address: &Address) -> bool {
        if self.is_unconstrained() {
            return true;
        }

        let lower = address.to_hex();
        if !(lower.starts_with(&self.prefix_lower) && lower.ends_with(&self.suffix_lower)) {
            return false;
        }
        if !self.case_sensitive {
            return true;
        }

        // Only hashed when the digits already agree.
        let checksum = address.to_checksum();
        let body = &checksum[2..];
        body.starts_with(&self.prefix) && body.ends_with(&self.suffix)
    }

    /// Returns the expected number of attempts to find a match.
    ///
    /// Each hex digit has 16 possible values. Under case-sensitive matching
    /// each letter must additionally land on the right EIP-55 casing, which
    /// holds for half of all addresses.
    pub fn estimated_attempts(&self) -> f64 {
        let digits = self.constrained_len() as i32;
        let base = 16f64.powi(digits);
        if self.case_sensitive {
            let letters = self
                .prefix
                .chars()
                .chain(self.suffix.chars())
                .filter(|c| c.is_ascii_alphabetic())
                .count() as i32;
            base * 2f64.powi(letters)
        } else {
            base
        }
    }

    /// Returns a human-readable difficulty estimate.
    pub fn difficulty_description(&self) -> String {
        let diff = self.estimated_attempts();
        if diff <= 1_000.0 {
            "Very Easy (< 1 second)".into()
        } else if diff <= 100_000.0 {
            "Easy (seconds)".into()
        } else if diff <= 10_000_000.0 {
            "Medium (minutes)".into()
        } else if diff <= 1_000_000_000.0 {
            "Hard (hours)".into()
        } else {
            "Very Hard (days or more)".into()
        }
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.case_sensitive {
            "case-sensitive"
        } else {
            "case-insensitive"
        };
        match (self.prefix(), self.suffix()) {
            (None, None) => write!(f, "any address"),
            (Some(p), None) => write!(f, "prefix 0x{} ({})", p, mode),
            (None, Some(s)) => write!(f, "suffix {} ({})", s, mode),
            (Some(p), Some(s)) => write!(f, "prefix 0x{} + suffix {} ({})", p, s, mode),
        }
    }
}

/// Tests whether `address` satisfies `query`.
#[inline]
pub fn matches(address: &Address, query: &SearchQuery) -> bool {
    query.matches(address)
}

fn validate_hex(what: &str, value: &str) -> Result<(), KeygenError> {
    match value.chars().find(|c| !c.is_ascii_hexdigit()) {
        Some(c) => Err(KeygenError::InvalidQuery(format!(
            "{} contains '{}'; only hex characters (0-9, a-f) are allowed",
            what, c
        ))),
        None => Ok(()),
    }
}
