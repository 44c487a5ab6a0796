//! Sender and recipient addresses (RFC 5322 §3.4 mailboxes, plus phone numbers
//! for SMS channels).

use serde::{Deserialize, Serialize};

/// A parsed address.
///
/// For email this is a mailbox; for SMS the `address` holds the phone number
/// as stored.
///
/// # Examples
/// - `"Kari Nordmann <kari@example.no>"` → `display_name = "Kari Nordmann"`, `address = "kari@example.no"`
/// - `"user@example.com"` → `display_name = ""`, `address = "user@example.com"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Human-readable display name (may be empty).
    #[serde(default)]
    pub display_name: String,
    /// The bare address (`user@domain` or a phone number).
    pub address: String,
}

impl EmailAddress {
    /// Build an address with no display name.
    pub fn bare(address: impl Into<String>) -> Self {
        Self {
            display_name: String::new(),
            address: address.into(),
        }
    }

    /// Parse a single mailbox from a header value.
    ///
    /// Supported formats:
    /// - `"user@domain.com"`
    /// - `"<user@domain.com>"`
    /// - `"Display Name <user@domain.com>"`
    /// - `"\"Display, Name\" <user@domain.com>"`
    ///
    /// Anything else is kept verbatim as `address`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();

        if let (Some(open), Some(close)) = (trimmed.rfind('<'), trimmed.rfind('>')) {
            if close > open {
                return Self {
                    display_name: strip_quotes(&trimmed[..open]),
                    address: trimmed[open + 1..close].trim().to_string(),
                };
            }
        }

        Self::bare(trimmed)
    }

    /// Parse a comma-separated list of mailboxes.
    ///
    /// Handles quoted commas: `"Last, First" <a@b.com>, other@c.com`
    pub fn parse_list(raw: &str) -> Vec<Self> {
        let mut results = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut in_angle = false;

        for ch in raw.chars() {
            match ch {
                '"' => in_quotes = !in_quotes,
                '<' if !in_quotes => in_angle = true,
                '>' if !in_quotes => in_angle = false,
                ',' if !in_quotes && !in_angle => {
                    push_parsed(&mut results, &current);
                    current.clear();
                    continue;
                }
                _ => {}
            }
            current.push(ch);
        }
        push_parsed(&mut results, &current);

        results
    }

    /// Whether this looks like an email mailbox (as opposed to a phone number
    /// or a bare name).
    pub fn is_email(&self) -> bool {
        self.domain().is_some()
    }

    /// Whether the address looks like a phone number: an optional leading `+`
    /// followed by at least five digits and only common separators.
    pub fn is_phone(&self) -> bool {
        looks_like_phone(&self.address)
    }

    /// Lowercased domain part of an email address.
    pub fn domain(&self) -> Option<String> {
        let (local, domain) = self.address.rsplit_once('@')?;
        if local.is_empty() || domain.is_empty() {
            return None;
        }
        Some(domain.trim().to_lowercase())
    }

    /// Lowercased address for comparisons.
    pub fn normalized(&self) -> String {
        self.address.trim().to_lowercase()
    }

    /// Format for display: `"Display Name <address>"` or just `"address"`.
    pub fn display(&self) -> String {
        if self.display_name.is_empty() {
            self.address.clone()
        } else {
            format!("{} <{}>", self.display_name, self.address)
        }
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Reduce a phone number to `+` and digits, so that `+47 123 45 678` and
/// `+4712345678` compare equal.
pub fn normalize_phone(raw: &str) -> String {
    raw.trim()
        .chars()
        .enumerate()
        .filter(|(i, c)| c.is_ascii_digit() || (*i == 0 && *c == '+'))
        .map(|(_, c)| c)
        .collect()
}

/// See [`EmailAddress::is_phone`].
pub fn looks_like_phone(raw: &str) -> bool {
    let trimmed = raw.trim();
    let body = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits = body.chars().filter(|c| c.is_ascii_digit()).count();
    digits >= 5
        && body
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '.' | '(' | ')'))
}

fn push_parsed(results: &mut Vec<EmailAddress>, segment: &str) {
    let addr = EmailAddress::parse(segment);
    if !addr.address.is_empty() {
        results.push(addr);
    }
}

/// Strip surrounding double-quotes and trim whitespace.
fn strip_quotes(s: &str) -> String {
    let trimmed = s.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}
