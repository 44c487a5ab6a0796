//! Per-conversation normalization context: who counts as an agent, and who
//! the customer is.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::address::normalize_phone;
use crate::i18n::Lang;

/// Whether phone numbers take part in agent identity matching.
///
/// SMS agent identity is best-effort: by default phone numbers are ignored
/// and only the stored sender kind decides. `MatchAgentPhones` lets a known
/// agent number be recognized for labels and for conflict diagnostics; it
/// still never overrides the stored sender kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhonePolicy {
    #[default]
    Ignore,
    MatchAgentPhones,
}

/// Built once per conversation view and used unchanged for every record in a
/// batch, so authorship decisions stay consistent within a conversation.
///
/// Addresses, domains and phone numbers are stored normalized (lowercase,
/// digits only); use the builder methods or [`NormalizationContext::normalized`]
/// after deserializing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationContext {
    /// Email of the agent looking at the conversation.
    pub viewer_email: Option<String>,
    /// Exact agent addresses.
    pub agent_emails: BTreeSet<String>,
    /// Domains whose every address is an agent.
    pub agent_domains: BTreeSet<String>,
    /// Agent phone numbers (only consulted under `PhonePolicy::MatchAgentPhones`).
    pub agent_phones: BTreeSet<String>,
    pub phone_policy: PhonePolicy,
    /// The conversation customer's known email.
    pub customer_email: Option<String>,
    /// The conversation customer's known display name.
    pub customer_name: Option<String>,
    /// Language for generated labels.
    pub lang: Lang,
}

impl NormalizationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_viewer(mut self, email: &str) -> Self {
        self.viewer_email = non_blank(email).map(|e| e.to_lowercase());
        self
    }

    pub fn with_agent_email(mut self, email: &str) -> Self {
        if let Some(email) = non_blank(email) {
            self.agent_emails.insert(email.to_lowercase());
        }
        self
    }

    pub fn with_agent_domain(mut self, domain: &str) -> Self {
        if let Some(domain) = non_blank(domain) {
            self.agent_domains
                .insert(domain.trim_start_matches('@').to_lowercase());
        }
        self
    }

    pub fn with_agent_phone(mut self, phone: &str) -> Self {
        let phone = normalize_phone(phone);
        if !phone.is_empty() {
            self.agent_phones.insert(phone);
        }
        self
    }

    pub fn with_phone_policy(mut self, policy: PhonePolicy) -> Self {
        self.phone_policy = policy;
        self
    }

    pub fn with_customer(mut self, email: Option<&str>, name: Option<&str>) -> Self {
        self.customer_email = email.and_then(non_blank).map(|e| e.to_lowercase());
        self.customer_name = name.and_then(non_blank).map(str::to_string);
        self
    }

    pub fn with_lang(mut self, lang: Lang) -> Self {
        self.lang = lang;
        self
    }

    /// Re-normalize every identity field. Call after deserializing a context
    /// from an untrusted file.
    pub fn normalized(self) -> Self {
        let mut ctx = Self {
            phone_policy: self.phone_policy,
            lang: self.lang,
            ..Self::default()
        };
        if let Some(viewer) = &self.viewer_email {
            ctx = ctx.with_viewer(viewer);
        }
        for email in &self.agent_emails {
            ctx = ctx.with_agent_email(email);
        }
        for domain in &self.agent_domains {
            ctx = ctx.with_agent_domain(domain);
        }
        for phone in &self.agent_phones {
            ctx = ctx.with_agent_phone(phone);
        }
        ctx.with_customer(
            self.customer_email.as_deref(),
            self.customer_name.as_deref(),
        )
    }

    /// Whether any agent identity is known at all. Without one, authorship
    /// falls back to the stored sender kind alone.
    pub fn has_agent_identities(&self) -> bool {
        self.viewer_email.is_some()
            || !self.agent_emails.is_empty()
            || !self.agent_domains.is_empty()
            || (self.phone_policy == PhonePolicy::MatchAgentPhones
                && !self.agent_phones.is_empty())
    }
}

fn non_blank(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
