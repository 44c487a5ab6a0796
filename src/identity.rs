//! Address/identity resolution: who wrote a message, as far as the support
//! team is concerned.
//!
//! The stored sender kind is authoritative for the author type and direction.
//! Address matching against the conversation context only shapes the label
//! and feeds diagnostics when the two disagree. Synthetic cards have no
//! stored sender kind, so for them the captured address decides.

use tracing::debug;

use crate::i18n::{label_agent, label_system, label_unknown_customer};
use crate::model::address::{normalize_phone, EmailAddress};
use crate::model::context::{NormalizationContext, PhonePolicy};
use crate::model::message::{AuthorType, Direction};
use crate::model::record::{RawMessageRecord, SenderKind};

/// Resolved authorship of one message or card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAuthor {
    pub author_type: AuthorType,
    pub direction: Direction,
    pub label: String,
}

impl ResolvedAuthor {
    fn new(author_type: AuthorType, label: String) -> Self {
        Self {
            author_type,
            direction: author_type.direction(),
            label,
        }
    }
}

/// Whether an address belongs to a known agent identity.
///
/// Emails match the viewer, the agent address set, or an agent domain. Phone
/// numbers only match under [`PhonePolicy::MatchAgentPhones`].
pub fn is_agent_address(address: &EmailAddress, ctx: &NormalizationContext) -> bool {
    if address.is_email() {
        let normalized = address.normalized();
        if ctx.viewer_email.as_deref() == Some(normalized.as_str())
            || ctx.agent_emails.contains(&normalized)
        {
            return true;
        }
        return address
            .domain()
            .is_some_and(|domain| ctx.agent_domains.contains(&domain));
    }

    ctx.phone_policy == PhonePolicy::MatchAgentPhones
        && address.is_phone()
        && ctx.agent_phones.contains(&normalize_phone(&address.address))
}

/// Candidate addresses of a stored record: the `From` mailbox, then the phone.
fn candidates(record: &RawMessageRecord, from: Option<&EmailAddress>) -> Vec<EmailAddress> {
    let mut out: Vec<EmailAddress> = from.cloned().into_iter().collect();
    if let Some(phone) = record.phone() {
        if !out.iter().any(|a| a.address == phone) {
            out.push(EmailAddress::bare(phone));
        }
    }
    out
}

/// Resolve the author of a stored record.
///
/// `from` is the already-decoded `From` header, if any.
pub fn resolve_author(
    record: &RawMessageRecord,
    from: Option<&EmailAddress>,
    ctx: &NormalizationContext,
) -> ResolvedAuthor {
    let candidates = candidates(record, from);
    let agent_match = candidates.iter().find(|a| is_agent_address(a, ctx));

    match record.sender_kind {
        SenderKind::System => {
            ResolvedAuthor::new(AuthorType::System, label_system(ctx.lang).to_string())
        }
        SenderKind::Agent => {
            if agent_match.is_none() && ctx.has_agent_identities() {
                debug!(
                    record = %record.id,
                    address = candidates.first().map(|a| a.address.as_str()).unwrap_or("-"),
                    "Sender kind agent, but address matches no agent identity; keeping agent"
                );
            }
            let labelled = agent_match.or(candidates.first());
            ResolvedAuthor::new(AuthorType::Agent, agent_label(labelled, ctx))
        }
        SenderKind::Customer => {
            if let Some(address) = agent_match {
                debug!(
                    record = %record.id,
                    address = %address.address,
                    "Sender kind customer, but address matches an agent identity; keeping customer"
                );
            }
            ResolvedAuthor::new(
                AuthorType::Customer,
                customer_label(candidates.first(), ctx),
            )
        }
    }
}

/// Resolve the author of a quoted block from the address its attribution or
/// header run captured.
///
/// Without a decisive address the author alternates from `previous` (the
/// card directly newer than this one), since quoted history is usually a
/// back-and-forth. A system message is taken to have been answered by the
/// customer.
///
/// A captured address only counts as decisive when the context can judge
/// it: with no agent identities and no matching customer email, an address
/// that matches nothing says nothing, so alternation applies even though an
/// address was captured.
pub fn resolve_captured(
    captured: Option<&EmailAddress>,
    captured_name: Option<&str>,
    previous: AuthorType,
    ctx: &NormalizationContext,
) -> ResolvedAuthor {
    let author_type = match captured {
        Some(address) if is_agent_address(address, ctx) => AuthorType::Agent,
        Some(address)
            if address.is_email()
                && ctx.customer_email.as_deref() == Some(address.normalized().as_str()) =>
        {
            AuthorType::Customer
        }
        Some(_) if ctx.has_agent_identities() => AuthorType::Customer,
        _ => {
            let alternated = alternate(previous);
            debug!(
                previous = ?previous,
                inferred = ?alternated,
                "No decisive address in quoted block; alternating sender"
            );
            alternated
        }
    };

    let label = match author_type {
        AuthorType::Agent => agent_label(captured, ctx),
        _ => match (captured, captured_name) {
            (Some(address), _) => customer_label(Some(address), ctx),
            (None, Some(name)) if !name.trim().is_empty() => name.trim().to_string(),
            (None, _) => customer_label(None, ctx),
        },
    };
    ResolvedAuthor::new(author_type, label)
}

fn alternate(previous: AuthorType) -> AuthorType {
    match previous {
        AuthorType::Agent | AuthorType::System => AuthorType::Customer,
        AuthorType::Customer => AuthorType::Agent,
    }
}

fn agent_label(address: Option<&EmailAddress>, ctx: &NormalizationContext) -> String {
    let base = label_agent(ctx.lang);
    match address.map(|a| a.address.trim()).filter(|a| !a.is_empty()) {
        Some(addr) => format!("{base} ({addr})"),
        None => base.to_string(),
    }
}

/// Context display name, then the sender's own display name, then the
/// address, then a placeholder.
fn customer_label(address: Option<&EmailAddress>, ctx: &NormalizationContext) -> String {
    if let Some(name) = &ctx.customer_name {
        let is_known_customer = match (address, &ctx.customer_email) {
            (Some(a), Some(email)) => a.normalized() == *email,
            (None, _) | (_, None) => true,
        };
        if is_known_customer {
            return name.clone();
        }
    }
    if let Some(address) = address {
        if !address.display_name.trim().is_empty() {
            return address.display_name.trim().to_string();
        }
        if !address.address.trim().is_empty() {
            return address.address.trim().to_string();
        }
    }
    label_unknown_customer(ctx.lang).to_string()
}
