//! Separator lines and forwarded-header runs.
//!
//! Outlook plain text marks quoted history with `-----Original Message-----`
//! or a long underscore rule followed by `From:`/`Sent:`/`To:`/`Subject:`
//! lines (`Fra:`/`Sendt:`/`Til:`/`Emne:` in Norwegian). Some clients skip the
//! rule and start directly with the header run.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::{normalize_for_match, strip_quote_prefix, QuoteDetector};
use crate::model::address::EmailAddress;
use crate::model::message::QuoteKind;
use crate::parser::header::{parse_date, parse_single_address};
use crate::parser::html::TextView;

static NAMED_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^-{2,}\s*(?:original message|opprinnelig melding|forwarded message|videresendt melding)\s*-*$",
    )
    .expect("valid regex")
});

static RULE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^_{10,}$").expect("valid regex"));

static HEADER_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\*?(?P<field>from|sent|to|cc|subject|date|fra|sendt|til|kopi|emne|dato)\s*:\*?\s*(?P<value>.*)$",
    )
    .expect("valid regex")
});

/// Minimum header lines for a run that has no separator line above it.
const MIN_BARE_RUN: usize = 2;

/// A parsed header run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderRun {
    pub from: Option<EmailAddress>,
    pub date_text: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub subject: Option<String>,
    /// Lines the run occupies, separator line included.
    pub lines: usize,
}

/// Which header a normalized line is, with its value.
fn header_field(line: &str) -> Option<(String, String)> {
    let (line, _) = strip_quote_prefix(line);
    let line = normalize_for_match(line);
    let caps = HEADER_FIELD.captures(&line)?;
    Some((
        caps["field"].to_ascii_lowercase(),
        caps["value"].trim().trim_matches('*').trim().to_string(),
    ))
}

fn is_blank(line: &str) -> bool {
    strip_quote_prefix(line).0.trim().is_empty()
}

/// Header lines starting at `start`; blank lines inside the run are skipped.
/// Returns the run and the index just past its last header line.
fn collect_headers(lines: &[&str], start: usize) -> (HeaderRun, usize, usize) {
    let mut run = HeaderRun::default();
    let mut count = 0;
    let mut end = start;
    let mut i = start;
    while i < lines.len() {
        if is_blank(lines[i]) {
            i += 1;
            continue;
        }
        let Some((field, value)) = header_field(lines[i]) else {
            break;
        };
        match field.as_str() {
            "from" | "fra" if run.from.is_none() => {
                run.from = parse_single_address(&value);
            }
            "sent" | "date" | "sendt" | "dato" if run.date_text.is_none() => {
                run.date = parse_date(&value);
                run.date_text = (!value.is_empty()).then(|| value.clone());
            }
            "subject" | "emne" if run.subject.is_none() => {
                run.subject = (!value.is_empty()).then(|| value.clone());
            }
            _ => {}
        }
        count += 1;
        i += 1;
        end = i;
    }
    (run, count, end)
}

/// Match a separator (or bare `From:` header run) starting at `lines[index]`.
pub fn match_header_block_at(lines: &[&str], index: usize) -> Option<HeaderRun> {
    let first = lines.get(index)?;
    let (stripped, _) = strip_quote_prefix(first);
    let normalized = normalize_for_match(stripped);

    if NAMED_SEPARATOR.is_match(&normalized) {
        let (mut run, _, end) = collect_headers(lines, index + 1);
        run.lines = end.max(index + 1) - index;
        return Some(run);
    }

    if RULE.is_match(&normalized) {
        let (mut run, count, end) = collect_headers(lines, index + 1);
        if count == 0 {
            return None;
        }
        run.lines = end - index;
        return Some(run);
    }

    match header_field(first) {
        Some((field, _)) if field == "from" || field == "fra" => {
            let (mut run, count, end) = collect_headers(lines, index);
            if count < MIN_BARE_RUN {
                return None;
            }
            run.lines = end - index;
            Some(run)
        }
        _ => None,
    }
}

/// Separator lines and header runs anywhere in the body.
pub struct SeparatorDetector;

impl QuoteDetector for SeparatorDetector {
    fn name(&self) -> &'static str {
        "separator"
    }

    fn kind(&self) -> QuoteKind {
        QuoteKind::HeaderBlock
    }

    fn detect(&self, view: &TextView<'_>) -> Vec<usize> {
        let lines = view.lines();
        let texts: Vec<&str> = lines.iter().map(|(_, text)| *text).collect();
        let mut cuts = Vec::new();
        let mut i = 0;
        while i < texts.len() {
            match match_header_block_at(&texts, i) {
                Some(run) => {
                    cuts.push(view.line_cut(lines[i].0));
                    i += run.lines.max(1);
                }
                None => i += 1,
            }
        }
        cuts
    }
}
