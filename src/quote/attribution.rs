//! Attribution lines: "On <date>, <name> <addr> wrote:" and the Norwegian
//! "Den <dato> kl. <tid> skrev <navn>:" / "På <dato> skrev <navn>:" forms.
//!
//! Clients wrap long attribution lines, so a line that starts like an
//! attribution but does not complete one is retried joined with up to two
//! following lines.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::{normalize_for_match, strip_quote_prefix, QuoteDetector};
use crate::model::address::EmailAddress;
use crate::model::message::QuoteKind;
use crate::parser::header::parse_date;
use crate::parser::html::TextView;

/// Continuation lines tried after an incomplete attribution start.
const MAX_CONTINUATION_LINES: usize = 2;

static ENGLISH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^on\s+(?P<rest>.+?)\s*wrote\s*:$").expect("valid regex"));

static NORWEGIAN_KL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:den\s+)?(?P<date>.+?)\s+kl\.?\s*(?P<time>\d{1,2}[:.]\d{2})\s*,?\s*skrev\s+(?P<who>.+?)\s*:$",
    )
    .expect("valid regex")
});

static NORWEGIAN_PAA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:på|den)\s+(?P<date>.+?)\s*,?\s+skrev\s+(?P<who>.+?)\s*:$")
        .expect("valid regex")
});

static TIME_OF_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,2}:\d{2}(?::\d{2})?(?:\s*[AaPp]\.?\s?[Mm]\b\.?)?").expect("valid regex")
});

static STARTS_LIKE_ATTRIBUTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:on|den|på)\s").expect("valid regex"));

/// What an attribution line says about the quoted message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attribution {
    pub name: Option<String>,
    pub address: Option<String>,
    /// Date text as written, if it could be separated from the author.
    pub date_text: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

impl Attribution {
    /// Author as an address, when an email address was present.
    pub fn author(&self) -> Option<EmailAddress> {
        self.address.as_ref().map(|address| EmailAddress {
            display_name: self.name.clone().unwrap_or_default(),
            address: address.clone(),
        })
    }
}

/// Parse one (already joined) attribution line.
pub fn parse_attribution(line: &str) -> Option<Attribution> {
    let (line, _) = strip_quote_prefix(line);
    let line = normalize_for_match(line);

    if let Some(caps) = ENGLISH.captures(&line) {
        return Some(parse_english_rest(&caps["rest"]));
    }
    if let Some(caps) = NORWEGIAN_KL.captures(&line) {
        let date_text = format!("{} kl. {}", caps["date"].trim(), &caps["time"]);
        return Some(with_author(&caps["who"], date_text));
    }
    if let Some(caps) = NORWEGIAN_PAA.captures(&line) {
        let date_text = caps["date"].trim().trim_end_matches(',').to_string();
        return Some(with_author(&caps["who"], date_text));
    }
    None
}

/// Match an attribution starting at `lines[index]`, joining wrapped
/// continuation lines. Returns the attribution and the number of lines used.
pub fn match_attribution_at(lines: &[&str], index: usize) -> Option<(Attribution, usize)> {
    let first = lines.get(index)?;
    if let Some(found) = parse_attribution(first) {
        return Some((found, 1));
    }

    let (head, depth) = strip_quote_prefix(first);
    if !STARTS_LIKE_ATTRIBUTION.is_match(head.trim()) {
        return None;
    }

    let mut joined = head.trim().to_string();
    for extra in 1..=MAX_CONTINUATION_LINES {
        let next = lines.get(index + extra)?;
        let (rest, next_depth) = strip_quote_prefix(next);
        if next_depth != depth || rest.trim().is_empty() {
            return None;
        }
        joined.push(' ');
        joined.push_str(rest.trim());
        if let Some(found) = parse_attribution(&joined) {
            return Some((found, extra + 1));
        }
    }
    None
}

fn with_author(who: &str, date_text: String) -> Attribution {
    let (name, address) = split_author(who);
    Attribution {
        name,
        address,
        date: parse_date(&date_text),
        date_text: Some(date_text),
    }
}

/// English "rest" is "<date>, <name> <addr>" with every part optional.
fn parse_english_rest(rest: &str) -> Attribution {
    let rest = rest.trim();
    let (date_part, who_part) = match TIME_OF_DAY.find_iter(rest).last() {
        Some(time) => (&rest[..time.end()], &rest[time.end()..]),
        None => match last_separating_comma(rest) {
            Some(comma) => (&rest[..comma], &rest[comma + 1..]),
            None => match rest.rsplit_once(' ') {
                Some((date, who)) if who.contains('@') => (date, who),
                _ => (rest, ""),
            },
        },
    };

    let date_text = date_part.trim().trim_end_matches(',').trim();
    let who = who_part.trim().trim_start_matches(',').trim();
    let (name, address) = split_author(who);
    Attribution {
        name,
        address,
        date: parse_date(date_text),
        date_text: (!date_text.is_empty()).then(|| date_text.to_string()),
    }
}

/// Name and address of "Name <addr>", "addr", or a bare name.
fn split_author(who: &str) -> (Option<String>, Option<String>) {
    let who = who.trim();
    if who.is_empty() {
        return (None, None);
    }
    if who.contains('@') {
        let parsed = EmailAddress::parse(who);
        if parsed.is_email() {
            let name = (!parsed.display_name.is_empty()).then_some(parsed.display_name);
            return (name, Some(parsed.address));
        }
    }
    let name = who.trim_matches(|c| c == '"' || c == '\'').trim();
    ((!name.is_empty()).then(|| name.to_string()), None)
}

/// Byte offset of the last comma outside quotes and angle brackets.
fn last_separating_comma(s: &str) -> Option<usize> {
    let mut in_quotes = false;
    let mut in_angle = false;
    let mut found = None;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '<' if !in_quotes => in_angle = true,
            '>' if !in_quotes => in_angle = false,
            ',' if !in_quotes && !in_angle => found = Some(i),
            _ => {}
        }
    }
    found
}

/// Attribution lines anywhere in the body, nested quotes included.
pub struct AttributionDetector;

impl QuoteDetector for AttributionDetector {
    fn name(&self) -> &'static str {
        "attribution"
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
            match match_attribution_at(&texts, i) {
                Some((_, used)) => {
                    cuts.push(view.line_cut(lines[i].0));
                    i += used;
                }
                None => i += 1,
            }
        }
        cuts
    }
}
