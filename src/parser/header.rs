//! Header value decoding: address headers, Message-IDs, and lenient dates
//! (RFC 2822 headers as well as the free-form dates mail clients write into
//! attribution lines, in English and Norwegian).

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use mail_parser::{Address, MessageParser};
use tracing::debug;

use crate::model::address::EmailAddress;

/// Parse an address header (`From`, `To`, `Cc`) into mailboxes.
///
/// `mail-parser` handles RFC 2047 encoded words, quoted names and groups;
/// if it yields nothing usable the hand-written list parser is used.
pub fn parse_address_header(raw: &str) -> Vec<EmailAddress> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }

    let parsed = parse_with_mail_parser(raw);
    if !parsed.is_empty() {
        return parsed;
    }
    EmailAddress::parse_list(raw)
}

/// Parse a single-mailbox header, keeping the first address.
pub fn parse_single_address(raw: &str) -> Option<EmailAddress> {
    parse_address_header(raw).into_iter().next()
}

fn parse_with_mail_parser(raw: &str) -> Vec<EmailAddress> {
    // Wrap the value in a minimal message so mail-parser can parse it.
    let fake_msg = format!("From: {}\r\n\r\n", raw.replace(['\r', '\n'], " "));
    let Some(message) = MessageParser::default().parse(fake_msg.as_bytes()) else {
        return Vec::new();
    };
    let Some(address) = message.from() else {
        return Vec::new();
    };

    let to_model = |addr: &mail_parser::Addr<'_>| -> Option<EmailAddress> {
        let address = addr.address.as_ref()?.trim().to_string();
        if address.is_empty() {
            return None;
        }
        Some(EmailAddress {
            display_name: addr
                .name
                .as_ref()
                .map(|n| n.trim().to_string())
                .unwrap_or_default(),
            address,
        })
    };

    match address {
        Address::List(addrs) => addrs.iter().filter_map(to_model).collect(),
        Address::Group(groups) => groups
            .iter()
            .flat_map(|g| g.addresses.iter().filter_map(to_model))
            .collect(),
    }
}

/// Decode a free-text header such as `Subject` (RFC 2047 encoded words).
/// Blank values decode to `None`.
pub fn decode_text_header(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if !raw.contains("=?") {
        return Some(raw.to_string());
    }
    let fake_msg = format!("Subject: {}\r\n\r\n", raw.replace(['\r', '\n'], " "));
    let decoded = MessageParser::default()
        .parse(fake_msg.as_bytes())
        .and_then(|message| message.subject().map(|s| s.trim().to_string()))
        .filter(|s| !s.is_empty());
    Some(decoded.unwrap_or_else(|| raw.to_string()))
}

/// Normalize a Message-ID by stripping angle brackets and whitespace.
pub fn normalize_message_id(id: &str) -> String {
    id.trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .trim()
        .to_string()
}

/// Parse a date string in any of the formats seen in headers and
/// attribution lines. Times without an offset are taken as UTC.
pub fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    let trimmed = date_str.trim().trim_end_matches(',').trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    let candidates = [
        collapse_spaces(&strip_day_of_week(trimmed)),
        collapse_spaces(&normalize_norwegian(trimmed)),
    ];

    for candidate in &candidates {
        if let Some(dt) = parse_with_formats(candidate) {
            return Some(dt);
        }
        let replaced = replace_named_tz(candidate);
        if let Some(dt) = parse_with_formats(&replaced) {
            return Some(dt);
        }
    }

    if trimmed.chars().any(|c| c.is_ascii_digit()) {
        if let Some(dt) = mail_parser_date(trimmed) {
            return Some(dt);
        }
    }

    debug!(date = trimmed, "Could not parse date");
    None
}

/// Formats tried after the standard parsers, most specific first.
const DATETIME_FORMATS: &[&str] = &[
    "%d %b %Y %H:%M:%S %z",
    "%d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M",
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    // Gmail: "Jan 1, 2024 at 10:00 AM"
    "%b %d, %Y at %I:%M %p",
    "%b %d, %Y at %I:%M:%S %p",
    "%b %d, %Y at %H:%M",
    // Apple Mail: "Jan 1, 2024, at 10:00"
    "%b %d, %Y, at %H:%M",
    "%b %d, %Y, at %I:%M %p",
    // Outlook: "January 1, 2024 10:00 AM"
    "%B %d, %Y %I:%M %p",
    "%B %d, %Y %H:%M",
    "%d %B %Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
    "%d.%m.%Y %H:%M",
    "%d.%m.%Y %H.%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d %b %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d.%m.%Y",
    "%d/%m/%Y",
];

fn parse_with_formats(candidate: &str) -> Option<DateTime<Utc>> {
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(candidate, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(ndt) = NaiveDateTime::parse_from_str(candidate, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(candidate, fmt) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|ndt| Utc.from_utc_datetime(&ndt));
        }
    }
    None
}

/// Attempt to parse a date using `mail-parser`'s built-in parser.
fn mail_parser_date(input: &str) -> Option<DateTime<Utc>> {
    let fake_msg = format!("Date: {input}\r\n\r\n");
    let parsed = MessageParser::default().parse(fake_msg.as_bytes())?;
    let dt = parsed.date()?.to_rfc3339();
    DateTime::parse_from_rfc3339(&dt)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Strip a leading day-of-week ("Mon, ", "Monday ", ...).
fn strip_day_of_week(s: &str) -> String {
    const DAYS: &[&str] = &[
        "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday", "mon",
        "tue", "wed", "thu", "fri", "sat", "sun",
    ];
    let lower = s.to_lowercase();
    for day in DAYS {
        if lower.starts_with(day) {
            let rest = &s[day.len()..];
            if rest.starts_with([',', ' ', '.']) {
                return rest.trim_start_matches([',', '.', ' ']).to_string();
            }
        }
    }
    s.to_string()
}

/// Rewrite a Norwegian client date ("man. 1. jan. 2024 kl. 10:00") into
/// "1 Jan 2024 10:00".
fn normalize_norwegian(s: &str) -> String {
    const WEEKDAYS: &[&str] = &[
        "mandag", "tirsdag", "onsdag", "torsdag", "fredag", "lørdag", "søndag", "man", "tir",
        "ons", "tor", "fre", "lør", "søn",
    ];
    const MONTHS: &[(&str, &str)] = &[
        ("januar", "Jan"),
        ("februar", "Feb"),
        ("mars", "Mar"),
        ("april", "Apr"),
        ("mai", "May"),
        ("juni", "Jun"),
        ("juli", "Jul"),
        ("august", "Aug"),
        ("september", "Sep"),
        ("oktober", "Oct"),
        ("november", "Nov"),
        ("desember", "Dec"),
        ("jan", "Jan"),
        ("feb", "Feb"),
        ("mar", "Mar"),
        ("apr", "Apr"),
        ("jun", "Jun"),
        ("jul", "Jul"),
        ("aug", "Aug"),
        ("sept", "Sep"),
        ("sep", "Sep"),
        ("okt", "Oct"),
        ("nov", "Nov"),
        ("des", "Dec"),
    ];

    let mut words = Vec::new();
    for raw_word in s.split_whitespace() {
        let word = raw_word.trim_end_matches([',', '.']).to_lowercase();
        if word.is_empty() || word == "kl" || word == "den" {
            continue;
        }
        if words.is_empty() && WEEKDAYS.contains(&word.as_str()) {
            continue;
        }
        if let Some((_, en)) = MONTHS.iter().find(|(no, _)| *no == word) {
            words.push((*en).to_string());
            continue;
        }
        // "10.00" is a Norwegian time
        if word.len() == 5
            && word.as_bytes()[2] == b'.'
            && word.chars().filter(|c| c.is_ascii_digit()).count() == 4
        {
            words.push(word.replace('.', ":"));
            continue;
        }
        words.push(word);
    }
    words.join(" ")
}

fn collapse_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Replace well-known timezone abbreviations with numeric offsets.
fn replace_named_tz(s: &str) -> String {
    const TZS: &[(&str, &str)] = &[
        ("CEST", "+0200"),
        ("EST", "-0500"),
        ("EDT", "-0400"),
        ("CST", "-0600"),
        ("CDT", "-0500"),
        ("PST", "-0800"),
        ("PDT", "-0700"),
        ("GMT", "+0000"),
        ("UTC", "+0000"),
        ("CET", "+0100"),
    ];
    for (name, offset) in TZS {
        if let Some(prefix) = s.strip_suffix(name) {
            return format!("{prefix}{offset}");
        }
    }
    s.to_string()
}
