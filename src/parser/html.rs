//! HTML → text views that remember where each character came from.
//!
//! Quote detectors match on text but must cut the *original* markup, so the
//! extracted text keeps a byte-offset map back into the source.

use std::borrow::Cow;

/// Tags that start a new text line.
const BLOCK_TAGS: &[&str] = &[
    "br", "p", "div", "tr", "li", "blockquote", "h1", "h2", "h3", "h4", "h5", "h6", "hr",
    "table", "ul", "ol", "pre",
];

/// Tags whose content is never text.
const SKIPPED_BLOCKS: &[&str] = &["script", "style", "head", "title"];

/// A text rendering of a body plus a map from text offsets to source offsets.
#[derive(Debug, Clone)]
pub struct TextView<'a> {
    source: &'a str,
    text: Cow<'a, str>,
    /// `origin[i]` is the source byte offset that produced text byte `i`;
    /// one extra trailing entry maps the end of text to the end of source.
    /// `None` means text and source are identical.
    origin: Option<Vec<usize>>,
}

impl<'a> TextView<'a> {
    /// A plain-text body is its own view.
    pub fn plain(source: &'a str) -> Self {
        Self {
            source,
            text: Cow::Borrowed(source),
            origin: None,
        }
    }

    /// Render HTML to text: tags removed, block tags become line breaks,
    /// entities decoded, `<script>`/`<style>` content dropped.
    ///
    /// Unterminated tags end the scan; whatever was read before stays usable.
    pub fn html(source: &'a str) -> Self {
        let bytes = source.as_bytes();
        let mut text = String::with_capacity(source.len() / 2);
        let mut origin = Vec::with_capacity(source.len() / 2);
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'<' => {
                    let Some(rel_end) = source[i..].find('>') else {
                        break;
                    };
                    let tag_end = i + rel_end + 1;
                    let tag = &source[i..tag_end];
                    let name = tag_name(tag);
                    let closing = tag.starts_with("</");

                    if !closing && SKIPPED_BLOCKS.contains(&name.as_str()) {
                        let close = format!("</{name}");
                        i = match find_ignore_case(&source[tag_end..], &close) {
                            Some(pos) => {
                                let after = tag_end + pos;
                                source[after..]
                                    .find('>')
                                    .map_or(bytes.len(), |p| after + p + 1)
                            }
                            None => bytes.len(),
                        };
                        continue;
                    }

                    if BLOCK_TAGS.contains(&name.as_str()) && !text.ends_with('\n') {
                        push_str(&mut text, &mut origin, "\n", i);
                    }
                    i = tag_end;
                }
                b'&' => {
                    let (decoded, consumed) = decode_entity(&source[i..]);
                    push_str(&mut text, &mut origin, &decoded, i);
                    i += consumed;
                }
                _ => {
                    let ch_len = utf8_len(bytes[i]);
                    let end = (i + ch_len).min(bytes.len());
                    let Some(chunk) = source.get(i..end) else {
                        i += 1;
                        continue;
                    };
                    push_str(&mut text, &mut origin, chunk, i);
                    i = end;
                }
            }
        }
        origin.push(source.len());

        Self {
            source,
            text: Cow::Owned(text),
            origin: Some(origin),
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_html(&self) -> bool {
        self.origin.is_some()
    }

    /// Map a text offset to the source offset that produced it.
    pub fn to_source(&self, text_offset: usize) -> usize {
        match &self.origin {
            None => text_offset.min(self.source.len()),
            Some(origin) => origin
                .get(text_offset)
                .copied()
                .unwrap_or(self.source.len()),
        }
    }

    /// Source offset at which a text line starting at `text_offset` should be
    /// cut. For HTML the cut is widened backwards over the opening tags that
    /// wrap the line, so the quote keeps its own container.
    pub fn line_cut(&self, text_offset: usize) -> usize {
        let pos = self.to_source(text_offset);
        if self.origin.is_none() {
            return pos;
        }
        widen_over_opening_tags(self.source, pos)
    }

    /// Lines of the text view with their text offsets.
    pub fn lines(&self) -> Vec<(usize, &str)> {
        let mut out = Vec::new();
        let mut start = 0;
        for line in self.text.split('\n') {
            out.push((start, line.strip_suffix('\r').unwrap_or(line)));
            start += line.len() + 1;
        }
        out
    }
}

/// Convert HTML to plain text for card display: trimmed lines, at most one
/// blank line in a row.
pub fn html_to_text(html: &str) -> String {
    let view = TextView::html(html);
    let mut cleaned = String::with_capacity(view.text().len());
    let mut prev_was_blank = false;
    for line in view.text().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !prev_was_blank && !cleaned.is_empty() {
                cleaned.push('\n');
            }
            prev_was_blank = true;
        } else {
            cleaned.push_str(trimmed);
            cleaned.push('\n');
            prev_was_blank = false;
        }
    }
    cleaned.trim().to_string()
}

/// Whether an HTML fragment contains any visible text.
pub fn has_visible_text(html: &str) -> bool {
    TextView::html(html)
        .text()
        .chars()
        .any(|c| !c.is_whitespace())
}

/// Decode one entity at the start of `s` (which begins with `&`).
///
/// Returns the decoded text and the number of source bytes consumed.
/// Unknown or malformed entities decode to a literal `&`.
pub fn decode_entity(s: &str) -> (String, usize) {
    let Some(semi) = s.bytes().take(12).position(|b| b == b';') else {
        return ("&".to_string(), 1);
    };
    let name = &s[1..semi];
    let decoded = match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        "ndash" => Some('\u{2013}'),
        "mdash" => Some('\u{2014}'),
        _ => numeric_entity(name),
    };
    match decoded {
        Some(ch) => (ch.to_string(), semi + 1),
        None => ("&".to_string(), 1),
    }
}

/// Decode every entity in a string.
pub fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let (decoded, consumed) = decode_entity(&rest[pos..]);
        out.push_str(&decoded);
        rest = &rest[pos + consumed..];
    }
    out.push_str(rest);
    out
}

fn numeric_entity(name: &str) -> Option<char> {
    let digits = name.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    match code {
        160 => Some(' '),
        _ => char::from_u32(code),
    }
}

/// Lowercased element name of a tag such as `<div class="x">` or `</P>`.
pub(crate) fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('<')
        .trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Move `pos` backwards over whitespace and directly preceding opening tags
/// (never over closing tags or line-break tags).
fn widen_over_opening_tags(source: &str, mut pos: usize) -> usize {
    loop {
        let before = source[..pos].trim_end();
        if !before.ends_with('>') {
            return pos;
        }
        let Some(open) = before.rfind('<') else {
            return pos;
        };
        let tag = &before[open..];
        let name = tag_name(tag);
        if tag.starts_with("</") || name.is_empty() || matches!(name.as_str(), "br" | "hr" | "img")
        {
            return pos;
        }
        pos = open;
    }
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .to_ascii_lowercase()
        .find(&needle.to_ascii_lowercase())
}

fn push_str(text: &mut String, origin: &mut Vec<usize>, s: &str, source_pos: usize) {
    text.push_str(s);
    origin.extend(std::iter::repeat(source_pos).take(s.len()));
}

fn utf8_len(first: u8) -> usize {
    match first {
        0xF0..=0xF7 => 4,
        0xE0..=0xEF => 3,
        0xC0..=0xDF => 2,
        _ => 1,
    }
}
