//! Plain `>`-prefixed quoting with no attribution line.

use super::attribution::match_attribution_at;
use super::separator::match_header_block_at;
use super::{strip_quote_prefix, QuoteDetector};
use crate::model::message::QuoteKind;
use crate::parser::html::TextView;

/// Cuts before every run of `>` lines that follows unquoted content. Blank
/// lines neither start nor end a run. Attribution lines and header runs are
/// quote metadata, not fresh content.
pub struct AngleBracketDetector;

impl QuoteDetector for AngleBracketDetector {
    fn name(&self) -> &'static str {
        "angle-bracket"
    }

    fn kind(&self) -> QuoteKind {
        QuoteKind::AngleBracketPlain
    }

    fn detect(&self, view: &TextView<'_>) -> Vec<usize> {
        let lines = view.lines();
        let texts: Vec<&str> = lines.iter().map(|(_, text)| *text).collect();
        let mut cuts = Vec::new();
        let mut seen_unquoted = false;
        let mut in_run = false;
        let mut i = 0;
        while i < texts.len() {
            let line = texts[i];
            if line.trim().is_empty() {
                i += 1;
                continue;
            }
            let quoted = strip_quote_prefix(line).1 > 0;
            if !quoted {
                if let Some(used) = metadata_lines(&texts, i) {
                    in_run = false;
                    i += used;
                    continue;
                }
            }
            if quoted && !in_run && seen_unquoted {
                cuts.push(view.line_cut(lines[i].0));
            }
            if !quoted {
                seen_unquoted = true;
            }
            in_run = quoted;
            i += 1;
        }
        cuts
    }
}

/// Lines taken by an attribution or header run starting at `index`.
fn metadata_lines(lines: &[&str], index: usize) -> Option<usize> {
    match_attribution_at(lines, index)
        .map(|(_, used)| used)
        .or_else(|| match_header_block_at(lines, index).map(|run| run.lines.max(1)))
}
