//! Internationalization (i18n) module.
//!
//! Two kinds of strings live here:
//!
//! - **Labels** that end up inside normalized output (author labels, the
//!   "load more" affordance). These take the language explicitly so that
//!   normalization stays a pure function of its inputs.
//! - **CLI strings** printed by the `threadline` binary, which follow the
//!   process-wide language set once at startup.
//!
//! English is the default language; Norwegian (Bokmål) is available as an
//! alternative, matching the two languages the quote detector understands.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

static CURRENT_LANG: OnceLock<Lang> = OnceLock::new();

/// Supported languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    /// English (default)
    #[default]
    En,
    /// Norwegian
    #[serde(alias = "nb", alias = "nn")]
    No,
}

impl Lang {
    /// Parse a language code string (e.g. "en", "no", "nb_NO", "en-US").
    /// Returns `None` for unrecognized codes.
    pub fn from_code(code: &str) -> Option<Self> {
        let normalized = code.to_lowercase();
        let prefix = normalized.split(['_', '-', '.']).next().unwrap_or("");
        match prefix {
            "en" => Some(Self::En),
            "no" | "nb" | "nn" => Some(Self::No),
            _ => None,
        }
    }

    /// Return the ISO 639-1 code for this language.
    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::No => "no",
        }
    }
}

/// Initialize the process-wide CLI language. Call once at startup.
/// If already initialized, this is a no-op.
pub fn set_lang(lang: Lang) {
    let _ = CURRENT_LANG.set(lang);
}

/// Get the process-wide CLI language (defaults to English).
pub fn lang() -> Lang {
    CURRENT_LANG.get().copied().unwrap_or(Lang::En)
}

/// Detect language from `THREADLINE_LANG`, then `LC_MESSAGES`, then `LANG`.
pub fn detect_system_lang() -> Lang {
    std::env::var("THREADLINE_LANG")
        .ok()
        .and_then(|v| Lang::from_code(&v))
        .or_else(|| {
            std::env::var("LC_MESSAGES")
                .ok()
                .and_then(|v| Lang::from_code(&v))
        })
        .or_else(|| std::env::var("LANG").ok().and_then(|v| Lang::from_code(&v)))
        .unwrap_or(Lang::En)
}

/// Defines a label function taking the language explicitly.
macro_rules! label {
    ($name:ident, $en:expr, $no:expr) => {
        /// Returns a localized label for the given language.
        pub fn $name(lang: Lang) -> &'static str {
            match lang {
                Lang::En => $en,
                Lang::No => $no,
            }
        }
    };
}

/// Defines a CLI string function bound to the process-wide language.
macro_rules! msg {
    ($name:ident, $en:expr, $no:expr) => {
        /// Returns a localized string for the current language.
        pub fn $name() -> &'static str {
            match lang() {
                Lang::En => $en,
                Lang::No => $no,
            }
        }
    };
}

// ── Labels ───────────────────────────────────────────────────────

label!(label_system, "System", "System");
label!(label_agent, "Agent", "Agent");
label!(label_unknown_customer, "Unknown customer", "Ukjent kunde");
label!(label_load_more, "Load more", "Last inn flere");
label!(label_all_loaded, "All messages loaded", "Alle meldinger er lastet");

/// "N older messages" in the given language.
pub fn label_remaining(lang: Lang, remaining: usize) -> String {
    match (lang, remaining) {
        (Lang::En, 1) => "1 older message".to_string(),
        (Lang::En, n) => format!("{n} older messages"),
        (Lang::No, 1) => "1 eldre melding".to_string(),
        (Lang::No, n) => format!("{n} eldre meldinger"),
    }
}

// ── CLI strings ──────────────────────────────────────────────────

msg!(
    app_about,
    "threadline: normalize support-inbox messages into display-ready cards",
    "threadline: normaliser meldinger i supportinnboksen til visningsklare kort"
);
msg!(err_file_not_found, "File not found", "Fant ikke filen");
msg!(cli_cards, "card(s)", "kort");
msg!(cli_skipped, "Skipped records", "Hoppet over");
msg!(cli_duplicates, "Duplicates removed", "Duplikater fjernet");
msg!(cli_visible_body, "Visible body", "Synlig innhold");
msg!(cli_quoted_blocks, "Quoted blocks", "Siterte blokker");
msg!(cli_page, "Page", "Side");
msg!(cli_estimate, "Estimate", "Estimat");
msg!(cli_confidence, "Confidence", "Sikkerhet");
msg!(cli_inferred_time, "(earlier)", "(tidligere)");
msg!(cli_no_quotes, "No quoted history found", "Fant ingen sitert historikk");
msg!(cli_fetched, "fetched", "hentet");
msg!(cli_admitted, "admitted", "tatt inn");

// ── Subcommand help ──────────────────────────────────────────────

msg!(
    help_cmd_normalize,
    "Normalize a records file into display-ready cards",
    "Normaliser en postfil til visningsklare kort"
);
msg!(
    help_cmd_detect,
    "Show the quote split of a single message body",
    "Vis sitatdelingen av en enkelt meldingstekst"
);
msg!(
    help_cmd_replay,
    "Replay paginated, overlapping fetches over a records file",
    "Spill av sidevis, overlappende henting over en postfil"
);
msg!(
    help_cmd_estimate,
    "Estimate how many messages remain unloaded",
    "Anslå hvor mange meldinger som ikke er lastet"
);
msg!(
    help_cmd_config,
    "Print the effective configuration",
    "Skriv ut gjeldende konfigurasjon"
);
