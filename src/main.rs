//! CLI entry point for `threadline`.

use std::path::{Path, PathBuf};

use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use threadline::config::{self, Config};
use threadline::estimate::{estimate_with, CompletenessDisplay, CompletenessEstimate, Confidence};
use threadline::feed::{ConversationFeed, FeedOptions, PageReport};
use threadline::i18n::{self, Lang};
use threadline::model::card::MessageCard;
use threadline::model::context::NormalizationContext;
use threadline::model::record::ContentType;
use threadline::quote::find_quote_boundary;
use threadline::segment::SortOrder;
use threadline::source::{JsonFileSource, PageRequest, RecordSource};

#[derive(Parser)]
#[command(name = "threadline", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Language (en, no). Defaults to config, then system locale.
    #[arg(long, global = true, value_name = "LANG")]
    lang: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a records file into cards
    Normalize {
        /// JSON records file (array, or object keyed by conversation id)
        path: PathBuf,
        /// JSON normalization context
        #[arg(short, long)]
        context: Option<PathBuf>,
        /// Conversation ids to include (default: all)
        #[arg(long = "conversation", value_name = "ID")]
        conversations: Vec<String>,
        /// Expand quoted history into synthetic cards
        #[arg(short, long)]
        segment: bool,
        /// Card order: desc (newest first) or asc
        #[arg(short, long)]
        order: Option<String>,
        /// Pretend the conversation has this many raw rows in total
        #[arg(long)]
        total: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Show the quote split of one body
    Detect {
        /// File holding a single message body
        path: PathBuf,
        /// Treat the body as HTML (default: by file extension)
        #[arg(long)]
        html: bool,
        #[arg(long)]
        json: bool,
    },
    /// Replay paginated fetches over a records file
    Replay {
        path: PathBuf,
        #[arg(short, long)]
        context: Option<PathBuf>,
        #[arg(long = "conversation", value_name = "ID")]
        conversations: Vec<String>,
        #[arg(long, default_value_t = 20)]
        page_size: usize,
        /// Rows of each page repeated at the start of the next one
        #[arg(long, default_value_t = 0)]
        overlap: usize,
        #[arg(short, long)]
        segment: bool,
        #[arg(long)]
        json: bool,
    },
    /// Estimate remaining messages
    Estimate {
        #[arg(long)]
        total: usize,
        #[arg(long)]
        normalized: usize,
        #[arg(long)]
        raw: usize,
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration
    Config,
}

/// Detect language early from --lang arg, config or system env, before clap
/// processes --help.
fn detect_lang_early(config: &Config) -> Lang {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--lang" {
            if let Some(lang) = args.get(i + 1).and_then(|code| Lang::from_code(code)) {
                return lang;
            }
        }
        if let Some(lang) = args[i].strip_prefix("--lang=").and_then(Lang::from_code) {
            return lang;
        }
    }
    config.lang().unwrap_or_else(i18n::detect_system_lang)
}

/// Build a localized clap Command using i18n strings.
fn build_localized_command() -> clap::Command {
    let mut cmd = Cli::command().about(i18n::app_about());

    let subcommands: Vec<clap::Command> = cmd
        .get_subcommands()
        .map(|sub| {
            let s = sub.clone();
            match s.get_name() {
                "normalize" => s.about(i18n::help_cmd_normalize()),
                "detect" => s.about(i18n::help_cmd_detect()),
                "replay" => s.about(i18n::help_cmd_replay()),
                "estimate" => s.about(i18n::help_cmd_estimate()),
                "config" => s.about(i18n::help_cmd_config()),
                _ => s,
            }
        })
        .collect();

    for sub in subcommands {
        cmd = cmd.mut_subcommand(sub.get_name(), |_| sub.clone());
    }

    cmd
}

fn main() -> anyhow::Result<()> {
    let config = config::load_config();

    // Detect language BEFORE clap parsing so --help is localized
    let lang = detect_lang_early(&config);
    i18n::set_lang(lang);

    let matches = build_localized_command().get_matches();
    let cli = Cli::from_arg_matches(&matches)?;

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    if let Some(code) = cli.lang.as_deref().filter(|c| Lang::from_code(c).is_none()) {
        tracing::warn!(lang = code, fallback = lang.code(), "Unknown language code");
    }

    match cli.command {
        Commands::Normalize {
            path,
            context,
            conversations,
            segment,
            order,
            total,
            json,
        } => {
            let ctx = load_context(context.as_deref(), &config, lang)?;
            let options = feed_options(&config, segment, order.as_deref())?;
            cmd_normalize(&path, ctx, options, conversations, total, json)
        }
        Commands::Detect { path, html, json } => cmd_detect(&path, html, json),
        Commands::Replay {
            path,
            context,
            conversations,
            page_size,
            overlap,
            segment,
            json,
        } => {
            let ctx = load_context(context.as_deref(), &config, lang)?;
            let options = feed_options(&config, segment, None)?;
            let request = PageRequest::first(conversations, page_size);
            cmd_replay(&path, ctx, options, request, overlap, json)
        }
        Commands::Estimate {
            total,
            normalized,
            raw,
            json,
        } => {
            let estimate = estimate_with(&config.estimator(), total, normalized, raw);
            if json {
                print_json(&estimate_json(&estimate))
            } else {
                print_estimate(&estimate, lang);
                Ok(())
            }
        }
        Commands::Config => cmd_config(&config),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::cache_dir(config);
    let log_path = config::log_file_path(config);
    let log_name = log_path.file_name().unwrap_or_default();
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, log_name);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Context file (if any) merged with the configured agent identities.
fn load_context(
    path: Option<&Path>,
    config: &Config,
    lang: Lang,
) -> anyhow::Result<NormalizationContext> {
    let base = match path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("{}: {}", i18n::err_file_not_found(), path.display());
            }
            let data = std::fs::read_to_string(path)?;
            serde_json::from_str::<NormalizationContext>(&data)
                .map_err(|e| threadline::error::ThreadlineError::json(path, e))?
                .normalized()
        }
        None => NormalizationContext::new(),
    };
    Ok(config.context(base).with_lang(lang))
}

fn feed_options(config: &Config, segment: bool, order: Option<&str>) -> anyhow::Result<FeedOptions> {
    let order = match order {
        Some(code) => SortOrder::from_code(code)
            .ok_or_else(|| anyhow::anyhow!("Unknown sort order '{code}' (use asc or desc)"))?,
        None => config.sort_order(),
    };
    Ok(FeedOptions {
        segment: (segment || config.segment.enabled).then(|| config.segment_options()),
        order,
        estimator: config.estimator(),
    })
}

fn load_source(path: &Path) -> anyhow::Result<JsonFileSource> {
    if !path.exists() {
        anyhow::bail!("{}: {}", i18n::err_file_not_found(), path.display());
    }
    Ok(JsonFileSource::load(path)?)
}

/// Dedupe, normalize and print every record of a file as one page.
fn cmd_normalize(
    path: &Path,
    ctx: NormalizationContext,
    options: FeedOptions,
    conversations: Vec<String>,
    total: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let lang = ctx.lang;
    let source = load_source(path)?;
    let mut page = source.fetch(&PageRequest::first(conversations, usize::MAX))?;
    if let Some(total) = total {
        page.total_raw_count = total;
    }

    let mut feed = ConversationFeed::new(ctx, options);
    let report = feed.ingest(&page);
    let cards = feed.cards();

    if json {
        return print_json(&serde_json::json!({
            "cards": cards,
            "duplicates": report.duplicates,
            "skipped": skipped_json(&report),
            "estimate": estimate_json(&report.estimate),
        }));
    }

    print_cards_table(&cards);
    println!();
    println!("  {:<20} {}", i18n::cli_duplicates(), report.duplicates);
    print_skipped(&report);
    print_estimate(&report.estimate, lang);
    Ok(())
}

/// Show the visible body and quoted blocks of a single body.
fn cmd_detect(path: &Path, html: bool, json: bool) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("{}: {}", i18n::err_file_not_found(), path.display());
    }
    let body = std::fs::read_to_string(path)?;
    let is_html = html
        || path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"));
    let content_type = if is_html {
        ContentType::Html
    } else {
        ContentType::Text
    };

    let split = find_quote_boundary(&body, content_type);
    if json {
        return print_json(&serde_json::to_value(&split)?);
    }

    println!("── {} ──", i18n::cli_visible_body());
    println!("{}", split.visible_body);
    println!();
    if split.quoted_blocks.is_empty() {
        println!("{}", i18n::cli_no_quotes());
        return Ok(());
    }
    println!("── {} ({}) ──", i18n::cli_quoted_blocks(), split.quoted_blocks.len());
    for (i, block) in split.quoted_blocks.iter().enumerate() {
        println!();
        println!("[{}] {}", i + 1, block.kind);
        println!("{}", block.text);
    }
    Ok(())
}

/// Simulate paginated fetches and print one line per page.
fn cmd_replay(
    path: &Path,
    ctx: NormalizationContext,
    options: FeedOptions,
    request: PageRequest,
    overlap: usize,
    json: bool,
) -> anyhow::Result<()> {
    let lang = ctx.lang;
    let source = load_source(path)?.with_overlap(overlap);
    let mut feed = ConversationFeed::new(ctx, options);
    let reports = feed.load_all(&source, request)?;

    if json {
        let pages: Vec<serde_json::Value> = reports
            .iter()
            .map(|r| {
                serde_json::json!({
                    "fetched": r.fetched,
                    "admitted": r.admitted,
                    "duplicates": r.duplicates,
                    "skipped": skipped_json(r),
                    "estimate": estimate_json(&r.estimate),
                })
            })
            .collect();
        return print_json(&serde_json::json!({
            "pages": pages,
            "cards": feed.cards().len(),
        }));
    }

    for (i, report) in reports.iter().enumerate() {
        println!(
            "  {} {:>3}: {} {:>4}, {} {:>4}, {} {:>3}, {} {:>3}  {}",
            i18n::cli_page(),
            i + 1,
            i18n::cli_fetched(),
            report.fetched,
            i18n::cli_admitted(),
            report.admitted,
            i18n::cli_duplicates(),
            report.duplicates,
            i18n::cli_skipped(),
            report.skipped.len(),
            display_text(&report.estimate, lang),
        );
    }
    println!();
    println!("  {:<20} {}", i18n::cli_cards(), feed.cards().len());
    Ok(())
}

/// Print the effective configuration as TOML.
fn cmd_config(config: &Config) -> anyhow::Result<()> {
    if let Some(path) = config::config_file_path() {
        println!("# {}", path.display());
    }
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

// ── Output helpers ──────────────────────────────────────────────

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn estimate_json(estimate: &CompletenessEstimate) -> serde_json::Value {
    serde_json::json!({
        "total_raw_count": estimate.total_raw_count,
        "loaded_normalized_count": estimate.loaded_normalized_count,
        "estimated_total_normalized": estimate.estimated_total_normalized,
        "remaining": estimate.visible_remaining(),
        "confidence": estimate.confidence,
        "display": estimate.display(),
    })
}

fn skipped_json(report: &PageReport) -> serde_json::Value {
    report
        .skipped
        .iter()
        .map(|s| serde_json::json!({ "id": s.id, "reason": s.reason }))
        .collect()
}

fn display_text(estimate: &CompletenessEstimate, lang: Lang) -> String {
    match estimate.display() {
        CompletenessDisplay::Count(n) => i18n::label_remaining(lang, n),
        CompletenessDisplay::LoadMore => i18n::label_load_more(lang).to_string(),
        CompletenessDisplay::Complete => i18n::label_all_loaded(lang).to_string(),
    }
}

fn print_estimate(estimate: &CompletenessEstimate, lang: Lang) {
    let confidence = match estimate.confidence {
        Confidence::High => "high",
        Confidence::Low => "low",
    };
    println!("  {:<20} {}", i18n::cli_estimate(), display_text(estimate, lang));
    println!("  {:<20} {}", i18n::cli_confidence(), confidence);
}

fn print_skipped(report: &PageReport) {
    println!("  {:<20} {}", i18n::cli_skipped(), report.skipped.len());
    for skipped in &report.skipped {
        println!("    {}: {}", skipped.id, skipped.reason);
    }
}

/// One block per card: time, author and id, then the first body lines.
fn print_cards_table(cards: &[MessageCard]) {
    const BODY_PREVIEW_LINES: usize = 3;

    for card in cards {
        let when = if card.timestamp_inferred {
            i18n::cli_inferred_time().to_string()
        } else {
            card.created_at.format("%Y-%m-%d %H:%M").to_string()
        };
        let internal = if card.is_internal { " [internal]" } else { "" };
        println!(
            "{:<16}  {:<32}  {}{}",
            when,
            truncate(&card.author_label, 32),
            card.id,
            internal
        );
        for line in card
            .visible_body
            .lines()
            .filter(|l| !l.trim().is_empty())
            .take(BODY_PREVIEW_LINES)
        {
            println!("    {}", truncate(line.trim(), 100));
        }
        if !card.quoted_blocks.is_empty() {
            println!("    ({} {})", card.quoted_blocks.len(), i18n::cli_quoted_blocks());
        }
    }
}

/// Truncate to a display width, counting wide characters as two columns.
fn truncate(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    if max_width <= 3 {
        return s.chars().take(max_width).collect();
    }
    let mut result = String::new();
    let mut current_width = 0;
    for ch in s.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if current_width + ch_width + 3 > max_width {
            break;
        }
        result.push(ch);
        current_width += ch_width;
    }
    result.push_str("...");
    result
}
