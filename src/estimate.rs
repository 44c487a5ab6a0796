//! Progressive completeness estimation: how many cards are still unloaded,
//! and whether that number is trustworthy enough to show.

use serde::{Deserialize, Serialize};

/// Default minimum raw sample before the expansion ratio is trusted.
pub const DEFAULT_MIN_SAMPLE_SIZE: usize = 20;

/// Default largest remaining count that can be reported with confidence.
pub const DEFAULT_MAX_CONFIDENT_REMAINING: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub min_sample_size: usize,
    pub max_confident_remaining: usize,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            min_sample_size: DEFAULT_MIN_SAMPLE_SIZE,
            max_confident_remaining: DEFAULT_MAX_CONFIDENT_REMAINING,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Low,
}

/// What presentation may show for the unloaded tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "remaining")]
pub enum CompletenessDisplay {
    /// Show "N older messages".
    Count(usize),
    /// Show only a generic "load more" affordance.
    LoadMore,
    /// Nothing left to load.
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletenessEstimate {
    pub total_raw_count: usize,
    pub loaded_normalized_count: usize,
    pub estimated_total_normalized: usize,
    pub remaining: usize,
    pub confidence: Confidence,
}

impl CompletenessEstimate {
    /// The remaining count, only when it may be shown.
    pub fn visible_remaining(&self) -> Option<usize> {
        (self.confidence == Confidence::High).then_some(self.remaining)
    }

    /// Presentation rule: a low-confidence estimate never surfaces a number.
    pub fn display(&self) -> CompletenessDisplay {
        match self.confidence {
            Confidence::High if self.remaining == 0 => CompletenessDisplay::Complete,
            Confidence::High => CompletenessDisplay::Count(self.remaining),
            Confidence::Low => CompletenessDisplay::LoadMore,
        }
    }
}

/// Estimate with the default thresholds.
pub fn estimate(
    total_raw_count: usize,
    normalized_loaded_count: usize,
    raw_loaded_count: usize,
) -> CompletenessEstimate {
    estimate_with(
        &EstimatorConfig::default(),
        total_raw_count,
        normalized_loaded_count,
        raw_loaded_count,
    )
}

/// Extrapolate the observed cards-per-raw-row ratio over the raw total.
///
/// Once every raw row is loaded the answer is exact. A raw total smaller than
/// what was already loaded is clamped up to the loaded count.
pub fn estimate_with(
    config: &EstimatorConfig,
    total_raw_count: usize,
    normalized_loaded_count: usize,
    raw_loaded_count: usize,
) -> CompletenessEstimate {
    let total_raw = total_raw_count.max(raw_loaded_count);
    let all_loaded = raw_loaded_count >= total_raw;

    let estimated_total_normalized = if all_loaded {
        normalized_loaded_count
    } else {
        let ratio = normalized_loaded_count as f64 / raw_loaded_count.max(1) as f64;
        (total_raw as f64 * ratio).round() as usize
    };
    let remaining = estimated_total_normalized.saturating_sub(normalized_loaded_count);

    let enough_sample = all_loaded || raw_loaded_count >= config.min_sample_size;
    let confidence = if enough_sample && remaining <= config.max_confident_remaining {
        Confidence::High
    } else {
        Confidence::Low
    };

    CompletenessEstimate {
        total_raw_count: total_raw,
        loaded_normalized_count: normalized_loaded_count,
        estimated_total_normalized,
        remaining,
        confidence,
    }
}
